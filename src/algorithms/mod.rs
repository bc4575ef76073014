/// 测距算法模块
///
/// 该模块提供 RSSI 测距的核心计算：
/// - 多种路径损耗模型（统一枚举分派）
/// - 标量卡尔曼滤波（信号强度平滑）
/// - 一维无迹卡尔曼滤波（距离平滑）
/// - 采样与结果数据结构

pub mod path_loss;
pub mod kalman;
pub mod ukf;
pub mod sample;
pub mod results;

pub use path_loss::*;
pub use kalman::*;
pub use ukf::*;
pub use sample::*;
pub use results::*;

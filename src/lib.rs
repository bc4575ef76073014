/// 蓝牙信标测距库
///
/// 将带噪声的 RSSI 采样转换为平滑的距离估计：
/// - 路径损耗模型（自由空间、ITU 室内、对数距离 + 穿墙）
/// - 标量卡尔曼滤波平滑信号强度
/// - 一维无迹卡尔曼滤波平滑每个信标的距离
/// - 有容量上限的信标估计器注册表

pub mod algorithms;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod shared;

pub use config::{PipelineConfig, SampleFilter, ThresholdStage};
pub use error::{EstimationError, Result};
pub use pipeline::RangingPipeline;
pub use registry::{EmitterTrack, EstimatorRegistry, RegistryConfig};
pub use shared::SharedPipeline;

/// 标量卡尔曼滤波器 - 用于平滑 RSSI 等一维噪声测量序列
///
/// 状态转移与观测模型均为单位阵：测量值直接估计状态。

use crate::error::{EstimationError, Result};
use serde::{Deserialize, Serialize};

/// 标量卡尔曼滤波器参数
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalarKalmanConfig {
    /// 过程噪声协方差
    pub q: f64,
    /// 测量噪声协方差
    pub r: f64,
}

impl ScalarKalmanConfig {
    /// 创建参数
    pub fn new(q: f64, r: f64) -> Self {
        ScalarKalmanConfig { q, r }
    }

    /// 噪声参数必须为正且有限
    pub fn validate(&self) -> Result<()> {
        if !(self.q > 0.0 && self.q.is_finite()) || !(self.r > 0.0 && self.r.is_finite()) {
            return Err(EstimationError::InvalidConfig(format!(
                "标量卡尔曼噪声参数必须为正: q={}, r={}",
                self.q, self.r
            )));
        }
        Ok(())
    }

    /// 按当前参数创建未初始化的滤波器
    pub fn build(&self) -> ScalarKalmanFilter {
        ScalarKalmanFilter::new(self.q, self.r)
    }
}

impl Default for ScalarKalmanConfig {
    fn default() -> Self {
        ScalarKalmanConfig { q: 0.1, r: 2.0 }
    }
}

/// 一维卡尔曼滤波器
#[derive(Clone, Debug)]
pub struct ScalarKalmanFilter {
    /// 过程噪声协方差
    pub q: f64,
    /// 测量噪声协方差
    pub r: f64,
    x: f64,
    p: f64,
    initialized: bool,
}

impl ScalarKalmanFilter {
    /// 创建新的滤波器，首个测量值作为初始状态
    pub fn new(q: f64, r: f64) -> Self {
        ScalarKalmanFilter {
            q,
            r,
            x: 0.0,
            p: 1.0,
            initialized: false,
        }
    }

    /// 输入一个测量值，返回平滑后的估计
    pub fn filter(&mut self, measurement: f64) -> f64 {
        if !self.initialized {
            self.x = measurement;
            self.p = 1.0;
            self.initialized = true;
            return self.x;
        }

        // 预测：仅协方差增长，状态不变
        self.p += self.q;

        // 卡尔曼增益
        let k = self.p / (self.p + self.r);

        // 更新
        self.x += k * (measurement - self.x);
        self.p *= 1.0 - k;

        self.x
    }

    /// 当前估计值（未初始化时为 None）
    pub fn estimate(&self) -> Option<f64> {
        self.initialized.then_some(self.x)
    }

    /// 当前协方差
    pub fn covariance(&self) -> f64 {
        self.p
    }

    /// 是否已接收过第一个测量值
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// 重置为未初始化状态
    pub fn reset(&mut self) {
        self.x = 0.0;
        self.p = 1.0;
        self.initialized = false;
    }
}

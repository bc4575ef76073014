/// 一维无迹卡尔曼滤波器 (UKF) - 用于平滑每个信标的距离估计
///
/// 通过 sigma 点传播均值与方差。状态转移为随机游走（扫描间隔内距离变化缓慢），
/// 观测模型为单位映射；sigma 点框架保留了替换为非线性模型的能力。
///
/// 滤波器本身不持有状态：`update` 接收显式的 `(x, P)` 并返回新状态，
/// 状态由注册表唯一持有和写回。

use crate::error::{EstimationError, Result};
use serde::{Deserialize, Serialize};

/// 状态维度
const STATE_DIM: f64 = 1.0;

/// 单个信标的滤波状态
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    /// 距离估计（米）
    pub x: f64,
    /// 估计协方差
    pub p: f64,
}

impl FilterState {
    /// 以均值和协方差创建状态
    pub fn new(x: f64, p: f64) -> Self {
        FilterState { x, p }
    }
}

/// UKF 参数
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UkfParams {
    /// 过程噪声 Q
    pub q: f64,
    /// 测量噪声 R
    pub r: f64,
    /// sigma 点扩散参数（通常很小，例如 1e-3）
    pub alpha: f64,
    /// 先验分布形状修正（高斯分布取 2.0）
    pub beta: f64,
    /// 次级缩放参数（通常为 0）
    pub kappa: f64,
}

impl UkfParams {
    /// 指定噪声参数，其余取默认值
    pub fn new(q: f64, r: f64) -> Self {
        UkfParams {
            q,
            r,
            ..Default::default()
        }
    }

    /// 验证参数：噪声为正，alpha 为正，L + kappa 为正
    pub fn validate(&self) -> Result<()> {
        if !(self.q > 0.0 && self.q.is_finite()) || !(self.r > 0.0 && self.r.is_finite()) {
            return Err(EstimationError::InvalidConfig(format!(
                "UKF 噪声参数必须为正: q={}, r={}",
                self.q, self.r
            )));
        }
        if !(self.alpha > 0.0 && self.alpha.is_finite()) {
            return Err(EstimationError::InvalidConfig(format!(
                "UKF alpha 必须为正: {}",
                self.alpha
            )));
        }
        if !self.beta.is_finite() || !(STATE_DIM + self.kappa > 0.0) {
            return Err(EstimationError::InvalidConfig(format!(
                "UKF beta/kappa 不合法: beta={}, kappa={}",
                self.beta, self.kappa
            )));
        }
        Ok(())
    }
}

impl Default for UkfParams {
    fn default() -> Self {
        UkfParams {
            q: 0.1,
            r: 0.5,
            alpha: 1e-3,
            beta: 2.0,
            kappa: 0.0,
        }
    }
}

/// 单步更新的中间量，便于调试与日志
#[derive(Clone, Copy, Debug)]
pub struct UkfStep {
    /// 更新后的状态
    pub state: FilterState,
    /// 预测测量 ẑ
    pub predicted_measurement: f64,
    /// 新息 z - ẑ
    pub innovation: f64,
    /// 新息协方差 S
    pub innovation_cov: f64,
    /// 卡尔曼增益 K
    pub gain: f64,
}

/// 无迹卡尔曼滤波器（无状态，仅持有参数）
#[derive(Clone, Copy, Debug)]
pub struct UnscentedDistanceFilter {
    params: UkfParams,
}

impl UnscentedDistanceFilter {
    /// 创建滤波器，参数不合法时返回配置错误
    pub fn new(params: UkfParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// 滤波器参数
    pub fn params(&self) -> &UkfParams {
        &self.params
    }

    /// 用测量 `z` 更新状态，返回新状态
    pub fn update(&self, state: FilterState, z: f64) -> Result<FilterState> {
        self.step(state, z).map(|step| step.state)
    }

    /// 完整的预测 + 更新步骤，附带中间量
    pub fn step(&self, state: FilterState, z: f64) -> Result<UkfStep> {
        let UkfParams {
            q,
            r,
            alpha,
            beta,
            kappa,
        } = self.params;
        let n = STATE_DIM;

        // 1. 预测（随机游走）
        let x_pred = state.x;
        let p_pred = state.p + q;

        // 2. 缩放参数
        let lambda = alpha * alpha * (n + kappa) - n;
        let c = n + lambda;

        // 3. Sigma 点
        let spread_sq = c * p_pred;
        if spread_sq < 0.0 || spread_sq.is_nan() {
            return Err(EstimationError::NegativeSigmaSpread(spread_sq));
        }
        let spread = spread_sq.sqrt();
        let sigma_points = [x_pred, x_pred + spread, x_pred - spread];

        // 4. 权重
        let w_m0 = lambda / c;
        let w_c0 = w_m0 + (1.0 - alpha * alpha + beta);
        let w_i = 1.0 / (2.0 * c);
        let weights_mean = [w_m0, w_i, w_i];
        let weights_cov = [w_c0, w_i, w_i];

        // 5. 预测测量（单位观测模型）
        let z_pred: f64 = sigma_points
            .iter()
            .zip(weights_mean.iter())
            .map(|(sp, w)| w * sp)
            .sum();

        // 6. 新息协方差与互协方差
        let mut s = r;
        let mut cross = 0.0;
        for (sp, w) in sigma_points.iter().zip(weights_cov.iter()) {
            let dz = sp - z_pred;
            s += w * dz * dz;
            cross += w * (sp - x_pred) * dz;
        }

        if s == 0.0 || !s.is_finite() {
            return Err(EstimationError::ZeroInnovationCovariance(s));
        }

        // 7. 增益
        let k = cross / s;

        // 8. 更新
        let innovation = z - z_pred;
        let x = x_pred + k * innovation;
        let p = p_pred - k * s * k;

        Ok(UkfStep {
            state: FilterState { x, p },
            predicted_measurement: z_pred,
            innovation,
            innovation_cov: s,
            gain: k,
        })
    }
}

/// 错误类型定义
///
/// 数值域错误在调用时检测，配置错误在构造时检测

use thiserror::Error;

/// 测距计算结果类型
pub type Result<T> = std::result::Result<T, EstimationError>;

/// 测距与滤波过程中可能出现的错误
#[derive(Error, Debug)]
pub enum EstimationError {
    /// 频率必须为正（log10 的定义域）
    #[error("频率必须为正数: {0} MHz")]
    NonPositiveFrequency(i32),

    /// 路径损耗公式产生了 NaN 或无穷大
    #[error("距离计算结果非有限值 (RSSI={rssi:.1} dBm)")]
    NonFiniteDistance { rssi: f64 },

    /// 反算 RSSI 时距离必须为正
    #[error("距离必须为正数: {0}")]
    NonPositiveDistance(f64),

    /// sigma 点扩散项 c·P 为负，无法开方
    #[error("sigma 点扩散为负: c·P = {0}")]
    NegativeSigmaSpread(f64),

    /// 新息协方差 S 为零或非有限值
    #[error("新息协方差退化: S = {0}")]
    ZeroInnovationCovariance(f64),

    /// 配置参数不合法
    #[error("配置错误: {0}")]
    InvalidConfig(String),

    /// 名称过滤正则表达式不合法
    #[error("名称过滤表达式无效: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// 配置或回放数据解析失败
    #[error("JSON 解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    /// 文件读写失败
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl EstimationError {
    /// 是否属于数值域错误（输入或状态退化，而非配置问题）
    pub fn is_numeric_domain(&self) -> bool {
        matches!(
            self,
            EstimationError::NonPositiveFrequency(_)
                | EstimationError::NonFiniteDistance { .. }
                | EstimationError::NonPositiveDistance(_)
                | EstimationError::NegativeSigmaSpread(_)
                | EstimationError::ZeroInnovationCovariance(_)
        )
    }
}

/// 测距流水线配置
///
/// 配置在启动时确定一次，不随采样变化。所有字段都有默认值，
/// JSON 配置文件只需写出需要覆盖的部分。

use crate::algorithms::kalman::ScalarKalmanConfig;
use crate::algorithms::path_loss::{DistanceUnit, PathLossModel};
use crate::algorithms::ukf::UkfParams;
use crate::error::Result;
use crate::registry::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 强度阈值的应用位置
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdStage {
    /// 对原始 RSSI 过滤（平滑之前）
    #[default]
    Raw,
    /// 对平滑后的 RSSI 过滤
    Smoothed,
}

/// 调用方的采样过滤策略
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleFilter {
    /// 最小信号强度 (dBm)，低于该值的采样被丢弃
    pub min_rssi: Option<i16>,
    /// 阈值作用阶段
    pub stage: ThresholdStage,
    /// 信标名称（label 或 ID）需匹配的正则表达式
    pub name_pattern: Option<String>,
}

/// 流水线完整配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 路径损耗模型及参数
    pub model: PathLossModel,
    /// 假定的穿墙数量
    pub wall_count: u32,
    /// 信号强度平滑（None 表示不启用）
    pub rssi_smoothing: Option<ScalarKalmanConfig>,
    /// 距离 UKF 平滑（None 表示直接输出原始距离）
    pub distance_filter: Option<UkfParams>,
    /// 注册表容量与过期策略
    pub registry: RegistryConfig,
    /// 采样过滤策略
    pub filter: SampleFilter,
    /// 显示单位
    pub display_unit: DistanceUnit,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            model: PathLossModel::default(),
            wall_count: 0,
            rssi_smoothing: None,
            distance_filter: Some(UkfParams::default()),
            registry: RegistryConfig::default(),
            filter: SampleFilter::default(),
            display_unit: DistanceUnit::Meter,
        }
    }
}

impl PipelineConfig {
    /// 从 JSON 字符串解析
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// 验证各部分参数
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        if let Some(smoothing) = &self.rssi_smoothing {
            smoothing.validate()?;
        }
        if let Some(params) = &self.distance_filter {
            params.validate()?;
        }
        self.registry.validate()?;
        if let Some(pattern) = &self.filter.name_pattern {
            regex::Regex::new(pattern)?;
        }
        Ok(())
    }
}

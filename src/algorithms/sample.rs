/// 信号采样数据结构
///
/// 由外部扫描方每个扫描周期产生一次，核心只读不改

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单个信号采样
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalSample {
    /// 信标 MAC 地址或唯一标识符
    pub emitter_id: String,
    /// 信号强度 (dBm)
    pub signal_strength: i16,
    /// 信道频率 (MHz)
    pub frequency_mhz: i32,
    /// 显示名称（可选）
    #[serde(default)]
    pub label: Option<String>,
}

impl SignalSample {
    /// 创建不带显示名称的采样
    pub fn new(emitter_id: impl Into<String>, signal_strength: i16, frequency_mhz: i32) -> Self {
        SignalSample {
            emitter_id: emitter_id.into(),
            signal_strength,
            frequency_mhz,
            label: None,
        }
    }

    /// 附加显示名称
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// 显示名称：优先使用 label，否则使用 ID
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.emitter_id)
    }
}

/// 一个扫描周期的采样批次（按扫描方交付的顺序）
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScanCycle {
    /// 扫描时间（回放数据中可选）
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// 采样列表
    pub samples: Vec<SignalSample>,
}

impl ScanCycle {
    /// 创建不带时间戳的批次
    pub fn new(samples: Vec<SignalSample>) -> Self {
        ScanCycle {
            timestamp: None,
            samples,
        }
    }

    /// 采样数量
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// 是否没有采样
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

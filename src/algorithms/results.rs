/// 测距结果数据结构
///
/// 每个扫描周期输出一份报告，交给显示方

use crate::algorithms::path_loss::DistanceUnit;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// 单个信标的平滑距离估计
#[derive(Clone, Debug, Serialize)]
pub struct DistanceEstimate {
    /// 信标 ID
    pub emitter_id: String,
    /// 显示名称（label 或 ID）
    pub label: String,
    /// 原始信号强度 (dBm)
    pub rssi: i16,
    /// 平滑后的信号强度（未启用强度平滑时等于原始值）
    pub smoothed_rssi: f64,
    /// 路径损耗模型给出的原始距离（米）
    pub raw_distance: f64,
    /// 滤波后的距离（米）
    pub distance: f64,
    /// 距离估计协方差（未启用 UKF 时为 None）
    pub variance: Option<f64>,
    /// 时间戳
    pub timestamp: DateTime<Utc>,
}

impl DistanceEstimate {
    /// 以指定单位表示的滤波距离
    pub fn distance_in(&self, unit: DistanceUnit) -> f64 {
        unit.convert_meters(self.distance)
    }
}

impl fmt::Display for DistanceEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} dBm] {:.2} m (原始 {:.2} m)",
            self.label, self.rssi, self.distance, self.raw_distance
        )
    }
}

/// 单个采样的处理结果
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RangeOutcome {
    /// 成功得到距离估计
    Estimated(DistanceEstimate),
    /// 计算失败，显示为“不可用”
    Unavailable {
        emitter_id: String,
        label: String,
        rssi: i16,
        reason: String,
    },
}

impl RangeOutcome {
    /// 信标 ID
    pub fn emitter_id(&self) -> &str {
        match self {
            RangeOutcome::Estimated(e) => &e.emitter_id,
            RangeOutcome::Unavailable { emitter_id, .. } => emitter_id,
        }
    }

    /// 成功时的距离估计
    pub fn estimate(&self) -> Option<&DistanceEstimate> {
        match self {
            RangeOutcome::Estimated(e) => Some(e),
            RangeOutcome::Unavailable { .. } => None,
        }
    }

    /// 是否得到了距离估计
    pub fn is_available(&self) -> bool {
        matches!(self, RangeOutcome::Estimated(_))
    }
}

/// 一个扫描周期的输出报告
#[derive(Clone, Debug, Default, Serialize)]
pub struct CycleReport {
    /// 按输入顺序排列的结果
    pub outcomes: Vec<RangeOutcome>,
    /// 被阈值或名称过滤丢弃的采样数
    pub dropped: usize,
    /// 本周期被淘汰的信标数
    pub evicted: usize,
}

impl CycleReport {
    /// 显示方所需的 (名称, 原始 RSSI, 平滑距离) 列表，不可用时距离为 None
    pub fn display_rows(&self) -> Vec<(String, i16, Option<f64>)> {
        self.outcomes
            .iter()
            .map(|outcome| match outcome {
                RangeOutcome::Estimated(e) => (e.label.clone(), e.rssi, Some(e.distance)),
                RangeOutcome::Unavailable { label, rssi, .. } => (label.clone(), *rssi, None),
            })
            .collect()
    }

    /// 成功估计的数量
    pub fn available_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_available()).count()
    }

    /// 结果数量（不含被丢弃的采样）
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// 是否没有任何结果
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// 按指定单位渲染为文本表格
    pub fn render(&self, unit: DistanceUnit) -> String {
        let mut out = String::new();
        for (label, rssi, distance) in self.display_rows() {
            let distance = match distance {
                Some(d) => format!("{:>8.2} {}", unit.convert_meters(d), unit.symbol()),
                None => "     不可用".to_string(),
            };
            out.push_str(&format!("{:<24} {:>5} dBm  {}\n", label, rssi, distance));
        }
        out
    }
}

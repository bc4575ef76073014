/// 测距流水线
///
/// 处理流程（每个扫描周期）：
/// - 调用方过滤策略（名称正则、最小强度阈值）
/// - 可选的 RSSI 标量卡尔曼平滑
/// - 路径损耗模型转换为原始距离
/// - 按信标 ID 取得或创建 UKF 状态并更新
///
/// 单个信标的计算错误只会使该信标显示为“不可用”，不会中断整个周期。

use crate::algorithms::path_loss::PathLossModel;
use crate::algorithms::results::{CycleReport, DistanceEstimate, RangeOutcome};
use crate::algorithms::sample::SignalSample;
use crate::algorithms::ukf::{FilterState, UnscentedDistanceFilter};
use crate::config::{PipelineConfig, ThresholdStage};
use crate::error::Result;
use crate::registry::EstimatorRegistry;
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info, warn};

/// 测距流水线（单一消费者，不持有锁）
#[derive(Debug)]
pub struct RangingPipeline {
    config: PipelineConfig,
    ukf: Option<UnscentedDistanceFilter>,
    name_filter: Option<Regex>,
    registry: EstimatorRegistry,
}

impl RangingPipeline {
    /// 按配置创建流水线，构造时完成全部参数校验
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let ukf = config
            .distance_filter
            .map(UnscentedDistanceFilter::new)
            .transpose()?;
        let name_filter = config
            .filter
            .name_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()?;
        let registry = EstimatorRegistry::new(&config.registry)?;

        debug!(model = %config.model, walls = config.wall_count, "测距流水线已创建");

        Ok(RangingPipeline {
            config,
            ukf,
            name_filter,
            registry,
        })
    }

    /// 当前配置
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 当前路径损耗模型
    pub fn model(&self) -> &PathLossModel {
        &self.config.model
    }

    /// 信标估计器注册表（只读）
    pub fn registry(&self) -> &EstimatorRegistry {
        &self.registry
    }

    /// 某信标当前的距离滤波状态
    pub fn state_of(&self, emitter_id: &str) -> Option<FilterState> {
        self.registry.get(emitter_id).and_then(|track| track.state())
    }

    /// 处理一个扫描周期（使用当前时间）
    pub fn process_cycle(&mut self, samples: &[SignalSample]) -> CycleReport {
        self.process_cycle_at(samples, Utc::now())
    }

    /// 处理一个扫描周期，按输入顺序逐个更新
    pub fn process_cycle_at(&mut self, samples: &[SignalSample], now: DateTime<Utc>) -> CycleReport {
        let evicted_before = self.registry.evicted_total();
        self.registry.purge_expired(now);

        let mut report = CycleReport::default();
        for sample in samples {
            match self.process_sample(sample, now) {
                Some(outcome) => report.outcomes.push(outcome),
                None => report.dropped += 1,
            }
        }
        report.evicted = self.registry.evicted_total() - evicted_before;

        info!(
            samples = samples.len(),
            available = report.available_count(),
            dropped = report.dropped,
            tracked = self.registry.len(),
            "扫描周期处理完成"
        );
        report
    }

    /// 处理单个采样；被过滤策略丢弃时返回 None
    fn process_sample(&mut self, sample: &SignalSample, now: DateTime<Utc>) -> Option<RangeOutcome> {
        let name = sample.display_name();
        if let Some(pattern) = &self.name_filter {
            if !pattern.is_match(name) {
                debug!(emitter = %sample.emitter_id, "名称不匹配，丢弃采样");
                return None;
            }
        }

        let min_rssi = self.config.filter.min_rssi.map(f64::from);
        let stage = self.config.filter.stage;
        let rssi = sample.signal_strength as f64;
        if stage == ThresholdStage::Raw && min_rssi.is_some_and(|min| rssi < min) {
            debug!(emitter = %sample.emitter_id, rssi, "信号低于阈值，丢弃采样");
            return None;
        }

        let smoothed_rssi = match &self.config.rssi_smoothing {
            Some(smoothing) => {
                self.registry
                    .smooth_strength(&sample.emitter_id, rssi, smoothing, now)
            }
            None => rssi,
        };
        if stage == ThresholdStage::Smoothed && min_rssi.is_some_and(|min| smoothed_rssi < min) {
            debug!(emitter = %sample.emitter_id, smoothed_rssi, "平滑后信号低于阈值，丢弃采样");
            return None;
        }

        let outcome = match self.estimate(sample, smoothed_rssi, now) {
            Ok(estimate) => {
                debug!(
                    emitter = %estimate.emitter_id,
                    raw = estimate.raw_distance,
                    filtered = estimate.distance,
                    "距离估计已更新"
                );
                RangeOutcome::Estimated(estimate)
            }
            Err(e) => {
                warn!(emitter = %sample.emitter_id, error = %e, "距离估计不可用");
                RangeOutcome::Unavailable {
                    emitter_id: sample.emitter_id.clone(),
                    label: name.to_string(),
                    rssi: sample.signal_strength,
                    reason: e.to_string(),
                }
            }
        };
        Some(outcome)
    }

    fn estimate(
        &mut self,
        sample: &SignalSample,
        smoothed_rssi: f64,
        now: DateTime<Utc>,
    ) -> Result<DistanceEstimate> {
        let raw_distance = self.config.model.distance_f64(
            smoothed_rssi,
            sample.frequency_mhz,
            self.config.wall_count,
        )?;

        let (distance, variance) = match &self.ukf {
            Some(ukf) => {
                let state = self
                    .registry
                    .advance(&sample.emitter_id, raw_distance, ukf, now)?;
                (state.x, Some(state.p))
            }
            None => (raw_distance, None),
        };

        Ok(DistanceEstimate {
            emitter_id: sample.emitter_id.clone(),
            label: sample.display_name().to_string(),
            rssi: sample.signal_strength,
            smoothed_rssi,
            raw_distance,
            distance,
            variance,
            timestamp: now,
        })
    }
}

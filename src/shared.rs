/// 线程安全的流水线封装
///
/// 核心流水线本身不加锁。当后台扫描任务与读取任务并发访问时，
/// 用 `Arc<Mutex<_>>` 提供外部互斥，每个扫描周期在持锁期间完整处理。

use crate::algorithms::results::CycleReport;
use crate::algorithms::sample::SignalSample;
use crate::algorithms::ukf::FilterState;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::RangingPipeline;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

/// 可在多个任务间共享的测距流水线
#[derive(Clone)]
pub struct SharedPipeline {
    inner: Arc<Mutex<RangingPipeline>>,
}

impl SharedPipeline {
    /// 按配置创建
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Self::from_pipeline(RangingPipeline::new(config)?))
    }

    /// 包装已创建的流水线
    pub fn from_pipeline(pipeline: RangingPipeline) -> Self {
        SharedPipeline {
            inner: Arc::new(Mutex::new(pipeline)),
        }
    }

    /// 获取内部引用，用于生产者任务
    pub fn get_ref(&self) -> Arc<Mutex<RangingPipeline>> {
        Arc::clone(&self.inner)
    }

    /// 处理一个扫描周期
    pub async fn process_cycle(&self, samples: &[SignalSample]) -> CycleReport {
        let mut pipeline = self.inner.lock().await;
        pipeline.process_cycle(samples)
    }

    /// 以指定时间处理一个扫描周期（回放录制数据时使用录制时间）
    pub async fn process_cycle_at(&self, samples: &[SignalSample], now: DateTime<Utc>) -> CycleReport {
        let mut pipeline = self.inner.lock().await;
        pipeline.process_cycle_at(samples, now)
    }

    /// 读取某信标当前的距离状态
    pub async fn state_of(&self, emitter_id: &str) -> Option<FilterState> {
        let pipeline = self.inner.lock().await;
        pipeline.state_of(emitter_id)
    }

    /// 当前所有信标的距离状态，按距离从近到远排序
    pub async fn snapshot(&self) -> Vec<(String, FilterState)> {
        let pipeline = self.inner.lock().await;
        let registry = pipeline.registry();
        let mut states: Vec<_> = registry
            .ids()
            .into_iter()
            .filter_map(|id| {
                let state = registry.get(&id)?.state()?;
                Some((id, state))
            })
            .collect();
        states.sort_by(|a, b| a.1.x.total_cmp(&b.1.x));
        states
    }

    /// 当前跟踪的信标数量
    pub async fn tracked_count(&self) -> usize {
        let pipeline = self.inner.lock().await;
        pipeline.registry().len()
    }
}

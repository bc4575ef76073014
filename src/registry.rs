/// 信标估计器注册表
///
/// 每个信标 ID 对应一条跟踪记录（距离滤波状态 + 可选的强度滤波器），
/// 首次出现时创建，之后复用。注册表是滤波状态的唯一持有者和写入者。
///
/// 容量有上限：超出时淘汰最久未使用的信标；可选的 TTL 用于清理长时间未出现的信标。

use crate::algorithms::kalman::{ScalarKalmanConfig, ScalarKalmanFilter};
use crate::algorithms::ukf::{FilterState, UnscentedDistanceFilter};
use crate::error::{EstimationError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// 注册表配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// 最多同时跟踪的信标数量
    pub capacity: usize,
    /// 信标过期时间（秒），None 表示不过期
    pub ttl_seconds: Option<i64>,
    /// 新建距离状态的初始协方差
    pub initial_covariance: f64,
}

impl RegistryConfig {
    /// 验证容量、过期时间与初始协方差
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(EstimationError::InvalidConfig(
                "注册表容量必须大于 0".to_string(),
            ));
        }
        if let Some(ttl) = self.ttl_seconds {
            if ttl <= 0 {
                return Err(EstimationError::InvalidConfig(format!(
                    "过期时间必须为正: {} 秒",
                    ttl
                )));
            }
        }
        if !(self.initial_covariance >= 0.0 && self.initial_covariance.is_finite()) {
            return Err(EstimationError::InvalidConfig(format!(
                "初始协方差必须为非负有限值: {}",
                self.initial_covariance
            )));
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            capacity: 256,
            ttl_seconds: Some(300),
            initial_covariance: 1.0,
        }
    }
}

/// 单个信标的跟踪记录
#[derive(Clone, Debug)]
pub struct EmitterTrack {
    /// 信标 ID
    pub emitter_id: String,
    /// 首次出现时间
    pub first_seen: DateTime<Utc>,
    /// 最后出现时间
    pub last_seen: DateTime<Utc>,
    /// 距离滤波更新次数（不含初始化）
    pub updates: u64,
    state: Option<FilterState>,
    strength: Option<ScalarKalmanFilter>,
    last_used: u64,
}

impl EmitterTrack {
    fn new(emitter_id: &str, now: DateTime<Utc>) -> Self {
        EmitterTrack {
            emitter_id: emitter_id.to_string(),
            first_seen: now,
            last_seen: now,
            updates: 0,
            state: None,
            strength: None,
            last_used: 0,
        }
    }

    /// 当前距离滤波状态（尚未测距时为 None）
    pub fn state(&self) -> Option<FilterState> {
        self.state
    }

    /// 当前平滑后的信号强度
    pub fn smoothed_strength(&self) -> Option<f64> {
        self.strength.as_ref().and_then(|f| f.estimate())
    }
}

/// 信标 ID -> 跟踪记录
#[derive(Debug)]
pub struct EstimatorRegistry {
    tracks: HashMap<String, EmitterTrack>,
    capacity: usize,
    ttl: Option<Duration>,
    initial_covariance: f64,
    clock: u64,
    evicted_total: usize,
}

impl EstimatorRegistry {
    /// 按配置创建注册表
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        config.validate()?;
        Ok(EstimatorRegistry {
            tracks: HashMap::new(),
            capacity: config.capacity,
            ttl: config.ttl_seconds.map(Duration::seconds),
            initial_covariance: config.initial_covariance,
            clock: 0,
            evicted_total: 0,
        })
    }

    /// 获取或创建跟踪记录，并刷新使用时间
    ///
    /// 新建的记录尚无距离状态，只允许挤掉同样没有距离状态的记录；
    /// 全部记录都有状态时暂时超出容量一条，等到建立距离状态时再按 LRU 淘汰。
    fn touch(&mut self, id: &str, now: DateTime<Utc>) -> &mut EmitterTrack {
        self.clock += 1;
        if !self.tracks.contains_key(id) && self.tracks.len() >= self.capacity {
            self.evict_least_recent(|track| track.state.is_none());
        }
        let clock = self.clock;
        let track = self
            .tracks
            .entry(id.to_string())
            .or_insert_with(|| EmitterTrack::new(id, now));
        track.last_used = clock;
        track.last_seen = now;
        track
    }

    /// 在满足条件的记录中淘汰最久未使用的一条
    fn evict_least_recent(&mut self, eligible: impl Fn(&EmitterTrack) -> bool) {
        let oldest = self
            .tracks
            .values()
            .filter(|track| eligible(track))
            .min_by_key(|track| track.last_used)
            .map(|track| track.emitter_id.clone());
        if let Some(id) = oldest {
            warn!(emitter = %id, capacity = self.capacity, "容量已满，淘汰最久未使用的信标");
            self.tracks.remove(&id);
            self.evicted_total += 1;
        }
    }

    /// 有距离状态的记录数量
    pub fn stateful_len(&self) -> usize {
        self.tracks.values().filter(|track| track.state.is_some()).count()
    }

    /// 返回已有的距离状态；不存在时以 `seed_distance` 和固定初始协方差创建
    ///
    /// 第二个返回值表示是否为新建。
    pub fn get_or_create(
        &mut self,
        id: &str,
        seed_distance: f64,
        now: DateTime<Utc>,
    ) -> (FilterState, bool) {
        let initial_covariance = self.initial_covariance;
        if let Some(state) = self.touch(id, now).state {
            return (state, false);
        }

        // 只有建立距离状态时才占用容量
        if self.stateful_len() >= self.capacity {
            self.evict_least_recent(|track| track.state.is_some());
        }
        let state = FilterState::new(seed_distance, initial_covariance);
        if let Some(track) = self.tracks.get_mut(id) {
            track.state = Some(state);
        }
        debug!(emitter = %id, seed = seed_distance, "新建距离滤波状态");
        (state, true)
    }

    /// 写回滤波后的状态；信标不存在时返回 false
    pub fn commit(&mut self, id: &str, state: FilterState) -> bool {
        match self.tracks.get_mut(id) {
            Some(track) => {
                track.state = Some(state);
                track.updates += 1;
                true
            }
            None => false,
        }
    }

    /// 用原始距离推进该信标的距离滤波
    ///
    /// 首次出现时直接返回种子状态；计算失败时保留原状态。
    pub fn advance(
        &mut self,
        id: &str,
        raw_distance: f64,
        filter: &UnscentedDistanceFilter,
        now: DateTime<Utc>,
    ) -> Result<FilterState> {
        let (state, created) = self.get_or_create(id, raw_distance, now);
        if created {
            return Ok(state);
        }
        let next = filter.update(state, raw_distance)?;
        self.commit(id, next);
        Ok(next)
    }

    /// 用该信标自己的标量卡尔曼滤波器平滑信号强度
    pub fn smooth_strength(
        &mut self,
        id: &str,
        rssi: f64,
        config: &ScalarKalmanConfig,
        now: DateTime<Utc>,
    ) -> f64 {
        let track = self.touch(id, now);
        track
            .strength
            .get_or_insert_with(|| config.build())
            .filter(rssi)
    }

    /// 清理超过 TTL 未出现的信标，返回清理数量
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let before = self.tracks.len();
        self.tracks
            .retain(|_, track| now.signed_duration_since(track.last_seen) < ttl);
        let purged = before - self.tracks.len();
        if purged > 0 {
            info!(purged, ttl_seconds = ttl.num_seconds(), "清理过期信标");
        }
        self.evicted_total += purged;
        purged
    }

    /// 获取跟踪记录
    pub fn get(&self, id: &str) -> Option<&EmitterTrack> {
        self.tracks.get(id)
    }

    /// 删除跟踪记录
    pub fn remove(&mut self, id: &str) -> Option<EmitterTrack> {
        self.tracks.remove(id)
    }

    /// 所有信标 ID
    pub fn ids(&self) -> Vec<String> {
        self.tracks.keys().cloned().collect()
    }

    /// 跟踪记录数量（含尚无距离状态的记录）
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// 是否没有任何记录
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// 距离状态容量上限
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 累计淘汰（LRU + 过期）的信标数量
    pub fn evicted_total(&self) -> usize {
        self.evicted_total
    }

    /// 清空所有记录
    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

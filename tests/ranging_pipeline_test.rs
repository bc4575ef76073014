/// 测距流水线多周期测试
///
/// 模拟扫描方连续交付多个周期，验证顺序、淘汰与配置加载

use blurange::algorithms::*;
use blurange::{PipelineConfig, RangingPipeline, RegistryConfig, SampleFilter, ThresholdStage};
use chrono::{Duration, Utc};

fn beacon_samples(rssi: [i16; 3]) -> Vec<SignalSample> {
    vec![
        SignalSample::new("20:A7:16:5E:C5:D6", rssi[0], 2402).with_label("RFstar_C5D6"),
        SignalSample::new("20:A7:16:61:0C:F1", rssi[1], 2426).with_label("RFstar_0CF1"),
        SignalSample::new("20:A7:16:60:FB:FC", rssi[2], 2480).with_label("RFstar_FBFC"),
    ]
}

#[test]
fn test_multi_cycle_converges_per_emitter() {
    let mut pipeline = RangingPipeline::new(PipelineConfig::default()).unwrap();
    let start = Utc::now();

    let mut report = CycleReport::default();
    for i in 0..30 {
        report = pipeline.process_cycle_at(&beacon_samples([-50, -60, -70]), start + Duration::seconds(i));
    }

    assert_eq!(report.len(), 3);
    assert_eq!(pipeline.registry().len(), 3);
    for outcome in &report.outcomes {
        let estimate = outcome.estimate().unwrap();
        assert!((estimate.distance - estimate.raw_distance).abs() < 1e-3);
    }

    // 输出顺序与输入顺序一致
    let rows = report.display_rows();
    assert_eq!(rows[0].0, "RFstar_C5D6");
    assert_eq!(rows[1].0, "RFstar_0CF1");
    assert_eq!(rows[2].0, "RFstar_FBFC");
    assert!(rows[0].2.unwrap() < rows[1].2.unwrap());
    assert!(rows[1].2.unwrap() < rows[2].2.unwrap());
}

#[test]
fn test_noisy_stream_is_smoothed() {
    let mut pipeline = RangingPipeline::new(PipelineConfig::default()).unwrap();
    let start = Utc::now();
    let noisy = [-58, -63, -57, -64, -59, -62, -56, -65, -60, -61];

    let mut raw = Vec::new();
    let mut filtered = Vec::new();
    for (i, rssi) in noisy.iter().enumerate() {
        let sample = SignalSample::new("B1", *rssi, 2402);
        let report = pipeline.process_cycle_at(&[sample], start + Duration::seconds(i as i64));
        let estimate = report.outcomes[0].estimate().unwrap();
        raw.push(estimate.raw_distance);
        filtered.push(estimate.distance);
    }

    let spread = |values: &[f64]| {
        let tail = &values[4..];
        let max = tail.iter().cloned().fold(f64::MIN, f64::max);
        let min = tail.iter().cloned().fold(f64::MAX, f64::min);
        max - min
    };
    assert!(spread(&filtered) < spread(&raw));
}

#[test]
fn test_ttl_expiry_reseeds_emitter() {
    let config = PipelineConfig {
        registry: RegistryConfig {
            ttl_seconds: Some(10),
            ..Default::default()
        },
        ..Default::default()
    };
    let mut pipeline = RangingPipeline::new(config).unwrap();
    let start = Utc::now();

    pipeline.process_cycle_at(&[SignalSample::new("B1", -50, 2402)], start);
    pipeline.process_cycle_at(&[SignalSample::new("B1", -50, 2402)], start + Duration::seconds(1));
    assert_eq!(pipeline.registry().get("B1").unwrap().updates, 1);

    // 超过 TTL 后重新出现：重新以原始距离作为种子
    let report = pipeline.process_cycle_at(
        &[SignalSample::new("B1", -70, 2402)],
        start + Duration::seconds(30),
    );
    assert_eq!(report.evicted, 1);
    let estimate = report.outcomes[0].estimate().unwrap();
    assert_eq!(estimate.distance, estimate.raw_distance);
    assert_eq!(pipeline.registry().get("B1").unwrap().updates, 0);
}

#[test]
fn test_capacity_bound() {
    let config = PipelineConfig {
        registry: RegistryConfig {
            capacity: 2,
            ttl_seconds: None,
            initial_covariance: 1.0,
        },
        ..Default::default()
    };
    let mut pipeline = RangingPipeline::new(config).unwrap();
    let report = pipeline.process_cycle(&beacon_samples([-50, -60, -70]));
    assert_eq!(report.len(), 3);
    assert_eq!(report.evicted, 1);
    assert_eq!(pipeline.registry().len(), 2);
    assert!(pipeline.state_of("20:A7:16:5E:C5:D6").is_none());
}

#[test]
fn test_failing_emitter_keeps_tracked_states_at_capacity() {
    let config = PipelineConfig {
        model: PathLossModel::free_space(0.0),
        rssi_smoothing: Some(ScalarKalmanConfig::default()),
        registry: RegistryConfig {
            capacity: 2,
            ttl_seconds: None,
            initial_covariance: 1.0,
        },
        ..Default::default()
    };
    let mut pipeline = RangingPipeline::new(config).unwrap();
    let start = Utc::now();
    pipeline.process_cycle_at(
        &[SignalSample::new("B1", -50, 2402), SignalSample::new("B2", -60, 2402)],
        start,
    );
    let b1 = pipeline.state_of("B1").unwrap();
    let b2 = pipeline.state_of("B2").unwrap();

    // 频率为 0 的信标只做了强度平滑，不应挤掉已有的距离状态
    let report = pipeline.process_cycle_at(
        &[SignalSample::new("BAD", -55, 0)],
        start + Duration::seconds(1),
    );
    assert!(!report.outcomes[0].is_available());
    assert_eq!(report.evicted, 0);
    assert_eq!(pipeline.state_of("B1"), Some(b1));
    assert_eq!(pipeline.state_of("B2"), Some(b2));
    assert!(pipeline.state_of("BAD").is_none());

    // 之后 B1 继续更新而不是重新初始化
    pipeline.process_cycle_at(&[SignalSample::new("B1", -50, 2402)], start + Duration::seconds(2));
    assert_eq!(pipeline.registry().get("B1").unwrap().updates, 1);
    assert_eq!(pipeline.registry().stateful_len(), 2);
}

#[test]
fn test_smoothed_threshold_drop_keeps_tracked_states_at_capacity() {
    let config = PipelineConfig {
        rssi_smoothing: Some(ScalarKalmanConfig::default()),
        registry: RegistryConfig {
            capacity: 2,
            ttl_seconds: None,
            initial_covariance: 1.0,
        },
        filter: SampleFilter {
            min_rssi: Some(-70),
            stage: ThresholdStage::Smoothed,
            name_pattern: None,
        },
        ..Default::default()
    };
    let mut pipeline = RangingPipeline::new(config).unwrap();
    pipeline.process_cycle(&[SignalSample::new("B1", -50, 2402), SignalSample::new("B2", -60, 2402)]);

    let report = pipeline.process_cycle(&[SignalSample::new("WEAK", -90, 2402)]);
    assert_eq!(report.dropped, 1);
    assert_eq!(report.evicted, 0);
    assert!(pipeline.state_of("B1").is_some());
    assert!(pipeline.state_of("B2").is_some());
}

#[test]
fn test_repeated_emitter_within_cycle_updates_in_order() {
    let mut pipeline = RangingPipeline::new(PipelineConfig::default()).unwrap();
    let report = pipeline.process_cycle(&[
        SignalSample::new("B1", -50, 2402),
        SignalSample::new("B1", -60, 2402),
        SignalSample::new("B1", -55, 2402),
    ]);

    // 期望值：首个采样作为种子，其余按输入顺序依次更新
    let model = PathLossModel::default();
    let ukf = UnscentedDistanceFilter::new(UkfParams::default()).unwrap();
    let seed = FilterState::new(model.distance(-50, 2402, 0).unwrap(), 1.0);
    let second = ukf.update(seed, model.distance(-60, 2402, 0).unwrap()).unwrap();
    let third = ukf.update(second, model.distance(-55, 2402, 0).unwrap()).unwrap();

    assert_eq!(pipeline.state_of("B1"), Some(third));
    assert_eq!(pipeline.registry().get("B1").unwrap().updates, 2);

    let rows = report.display_rows();
    let rssi: Vec<i16> = rows.iter().map(|row| row.1).collect();
    assert_eq!(rssi, vec![-50, -60, -55]);
    let distances: Vec<f64> = rows.iter().map(|row| row.2.unwrap()).collect();
    assert_eq!(distances, vec![seed.x, second.x, third.x]);
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "model": {"type": "log_distance_wall", "rssi_at_1m": -40.0, "gamma": 3.0, "wall_loss_per_wall": 3.0},
        "wall_count": 1,
        "distance_filter": {"q": 0.1, "r": 0.5},
        "filter": {"min_rssi": -75, "name_pattern": "^RFstar_"},
        "display_unit": "centimeter"
    }"#;
    let config = PipelineConfig::from_json_str(json).unwrap();
    assert_eq!(config.display_unit, DistanceUnit::Centimeter);

    let mut pipeline = RangingPipeline::new(config).unwrap();
    let mut samples = beacon_samples([-50, -60, -80]);
    samples.push(SignalSample::new("11:22:33:44:55:66", -40, 2402).with_label("Phone"));
    let report = pipeline.process_cycle(&samples);
    assert_eq!(report.len(), 2);
    assert_eq!(report.dropped, 2);
    assert!(report.render(DistanceUnit::Centimeter).contains("cm"));
}

#[test]
fn test_demo_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/config.json");
    let config = PipelineConfig::load(path).unwrap();
    assert_eq!(config.wall_count, 1);
    assert!(config.rssi_smoothing.is_some());
    assert!(RangingPipeline::new(config).is_ok());
}

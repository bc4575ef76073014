/// 测距回放工具
///
/// 从 JSON Lines 文件（每行一个扫描周期）读取录制的采样，
/// 经测距流水线处理后输出每个信标的平滑距离。

use anyhow::{Context, Result};
use blurange::algorithms::ScanCycle;
use blurange::{PipelineConfig, SharedPipeline};
use clap::Parser;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(author, version, about = "RSSI 测距回放工具", long_about = None)]
struct Args {
    /// 录制的扫描数据（JSON Lines，每行一个扫描周期）
    #[arg(value_name = "REPLAY")]
    replay: PathBuf,

    /// 流水线配置文件（JSON），缺省使用内置默认值
    #[arg(long, short, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 周期之间的回放间隔（毫秒）
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,

    /// 以 JSON 输出每个周期的报告
    #[arg(long, default_value_t = false)]
    json: bool,

    /// 详细日志 (DEBUG 级别)
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("加载配置失败: {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let unit = config.display_unit;
    info!("{}", config.model);

    let pipeline = SharedPipeline::new(config).context("流水线配置无效")?;
    let (tx, mut rx) = mpsc::channel::<ScanCycle>(16);

    // 生产者：按顺序读取扫描周期
    let replay = args.replay.clone();
    let interval = Duration::from_millis(args.interval_ms);
    let producer = tokio::spawn(async move { replay_cycles(replay, tx, interval).await });

    // 消费者：逐个周期完整处理
    let mut cycle_no = 0usize;
    while let Some(cycle) = rx.recv().await {
        cycle_no += 1;
        let report = match cycle.timestamp {
            Some(timestamp) => pipeline.process_cycle_at(&cycle.samples, timestamp).await,
            None => pipeline.process_cycle(&cycle.samples).await,
        };
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!("📍 扫描周期 #{} | 信标: {} | 丢弃: {}", cycle_no, report.len(), report.dropped);
            print!("{}", report.render(unit));
        }
    }

    let read = producer.await.context("回放任务异常退出")??;
    info!(
        cycles = read,
        tracked = pipeline.tracked_count().await,
        "回放完成"
    );
    Ok(())
}

/// 读取回放文件并发送到通道，返回读取的周期数
async fn replay_cycles(
    path: PathBuf,
    tx: mpsc::Sender<ScanCycle>,
    interval: Duration,
) -> Result<usize> {
    let file = File::open(&path)
        .await
        .with_context(|| format!("无法打开回放文件: {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut count = 0;
    let mut line_no = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let cycle: ScanCycle = match serde_json::from_str(line) {
            Ok(cycle) => cycle,
            Err(e) => {
                warn!(line = line_no, error = %e, "跳过无法解析的扫描周期");
                continue;
            }
        };
        debug!(line = line_no, samples = cycle.len(), "读取扫描周期");
        if tx.send(cycle).await.is_err() {
            break;
        }
        count += 1;
        if !interval.is_zero() {
            sleep(interval).await;
        }
    }
    Ok(count)
}

fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr);

    if verbose {
        subscriber.with_max_level(tracing::Level::DEBUG).init();
        debug!("详细日志已启用");
    } else {
        subscriber.with_max_level(tracing::Level::INFO).init();
    }
}

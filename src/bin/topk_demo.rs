//! Top-K Demo
//!
//! Drives a skewed synthetic metric workload through a [`TopKEngine`] and logs
//! each flush through the tracing sink.
//!
//! Usage:
//!   TOPK_K=5 TOPK_FLUSH_INTERVAL_MS=2000 cargo run --bin topk-demo --release
//!
//! Environment:
//!   TOPK_K, TOPK_EPSILON, TOPK_DELTA, TOPK_FLUSH_INTERVAL_MS  engine settings
//!   TOPK_DEMO_SECS      stop after this many seconds (default: until Ctrl+C)
//!   TOPK_DEMO_WORKERS   concurrent recording tasks (default: 4)

use std::time::Duration;

use metric_topk::{EngineConfig, Recorder, TagSet, TopKEngine, TracingSink};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const ENDPOINTS: &[&str] = &[
    "/", "/login", "/search", "/cart", "/checkout", "/api/items", "/api/users", "/health",
    "/static/app.js", "/static/app.css", "/admin", "/logout",
];
const REGIONS: &[&str] = &["us-east", "us-west", "eu-central", "ap-south"];
const METHODS: &[&str] = &["GET", "POST"];

fn env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Pick an index biased toward the front of the slice
fn skewed_index(rng: &mut StdRng, len: usize) -> usize {
    let u: f64 = rng.gen();
    ((u * u * u) * len as f64) as usize % len
}

async fn run_worker(id: u64, recorder: Recorder, cancel: CancellationToken) -> u64 {
    let mut rng = StdRng::seed_from_u64(id);
    let mut recorded = 0u64;

    while !cancel.is_cancelled() {
        for _ in 0..1_000 {
            let tags = TagSet::from_pairs(&[
                ("endpoint", ENDPOINTS[skewed_index(&mut rng, ENDPOINTS.len())]),
                ("region", REGIONS[rng.gen_range(0..REGIONS.len())]),
                ("method", METHODS[skewed_index(&mut rng, METHODS.len())]),
            ]);
            recorder.record("http.requests", &tags);
            recorded += 1;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    recorded
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::from_env()?;
    let workers: u64 = env_or("TOPK_DEMO_WORKERS", 4);
    let run_for: Option<u64> = std::env::var("TOPK_DEMO_SECS").ok().and_then(|v| v.parse().ok());

    info!(?config, workers, "starting top-k demo");

    let engine = TopKEngine::start(&config, TracingSink, CancellationToken::new())?;

    // Workers stop first so the engine's final flush sees their last batch
    let stop = CancellationToken::new();
    let handles: Vec<_> = (0..workers)
        .map(|id| tokio::spawn(run_worker(id, engine.recorder(), stop.clone())))
        .collect();

    match run_for {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                _ = signal::ctrl_c() => info!("Shutdown signal received"),
            }
        }
        None => {
            signal::ctrl_c().await?;
            info!("Shutdown signal received");
        }
    }
    stop.cancel();

    let mut total = 0u64;
    for handle in handles {
        match handle.await {
            Ok(recorded) => total += recorded,
            Err(e) => warn!("worker failed: {}", e),
        }
    }

    let report = engine.shutdown().await?;
    info!(
        recorded = total,
        flushes = report.flushes,
        emitted = report.emitted,
        "top-k demo finished"
    );
    Ok(())
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use memgrid::{Grid, MapHandle};
use tracing::{info, warn};

/// Bounded version of the "non-stop" workload: random puts and gets against
/// one map, with the size reported every `report_every` iterations.
pub struct LoadTestConfig {
    pub map_name: String,
    pub iterations: u64,
    pub key_space: u64,
    pub concurrency: usize,
    pub report_every: u64,
    pub sample_max: usize,
}

pub struct LoadReport {
    pub elapsed: Duration,
    pub puts: u64,
    pub gets: u64,
    pub hits: u64,
    pub errors: u64,
    pub reports: u64,
    pub final_size: usize,
    pub latency_us_p50: u64,
    pub latency_us_p95: u64,
    pub latency_us_p99: u64,
}

pub async fn run_load_test(grid: &Grid, config: &LoadTestConfig) -> Result<LoadReport> {
    run_against(grid.get_map(&config.map_name), config).await
}

async fn run_against(map: MapHandle, config: &LoadTestConfig) -> Result<LoadReport> {
    let key_space = config.key_space.max(1);
    let concurrency = config.concurrency.max(1);
    let report_every = config.report_every.max(1);
    let per_task_sample = (config.sample_max / concurrency).max(1);

    let puts = Arc::new(AtomicU64::new(0));
    let gets = Arc::new(AtomicU64::new(0));
    let hits = Arc::new(AtomicU64::new(0));
    let errors = Arc::new(AtomicU64::new(0));
    let done = Arc::new(AtomicU64::new(0));
    let reports = Arc::new(AtomicU64::new(0));

    let start = Instant::now();
    let mut handles = Vec::with_capacity(concurrency);

    for worker_id in 0..concurrency {
        let map = map.clone();
        let puts = puts.clone();
        let gets = gets.clone();
        let hits = hits.clone();
        let errors = errors.clone();
        let done = done.clone();
        let reports = reports.clone();
        let total = config.iterations;
        let mut rng = Lcg64::new(0x9e3779b97f4a7c15 ^ worker_id as u64);

        handles.push(tokio::spawn(async move {
            let mut latencies = Vec::with_capacity(per_task_sample);
            // Итерации делятся между воркерами через общий счётчик
            loop {
                let iteration = done.fetch_add(1, Ordering::Relaxed) + 1;
                if iteration > total {
                    break;
                }
                let op_start = Instant::now();

                let put_key = rng.next_u64() % key_space;
                match map
                    .put(format!("key{}", put_key), format!("value{}", put_key))
                    .await
                {
                    Ok(_) => {
                        puts.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        warn!(error = %e, "put failed");
                        errors.fetch_add(1, Ordering::Relaxed);
                    }
                }

                let get_key = rng.next_u64() % key_space;
                match map.get(format!("key{}", get_key)).await {
                    Ok(found) => {
                        gets.fetch_add(1, Ordering::Relaxed);
                        if found.is_some() {
                            hits.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "get failed");
                        errors.fetch_add(1, Ordering::Relaxed);
                    }
                }

                if latencies.len() < per_task_sample {
                    latencies.push(op_start.elapsed().as_micros() as u64);
                }

                if iteration % report_every == 0 {
                    reports.fetch_add(1, Ordering::Relaxed);
                    match map.size().await {
                        Ok(size) => info!(iteration, size, "Current map size"),
                        Err(e) => warn!(iteration, error = %e, "size failed"),
                    }
                }
                tokio::task::yield_now().await;
            }
            latencies
        }));
    }

    let mut latencies = Vec::new();
    for handle in handles {
        let mut worker_latencies = handle.await?;
        latencies.append(&mut worker_latencies);
    }
    latencies.sort_unstable();

    Ok(LoadReport {
        elapsed: start.elapsed(),
        puts: puts.load(Ordering::Relaxed),
        gets: gets.load(Ordering::Relaxed),
        hits: hits.load(Ordering::Relaxed),
        errors: errors.load(Ordering::Relaxed),
        reports: reports.load(Ordering::Relaxed),
        final_size: map.size().await.unwrap_or_else(|e| {
            warn!(error = %e, "final size unavailable");
            0
        }),
        latency_us_p50: percentile(&latencies, 0.50),
        latency_us_p95: percentile(&latencies, 0.95),
        latency_us_p99: percentile(&latencies, 0.99),
    })
}

impl LoadReport {
    pub fn print(&self) {
        let ops = self.puts + self.gets;
        let elapsed = self.elapsed.as_secs_f64().max(0.001);

        println!("load_test results:");
        println!("  duration_s: {:.2}", elapsed);
        println!("  put_ops: {}", self.puts);
        println!("  get_ops: {}", self.gets);
        println!("  get_hits: {}", self.hits);
        println!("  error_ops: {}", self.errors);
        println!("  size_reports: {}", self.reports);
        println!("  final_size: {}", self.final_size);
        println!("  ops_per_s: {:.2}", ops as f64 / elapsed);
        println!("  latency_us_p50: {}", self.latency_us_p50);
        println!("  latency_us_p95: {}", self.latency_us_p95);
        println!("  latency_us_p99: {}", self.latency_us_p99);
    }
}

fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx]
}

struct Lcg64 {
    state: u64,
}

impl Lcg64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        // старшие биты LCG заметно случайнее младших
        self.state >> 11
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(iterations: u64) -> LoadTestConfig {
        LoadTestConfig {
            map_name: "load".to_string(),
            iterations,
            key_space: 50,
            concurrency: 4,
            report_every: 10,
            sample_max: 1000,
        }
    }

    #[tokio::test]
    async fn test_load_run_counts_operations() {
        let grid = Grid::new();
        let report = run_load_test(&grid, &config(100)).await.unwrap();
        assert_eq!(report.puts, 100);
        assert_eq!(report.gets, 100);
        assert_eq!(report.errors, 0);
        assert_eq!(report.reports, 10);
        assert!(report.final_size > 0 && report.final_size <= 50);
    }

    #[tokio::test]
    async fn test_failing_map_reports_on_schedule() {
        let grid = Grid::new();
        let map = grid.get_map("load");
        grid.drop_map("load");

        let report = run_against(map, &config(100)).await.unwrap();
        assert_eq!(report.puts, 0);
        assert_eq!(report.errors, 200);
        assert_eq!(report.reports, 10);
        assert_eq!(report.final_size, 0);
    }

    #[test]
    fn test_percentile() {
        let sorted: Vec<u64> = (1..=100).collect();
        assert_eq!(percentile(&sorted, 0.50), 51);
        assert_eq!(percentile(&sorted, 0.99), 99);
        assert_eq!(percentile(&[], 0.5), 0);
    }
}

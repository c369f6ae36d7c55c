use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::registry::ObserverRegistry;
use super::sampler::{MetricReading, Sampler};
use crate::error::Result;
use crate::store::Store;
use crate::types::MetricSample;

/// Wire shape of a sample, shared by the history endpoint and the push channel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleView {
    pub captured_at: String,
    pub heap_used_bytes: i64,
    pub heap_max_bytes: i64,
    pub system_memory_total_bytes: i64,
    pub system_memory_used_bytes: i64,
    pub disk_total_bytes: i64,
    pub disk_used_bytes: i64,
    pub process_cpu_load: f64,
    pub system_cpu_load: f64,
}

impl From<&MetricSample> for SampleView {
    fn from(s: &MetricSample) -> Self {
        Self {
            captured_at: s.captured_at.to_rfc3339(),
            heap_used_bytes: s.heap_used_bytes,
            heap_max_bytes: s.heap_max_bytes,
            system_memory_total_bytes: s.system_memory_total_bytes,
            system_memory_used_bytes: s.system_memory_used_bytes,
            disk_total_bytes: s.disk_total_bytes,
            disk_used_bytes: s.disk_used_bytes,
            process_cpu_load: s.process_cpu_load,
            system_cpu_load: s.system_cpu_load,
        }
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn stamp(reading: MetricReading) -> MetricSample {
    MetricSample {
        id: Uuid::new_v4().to_string(),
        captured_at: Utc::now(),
        heap_used_bytes: to_i64(reading.heap_used_bytes),
        heap_max_bytes: to_i64(reading.heap_max_bytes),
        system_memory_total_bytes: to_i64(reading.system_memory_total_bytes),
        system_memory_used_bytes: to_i64(reading.system_memory_used_bytes),
        disk_total_bytes: to_i64(reading.disk_total_bytes),
        disk_used_bytes: to_i64(reading.disk_used_bytes),
        process_cpu_load: reading.process_cpu_load,
        system_cpu_load: reading.system_cpu_load,
    }
}

/// The most recent `limit` samples, oldest first.
pub fn latest_samples(store: &dyn Store, limit: i64) -> Result<Vec<MetricSample>> {
    let mut samples = store.list_recent_metric_samples(limit.max(0))?;
    samples.reverse();
    Ok(samples)
}

/// Background task: capture, persist, push, sleep.
pub struct MetricsLoop {
    store: Arc<dyn Store>,
    registry: Arc<ObserverRegistry>,
    sampler: Box<dyn Sampler>,
    interval: Duration,
}

impl MetricsLoop {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<ObserverRegistry>,
        sampler: Box<dyn Sampler>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            sampler,
            interval,
        }
    }

    /// One capture. The sample is stored before it is pushed.
    pub fn tick(&mut self) -> Result<MetricSample> {
        let sample = stamp(self.sampler.capture());
        self.store.insert_metric_sample(&sample)?;

        if !self.registry.is_empty() {
            let payload = serde_json::to_string(&SampleView::from(&sample))?;
            self.registry.broadcast(&payload);
        }
        Ok(sample)
    }

    /// Runs for the life of the process. Failed ticks are logged and skipped.
    ///
    /// Captures and SQLite writes block, so each tick runs on the blocking
    /// pool and the loop state is handed back afterwards.
    pub async fn run(mut self) {
        tracing::info!("Metrics loop started, interval {:?}", self.interval);
        loop {
            let joined = tokio::task::spawn_blocking(move || {
                let result = self.tick();
                (self, result)
            })
            .await;

            let (this, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::error!("Metrics loop stopped: {e}");
                    return;
                }
            };
            self = this;

            if let Err(e) = result {
                tracing::warn!("Metrics tick failed: {e}");
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    struct FixedSampler(u64);

    impl Sampler for FixedSampler {
        fn capture(&mut self) -> MetricReading {
            self.0 += 1;
            MetricReading {
                heap_used_bytes: self.0,
                heap_max_bytes: 100,
                system_memory_total_bytes: 100,
                system_memory_used_bytes: 50,
                disk_total_bytes: 1000,
                disk_used_bytes: 10,
                process_cpu_load: 0.1,
                system_cpu_load: 0.5,
            }
        }
    }

    /// Blocks the calling thread on every capture.
    struct SlowSampler(FixedSampler, Duration);

    impl Sampler for SlowSampler {
        fn capture(&mut self) -> MetricReading {
            std::thread::sleep(self.1);
            self.0.capture()
        }
    }

    fn metrics_loop(registry: Arc<ObserverRegistry>) -> (Arc<SqliteStore>, MetricsLoop) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.initialize().unwrap();
        let metrics = MetricsLoop::new(
            store.clone(),
            registry,
            Box::new(FixedSampler(0)),
            Duration::from_millis(10),
        );
        (store, metrics)
    }

    #[test]
    fn test_latest_samples_after_n_ticks() {
        for (ticks, limit) in [(3, 5), (5, 3), (0, 4)] {
            let (store, mut metrics) = metrics_loop(Arc::new(ObserverRegistry::new()));
            for _ in 0..ticks {
                metrics.tick().unwrap();
            }

            let samples = latest_samples(store.as_ref(), limit).unwrap();
            assert_eq!(samples.len(), ticks.min(limit) as usize);
            assert!(samples.windows(2).all(|w| w[0].captured_at <= w[1].captured_at));
            // The newest tick is always last.
            if let Some(last) = samples.last() {
                assert_eq!(last.heap_used_bytes, ticks);
            }
        }
    }

    #[tokio::test]
    async fn test_tick_pushes_camel_case_payload() {
        let registry = Arc::new(ObserverRegistry::new());
        let (_id, mut rx) = registry.subscribe();
        let (_store, mut metrics) = metrics_loop(registry);

        metrics.tick().unwrap();

        let payload = rx.recv().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(json["heapUsedBytes"], 1);
        assert_eq!(json["systemCpuLoad"], 0.5);
        assert!(json["capturedAt"].is_string());
    }

    #[tokio::test]
    async fn test_run_keeps_ticking() {
        let (store, metrics) = metrics_loop(Arc::new(ObserverRegistry::new()));
        let handle = tokio::spawn(metrics.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(store.list_recent_metric_samples(10).unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn test_run_leaves_runtime_responsive() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.initialize().unwrap();
        let metrics = MetricsLoop::new(
            store.clone(),
            Arc::new(ObserverRegistry::new()),
            Box::new(SlowSampler(FixedSampler(0), Duration::from_millis(300))),
            Duration::from_millis(1),
        );
        let handle = tokio::spawn(metrics.run());
        tokio::task::yield_now().await;

        // Single-threaded runtime: these timers only fire on time if the
        // capture is off this thread.
        let started = std::time::Instant::now();
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(started.elapsed() < Duration::from_millis(250));

        handle.abort();
    }
}

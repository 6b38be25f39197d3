//! System metrics provider
//!
//! Memory and CPU usage for `/api/system/info`. The endpoint talks to the
//! [`SystemMetrics`] trait so tests and other platforms can plug in their own
//! source; [`ProcMetrics`] reads Linux procfs.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Interval between the two `/proc/stat` samples.
pub const CPU_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

/// Physical memory totals in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

/// Source of host resource usage.
#[async_trait]
pub trait SystemMetrics: Send + Sync {
    /// Total and used physical memory.
    async fn memory(&self) -> Result<MemoryUsage>;

    /// CPU busy percentage across all cores, 0-100.
    async fn cpu_percent(&self) -> Result<f64>;
}

/// Metrics read from `/proc/meminfo` and `/proc/stat`.
#[derive(Debug, Clone, Default)]
pub struct ProcMetrics;

#[async_trait]
impl SystemMetrics for ProcMetrics {
    async fn memory(&self) -> Result<MemoryUsage> {
        if !cfg!(target_os = "linux") {
            return Err(unsupported());
        }
        let meminfo = tokio::fs::read_to_string("/proc/meminfo").await?;
        parse_meminfo(&meminfo)
    }

    async fn cpu_percent(&self) -> Result<f64> {
        if !cfg!(target_os = "linux") {
            return Err(unsupported());
        }
        let first = parse_cpu_times(&tokio::fs::read_to_string("/proc/stat").await?)?;
        tokio::time::sleep(CPU_SAMPLE_INTERVAL).await;
        let second = parse_cpu_times(&tokio::fs::read_to_string("/proc/stat").await?)?;
        Ok(cpu_usage_between(first, second))
    }
}

fn unsupported() -> Error {
    Error::Metrics(format!(
        "unsupported operating system: {}",
        std::env::consts::OS
    ))
}

/// Parse `/proc/meminfo` into total/used bytes.
///
/// Used memory is `MemTotal - MemAvailable`; kernels without `MemAvailable`
/// fall back to `MemFree + Buffers + Cached`.
pub fn parse_meminfo(input: &str) -> Result<MemoryUsage> {
    let field = |name: &str| -> Option<u64> {
        input.lines().find_map(|line| {
            let rest = line.strip_prefix(name)?.strip_prefix(':')?;
            let kb = rest.trim().trim_end_matches("kB").trim().parse::<u64>().ok()?;
            Some(kb * 1024)
        })
    };

    let total = field("MemTotal").ok_or_else(|| Error::Metrics("MemTotal missing".to_string()))?;
    let available = match field("MemAvailable") {
        Some(available) => available,
        None => {
            field("MemFree").unwrap_or(0)
                + field("Buffers").unwrap_or(0)
                + field("Cached").unwrap_or(0)
        }
    };

    Ok(MemoryUsage {
        total_bytes: total,
        used_bytes: total.saturating_sub(available),
    })
}

/// Aggregate CPU jiffies from the `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    /// idle + iowait
    pub idle: u64,
    /// sum of all fields
    pub total: u64,
}

/// Parse the aggregate `cpu` line of `/proc/stat`.
pub fn parse_cpu_times(input: &str) -> Result<CpuTimes> {
    let line = input
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| Error::Metrics("aggregate cpu line missing".to_string()))?;

    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Error::Metrics(format!("bad cpu line: {e}")))?;

    if values.len() < 4 {
        return Err(Error::Metrics("cpu line too short".to_string()));
    }

    let iowait = values.get(4).copied().unwrap_or(0);
    Ok(CpuTimes {
        idle: values[3] + iowait,
        total: values.iter().sum(),
    })
}

/// Busy percentage between two samples; 0 when no time elapsed.
pub fn cpu_usage_between(first: CpuTimes, second: CpuTimes) -> f64 {
    let total = second.total.saturating_sub(first.total);
    if total == 0 {
        return 0.0;
    }
    let idle = second.idle.saturating_sub(first.idle);
    100.0 * (1.0 - idle as f64 / total as f64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MEMINFO: &str = "MemTotal:       16384000 kB\n\
                           MemFree:         1024000 kB\n\
                           MemAvailable:    4096000 kB\n\
                           Buffers:          512000 kB\n\
                           Cached:          2048000 kB\n";

    #[test]
    fn test_parse_meminfo() {
        let usage = parse_meminfo(MEMINFO).unwrap();
        assert_eq!(usage.total_bytes, 16_384_000 * 1024);
        assert_eq!(usage.used_bytes, (16_384_000 - 4_096_000) * 1024);
    }

    #[test]
    fn test_parse_meminfo_without_available() {
        let input = "MemTotal: 1000 kB\nMemFree: 100 kB\nBuffers: 50 kB\nCached: 250 kB\n";
        let usage = parse_meminfo(input).unwrap();
        assert_eq!(usage.used_bytes, 600 * 1024);
    }

    #[test]
    fn test_parse_meminfo_requires_total() {
        assert!(parse_meminfo("MemFree: 100 kB\n").is_err());
    }

    #[test]
    fn test_parse_cpu_times() {
        let stat = "cpu  100 0 50 800 50 0 0 0 0 0\ncpu0 50 0 25 400 25 0 0 0 0 0\n";
        let times = parse_cpu_times(stat).unwrap();
        assert_eq!(times, CpuTimes { idle: 850, total: 1000 });
    }

    #[test]
    fn test_parse_cpu_times_rejects_garbage() {
        assert!(parse_cpu_times("intr 1 2 3\n").is_err());
        assert!(parse_cpu_times("cpu 1 2 x 4\n").is_err());
        assert!(parse_cpu_times("cpu 1 2\n").is_err());
    }

    #[test]
    fn test_cpu_usage_between() {
        let first = CpuTimes { idle: 850, total: 1000 };
        let second = CpuTimes { idle: 925, total: 1100 };
        assert!((cpu_usage_between(first, second) - 25.0).abs() < f64::EPSILON);
        assert_eq!(cpu_usage_between(first, first), 0.0);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_proc_metrics_reads_host() {
        let memory = ProcMetrics.memory().await.unwrap();
        assert!(memory.total_bytes > 0);
        assert!(memory.used_bytes <= memory.total_bytes);

        let cpu = ProcMetrics.cpu_percent().await.unwrap();
        assert!((0.0..=100.0).contains(&cpu));
    }
}

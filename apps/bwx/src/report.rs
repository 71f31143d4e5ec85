//! Persisted run report
//!
//! Written at run end, always, even for cancelled or partial runs. The unit
//! mix is deliberate and load-bearing for consumers: `mbps` is MiB-based
//! (1024*1024) while `gbytes` is decimal (1e9).

use bwx_engine::RunResult;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub mode: String,
    pub urls: Vec<String>,
    pub conns: usize,
    pub duration_sec: u64,
    pub bytes: u64,
    pub mbps: f64,
    pub gbytes: f64,
    pub started_at: String,
    pub finished_at: String,
}

impl Report {
    pub fn new(
        mode: &str,
        urls: Vec<String>,
        conns: usize,
        result: &RunResult,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let bytes_f = result.bytes as f64;
        Self {
            mode: mode.to_string(),
            urls,
            conns,
            duration_sec: result.elapsed.as_secs(),
            bytes: result.bytes,
            mbps: result.average_rate() / (1024.0 * 1024.0),
            gbytes: bytes_f / 1e9,
            started_at: started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            finished_at: finished_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Serialize and write the report to `path`.
    pub async fn write(&self, path: &str) -> Result<(), bwx_errors::Error> {
        let data = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(bytes: u64, secs: u64) -> RunResult {
        RunResult {
            bytes,
            elapsed: Duration::from_secs(secs),
            last_error: None,
        }
    }

    #[test]
    fn unit_conventions_differ_on_purpose() {
        // 100 MiB over 2 seconds is 50 MiB/s
        let r = result(100 * 1024 * 1024, 2);
        let report = Report::new("download", vec![], 16, &r, Utc::now(), Utc::now());
        assert!((report.mbps - 50.0).abs() < 0.01);

        // gbytes is decimal: 2e9 bytes is 2.0 GB
        let r = result(2_000_000_000, 10);
        let report = Report::new("upload", vec![], 16, &r, Utc::now(), Utc::now());
        assert!((report.gbytes - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn report_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = Report::new(
            "download",
            vec!["http://example.com/f".to_string()],
            4,
            &result(1024, 1),
            Utc::now(),
            Utc::now(),
        );
        report.write(path.to_str().unwrap()).await.unwrap();

        let data = std::fs::read_to_string(&path).unwrap();
        let parsed: Report = serde_json::from_str(&data).unwrap();
        assert_eq!(parsed.mode, "download");
        assert_eq!(parsed.bytes, 1024);
        assert_eq!(parsed.conns, 4);
    }
}

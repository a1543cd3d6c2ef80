// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch so a run's learning curves
// can be plotted afterwards.
//
// Columns:
//   epoch                         0-based epoch index
//   alpha                         sampling temperature used
//   p_sst, p_para, p_sts          task sampling probabilities
//   train_loss                    mean loss over the epoch's steps
//   train_sst, train_para, train_sts, train_avg
//   dev_sst,   dev_para,   dev_sts,   dev_avg
//
// Accuracy for sst/para, Pearson correlation for sts.
//
// Output file: <checkpoint dir>/metrics.csv. A fresh run starts
// the file over. A resumed run keeps the rows up to the
// checkpointed epoch and appends the epochs it trains again.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "epoch,alpha,p_sst,p_para,p_sts,train_loss,\
train_sst,train_para,train_sts,train_avg,dev_sst,dev_para,dev_sts,dev_avg";

/// One row of metrics for a single epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:         usize,
    pub alpha:         f64,
    /// Indexed by `Task::index()`
    pub probabilities: [f64; 3],
    pub train_loss:    f64,
    pub train:         [f64; 3],
    pub dev:           [f64; 3],
}

impl EpochMetrics {
    pub fn train_average(&self) -> f64 {
        self.train.iter().sum::<f64>() / 3.0
    }

    pub fn dev_average(&self) -> f64 {
        self.dev.iter().sum::<f64>() / 3.0
    }

    /// Strictly better than the best dev average so far
    pub fn is_improvement(&self, best_dev_average: f64) -> bool {
        self.dev_average() > best_dev_average
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start a new log in `dir`, discarding rows from any earlier run
    pub fn create(dir: &Path) -> Result<Self> {
        let csv_path = prepare(dir)?;
        write_log(&csv_path, &[])?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        Ok(Self { csv_path })
    }

    /// Reopen the log of a resumed run. Rows after `last_epoch`
    /// belong to epochs that are about to be trained again.
    pub fn resume(dir: &Path, last_epoch: usize) -> Result<Self> {
        let csv_path = prepare(dir)?;
        let kept: Vec<String> = match fs::read_to_string(&csv_path) {
            Ok(text) => text
                .lines()
                .skip(1)
                .filter(|row| {
                    row.split(',')
                        .next()
                        .and_then(|e| e.parse::<usize>().ok())
                        .is_some_and(|e| e <= last_epoch)
                })
                .map(str::to_owned)
                .collect(),
            Err(_) => Vec::new(),
        };
        write_log(&csv_path, &kept)?;
        tracing::debug!("Resumed metrics CSV with {} rows: '{}'", kept.len(), csv_path.display());
        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.alpha,
            m.probabilities[0], m.probabilities[1], m.probabilities[2],
            m.train_loss,
            m.train[0], m.train[1], m.train[2], m.train_average(),
            m.dev[0], m.dev[1], m.dev[2], m.dev_average(),
        )?;

        tracing::debug!("Logged epoch {} metrics: dev_avg={:.4}", m.epoch, m.dev_average());
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

fn prepare(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create '{}'", dir.display()))?;
    Ok(dir.join("metrics.csv"))
}

/// Header plus `rows`, replacing whatever the file held
fn write_log(csv_path: &Path, rows: &[String]) -> Result<()> {
    let mut f = fs::File::create(csv_path)
        .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
    writeln!(f, "{HEADER}")?;
    for row in rows {
        writeln!(f, "{row}")?;
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(epoch: usize, dev: [f64; 3]) -> EpochMetrics {
        EpochMetrics {
            epoch,
            alpha:         0.6,
            probabilities: [0.2, 0.5, 0.3],
            train_loss:    0.9,
            train:         [0.5, 0.7, 0.3],
            dev,
        }
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mtb-metrics-{name}-{}", std::process::id()));
        let _   = fs::remove_dir_all(&dir);
        dir
    }

    fn rows(logger: &MetricsLogger) -> Vec<String> {
        fs::read_to_string(logger.csv_path())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn test_is_improvement_is_strict() {
        let m = metrics(1, [0.3, 0.6, 0.3]);
        assert!((m.dev_average() - 0.4).abs() < 1e-12);
        assert!(m.is_improvement(0.35));
        assert!(m.is_improvement(f64::NEG_INFINITY));
        assert!(!m.is_improvement(0.5));
    }

    #[test]
    fn test_header_then_one_row_per_epoch() {
        let logger = MetricsLogger::create(&scratch("rows")).unwrap();
        logger.log(&metrics(0, [0.1, 0.2, 0.3])).unwrap();
        logger.log(&metrics(1, [0.4, 0.5, 0.6])).unwrap();

        let lines = rows(&logger);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].starts_with("0,"));
        assert!(lines[2].ends_with(",0.500000"));
    }

    #[test]
    fn test_fresh_run_discards_an_old_log() {
        let dir    = scratch("fresh");
        let logger = MetricsLogger::create(&dir).unwrap();
        logger.log(&metrics(0, [0.1, 0.2, 0.3])).unwrap();
        logger.log(&metrics(1, [0.4, 0.5, 0.6])).unwrap();

        let logger = MetricsLogger::create(&dir).unwrap();
        assert_eq!(rows(&logger), vec![HEADER.to_string()]);
    }

    #[test]
    fn test_resume_keeps_rows_up_to_the_checkpointed_epoch() {
        let dir    = scratch("resume");
        let logger = MetricsLogger::create(&dir).unwrap();
        for epoch in 0..4 {
            logger.log(&metrics(epoch, [0.1, 0.2, 0.3])).unwrap();
        }

        let logger = MetricsLogger::resume(&dir, 1).unwrap();
        logger.log(&metrics(2, [0.7, 0.8, 0.9])).unwrap();

        let lines = rows(&logger);
        let epochs: Vec<&str> = lines[1..].iter().map(|r| r.split(',').next().unwrap()).collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(epochs, vec!["0", "1", "2"]);
        assert!(lines[3].ends_with(",0.800000"));

        // No log yet: resuming starts one
        let logger = MetricsLogger::resume(&scratch("resume-empty"), 3).unwrap();
        assert_eq!(rows(&logger), vec![HEADER.to_string()]);
    }
}

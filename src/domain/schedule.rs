// ============================================================
// Layer 3 — Task Sampling Schedule
// ============================================================
// Each epoch the trainer draws tasks from a categorical
// distribution with
//
//   p(task) = size(task)^alpha / Σ size^alpha
//
// alpha anneals from alpha_start (1.0 → proportional to
// dataset size) towards alpha_end (0.2 → close to uniform),
// so the large paraphrase corpus dominates early training and
// the small corpora catch up later.
//
// Both functions are pure: the schedule has no hidden state
// beyond (epoch, total_epochs).

use serde::{Deserialize, Serialize};

use crate::domain::error::ScheduleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decay {
    Linear,
    Exponential,
}

/// Start/end temperatures plus the interpolation shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlphaSchedule {
    pub start: f64,
    pub end:   f64,
    pub decay: Decay,
}

impl Default for AlphaSchedule {
    fn default() -> Self {
        Self { start: 1.0, end: 0.2, decay: Decay::Linear }
    }
}

impl AlphaSchedule {
    pub fn alpha(&self, epoch: usize, total_epochs: usize) -> Result<f64, ScheduleError> {
        alpha(epoch, total_epochs, self.start, self.end, self.decay == Decay::Linear)
    }
}

/// Sampling temperature for `epoch` out of `total_epochs`.
///
/// Returns exactly `alpha_start` at epoch 0 and exactly
/// `alpha_end` at the final epoch in both decay modes.
pub fn alpha(
    epoch:        usize,
    total_epochs: usize,
    alpha_start:  f64,
    alpha_end:    f64,
    linear:       bool,
) -> Result<f64, ScheduleError> {
    if total_epochs <= 1 {
        return Err(ScheduleError::TooFewEpochs(total_epochs));
    }
    if epoch >= total_epochs {
        return Err(ScheduleError::EpochOutOfRange { epoch, total_epochs });
    }

    let ratio = epoch as f64 / (total_epochs - 1) as f64;

    if linear {
        // (1 - t)·a + t·b hits both endpoints without rounding drift
        Ok((1.0 - ratio) * alpha_start + ratio * alpha_end)
    } else if epoch + 1 == total_epochs {
        Ok(alpha_end)
    } else {
        Ok(alpha_start * (alpha_end / alpha_start).powf(ratio))
    }
}

/// Normalised task probabilities, one per entry of `sizes`.
pub fn probabilities(alpha: f64, sizes: &[usize]) -> Result<Vec<f64>, ScheduleError> {
    if sizes.is_empty() {
        return Err(ScheduleError::NoTasks);
    }
    if let Some(i) = sizes.iter().position(|&n| n == 0) {
        return Err(ScheduleError::EmptyDataset(i));
    }

    let scaled: Vec<f64> = sizes.iter().map(|&n| (n as f64).powf(alpha)).collect();
    let total: f64 = scaled.iter().sum();
    Ok(scaled.into_iter().map(|s| s / total).collect())
}

// ============================================================
// Layer 3 — Typed Errors
// ============================================================
// Invariant violations raised by the core. Outer layers wrap
// these in anyhow::Error with context; nothing here is retried.

use thiserror::Error;

use crate::domain::task::Task;

/// Unknown mode string (CLI value or stored config)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModeParseError {
    #[error("unknown fine-tune mode '{0}' (expected 'last-linear-layer' or 'full-model')")]
    FineTune(String),

    #[error("unknown encoding mode '{0}' (expected 'single' or 'dual')")]
    Encoding(String),
}

/// Precondition violations of the task-sampling schedule
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("annealing needs at least two epochs, got total_epochs={0}")]
    TooFewEpochs(usize),

    #[error("epoch {epoch} is outside 0..{total_epochs}")]
    EpochOutOfRange { epoch: usize, total_epochs: usize },

    #[error("cannot build a sampling distribution over zero tasks")]
    NoTasks,

    #[error("dataset for task #{0} is empty")]
    EmptyDataset(usize),
}

/// Model construction preconditions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("hidden_size ({hidden_size}) must be divisible by num_heads ({num_heads})")]
    HeadsDoNotDivideHidden { hidden_size: usize, num_heads: usize },

    #[error("number of sentiment classes must be positive")]
    NoClasses,

    #[error("dropout probability {0} is outside [0, 1)")]
    InvalidDropout(f64),

    #[error("{0} must be positive")]
    ZeroDimension(&'static str),

    #[error("vocab_size {vocab_size} has no row for token id {max_id}")]
    VocabTooSmall { vocab_size: usize, max_id: usize },
}

/// Failures of the cyclic batch streams
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("cannot cycle over an empty dataset")]
    EmptyDataset,

    #[error("batch size must be positive")]
    ZeroBatchSize,

    #[error("saved stream order covers {saved} examples but the dataset has {actual}")]
    StateMismatch { saved: usize, actual: usize },
}

/// Failures inside the training loop. None of these are retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrainError {
    #[error("non-finite loss {value} at epoch {epoch}, step {step} ({task})")]
    NonFiniteLoss { epoch: usize, step: usize, task: Task, value: f64 },

    #[error("training batch for task '{0}' has no labels")]
    MissingLabels(Task),
}

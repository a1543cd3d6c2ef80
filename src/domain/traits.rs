// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only talks to corpora and prediction
// sinks through these traits, so the TSV reader and the file
// writer can be replaced (or faked in tests) without touching
// the training workflow.

use anyhow::Result;

use crate::domain::example::{PairExample, SentenceExample, Split};
use crate::domain::task::Task;

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Anything that can produce the raw examples of every task.
///
/// Implementations:
///   - TsvCorpus → tab-separated SST / Quora / STS files
pub trait ExampleSource {
    /// Sentiment examples for a split
    fn sentences(&self, split: Split) -> Result<Vec<SentenceExample>>;

    /// Paraphrase or similarity examples for a split.
    /// Calling this with `Task::Sentiment` is an error.
    fn pairs(&self, task: Task, split: Split) -> Result<Vec<PairExample>>;
}

// ─── PredictionSink ───────────────────────────────────────────────────────────
/// Anything that can persist one task's predictions for one split.
///
/// Implementations:
///   - PredictionWriter → one delimited text file per task/split
pub trait PredictionSink {
    fn write(
        &self,
        task:        Task,
        split:       Split,
        ids:         &[String],
        predictions: &[f32],
    ) -> Result<()>;
}

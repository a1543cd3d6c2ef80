// ============================================================
// Layer 3 — Task Identity
// ============================================================
// The closed set of prediction objectives trained jointly:
//
//   Sentiment   — one sentence   → N-way class logits
//   Paraphrase  — sentence pair  → one logit (is duplicate?)
//   Similarity  — sentence pair  → one real-valued score
//
// Every place that needs per-task behaviour matches on this
// enum, so adding a task is a compile error everywhere it
// has to be handled.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Task {
    Sentiment,
    Paraphrase,
    Similarity,
}

/// How the reported per-task dev/train metric is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Accuracy,
    PearsonCorrelation,
}

impl Task {
    /// All tasks in their canonical order.
    /// Head storage, dataset sizes and sampling probabilities
    /// are all indexed in this order.
    pub const ALL: [Task; 3] = [Task::Sentiment, Task::Paraphrase, Task::Similarity];

    /// Position of this task in `Task::ALL`
    pub fn index(self) -> usize {
        match self {
            Task::Sentiment  => 0,
            Task::Paraphrase => 1,
            Task::Similarity => 2,
        }
    }

    /// Short identifier used in logs, metric columns and file names
    pub fn name(self) -> &'static str {
        match self {
            Task::Sentiment  => "sst",
            Task::Paraphrase => "para",
            Task::Similarity => "sts",
        }
    }

    /// True for the tasks that consume a sentence pair
    pub fn is_paired(self) -> bool {
        matches!(self, Task::Paraphrase | Task::Similarity)
    }

    pub fn metric_kind(self) -> MetricKind {
        match self {
            Task::Sentiment | Task::Paraphrase => MetricKind::Accuracy,
            Task::Similarity                   => MetricKind::PearsonCorrelation,
        }
    }

    /// Header line of the prediction output file for this task
    pub fn prediction_header(self) -> &'static str {
        match self {
            Task::Sentiment  => "id \t Predicted_Sentiment ",
            Task::Paraphrase => "id \t Predicted_Is_Paraphrase ",
            Task::Similarity => "id \t Predicted_Similiary ",
        }
    }

    /// Render one prediction value the way it is written to disk.
    /// Sentiment classes are integers; the paraphrase decision is a
    /// rounded probability (`0.0` / `1.0`); similarity is a raw score.
    pub fn format_prediction(self, value: f32) -> String {
        match self {
            Task::Sentiment  => format!("{}", value.round() as i64),
            Task::Paraphrase => format!("{:.1}", value.round()),
            Task::Similarity => format!("{value:?}"),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_canonical_order() {
        for (i, task) in Task::ALL.iter().enumerate() {
            assert_eq!(task.index(), i);
        }
    }

    #[test]
    fn test_only_pair_tasks_are_paired() {
        assert!(!Task::Sentiment.is_paired());
        assert!(Task::Paraphrase.is_paired());
        assert!(Task::Similarity.is_paired());
    }

    #[test]
    fn test_format_prediction() {
        assert_eq!(Task::Sentiment.format_prediction(3.0), "3");
        assert_eq!(Task::Paraphrase.format_prediction(1.0), "1.0");
        assert_eq!(Task::Paraphrase.format_prediction(0.0), "0.0");
        assert_eq!(Task::Similarity.format_prediction(2.5), "2.5");
        assert_eq!(Task::Similarity.format_prediction(3.0), "3.0");
    }
}

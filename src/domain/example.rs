// ============================================================
// Layer 3 — Raw Examples
// ============================================================
// Sentences as they come out of the corpus files, before
// tokenisation. `label` is None for test splits, whose labels
// are withheld.

use serde::{Deserialize, Serialize};

/// Which part of a corpus is being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Dev,
    Test,
}

impl Split {
    pub fn has_labels(self) -> bool {
        !matches!(self, Split::Test)
    }

    pub fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Dev   => "dev",
            Split::Test  => "test",
        }
    }
}

/// One sentiment example: a sentence and its class index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceExample {
    pub id:       String,
    pub sentence: String,
    pub label:    Option<usize>,
}

/// One paraphrase or similarity example.
/// Paraphrase labels are 0.0 / 1.0; similarity labels are scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairExample {
    pub id:        String,
    pub sentence1: String,
    pub sentence2: String,
    pub label:     Option<f32>,
}

/// Number of distinct sentiment classes present in a set of examples
pub fn count_classes(examples: &[SentenceExample]) -> usize {
    let mut seen: Vec<usize> = examples.iter().filter_map(|e| e.label).collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

// ============================================================
// Layer 4 — Tokenised Datasets
// ============================================================
// Turns raw examples into token-id items and exposes them
// through Burn's Dataset trait, so the same collection can be
// consumed both by a DataLoader (evaluation) and by the
// trainer's cyclic streams.
//
// Items are truncated to max_seq_len but NOT padded: padding
// happens per batch in the batcher, to the longest sequence
// of that batch.

use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::domain::example::{PairExample, SentenceExample, Split};
use crate::domain::task::Task;
use crate::domain::traits::ExampleSource;

/// One tokenised sentiment example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceItem {
    pub token_ids: Vec<u32>,
    pub label:     Option<usize>,
    pub sent_id:   String,
}

/// One tokenised sentence pair. Both sentences are encoded
/// independently; they are never joined into one sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairItem {
    pub token_ids_1: Vec<u32>,
    pub token_ids_2: Vec<u32>,
    pub label:       Option<f32>,
    pub sent_id:     String,
}

/// Tokenises sentences with [CLS]/[SEP] and truncates them
pub struct TextEncoder<'a> {
    tokenizer:   &'a Tokenizer,
    max_seq_len: usize,
}

impl<'a> TextEncoder<'a> {
    pub fn new(tokenizer: &'a Tokenizer, max_seq_len: usize) -> Self {
        Self { tokenizer, max_seq_len }
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let enc = self.tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        let mut ids = enc.get_ids().to_vec();
        if ids.len() > self.max_seq_len {
            // Keep the final [SEP] so every sequence stays well-formed
            let sep = ids[ids.len() - 1];
            ids.truncate(self.max_seq_len);
            if let Some(last) = ids.last_mut() {
                *last = sep;
            }
        }
        Ok(ids)
    }
}

// ─── SentenceDataset ──────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SentenceDataset {
    items: Vec<SentenceItem>,
}

impl SentenceDataset {
    pub fn new(items: Vec<SentenceItem>) -> Self {
        Self { items }
    }

    pub fn from_examples(examples: &[SentenceExample], encoder: &TextEncoder) -> Result<Self> {
        let items = examples
            .iter()
            .map(|e| Ok(SentenceItem {
                token_ids: encoder.encode(&e.sentence)?,
                label:     e.label,
                sent_id:   e.id.clone(),
            }))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(items))
    }
}

impl Dataset<SentenceItem> for SentenceDataset {
    fn get(&self, index: usize) -> Option<SentenceItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

// ─── PairDataset ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct PairDataset {
    items: Vec<PairItem>,
}

impl PairDataset {
    pub fn new(items: Vec<PairItem>) -> Self {
        Self { items }
    }

    pub fn from_examples(examples: &[PairExample], encoder: &TextEncoder) -> Result<Self> {
        let items = examples
            .iter()
            .map(|e| Ok(PairItem {
                token_ids_1: encoder.encode(&e.sentence1)?,
                token_ids_2: encoder.encode(&e.sentence2)?,
                label:       e.label,
                sent_id:     e.id.clone(),
            }))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(items))
    }
}

impl Dataset<PairItem> for PairDataset {
    fn get(&self, index: usize) -> Option<PairItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

// ─── TaskDatasets ─────────────────────────────────────────────────────────────
/// The three tokenised datasets of one split
#[derive(Debug, Clone)]
pub struct TaskDatasets {
    pub sentiment:  SentenceDataset,
    pub paraphrase: PairDataset,
    pub similarity: PairDataset,
}

impl TaskDatasets {
    /// Load and tokenise every task of `split` from a corpus
    pub fn load(source: &dyn ExampleSource, split: Split, encoder: &TextEncoder) -> Result<Self> {
        let datasets = Self::encode(
            &source.sentences(split)?,
            &source.pairs(Task::Paraphrase, split)?,
            &source.pairs(Task::Similarity, split)?,
            encoder,
        )?;
        let [sst, para, sts] = datasets.sizes();
        tracing::info!(
            "Loaded {} split: {} sst, {} para, {} sts examples",
            split.name(), sst, para, sts,
        );
        Ok(datasets)
    }

    /// Tokenise examples that were already read
    pub fn encode(
        sentiment:  &[SentenceExample],
        paraphrase: &[PairExample],
        similarity: &[PairExample],
        encoder:    &TextEncoder,
    ) -> Result<Self> {
        Ok(Self {
            sentiment:  SentenceDataset::from_examples(sentiment, encoder)?,
            paraphrase: PairDataset::from_examples(paraphrase, encoder)?,
            similarity: PairDataset::from_examples(similarity, encoder)?,
        })
    }

    /// Example counts in `Task::ALL` order
    pub fn sizes(&self) -> [usize; 3] {
        [self.sentiment.len(), self.paraphrase.len(), self.similarity.len()]
    }
}

// ============================================================
// Layer 4 — Batchers
// ============================================================
// Implements Burn's Batcher trait to collate tokenised items
// into device tensors:
//
//   Vec<SentenceItem> → SentenceBatch   (token_ids, attention_mask)
//   Vec<PairItem>     → PairBatch       (…_1 and …_2 for each side)
//
// Sequences are padded with [PAD] to the longest sequence in
// the batch; the attention mask is 1 for real tokens and 0 for
// padding. Tensors are created directly on the batcher's device,
// which is where the host-to-device transfer happens.
//
// Labels are None when the items carry no labels (test splits).

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::{PairItem, SentenceItem};
use crate::domain::task::Task;
use crate::infra::tokenizer_store::PAD_ID;

// ─── Batches ──────────────────────────────────────────────────────────────────
/// A batch of single sentences (sentiment)
#[derive(Debug, Clone)]
pub struct SentenceBatch<B: Backend> {
    /// [batch_size, seq_len]
    pub token_ids:      Tensor<B, 2, Int>,
    /// [batch_size, seq_len], 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,
    /// [batch_size] class indices
    pub labels:         Option<Tensor<B, 1, Int>>,
    pub sent_ids:       Vec<String>,
}

/// A batch of sentence pairs (paraphrase, similarity).
/// The two sides are padded independently.
#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    pub token_ids_1:      Tensor<B, 2, Int>,
    pub attention_mask_1: Tensor<B, 2, Int>,
    pub token_ids_2:      Tensor<B, 2, Int>,
    pub attention_mask_2: Tensor<B, 2, Int>,
    /// [batch_size] 0/1 for paraphrase, real scores for similarity
    pub labels:           Option<Tensor<B, 1>>,
    pub sent_ids:         Vec<String>,
}

impl<B: Backend> SentenceBatch<B> {
    pub fn len(&self) -> usize {
        self.sent_ids.len()
    }
}

impl<B: Backend> PairBatch<B> {
    pub fn len(&self) -> usize {
        self.sent_ids.len()
    }
}

/// A batch tagged with the task it was drawn for
#[derive(Debug, Clone)]
pub enum TaskBatch<B: Backend> {
    Sentiment(SentenceBatch<B>),
    Paraphrase(PairBatch<B>),
    Similarity(PairBatch<B>),
}

impl<B: Backend> TaskBatch<B> {
    pub fn task(&self) -> Task {
        match self {
            TaskBatch::Sentiment(_)  => Task::Sentiment,
            TaskBatch::Paraphrase(_) => Task::Paraphrase,
            TaskBatch::Similarity(_) => Task::Similarity,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TaskBatch::Sentiment(b) => b.len(),
            TaskBatch::Paraphrase(b) | TaskBatch::Similarity(b) => b.len(),
        }
    }
}

// ─── Padding ──────────────────────────────────────────────────────────────────
/// Pad token sequences to a common length and build the matching mask.
fn pad_sequences<B: Backend>(
    sequences: &[&[u32]],
    device:    &B::Device,
) -> (Tensor<B, 2, Int>, Tensor<B, 2, Int>) {
    let batch_size = sequences.len();
    let seq_len    = sequences.iter().map(|s| s.len()).max().unwrap_or(0).max(1);

    let mut ids  = Vec::with_capacity(batch_size * seq_len);
    let mut mask = Vec::with_capacity(batch_size * seq_len);
    for seq in sequences {
        ids.extend(seq.iter().map(|&t| t as i64));
        ids.extend(std::iter::repeat(PAD_ID as i64).take(seq_len - seq.len()));
        mask.extend(std::iter::repeat(1i64).take(seq.len()));
        mask.extend(std::iter::repeat(0i64).take(seq_len - seq.len()));
    }

    let token_ids = Tensor::<B, 2, Int>::from_data(
        TensorData::new(ids, [batch_size, seq_len]), device,
    );
    let attention_mask = Tensor::<B, 2, Int>::from_data(
        TensorData::new(mask, [batch_size, seq_len]), device,
    );
    (token_ids, attention_mask)
}

// ─── SentenceBatcher ──────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct SentenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SentenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SentenceItem, SentenceBatch<B>> for SentenceBatcher<B> {
    fn batch(&self, items: Vec<SentenceItem>) -> SentenceBatch<B> {
        let seqs: Vec<&[u32]> = items.iter().map(|i| i.token_ids.as_slice()).collect();
        let (token_ids, attention_mask) = pad_sequences::<B>(&seqs, &self.device);

        let labels: Option<Vec<i64>> = items
            .iter()
            .map(|i| i.label.map(|l| l as i64))
            .collect();
        let labels = labels.map(|l| {
            let n = l.len();
            Tensor::<B, 1, Int>::from_data(TensorData::new(l, [n]), &self.device)
        });

        SentenceBatch {
            token_ids,
            attention_mask,
            labels,
            sent_ids: items.into_iter().map(|i| i.sent_id).collect(),
        }
    }
}

// ─── PairBatcher ──────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct PairBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> PairBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<PairItem, PairBatch<B>> for PairBatcher<B> {
    fn batch(&self, items: Vec<PairItem>) -> PairBatch<B> {
        let first:  Vec<&[u32]> = items.iter().map(|i| i.token_ids_1.as_slice()).collect();
        let second: Vec<&[u32]> = items.iter().map(|i| i.token_ids_2.as_slice()).collect();
        let (token_ids_1, attention_mask_1) = pad_sequences::<B>(&first, &self.device);
        let (token_ids_2, attention_mask_2) = pad_sequences::<B>(&second, &self.device);

        let labels: Option<Vec<f32>> = items.iter().map(|i| i.label).collect();
        let labels = labels.map(|l| {
            let n = l.len();
            Tensor::<B, 1>::from_data(TensorData::new(l, [n]), &self.device)
        });

        PairBatch {
            token_ids_1,
            attention_mask_1,
            token_ids_2,
            attention_mask_2,
            labels,
            sent_ids: items.into_iter().map(|i| i.sent_id).collect(),
        }
    }
}

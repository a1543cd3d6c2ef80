// ============================================================
// Layer 5 — Task Losses
// ============================================================
//   sentiment   cross-entropy over logits, summed then divided
//               by the configured batch size
//   paraphrase  binary cross-entropy on the raw logit
//   similarity  mean squared error against the gold score
//
// The sentiment normaliser is the configured batch size even
// when the last batch of a pass is smaller.

use burn::{
    nn::loss::{BinaryCrossEntropyLossConfig, CrossEntropyLossConfig, MseLoss, Reduction},
    prelude::*,
};

/// logits: [n, num_labels], labels: [n] class indices
pub fn sentiment_loss<B: Backend>(
    logits:     Tensor<B, 2>,
    labels:     Tensor<B, 1, Int>,
    batch_size: usize,
) -> Tensor<B, 1> {
    let n = labels.dims()[0];
    let mean = CrossEntropyLossConfig::new()
        .init(&logits.device())
        .forward(logits, labels);
    // mean × n = sum over the batch
    mean.mul_scalar(n as f64 / batch_size.max(1) as f64)
}

/// logits: [n], labels: [n] with values 0.0 / 1.0
pub fn paraphrase_loss<B: Backend>(logits: Tensor<B, 1>, labels: Tensor<B, 1>) -> Tensor<B, 1> {
    BinaryCrossEntropyLossConfig::new()
        .with_logits(true)
        .init(&logits.device())
        .forward(logits, labels.int())
}

/// scores: [n], labels: [n] real-valued
pub fn similarity_loss<B: Backend>(scores: Tensor<B, 1>, labels: Tensor<B, 1>) -> Tensor<B, 1> {
    MseLoss::new().forward(scores, labels, Reduction::Mean)
}

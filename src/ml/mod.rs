// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model, loss, evaluation and training code.
//
//   encoder.rs   — BERT-style transformer encoder behind the
//                  SequenceEncoder trait (token + position
//                  embeddings, masked self-attention, pooler)
//
//   heads.rs     — per-task linear heads and their widths
//
//   model.rs     — MultitaskModel: shared encoder + heads,
//                  one prediction entry point per task
//
//   loss.rs      — cross-entropy / BCE-with-logits / MSE
//
//   evaluator.rs — accuracy and Pearson scoring, test-time
//                  prediction
//
//   trainer.rs   — annealed task sampling over endless
//                  per-task streams, AdamW, checkpointing

/// Shared sequence encoder
pub mod encoder;

/// Task head definitions
pub mod heads;

/// Multitask model and its config
pub mod model;

/// Per-task loss functions
pub mod loss;

/// Metrics and prediction collection
pub mod evaluator;

/// Multitask training loop
pub mod trainer;

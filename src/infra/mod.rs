// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several other layers:
//
//   checkpoint.rs      — best-model checkpoints: model and
//                        optimizer records plus a JSON state
//                        file (config, args, RNG, streams)
//
//   tokenizer_store.rs — loads a HuggingFace tokenizer or
//                        builds a word-level one from the
//                        training sentences, and saves it
//                        beside the checkpoint
//
//   seed.rs            — seeds the general, numeric and
//                        device RNGs for a run
//
//   metrics.rs         — per-epoch metrics CSV
//
//   predictions.rs     — dev/test prediction files

/// Checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer loading, building and saving
pub mod tokenizer_store;

/// RNG seeding and state capture
pub mod seed;

/// Training metrics CSV logger
pub mod metrics;

/// Prediction file writer
pub mod predictions;

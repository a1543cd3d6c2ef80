// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from tab-separated corpus files to device-ready
// tensor batches.
//
//   TSV files (SST / Quora / STS)
//       │
//       ▼
//   TsvCorpus          → reads rows, cleans sentences
//       │
//       ▼
//   TextEncoder        → token ids with [CLS] … [SEP]
//       │
//       ▼
//   Sentence/PairDataset → Burn Dataset, one per task
//       │
//       ├──► DataLoader         (evaluation, finite)
//       │
//       └──► CyclicBatchStream  (training, endless)
//               │
//               ▼
//           Sentence/PairBatcher → padded tensors + masks

/// Reads the task corpora from TSV files
pub mod loader;

/// Lowercases and normalises raw sentences
pub mod preprocessor;

/// Tokenised datasets implementing Burn's Dataset trait
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Endless reshuffling batch stream for the trainer
pub mod stream;

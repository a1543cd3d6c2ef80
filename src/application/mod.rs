// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one command:
//
//   train   → TrainUseCase
//   predict → PredictUseCase
//
// Only workflow coordination lives here: no model math and
// no argument parsing.

/// Run configuration shared by both use cases
pub mod config;

/// The training workflow
pub mod train_use_case;

/// The prediction workflow
pub mod predict_use_case;

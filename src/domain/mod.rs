// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types that define what the system talks about:
// tasks, modes, raw examples, the sampling schedule and the
// typed errors of the core.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only plain structs, enums, traits and pure functions

/// The closed set of trained tasks
pub mod task;

/// Fine-tune and encoding switches
pub mod modes;

/// Sentences and sentence pairs before tokenisation
pub mod example;

/// Alpha annealing and task sampling probabilities
pub mod schedule;

/// Typed invariant-violation errors
pub mod error;

/// Abstractions implemented by the data and infra layers
pub mod traits;

// ============================================================
// Layer 5 — Task Heads
// ============================================================
// One linear layer per task, stored in Task::ALL order so the
// model dispatches with `heads[task.index()]`.
//
//   task        in features                      out features
//   ─────────   ──────────────────────────────   ────────────
//   sentiment   hidden                           num_labels
//   paraphrase  hidden × pooled_inputs(mode)     1
//   similarity  hidden × pooled_inputs(mode)     1
//
// pooled_inputs is 2 in dual encoding (two pooled vectors are
// concatenated) and 1 in single encoding.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};

use crate::domain::modes::EncodingMode;
use crate::domain::task::Task;

/// Input width of a task's head
pub fn head_input_width(task: Task, hidden_size: usize, mode: EncodingMode) -> usize {
    if task.is_paired() {
        hidden_size * mode.pooled_inputs()
    } else {
        hidden_size
    }
}

/// Output width of a task's head
pub fn head_output_width(task: Task, num_labels: usize) -> usize {
    match task {
        Task::Sentiment                     => num_labels,
        Task::Paraphrase | Task::Similarity => 1,
    }
}

/// Build every head, indexed by `Task::index()`
pub fn init_heads<B: Backend>(
    hidden_size: usize,
    num_labels:  usize,
    mode:        EncodingMode,
    device:      &B::Device,
) -> Vec<Linear<B>> {
    Task::ALL
        .iter()
        .map(|&task| {
            LinearConfig::new(
                head_input_width(task, hidden_size, mode),
                head_output_width(task, num_labels),
            )
            .init(device)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_widths() {
        assert_eq!(head_input_width(Task::Sentiment, 768, EncodingMode::Dual), 768);
        assert_eq!(head_input_width(Task::Paraphrase, 768, EncodingMode::Dual), 1536);
        assert_eq!(head_input_width(Task::Similarity, 768, EncodingMode::Single), 768);
        assert_eq!(head_output_width(Task::Sentiment, 5), 5);
        assert_eq!(head_output_width(Task::Similarity, 5), 1);
    }
}

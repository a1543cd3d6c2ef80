// ============================================================
// Layer 4 — Cyclic Batch Stream
// ============================================================
// An endless, shuffled supply of batches over a finite dataset.
//
// State: { dataset, shuffled order, position, rng }
//
//   next_batch():
//     position == len  →  reshuffle order, position = 0
//     take order[position .. position + batch_size]
//     position += taken
//
// Every pass is a fresh permutation, so each example is seen
// exactly once per pass and the stream never runs dry. The
// last batch of a pass may be smaller than batch_size.
//
// The state is plain data (`StreamState`) so the trainer can
// store it in a checkpoint and restore the exact position.

use burn::data::{dataloader::batcher::Batcher, dataset::Dataset};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::error::StreamError;

/// Snapshot of a stream's position, for checkpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    pub order:    Vec<usize>,
    pub position: usize,
    pub passes:   usize,
    pub rng:      ChaCha8Rng,
}

pub struct CyclicBatchStream<I, O> {
    dataset:    Arc<dyn Dataset<I>>,
    batcher:    Arc<dyn Batcher<I, O>>,
    batch_size: usize,
    order:      Vec<usize>,
    position:   usize,
    passes:     usize,
    rng:        ChaCha8Rng,
}

impl<I, O> CyclicBatchStream<I, O> {
    pub fn new(
        dataset:    Arc<dyn Dataset<I>>,
        batcher:    Arc<dyn Batcher<I, O>>,
        batch_size: usize,
        mut rng:    ChaCha8Rng,
    ) -> Result<Self, StreamError> {
        if dataset.is_empty() {
            return Err(StreamError::EmptyDataset);
        }
        if batch_size == 0 {
            return Err(StreamError::ZeroBatchSize);
        }

        let mut order: Vec<usize> = (0..dataset.len()).collect();
        order.shuffle(&mut rng);

        Ok(Self { dataset, batcher, batch_size, order, position: 0, passes: 0, rng })
    }

    /// Next batch, reshuffling first if the current pass is exhausted.
    pub fn next_batch(&mut self) -> O {
        let indices = self.next_indices();
        let items: Vec<I> = indices
            .iter()
            .filter_map(|&i| self.dataset.get(i))
            .collect();
        self.batcher.batch(items)
    }

    /// Advance the stream and return the dataset indices of the next batch.
    fn next_indices(&mut self) -> Vec<usize> {
        if self.position >= self.order.len() {
            self.order.shuffle(&mut self.rng);
            self.position = 0;
            self.passes  += 1;
        }
        let end = (self.position + self.batch_size).min(self.order.len());
        let indices = self.order[self.position..end].to_vec();
        self.position = end;
        indices
    }

    /// Number of completed passes over the dataset
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn state(&self) -> StreamState {
        StreamState {
            order:    self.order.clone(),
            position: self.position,
            passes:   self.passes,
            rng:      self.rng.clone(),
        }
    }

    /// Resume from a saved state. The saved order must cover the same dataset.
    pub fn restore(&mut self, state: StreamState) -> Result<(), StreamError> {
        if state.order.len() != self.dataset.len() || state.position > state.order.len() {
            return Err(StreamError::StateMismatch {
                saved:  state.order.len(),
                actual: self.dataset.len(),
            });
        }
        self.order    = state.order;
        self.position = state.position;
        self.passes   = state.passes;
        self.rng      = state.rng;
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::dataset::InMemDataset;
    use rand::SeedableRng;
    use std::collections::HashSet;

    /// Collates items into a plain Vec so batches can be inspected
    struct CollectBatcher;

    impl Batcher<usize, Vec<usize>> for CollectBatcher {
        fn batch(&self, items: Vec<usize>) -> Vec<usize> {
            items
        }
    }

    fn stream(len: usize, batch_size: usize, seed: u64) -> CyclicBatchStream<usize, Vec<usize>> {
        CyclicBatchStream::<usize, Vec<usize>>::new(
            Arc::new(InMemDataset::new((0..len).collect::<Vec<_>>())),
            Arc::new(CollectBatcher),
            batch_size,
            ChaCha8Rng::seed_from_u64(seed),
        )
        .unwrap()
    }

    #[test]
    fn test_never_exhausts() {
        let mut s = stream(5, 2, 0);
        for _ in 0..1000 {
            let batch = s.next_batch();
            assert!(!batch.is_empty() && batch.len() <= 2);
        }
        assert!(s.passes() > 0);
    }

    #[test]
    fn test_each_pass_visits_every_example_once() {
        let len   = 23;
        let mut s = stream(len, 4, 7);
        for _pass in 0..5 {
            let mut seen = HashSet::new();
            while seen.len() < len {
                for i in s.next_batch() {
                    assert!(seen.insert(i), "example {i} repeated within a pass");
                }
            }
        }
    }

    #[test]
    fn test_last_batch_of_pass_is_partial() {
        let mut s = stream(5, 2, 1);
        let sizes: Vec<usize> = (0..3).map(|_| s.next_batch().len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_restore_reproduces_the_sequence() {
        let mut a = stream(10, 3, 42);
        a.next_batch();
        a.next_batch();
        let saved = a.state();

        let expected: Vec<Vec<usize>> = (0..8).map(|_| a.next_batch()).collect();

        let mut b = stream(10, 3, 999);
        b.restore(saved).unwrap();
        let replayed: Vec<Vec<usize>> = (0..8).map(|_| b.next_batch()).collect();
        assert_eq!(expected, replayed);
    }

    #[test]
    fn test_restore_rejects_other_dataset() {
        let saved = stream(10, 3, 0).state();
        let mut other = stream(4, 3, 0);
        assert_eq!(
            other.restore(saved),
            Err(StreamError::StateMismatch { saved: 10, actual: 4 })
        );
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let result = CyclicBatchStream::new(
            Arc::new(InMemDataset::new(Vec::<usize>::new())),
            Arc::new(CollectBatcher),
            2,
            ChaCha8Rng::seed_from_u64(0),
        );
        assert!(matches!(result, Err(StreamError::EmptyDataset)));
    }
}

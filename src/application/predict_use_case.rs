// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Loads the best checkpoint of a run and writes predictions:
//
//   Step 1: Rebuild the model from the checkpoint   (Layer 6)
//   Step 2: Load the run's tokenizer                (Layer 6)
//   Step 3: Tokenise dev and test                   (Layer 4)
//   Step 4: Score dev, write dev predictions        (Layer 5)
//   Step 5: Predict test (shuffled), write them     (Layer 5)
//
// No autodiff backend is involved; dropout is inactive.

use anyhow::{bail, Result};
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu};
use burn::prelude::*;
use rand::Rng;

use crate::application::config::RunConfig;
use crate::data::{
    dataset::{TaskDatasets, TextEncoder},
    loader::TsvCorpus,
};
use crate::domain::example::Split;
use crate::domain::task::Task;
use crate::domain::traits::{ExampleSource, PredictionSink};
use crate::infra::{
    checkpoint::Checkpointer, predictions::PredictionWriter, seed::seed_everything,
    tokenizer_store::{id_space, TokenizerStore},
};
use crate::ml::evaluator::{evaluate, predict, MultitaskEvaluation, TaskLoaders};

pub struct PredictUseCase {
    config: RunConfig,
}

impl PredictUseCase {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Returns the dev evaluation of the loaded model
    pub fn execute(&self) -> Result<MultitaskEvaluation> {
        let cfg    = &self.config;
        let corpus = TsvCorpus::new(cfg.corpus.clone());
        let writer = PredictionWriter::new(cfg.dev_out.clone(), cfg.test_out.clone());

        if cfg.use_gpu {
            self.run::<Wgpu>(&corpus, &writer, &WgpuDevice::default())
        } else {
            self.run::<NdArray>(&corpus, &writer, &NdArrayDevice::Cpu)
        }
    }

    pub fn run<B: Backend>(
        &self,
        source: &dyn ExampleSource,
        sink:   &dyn PredictionSink,
        device: &B::Device,
    ) -> Result<MultitaskEvaluation> {
        let cfg     = &self.config;
        let mut rng = seed_everything::<B>(cfg.seed);

        // ── Step 1–2: Model and tokenizer of the run ──────────────────────────
        let checkpointer        = Checkpointer::new(&cfg.checkpoint_dir);
        let (model_config, model) = checkpointer.load_model::<B>(device)?;
        let tokenizer = TokenizerStore::new(&cfg.checkpoint_dir).load(cfg.tokenizer.as_deref())?;
        if id_space(&tokenizer) > model_config.vocab_size {
            bail!(
                "Tokenizer emits ids up to {} but the checkpoint embeds only {}",
                id_space(&tokenizer) - 1, model_config.vocab_size,
            );
        }

        // ── Step 3: Dev and test datasets ─────────────────────────────────────
        let encoder = TextEncoder::new(&tokenizer, model_config.max_seq_len);
        let dev     = TaskDatasets::load(source, Split::Dev, &encoder)?;
        let test    = TaskDatasets::load(source, Split::Test, &encoder)?;

        // ── Step 4: Dev metrics and predictions ───────────────────────────────
        let dev_loaders = TaskLoaders::<B>::sequential(&dev, cfg.batch_size, device);
        let dev_eval    = evaluate(&dev_loaders, &model)?;
        for task in Task::ALL {
            let p = &dev_eval.get(task).predictions;
            sink.write(task, Split::Dev, &p.ids, &p.predictions)?;
        }

        // ── Step 5: Test predictions ──────────────────────────────────────────
        let test_loaders = TaskLoaders::<B>::shuffled(&test, cfg.batch_size, rng.numeric.gen(), device);
        for (task, p) in Task::ALL.into_iter().zip(predict(&test_loaders, &model)?) {
            sink.write(task, Split::Test, &p.ids, &p.predictions)?;
        }

        tracing::info!("Wrote dev and test predictions for all tasks");
        Ok(dev_eval)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;

    use crate::application::config::EncoderGeometry;
    use crate::application::train_use_case::TrainUseCase;
    use crate::domain::example::{PairExample, SentenceExample};
    use crate::domain::modes::{EncodingMode, FineTuneMode};

    /// Small in-memory corpus; test splits carry no labels
    struct FakeCorpus;

    impl ExampleSource for FakeCorpus {
        fn sentences(&self, split: Split) -> Result<Vec<SentenceExample>> {
            Ok((0..6)
                .map(|i| SentenceExample {
                    id:       format!("{}-s{i}", split.name()),
                    sentence: format!("movie number {i} was good"),
                    label:    split.has_labels().then_some(i % 5),
                })
                .collect())
        }

        fn pairs(&self, task: Task, split: Split) -> Result<Vec<PairExample>> {
            let scale = if task == Task::Similarity { 5.0 } else { 1.0 };
            Ok((0..4)
                .map(|i| PairExample {
                    id:        format!("{}-{}{i}", split.name(), task.name()),
                    sentence1: format!("how do i learn {i}"),
                    sentence2: "what is the way to learn".into(),
                    label:     split.has_labels().then_some((i % 2) as f32 * scale),
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        written: RefCell<Vec<(Task, Split, usize)>>,
    }

    impl PredictionSink for MemorySink {
        fn write(&self, task: Task, split: Split, ids: &[String], predictions: &[f32]) -> Result<()> {
            assert_eq!(ids.len(), predictions.len());
            self.written.borrow_mut().push((task, split, ids.len()));
            Ok(())
        }
    }

    fn config(dir: PathBuf) -> RunConfig {
        RunConfig {
            checkpoint_dir:  dir,
            epochs:          2,
            steps_per_epoch: 3,
            batch_size:      4,
            lr:              1e-3,
            fine_tune_mode:  FineTuneMode::FullModel,
            encoding_mode:   EncodingMode::Single,
            geometry:        EncoderGeometry {
                vocab_size: 200, max_seq_len: 16, hidden_size: 8,
                num_heads: 2, num_layers: 1, d_ff: 16,
            },
            progress:        false,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_train_then_predict_writes_every_task_and_split() {
        let dir = std::env::temp_dir().join(format!("mtb-predict-{}", std::process::id()));
        let _   = std::fs::remove_dir_all(&dir);
        let cfg = config(dir);

        TrainUseCase::new(cfg.clone()).execute_with(&FakeCorpus).unwrap();

        let sink = MemorySink::default();
        let dev  = PredictUseCase::new(cfg)
            .run::<NdArray>(&FakeCorpus, &sink, &NdArrayDevice::Cpu)
            .unwrap();
        assert!(dev.average().is_finite());

        let written = sink.written.borrow();
        assert_eq!(written.len(), 6);
        assert!(written.contains(&(Task::Sentiment, Split::Test, 6)));
        assert!(written.contains(&(Task::Similarity, Split::Dev, 4)));
    }

    #[test]
    fn test_vocab_smaller_than_special_ids_still_trains() {
        let dir = std::env::temp_dir().join(format!("mtb-predict-vocab-{}", std::process::id()));
        let _   = std::fs::remove_dir_all(&dir);
        let mut cfg = config(dir);
        cfg.geometry.vocab_size = 64;

        let outcome = TrainUseCase::new(cfg.clone()).execute_with(&FakeCorpus).unwrap();
        assert!(outcome.best_dev_score.is_finite());

        let (model_config, _) = Checkpointer::new(&cfg.checkpoint_dir)
            .load_model::<NdArray>(&NdArrayDevice::Cpu)
            .unwrap();
        assert!(model_config.vocab_size > 103);
    }

    #[test]
    fn test_predict_without_checkpoint_fails() {
        let dir = std::env::temp_dir().join(format!("mtb-predict-none-{}", std::process::id()));
        let _   = std::fs::remove_dir_all(&dir);
        let result = PredictUseCase::new(config(dir))
            .run::<NdArray>(&FakeCorpus, &MemorySink::default(), &NdArrayDevice::Cpu);
        assert!(result.is_err());
    }
}

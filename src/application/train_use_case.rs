// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a multitask training run in order:
//
//   Step 1: Read the train corpora        (Layer 4 - data)
//   Step 2: Build / load the tokenizer    (Layer 6 - infra)
//   Step 3: Tokenise train and dev        (Layer 4 - data)
//   Step 4: Derive the model config       (Layer 5 - ml)
//   Step 5: Run the training loop         (Layer 5 - ml)
//
// The compute backend is chosen here: Autodiff<Wgpu> with
// --use-gpu, Autodiff<NdArray> on the CPU otherwise.

use anyhow::Result;
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};

use crate::application::config::RunConfig;
use crate::data::{
    dataset::{TaskDatasets, TextEncoder},
    loader::TsvCorpus,
};
use crate::domain::example::{count_classes, Split};
use crate::domain::task::Task;
use crate::domain::traits::ExampleSource;
use crate::infra::{
    checkpoint::Checkpointer,
    tokenizer_store::{id_space, TokenizerStore},
};
use crate::ml::trainer::{run_training, TrainOutcome, TrainingData};

pub struct TrainUseCase {
    config: RunConfig,
}

impl TrainUseCase {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainOutcome> {
        let cfg    = &self.config;
        let corpus = TsvCorpus::new(cfg.corpus.clone());
        self.execute_with(&corpus)
    }

    /// Run against any example source (the TSV corpus in production)
    pub fn execute_with(&self, source: &dyn ExampleSource) -> Result<TrainOutcome> {
        let cfg = &self.config;

        // ── Step 1: Raw training examples ─────────────────────────────────────
        let sst  = source.sentences(Split::Train)?;
        let para = source.pairs(Task::Paraphrase, Split::Train)?;
        let sts  = source.pairs(Task::Similarity, Split::Train)?;
        let num_labels = count_classes(&sst);
        tracing::info!(
            "Train corpora: {} sst ({} classes), {} para, {} sts",
            sst.len(), num_labels, para.len(), sts.len(),
        );

        // ── Step 2: Tokenizer ─────────────────────────────────────────────────
        // Every training sentence feeds the vocabulary when one is built.
        let texts: Vec<&str> = sst
            .iter()
            .map(|e| e.sentence.as_str())
            .chain(para.iter().chain(&sts).flat_map(|e| [e.sentence1.as_str(), e.sentence2.as_str()]))
            .collect();
        let tokenizer = TokenizerStore::new(&cfg.checkpoint_dir).resolve(
            cfg.tokenizer.as_deref(),
            &texts,
            cfg.geometry.vocab_size,
        )?;

        // ── Step 3: Tokenised datasets ────────────────────────────────────────
        let encoder = TextEncoder::new(&tokenizer, cfg.geometry.max_seq_len);
        let data = TrainingData {
            train: TaskDatasets::encode(&sst, &para, &sts, &encoder)?,
            dev:   TaskDatasets::load(source, Split::Dev, &encoder)?,
        };

        // ── Step 4: Model config ──────────────────────────────────────────────
        let model_config = cfg.model_config(num_labels, id_space(&tokenizer));
        model_config.validate()?;

        // ── Step 5: Train on the selected backend ─────────────────────────────
        let checkpointer = Checkpointer::new(&cfg.checkpoint_dir);
        if cfg.use_gpu {
            let device = WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            run_training::<Autodiff<Wgpu>>(cfg, &model_config, &data, &checkpointer, &device)
        } else {
            let device = NdArrayDevice::Cpu;
            tracing::info!("Using CPU (NdArray) backend");
            run_training::<Autodiff<NdArray>>(cfg, &model_config, &data, &checkpointer, &device)
        }
    }
}

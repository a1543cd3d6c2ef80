// ============================================================
// Layer 6 — Checkpointer
// ============================================================
// Saves and restores the best model of a run.
//
// A checkpoint is one directory, named after the run:
//
//   dual-full-model-10-0.00001-multitask/
//     model.mpk       ← model parameters
//     optim.mpk       ← AdamW moments and step counts
//     state.json      ← model config, run args, RNG + stream
//                       states, epoch, best dev score
//     tokenizer.json  ← written by TokenizerStore
//     metrics.csv     ← written by MetricsLogger
//
// Records use NamedMpkFileRecorder with FullPrecisionSettings,
// so a reloaded model reproduces its predictions exactly.
// Every save overwrites the previous files in place; nothing
// is ever deleted.
//
// Inference only needs model.mpk and the model config from
// state.json. A resumed run also restores the optimizer, the
// RNG states and the three stream positions.

use anyhow::{Context, Result};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::config::RunConfig;
use crate::data::stream::StreamState;
use crate::infra::seed::RngStates;
use crate::ml::encoder::TransformerEncoder;
use crate::ml::model::{MultitaskConfig, MultitaskModel};

type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

const MODEL_FILE: &str = "model";
const OPTIM_FILE: &str = "optim";
const STATE_FILE: &str = "state.json";

/// Everything in a checkpoint except the tensor records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointState {
    pub model_config:   MultitaskConfig,
    pub args:           RunConfig,
    pub rng:            RngStates,
    /// Indexed by `Task::index()`
    pub streams:        Vec<StreamState>,
    /// Epoch (0-based) whose dev score produced this checkpoint
    pub epoch:          usize,
    pub best_dev_score: f64,
}

pub struct Checkpointer {
    dir: PathBuf,
}

impl Checkpointer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True once a checkpoint has been written to this directory
    pub fn exists(&self) -> bool {
        self.dir.join(STATE_FILE).exists()
    }

    /// Write model, optimizer and state, replacing any previous checkpoint.
    pub fn save<B, O>(
        &self,
        model: &MultitaskModel<B>,
        optim: &O,
        state: &CheckpointState,
    ) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<MultitaskModel<B>, B>,
    {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", self.dir.display()))?;

        let recorder = CheckpointRecorder::new();
        recorder
            .record(model.clone().into_record(), self.dir.join(MODEL_FILE))
            .with_context(|| format!("Failed to save model to '{}'", self.dir.display()))?;
        recorder
            .record(optim.to_record(), self.dir.join(OPTIM_FILE))
            .with_context(|| format!("Failed to save optimizer to '{}'", self.dir.display()))?;

        let json = serde_json::to_string_pretty(state)?;
        fs::write(self.dir.join(STATE_FILE), json)
            .with_context(|| format!("Cannot write '{}'", self.dir.join(STATE_FILE).display()))?;

        tracing::info!(
            "Saved checkpoint to '{}' (epoch {}, dev score {:.4})",
            self.dir.display(), state.epoch, state.best_dev_score,
        );
        Ok(())
    }

    pub fn load_state(&self) -> Result<CheckpointState> {
        let path = self.dir.join(STATE_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read '{}'. Has this run been trained yet?", path.display())
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Corrupt checkpoint state '{}'", path.display()))
    }

    /// Rebuild the saved model for inference. RNG states are not touched.
    pub fn load_model<B: Backend>(&self, device: &B::Device) -> Result<(MultitaskConfig, MultitaskModel<B>)> {
        let state = self.load_state()?;
        let model = state.model_config.init::<B>(device)?;
        let model = self.load_weights(model, device)?;
        tracing::info!("Loaded model from '{}'", self.dir.display());
        Ok((state.model_config, model))
    }

    /// Load saved parameters into an already-built model of the same shape
    pub fn load_weights<B: Backend>(
        &self,
        model:  MultitaskModel<B>,
        device: &B::Device,
    ) -> Result<MultitaskModel<B>> {
        let path   = self.dir.join(MODEL_FILE);
        let record = CheckpointRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load model record '{}'", path.display()))?;
        Ok(model.load_record(record))
    }

    /// Load saved optimizer state into a fresh optimizer
    pub fn load_optimizer<B, O>(&self, optim: O, device: &B::Device) -> Result<O>
    where
        B: AutodiffBackend,
        O: Optimizer<MultitaskModel<B>, B>,
    {
        let path   = self.dir.join(OPTIM_FILE);
        let record = CheckpointRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load optimizer record '{}'", path.display()))?;
        Ok(optim.load_record(record))
    }
}

/// Load pretrained encoder parameters from a Burn record file
pub fn load_encoder_weights<B: Backend>(
    encoder: TransformerEncoder<B>,
    path:    &Path,
    device:  &B::Device,
) -> Result<TransformerEncoder<B>> {
    let record = CheckpointRecorder::new()
        .load(path.to_path_buf(), device)
        .with_context(|| format!("Cannot load encoder weights '{}'", path.display()))?;
    tracing::info!("Loaded pretrained encoder weights from '{}'", path.display());
    Ok(encoder.load_record(record))
}

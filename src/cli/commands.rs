// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `predict`, and
// their flags. Flags shared by both live in RunArgs and are
// flattened into each command.
//
// Mode flags parse through FromStr, so an unknown mode is
// rejected by clap before anything is loaded.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::config::{default_checkpoint_dir, EncoderGeometry, RunConfig};
use crate::data::loader::{CorpusFiles, SplitFiles};
use crate::domain::modes::{EncodingMode, FineTuneMode};
use crate::domain::schedule::{AlphaSchedule, Decay};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune the shared encoder and task heads, then predict
    Train(TrainArgs),

    /// Load the best checkpoint of a run and write dev/test predictions
    Predict(PredictArgs),
}

// ─── Corpus and output files ──────────────────────────────────────────────────
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    #[arg(long, default_value = "data/ids-sst-train.csv")]
    pub sst_train: PathBuf,
    #[arg(long, default_value = "data/ids-sst-dev.csv")]
    pub sst_dev: PathBuf,
    #[arg(long, default_value = "data/ids-sst-test-student.csv")]
    pub sst_test: PathBuf,

    #[arg(long, default_value = "data/quora-train.csv")]
    pub para_train: PathBuf,
    #[arg(long, default_value = "data/quora-dev.csv")]
    pub para_dev: PathBuf,
    #[arg(long, default_value = "data/quora-test-student.csv")]
    pub para_test: PathBuf,

    #[arg(long, default_value = "data/sts-train.csv")]
    pub sts_train: PathBuf,
    #[arg(long, default_value = "data/sts-dev.csv")]
    pub sts_dev: PathBuf,
    #[arg(long, default_value = "data/sts-test-student.csv")]
    pub sts_test: PathBuf,

    #[arg(long, default_value = "predictions/sst-dev-output.csv")]
    pub sst_dev_out: PathBuf,
    #[arg(long, default_value = "predictions/sst-test-output.csv")]
    pub sst_test_out: PathBuf,
    #[arg(long, default_value = "predictions/para-dev-output.csv")]
    pub para_dev_out: PathBuf,
    #[arg(long, default_value = "predictions/para-test-output.csv")]
    pub para_test_out: PathBuf,
    #[arg(long, default_value = "predictions/sts-dev-output.csv")]
    pub sts_dev_out: PathBuf,
    #[arg(long, default_value = "predictions/sts-test-output.csv")]
    pub sts_test_out: PathBuf,
}

impl CorpusArgs {
    fn corpus(&self) -> CorpusFiles {
        CorpusFiles {
            train: split(&self.sst_train, &self.para_train, &self.sts_train),
            dev:   split(&self.sst_dev, &self.para_dev, &self.sts_dev),
            test:  split(&self.sst_test, &self.para_test, &self.sts_test),
        }
    }
}

fn split(sst: &PathBuf, para: &PathBuf, sts: &PathBuf) -> SplitFiles {
    SplitFiles { sentiment: sst.clone(), paraphrase: para.clone(), similarity: sts.clone() }
}

// ─── Shared run flags ─────────────────────────────────────────────────────────
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub files: CorpusArgs,

    /// Checkpoint directory; derived from the run settings when omitted
    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,

    /// HuggingFace tokenizer.json; a word-level one is built when omitted
    #[arg(long)]
    pub tokenizer: Option<PathBuf>,

    #[arg(long, default_value_t = 11711)]
    pub seed: u64,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-5)]
    pub lr: f64,

    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// last-linear-layer: encoder frozen; full-model: encoder updated
    #[arg(long, default_value = "last-linear-layer")]
    pub fine_tune_mode: FineTuneMode,

    /// single: paired tasks encode sentence 1 only; dual: both, concatenated
    #[arg(long, default_value = "single")]
    pub encoding: EncodingMode,

    /// Run on the GPU through WGPU
    #[arg(long)]
    pub use_gpu: bool,
}

impl RunArgs {
    fn into_config(self) -> RunConfig {
        let checkpoint_dir = self.checkpoint_dir.unwrap_or_else(|| {
            default_checkpoint_dir(self.encoding, self.fine_tune_mode, self.epochs, self.lr)
        });
        RunConfig {
            corpus:         self.files.corpus(),
            dev_out:        split(&self.files.sst_dev_out, &self.files.para_dev_out, &self.files.sts_dev_out),
            test_out:       split(&self.files.sst_test_out, &self.files.para_test_out, &self.files.sts_test_out),
            checkpoint_dir,
            tokenizer:      self.tokenizer,
            seed:           self.seed,
            epochs:         self.epochs,
            lr:             self.lr,
            batch_size:     self.batch_size,
            fine_tune_mode: self.fine_tune_mode,
            encoding_mode:  self.encoding,
            use_gpu:        self.use_gpu,
            ..RunConfig::default()
        }
    }
}

// ─── train ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Optimiser steps per epoch
    #[arg(long, default_value_t = 10_000)]
    pub steps_per_epoch: usize,

    #[arg(long, default_value_t = 0.3)]
    pub hidden_dropout_prob: f64,

    /// Sampling temperature at the first epoch
    #[arg(long, default_value_t = 1.0)]
    pub alpha_start: f64,

    /// Sampling temperature at the last epoch
    #[arg(long, default_value_t = 0.2)]
    pub alpha_end: f64,

    /// Anneal alpha geometrically instead of linearly
    #[arg(long)]
    pub exponential_decay: bool,

    /// Burn record with pretrained encoder weights
    #[arg(long)]
    pub encoder_weights: Option<PathBuf>,

    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    #[arg(long, default_value_t = 512)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 768)]
    pub hidden_size: usize,

    /// hidden_size must be divisible by num_heads
    #[arg(long, default_value_t = 12)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 12)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 3072)]
    pub d_ff: usize,

    /// Continue from the checkpoint in the run's directory
    #[arg(long)]
    pub resume: bool,

    /// Hide the per-epoch progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Do not run `predict` after training
    #[arg(long)]
    pub skip_predict: bool,
}

/// Convert CLI TrainArgs into the application-layer RunConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for RunConfig {
    fn from(a: TrainArgs) -> Self {
        RunConfig {
            steps_per_epoch:     a.steps_per_epoch,
            hidden_dropout_prob: a.hidden_dropout_prob,
            schedule:            AlphaSchedule {
                start: a.alpha_start,
                end:   a.alpha_end,
                decay: if a.exponential_decay { Decay::Exponential } else { Decay::Linear },
            },
            encoder_weights:     a.encoder_weights,
            geometry:            EncoderGeometry {
                vocab_size:  a.vocab_size,
                max_seq_len: a.max_seq_len,
                hidden_size: a.hidden_size,
                num_heads:   a.num_heads,
                num_layers:  a.num_layers,
                d_ff:        a.d_ff,
            },
            resume:              a.resume,
            progress:            !a.no_progress,
            ..a.run.into_config()
        }
    }
}

// ─── predict ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct PredictArgs {
    #[command(flatten)]
    pub run: RunArgs,
}

impl From<PredictArgs> for RunConfig {
    fn from(a: PredictArgs) -> Self {
        a.run.into_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["multitask-bert", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert!(!args.skip_predict);
        let cfg: RunConfig = args.into();
        assert_eq!(cfg, RunConfig::default());
    }

    #[test]
    fn test_modes_and_paths_flow_into_config() {
        let cli = Cli::try_parse_from([
            "multitask-bert", "train",
            "--fine-tune-mode", "full-model",
            "--encoding", "dual",
            "--epochs", "4",
            "--exponential-decay",
            "--sts-dev-out", "out/sts.csv",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: RunConfig = args.into();
        assert_eq!(cfg.fine_tune_mode, FineTuneMode::FullModel);
        assert_eq!(cfg.encoding_mode, EncodingMode::Dual);
        assert_eq!(cfg.schedule.decay, Decay::Exponential);
        assert_eq!(cfg.dev_out.similarity, PathBuf::from("out/sts.csv"));
        assert_eq!(cfg.checkpoint_dir, PathBuf::from("dual-full-model-4-0.00001-multitask"));
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["multitask-bert", "train", "--fine-tune-mode", "half"]).is_err());
        assert!(Cli::try_parse_from(["multitask-bert", "predict", "--encoding", "triple"]).is_err());
    }
}

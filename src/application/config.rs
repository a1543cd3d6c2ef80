// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// Everything one `train` or `predict` run needs, independent
// of how it was supplied. The CLI converts its arguments into
// a RunConfig; the checkpoint stores it as the run's "args".
//
// Serialisable so a resumed run can be compared against, and a
// later `predict` can find the output paths of the original run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::loader::{CorpusFiles, SplitFiles};
use crate::domain::modes::{EncodingMode, FineTuneMode};
use crate::domain::schedule::AlphaSchedule;
use crate::ml::model::MultitaskConfig;

/// Encoder shape. BERT-base unless overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderGeometry {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub hidden_size: usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
}

impl Default for EncoderGeometry {
    fn default() -> Self {
        Self {
            vocab_size:  30522,
            max_seq_len: 512,
            hidden_size: 768,
            num_heads:   12,
            num_layers:  12,
            d_ff:        3072,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub corpus:              CorpusFiles,
    /// Prediction files for the dev split
    pub dev_out:             SplitFiles,
    /// Prediction files for the test split
    pub test_out:            SplitFiles,
    pub checkpoint_dir:      PathBuf,
    /// HuggingFace tokenizer JSON; a word-level one is built when absent
    pub tokenizer:           Option<PathBuf>,
    /// Burn record of a pretrained encoder
    pub encoder_weights:     Option<PathBuf>,
    pub seed:                u64,
    pub epochs:              usize,
    pub steps_per_epoch:     usize,
    pub batch_size:          usize,
    pub lr:                  f64,
    pub hidden_dropout_prob: f64,
    pub fine_tune_mode:      FineTuneMode,
    pub encoding_mode:       EncodingMode,
    pub schedule:            AlphaSchedule,
    pub geometry:            EncoderGeometry,
    pub use_gpu:             bool,
    pub resume:              bool,
    pub progress:            bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        let fine_tune_mode = FineTuneMode::LastLinearLayer;
        let encoding_mode  = EncodingMode::Single;
        let epochs         = 10;
        let lr             = 1e-5;
        Self {
            corpus:              CorpusFiles::default(),
            dev_out:             SplitFiles::predictions("dev"),
            test_out:            SplitFiles::predictions("test"),
            checkpoint_dir:      default_checkpoint_dir(encoding_mode, fine_tune_mode, epochs, lr),
            tokenizer:           None,
            encoder_weights:     None,
            seed:                11711,
            epochs,
            steps_per_epoch:     10_000,
            batch_size:          8,
            lr,
            hidden_dropout_prob: 0.3,
            fine_tune_mode,
            encoding_mode,
            schedule:            AlphaSchedule::default(),
            geometry:            EncoderGeometry::default(),
            use_gpu:             false,
            resume:              false,
            progress:            true,
        }
    }
}

impl RunConfig {
    /// Model hyperparameters for this run. `vocab_size` is raised to fit the tokenizer.
    pub fn model_config(&self, num_labels: usize, tokenizer_vocab: usize) -> MultitaskConfig {
        let g = &self.geometry;
        MultitaskConfig::new(
            g.vocab_size.max(tokenizer_vocab),
            g.max_seq_len,
            g.hidden_size,
            g.num_heads,
            g.num_layers,
            g.d_ff,
            self.hidden_dropout_prob,
            num_labels,
            self.fine_tune_mode,
            self.encoding_mode,
        )
    }
}

/// `{dual|single}-{fine-tune-mode}-{epochs}-{lr}-multitask`
pub fn default_checkpoint_dir(
    encoding_mode:  EncodingMode,
    fine_tune_mode: FineTuneMode,
    epochs:         usize,
    lr:             f64,
) -> PathBuf {
    PathBuf::from(format!("{encoding_mode}-{fine_tune_mode}-{epochs}-{lr}-multitask"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_checkpoint_dir_encodes_the_run() {
        let dir = default_checkpoint_dir(EncodingMode::Dual, FineTuneMode::FullModel, 10, 1e-5);
        assert_eq!(dir, PathBuf::from("dual-full-model-10-0.00001-multitask"));
    }

    #[test]
    fn test_model_config_fits_tokenizer_vocab() {
        let mut cfg = RunConfig::default();
        cfg.geometry.vocab_size = 100;
        assert_eq!(cfg.model_config(5, 400).vocab_size, 400);
        assert_eq!(cfg.model_config(5, 50).vocab_size, 100);
        assert_eq!(cfg.model_config(5, 50).num_labels, 5);
    }

    #[test]
    fn test_round_trips_through_json() {
        let cfg  = RunConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}

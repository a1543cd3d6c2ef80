// ============================================================
// Layer 5 — Multitask Model
// ============================================================
// One shared encoder plus one linear head per task.
//
//   predict_sentiment(seq)          → [batch, num_labels] logits
//   predict_paraphrase(seq_a, seq_b) → [batch] logit
//   predict_similarity(seq_a, seq_b) → [batch] unnormalised score
//
// Each path: encode → pooled → dropout → task head. Dropout
// is only active on an autodiff backend, so `model.valid()`
// gives a deterministic evaluation pass.
//
// Single encoding: paired tasks encode ONLY the first sequence
// and the second argument is ignored. This matches checkpoints
// trained in that mode and is kept as-is.
//
// Dual encoding: both sequences go through the same encoder
// (two passes, one set of weights) and the pooled vectors are
// concatenated before the head.
//
// Frozen fine-tuning ("last-linear-layer") marks every encoder
// parameter as not requiring gradients, so backward produces
// no encoder gradients and the optimizer leaves them untouched.

use burn::{
    nn::{Dropout, DropoutConfig, Linear},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::batcher::{PairBatch, SentenceBatch, TaskBatch};
use crate::domain::error::{ModelError, TrainError};
use crate::domain::modes::{EncodingMode, FineTuneMode};
use crate::domain::task::Task;
use crate::infra::tokenizer_store::MASK_ID;
use crate::ml::encoder::{EncoderConfig, SequenceEncoder, TransformerEncoder};
use crate::ml::heads::init_heads;
use crate::ml::loss;

#[derive(Config, Debug)]
pub struct MultitaskConfig {
    pub vocab_size:          usize,
    pub max_seq_len:         usize,
    pub hidden_size:         usize,
    pub num_heads:           usize,
    pub num_layers:          usize,
    pub d_ff:                usize,
    pub hidden_dropout_prob: f64,
    pub num_labels:          usize,
    pub fine_tune_mode:      FineTuneMode,
    pub encoding_mode:       EncodingMode,
}

impl MultitaskConfig {
    pub fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig::new(
            self.vocab_size, self.max_seq_len, self.hidden_size,
            self.num_heads, self.num_layers, self.d_ff, self.hidden_dropout_prob,
        )
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        for (name, value) in [
            ("vocab_size", self.vocab_size),
            ("max_seq_len", self.max_seq_len),
            ("hidden_size", self.hidden_size),
            ("num_heads", self.num_heads),
            ("num_layers", self.num_layers),
            ("d_ff", self.d_ff),
        ] {
            if value == 0 {
                return Err(ModelError::ZeroDimension(name));
            }
        }
        // The special tokens sit at fixed BERT ids, [MASK] being the highest.
        if self.vocab_size <= MASK_ID as usize {
            return Err(ModelError::VocabTooSmall {
                vocab_size: self.vocab_size,
                max_id:     MASK_ID as usize,
            });
        }
        if self.hidden_size % self.num_heads != 0 {
            return Err(ModelError::HeadsDoNotDivideHidden {
                hidden_size: self.hidden_size,
                num_heads:   self.num_heads,
            });
        }
        if self.num_labels == 0 {
            return Err(ModelError::NoClasses);
        }
        if !(0.0..1.0).contains(&self.hidden_dropout_prob) {
            return Err(ModelError::InvalidDropout(self.hidden_dropout_prob));
        }
        Ok(())
    }

    /// Build a freshly initialised model. Fails fast on bad geometry.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<MultitaskModel<B>, ModelError> {
        self.validate()?;
        let model = MultitaskModel {
            encoder:       self.encoder_config().init(device),
            heads:         init_heads(self.hidden_size, self.num_labels, self.encoding_mode, device),
            dropout:       DropoutConfig::new(self.hidden_dropout_prob).init(),
            pooled_inputs: self.encoding_mode.pooled_inputs(),
        };
        Ok(model.with_fine_tune_mode(self.fine_tune_mode))
    }
}

#[derive(Module, Debug)]
pub struct MultitaskModel<B: Backend> {
    pub encoder:   TransformerEncoder<B>,
    /// Indexed by `Task::index()`
    pub heads:     Vec<Linear<B>>,
    pub dropout:   Dropout,
    /// 1 = single encoding, 2 = dual encoding
    pooled_inputs: usize,
}

impl<B: Backend> MultitaskModel<B> {
    /// Freeze the encoder for "last-linear-layer"; leave it trainable otherwise.
    pub fn with_fine_tune_mode(mut self, mode: FineTuneMode) -> Self {
        if !mode.encoder_trainable() {
            self.encoder = self.encoder.no_grad();
        }
        self
    }

    pub fn encoding_mode(&self) -> EncodingMode {
        if self.pooled_inputs == 2 { EncodingMode::Dual } else { EncodingMode::Single }
    }

    fn head(&self, task: Task) -> &Linear<B> {
        &self.heads[task.index()]
    }

    /// Pooled representation of one batch of sequences
    pub fn embed(&self, token_ids: Tensor<B, 2, Int>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        self.encoder.encode(token_ids, attention_mask).pooled
    }

    /// Sentiment logits, [batch, num_labels]
    pub fn predict_sentiment(
        &self,
        token_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let pooled = self.embed(token_ids, attention_mask);
        self.head(Task::Sentiment).forward(self.dropout.forward(pooled))
    }

    /// Paraphrase logit, [batch]. Apply a sigmoid for a probability.
    pub fn predict_paraphrase(
        &self,
        token_ids_1:      Tensor<B, 2, Int>,
        attention_mask_1: Tensor<B, 2, Int>,
        token_ids_2:      Tensor<B, 2, Int>,
        attention_mask_2: Tensor<B, 2, Int>,
    ) -> Tensor<B, 1> {
        self.predict_pair(Task::Paraphrase, token_ids_1, attention_mask_1, token_ids_2, attention_mask_2)
    }

    /// Similarity score, [batch], not clamped to the label range
    pub fn predict_similarity(
        &self,
        token_ids_1:      Tensor<B, 2, Int>,
        attention_mask_1: Tensor<B, 2, Int>,
        token_ids_2:      Tensor<B, 2, Int>,
        attention_mask_2: Tensor<B, 2, Int>,
    ) -> Tensor<B, 1> {
        self.predict_pair(Task::Similarity, token_ids_1, attention_mask_1, token_ids_2, attention_mask_2)
    }

    fn predict_pair(
        &self,
        task:             Task,
        token_ids_1:      Tensor<B, 2, Int>,
        attention_mask_1: Tensor<B, 2, Int>,
        token_ids_2:      Tensor<B, 2, Int>,
        attention_mask_2: Tensor<B, 2, Int>,
    ) -> Tensor<B, 1> {
        let pooled = match self.encoding_mode() {
            EncodingMode::Single => self.embed(token_ids_1, attention_mask_1),
            EncodingMode::Dual   => Tensor::cat(
                vec![
                    self.embed(token_ids_1, attention_mask_1),
                    self.embed(token_ids_2, attention_mask_2),
                ],
                1,
            ),
        };
        let out = self.head(task).forward(self.dropout.forward(pooled)); // [batch, 1]
        out.flatten::<1>(0, 1)
    }

    /// Sentiment logits for a collated batch
    pub fn sentiment_logits(&self, batch: &SentenceBatch<B>) -> Tensor<B, 2> {
        self.predict_sentiment(batch.token_ids.clone(), batch.attention_mask.clone())
    }

    /// Paraphrase or similarity outputs for a collated batch
    pub fn pair_scores(&self, task: Task, batch: &PairBatch<B>) -> Tensor<B, 1> {
        debug_assert!(task.is_paired(), "{task} does not take sentence pairs");
        let ids_1  = batch.token_ids_1.clone();
        let mask_1 = batch.attention_mask_1.clone();
        let ids_2  = batch.token_ids_2.clone();
        let mask_2 = batch.attention_mask_2.clone();
        match task {
            Task::Similarity => self.predict_similarity(ids_1, mask_1, ids_2, mask_2),
            _                => self.predict_paraphrase(ids_1, mask_1, ids_2, mask_2),
        }
    }
}

impl<B: AutodiffBackend> MultitaskModel<B> {
    /// Forward pass and task loss for one training batch.
    /// `batch_size` is the configured batch size (sentiment normaliser).
    pub fn forward_loss(&self, batch: &TaskBatch<B>, batch_size: usize) -> Result<Tensor<B, 1>, TrainError> {
        match batch {
            TaskBatch::Sentiment(b) => {
                let labels = b.labels.clone().ok_or(TrainError::MissingLabels(Task::Sentiment))?;
                Ok(loss::sentiment_loss(self.sentiment_logits(b), labels, batch_size))
            }
            TaskBatch::Paraphrase(b) => {
                let labels = b.labels.clone().ok_or(TrainError::MissingLabels(Task::Paraphrase))?;
                Ok(loss::paraphrase_loss(self.pair_scores(Task::Paraphrase, b), labels))
            }
            TaskBatch::Similarity(b) => {
                let labels = b.labels.clone().ok_or(TrainError::MissingLabels(Task::Similarity))?;
                Ok(loss::similarity_loss(self.pair_scores(Task::Similarity, b), labels))
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;
    use burn::optim::{AdamWConfig, GradientsParams, Optimizer};
    use burn::tensor::TensorData;

    type TestBackend = NdArray;
    type TestAutodiff = Autodiff<NdArray>;

    pub(crate) fn tiny_config(fine_tune: FineTuneMode, encoding: EncodingMode) -> MultitaskConfig {
        MultitaskConfig::new(128, 16, 8, 2, 1, 16, 0.0, 5, fine_tune, encoding)
    }

    pub(crate) fn ids<B: Backend>(values: Vec<i64>, shape: [usize; 2]) -> Tensor<B, 2, Int> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    pub(crate) fn sentence_batch<B: Backend>() -> SentenceBatch<B> {
        SentenceBatch {
            token_ids:      ids(vec![101, 5, 6, 102, 101, 7, 102, 0, 101, 8, 9, 102], [3, 4]),
            attention_mask: ids(vec![1, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1], [3, 4]),
            labels:         Some(Tensor::from_data(TensorData::new(vec![0i64, 3, 4], [3]), &Default::default())),
            sent_ids:       vec!["a".into(), "b".into(), "c".into()],
        }
    }

    pub(crate) fn pair_batch<B: Backend>(labels: Vec<f32>) -> PairBatch<B> {
        let n = labels.len();
        assert_eq!(n, 2);
        PairBatch {
            token_ids_1:      ids(vec![101, 5, 102, 101, 6, 102], [2, 3]),
            attention_mask_1: ids(vec![1, 1, 1, 1, 1, 1], [2, 3]),
            token_ids_2:      ids(vec![101, 9, 10, 102, 101, 11, 102, 0], [2, 4]),
            attention_mask_2: ids(vec![1, 1, 1, 1, 1, 1, 1, 0], [2, 4]),
            labels:           Some(Tensor::from_data(TensorData::new(labels, [n]), &Default::default())),
            sent_ids:         vec!["p".into(), "q".into()],
        }
    }

    fn floats<B: Backend, const D: usize>(t: Tensor<B, D>) -> Vec<f32> {
        t.into_data().convert::<f32>().to_vec().unwrap()
    }

    #[test]
    fn test_output_shapes_in_both_encoding_modes() {
        for mode in [EncodingMode::Single, EncodingMode::Dual] {
            let model = tiny_config(FineTuneMode::FullModel, mode)
                .init::<TestBackend>(&Default::default())
                .unwrap();
            assert_eq!(model.sentiment_logits(&sentence_batch()).dims(), [3, 5]);
            let pair = pair_batch::<TestBackend>(vec![0.0, 1.0]);
            assert_eq!(model.pair_scores(Task::Paraphrase, &pair).dims(), [2]);
            assert_eq!(model.pair_scores(Task::Similarity, &pair).dims(), [2]);
        }
    }

    #[test]
    fn test_single_encoding_ignores_second_sentence() {
        let model = tiny_config(FineTuneMode::FullModel, EncodingMode::Single)
            .init::<TestBackend>(&Default::default())
            .unwrap();
        let a = pair_batch::<TestBackend>(vec![0.0, 1.0]);
        let mut b = a.clone();
        b.token_ids_2 = ids(vec![101, 30, 102, 101, 31, 102], [2, 3]);
        b.attention_mask_2 = ids(vec![1, 1, 1, 1, 1, 1], [2, 3]);

        assert_eq!(
            floats(model.pair_scores(Task::Similarity, &a)),
            floats(model.pair_scores(Task::Similarity, &b)),
        );
    }

    #[test]
    fn test_dual_encoding_depends_on_second_sentence() {
        let model = tiny_config(FineTuneMode::FullModel, EncodingMode::Dual)
            .init::<TestBackend>(&Default::default())
            .unwrap();
        let a = pair_batch::<TestBackend>(vec![0.0, 1.0]);
        let mut b = a.clone();
        b.token_ids_2 = ids(vec![101, 30, 102, 101, 31, 102], [2, 3]);
        b.attention_mask_2 = ids(vec![1, 1, 1, 1, 1, 1], [2, 3]);

        assert_ne!(
            floats(model.pair_scores(Task::Similarity, &a)),
            floats(model.pair_scores(Task::Similarity, &b)),
        );
    }

    #[test]
    fn test_invalid_geometry_fails_at_construction() {
        let mut cfg = tiny_config(FineTuneMode::FullModel, EncodingMode::Single);
        cfg.num_heads = 3;
        assert!(matches!(
            cfg.init::<TestBackend>(&Default::default()),
            Err(ModelError::HeadsDoNotDivideHidden { .. })
        ));

        let mut cfg = tiny_config(FineTuneMode::FullModel, EncodingMode::Single);
        cfg.num_labels = 0;
        assert!(matches!(cfg.init::<TestBackend>(&Default::default()), Err(ModelError::NoClasses)));

        let mut cfg = tiny_config(FineTuneMode::FullModel, EncodingMode::Single);
        cfg.hidden_dropout_prob = 1.0;
        assert!(matches!(cfg.init::<TestBackend>(&Default::default()), Err(ModelError::InvalidDropout(_))));
    }

    #[test]
    fn test_vocab_without_room_for_special_tokens_is_rejected() {
        let mut cfg = tiny_config(FineTuneMode::FullModel, EncodingMode::Single);
        cfg.vocab_size = 64;
        assert_eq!(
            cfg.validate(),
            Err(ModelError::VocabTooSmall { vocab_size: 64, max_id: 103 }),
        );

        cfg.vocab_size = 104;
        assert!(cfg.validate().is_ok());
    }

    /// Snapshot of (encoder weights, head weights) after one optimiser step
    fn one_step(mode: FineTuneMode) -> ((Vec<f32>, Vec<f32>), (Vec<f32>, Vec<f32>)) {
        let device = Default::default();
        let model  = tiny_config(mode, EncodingMode::Dual)
            .init::<TestAutodiff>(&device)
            .unwrap();

        let encoder_before = floats(model.encoder.pooler.weight.val().inner());
        let head_before    = floats(model.heads[Task::Paraphrase.index()].weight.val().inner());

        let mut optim = AdamWConfig::new().with_weight_decay(0.0).init();
        let batch = TaskBatch::Paraphrase(pair_batch::<TestAutodiff>(vec![1.0, 0.0]));
        let loss  = model.forward_loss(&batch, 2).unwrap();
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        let model = optim.step(1e-2, model, grads);

        let encoder_after = floats(model.encoder.pooler.weight.val().inner());
        let head_after    = floats(model.heads[Task::Paraphrase.index()].weight.val().inner());
        ((encoder_before, encoder_after), (head_before, head_after))
    }

    #[test]
    fn test_frozen_encoder_is_bit_identical_after_a_step() {
        let ((enc_before, enc_after), (head_before, head_after)) = one_step(FineTuneMode::LastLinearLayer);
        assert_eq!(enc_before, enc_after);
        assert_ne!(head_before, head_after);
    }

    #[test]
    fn test_full_fine_tune_updates_encoder_and_head() {
        let ((enc_before, enc_after), (head_before, head_after)) = one_step(FineTuneMode::FullModel);
        assert_ne!(enc_before, enc_after);
        assert_ne!(head_before, head_after);
    }

    #[test]
    fn test_unlabelled_batch_cannot_produce_a_loss() {
        let model = tiny_config(FineTuneMode::FullModel, EncodingMode::Dual)
            .init::<TestAutodiff>(&Default::default())
            .unwrap();
        let mut pair = pair_batch::<TestAutodiff>(vec![0.0, 1.0]);
        pair.labels  = None;
        assert!(matches!(
            model.forward_loss(&TaskBatch::Similarity(pair), 2),
            Err(TrainError::MissingLabels(Task::Similarity))
        ));

        let mut sentences = sentence_batch::<TestAutodiff>();
        sentences.labels  = None;
        assert!(matches!(
            model.forward_loss(&TaskBatch::Sentiment(sentences), 2),
            Err(TrainError::MissingLabels(Task::Sentiment))
        ));
    }

    #[test]
    fn test_valid_model_is_deterministic_with_dropout() {
        let mut cfg = tiny_config(FineTuneMode::FullModel, EncodingMode::Single);
        cfg.hidden_dropout_prob = 0.5;
        let model = cfg.init::<TestAutodiff>(&Default::default()).unwrap().valid();
        let batch = sentence_batch::<TestBackend>();
        assert_eq!(floats(model.sentiment_logits(&batch)), floats(model.sentiment_logits(&batch)));
    }
}

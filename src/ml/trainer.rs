// ============================================================
// Layer 5 — Multitask Training Loop
// ============================================================
// One model, three datasets, one optimizer.
//
//   for epoch in start..epochs:
//     device RNG reseeded from numeric  (once per epoch)
//     alpha  = schedule(epoch)          (once per epoch)
//     p      = sizes^alpha / Σ          (once per epoch)
//     repeat steps_per_epoch:
//       task  ~ Categorical(p)          (general RNG)
//       batch = streams[task].next()    (reshuffles on exhaustion)
//       loss  = task loss of model(batch)
//       backward → AdamW step
//     evaluate train + dev (inner backend, dropout off)
//     dev average > best  →  checkpoint
//
// Burn gradients are returned by `backward()` rather than
// accumulated on the parameters, so there is nothing to zero
// between steps.
//
// A non-finite loss stops the run immediately.

use anyhow::{Context, Result};
use burn::{
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng, SeedableRng,
};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

use crate::application::config::RunConfig;
use crate::data::batcher::{PairBatch, PairBatcher, SentenceBatch, SentenceBatcher, TaskBatch};
use crate::data::dataset::{PairItem, SentenceItem, TaskDatasets};
use crate::data::stream::{CyclicBatchStream, StreamState};
use crate::domain::error::{StreamError, TrainError};
use crate::domain::schedule::probabilities;
use crate::domain::task::Task;
use crate::infra::checkpoint::{load_encoder_weights, CheckpointState, Checkpointer};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::infra::seed::{self, seed_everything};
use crate::ml::evaluator::{evaluate, TaskLoaders};
use crate::ml::model::{MultitaskConfig, MultitaskModel};

// ─── Task Streams ─────────────────────────────────────────────────────────────
/// One endless shuffled batch stream per task
pub struct TaskStreams<B: Backend> {
    sentiment:  CyclicBatchStream<SentenceItem, SentenceBatch<B>>,
    paraphrase: CyclicBatchStream<PairItem, PairBatch<B>>,
    similarity: CyclicBatchStream<PairItem, PairBatch<B>>,
}

impl<B: Backend> TaskStreams<B> {
    /// Each stream gets its own shuffle RNG, drawn from `numeric`
    pub fn new(
        datasets:   &TaskDatasets,
        batch_size: usize,
        numeric:    &mut ChaCha8Rng,
        device:     &B::Device,
    ) -> Result<Self, StreamError> {
        let sentence_batcher = Arc::new(SentenceBatcher::<B>::new(device.clone()));
        let pair_batcher     = Arc::new(PairBatcher::<B>::new(device.clone()));

        Ok(Self {
            sentiment: CyclicBatchStream::<SentenceItem, SentenceBatch<B>>::new(
                Arc::new(datasets.sentiment.clone()),
                sentence_batcher,
                batch_size,
                ChaCha8Rng::seed_from_u64(numeric.gen()),
            )?,
            paraphrase: CyclicBatchStream::<PairItem, PairBatch<B>>::new(
                Arc::new(datasets.paraphrase.clone()),
                pair_batcher.clone(),
                batch_size,
                ChaCha8Rng::seed_from_u64(numeric.gen()),
            )?,
            similarity: CyclicBatchStream::<PairItem, PairBatch<B>>::new(
                Arc::new(datasets.similarity.clone()),
                pair_batcher,
                batch_size,
                ChaCha8Rng::seed_from_u64(numeric.gen()),
            )?,
        })
    }

    /// Next batch of `task`. Never runs dry.
    pub fn next(&mut self, task: Task) -> TaskBatch<B> {
        match task {
            Task::Sentiment  => TaskBatch::Sentiment(self.sentiment.next_batch()),
            Task::Paraphrase => TaskBatch::Paraphrase(self.paraphrase.next_batch()),
            Task::Similarity => TaskBatch::Similarity(self.similarity.next_batch()),
        }
    }

    /// Stream positions in `Task::ALL` order
    pub fn states(&self) -> Vec<StreamState> {
        vec![self.sentiment.state(), self.paraphrase.state(), self.similarity.state()]
    }

    /// Completed passes over each dataset, in `Task::ALL` order
    pub fn passes(&self) -> [usize; 3] {
        [self.sentiment.passes(), self.paraphrase.passes(), self.similarity.passes()]
    }

    pub fn restore(&mut self, states: Vec<StreamState>) -> Result<()> {
        let [sst, para, sts]: [StreamState; 3] = states
            .try_into()
            .map_err(|s: Vec<StreamState>| anyhow::anyhow!("expected 3 stream states, found {}", s.len()))?;
        self.sentiment.restore(sst)?;
        self.paraphrase.restore(para)?;
        self.similarity.restore(sts)?;
        Ok(())
    }
}

// ─── Training ─────────────────────────────────────────────────────────────────
/// Tokenised train and dev datasets of every task
pub struct TrainingData {
    pub train: TaskDatasets,
    pub dev:   TaskDatasets,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainOutcome {
    pub best_dev_score: f64,
    /// None when no epoch improved on the starting score
    pub best_epoch:     Option<usize>,
    pub epochs_run:     usize,
}

pub fn run_training<B: AutodiffBackend>(
    cfg:          &RunConfig,
    model_config: &MultitaskConfig,
    data:         &TrainingData,
    checkpointer: &Checkpointer,
    device:       &B::Device,
) -> Result<TrainOutcome> {

    // ── Fail fast on an impossible schedule ───────────────────────────────────
    let sizes = data.train.sizes();
    cfg.schedule.alpha(0, cfg.epochs)?;
    probabilities(cfg.schedule.start, &sizes)?;

    // ── Seed, build model and optimiser ───────────────────────────────────────
    let mut rng   = seed_everything::<B>(cfg.seed);
    let mut model = model_config.init::<B>(device)?;
    if let Some(path) = &cfg.encoder_weights {
        model.encoder = load_encoder_weights(model.encoder, path, device)?;
        model = model.with_fine_tune_mode(model_config.fine_tune_mode);
    }
    tracing::info!(
        "Model ready: {} layers, hidden={}, mode={}, encoding={}",
        model_config.num_layers, model_config.hidden_size,
        model_config.fine_tune_mode, model_config.encoding_mode,
    );

    let mut optim = AdamWConfig::new()
        .with_weight_decay(0.0)
        .init::<B, MultitaskModel<B>>();

    let mut streams = TaskStreams::<B>::new(&data.train, cfg.batch_size, &mut rng.numeric, device)?;

    // ── Resume from the best checkpoint of this run ───────────────────────────
    let mut start_epoch = 0;
    let mut best        = f64::NEG_INFINITY;
    let mut best_epoch  = None;
    let mut resumed_at  = None;
    if cfg.resume {
        if checkpointer.exists() {
            let state = checkpointer.load_state()?;
            model = checkpointer
                .load_weights(model, device)?
                .with_fine_tune_mode(model_config.fine_tune_mode);
            optim = checkpointer.load_optimizer(optim, device)?;
            rng   = seed::restore::<B>(state.rng);
            streams.restore(state.streams).context("Checkpoint does not match the training data")?;
            start_epoch = state.epoch + 1;
            best        = state.best_dev_score;
            best_epoch  = Some(state.epoch);
            resumed_at  = Some(state.epoch);
            tracing::info!("Resuming after epoch {} (best dev score {:.4})", state.epoch, best);
        } else {
            tracing::warn!("No checkpoint in '{}', starting from scratch", checkpointer.dir().display());
        }
    }

    // ── Evaluation loaders (inner backend, no autodiff) ───────────────────────
    let train_loaders = TaskLoaders::<B::InnerBackend>::sequential(&data.train, cfg.batch_size, device);
    let dev_loaders   = TaskLoaders::<B::InnerBackend>::sequential(&data.dev, cfg.batch_size, device);
    let logger        = match resumed_at {
        Some(epoch) => MetricsLogger::resume(checkpointer.dir(), epoch)?,
        None        => MetricsLogger::create(checkpointer.dir())?,
    };

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in start_epoch..cfg.epochs {
        let device_seed = rng.reseed_device::<B>();
        let alpha       = cfg.schedule.alpha(epoch, cfg.epochs)?;
        let probs       = probabilities(alpha, &sizes)?;
        let sampler     = WeightedIndex::new(&probs).context("Invalid task distribution")?;
        tracing::info!(
            "Epoch {}: alpha={:.3}, p(sst)={:.3}, p(para)={:.3}, p(sts)={:.3}, device_seed={}",
            epoch, alpha, probs[0], probs[1], probs[2], device_seed,
        );

        let bar = progress_bar(cfg, epoch)?;
        let mut loss_sum = 0.0f64;
        let mut visits   = [0usize; 3];

        for step in 0..cfg.steps_per_epoch {
            let task  = Task::ALL[sampler.sample(&mut rng.general)];
            let batch = streams.next(task);
            let loss  = model.forward_loss(&batch, cfg.batch_size)?;

            let value: f64 = loss.clone().into_scalar().elem::<f64>();
            if !value.is_finite() {
                bar.abandon();
                return Err(TrainError::NonFiniteLoss { epoch, step, task, value }.into());
            }
            loss_sum += value;
            visits[task.index()] += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.lr, model, grads);
            bar.inc(1);
        }
        bar.finish_and_clear();
        let passes = streams.passes();
        tracing::debug!(
            "Epoch {} task visits: sst={} para={} sts={} (dataset passes {:?})",
            epoch, visits[0], visits[1], visits[2], passes,
        );

        // ── Evaluate with dropout off ─────────────────────────────────────────
        let valid      = model.valid();
        let train_eval = evaluate(&train_loaders, &valid)?;
        let dev_eval   = evaluate(&dev_loaders, &valid)?;

        let metrics = EpochMetrics {
            epoch,
            alpha,
            probabilities: [probs[0], probs[1], probs[2]],
            train_loss:    loss_sum / cfg.steps_per_epoch.max(1) as f64,
            train:         Task::ALL.map(|t| train_eval.metric(t)),
            dev:           Task::ALL.map(|t| dev_eval.metric(t)),
        };
        logger.log(&metrics)?;

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | train sst={:.3} para={:.3} sts={:.3} avg={:.3} \
             | dev sst={:.3} para={:.3} sts={:.3} avg={:.3}",
            epoch, cfg.epochs, metrics.train_loss,
            metrics.train[0], metrics.train[1], metrics.train[2], metrics.train_average(),
            metrics.dev[0], metrics.dev[1], metrics.dev[2], metrics.dev_average(),
        );

        // ── Checkpoint on strict improvement ──────────────────────────────────
        if metrics.is_improvement(best) {
            best       = metrics.dev_average();
            best_epoch = Some(epoch);
            let state  = CheckpointState {
                model_config:   model_config.clone(),
                args:           cfg.clone(),
                rng:            rng.clone(),
                streams:        streams.states(),
                epoch,
                best_dev_score: best,
            };
            checkpointer.save(&model, &optim, &state)?;
        }
    }

    tracing::info!("Training complete (best dev score {:.4})", best);
    Ok(TrainOutcome {
        best_dev_score: best,
        best_epoch,
        epochs_run: cfg.epochs.saturating_sub(start_epoch),
    })
}

fn progress_bar(cfg: &RunConfig, epoch: usize) -> Result<ProgressBar> {
    if !cfg.progress {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(cfg.steps_per_epoch as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    bar.set_message(format!("train-{epoch}"));
    Ok(bar)
}

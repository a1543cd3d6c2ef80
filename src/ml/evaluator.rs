// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Runs a model over the three task loaders and scores it.
//
//   sentiment   argmax(logits)            → accuracy
//   paraphrase  sigmoid(logit) > 0.5      → accuracy
//   similarity  raw score                 → Pearson correlation
//
// Always called with a non-autodiff model (`model.valid()`),
// so dropout is a pass-through and no graph is recorded.
//
// Predictions and ids come back in loader order. The test
// variant skips scoring because test labels are withheld.
// Unreadable outputs and partially labelled splits are errors,
// never a silent 0.0 metric.

use anyhow::{anyhow, bail, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
    tensor::activation::sigmoid,
};
use std::sync::Arc;

use crate::data::batcher::{PairBatch, PairBatcher, SentenceBatch, SentenceBatcher};
use crate::data::dataset::TaskDatasets;
use crate::domain::task::{MetricKind, Task};
use crate::ml::model::MultitaskModel;

// ─── Loaders ──────────────────────────────────────────────────────────────────
/// One finite loader per task
pub struct TaskLoaders<B: Backend> {
    pub sentiment:  Arc<dyn DataLoader<SentenceBatch<B>>>,
    pub paraphrase: Arc<dyn DataLoader<PairBatch<B>>>,
    pub similarity: Arc<dyn DataLoader<PairBatch<B>>>,
}

impl<B: Backend> TaskLoaders<B> {
    /// Deterministic order, as the datasets were read
    pub fn sequential(datasets: &TaskDatasets, batch_size: usize, device: &B::Device) -> Self {
        Self {
            sentiment: DataLoaderBuilder::new(SentenceBatcher::<B>::new(device.clone()))
                .batch_size(batch_size)
                .build(datasets.sentiment.clone()),
            paraphrase: DataLoaderBuilder::new(PairBatcher::<B>::new(device.clone()))
                .batch_size(batch_size)
                .build(datasets.paraphrase.clone()),
            similarity: DataLoaderBuilder::new(PairBatcher::<B>::new(device.clone()))
                .batch_size(batch_size)
                .build(datasets.similarity.clone()),
        }
    }

    /// Shuffled once per task from `seed` (test loaders)
    pub fn shuffled(datasets: &TaskDatasets, batch_size: usize, seed: u64, device: &B::Device) -> Self {
        Self {
            sentiment: DataLoaderBuilder::new(SentenceBatcher::<B>::new(device.clone()))
                .batch_size(batch_size)
                .shuffle(seed)
                .build(datasets.sentiment.clone()),
            paraphrase: DataLoaderBuilder::new(PairBatcher::<B>::new(device.clone()))
                .batch_size(batch_size)
                .shuffle(seed.wrapping_add(1))
                .build(datasets.paraphrase.clone()),
            similarity: DataLoaderBuilder::new(PairBatcher::<B>::new(device.clone()))
                .batch_size(batch_size)
                .shuffle(seed.wrapping_add(2))
                .build(datasets.similarity.clone()),
        }
    }
}

// ─── Results ──────────────────────────────────────────────────────────────────
/// Predictions for one task, aligned with `ids`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPredictions {
    pub predictions: Vec<f32>,
    pub ids:         Vec<String>,
}

/// Scored predictions for one task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEvaluation {
    pub metric:      f64,
    pub predictions: TaskPredictions,
}

/// Scored predictions for all three tasks, indexed by `Task::index()`
#[derive(Debug, Clone, PartialEq)]
pub struct MultitaskEvaluation {
    pub tasks: [TaskEvaluation; 3],
}

impl MultitaskEvaluation {
    pub fn get(&self, task: Task) -> &TaskEvaluation {
        &self.tasks[task.index()]
    }

    pub fn metric(&self, task: Task) -> f64 {
        self.get(task).metric
    }

    /// Unweighted mean of the three task metrics
    pub fn average(&self) -> f64 {
        self.tasks.iter().map(|t| t.metric).sum::<f64>() / self.tasks.len() as f64
    }
}

// ─── Evaluation ───────────────────────────────────────────────────────────────
/// Score the model on labelled loaders (train sample or dev)
pub fn evaluate<B: Backend>(loaders: &TaskLoaders<B>, model: &MultitaskModel<B>) -> Result<MultitaskEvaluation> {
    let [sst, para, sts] = Task::ALL.map(|task| score(loaders, model, task));
    Ok(MultitaskEvaluation { tasks: [sst?, para?, sts?] })
}

fn score<B: Backend>(loaders: &TaskLoaders<B>, model: &MultitaskModel<B>, task: Task) -> Result<TaskEvaluation> {
    let (predictions, labels) = run_loader(loaders, model, task)?;
    if labels.len() != predictions.predictions.len() {
        bail!(
            "{} of {} {} examples carry a label",
            labels.len(), predictions.predictions.len(), task,
        );
    }
    let metric = match task.metric_kind() {
        MetricKind::Accuracy           => accuracy(&predictions.predictions, &labels),
        MetricKind::PearsonCorrelation => pearson(&predictions.predictions, &labels),
    };
    Ok(TaskEvaluation { metric, predictions })
}

/// Predictions only, for unlabelled loaders (test)
pub fn predict<B: Backend>(loaders: &TaskLoaders<B>, model: &MultitaskModel<B>) -> Result<[TaskPredictions; 3]> {
    let [sst, para, sts] = Task::ALL.map(|task| run_loader(loaders, model, task).map(|(p, _)| p));
    Ok([sst?, para?, sts?])
}

/// Run one task's loader to the end. Labels are empty when the split has none.
fn run_loader<B: Backend>(
    loaders: &TaskLoaders<B>,
    model:   &MultitaskModel<B>,
    task:    Task,
) -> Result<(TaskPredictions, Vec<f32>)> {
    let mut out    = TaskPredictions::default();
    let mut labels = Vec::new();

    match task {
        Task::Sentiment => {
            for batch in loaders.sentiment.iter() {
                let pred = model.sentiment_logits(&batch).argmax(1).flatten::<1>(0, 1);
                out.predictions.extend(to_f32(pred.float())?);
                if let Some(l) = batch.labels {
                    labels.extend(to_f32(l.float())?);
                }
                out.ids.extend(batch.sent_ids);
            }
        }
        Task::Paraphrase | Task::Similarity => {
            let loader = if task == Task::Paraphrase { &loaders.paraphrase } else { &loaders.similarity };
            for batch in loader.iter() {
                let scores = model.pair_scores(task, &batch);
                let pred = match task {
                    Task::Paraphrase => sigmoid(scores).greater_elem(0.5).float(),
                    _                => scores,
                };
                out.predictions.extend(to_f32(pred)?);
                if let Some(l) = batch.labels {
                    labels.extend(to_f32(l)?);
                }
                out.ids.extend(batch.sent_ids);
            }
        }
    }
    Ok((out, labels))
}

fn to_f32<B: Backend>(t: Tensor<B, 1>) -> Result<Vec<f32>> {
    t.into_data()
        .convert::<f32>()
        .to_vec()
        .map_err(|e| anyhow!("Cannot read model outputs: {e:?}"))
}

// ─── Metrics ──────────────────────────────────────────────────────────────────
/// Fraction of exact matches; 0.0 for an empty split
pub fn accuracy(predictions: &[f32], labels: &[f32]) -> f64 {
    if labels.is_empty() || predictions.len() != labels.len() {
        return 0.0;
    }
    let correct = predictions
        .iter()
        .zip(labels)
        .filter(|(p, l)| p.round() == l.round())
        .count();
    correct as f64 / labels.len() as f64
}

/// Pearson correlation; 0.0 when undefined (fewer than two points or zero variance)
pub fn pearson(xs: &[f32], ys: &[f32]) -> f64 {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return 0.0;
    }
    let mean_x = xs.iter().map(|&x| x as f64).sum::<f64>() / n as f64;
    let mean_y = ys.iter().map(|&y| y as f64).sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x as f64 - mean_x;
        let dy = y as f64 - mean_y;
        cov   += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 || !denom.is_finite() { 0.0 } else { cov / denom }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::data::dataset::Dataset;

    use crate::data::dataset::{PairDataset, PairItem, SentenceDataset, SentenceItem};
    use crate::domain::modes::{EncodingMode, FineTuneMode};
    use crate::ml::model::tests::tiny_config;

    type TestBackend = NdArray;

    fn datasets() -> TaskDatasets {
        let sentences = (0..5)
            .map(|i| SentenceItem {
                token_ids: vec![101, 5 + i as u32, 102],
                label:     Some(i % 5),
                sent_id:   format!("s{i}"),
            })
            .collect();
        let pairs = |prefix: &str| {
            (0..4)
                .map(|i| PairItem {
                    token_ids_1: vec![101, 10 + i as u32, 102],
                    token_ids_2: vec![101, 20 + i as u32, 21, 102],
                    label:       Some((i % 2) as f32),
                    sent_id:     format!("{prefix}{i}"),
                })
                .collect()
        };
        TaskDatasets {
            sentiment:  SentenceDataset::new(sentences),
            paraphrase: PairDataset::new(pairs("p")),
            similarity: PairDataset::new(pairs("s")),
        }
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[1.0, 2.0, 3.0, 0.0], &[1.0, 2.0, 0.0, 0.0]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_pearson() {
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-9);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < 1e-9);
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(pearson(&[1.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_sequential_evaluation_keeps_loader_order() {
        let device = Default::default();
        let model  = tiny_config(FineTuneMode::FullModel, EncodingMode::Dual)
            .init::<TestBackend>(&device)
            .unwrap();
        let loaders = TaskLoaders::<TestBackend>::sequential(&datasets(), 2, &device);
        let result  = evaluate(&loaders, &model).unwrap();

        let sst = result.get(Task::Sentiment);
        assert_eq!(sst.predictions.ids, vec!["s0", "s1", "s2", "s3", "s4"]);
        assert!(sst.predictions.predictions.iter().all(|&p| (0.0..5.0).contains(&p)));
        assert!(result.get(Task::Paraphrase).predictions.predictions.iter().all(|&p| p == 0.0 || p == 1.0));
        assert_eq!(result.get(Task::Similarity).predictions.ids.len(), 4);
        assert!((0.0..=1.0).contains(&result.metric(Task::Sentiment)));

        let mean = Task::ALL.iter().map(|&t| result.metric(t)).sum::<f64>() / 3.0;
        assert!((result.average() - mean).abs() < 1e-12);
    }

    #[test]
    fn test_shuffled_predictions_cover_every_id() {
        let device  = Default::default();
        let model   = tiny_config(FineTuneMode::FullModel, EncodingMode::Single)
            .init::<TestBackend>(&device)
            .unwrap();
        let loaders = TaskLoaders::<TestBackend>::shuffled(&datasets(), 3, 7, &device);
        let [sst, para, sts] = predict(&loaders, &model).unwrap();

        let mut ids = sst.ids.clone();
        ids.sort();
        assert_eq!(ids, vec!["s0", "s1", "s2", "s3", "s4"]);
        assert_eq!(para.predictions.len(), para.ids.len());
        assert_eq!(sts.predictions.len(), 4);
    }

    #[test]
    fn test_partially_labelled_split_is_an_error() {
        let device = Default::default();
        let model  = tiny_config(FineTuneMode::FullModel, EncodingMode::Single)
            .init::<TestBackend>(&device)
            .unwrap();
        let mut data  = datasets();
        let mut items: Vec<SentenceItem> = (0..data.sentiment.len())
            .filter_map(|i| data.sentiment.get(i))
            .collect();
        items[2].label = None;
        data.sentiment = SentenceDataset::new(items);

        let loaders = TaskLoaders::<TestBackend>::sequential(&data, 1, &device);
        assert!(evaluate(&loaders, &model).is_err());
        // Predictions alone do not need labels
        assert_eq!(predict(&loaders, &model).unwrap()[0].ids.len(), 5);
    }
}

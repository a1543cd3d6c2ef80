// ============================================================
// Layer 6 — Prediction Writer
// ============================================================
// Writes one task's predictions for one split to a plain text
// file:
//
//   id 	 Predicted_Sentiment
//   a5f3... , 3
//   9b0c... , 1
//
// Rows follow the order of the loader that produced them.
// Parent directories are created; existing files are replaced.
// Write failures propagate to the caller.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    io::{BufWriter, Write},
};

use crate::data::loader::SplitFiles;
use crate::domain::example::Split;
use crate::domain::task::Task;
use crate::domain::traits::PredictionSink;

/// Writes to the dev or test output files of a run
pub struct PredictionWriter {
    dev:  SplitFiles,
    test: SplitFiles,
}

impl PredictionWriter {
    pub fn new(dev: SplitFiles, test: SplitFiles) -> Self {
        Self { dev, test }
    }
}

impl PredictionSink for PredictionWriter {
    fn write(
        &self,
        task:        Task,
        split:       Split,
        ids:         &[String],
        predictions: &[f32],
    ) -> Result<()> {
        let files = match split {
            Split::Dev   => &self.dev,
            Split::Test  => &self.test,
            Split::Train => bail!("no prediction output is configured for the train split"),
        };
        if ids.len() != predictions.len() {
            bail!("{} ids but {} predictions for {} {}", ids.len(), predictions.len(), task, split.name());
        }

        let path = files.for_task(task);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }

        let file = fs::File::create(path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        let mut out = BufWriter::new(file);
        writeln!(out, "{}", task.prediction_header())?;
        for (id, &p) in ids.iter().zip(predictions) {
            writeln!(out, "{} , {} ", id, task.format_prediction(p))?;
        }
        out.flush()
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::debug!("Wrote {} {} predictions to '{}'", ids.len(), task, path.display());
        Ok(())
    }
}

// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads the three task corpora from tab-separated files with a
// header row, using the csv crate:
//
//   SST    (sentiment)   id  sentence               sentiment
//   Quora  (paraphrase)  id  sentence1  sentence2   is_duplicate
//   STS    (similarity)  id  sentence1  sentence2   similarity
//
// Test files omit the label column. Extra columns (such as an
// unnamed index column) are ignored. Every sentence goes
// through the Preprocessor before it leaves this module.
//
// Quora contains a handful of malformed rows; those are
// skipped with a warning. A malformed SST or STS row is an
// error.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::preprocessor::Preprocessor;
use crate::domain::example::{PairExample, SentenceExample, Split};
use crate::domain::task::Task;
use crate::domain::traits::ExampleSource;

/// One file per task for a single split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitFiles {
    pub sentiment:  PathBuf,
    pub paraphrase: PathBuf,
    pub similarity: PathBuf,
}

impl SplitFiles {
    pub fn for_task(&self, task: Task) -> &Path {
        match task {
            Task::Sentiment  => &self.sentiment,
            Task::Paraphrase => &self.paraphrase,
            Task::Similarity => &self.similarity,
        }
    }

    /// `data/ids-sst-{suffix}.csv`, `data/quora-{suffix}.csv`, `data/sts-{suffix}.csv`
    pub fn corpus(suffix: &str) -> Self {
        Self {
            sentiment:  PathBuf::from(format!("data/ids-sst-{suffix}.csv")),
            paraphrase: PathBuf::from(format!("data/quora-{suffix}.csv")),
            similarity: PathBuf::from(format!("data/sts-{suffix}.csv")),
        }
    }

    /// `predictions/{task}-{split}-output.csv`
    pub fn predictions(split: &str) -> Self {
        Self {
            sentiment:  PathBuf::from(format!("predictions/sst-{split}-output.csv")),
            paraphrase: PathBuf::from(format!("predictions/para-{split}-output.csv")),
            similarity: PathBuf::from(format!("predictions/sts-{split}-output.csv")),
        }
    }
}

/// Corpus files for every split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusFiles {
    pub train: SplitFiles,
    pub dev:   SplitFiles,
    pub test:  SplitFiles,
}

impl CorpusFiles {
    pub fn split(&self, split: Split) -> &SplitFiles {
        match split {
            Split::Train => &self.train,
            Split::Dev   => &self.dev,
            Split::Test  => &self.test,
        }
    }
}

impl Default for CorpusFiles {
    fn default() -> Self {
        Self {
            train: SplitFiles::corpus("train"),
            dev:   SplitFiles::corpus("dev"),
            test:  SplitFiles::corpus("test-student"),
        }
    }
}

// ─── Row layouts ──────────────────────────────────────────────────────────────
#[derive(Debug, Deserialize)]
struct SentimentRow {
    id:        String,
    sentence:  String,
    #[serde(default)]
    sentiment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PairRow {
    id:           String,
    sentence1:    String,
    sentence2:    String,
    #[serde(default)]
    is_duplicate: Option<String>,
    #[serde(default)]
    similarity:   Option<String>,
}

/// Loads examples from tab-separated corpus files.
/// Implements the ExampleSource trait from Layer 3.
pub struct TsvCorpus {
    files:        CorpusFiles,
    preprocessor: Preprocessor,
}

impl TsvCorpus {
    pub fn new(files: CorpusFiles) -> Self {
        Self { files, preprocessor: Preprocessor::new() }
    }

    fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
        csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Cannot open corpus file '{}'", path.display()))
    }
}

impl ExampleSource for TsvCorpus {
    fn sentences(&self, split: Split) -> Result<Vec<SentenceExample>> {
        let path       = self.files.split(split).for_task(Task::Sentiment);
        let mut reader = Self::reader(path)?;
        let mut out    = Vec::new();

        for (line, row) in reader.deserialize::<SentimentRow>().enumerate() {
            let row = row.with_context(|| {
                format!("Malformed row {} in '{}'", line + 1, path.display())
            })?;

            let label = if split.has_labels() {
                let raw = row.sentiment.as_deref().ok_or_else(|| {
                    anyhow!("Row {} in '{}' has no sentiment label", line + 1, path.display())
                })?;
                Some(raw.trim().parse::<usize>().with_context(|| {
                    format!("Bad sentiment label '{raw}' in '{}'", path.display())
                })?)
            } else {
                None
            };

            out.push(SentenceExample {
                id:       row.id.trim().to_string(),
                sentence: self.preprocessor.clean(&row.sentence),
                label,
            });
        }

        tracing::info!("Loaded {} {} examples from '{}'", out.len(), split.name(), path.display());
        Ok(out)
    }

    fn pairs(&self, task: Task, split: Split) -> Result<Vec<PairExample>> {
        if !task.is_paired() {
            bail!("task '{task}' does not consume sentence pairs");
        }

        let path       = self.files.split(split).for_task(task);
        let mut reader = Self::reader(path)?;
        let mut out    = Vec::new();
        let mut skipped = 0usize;

        for (line, row) in reader.deserialize::<PairRow>().enumerate() {
            let parsed = row
                .map_err(anyhow::Error::from)
                .and_then(|row| {
                    let label = if split.has_labels() {
                        Some(parse_pair_label(task, &row)?)
                    } else {
                        None
                    };
                    Ok(PairExample {
                        id:        row.id.trim().to_string(),
                        sentence1: self.preprocessor.clean(&row.sentence1),
                        sentence2: self.preprocessor.clean(&row.sentence2),
                        label,
                    })
                });

            match (parsed, task) {
                (Ok(example), _) => out.push(example),
                (Err(e), Task::Paraphrase) => {
                    skipped += 1;
                    tracing::debug!("Skipping row {} of '{}': {e:#}", line + 1, path.display());
                }
                (Err(e), _) => {
                    return Err(e.context(format!(
                        "Malformed row {} in '{}'", line + 1, path.display()
                    )));
                }
            }
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} malformed rows in '{}'", skipped, path.display());
        }
        tracing::info!("Loaded {} {} {} examples from '{}'",
            out.len(), split.name(), task, path.display());
        Ok(out)
    }
}

fn parse_pair_label(task: Task, row: &PairRow) -> Result<f32> {
    match task {
        Task::Paraphrase => {
            let raw = row.is_duplicate.as_deref().ok_or_else(|| anyhow!("missing is_duplicate"))?;
            // Labels appear as "0", "1" or "1.0"
            let value: f32 = raw.trim().parse()?;
            Ok(value.trunc())
        }
        Task::Similarity => {
            let raw = row.similarity.as_deref().ok_or_else(|| anyhow!("missing similarity"))?;
            Ok(raw.trim().parse()?)
        }
        Task::Sentiment => bail!("sentiment rows are not pairs"),
    }
}

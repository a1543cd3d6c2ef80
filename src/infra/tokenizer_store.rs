// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Resolves the tokenizer used for every split:
//
//   1. An explicit HuggingFace tokenizer.json (e.g. the
//      bert-base-uncased vocabulary) when one is configured
//   2. Otherwise a tokenizer.json previously saved next to the
//      checkpoint
//   3. Otherwise a word-level vocabulary built from the
//      training sentences, written in HuggingFace format and
//      loaded back
//
// The built tokenizer uses BERT's special-token ids and a
// BertProcessing post-processor, so `encode(text, true)`
// yields [CLS] … [SEP] for both pretrained and built vocabs.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 100;
pub const CLS_ID: u32 = 101;
pub const SEP_ID: u32 = 102;
pub const MASK_ID: u32 = 103;

const FIRST_WORD_ID: usize = 104;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    /// Resolve a tokenizer following the order described above.
    /// `texts` is only consulted when a vocabulary has to be built.
    pub fn resolve(
        &self,
        explicit:   Option<&Path>,
        texts:      &[&str],
        vocab_size: usize,
    ) -> Result<Tokenizer> {
        if let Some(path) = explicit {
            tracing::info!("Loading tokenizer from '{}'", path.display());
            return load_file(path);
        }

        let saved = self.path();
        if saved.exists() {
            tracing::info!("Loading existing tokenizer from '{}'", saved.display());
            load_file(&saved)
        } else {
            tracing::info!("Building word-level tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    /// Load the tokenizer saved beside the checkpoint, or the explicit one.
    pub fn load(&self, explicit: Option<&Path>) -> Result<Tokenizer> {
        match explicit {
            Some(path) => load_file(path),
            None       => load_file(&self.path()),
        }
    }

    fn build_and_save(&self, texts: &[&str], vocab_size: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // ── Step 1: Word frequencies ──────────────────────────────────────────
        // Sentences are already lowercased by the Preprocessor.
        let mut freq: HashMap<&str, usize> = HashMap::new();
        for text in texts {
            for word in text.split_whitespace() {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        // Most frequent first; ties broken alphabetically so the
        // vocabulary is identical across runs.
        let mut words: Vec<(&str, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        words.truncate(vocab_size.saturating_sub(FIRST_WORD_ID));

        // ── Step 2: Vocabulary with BERT special-token ids ────────────────────
        let mut vocab = serde_json::json!({
            "[PAD]":  PAD_ID,
            "[UNK]":  UNK_ID,
            "[CLS]":  CLS_ID,
            "[SEP]":  SEP_ID,
            "[MASK]": MASK_ID,
        });
        let mut next_id = FIRST_WORD_ID;
        for (word, _) in &words {
            if vocab.get(*word).is_none() {
                vocab[*word] = serde_json::json!(next_id);
                next_id += 1;
            }
        }

        // ── Step 3: HuggingFace tokenizer JSON ────────────────────────────────
        let special = |id: u32, content: &str| serde_json::json!({
            "id": id, "content": content, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        });
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                special(PAD_ID, "[PAD]"),
                special(UNK_ID, "[UNK]"),
                special(CLS_ID, "[CLS]"),
                special(SEP_ID, "[SEP]"),
                special(MASK_ID, "[MASK]"),
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": {
                "type": "BertProcessing",
                "sep": ["[SEP]", SEP_ID],
                "cls": ["[CLS]", CLS_ID]
            },
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let tok_path = self.path();
        std::fs::write(&tok_path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write '{}'", tok_path.display()))?;

        tracing::info!("Tokenizer built with {} entries, saved to '{}'",
            next_id, tok_path.display());

        load_file(&tok_path)
    }
}

/// Number of embedding rows needed to look up every id the tokenizer emits
pub fn id_space(tokenizer: &Tokenizer) -> usize {
    let largest = tokenizer
        .get_vocab(true)
        .into_values()
        .max()
        .unwrap_or(0)
        .max(MASK_ID);
    largest as usize + 1
}

fn load_file(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {e}", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_tokenizer_wraps_with_cls_and_sep() {
        let dir   = std::env::temp_dir().join(format!("mtb-tok-{}", std::process::id()));
        let _     = std::fs::remove_dir_all(&dir);
        let store = TokenizerStore::new(&dir);

        let tok = store.resolve(None, &["a good movie", "a bad movie"], 200).unwrap();
        let enc = tok.encode("a good film", true).unwrap();
        let ids = enc.get_ids();

        assert_eq!(ids.first(), Some(&CLS_ID));
        assert_eq!(ids.last(),  Some(&SEP_ID));
        // "film" is out of vocabulary
        assert_eq!(ids[3], UNK_ID);

        // Second resolve loads the saved file and agrees
        let again = store.resolve(None, &[], 200).unwrap();
        assert_eq!(again.encode("a good film", true).unwrap().get_ids(), ids);
    }

    #[test]
    fn test_id_space_covers_special_ids_of_a_tiny_vocab() {
        let dir   = std::env::temp_dir().join(format!("mtb-tok-space-{}", std::process::id()));
        let _     = std::fs::remove_dir_all(&dir);
        let store = TokenizerStore::new(&dir);

        // Room for no words at all: only the five special tokens survive
        let tok = store.resolve(None, &["a good movie"], 64).unwrap();
        assert!(tok.get_vocab_size(true) < 64);
        assert_eq!(id_space(&tok), MASK_ID as usize + 1);

        let _   = std::fs::remove_dir_all(&dir);
        let tok = TokenizerStore::new(&dir).resolve(None, &["a good movie"], 200).unwrap();
        assert_eq!(id_space(&tok), FIRST_WORD_ID + 3);
    }
}

// Lexicon Service
// Static stop-word reference data, parsed once and shared read-only.

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::info;

const BUILTIN_STOPWORDS: &str = include_str!("../../data/stopwords_en.txt");

/// Immutable stop-word table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopWords {
    words: BTreeSet<String>,
}

impl StopWords {
    /// The English list compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_STOPWORDS)
    }

    /// Load a list from disk. Missing or corrupt files are an error, never an
    /// empty table.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let words = Self::parse(&content)?;
        info!(path = %path.display(), entries = words.len(), "stopwords.loaded");
        Ok(words)
    }

    /// Parse one token per line. `#` starts a comment line. Entries must already
    /// be in tokenizer form: lowercase letters, digits or apostrophes.
    pub fn parse(content: &str) -> Result<Self> {
        let mut words = BTreeSet::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(bad) = line
                .chars()
                .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '\''))
            {
                return Err(Error::StopWords {
                    line: idx + 1,
                    reason: format!("unexpected character {:?} in {:?}", bad, line),
                });
            }
            words.insert(line.to_string());
        }

        if words.is_empty() {
            return Err(Error::EmptyStopWords);
        }
        Ok(Self { words })
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

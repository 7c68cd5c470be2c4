//! Morphological analysis capability: token -> dictionary form.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::TopicsResult;

/// Reduces a token to its dictionary form.
pub trait Lemmatizer: Send + Sync {
    fn lemma(&self, token: &str) -> String;
}

/// Lower-cased surface form. Used when no morphological data is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityLemmatizer;

impl Lemmatizer for IdentityLemmatizer {
    fn lemma(&self, token: &str) -> String {
        token.to_lowercase()
    }
}

/// Lookup table of `form -> lemma` pairs, loaded from a tab-separated file.
/// Unknown forms pass through lower-cased.
#[derive(Debug, Default, Clone)]
pub struct DictionaryLemmatizer {
    forms: HashMap<String, String>,
}

impl DictionaryLemmatizer {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        let forms = pairs
            .into_iter()
            .map(|(form, lemma)| (form.as_ref().to_lowercase(), lemma.as_ref().to_lowercase()))
            .collect();
        Self { forms }
    }

    /// Parse `form<TAB>lemma` lines. Blank lines and `#` comments are skipped;
    /// malformed lines are logged and ignored.
    pub fn from_reader<R: BufRead>(reader: R) -> TopicsResult<Self> {
        let mut forms = HashMap::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match trimmed.split_once('\t') {
                Some((form, lemma)) if !form.trim().is_empty() && !lemma.trim().is_empty() => {
                    forms.insert(form.trim().to_lowercase(), lemma.trim().to_lowercase());
                }
                _ => tracing::warn!(line = line_no + 1, "Skipping malformed lemma dictionary line"),
            }
        }
        tracing::debug!(entries = forms.len(), "Lemma dictionary loaded");
        Ok(Self { forms })
    }

    pub fn load(path: &Path) -> TopicsResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

impl Lemmatizer for DictionaryLemmatizer {
    fn lemma(&self, token: &str) -> String {
        let lower = token.to_lowercase();
        match self.forms.get(&lower) {
            Some(lemma) => lemma.clone(),
            None => lower,
        }
    }
}

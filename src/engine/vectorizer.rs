use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};
use super::sparse::SparseVector;
use super::text::{analyze, StopWords};

/// Analyzer settings for the TF-IDF vectorizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    pub stop_words: StopWords,
    pub ngram_range: (usize, usize),
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            stop_words: StopWords::English,
            ngram_range: (1, 2),
        }
    }
}

/// TF-IDF vectorizer with a frozen vocabulary
///
/// Weights are raw term counts times the smoothed inverse document frequency
/// `ln((1 + n) / (1 + df)) + 1`, and every output row is L2-normalized.
/// Term indices follow lexicographic term order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VectorizerState", into = "VectorizerState")]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    terms: Vec<String>,
    idf: Vec<f64>,
    vocabulary: HashMap<String, usize>,
}

/// On-disk form: the lookup table is rebuilt from `terms` on load
#[derive(Serialize, Deserialize)]
struct VectorizerState {
    config: VectorizerConfig,
    terms: Vec<String>,
    idf: Vec<f64>,
}

impl From<VectorizerState> for TfidfVectorizer {
    fn from(state: VectorizerState) -> Self {
        let vocabulary = state
            .terms
            .iter()
            .enumerate()
            .map(|(index, term)| (term.clone(), index))
            .collect();
        Self {
            config: state.config,
            terms: state.terms,
            idf: state.idf,
            vocabulary,
        }
    }
}

impl From<TfidfVectorizer> for VectorizerState {
    fn from(vectorizer: TfidfVectorizer) -> Self {
        Self {
            config: vectorizer.config,
            terms: vectorizer.terms,
            idf: vectorizer.idf,
        }
    }
}

impl TfidfVectorizer {
    /// Learns the vocabulary and document frequencies of `documents`
    pub fn fit<'a>(
        documents: impl IntoIterator<Item = &'a str>,
        config: VectorizerConfig,
    ) -> EngineResult<Self> {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        let mut n_documents = 0usize;

        for document in documents {
            n_documents += 1;
            let mut terms = analyze(document, config.stop_words, config.ngram_range);
            terms.sort_unstable();
            terms.dedup();
            for term in terms {
                *document_frequency.entry(term).or_default() += 1;
            }
        }

        if n_documents == 0 {
            return Err(EngineError::EmptyCatalog);
        }
        if document_frequency.is_empty() {
            return Err(EngineError::EmptyVocabulary);
        }

        let n = n_documents as f64;
        let (terms, idf): (Vec<String>, Vec<f64>) = document_frequency
            .into_iter()
            .map(|(term, df)| {
                let weight = ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0;
                (term, weight)
            })
            .unzip();

        tracing::debug!(
            documents = n_documents,
            vocabulary = terms.len(),
            "Fitted TF-IDF vocabulary"
        );

        Ok(VectorizerState { config, terms, idf }.into())
    }

    /// Maps `text` to its normalized TF-IDF vector
    ///
    /// Terms outside the fitted vocabulary are ignored, so unseen text yields
    /// a zero vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let pairs = analyze(text, self.config.stop_words, self.config.ngram_range)
            .into_iter()
            .filter_map(|term| self.vocabulary.get(&term).copied())
            .map(|index| (index, self.idf[index]));
        let mut vector = SparseVector::from_pairs(pairs);
        vector.normalize();
        vector
    }

    pub fn config(&self) -> VectorizerConfig {
        self.config
    }

    pub fn vocabulary_size(&self) -> usize {
        self.terms.len()
    }

    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub(crate) fn check_consistency(&self) -> EngineResult<()> {
        if self.terms.len() != self.idf.len() || self.vocabulary.len() != self.terms.len() {
            return Err(EngineError::CorruptArtifact(format!(
                "vectorizer has {} terms, {} idf weights and {} distinct entries",
                self.terms.len(),
                self.idf.len(),
                self.vocabulary.len()
            )));
        }
        Ok(())
    }
}

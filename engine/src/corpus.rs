use crate::CorpusError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub type WordId = String;
pub type DocId = String;
pub type QueryId = String;

/// Sparse document vector: word id -> weight. Zero-weight terms are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BagOfWords(IndexMap<WordId, f64>);

impl BagOfWords {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, word_id: impl Into<WordId>, weight: f64) {
        self.0.insert(word_id.into(), weight);
    }

    pub fn get(&self, word_id: &str) -> Option<f64> { self.0.get(word_id).copied() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(id, w)| (id.as_str(), *w))
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl<K: Into<WordId>> FromIterator<(K, f64)> for BagOfWords {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Orders a pair of word ids the way the similarity table stores them.
///
/// Ids are numeric-coded strings and compare as numbers. A pair where either side
/// does not parse falls back to plain string order; ties between numerically equal
/// spellings ("1" vs "01") are broken the same way, so the result never depends on
/// argument order.
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    let ord = match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    };
    if ord == Ordering::Greater { (b, a) } else { (a, b) }
}

/// Symmetric word-to-word similarity, stored once per unordered pair under the smaller id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimilarityTable(IndexMap<WordId, IndexMap<WordId, f64>>);

impl SimilarityTable {
    pub fn new() -> Self { Self::default() }

    /// Stored similarity for the pair, in either argument order. Self-pairs are not stored.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let (lo, hi) = canonical_pair(a, b);
        self.0.get(lo).and_then(|row| row.get(hi)).copied()
    }

    /// Stores `value` under the canonical orientation. Self-pairs are implicitly 1.0 and ignored.
    pub fn insert(&mut self, a: &str, b: &str, value: f64) {
        if a == b { return; }
        let (lo, hi) = canonical_pair(a, b);
        self.0.entry(lo.to_string()).or_default().insert(hi.to_string(), value);
    }

    /// Raw `(outer, inner, value)` entries exactly as stored.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.0
            .iter()
            .flat_map(|(lo, row)| row.iter().map(move |(hi, v)| (lo.as_str(), hi.as_str(), *v)))
    }

    pub fn len(&self) -> usize { self.0.values().map(|row| row.len()).sum() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// The loaded corpus. Read-only while any computation over it is running.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Corpus {
    pub version: String,
    pub dictionary: IndexMap<WordId, String>,
    /// Query id -> ordered result document ids. Seeds the graph's node set.
    pub results: IndexMap<QueryId, Vec<DocId>>,
    /// Document id -> token sequence as word ids.
    pub texts: IndexMap<DocId, Vec<WordId>>,
    pub texts_bow: IndexMap<DocId, BagOfWords>,
    pub word_similarities: SimilarityTable,
}

impl Corpus {
    pub fn new() -> Self { Self::default() }

    pub fn bag_of_words(&self, doc_id: &str) -> Result<&BagOfWords, CorpusError> {
        self.texts_bow
            .get(doc_id)
            .ok_or_else(|| CorpusError::DocumentNotFound(doc_id.to_string()))
    }

    pub fn word(&self, word_id: &str) -> Result<&str, CorpusError> {
        self.dictionary
            .get(word_id)
            .map(String::as_str)
            .ok_or_else(|| CorpusError::WordNotFound(word_id.to_string()))
    }

    /// Reverse dictionary lookup. Linear in the dictionary size.
    pub fn word_id(&self, word: &str) -> Option<&str> {
        self.dictionary
            .iter()
            .find(|(_, w)| w.as_str() == word)
            .map(|(id, _)| id.as_str())
    }

    pub fn document_tokens(&self, doc_id: &str) -> Result<&[WordId], CorpusError> {
        self.texts
            .get(doc_id)
            .map(Vec::as_slice)
            .ok_or_else(|| CorpusError::DocumentNotFound(doc_id.to_string()))
    }

    /// The document's tokens mapped through the dictionary, in text order.
    pub fn document_words(&self, doc_id: &str) -> Result<Vec<&str>, CorpusError> {
        self.document_tokens(doc_id)?.iter().map(|id| self.word(id)).collect()
    }

    pub fn num_queries(&self) -> usize { self.results.len() }

    /// Consistency report for boundary validation. The engine itself never calls this.
    pub fn check_references(&self) -> Vec<ReferenceIssue> {
        let mut issues = Vec::new();
        for (doc_id, bow) in &self.texts_bow {
            for (word_id, weight) in bow.iter() {
                if !self.dictionary.contains_key(word_id) {
                    issues.push(ReferenceIssue::UnknownWord { word_id: word_id.to_string(), context: format!("texts_bow[{doc_id}]") });
                }
                if !(weight > 0.0) {
                    issues.push(ReferenceIssue::NonPositiveWeight { doc_id: doc_id.clone(), word_id: word_id.to_string(), weight });
                }
            }
        }
        for (doc_id, tokens) in &self.texts {
            for word_id in tokens {
                if !self.dictionary.contains_key(word_id) {
                    issues.push(ReferenceIssue::UnknownWord { word_id: word_id.clone(), context: format!("texts[{doc_id}]") });
                }
            }
        }
        for (query_id, docs) in &self.results {
            for doc_id in docs {
                if !self.texts_bow.contains_key(doc_id) {
                    issues.push(ReferenceIssue::UnknownDocument { doc_id: doc_id.clone(), query_id: query_id.clone() });
                }
            }
        }
        for (lo, hi, value) in self.word_similarities.entries() {
            for id in [lo, hi] {
                if !self.dictionary.contains_key(id) {
                    issues.push(ReferenceIssue::UnknownWord { word_id: id.to_string(), context: "word_similarities".into() });
                }
            }
            if !(0.0..=1.0).contains(&value) {
                issues.push(ReferenceIssue::SimilarityOutOfRange { first: lo.to_string(), second: hi.to_string(), value });
            }
            if canonical_pair(lo, hi) != (lo, hi) || lo == hi {
                issues.push(ReferenceIssue::NonCanonicalSimilarity { first: lo.to_string(), second: hi.to_string() });
            }
        }
        issues
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceIssue {
    UnknownWord { word_id: WordId, context: String },
    UnknownDocument { doc_id: DocId, query_id: QueryId },
    NonPositiveWeight { doc_id: DocId, word_id: WordId, weight: f64 },
    SimilarityOutOfRange { first: WordId, second: WordId, value: f64 },
    /// Stored under the larger id (or as a self-pair); canonical lookups never see it.
    NonCanonicalSimilarity { first: WordId, second: WordId },
}

impl fmt::Display for ReferenceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceIssue::UnknownWord { word_id, context } => write!(f, "{context}: word id {word_id} missing from dictionary"),
            ReferenceIssue::UnknownDocument { doc_id, query_id } => write!(f, "results[{query_id}]: document {doc_id} has no bag-of-words"),
            ReferenceIssue::NonPositiveWeight { doc_id, word_id, weight } => write!(f, "texts_bow[{doc_id}][{word_id}]: weight {weight} is not positive"),
            ReferenceIssue::SimilarityOutOfRange { first, second, value } => write!(f, "word_similarities[{first}][{second}]: {value} outside [0, 1]"),
            ReferenceIssue::NonCanonicalSimilarity { first, second } => write!(f, "word_similarities[{first}][{second}]: not stored under the smaller id"),
        }
    }
}

//! Which word pairs make two documents similar, and by how much.

use crate::similarity::{norm_factor, soft_cosine_measure, word_similarity};
use crate::{Corpus, CorpusError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A (word in first document, word in second document) pair. Order matters: (a, b) != (b, a).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WordPair {
    pub first: String,
    pub second: String,
}

impl WordPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self { first: first.into(), second: second.into() }
    }

    pub fn is_exact(&self) -> bool { self.first == self.second }
}

pub type WordPairs = IndexMap<WordPair, f64>;

/// Raw contribution of every word pair to the inner product of `doc1` and `doc2`.
///
/// Zero contributions are skipped. Id pairs that map to the same literal words are summed.
pub fn word_importance_pairs(doc1: &str, doc2: &str, corpus: &Corpus) -> Result<WordPairs, CorpusError> {
    let bow1 = corpus.bag_of_words(doc1)?;
    let bow2 = corpus.bag_of_words(doc2)?;
    let mut pairs = WordPairs::new();
    for (w1, weight1) in bow1.iter() {
        for (w2, weight2) in bow2.iter() {
            let importance = weight1 * word_similarity(w1, w2, corpus) * weight2;
            if importance == 0.0 {
                continue;
            }
            let key = WordPair::new(corpus.word(w1)?, corpus.word(w2)?);
            *pairs.entry(key).or_insert(0.0) += importance;
        }
    }
    Ok(pairs)
}

/// [`word_importance_pairs`] divided by the documents' norm factor.
///
/// The values sum to the soft cosine measure of the two documents.
pub fn normalized_word_importance_pairs(doc1: &str, doc2: &str, corpus: &Corpus) -> Result<WordPairs, CorpusError> {
    let mut pairs = word_importance_pairs(doc1, doc2, corpus)?;
    let norm = norm_factor(doc1, doc2, corpus)?;
    for v in pairs.values_mut() {
        *v /= norm;
    }
    Ok(pairs)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchClassification {
    /// Same word on both sides: word -> importance.
    pub exact: IndexMap<String, f64>,
    /// Distinct but related words.
    pub soft: IndexMap<WordPair, f64>,
}

impl MatchClassification {
    /// Exact matches, most important first.
    pub fn ranked_exact(&self) -> Vec<(&str, f64)> {
        let mut items: Vec<(&str, f64)> = self.exact.iter().map(|(w, v)| (w.as_str(), *v)).collect();
        items.sort_by(|a, b| by_importance(a.1, b.1).then_with(|| a.0.cmp(b.0)));
        items
    }

    /// Soft matches, most important first.
    pub fn ranked_soft(&self) -> Vec<(&WordPair, f64)> {
        let mut items: Vec<(&WordPair, f64)> = self.soft.iter().map(|(p, v)| (p, *v)).collect();
        items.sort_by(|a, b| by_importance(a.1, b.1).then_with(|| a.0.cmp(b.0)));
        items
    }
}

fn by_importance(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Splits pairs into exact and soft matches. Every input key lands in exactly one side.
pub fn classify_pairs(pairs: &WordPairs) -> MatchClassification {
    let mut out = MatchClassification::default();
    for (pair, importance) in pairs {
        if pair.is_exact() {
            out.exact.insert(pair.first.clone(), *importance);
        } else {
            out.soft.insert(pair.clone(), *importance);
        }
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedMatch {
    pub first: String,
    pub second: String,
    pub importance: f64,
}

/// Everything needed to explain why two documents are similar.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentComparison {
    pub first: String,
    pub second: String,
    pub measure: f64,
    pub exact: Vec<RankedMatch>,
    pub soft: Vec<RankedMatch>,
}

/// Soft cosine measure plus ranked exact/soft matches. `top` truncates each list.
pub fn compare_documents(doc1: &str, doc2: &str, top: Option<usize>, corpus: &Corpus) -> Result<DocumentComparison, CorpusError> {
    let measure = soft_cosine_measure(doc1, doc2, corpus)?;
    let classes = classify_pairs(&normalized_word_importance_pairs(doc1, doc2, corpus)?);
    let limit = top.unwrap_or(usize::MAX);
    let exact = classes
        .ranked_exact()
        .into_iter()
        .take(limit)
        .map(|(w, importance)| RankedMatch { first: w.to_string(), second: w.to_string(), importance })
        .collect();
    let soft = classes
        .ranked_soft()
        .into_iter()
        .take(limit)
        .map(|(p, importance)| RankedMatch { first: p.first.clone(), second: p.second.clone(), importance })
        .collect();
    Ok(DocumentComparison { first: doc1.to_string(), second: doc2.to_string(), measure, exact, soft })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Corpus {
        let mut c = Corpus::new();
        // two ids spell the same word so their contributions merge
        for (id, w) in [("0", "cat"), ("1", "dog"), ("2", "cat"), ("3", "fox")] {
            c.dictionary.insert(id.into(), w.into());
        }
        c.texts_bow.insert("x".into(), [("0", 1.0), ("2", 1.0), ("3", 2.0)].into_iter().collect());
        c.texts_bow.insert("y".into(), [("0", 1.0), ("1", 1.0)].into_iter().collect());
        c.word_similarities.insert("0", "1", 0.5);
        c.word_similarities.insert("1", "2", 0.5);
        c.word_similarities.insert("1", "3", 0.25);
        c
    }

    #[test]
    fn contributions_merge_by_literal_word() {
        let pairs = word_importance_pairs("x", "y", &corpus()).unwrap();
        // (0,0) contributes 1.0; (2,0) is unrelated by id
        assert_eq!(pairs[&WordPair::new("cat", "cat")], 1.0);
        // (0,1) and (2,1) both read "cat"/"dog"
        assert_eq!(pairs[&WordPair::new("cat", "dog")], 1.0);
        assert_eq!(pairs[&WordPair::new("fox", "dog")], 0.5);
        assert!(!pairs.contains_key(&WordPair::new("dog", "fox")));
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn classification_partitions() {
        let pairs = word_importance_pairs("x", "y", &corpus()).unwrap();
        let classes = classify_pairs(&pairs);
        assert_eq!(classes.exact.len() + classes.soft.len(), pairs.len());
        assert_eq!(classes.exact.get("cat"), Some(&1.0));
        let ranked = classes.ranked_soft();
        assert_eq!(ranked[0].0, &WordPair::new("cat", "dog"));
        assert_eq!(ranked[1].0, &WordPair::new("fox", "dog"));
    }

    #[test]
    fn comparison_is_truncated() {
        let cmp = compare_documents("x", "y", Some(1), &corpus()).unwrap();
        assert_eq!(cmp.exact.len(), 1);
        assert_eq!(cmp.soft.len(), 1);
        assert_eq!(cmp.soft[0].first, "cat");
    }
}

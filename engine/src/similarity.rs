//! Soft cosine similarity over sparse bag-of-words vectors.
//!
//! Every function takes the corpus explicitly; nothing here holds state.

use crate::{Corpus, CorpusError};

/// Similarity between two word ids. Identical ids are always 1.0; pairs absent from the table are 0.0.
pub fn word_similarity(id1: &str, id2: &str, corpus: &Corpus) -> f64 {
    if id1 == id2 {
        return 1.0;
    }
    corpus.word_similarities.get(id1, id2).unwrap_or(0.0)
}

/// Like [`word_similarity`] but addressed by literal words.
pub fn word_similarity_by_word(word1: &str, word2: &str, corpus: &Corpus) -> Result<f64, CorpusError> {
    let id1 = corpus.word_id(word1).ok_or_else(|| CorpusError::WordNotFound(word1.to_string()))?;
    let id2 = corpus.word_id(word2).ok_or_else(|| CorpusError::WordNotFound(word2.to_string()))?;
    Ok(word_similarity(id1, id2, corpus))
}

/// Σ sim(w1, w2) · weight1 · weight2 over the full cross product of both vectors.
pub fn inner_product(doc1: &str, doc2: &str, corpus: &Corpus) -> Result<f64, CorpusError> {
    let bow1 = corpus.bag_of_words(doc1)?;
    let bow2 = corpus.bag_of_words(doc2)?;
    let mut sum = 0.0;
    for (w1, weight1) in bow1.iter() {
        for (w2, weight2) in bow2.iter() {
            sum += word_similarity(w1, w2, corpus) * weight1 * weight2;
        }
    }
    Ok(sum)
}

/// Self inner product over unordered index pairs (i <= j); off-diagonal terms count twice.
pub fn inner_product_self(doc: &str, corpus: &Corpus) -> Result<f64, CorpusError> {
    let entries: Vec<(&str, f64)> = corpus.bag_of_words(doc)?.iter().collect();
    let mut sum = 0.0;
    for i in 0..entries.len() {
        let (w1, weight1) = entries[i];
        sum += word_similarity(w1, w1, corpus) * weight1 * weight1;
        for &(w2, weight2) in &entries[i + 1..] {
            sum += 2.0 * word_similarity(w1, w2, corpus) * weight1 * weight2;
        }
    }
    Ok(sum)
}

/// sqrt(self(doc1) · self(doc2)); a zero self product counts as 1.0.
pub fn norm_factor(doc1: &str, doc2: &str, corpus: &Corpus) -> Result<f64, CorpusError> {
    let n1 = unit_if_zero(inner_product_self(doc1, corpus)?);
    let n2 = unit_if_zero(inner_product_self(doc2, corpus)?);
    Ok((n1 * n2).sqrt())
}

#[inline]
fn unit_if_zero(v: f64) -> f64 {
    if v == 0.0 { 1.0 } else { v }
}

/// Soft cosine measure between two documents.
///
/// Usually in `[0, 1]`. Because a degenerate (zero) self product is replaced by a unit
/// norm rather than rejected, documents with tiny weights can score above 1.
pub fn soft_cosine_measure(doc1: &str, doc2: &str, corpus: &Corpus) -> Result<f64, CorpusError> {
    Ok(inner_product(doc1, doc2, corpus)? / norm_factor(doc1, doc2, corpus)?)
}

/// Document text: the token sequence mapped through the dictionary, joined by spaces.
pub fn document_text(doc: &str, corpus: &Corpus) -> Result<String, CorpusError> {
    Ok(corpus.document_words(doc)?.join(" "))
}

use approx::assert_abs_diff_eq;
use engine::persist::parse_corpus;
use engine::{
    classify_pairs, inner_product, inner_product_self, normalized_word_importance_pairs, soft_cosine_measure, word_similarity,
    Corpus, CorpusError,
};

fn cat_dog() -> Corpus {
    parse_corpus(
        r#"{
            "version": "1",
            "dictionary": {"0": "cat", "1": "dog"},
            "results": {"q": ["d1", "d2"]},
            "texts": {"d1": ["0"], "d2": ["1"]},
            "texts_bow": {"d1": {"0": 1.0}, "d2": {"1": 1.0}},
            "word_similarities": {"0": {"1": 0.5}}
        }"#,
    )
    .unwrap()
}

fn richer() -> Corpus {
    parse_corpus(
        r#"{
            "version": "1",
            "dictionary": {"0": "the", "1": "cat", "2": "kitten", "3": "dog", "4": "puppy", "11": "sat", "12": "rested"},
            "results": {},
            "texts": {},
            "texts_bow": {
                "a": {"1": 2.0, "11": 1.0, "3": 0.5},
                "b": {"2": 1.5, "12": 1.0, "4": 1.0},
                "c": {"0": 3.0}
            },
            "word_similarities": {
                "1": {"2": 0.9, "3": 0.3},
                "2": {"4": 0.4},
                "3": {"4": 0.8},
                "11": {"12": 0.6}
            }
        }"#,
    )
    .unwrap()
}

#[test]
fn cat_dog_example() {
    let c = cat_dog();
    assert_abs_diff_eq!(inner_product("d1", "d2", &c).unwrap(), 0.5);
    assert_abs_diff_eq!(inner_product_self("d1", &c).unwrap(), 1.0);
    assert_abs_diff_eq!(inner_product_self("d2", &c).unwrap(), 1.0);
    assert_abs_diff_eq!(soft_cosine_measure("d1", "d2", &c).unwrap(), 0.5);
}

#[test]
fn self_similarity_is_one() {
    let c = richer();
    for doc in ["a", "b", "c"] {
        assert_abs_diff_eq!(soft_cosine_measure(doc, doc, &c).unwrap(), 1.0, epsilon = 1e-12);
    }
}

#[test]
fn word_similarity_symmetry_and_identity() {
    let c = richer();
    let ids: Vec<&str> = c.dictionary.keys().map(String::as_str).chain(["404"]).collect();
    for a in &ids {
        assert_eq!(word_similarity(a, a, &c), 1.0);
        for b in &ids {
            assert_eq!(word_similarity(a, b, &c), word_similarity(b, a, &c), "{a} vs {b}");
        }
    }
    // "11" < "12" numerically and lexically; "3" < "11" only numerically
    assert_eq!(word_similarity("12", "11", &c), 0.6);
}

#[test]
fn soft_cosine_is_symmetric() {
    let c = richer();
    assert_abs_diff_eq!(
        soft_cosine_measure("a", "b", &c).unwrap(),
        soft_cosine_measure("b", "a", &c).unwrap(),
        epsilon = 1e-12
    );
}

#[test]
fn normalized_importances_sum_to_measure() {
    let c = richer();
    for (d1, d2) in [("a", "b"), ("b", "a"), ("a", "a"), ("a", "c")] {
        let total: f64 = normalized_word_importance_pairs(d1, d2, &c).unwrap().values().sum();
        assert_abs_diff_eq!(total, soft_cosine_measure(d1, d2, &c).unwrap(), epsilon = 1e-12);
    }
}

#[test]
fn classification_is_exhaustive_and_disjoint() {
    let c = richer();
    let pairs = normalized_word_importance_pairs("a", "a", &c).unwrap();
    let classes = classify_pairs(&pairs);
    assert_eq!(classes.exact.len() + classes.soft.len(), pairs.len());
    for (pair, v) in &pairs {
        if pair.first == pair.second {
            assert_eq!(classes.exact.get(&pair.first), Some(v));
            assert!(!classes.soft.contains_key(pair));
        } else {
            assert_eq!(classes.soft.get(pair), Some(v));
        }
    }
}

#[test]
fn unrelated_documents_score_zero() {
    let c = richer();
    assert_eq!(soft_cosine_measure("a", "c", &c).unwrap(), 0.0);
    assert!(normalized_word_importance_pairs("a", "c", &c).unwrap().is_empty());
}

#[test]
fn inconsistent_similarities_can_exceed_one() {
    // sim(a,b) = sim(b,c) = 1 but sim(a,c) = 0 is not a valid similarity geometry
    let c = parse_corpus(
        r#"{
            "version": "1",
            "dictionary": {"0": "a", "1": "b", "2": "c"},
            "results": {}, "texts": {},
            "texts_bow": {"ac": {"0": 1.0, "2": 1.0}, "b": {"1": 1.0}},
            "word_similarities": {"0": {"1": 1.0}, "1": {"2": 1.0}}
        }"#,
    )
    .unwrap();
    let scm = soft_cosine_measure("ac", "b", &c).unwrap();
    assert_abs_diff_eq!(scm, 2.0_f64.sqrt(), epsilon = 1e-12);
    assert!(scm > 1.0);
}

#[test]
fn zero_weight_document_uses_unit_norm() {
    let mut c = cat_dog();
    c.texts_bow.insert("z".into(), [("0", 0.0)].into_iter().collect());
    assert_eq!(inner_product_self("z", &c).unwrap(), 0.0);
    assert_eq!(soft_cosine_measure("z", "d1", &c).unwrap(), 0.0);
}

#[test]
fn missing_document_is_reported() {
    let c = cat_dog();
    assert_eq!(soft_cosine_measure("d1", "nope", &c), Err(CorpusError::DocumentNotFound("nope".into())));
    assert!(normalized_word_importance_pairs("nope", "d1", &c).is_err());
}

use criterion::{criterion_group, criterion_main, Criterion};
use engine::{generate_graph, soft_cosine_measure, Corpus};

fn synthetic(docs: usize, words: usize) -> Corpus {
    let mut c = Corpus::new();
    for w in 0..words {
        c.dictionary.insert(w.to_string(), format!("w{w}"));
        if w + 1 < words {
            c.word_similarities.insert(&w.to_string(), &(w + 1).to_string(), 0.5);
        }
    }
    for d in 0..docs {
        let bow = (0..words).filter(|w| (w + d) % 3 == 0).map(|w| (w.to_string(), 1.0 + (w % 5) as f64));
        c.texts_bow.insert(format!("d{d}"), bow.collect());
    }
    for q in 0..docs / 10 {
        c.texts_bow.insert(format!("q{q}"), [(q.to_string(), 1.0)].into_iter().collect());
        c.results.insert(format!("q{q}"), (0..9).map(|i| format!("d{}", (q * 9 + i) % docs)).collect());
    }
    c
}

fn bench_soft_cosine(c: &mut Criterion) {
    let corpus = synthetic(100, 200);
    c.bench_function("soft_cosine_measure", |b| b.iter(|| soft_cosine_measure("d1", "d2", &corpus)));
}

fn bench_generate_graph(c: &mut Criterion) {
    let corpus = synthetic(100, 60);
    c.bench_function("generate_graph_100", |b| b.iter(|| generate_graph(&corpus, |_, _| {})));
}

criterion_group!(benches, bench_soft_cosine, bench_generate_graph);
criterion_main!(benches);

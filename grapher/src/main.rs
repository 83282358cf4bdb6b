use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use engine::persist::{load_corpus, save_graph, GraphFile};
use engine::{compare_documents, document_text, Corpus, GraphData, GraphWorker, Stage};
use tracing_subscriber::{fmt, EnvFilter};

use std::path::Path;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "grapher")]
#[command(about = "Build and inspect soft-cosine similarity graphs over a corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the node/link graph for every query in the corpus
    Graph {
        /// Corpus JSON file
        #[arg(long)]
        corpus: String,
        /// Output graph JSON file
        #[arg(long)]
        output: String,
        /// Refuse corpora with dangling word or document references
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Explain the similarity between two documents
    Compare {
        #[arg(long)]
        corpus: String,
        #[arg(long)]
        doc1: String,
        #[arg(long)]
        doc2: String,
        /// Keep only the N most important exact and soft matches
        #[arg(long)]
        top: Option<usize>,
        /// Print the comparison as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print a document's text
    Text {
        #[arg(long)]
        corpus: String,
        #[arg(long)]
        doc: String,
    },
    /// Report dangling references and out-of-range values
    Check {
        #[arg(long)]
        corpus: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Graph { corpus, output, strict } => build_graph(&corpus, &output, strict).map(|_| ()),
        Commands::Compare { corpus, doc1, doc2, top, json } => {
            let corpus = load_corpus(&corpus)?;
            let cmp = compare_documents(&doc1, &doc2, top, &corpus)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&cmp)?);
                return Ok(());
            }
            println!("soft cosine measure {} ~ {}: {:.4}", cmp.first, cmp.second, cmp.measure);
            println!("exact matches:");
            for m in &cmp.exact {
                println!("  {:<24} {:.4}", m.first, m.importance);
            }
            println!("soft matches:");
            for m in &cmp.soft {
                println!("  {:<24} {:.4}", format!("{} ~ {}", m.first, m.second), m.importance);
            }
            Ok(())
        }
        Commands::Text { corpus, doc } => {
            let corpus = load_corpus(&corpus)?;
            println!("{}", document_text(&doc, &corpus)?);
            Ok(())
        }
        Commands::Check { corpus } => {
            let corpus = load_corpus(&corpus)?;
            if report_issues(&corpus) > 0 {
                bail!("corpus has reference issues");
            }
            println!("ok");
            Ok(())
        }
    }
}

fn report_issues(corpus: &Corpus) -> usize {
    let issues = corpus.check_references();
    for issue in &issues {
        tracing::warn!(%issue, "reference issue");
    }
    issues.len()
}

fn build_graph(corpus_path: &str, output: &str, strict: bool) -> Result<GraphData> {
    let corpus = load_corpus(corpus_path)?;
    if strict && report_issues(&corpus) > 0 {
        bail!("refusing to build graph: corpus has reference issues (run `grapher check`)");
    }
    let corpus = Arc::new(corpus);

    let worker = GraphWorker::new();
    let mut last_logged: Option<(Stage, u32)> = None;
    let graph = worker.submit(corpus.clone())?.wait_blocking(|stage, percent| {
        // one line per stage per 10% step
        let bucket = (percent / 10.0).floor() as u32;
        if last_logged != Some((stage, bucket)) {
            tracing::info!(%stage, percent, "progress");
            last_logged = Some((stage, bucket));
        }
    })?;

    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".into());
    let file = GraphFile::new(graph, &corpus, created_at);
    save_graph(Path::new(output), &file)?;
    tracing::info!(output, nodes = file.meta.nodes, links = file.meta.links, "graph written");
    Ok(file.graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::persist::load_graph;
    use std::fs;

    const CORPUS: &str = r#"{
        "version": "2",
        "dictionary": {"0": "cat", "1": "dog"},
        "results": {"q": ["d1", "d2"]},
        "texts": {"q": ["0"], "d1": ["0"], "d2": ["1"]},
        "texts_bow": {"q": {"0": 1.0}, "d1": {"0": 1.0}, "d2": {"1": 1.0}},
        "word_similarities": {"0": {"1": 0.5}}
    }"#;

    #[test]
    fn graph_command_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.json");
        fs::write(&corpus, CORPUS).unwrap();
        let out = dir.path().join("graph.json");

        let graph = build_graph(corpus.to_str().unwrap(), out.to_str().unwrap(), true).unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.links.len(), 3);

        let file = load_graph(&out).unwrap();
        assert_eq!(file.meta.corpus_version, "2");
        assert_eq!(file.graph, graph);
    }

    #[test]
    fn strict_mode_rejects_dangling_references() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.json");
        fs::write(&corpus, CORPUS.replace(r#""d2": {"1": 1.0}"#, r#""d2": {"7": 1.0}"#)).unwrap();
        let out = dir.path().join("graph.json");
        assert!(build_graph(corpus.to_str().unwrap(), out.to_str().unwrap(), true).is_err());
        assert!(!out.exists());
    }
}

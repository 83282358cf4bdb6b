use crate::{Corpus, CorpusError, GraphData};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub const GRAPH_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMeta {
    pub created_at: String,
    pub version: u32,
    pub corpus_version: String,
    pub nodes: usize,
    pub links: usize,
}

/// On-disk form of a generated graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphFile {
    pub meta: GraphMeta,
    pub graph: GraphData,
}

impl GraphFile {
    pub fn new(graph: GraphData, corpus: &Corpus, created_at: String) -> Self {
        let meta = GraphMeta {
            created_at,
            version: GRAPH_FILE_VERSION,
            corpus_version: corpus.version.clone(),
            nodes: graph.nodes.len(),
            links: graph.links.len(),
        };
        Self { meta, graph }
    }
}

/// Parses a corpus, rejecting missing, mistyped or unknown top-level fields.
pub fn parse_corpus(json: &str) -> Result<Corpus, CorpusError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Corpus> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("opening corpus {}", path.display()))?;
    let corpus: Corpus = serde_json::from_reader(BufReader::new(f))
        .map_err(CorpusError::from)
        .with_context(|| format!("reading corpus {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        words = corpus.dictionary.len(),
        documents = corpus.texts_bow.len(),
        queries = corpus.results.len(),
        "corpus loaded"
    );
    Ok(corpus)
}

pub fn save_graph<P: AsRef<Path>>(path: P, file: &GraphFile) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    let mut f = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut f, file)?;
    f.flush()?;
    Ok(())
}

pub fn load_graph<P: AsRef<Path>>(path: P) -> Result<GraphFile> {
    let f = File::open(path)?;
    let file = serde_json::from_reader(BufReader::new(f))?;
    Ok(file)
}

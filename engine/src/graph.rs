//! Node and link construction for the similarity graph.
//!
//! Both phases are plain iterators: each step reports a progress percentage and the
//! last step hands over the finished result. Callers decide how to schedule them.

use crate::similarity::soft_cosine_measure;
use crate::{Corpus, CorpusError, DocId, QueryId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum NodeGroup {
    Query = 1,
    Document = 2,
}

impl From<NodeGroup> for u8 {
    fn from(g: NodeGroup) -> u8 { g as u8 }
}

impl TryFrom<u8> for NodeGroup {
    type Error = String;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(NodeGroup::Query),
            2 => Ok(NodeGroup::Document),
            other => Err(format!("unknown node group {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub group: NodeGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    GeneratingNodes,
    CreatingLinks,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::GeneratingNodes => "Generating nodes...",
            Stage::CreatingLinks => "Creating links...",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

impl Serialize for Stage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    /// Percentage of the phase completed, 0..=100.
    Progress(f64),
    Done(T),
}

/// One query node per `results` entry, followed by a document node per referenced document.
///
/// Documents referenced by several queries appear once per reference.
pub struct NodeGenerator<'a> {
    queries: indexmap::map::Iter<'a, QueryId, Vec<DocId>>,
    total: usize,
    processed: usize,
    nodes: Vec<GraphNode>,
    finished: bool,
}

impl<'a> NodeGenerator<'a> {
    pub fn new(corpus: &'a Corpus) -> Self {
        let capacity = corpus.results.len() + corpus.results.values().map(Vec::len).sum::<usize>();
        Self {
            queries: corpus.results.iter(),
            total: corpus.results.len(),
            processed: 0,
            nodes: Vec::with_capacity(capacity),
            finished: false,
        }
    }
}

impl Iterator for NodeGenerator<'_> {
    type Item = Step<Vec<GraphNode>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.queries.next() {
            Some((query_id, docs)) => {
                self.nodes.push(GraphNode { id: query_id.clone(), group: NodeGroup::Query });
                self.nodes.extend(docs.iter().map(|d| GraphNode { id: d.clone(), group: NodeGroup::Document }));
                self.processed += 1;
                Some(Step::Progress(percent(self.processed, self.total)))
            }
            None => {
                self.finished = true;
                Some(Step::Done(std::mem::take(&mut self.nodes)))
            }
        }
    }
}

/// One link per unordered node pair (i < j), valued by the soft cosine measure of the node ids.
///
/// Yields one progress step per outer index. Stops after the first lookup failure.
pub struct LinkGenerator<'a> {
    corpus: &'a Corpus,
    ids: Vec<&'a str>,
    outer: usize,
    links: Vec<GraphLink>,
    finished: bool,
}

impl<'a> LinkGenerator<'a> {
    pub fn new(nodes: &'a [GraphNode], corpus: &'a Corpus) -> Self {
        let n = nodes.len();
        Self {
            corpus,
            ids: nodes.iter().map(|node| node.id.as_str()).collect(),
            outer: 0,
            links: Vec::with_capacity(n * n.saturating_sub(1) / 2),
            finished: false,
        }
    }
}

impl Iterator for LinkGenerator<'_> {
    type Item = Result<Step<Vec<GraphLink>>, CorpusError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let total = self.ids.len();
        if self.outer >= total {
            self.finished = true;
            return Some(Ok(Step::Done(std::mem::take(&mut self.links))));
        }
        let source = self.ids[self.outer];
        for &target in &self.ids[self.outer + 1..] {
            match soft_cosine_measure(source, target, self.corpus) {
                Ok(value) => self.links.push(GraphLink { source: source.to_string(), target: target.to_string(), value }),
                Err(e) => {
                    self.finished = true;
                    self.links.clear();
                    return Some(Err(e));
                }
            }
        }
        self.outer += 1;
        Some(Ok(Step::Progress(percent(self.outer, total))))
    }
}

fn percent(done: usize, total: usize) -> f64 {
    if total == 0 { 100.0 } else { done as f64 / total as f64 * 100.0 }
}

/// Runs both phases to completion on the calling thread.
pub fn generate_graph(corpus: &Corpus, mut on_progress: impl FnMut(Stage, f64)) -> Result<GraphData, CorpusError> {
    let mut nodes = Vec::new();
    for step in NodeGenerator::new(corpus) {
        match step {
            Step::Progress(p) => on_progress(Stage::GeneratingNodes, p),
            Step::Done(n) => nodes = n,
        }
    }
    tracing::debug!(nodes = nodes.len(), queries = corpus.num_queries(), "nodes generated");

    let mut links = Vec::new();
    for step in LinkGenerator::new(&nodes, corpus) {
        match step? {
            Step::Progress(p) => on_progress(Stage::CreatingLinks, p),
            Step::Done(l) => links = l,
        }
    }
    tracing::debug!(links = links.len(), "links created");
    Ok(GraphData { nodes, links })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Corpus {
        let mut c = Corpus::new();
        c.dictionary.insert("0".into(), "cat".into());
        for id in ["q1", "q2", "d1", "d2"] {
            c.texts_bow.insert(id.into(), [("0", 1.0)].into_iter().collect());
        }
        c.results.insert("q1".into(), vec!["d1".into(), "d2".into()]);
        c.results.insert("q2".into(), vec!["d2".into()]);
        c
    }

    #[test]
    fn nodes_keep_duplicates_in_order() {
        let c = corpus();
        let steps: Vec<_> = NodeGenerator::new(&c).collect();
        assert_eq!(steps[0], Step::Progress(50.0));
        assert_eq!(steps[1], Step::Progress(100.0));
        let Step::Done(nodes) = &steps[2] else { panic!("expected nodes") };
        let ids: Vec<_> = nodes.iter().map(|n| (n.id.as_str(), n.group)).collect();
        assert_eq!(ids, vec![
            ("q1", NodeGroup::Query),
            ("d1", NodeGroup::Document),
            ("d2", NodeGroup::Document),
            ("q2", NodeGroup::Query),
            ("d2", NodeGroup::Document),
        ]);
        assert_eq!(steps.len(), 3);
    }

    #[test]
    fn links_cover_every_pair() {
        let c = corpus();
        let graph = generate_graph(&c, |_, _| {}).unwrap();
        assert_eq!(graph.nodes.len(), 5);
        assert_eq!(graph.links.len(), 10);
        assert!(graph.links.iter().all(|l| (l.value - 1.0).abs() < 1e-12));
    }

    #[test]
    fn missing_document_aborts_links() {
        let mut c = corpus();
        c.texts_bow.insert("q3".into(), [("0", 1.0)].into_iter().collect());
        c.results.insert("q3".into(), vec!["ghost".into()]);
        let err = generate_graph(&c, |_, _| {}).unwrap_err();
        assert_eq!(err, CorpusError::DocumentNotFound("ghost".into()));
    }

    #[test]
    fn empty_corpus_yields_empty_graph() {
        let mut stages = Vec::new();
        let graph = generate_graph(&Corpus::new(), |s, p| stages.push((s, p))).unwrap();
        assert_eq!(graph, GraphData::default());
        assert!(stages.is_empty());
    }

    #[test]
    fn group_serializes_as_number() {
        let json = serde_json::to_string(&GraphNode { id: "q".into(), group: NodeGroup::Query }).unwrap();
        assert_eq!(json, r#"{"id":"q","group":1}"#);
    }
}

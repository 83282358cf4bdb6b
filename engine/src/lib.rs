pub mod corpus;
pub mod error;
pub mod graph;
pub mod importance;
pub mod persist;
pub mod similarity;
pub mod worker;

pub use corpus::{BagOfWords, Corpus, DocId, QueryId, ReferenceIssue, SimilarityTable, WordId};
pub use error::{CorpusError, WorkerError};
pub use graph::{generate_graph, GraphData, GraphLink, GraphNode, NodeGroup, Stage};
pub use importance::{classify_pairs, compare_documents, normalized_word_importance_pairs, word_importance_pairs, DocumentComparison, MatchClassification, WordPair};
pub use similarity::{document_text, inner_product, inner_product_self, norm_factor, soft_cosine_measure, word_similarity, word_similarity_by_word};
pub use worker::{GraphEvent, GraphJob, GraphWorker, ProgressReport};

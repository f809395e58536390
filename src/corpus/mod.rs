mod collect;
mod graph;
mod parse;
mod topics;

pub use collect::{GraphSource, collect_corpus};
pub use graph::{Corpus, Layer};

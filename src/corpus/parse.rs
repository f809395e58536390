use anyhow::{Context, Result, ensure};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
pub(super) struct RawGraph {
    #[serde(default)]
    pub(super) keywords: Vec<RawKeyword>,
    #[serde(default)]
    pub(super) links: Vec<(String, String)>,
    #[serde(default)]
    pub(super) contents: Vec<RawContent>,
    #[serde(default)]
    pub(super) chunks: Vec<RawChunk>,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawKeyword {
    pub(super) id: String,
    #[serde(default)]
    pub(super) label: Option<String>,
    #[serde(default)]
    pub(super) weight: Option<f32>,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawContent {
    pub(super) id: String,
    #[serde(default)]
    pub(super) label: Option<String>,
    #[serde(default)]
    pub(super) parents: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawChunk {
    pub(super) id: String,
    #[serde(default)]
    pub(super) label: Option<String>,
    #[serde(default)]
    pub(super) keywords: Vec<String>,
}

pub(super) fn parse_graph_json(raw: &str) -> Result<RawGraph> {
    let graph: RawGraph = serde_json::from_str(raw).context("invalid graph JSON")?;
    ensure!(!graph.keywords.is_empty(), "graph JSON contains no keywords");
    Ok(graph)
}

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};

use super::graph::{ChunkRecord, ContentRecord, Corpus, KeywordRecord};
use super::parse::{RawChunk, RawContent, RawGraph, RawKeyword, parse_graph_json};
use super::topics::{detect_topics, modularity};
use crate::util::stable_hash;

pub const CHUNK_NEIGHBOUR_LIMIT: usize = 12;

const DEMO_TOPIC_SIZE: usize = 48;
const DEMO_SYLLABLES: [&str; 16] = [
    "ka", "lo", "mi", "ren", "sa", "tor", "vi", "nel", "qua", "dri", "po", "zen", "ul", "fa",
    "gri", "sho",
];

#[derive(Clone, Debug, PartialEq)]
pub enum GraphSource {
    File(PathBuf),
    Demo { keywords: usize },
}

impl GraphSource {
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Demo { keywords } => format!("demo graph ({keywords} keywords)"),
        }
    }
}

pub fn collect_corpus(source: &GraphSource, resolution: f64) -> Result<Corpus> {
    let raw = match source {
        GraphSource::File(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read graph file {}", path.display()))?;
            parse_graph_json(&text)
                .with_context(|| format!("failed to parse graph file {}", path.display()))?
        }
        GraphSource::Demo { keywords } => demo_graph(*keywords),
    };

    build_corpus(raw, source.describe(), resolution)
}

pub(super) fn build_corpus(raw: RawGraph, source: String, resolution: f64) -> Result<Corpus> {
    let mut keywords = Vec::with_capacity(raw.keywords.len());
    let mut keyword_index = HashMap::with_capacity(raw.keywords.len());
    for keyword in raw.keywords {
        let id = keyword.id.trim().to_owned();
        if id.is_empty() || keyword_index.contains_key(&id) {
            log::warn!("skipping empty or duplicate keyword id {:?}", keyword.id);
            continue;
        }

        keyword_index.insert(id.clone(), keywords.len());
        keywords.push(KeywordRecord {
            label: keyword.label.unwrap_or_else(|| id.clone()),
            weight: keyword
                .weight
                .filter(|weight| weight.is_finite())
                .unwrap_or(1.0)
                .max(0.0),
            id,
            neighbours: Vec::new(),
            topic: 0,
        });
    }
    ensure!(!keywords.is_empty(), "graph has no usable keywords");

    let mut seen_links = HashSet::new();
    let mut dropped_links = 0usize;
    for (from, to) in &raw.links {
        let (Some(&a), Some(&b)) = (keyword_index.get(from), keyword_index.get(to)) else {
            dropped_links += 1;
            continue;
        };
        if a == b || !seen_links.insert((a.min(b), a.max(b))) {
            continue;
        }
        keywords[a].neighbours.push(b);
        keywords[b].neighbours.push(a);
    }
    if dropped_links > 0 {
        log::warn!("dropped {dropped_links} links with unknown keyword ids");
    }

    let mut contents = Vec::with_capacity(raw.contents.len());
    let mut content_ids = HashSet::new();
    let mut dropped_parents = 0usize;
    for content in raw.contents {
        let mut parents = Vec::new();
        for parent in &content.parents {
            match keyword_index.get(parent) {
                Some(&slot) if !parents.contains(&slot) => parents.push(slot),
                Some(_) => {}
                None => dropped_parents += 1,
            }
        }
        if parents.is_empty() || !content_ids.insert(content.id.clone()) {
            log::warn!("skipping content {:?} without a known parent", content.id);
            continue;
        }
        contents.push(ContentRecord {
            label: content.label.unwrap_or_else(|| content.id.clone()),
            id: content.id,
            parents,
        });
    }
    if dropped_parents > 0 {
        log::warn!("dropped {dropped_parents} content parents with unknown keyword ids");
    }

    let mut chunk_keywords = Vec::with_capacity(raw.chunks.len());
    let mut chunk_meta = Vec::with_capacity(raw.chunks.len());
    for chunk in raw.chunks {
        let mut resolved = Vec::new();
        for keyword in &chunk.keywords {
            if let Some(&slot) = keyword_index.get(keyword)
                && !resolved.contains(&slot)
            {
                resolved.push(slot);
            }
        }
        chunk_meta.push((chunk.label.unwrap_or_else(|| chunk.id.clone()), chunk.id));
        chunk_keywords.push(resolved);
    }
    let neighbour_lists = chunk_neighbours(&chunk_keywords, keywords.len(), CHUNK_NEIGHBOUR_LIMIT);

    let mut edges = seen_links
        .iter()
        .map(|&(a, b)| (a, b, 1.0))
        .collect::<Vec<_>>();
    edges.sort_unstable_by_key(|&(a, b, _)| (a, b));
    let topics = detect_topics(keywords.len(), &edges, resolution);
    let score = modularity(keywords.len(), &edges, &topics.topics, resolution);
    for (keyword, &topic) in keywords.iter_mut().zip(&topics.topics) {
        keyword.topic = topic;
        keyword.neighbours.sort_unstable();
    }

    let chunks = chunk_meta
        .into_iter()
        .zip(chunk_keywords)
        .zip(neighbour_lists)
        .map(|(((label, id), members), neighbours)| ChunkRecord {
            topic: majority_topic(&members, &keywords),
            id,
            label,
            keywords: members,
            neighbours,
        })
        .collect::<Vec<_>>();

    log::info!(
        "loaded {source}: {} keywords, {} links, {} contents, {} chunks, {} topics (modularity {score:.3})",
        keywords.len(),
        edges.len(),
        contents.len(),
        chunks.len(),
        topics.count
    );

    Ok(Corpus {
        source,
        link_count: edges.len(),
        topic_count: topics.count,
        modularity: score,
        keywords,
        contents,
        chunks,
    })
}

fn majority_topic(members: &[usize], keywords: &[KeywordRecord]) -> usize {
    let mut counts = HashMap::<usize, usize>::new();
    for &member in members {
        if let Some(keyword) = keywords.get(member) {
            *counts.entry(keyword.topic).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map_or(0, |(topic, _)| topic)
}

/// Links every chunk to the chunks it shares the most keywords with, ties
/// broken by chunk order.
pub(super) fn chunk_neighbours(
    chunk_keywords: &[Vec<usize>],
    keyword_count: usize,
    limit: usize,
) -> Vec<Vec<usize>> {
    let mut chunks_by_keyword = vec![Vec::new(); keyword_count];
    for (chunk, members) in chunk_keywords.iter().enumerate() {
        for &keyword in members {
            if let Some(bucket) = chunks_by_keyword.get_mut(keyword) {
                bucket.push(chunk);
            }
        }
    }

    let mut shared = vec![0usize; chunk_keywords.len()];
    let mut touched = Vec::new();
    chunk_keywords
        .iter()
        .enumerate()
        .map(|(chunk, members)| {
            touched.clear();
            for &keyword in members {
                for &other in chunks_by_keyword.get(keyword).map(Vec::as_slice).unwrap_or_default() {
                    if other == chunk {
                        continue;
                    }
                    if shared[other] == 0 {
                        touched.push(other);
                    }
                    shared[other] += 1;
                }
            }

            let mut ranked = touched
                .iter()
                .map(|&other| (other, shared[other]))
                .collect::<Vec<_>>();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            ranked.truncate(limit);
            for &other in &touched {
                shared[other] = 0;
            }
            ranked.into_iter().map(|(other, _)| other).collect()
        })
        .collect()
}

fn demo_label(index: usize) -> String {
    let hash = stable_hash(&("label", index));
    let syllables = 2 + (hash % 2) as usize;
    let mut label = String::new();
    for part in 0..syllables {
        let pick = (hash >> (8 + part * 8)) as usize % DEMO_SYLLABLES.len();
        label.push_str(DEMO_SYLLABLES[pick]);
    }
    format!("{label}-{index}")
}

/// Deterministic synthetic graph: keywords clustered in groups of
/// `DEMO_TOPIC_SIZE` with sparse bridges, plus content and chunks.
pub(super) fn demo_graph(keyword_count: usize) -> RawGraph {
    let count = keyword_count.max(2);
    let id = |index: usize| format!("kw-{index}");

    let keywords = (0..count)
        .map(|index| RawKeyword {
            id: id(index),
            label: Some(demo_label(index)),
            weight: Some(1.0 + (stable_hash(&("weight", index)) % 9) as f32),
        })
        .collect::<Vec<_>>();

    let mut links = Vec::new();
    for index in 1..count {
        let hash = stable_hash(&("link", index));
        let group_start = (index / DEMO_TOPIC_SIZE) * DEMO_TOPIC_SIZE;
        let anchor = if index > group_start {
            group_start + (hash as usize) % (index - group_start)
        } else {
            (hash as usize) % index
        };
        links.push((id(index), id(anchor)));

        if index > group_start + 1 && hash % 3 == 0 {
            let second = group_start + ((hash >> 16) as usize) % (index - group_start);
            links.push((id(index), id(second)));
        }
        if hash % 17 == 0 {
            let bridge = ((hash >> 24) as usize) % count;
            links.push((id(index), id(bridge)));
        }
    }

    let contents = (0..count)
        .filter(|index| stable_hash(&("content", *index)) % 3 == 0)
        .map(|index| {
            let mut parents = vec![id(index)];
            if index > 0 && stable_hash(&("content-parent", index)) % 2 == 0 {
                parents.push(id(index - 1));
            }
            RawContent {
                id: format!("doc-{index}"),
                label: Some(format!("note on {}", demo_label(index))),
                parents,
            }
        })
        .collect();

    let groups = count.div_ceil(DEMO_TOPIC_SIZE);
    let chunks = (0..count / 4)
        .map(|chunk| {
            let group = chunk % groups;
            let group_start = group * DEMO_TOPIC_SIZE;
            let group_len = (count - group_start).min(DEMO_TOPIC_SIZE);
            let hash = stable_hash(&("chunk", chunk));
            let size = 3 + (hash % 3) as usize;
            let keywords = (0..size)
                .map(|part| {
                    let pick = (hash >> (4 + part * 9)) as usize % group_len;
                    id(group_start + pick)
                })
                .collect();
            RawChunk {
                id: format!("chunk-{chunk}"),
                label: Some(format!("passage {chunk}")),
                keywords,
            }
        })
        .collect();

    RawGraph {
        keywords,
        links,
        contents,
        chunks,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn keyword(id: &str) -> RawKeyword {
        RawKeyword {
            id: id.to_owned(),
            label: None,
            weight: None,
        }
    }

    fn link(a: &str, b: &str) -> (String, String) {
        (a.to_owned(), b.to_owned())
    }

    #[test]
    fn unknown_ids_are_dropped() {
        let raw = RawGraph {
            keywords: vec![keyword("a"), keyword("b"), keyword("c"), keyword("a")],
            links: vec![link("a", "b"), link("b", "ghost"), link("c", "c"), link("b", "a")],
            contents: vec![
                RawContent {
                    id: "doc".to_owned(),
                    label: None,
                    parents: vec!["ghost".to_owned(), "c".to_owned()],
                },
                RawContent {
                    id: "orphan".to_owned(),
                    label: None,
                    parents: vec!["ghost".to_owned()],
                },
            ],
            chunks: vec![RawChunk {
                id: "chunk".to_owned(),
                label: None,
                keywords: vec!["a".to_owned(), "nowhere".to_owned()],
            }],
        };

        let corpus = build_corpus(raw, "test".to_owned(), 1.0).expect("valid corpus");
        assert_eq!(corpus.keyword_count(), 3);
        assert_eq!(corpus.link_count, 1);
        assert_eq!(corpus.keywords[0].neighbours, vec![1]);
        assert!(corpus.keywords[2].neighbours.is_empty());
        assert_eq!(corpus.contents.len(), 1);
        assert_eq!(corpus.contents[0].parents, vec![2]);
        assert_eq!(corpus.chunks[0].keywords, vec![0]);
        assert_eq!(corpus.keywords[0].label, "a");
    }

    #[test]
    fn empty_keyword_list_is_an_error() {
        let raw = RawGraph {
            keywords: vec![keyword("  ")],
            ..RawGraph::default()
        };
        assert!(build_corpus(raw, "test".to_owned(), 1.0).is_err());
    }

    #[test]
    fn chunk_neighbours_rank_by_shared_keywords() {
        let chunks = vec![vec![0, 1, 2], vec![0, 1], vec![2], vec![5], vec![1, 2]];
        let neighbours = chunk_neighbours(&chunks, 6, 2);
        assert_eq!(neighbours[0], vec![1, 4]);
        assert_eq!(neighbours[2], vec![0, 4]);
        assert!(neighbours[3].is_empty());
    }

    #[test]
    fn demo_graph_is_deterministic_and_connected_per_topic() {
        let first = build_corpus(demo_graph(300), "demo".to_owned(), 1.0).expect("demo");
        let second = build_corpus(demo_graph(300), "demo".to_owned(), 1.0).expect("demo");
        assert_eq!(first.keyword_count(), 300);
        assert_eq!(first.link_count, second.link_count);
        assert_eq!(
            first.keywords.iter().map(|k| k.topic).collect::<Vec<_>>(),
            second.keywords.iter().map(|k| k.topic).collect::<Vec<_>>()
        );
        assert!(first.keywords.iter().skip(1).all(|k| !k.neighbours.is_empty()));
        assert!(first.topic_count > 1);
        assert_eq!(first.chunks.len(), 75);
        assert!(first.contents.iter().all(|c| !c.parents.is_empty()));
    }

    #[test]
    fn majority_topic_prefers_lower_topic_on_ties() {
        let mut keywords = Vec::new();
        for (index, topic) in [3, 1, 1, 3].into_iter().enumerate() {
            keywords.push(KeywordRecord {
                id: index.to_string(),
                label: index.to_string(),
                weight: 1.0,
                neighbours: Vec::new(),
                topic,
            });
        }
        assert_eq!(majority_topic(&[0, 1, 2, 3], &keywords), 1);
        assert_eq!(majority_topic(&[0], &keywords), 3);
        assert_eq!(majority_topic(&[], &keywords), 0);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Keywords,
    Chunks,
}

impl Layer {
    pub fn label(self) -> &'static str {
        match self {
            Self::Keywords => "Keywords",
            Self::Chunks => "Chunks",
        }
    }
}

#[derive(Clone, Debug)]
pub struct KeywordRecord {
    pub id: String,
    pub label: String,
    pub weight: f32,
    pub neighbours: Vec<usize>,
    pub topic: usize,
}

#[derive(Clone, Debug)]
pub struct ContentRecord {
    pub id: String,
    pub label: String,
    /// Keyword slots, never empty.
    pub parents: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct ChunkRecord {
    pub id: String,
    pub label: String,
    pub keywords: Vec<usize>,
    /// Chunks sharing the most keywords with this one, strongest first.
    pub neighbours: Vec<usize>,
    pub topic: usize,
}

#[derive(Clone, Debug)]
pub struct Corpus {
    pub source: String,
    pub keywords: Vec<KeywordRecord>,
    pub contents: Vec<ContentRecord>,
    pub chunks: Vec<ChunkRecord>,
    pub link_count: usize,
    pub topic_count: usize,
    pub modularity: f64,
}

impl Corpus {
    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    pub fn keyword_adjacency(&self) -> Vec<Vec<usize>> {
        self.keywords
            .iter()
            .map(|keyword| keyword.neighbours.clone())
            .collect()
    }

    pub fn chunk_adjacency(&self) -> Vec<Vec<usize>> {
        self.chunks
            .iter()
            .map(|chunk| chunk.neighbours.clone())
            .collect()
    }

    pub fn top_by_degree(&self, limit: usize) -> Vec<usize> {
        let mut slots = (0..self.keywords.len()).collect::<Vec<_>>();
        slots.sort_by(|&a, &b| {
            let (a_node, b_node) = (&self.keywords[a], &self.keywords[b]);
            b_node
                .neighbours
                .len()
                .cmp(&a_node.neighbours.len())
                .then_with(|| b_node.weight.total_cmp(&a_node.weight))
                .then_with(|| a.cmp(&b))
        });
        slots.truncate(limit);
        slots
    }

    pub fn top_by_weight(&self, limit: usize) -> Vec<usize> {
        let mut slots = (0..self.keywords.len()).collect::<Vec<_>>();
        slots.sort_by(|&a, &b| {
            let (a_node, b_node) = (&self.keywords[a], &self.keywords[b]);
            b_node
                .weight
                .total_cmp(&a_node.weight)
                .then_with(|| b_node.neighbours.len().cmp(&a_node.neighbours.len()))
                .then_with(|| a.cmp(&b))
        });
        slots.truncate(limit);
        slots
    }

    /// Content slots grouped by their first parent keyword.
    pub fn topic_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.topic_count];
        for keyword in &self.keywords {
            if let Some(size) = sizes.get_mut(keyword.topic) {
                *size += 1;
            }
        }
        sizes
    }
}

use std::collections::BTreeMap;

const MAX_LOCAL_PASSES: usize = 64;
const MAX_LEVELS: usize = 16;
const MIN_GAIN: f64 = 1.0e-12;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopicAssignment {
    /// Topic per node, numbered in order of first appearance.
    pub topics: Vec<usize>,
    pub count: usize,
}

struct LevelGraph {
    adjacency: Vec<Vec<(usize, f64)>>,
    self_loops: Vec<f64>,
    degrees: Vec<f64>,
    total_degree: f64,
}

impl LevelGraph {
    fn new(node_count: usize, edges: &BTreeMap<(usize, usize), f64>, self_loops: Vec<f64>) -> Self {
        let mut adjacency = vec![Vec::new(); node_count];
        for (&(a, b), &weight) in edges {
            adjacency[a].push((b, weight));
            adjacency[b].push((a, weight));
        }

        let degrees = (0..node_count)
            .map(|node| {
                adjacency[node].iter().map(|(_, weight)| weight).sum::<f64>()
                    + 2.0 * self_loops[node]
            })
            .collect::<Vec<_>>();
        let total_degree = degrees.iter().sum();

        Self {
            adjacency,
            self_loops,
            degrees,
            total_degree,
        }
    }

    /// One round of greedy local moves. Returns the community of every node
    /// and whether anything moved.
    fn local_moves(&self, resolution: f64) -> (Vec<usize>, bool) {
        let node_count = self.degrees.len();
        let mut community = (0..node_count).collect::<Vec<_>>();
        let mut totals = self.degrees.clone();
        let mut links_to = vec![0.0_f64; node_count];
        let mut touched = Vec::new();
        let mut moved_any = false;

        for _ in 0..MAX_LOCAL_PASSES {
            let mut moved = false;
            for node in 0..node_count {
                let degree = self.degrees[node];
                let current = community[node];
                totals[current] -= degree;

                touched.clear();
                touched.push(current);
                links_to[current] = 0.0;
                for &(neighbour, weight) in &self.adjacency[node] {
                    let candidate = community[neighbour];
                    if !touched.contains(&candidate) {
                        touched.push(candidate);
                        links_to[candidate] = 0.0;
                    }
                    links_to[candidate] += weight;
                }

                let gain = |candidate: usize| {
                    links_to[candidate]
                        - resolution * totals[candidate] * degree / self.total_degree
                };
                let mut best = current;
                let mut best_gain = gain(current);
                for &candidate in &touched {
                    let candidate_gain = gain(candidate);
                    if candidate_gain > best_gain + MIN_GAIN {
                        best = candidate;
                        best_gain = candidate_gain;
                    }
                }

                totals[best] += degree;
                if best != current {
                    community[node] = best;
                    moved = true;
                    moved_any = true;
                }
            }

            if !moved {
                break;
            }
        }

        (community, moved_any)
    }

    fn aggregate(&self, community: &[usize]) -> Self {
        let count = community.iter().copied().max().map_or(0, |max| max + 1);
        let mut self_loops = vec![0.0; count];
        let mut edges = BTreeMap::new();

        for (node, neighbours) in self.adjacency.iter().enumerate() {
            self_loops[community[node]] += self.self_loops[node];
            for &(neighbour, weight) in neighbours {
                if neighbour < node {
                    continue;
                }
                let (a, b) = (community[node], community[neighbour]);
                if a == b {
                    self_loops[a] += weight;
                } else {
                    *edges.entry((a.min(b), a.max(b))).or_insert(0.0) += weight;
                }
            }
        }

        Self::new(count, &edges, self_loops)
    }
}

fn renumber(labels: &mut [usize]) -> usize {
    let mut mapping = BTreeMap::new();
    let mut next = 0;
    for label in labels.iter_mut() {
        let mapped = *mapping.entry(*label).or_insert_with(|| {
            next += 1;
            next - 1
        });
        *label = mapped;
    }
    next
}

/// Louvain modularity clustering with a resolution parameter. Higher
/// resolution yields more, smaller topics. Node order drives every tie, so
/// the result is deterministic.
pub fn detect_topics(node_count: usize, edges: &[(usize, usize, f64)], resolution: f64) -> TopicAssignment {
    let mut merged = BTreeMap::new();
    let mut self_loops = vec![0.0; node_count];
    for &(a, b, weight) in edges {
        if a >= node_count || b >= node_count || weight.is_nan() || weight <= 0.0 {
            continue;
        }
        if a == b {
            self_loops[a] += weight;
        } else {
            *merged.entry((a.min(b), a.max(b))).or_insert(0.0) += weight;
        }
    }

    let mut assignment = (0..node_count).collect::<Vec<_>>();
    let mut graph = LevelGraph::new(node_count, &merged, self_loops);
    if graph.total_degree <= 0.0 {
        let count = renumber(&mut assignment);
        return TopicAssignment {
            topics: assignment,
            count,
        };
    }

    let resolution = resolution.max(0.0);
    for level in 0..MAX_LEVELS {
        let (mut community, moved) = graph.local_moves(resolution);
        if !moved {
            break;
        }

        let communities = renumber(&mut community);
        for topic in &mut assignment {
            *topic = community[*topic];
        }
        log::debug!("topic level {level}: {communities} communities");
        graph = graph.aggregate(&community);
    }

    let count = renumber(&mut assignment);
    TopicAssignment {
        topics: assignment,
        count,
    }
}

/// Newman modularity of `topics` at `resolution`.
pub fn modularity(node_count: usize, edges: &[(usize, usize, f64)], topics: &[usize], resolution: f64) -> f64 {
    let mut degrees = vec![0.0; node_count];
    let mut internal = BTreeMap::<usize, f64>::new();
    let mut total = 0.0;
    for &(a, b, weight) in edges {
        if a >= node_count || b >= node_count {
            continue;
        }
        degrees[a] += weight;
        degrees[b] += weight;
        total += weight;
        if let (Some(&from), Some(&to)) = (topics.get(a), topics.get(b))
            && from == to
        {
            *internal.entry(from).or_default() += weight;
        }
    }
    if total <= 0.0 {
        return 0.0;
    }

    let mut topic_degree = BTreeMap::<usize, f64>::new();
    for (node, degree) in degrees.iter().enumerate() {
        if let Some(&topic) = topics.get(node) {
            *topic_degree.entry(topic).or_default() += degree;
        }
    }

    topic_degree
        .iter()
        .map(|(topic, degree)| {
            let inside = internal.get(topic).copied().unwrap_or(0.0);
            inside / total - resolution * (degree / (2.0 * total)).powi(2)
        })
        .sum()
}

//! Street graph with snapping and deterministic shortest paths.

use super::Street;
use crate::primitives::{Point, project_onto_segment};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

/// Index of a node in a [`StreetGraph`].
pub type NodeId = usize;

/// Undirected street edge.
#[derive(Debug, Clone, PartialEq)]
pub struct StreetEdge {
    pub length_m: f64,
    pub street_name: Option<String>,
}

/// Result of snapping a point onto the street network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    pub node: NodeId,
    pub point: Point,
    /// Distance from the original point (m).
    pub distance_m: f64,
}

/// Undirected street graph. Nodes are keyed by millimetre-quantised
/// coordinates so shared street endpoints merge.
#[derive(Debug, Clone, Default)]
pub struct StreetGraph {
    points: Vec<Point>,
    index: BTreeMap<(i64, i64), NodeId>,
    adjacency: Vec<BTreeMap<NodeId, StreetEdge>>,
}

fn quantise(p: &Point) -> (i64, i64) {
    ((p.x * 1000.0).round() as i64, (p.y * 1000.0).round() as i64)
}

/// Edge cost in whole millimetres.
fn cost_mm(length_m: f64) -> u64 {
    (length_m * 1000.0).round().max(0.0) as u64
}

impl StreetGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from street centrelines, one edge per line segment.
    #[must_use]
    pub fn from_streets(streets: &[Street]) -> Self {
        let mut graph = Self::new();
        for street in streets {
            for pair in street.coords.windows(2) {
                let a = graph.add_node(pair[0]);
                let b = graph.add_node(pair[1]);
                let length = pair[0].distance(&pair[1]);
                graph.add_edge(a, b, length, street.name.clone());
            }
        }
        graph
    }

    /// Insert a node, or return the existing node at the same millimetre.
    pub fn add_node(&mut self, p: Point) -> NodeId {
        let key = quantise(&p);
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let id = self.points.len();
        self.points.push(p);
        self.adjacency.push(BTreeMap::new());
        self.index.insert(key, id);
        id
    }

    /// Insert an undirected edge. Self loops are ignored; a parallel edge
    /// keeps the shorter length.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId, length_m: f64, street_name: Option<String>) {
        if a == b || a >= self.points.len() || b >= self.points.len() {
            return;
        }
        if let Some(existing) = self.adjacency[a].get(&b) {
            if existing.length_m <= length_m {
                return;
            }
        }
        let edge = StreetEdge {
            length_m,
            street_name,
        };
        self.adjacency[a].insert(b, edge.clone());
        self.adjacency[b].insert(a, edge);
    }

    fn remove_edge(&mut self, a: NodeId, b: NodeId) -> Option<StreetEdge> {
        self.adjacency[b].remove(&a);
        self.adjacency[a].remove(&b)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(BTreeMap::len).sum::<usize>() / 2
    }

    #[must_use]
    pub fn point(&self, node: NodeId) -> Option<Point> {
        self.points.get(node).copied()
    }

    #[must_use]
    pub fn edge(&self, a: NodeId, b: NodeId) -> Option<&StreetEdge> {
        self.adjacency.get(a)?.get(&b)
    }

    /// Edges as `(a, b, edge)` with `a < b`, in node order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &StreetEdge)> {
        self.adjacency.iter().enumerate().flat_map(|(a, nbrs)| {
            nbrs.iter()
                .filter(move |(b, _)| a < **b)
                .map(move |(b, e)| (a, *b, e))
        })
    }

    /// Connected components, largest first; ties keep node order.
    #[must_use]
    pub fn components(&self) -> Vec<Vec<NodeId>> {
        let mut seen = vec![false; self.points.len()];
        let mut comps = Vec::new();
        for start in 0..self.points.len() {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut comp = Vec::new();
            let mut queue = VecDeque::from([start]);
            while let Some(n) = queue.pop_front() {
                comp.push(n);
                for next in self.adjacency[n].keys() {
                    if !seen[*next] {
                        seen[*next] = true;
                        queue.push_back(*next);
                    }
                }
            }
            comp.sort_unstable();
            comps.push(comp);
        }
        comps.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));
        comps
    }

    /// Join every component to the largest through its closest node pair
    /// when that pair is closer than `max_link_m`.
    ///
    /// Returns whether the graph is connected afterwards.
    pub fn ensure_connectivity(&mut self, max_link_m: f64) -> bool {
        let comps = self.components();
        if comps.len() <= 1 {
            return true;
        }
        let mut main: Vec<NodeId> = comps[0].clone();
        for comp in &comps[1..] {
            let mut best: Option<(f64, NodeId, NodeId)> = None;
            for &a in &main {
                for &b in comp {
                    let d = self.points[a].distance(&self.points[b]);
                    if best.is_none_or(|(bd, _, _)| d < bd) {
                        best = Some((d, a, b));
                    }
                }
            }
            if let Some((d, a, b)) = best {
                if d < max_link_m {
                    self.add_edge(a, b, d, Some("connectivity link".to_string()));
                    main.extend_from_slice(comp);
                }
            }
        }
        self.components().len() <= 1
    }

    /// Snap a point onto the nearest street segment.
    ///
    /// When the projection falls inside a segment, a new node is spliced
    /// into it: the segment is replaced by two edges through the new node.
    /// Returns `None` on a graph without edges.
    pub fn snap(&mut self, p: &Point) -> Option<Snap> {
        let mut best: Option<(f64, NodeId, NodeId, Point)> = None;
        for (a, b, _) in self.edges() {
            let (proj, d) = project_onto_segment(p, &self.points[a], &self.points[b]);
            if best.is_none_or(|(bd, ..)| d < bd) {
                best = Some((d, a, b, proj));
            }
        }
        let (distance_m, a, b, proj) = best?;

        let key = quantise(&proj);
        for end in [a, b] {
            if quantise(&self.points[end]) == key {
                return Some(Snap {
                    node: end,
                    point: self.points[end],
                    distance_m,
                });
            }
        }

        let node = self.add_node(proj);
        if let Some(edge) = self.remove_edge(a, b) {
            let to_a = self.points[a].distance(&proj);
            let to_b = self.points[b].distance(&proj);
            self.add_edge(a, node, to_a, edge.street_name.clone());
            self.add_edge(node, b, to_b, edge.street_name);
        }
        Some(Snap {
            node,
            point: proj,
            distance_m,
        })
    }

    /// Dijkstra from `source` with integer millimetre costs.
    ///
    /// Ties are broken by the lower node id, so equal-cost alternatives
    /// always resolve the same way.
    #[must_use]
    pub fn shortest_paths(&self, source: NodeId) -> ShortestPaths {
        let n = self.points.len();
        let mut dist: Vec<Option<u64>> = vec![None; n];
        let mut prev: Vec<Option<NodeId>> = vec![None; n];
        let mut done = BTreeSet::new();
        let mut heap = BinaryHeap::new();
        if source < n {
            dist[source] = Some(0);
            heap.push(Reverse((0u64, source)));
        }
        while let Some(Reverse((d, node))) = heap.pop() {
            if !done.insert(node) {
                continue;
            }
            for (next, edge) in &self.adjacency[node] {
                let candidate = d + cost_mm(edge.length_m);
                let better = match dist[*next] {
                    None => true,
                    Some(current) => {
                        candidate < current
                            || (candidate == current && prev[*next].is_some_and(|p| node < p))
                    }
                };
                if better && !done.contains(next) {
                    dist[*next] = Some(candidate);
                    prev[*next] = Some(node);
                    heap.push(Reverse((candidate, *next)));
                }
            }
        }
        ShortestPaths { source, dist, prev }
    }

    /// Shortest path between two nodes as a node list and its length (m).
    #[must_use]
    pub fn shortest_path(&self, from: NodeId, to: NodeId) -> Option<(Vec<NodeId>, f64)> {
        let tree = self.shortest_paths(from);
        let path = tree.path_to(to)?;
        Some((path, tree.distance_m(to)?))
    }
}

/// Shortest path tree from one source.
#[derive(Debug, Clone)]
pub struct ShortestPaths {
    source: NodeId,
    dist: Vec<Option<u64>>,
    prev: Vec<Option<NodeId>>,
}

impl ShortestPaths {
    /// Path length in metres (millimetre precision).
    #[must_use]
    pub fn distance_m(&self, to: NodeId) -> Option<f64> {
        self.dist.get(to).copied().flatten().map(|mm| mm as f64 / 1000.0)
    }

    /// Nodes from the source to `to`, inclusive.
    #[must_use]
    pub fn path_to(&self, to: NodeId) -> Option<Vec<NodeId>> {
        self.dist.get(to).copied().flatten()?;
        let mut path = vec![to];
        let mut current = to;
        while current != self.source {
            current = self.prev[current]?;
            path.push(current);
        }
        path.reverse();
        Some(path)
    }
}

//! Connected-component clustering over the proximity graph.

use crate::nodes::RegistrySnapshot;
use crate::proximity::ProximityEdge;
use common::TrackId;
use serde::Serialize;
use std::collections::VecDeque;

/// Tracks linked through a chain of pairs closer than the cluster threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cluster {
    members: Vec<TrackId>,
}

impl Cluster {
    /// Members in traversal order; the first one is the seed
    pub fn members(&self) -> &[TrackId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.members.contains(id)
    }
}

/// Partition every track in `snapshot` into clusters.
///
/// Only edges with `distance < threshold` link tracks. Seeds are taken in
/// registration order and each component is expanded breadth-first with an
/// explicit queue; neighbors are visited in registration order. The result
/// lists clusters in seed order, so the ordinal of a cluster is stable for a
/// given registry state.
pub fn extract_clusters(
    snapshot: &RegistrySnapshot,
    edges: &[ProximityEdge],
    threshold: f64,
) -> Vec<Cluster> {
    let count = snapshot.len();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); count];

    for edge in edges.iter().filter(|e| e.distance < threshold) {
        let (Some(a), Some(b)) = (snapshot.position(&edge.a), snapshot.position(&edge.b)) else {
            tracing::warn!(a = %edge.a, b = %edge.b, "edge references a track outside the snapshot");
            continue;
        };
        if a == b {
            continue;
        }
        adjacency[a].push(b);
        adjacency[b].push(a);
    }
    for neighbors in &mut adjacency {
        neighbors.sort_unstable();
        neighbors.dedup();
    }

    let nodes = snapshot.nodes();
    let mut visited = vec![false; count];
    let mut clusters = Vec::new();
    let mut queue = VecDeque::new();

    for seed in 0..count {
        if visited[seed] {
            continue;
        }

        let mut members = Vec::new();
        visited[seed] = true;
        queue.push_back(seed);

        while let Some(current) = queue.pop_front() {
            members.push(nodes[current].id.clone());
            for &next in &adjacency[current] {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }

        clusters.push(Cluster { members });
    }

    clusters
}

//! Pairwise distances between all registered tracks.
//!
//! The population is one camera's view (tens of people), so every pair is
//! measured; no spatial index. Thresholding is left to the consumers.

use crate::nodes::RegistrySnapshot;
use common::TrackId;
use serde::Serialize;

/// Undirected edge between two distinct tracks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityEdge {
    pub a: TrackId,
    pub b: TrackId,
    /// Euclidean distance between the two box centers
    pub distance: f64,
}

/// One edge per unordered pair, `a` registered before `b`
pub fn compute_edges(snapshot: &RegistrySnapshot) -> Vec<ProximityEdge> {
    let nodes = snapshot.nodes();
    let mut edges = Vec::with_capacity(nodes.len() * nodes.len().saturating_sub(1) / 2);

    for (i, first) in nodes.iter().enumerate() {
        for second in &nodes[i + 1..] {
            edges.push(ProximityEdge {
                a: first.id.clone(),
                b: second.id.clone(),
                distance: first.bbox.center_distance(&second.bbox),
            });
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::NodeRegistry;
    use common::BoundingBox;

    #[test]
    fn test_one_edge_per_pair() {
        let mut registry = NodeRegistry::new();
        for (i, x) in [0u32, 100, 200, 900].iter().enumerate() {
            registry.upsert(TrackId::from(i as u64), BoundingBox::new(*x, 0, 10, 10), 1);
        }

        let edges = compute_edges(&registry.snapshot());
        assert_eq!(edges.len(), 6);
        assert!(edges.iter().all(|e| e.a != e.b));
        assert!(edges.iter().all(|e| e.distance >= 0.0));
        // far pairs are kept too
        assert!(edges.iter().any(|e| (e.distance - 900.0).abs() < 1e-9));
    }

    #[test]
    fn test_distance_between_centers() {
        let mut registry = NodeRegistry::new();
        registry.upsert(TrackId::from("a"), BoundingBox::new(0, 0, 10, 10), 1);
        registry.upsert(TrackId::from("b"), BoundingBox::new(30, 40, 10, 10), 1);

        let edges = compute_edges(&registry.snapshot());
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].a, TrackId::from("a"));
        assert_eq!(edges[0].b, TrackId::from("b"));
        assert!((edges[0].distance - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_and_single_registry() {
        let mut registry = NodeRegistry::new();
        assert!(compute_edges(&registry.snapshot()).is_empty());

        registry.upsert(TrackId::from("only"), BoundingBox::new(5, 5, 10, 10), 1);
        assert!(compute_edges(&registry.snapshot()).is_empty());
    }
}

//! Node registry: per-track state accumulated across frames.
//!
//! Tracks are only ever added or updated. The registry keeps them in the order
//! they were first observed, and that order is what makes clustering output
//! reproducible. Downstream passes never see the registry itself, only an
//! immutable [`RegistrySnapshot`] taken after a frame's ingestion phase.

use crate::error::RegistryError;
use common::{BoundingBox, Gender, Gesture, TrackId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// One tracked person
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: TrackId,

    /// Last observed box, already clipped to the frame
    pub bbox: BoundingBox,

    /// Frame index at which the track was first observed
    pub first_seen: u64,

    pub gender: Option<Gender>,

    /// Most recent gesture, not a history
    pub gesture: Option<Gesture>,
}

/// A classification assigned to a registered track
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Gender(Gender),
    Gesture(Gesture),
}

#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
    positions: HashMap<TrackId, usize>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the track on first sight, otherwise overwrite its box
    pub fn upsert(&mut self, id: TrackId, bbox: BoundingBox, current_frame: u64) {
        if let Some(&position) = self.positions.get(&id) {
            self.nodes[position].bbox = bbox;
            return;
        }

        tracing::debug!(track_id = %id, frame = current_frame, "registering new track");
        self.positions.insert(id.clone(), self.nodes.len());
        self.nodes.push(Node {
            id,
            bbox,
            first_seen: current_frame,
            gender: None,
            gesture: None,
        });
    }

    /// Overwrite one attribute of a registered track
    pub fn set_attribute(&mut self, id: &TrackId, attribute: Attribute) -> Result<(), RegistryError> {
        let position = *self
            .positions
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        let node = &mut self.nodes[position];

        match attribute {
            Attribute::Gender(gender) => node.gender = Some(gender),
            Attribute::Gesture(gesture) => node.gesture = Some(gesture),
        }
        Ok(())
    }

    pub fn get(&self, id: &TrackId) -> Option<&Node> {
        self.positions.get(id).map(|&position| &self.nodes[position])
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Point-in-time copy of every node, in registration order
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            nodes: self.nodes.as_slice().into(),
            positions: Arc::new(self.positions.clone()),
        }
    }
}

/// Immutable view of the registry shared by one frame's computations.
///
/// Cloning is cheap and the snapshot is `Send + Sync`, so independent passes
/// can read it concurrently without locking.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    nodes: Arc<[Node]>,
    positions: Arc<HashMap<TrackId, usize>>,
}

impl RegistrySnapshot {
    /// Nodes in registration order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn get(&self, id: &TrackId) -> Option<&Node> {
        self.position(id).map(|position| &self.nodes[position])
    }

    /// Registration index of a track
    pub fn position(&self, id: &TrackId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

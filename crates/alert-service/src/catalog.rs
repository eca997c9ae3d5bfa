//! Gesture metadata used to describe and score alerts.

use crate::types::GestureMetadata;
use common::Gesture;
use std::collections::HashMap;

/// (gesture, description, aggression, proximity, movement)
const DEFAULT_METADATA: &[(Gesture, &str, u8, u8, u8)] = &[
    (
        Gesture::RaisedHand,
        "Hand raised in an aggressive motion, possibly to strike.",
        8,
        7,
        6,
    ),
    (
        Gesture::Pushing,
        "Physical shoving or pushing of another person.",
        9,
        8,
        6,
    ),
    (Gesture::Punching, "Closed-fist striking action.", 10, 9, 9),
    (Gesture::Slapping, "Open-hand slap directed at someone.", 9, 9, 7),
    (Gesture::Grabbing, "Grabbing or restraining action.", 8, 9, 5),
    (Gesture::Chasing, "Running after a person aggressively.", 7, 6, 10),
    (
        Gesture::BlockingWay,
        "Physically obstructing someone's movement.",
        7,
        8,
        4,
    ),
    (
        Gesture::IntimidatingPosture,
        "Threatening body language close to a person.",
        8,
        9,
        3,
    ),
    (Gesture::Staring, "Prolonged, uncomfortable staring.", 5, 8, 1),
    (Gesture::Loitering, "Remaining in area without reason.", 3, 6, 2),
    (
        Gesture::Following,
        "Trailing someone for a suspicious period.",
        6,
        8,
        4,
    ),
    (Gesture::Hovering, "Standing very close without contact.", 4, 9, 2),
    (
        Gesture::Pointing,
        "Directing attention with finger in a forceful manner.",
        5,
        5,
        2,
    ),
    (Gesture::WavingForHelp, "Arm waving to signal for help.", 0, 7, 6),
    (
        Gesture::HandsUp,
        "Both hands raised in submission or to get attention.",
        1,
        6,
        3,
    ),
    (Gesture::CallingPhone, "Gesture suggesting calling someone.", 0, 5, 1),
    (Gesture::RunningAway, "Person fleeing rapidly from danger.", 0, 9, 9),
    (
        Gesture::Falling,
        "Unexpected fall indicating distress or accident.",
        0,
        6,
        7,
    ),
    (
        Gesture::HandSignalSos,
        "Recognized hand signal for domestic abuse or help.",
        0,
        10,
        3,
    ),
    (Gesture::Walking, "Normal walking.", 0, 3, 2),
    (Gesture::Standing, "Neutral posture, standing.", 0, 2, 1),
    (Gesture::Sitting, "Seated posture.", 0, 1, 0),
    (Gesture::Talking, "Conversational gestures.", 1, 3, 2),
    (Gesture::GesturingCasually, "Non-aggressive hand motion.", 1, 3, 2),
];

#[derive(Debug, Clone, Default)]
pub struct GestureCatalog {
    entries: HashMap<Gesture, GestureMetadata>,
}

impl GestureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with an entry for every known gesture
    pub fn seeded() -> Self {
        let mut catalog = Self::new();
        for (gesture, description, aggression, proximity, movement) in DEFAULT_METADATA {
            catalog.insert(GestureMetadata::new(
                gesture.clone(),
                *description,
                *aggression,
                *proximity,
                *movement,
            ));
        }
        catalog
    }

    /// Insert or replace the entry for `metadata.gesture`
    pub fn insert(&mut self, metadata: GestureMetadata) -> Option<GestureMetadata> {
        self.entries.insert(metadata.gesture.clone(), metadata)
    }

    pub fn get(&self, gesture: &Gesture) -> Option<&GestureMetadata> {
        self.entries.get(gesture)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered from most to least severe
    pub fn by_severity(&self) -> Vec<GestureMetadata> {
        let mut entries: Vec<_> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            b.severity()
                .total_cmp(&a.severity())
                .then_with(|| a.gesture.as_str().cmp(b.gesture.as_str()))
        });
        entries
    }
}

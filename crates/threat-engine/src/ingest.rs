//! Folding collaborator output into the node registry.
//!
//! Detection, tracking and classification are external. [`VisionStack`]
//! chains them into a [`FrameObservations`] for one frame; [`FrameIngestor`]
//! clips each tracked box to the frame and applies the result to the
//! registry. Pre-tracked observations (replay, HTTP) enter at the second step.

use crate::error::IngestError;
use crate::nodes::{Attribute, NodeRegistry};
use async_trait::async_trait;
use common::vision::{Detection, VideoFrame};
use common::{BoundingBox, FrameObservations, Gender, Gesture, PixelRect, TrackId, TrackObservation};
use serde::{Deserialize, Serialize};
use telemetry::metrics::THREAT_ENGINE_REJECTED_BOXES;

pub const PERSON_CLASS: &str = "person";

/// Object detector: frame in, labelled boxes out
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, frame: &VideoFrame) -> anyhow::Result<Vec<Detection>>;
}

/// Track produced by a multi-object tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub track_id: TrackId,
    pub bbox: PixelRect,
    pub confirmed: bool,
}

/// Multi-object tracker; keeps identities stable across frames
#[async_trait]
pub trait Tracker: Send + Sync {
    async fn update(
        &mut self,
        detections: &[Detection],
        frame: &VideoFrame,
    ) -> anyhow::Result<Vec<TrackedObject>>;
}

/// Never abstains; any fallback is the implementation's business
#[async_trait]
pub trait GenderClassifier: Send + Sync {
    async fn classify(&self, frame: &VideoFrame, bbox: &BoundingBox) -> Gender;
}

/// Returns the neutral gesture when nothing is recognized
#[async_trait]
pub trait GestureClassifier: Send + Sync {
    async fn classify(&self, frame: &VideoFrame, bbox: &BoundingBox) -> Gesture;
}

/// What one frame did to the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub accepted: usize,
    /// Boxes with no area left after clipping
    pub rejected: usize,
    pub skipped_unconfirmed: usize,
}

#[derive(Debug, Clone)]
pub struct FrameIngestor {
    person_confidence: f32,
}

impl FrameIngestor {
    pub fn new(person_confidence: f32) -> Self {
        Self { person_confidence }
    }

    pub fn person_confidence(&self) -> f32 {
        self.person_confidence
    }

    /// Person detections strictly above the confidence threshold
    pub fn filter_people(&self, detections: Vec<Detection>) -> Vec<Detection> {
        detections
            .into_iter()
            .filter(|d| d.class == PERSON_CLASS && d.confidence > self.person_confidence)
            .collect()
    }

    /// Apply one frame of observations to the registry.
    ///
    /// Unconfirmed tracks are skipped and boxes that clip to nothing are
    /// rejected; neither touches the registry.
    pub fn fold_observations(
        &self,
        registry: &mut NodeRegistry,
        frame: &FrameObservations,
        frame_index: u64,
    ) -> Result<IngestSummary, IngestError> {
        let mut summary = IngestSummary::default();

        for track in &frame.tracks {
            if !track.confirmed {
                summary.skipped_unconfirmed += 1;
                continue;
            }

            let Some(bbox) = track.bbox.clip(frame.width, frame.height) else {
                tracing::debug!(
                    track_id = %track.track_id,
                    bbox = ?track.bbox,
                    width = frame.width,
                    height = frame.height,
                    "rejecting box outside frame"
                );
                THREAT_ENGINE_REJECTED_BOXES.inc();
                summary.rejected += 1;
                continue;
            };

            registry.upsert(track.track_id.clone(), bbox, frame_index);
            if let Some(gender) = &track.gender {
                registry.set_attribute(&track.track_id, Attribute::Gender(gender.clone()))?;
            }
            if let Some(gesture) = &track.gesture {
                registry.set_attribute(&track.track_id, Attribute::Gesture(gesture.clone()))?;
            }
            summary.accepted += 1;
        }

        Ok(summary)
    }
}

impl Default for FrameIngestor {
    fn default() -> Self {
        Self::new(0.3)
    }
}

/// Detector, tracker and both classifiers chained for one video frame
pub struct VisionStack {
    detector: Box<dyn Detector>,
    tracker: Box<dyn Tracker>,
    gender: Box<dyn GenderClassifier>,
    gesture: Box<dyn GestureClassifier>,
    filter: FrameIngestor,
}

impl VisionStack {
    pub fn new(
        detector: Box<dyn Detector>,
        tracker: Box<dyn Tracker>,
        gender: Box<dyn GenderClassifier>,
        gesture: Box<dyn GestureClassifier>,
        person_confidence: f32,
    ) -> Self {
        Self {
            detector,
            tracker,
            gender,
            gesture,
            filter: FrameIngestor::new(person_confidence),
        }
    }

    /// Run every collaborator on `frame`.
    ///
    /// Classifiers see the clipped box; tracks that clip to nothing are
    /// passed through unclassified so the ingestor can count the rejection.
    pub async fn observe(&mut self, frame: &VideoFrame) -> Result<FrameObservations, IngestError> {
        let detections = self
            .detector
            .detect(frame)
            .await
            .map_err(|e| IngestError::Detector(e.into()))?;
        let people = self.filter.filter_people(detections);

        let tracked = self
            .tracker
            .update(&people, frame)
            .await
            .map_err(|e| IngestError::Tracker(e.into()))?;

        let mut tracks = Vec::with_capacity(tracked.len());
        for object in tracked {
            let (gender, gesture) = match (object.confirmed, object.bbox.clip(frame.width, frame.height)) {
                (true, Some(bbox)) => {
                    let (gender, gesture) = tokio::join!(
                        self.gender.classify(frame, &bbox),
                        self.gesture.classify(frame, &bbox)
                    );
                    (Some(gender), Some(gesture))
                }
                _ => (None, None),
            };

            tracks.push(TrackObservation {
                track_id: object.track_id,
                bbox: object.bbox,
                confirmed: object.confirmed,
                gender,
                gesture,
            });
        }

        Ok(FrameObservations {
            timestamp: frame.timestamp,
            width: frame.width,
            height: frame.height,
            tracks,
        })
    }
}

//! Frame counting, tick boundaries and report assembly.

use crate::aggregator::ClusterAssessment;
use crate::config::IncidentMode;
use crate::nodes::RegistrySnapshot;
use chrono::{DateTime, TimeZone, Utc};
use common::{ClusterRecord, GeoLocation, Gesture, IncidentRecord};
use serde::Serialize;

/// Counts frames and reports when a tick boundary is crossed.
///
/// The first frame is frame 1; frame `n * frames_per_tick` closes tick `n`.
/// Ticks are counted as they close, so a cadence change never skips or
/// repeats a tick number.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    frames_per_tick: u64,
    frame_count: u64,
    ticks: u64,
}

impl TickScheduler {
    /// `frames_per_tick` of zero is treated as one
    pub fn new(frames_per_tick: u64) -> Self {
        Self {
            frames_per_tick: frames_per_tick.max(1),
            frame_count: 0,
            ticks: 0,
        }
    }

    /// Count one frame. Returns its index and, on a boundary, the elapsed tick counter.
    pub fn advance(&mut self) -> (u64, Option<u64>) {
        self.frame_count += 1;
        let frame = self.frame_count;
        if frame % self.frames_per_tick != 0 {
            return (frame, None);
        }
        self.ticks += 1;
        (frame, Some(self.ticks))
    }

    /// Frames seen so far; also the index of the last frame
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn frames_per_tick(&self) -> u64 {
        self.frames_per_tick
    }

    /// Completed ticks
    pub fn ticks_elapsed(&self) -> u64 {
        self.ticks
    }

    /// Change the cadence without resetting the frame or tick counters
    pub fn set_frames_per_tick(&mut self, frames_per_tick: u64) {
        self.frames_per_tick = frames_per_tick.max(1);
    }
}

/// Everything emitted at one tick boundary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub frame: u64,
    pub clusters: Vec<ClusterRecord>,
    pub incidents: Vec<IncidentRecord>,
}

/// Camera identity stamped onto incident records
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentSource {
    pub camera_id: String,
    pub location: GeoLocation,
    pub mode: IncidentMode,
}

/// Build the tick report from the frame's snapshot and assessments.
///
/// Cluster records carry member attributes in member order. Incident records
/// follow `source.mode`: one per tick, or one copy per cluster.
pub fn build_report(
    tick: u64,
    frame: u64,
    snapshot: &RegistrySnapshot,
    assessments: &[ClusterAssessment],
    most_severe: &Gesture,
    timestamp: DateTime<Utc>,
    source: &IncidentSource,
) -> TickReport {
    let clusters = assessments
        .iter()
        .map(|assessment| {
            let members: Vec<_> = assessment
                .members
                .iter()
                .map(|id| snapshot.get(id))
                .collect();
            ClusterRecord {
                tick,
                cluster_id: assessment.ordinal,
                threat: assessment.threat,
                node_ids: assessment.members.clone(),
                genders: members
                    .iter()
                    .map(|node| node.and_then(|n| n.gender.clone()))
                    .collect(),
                gestures: members
                    .iter()
                    .map(|node| node.and_then(|n| n.gesture.clone()))
                    .collect(),
            }
        })
        .collect();

    let incident = IncidentRecord {
        timestamp,
        camera_id: source.camera_id.clone(),
        location: source.location,
        gesture: most_severe.clone(),
    };
    let copies = match source.mode {
        IncidentMode::PerTick => 1,
        IncidentMode::PerCluster => assessments.len(),
    };

    TickReport {
        tick,
        frame,
        clusters,
        incidents: vec![incident; copies],
    }
}

/// Frame timestamp in Unix milliseconds, or the wall clock when the source sent none
pub fn frame_time(timestamp_ms: u64) -> DateTime<Utc> {
    if timestamp_ms == 0 {
        return Utc::now();
    }
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now)
}

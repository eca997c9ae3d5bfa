//! Cluster threat scoring and the frame-wide most severe gesture.

use crate::cluster::Cluster;
use crate::config::ThreatEngineConfig;
use crate::nodes::{Node, RegistrySnapshot};
use crate::policy::ThreatPolicy;
use common::{Gesture, ThreatLevel, TrackId};
use serde::Serialize;

/// Threat level of one cluster, tagged with its 1-based position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssessment {
    pub ordinal: usize,
    pub threat: ThreatLevel,
    pub members: Vec<TrackId>,
}

#[derive(Debug, Clone)]
pub struct ThreatAggregator {
    policy: ThreatPolicy,
    red_distance: f64,
    yellow_distance: f64,
}

impl ThreatAggregator {
    pub fn new(policy: ThreatPolicy, red_distance: f64, yellow_distance: f64) -> Self {
        Self {
            policy,
            red_distance,
            yellow_distance,
        }
    }

    pub fn from_config(config: &ThreatEngineConfig) -> Self {
        Self::new(
            ThreatPolicy::with_overrides(&config.policy_overrides),
            config.red_distance,
            config.yellow_distance,
        )
    }

    pub fn policy(&self) -> &ThreatPolicy {
        &self.policy
    }

    fn node_threat(&self, node: &Node) -> ThreatLevel {
        self.policy.level_for_observed(node.gesture.as_ref())
    }

    /// Score one cluster.
    ///
    /// Every unordered pair is inspected. A pair closer than `red_distance`
    /// with a RED member makes the cluster RED; otherwise a pair closer than
    /// `yellow_distance` with a YELLOW member makes it YELLOW. Without either,
    /// the cluster takes the highest level among its members.
    pub fn cluster_threat(&self, snapshot: &RegistrySnapshot, cluster: &Cluster) -> ThreatLevel {
        let members: Vec<(&Node, ThreatLevel)> = cluster
            .members()
            .iter()
            .filter_map(|id| snapshot.get(id))
            .map(|node| (node, self.node_threat(node)))
            .collect();

        let mut close_red = false;
        let mut close_yellow = false;

        for (i, (first, first_threat)) in members.iter().enumerate() {
            for (second, second_threat) in &members[i + 1..] {
                let distance = first.bbox.center_distance(&second.bbox);
                let levels = [*first_threat, *second_threat];

                if distance < self.red_distance && levels.contains(&ThreatLevel::Red) {
                    close_red = true;
                }
                if distance < self.yellow_distance && levels.contains(&ThreatLevel::Yellow) {
                    close_yellow = true;
                }
            }
        }

        if close_red {
            ThreatLevel::Red
        } else if close_yellow {
            ThreatLevel::Yellow
        } else {
            members
                .iter()
                .map(|(_, threat)| *threat)
                .max()
                .unwrap_or_default()
        }
    }

    /// Score every cluster, keeping cluster order
    pub fn assess(&self, snapshot: &RegistrySnapshot, clusters: &[Cluster]) -> Vec<ClusterAssessment> {
        clusters
            .iter()
            .enumerate()
            .map(|(index, cluster)| {
                let threat = self.cluster_threat(snapshot, cluster);
                tracing::debug!(
                    cluster = index + 1,
                    threat = %threat,
                    size = cluster.len(),
                    "cluster assessed"
                );
                ClusterAssessment {
                    ordinal: index + 1,
                    threat,
                    members: cluster.members().to_vec(),
                }
            })
            .collect()
    }

    /// The gesture with the highest threat across all clusters.
    ///
    /// Members are scanned in cluster order and the first gesture reaching the
    /// maximum wins. Starts from the neutral gesture at GREEN, so a frame with
    /// nothing above GREEN reports the neutral gesture.
    pub fn most_severe_gesture(&self, snapshot: &RegistrySnapshot, clusters: &[Cluster]) -> Gesture {
        let mut best_threat = ThreatLevel::Green;
        let mut best_gesture = Gesture::NEUTRAL;

        for node in clusters
            .iter()
            .flat_map(|cluster| cluster.members())
            .filter_map(|id| snapshot.get(id))
        {
            let threat = self.node_threat(node);
            if threat > best_threat {
                best_threat = threat;
                best_gesture = node.gesture.clone().unwrap_or_default();
            }
        }

        best_gesture
    }
}

impl Default for ThreatAggregator {
    fn default() -> Self {
        Self::from_config(&ThreatEngineConfig::default())
    }
}

//! Per-track observation contracts.
//!
//! A tracker assigns each person a stable [`TrackId`]; classifiers attach a
//! [`Gender`] and a [`Gesture`] label to the person's crop. Labels outside the
//! known vocabulary are carried verbatim rather than rejected.

use crate::vision::PixelRect;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Opaque, tracker-assigned track identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawTrackId")]
pub struct TrackId(String);

/// Trackers report either numeric or string identifiers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTrackId {
    Number(u64),
    Text(String),
}

impl From<RawTrackId> for TrackId {
    fn from(raw: RawTrackId) -> Self {
        match raw {
            RawTrackId::Number(n) => TrackId(n.to_string()),
            RawTrackId::Text(s) => TrackId(s),
        }
    }
}

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for TrackId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

/// Threat level, ordered `Green < Yellow < Red`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    #[default]
    Green,
    Yellow,
    Red,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Green => "GREEN",
            ThreatLevel::Yellow => "YELLOW",
            ThreatLevel::Red => "RED",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreatLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GREEN" => Ok(ThreatLevel::Green),
            "YELLOW" => Ok(ThreatLevel::Yellow),
            "RED" => Ok(ThreatLevel::Red),
            _ => Err(format!("Invalid threat level: {}", s)),
        }
    }
}

/// Demographic label from the gender classifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Gender {
    Female,
    Male,
    /// Any other label, passed through unchanged
    Other(String),
}

impl Gender {
    pub fn as_str(&self) -> &str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::Other(label) => label,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "female" => Gender::Female,
            "male" => Gender::Male,
            _ => Gender::Other(s.trim().to_string()),
        })
    }
}

impl From<String> for Gender {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(gender) => gender,
            Err(never) => match never {},
        }
    }
}

impl From<Gender> for String {
    fn from(gender: Gender) -> Self {
        gender.as_str().to_string()
    }
}

macro_rules! gestures {
    ($($variant:ident => $label:literal),+ $(,)?) => {
        /// Behavioral label from the gesture classifier
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum Gesture {
            $($variant,)+
            /// A label outside the known vocabulary
            Other(String),
        }

        impl Gesture {
            /// Every label in the known vocabulary
            pub const KNOWN: &'static [Gesture] = &[$(Gesture::$variant,)+];

            pub fn as_str(&self) -> &str {
                match self {
                    $(Gesture::$variant => $label,)+
                    Gesture::Other(label) => label,
                }
            }
        }

        impl FromStr for Gesture {
            type Err = Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_uppercase();
                Ok(match normalized.as_str() {
                    $($label => Gesture::$variant,)+
                    _ => Gesture::Other(normalized),
                })
            }
        }
    };
}

gestures! {
    RaisedHand => "RAISED_HAND",
    Pushing => "PUSHING",
    Punching => "PUNCHING",
    Slapping => "SLAPPING",
    Grabbing => "GRABBING",
    Chasing => "CHASING",
    BlockingWay => "BLOCKING_WAY",
    IntimidatingPosture => "INTIMIDATING_POSTURE",
    Staring => "STARING",
    Loitering => "LOITERING",
    Following => "FOLLOWING",
    Hovering => "HOVERING",
    Pointing => "POINTING",
    WavingForHelp => "WAVING_FOR_HELP",
    HandsUp => "HANDS_UP",
    CallingPhone => "CALLING_PHONE",
    RunningAway => "RUNNING_AWAY",
    Falling => "FALLING",
    HandSignalSos => "HAND_SIGNAL_SOS",
    Walking => "WALKING",
    Standing => "STANDING",
    Sitting => "SITTING",
    Talking => "TALKING",
    GesturingCasually => "GESTURING_CASUALLY",
}

impl Gesture {
    /// Label reported when nothing concerning was observed
    pub const NEUTRAL: Gesture = Gesture::Walking;
}

impl Default for Gesture {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Gesture {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(gesture) => gesture,
            Err(never) => match never {},
        }
    }
}

impl From<Gesture> for String {
    fn from(gesture: Gesture) -> Self {
        gesture.as_str().to_string()
    }
}

/// One tracked person in one frame, as produced by tracker + classifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackObservation {
    pub track_id: TrackId,

    /// Tracker box before clipping to the frame
    pub bbox: PixelRect,

    /// Unconfirmed tracks are ignored
    #[serde(default = "default_confirmed")]
    pub confirmed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gesture: Option<Gesture>,
}

fn default_confirmed() -> bool {
    true
}

/// Everything the upstream collaborators produced for a single frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameObservations {
    /// Frame timestamp (Unix timestamp in milliseconds)
    #[serde(default)]
    pub timestamp: u64,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    #[serde(default)]
    pub tracks: Vec<TrackObservation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threat_level_order() {
        assert!(ThreatLevel::Red > ThreatLevel::Yellow);
        assert!(ThreatLevel::Yellow > ThreatLevel::Green);
        assert_eq!(
            [ThreatLevel::Yellow, ThreatLevel::Red, ThreatLevel::Green]
                .iter()
                .max(),
            Some(&ThreatLevel::Red)
        );
    }

    #[test]
    fn test_threat_level_serde() {
        let json = serde_json::to_string(&ThreatLevel::Yellow).unwrap();
        assert_eq!(json, "\"YELLOW\"");
        assert_eq!("red".parse::<ThreatLevel>().unwrap(), ThreatLevel::Red);
        assert!("purple".parse::<ThreatLevel>().is_err());
    }

    #[test]
    fn test_gesture_parse_known_and_unknown() {
        assert_eq!("PUNCHING".parse::<Gesture>().unwrap(), Gesture::Punching);
        assert_eq!(" staring ".parse::<Gesture>().unwrap(), Gesture::Staring);
        assert_eq!(
            "kicking".parse::<Gesture>().unwrap(),
            Gesture::Other("KICKING".to_string())
        );
    }

    #[test]
    fn test_gesture_serde_uses_labels() {
        let json = serde_json::to_string(&Gesture::BlockingWay).unwrap();
        assert_eq!(json, "\"BLOCKING_WAY\"");

        let parsed: Gesture = serde_json::from_str("\"WRESTLING\"").unwrap();
        assert_eq!(parsed, Gesture::Other("WRESTLING".to_string()));
        assert_eq!(parsed.to_string(), "WRESTLING");
    }

    #[test]
    fn test_known_vocabulary_size() {
        assert_eq!(Gesture::KNOWN.len(), 24);
        assert_eq!(Gesture::default(), Gesture::Walking);
    }

    #[test]
    fn test_gender_passthrough() {
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        let other: Gender = serde_json::from_str("\"unknown\"").unwrap();
        assert_eq!(other, Gender::Other("unknown".to_string()));
        assert_eq!(serde_json::to_string(&Gender::Male).unwrap(), "\"male\"");
    }

    #[test]
    fn test_track_id_accepts_numbers_and_strings() {
        let numeric: TrackId = serde_json::from_str("17").unwrap();
        let text: TrackId = serde_json::from_str("\"17\"").unwrap();
        assert_eq!(numeric, text);
        assert_eq!(serde_json::to_string(&numeric).unwrap(), "\"17\"");
    }

    #[test]
    fn test_frame_observations_defaults() {
        let frame: FrameObservations = serde_json::from_value(serde_json::json!({
            "width": 640,
            "height": 480,
            "tracks": [
                {"track_id": 1, "bbox": {"x": 10, "y": 10, "width": 40, "height": 90}}
            ]
        }))
        .unwrap();

        assert_eq!(frame.timestamp, 0);
        assert_eq!(frame.tracks.len(), 1);
        assert!(frame.tracks[0].confirmed);
        assert!(frame.tracks[0].gesture.is_none());
    }
}

//! Gesture to threat level lookup.

use common::{Gesture, ThreatLevel};
use std::collections::HashMap;

/// Static gesture → threat table. Gestures missing from the table are GREEN.
#[derive(Debug, Clone)]
pub struct ThreatPolicy {
    levels: HashMap<Gesture, ThreatLevel>,
}

impl ThreatPolicy {
    /// Policy with the built-in table plus per-gesture replacements
    pub fn with_overrides(overrides: &HashMap<Gesture, ThreatLevel>) -> Self {
        let mut policy = Self::default();
        for (gesture, level) in overrides {
            policy.levels.insert(gesture.clone(), *level);
        }
        policy
    }

    pub fn level_for(&self, gesture: &Gesture) -> ThreatLevel {
        self.levels.get(gesture).copied().unwrap_or(ThreatLevel::Green)
    }

    /// Level of an optional gesture; unclassified tracks count as the neutral gesture
    pub fn level_for_observed(&self, gesture: Option<&Gesture>) -> ThreatLevel {
        match gesture {
            Some(gesture) => self.level_for(gesture),
            None => self.level_for(&Gesture::NEUTRAL),
        }
    }
}

impl Default for ThreatPolicy {
    fn default() -> Self {
        use Gesture::*;
        use ThreatLevel::*;

        let table = [
            (RaisedHand, Red),
            (Pushing, Red),
            (Punching, Red),
            (Slapping, Red),
            (Grabbing, Red),
            (Chasing, Red),
            (BlockingWay, Red),
            (IntimidatingPosture, Red),
            (Staring, Yellow),
            (Loitering, Yellow),
            (Following, Yellow),
            (Hovering, Yellow),
            (Pointing, Yellow),
            (WavingForHelp, Green),
            (HandsUp, Green),
            (CallingPhone, Green),
            (RunningAway, Green),
            (Falling, Green),
            (HandSignalSos, Green),
            (Walking, Green),
            (Standing, Green),
            (Sitting, Green),
            (Talking, Green),
            (GesturingCasually, Green),
        ];

        Self {
            levels: table.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let policy = ThreatPolicy::default();
        assert_eq!(policy.level_for(&Gesture::Punching), ThreatLevel::Red);
        assert_eq!(policy.level_for(&Gesture::IntimidatingPosture), ThreatLevel::Red);
        assert_eq!(policy.level_for(&Gesture::Staring), ThreatLevel::Yellow);
        assert_eq!(policy.level_for(&Gesture::Pointing), ThreatLevel::Yellow);
        assert_eq!(policy.level_for(&Gesture::HandSignalSos), ThreatLevel::Green);
        assert_eq!(policy.level_for(&Gesture::Walking), ThreatLevel::Green);
    }

    #[test]
    fn test_every_known_gesture_is_listed() {
        let policy = ThreatPolicy::default();
        for gesture in Gesture::KNOWN {
            assert!(policy.levels.contains_key(gesture), "{} missing", gesture);
        }
    }

    #[test]
    fn test_unknown_gesture_is_green() {
        let policy = ThreatPolicy::default();
        assert_eq!(
            policy.level_for(&Gesture::Other("KICKING".to_string())),
            ThreatLevel::Green
        );
        assert_eq!(policy.level_for_observed(None), ThreatLevel::Green);
    }

    #[test]
    fn test_overrides_replace_entries() {
        let overrides = HashMap::from([
            (Gesture::Loitering, ThreatLevel::Red),
            (Gesture::Other("WRESTLING".to_string()), ThreatLevel::Red),
        ]);
        let policy = ThreatPolicy::with_overrides(&overrides);

        assert_eq!(policy.level_for(&Gesture::Loitering), ThreatLevel::Red);
        assert_eq!(
            policy.level_for(&Gesture::Other("WRESTLING".to_string())),
            ThreatLevel::Red
        );
        assert_eq!(policy.level_for(&Gesture::Staring), ThreatLevel::Yellow);
    }
}

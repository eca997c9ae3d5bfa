//! Replayable alert timeline.
//!
//! Alerts carry only a time of day. The simulation clock maps wall-clock time
//! elapsed since it was started onto the timeline, starting at the first alert,
//! so a recorded log plays back at real speed. Time of day wraps at midnight,
//! but each alert is shown once and dropped after the clock passes it.

use crate::types::AlertRecord;
use chrono::{Duration as ChronoDuration, NaiveTime, Timelike};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const SECONDS_PER_DAY: u64 = 86_400;
const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Copy)]
pub struct SimulationClock {
    anchor: Instant,
    start: NaiveTime,
}

impl SimulationClock {
    /// Start the clock now at `start`
    pub fn mark_start(start: NaiveTime) -> Self {
        Self::starting_at(start, Instant::now())
    }

    pub fn starting_at(start: NaiveTime, anchor: Instant) -> Self {
        Self { anchor, start }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn now(&self) -> NaiveTime {
        self.at(self.elapsed())
    }

    /// Wall-clock time since the clock started
    pub fn elapsed(&self) -> Duration {
        self.anchor.elapsed()
    }

    /// Simulated time after `elapsed`, in whole seconds
    pub fn at(&self, elapsed: Duration) -> NaiveTime {
        let seconds = (elapsed.as_secs() % SECONDS_PER_DAY) as i64;
        let (time, _) = self
            .start
            .overflowing_add_signed(ChronoDuration::seconds(seconds));
        time
    }
}

/// Alert with the simulated offset at which it becomes live.
///
/// Before the clock starts the offset is the time of day; starting the clock
/// rebases every offset onto the first alert.
#[derive(Debug, Clone)]
struct ScheduledAlert {
    due_ms: i64,
    record: AlertRecord,
}

/// Alerts ordered by when they go live.
///
/// Each alert is live once, while the simulated clock is within `window`
/// before it. Alerts the clock has passed are evicted, so a long-running
/// service only holds what is still ahead of it.
#[derive(Debug, Clone)]
pub struct AlertTimeline {
    alerts: VecDeque<ScheduledAlert>,
    window: Duration,
    clock: Option<SimulationClock>,
}

impl AlertTimeline {
    pub fn new(mut records: Vec<AlertRecord>, window: Duration) -> Self {
        records.sort_by_key(|r| r.timestamp);
        Self {
            alerts: records
                .into_iter()
                .map(|record| ScheduledAlert {
                    due_ms: millis_of_day(record.timestamp),
                    record,
                })
                .collect(),
            window,
            clock: None,
        }
    }

    /// Retained alerts in the order they go live
    pub fn records(&self) -> impl Iterator<Item = &AlertRecord> {
        self.alerts.iter().map(|a| &a.record)
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn clock(&self) -> Option<&SimulationClock> {
        self.clock.as_ref()
    }

    /// Schedule an alert; equal times keep arrival order.
    ///
    /// Once the clock runs, the alert is due at the next occurrence of its
    /// time of day at or after the simulated now.
    pub fn insert(&mut self, record: AlertRecord) {
        let due_ms = match self.clock {
            None => millis_of_day(record.timestamp),
            Some(clock) => {
                let elapsed = clock.elapsed();
                let ahead = record
                    .timestamp
                    .signed_duration_since(clock.at(elapsed))
                    .num_milliseconds()
                    .rem_euclid(MILLIS_PER_DAY);
                position_ms(elapsed) + ahead
            }
        };

        let index = self.alerts.partition_point(|a| a.due_ms <= due_ms);
        self.alerts.insert(index, ScheduledAlert { due_ms, record });
    }

    /// Start the clock at the first alert if it is not running yet.
    /// Returns `None` while the timeline is empty.
    pub fn ensure_started(&mut self) -> Option<SimulationClock> {
        if self.clock.is_none() {
            let first = self.alerts.front()?;
            let (start, base) = (first.record.timestamp, first.due_ms);
            for alert in &mut self.alerts {
                alert.due_ms -= base;
            }
            info!(start = %start, alerts = self.alerts.len(), "simulation clock started");
            self.clock = Some(SimulationClock::mark_start(start));
        }
        self.clock
    }

    /// Alerts due in `[elapsed, elapsed + window)` of simulated time since the
    /// clock started. Alerts due before `elapsed` are evicted first.
    pub fn live_after(&mut self, elapsed: Duration) -> Vec<AlertRecord> {
        if self.ensure_started().is_none() {
            return Vec::new();
        }

        let now = position_ms(elapsed);
        let before = self.alerts.len();
        while self.alerts.front().is_some_and(|a| a.due_ms < now) {
            self.alerts.pop_front();
        }
        let evicted = before - self.alerts.len();
        if evicted > 0 {
            debug!(evicted, retained = self.alerts.len(), "expired alerts evicted");
        }

        let window = i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX);
        let end = now.saturating_add(window);
        self.alerts
            .iter()
            .take_while(|a| a.due_ms < end)
            .map(|a| a.record.clone())
            .collect()
    }

    /// Alerts live at the current simulated time
    pub fn live(&mut self) -> Vec<AlertRecord> {
        match self.ensure_started() {
            Some(clock) => self.live_after(clock.elapsed()),
            None => Vec::new(),
        }
    }
}

fn millis_of_day(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight()) * 1000 + i64::from(time.nanosecond() / 1_000_000)
}

/// Clock position in whole simulated seconds
fn position_ms(elapsed: Duration) -> i64 {
    i64::try_from(elapsed.as_secs())
        .unwrap_or(i64::MAX / 1000)
        .saturating_mul(1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Gesture;

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn record(at: NaiveTime, gesture: Gesture) -> AlertRecord {
        AlertRecord {
            timestamp: at,
            camera_id: "CAM_01".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            gesture,
        }
    }

    #[test]
    fn test_clock_counts_whole_seconds() {
        let clock = SimulationClock::mark_start(time(21, 7, 5));
        assert_eq!(clock.at(Duration::from_millis(999)), time(21, 7, 5));
        assert_eq!(clock.at(Duration::from_millis(2500)), time(21, 7, 7));
    }

    #[test]
    fn test_clock_wraps_at_midnight() {
        let clock = SimulationClock::mark_start(time(23, 59, 59));
        assert_eq!(clock.at(Duration::from_secs(2)), time(0, 0, 1));
    }

    #[test]
    fn test_timeline_is_sorted() {
        let timeline = AlertTimeline::new(
            vec![
                record(time(10, 0, 5), Gesture::Punching),
                record(time(10, 0, 1), Gesture::Staring),
            ],
            Duration::from_secs(2),
        );
        assert_eq!(timeline.records().next().unwrap().gesture, Gesture::Staring);
    }

    #[test]
    fn test_live_window_is_half_open() {
        let mut timeline = AlertTimeline::new(
            vec![
                record(time(10, 0, 0), Gesture::Staring),
                record(time(10, 0, 1), Gesture::Punching),
                record(time(10, 0, 2), Gesture::Chasing),
                record(time(9, 59, 59), Gesture::Hovering),
            ],
            Duration::from_secs(2),
        );

        // one second in, the simulated time is 10:00:00
        let live = timeline.live_after(Duration::from_millis(1500));
        let gestures: Vec<_> = live.into_iter().map(|r| r.gesture).collect();
        assert_eq!(gestures, vec![Gesture::Staring, Gesture::Punching]);
    }

    #[test]
    fn test_live_window_across_midnight() {
        let mut timeline = AlertTimeline::new(
            vec![record(time(23, 59, 58), Gesture::Chasing)],
            Duration::from_secs(2),
        );
        timeline.ensure_started();
        timeline.insert(record(time(0, 0, 0), Gesture::Falling));

        let live = timeline.live_after(Duration::from_secs(1));
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].gesture, Gesture::Falling);
        assert!(timeline.live_after(Duration::from_secs(3)).is_empty());
    }

    #[test]
    fn test_passed_alerts_are_evicted() {
        let mut timeline = AlertTimeline::new(
            vec![
                record(time(10, 0, 0), Gesture::Staring),
                record(time(10, 0, 5), Gesture::Punching),
                record(time(10, 0, 30), Gesture::Chasing),
            ],
            Duration::from_secs(2),
        );

        assert_eq!(timeline.live_after(Duration::ZERO).len(), 1);
        assert_eq!(timeline.len(), 3);

        assert!(timeline.live_after(Duration::from_secs(10)).is_empty());
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.records().next().unwrap().gesture, Gesture::Chasing);

        // a day later the same times of day do not come back
        assert!(timeline.live_after(Duration::from_secs(86_400)).is_empty());
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_insert_after_start_is_scheduled_ahead() {
        let mut timeline = AlertTimeline::new(
            vec![record(time(8, 0, 0), Gesture::Loitering)],
            Duration::from_secs(2),
        );
        timeline.ensure_started();

        // behind the clock: not live now, held until its next occurrence
        timeline.insert(record(time(7, 59, 0), Gesture::Pushing));
        timeline.insert(record(time(8, 0, 1), Gesture::Punching));

        let gestures: Vec<_> = timeline.records().map(|r| r.gesture.clone()).collect();
        assert_eq!(
            gestures,
            vec![Gesture::Loitering, Gesture::Punching, Gesture::Pushing]
        );
        assert_eq!(timeline.live_after(Duration::ZERO).len(), 2);
    }

    #[test]
    fn test_clock_starts_at_first_alert() {
        let mut timeline = AlertTimeline::new(
            vec![
                record(time(12, 30, 0), Gesture::Grabbing),
                record(time(12, 0, 0), Gesture::Pushing),
            ],
            Duration::from_secs(2),
        );
        assert!(timeline.clock().is_none());

        let live = timeline.live();
        assert_eq!(timeline.clock().unwrap().start(), time(12, 0, 0));
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].gesture, Gesture::Pushing);
    }

    #[test]
    fn test_empty_timeline_does_not_start() {
        let mut timeline = AlertTimeline::new(Vec::new(), Duration::from_secs(2));
        assert!(timeline.live().is_empty());
        assert!(timeline.clock().is_none());

        timeline.insert(record(time(8, 0, 0), Gesture::Following));
        assert_eq!(timeline.live().len(), 1);
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut timeline = AlertTimeline::new(
            vec![
                record(time(10, 0, 0), Gesture::Staring),
                record(time(10, 0, 4), Gesture::Chasing),
            ],
            Duration::from_secs(2),
        );
        timeline.insert(record(time(10, 0, 2), Gesture::Punching));
        timeline.insert(record(time(10, 0, 0), Gesture::Hovering));

        let gestures: Vec<_> = timeline.records().map(|r| r.gesture.clone()).collect();
        assert_eq!(
            gestures,
            vec![
                Gesture::Staring,
                Gesture::Hovering,
                Gesture::Punching,
                Gesture::Chasing
            ]
        );
    }
}

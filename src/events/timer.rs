//! Countdown used while a team presents.
//!
//! The countdown shown to viewers is run by each client; the server only
//! remembers the last timer message for an event so that clients which
//! connect late can seed their own countdown.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
/// Below this many seconds the countdown is shown as a warning.
pub const WARNING_TIME_SECONDS: i64 = 300;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerAction {
    Start,
    Pause,
    Stop,
}

impl std::str::FromStr for TimerAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(TimerAction::Start),
            "pause" => Ok(TimerAction::Pause),
            "stop" => Ok(TimerAction::Stop),
            other => Err(format!("unknown timer action `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimerState {
    pub team_id: String,
    /// Seconds left at `running_since` (or now, if paused).
    pub time_left: i64,
    pub running_since: Option<NaiveDateTime>,
}

/// Length of a presentation in seconds.
pub fn duration_seconds(duration_minutes: i64) -> i64 {
    duration_minutes.saturating_mul(SECONDS_PER_MINUTE).max(0)
}

impl TimerState {
    pub fn new(team_id: &str, duration_minutes: i64) -> Self {
        Self {
            team_id: team_id.to_string(),
            time_left: duration_seconds(duration_minutes),
            running_since: None,
        }
    }

    pub fn remaining(&self, now: NaiveDateTime) -> i64 {
        match self.running_since {
            Some(since) => {
                let elapsed = (now - since).num_seconds().max(0);
                (self.time_left - elapsed).max(0)
            }
            None => self.time_left.max(0),
        }
    }

    pub fn is_running(&self, now: NaiveDateTime) -> bool {
        self.running_since.is_some() && self.remaining(now) > 0
    }

    pub fn start(&mut self, now: NaiveDateTime, time_left: Option<i64>) {
        self.time_left = time_left.unwrap_or(self.remaining(now)).max(0);
        self.running_since = Some(now);
    }

    pub fn pause(&mut self, now: NaiveDateTime, time_left: Option<i64>) {
        self.time_left = time_left.unwrap_or(self.remaining(now)).max(0);
        self.running_since = None;
    }

    pub fn stop(&mut self, duration_minutes: i64) {
        self.time_left = duration_seconds(duration_minutes);
        self.running_since = None;
    }

    /// Applies `action` for `team_id`, starting from a fresh countdown if the
    /// timer belonged to another team. Returns the time left to broadcast.
    pub fn apply(
        current: Option<TimerState>,
        team_id: &str,
        action: TimerAction,
        time_left: Option<i64>,
        duration_minutes: i64,
        now: NaiveDateTime,
    ) -> (TimerState, i64) {
        let mut state = match current {
            Some(state) if state.team_id == team_id => state,
            _ => TimerState::new(team_id, duration_minutes),
        };

        match action {
            TimerAction::Start => state.start(now, time_left),
            TimerAction::Pause => state.pause(now, time_left),
            TimerAction::Stop => state.stop(duration_minutes),
        }

        let left = state.remaining(now);
        (state, left)
    }
}

pub fn format_time(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / SECONDS_PER_HOUR;
    let minutes = (seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let secs = seconds % SECONDS_PER_MINUTE;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeStatus {
    Counting,
    Warning,
    Expired,
}

impl TimeStatus {
    pub fn of(seconds: i64) -> Self {
        if seconds <= 0 {
            TimeStatus::Expired
        } else if seconds < WARNING_TIME_SECONDS {
            TimeStatus::Warning
        } else {
            TimeStatus::Counting
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeStatus::Counting => "Counting down",
            TimeStatus::Warning => "Almost out of time",
            TimeStatus::Expired => "Time is up",
        }
    }

    pub fn badge_class(&self) -> &'static str {
        match self {
            TimeStatus::Counting => "badge text-bg-success",
            TimeStatus::Warning => "badge text-bg-warning",
            TimeStatus::Expired => "badge text-bg-danger",
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn formats_minutes_and_hours() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(65), "01:05");
        assert_eq!(format_time(3599), "59:59");
        assert_eq!(format_time(3600), "01:00:00");
        assert_eq!(format_time(3725), "01:02:05");
    }

    #[test]
    fn time_status_thresholds() {
        assert_eq!(TimeStatus::of(0), TimeStatus::Expired);
        assert_eq!(TimeStatus::of(299), TimeStatus::Warning);
        assert_eq!(TimeStatus::of(300), TimeStatus::Counting);
    }

    #[test]
    fn running_timer_counts_down_and_saturates() {
        let (state, left) =
            TimerState::apply(None, "a", TimerAction::Start, None, 5, t0());
        assert_eq!(left, 300);

        assert_eq!(state.remaining(t0() + Duration::seconds(10)), 290);
        assert_eq!(state.remaining(t0() + Duration::seconds(1000)), 0);
        assert!(!state.is_running(t0() + Duration::seconds(1000)));
    }

    #[test]
    fn pause_freezes_and_start_resumes() {
        let (state, _) =
            TimerState::apply(None, "a", TimerAction::Start, None, 5, t0());
        let later = t0() + Duration::seconds(30);
        let (state, left) = TimerState::apply(
            Some(state),
            "a",
            TimerAction::Pause,
            None,
            5,
            later,
        );
        assert_eq!(left, 270);
        assert_eq!(state.remaining(later + Duration::seconds(100)), 270);

        let resumed_at = later + Duration::seconds(100);
        let (state, _) = TimerState::apply(
            Some(state),
            "a",
            TimerAction::Start,
            None,
            5,
            resumed_at,
        );
        assert_eq!(state.remaining(resumed_at + Duration::seconds(20)), 250);
    }

    #[test]
    fn stop_resets_to_full_duration() {
        let (state, _) = TimerState::apply(
            None,
            "a",
            TimerAction::Start,
            Some(12),
            5,
            t0(),
        );
        let (state, left) =
            TimerState::apply(Some(state), "a", TimerAction::Stop, None, 5, t0());
        assert_eq!(left, 300);
        assert!(state.running_since.is_none());
    }

    #[test]
    fn switching_team_starts_a_fresh_countdown() {
        let (state, _) = TimerState::apply(
            None,
            "a",
            TimerAction::Start,
            Some(10),
            5,
            t0(),
        );
        let (state, left) =
            TimerState::apply(Some(state), "b", TimerAction::Start, None, 5, t0());
        assert_eq!(state.team_id, "b");
        assert_eq!(left, 300);
    }

    #[test]
    fn oversized_durations_saturate() {
        assert_eq!(duration_seconds(i64::MAX), i64::MAX);
        assert_eq!(duration_seconds(-3), 0);

        let (state, left) = TimerState::apply(
            None,
            "a",
            TimerAction::Stop,
            None,
            i64::MAX,
            t0(),
        );
        assert_eq!(left, i64::MAX);
        assert_eq!(state.remaining(t0() + Duration::seconds(5)), i64::MAX);
    }
}

//! Messages which are broadcast to connected clients while an event is being
//! presented. Every event has two logical channels (one for the public
//! present view and admins, one for the reviewers) but all messages go
//! through a single [`tokio::sync::broadcast`] channel and are filtered by the
//! receivers.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, Receiver, Sender};

use crate::events::{
    PresentationStatus,
    timer::{TimerAction, TimerState},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Present,
    Reviewer,
}

#[derive(Clone, Debug)]
/// A message which is sent following a modification made while an event is
/// being presented.
pub struct Msg {
    pub event_id: String,
    pub channel: Channel,
    pub inner: MsgContents,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerPayload {
    pub team_id: String,
    pub action: TimerAction,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub time_left: Option<i64>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "event", content = "payload")]
pub enum MsgContents {
    #[serde(rename = "add-team-curr", rename_all = "camelCase")]
    AddTeamCurr { team_id: String },
    #[serde(rename = "remove-team-curr", rename_all = "camelCase")]
    RemoveTeamCurr {
        team_id: String,
        status: PresentationStatus,
    },
    #[serde(rename = "start-team-curr")]
    StartTeamCurr(TimerPayload),
    #[serde(rename = "pause-team-curr")]
    PauseTeamCurr(TimerPayload),
    #[serde(rename = "stop-team-curr")]
    StopTeamCurr(TimerPayload),
    #[serde(rename = "toggle-score-edit", rename_all = "camelCase")]
    ToggleScoreEdit {
        event_id: String,
        can_edit_score: bool,
        toggled_by: String,
    },
    #[serde(rename = "presentation-status", rename_all = "camelCase")]
    PresentationStatus {
        event_id: String,
        status: PresentationStatus,
    },
}

impl MsgContents {
    pub fn timer(payload: TimerPayload) -> Self {
        match payload.action {
            TimerAction::Start => MsgContents::StartTeamCurr(payload),
            TimerAction::Pause => MsgContents::PauseTeamCurr(payload),
            TimerAction::Stop => MsgContents::StopTeamCurr(payload),
        }
    }

    /// The message a newly connected client needs to resume the countdown of
    /// `state`.
    pub fn timer_snapshot(state: &TimerState, now: NaiveDateTime) -> Self {
        let action = if state.is_running(now) {
            TimerAction::Start
        } else {
            TimerAction::Pause
        };
        MsgContents::timer(TimerPayload {
            team_id: state.team_id.clone(),
            action,
            time_left: Some(state.remaining(now)),
        })
    }

    pub fn to_frame(&self) -> Option<String> {
        serde_json::to_string(self)
            .map_err(|e| tracing::error!("could not encode message: {e}"))
            .ok()
    }
}

/// Handle to the realtime state of the server: the broadcast channel and the
/// last timer message seen for each event.
#[derive(Clone)]
pub struct Live {
    tx: Sender<Msg>,
    timers: Arc<Mutex<HashMap<String, TimerState>>>,
}

impl Live {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            timers: Default::default(),
        }
    }

    pub fn subscribe(&self) -> Receiver<Msg> {
        self.tx.subscribe()
    }

    pub fn send(&self, event_id: &str, channel: Channel, inner: MsgContents) {
        tracing::debug!("broadcasting {inner:?} for event {event_id}");
        // An error only means that nobody is listening right now.
        let _ = self.tx.send(Msg {
            event_id: event_id.to_string(),
            channel,
            inner,
        });
    }

    pub fn timer(&self, event_id: &str) -> Option<TimerState> {
        self.timers
            .lock()
            .ok()
            .and_then(|timers| timers.get(event_id).cloned())
    }

    pub fn set_timer(&self, event_id: &str, state: TimerState) {
        if let Ok(mut timers) = self.timers.lock() {
            timers.insert(event_id.to_string(), state);
        }
    }

    pub fn clear_timer(&self, event_id: &str) {
        if let Ok(mut timers) = self.timers.lock() {
            timers.remove(event_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_messages_use_the_action_specific_event_name() {
        let msg = MsgContents::timer(TimerPayload {
            team_id: "t1".to_string(),
            action: TimerAction::Pause,
            time_left: Some(42),
        });

        let frame: serde_json::Value =
            serde_json::from_str(&msg.to_frame().unwrap()).unwrap();
        assert_eq!(frame["event"], "pause-team-curr");
        assert_eq!(frame["payload"]["teamId"], "t1");
        assert_eq!(frame["payload"]["action"], "pause");
        assert_eq!(frame["payload"]["timeLeft"], 42);
    }

    #[test]
    fn remove_team_carries_status() {
        let msg = MsgContents::RemoveTeamCurr {
            team_id: "t2".to_string(),
            status: PresentationStatus::Done,
        };
        let frame: serde_json::Value =
            serde_json::from_str(&msg.to_frame().unwrap()).unwrap();
        assert_eq!(frame["event"], "remove-team-curr");
        assert_eq!(frame["payload"]["status"], "done");
    }

    #[tokio::test]
    async fn subscribers_receive_messages_sent_after_subscribing() {
        let live = Live::new(8);
        let mut rx = live.subscribe();
        live.send(
            "e1",
            Channel::Reviewer,
            MsgContents::ToggleScoreEdit {
                event_id: "e1".to_string(),
                can_edit_score: false,
                toggled_by: "u1".to_string(),
            },
        );

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event_id, "e1");
        assert_eq!(msg.channel, Channel::Reviewer);
    }
}

//! WebSocket channels which relay presentation messages to the browser.

use axum::{
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{Receiver, error::RecvError};

use crate::{
    auth::User,
    events::{Event, reviewers::EventReviewer},
    msg::{Channel, Live, Msg, MsgContents},
    state::Conn,
    util_resp::FailureResponse,
};

/// Which messages a connected client is interested in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    /// The public present view and the administrator's control page.
    Present,
    /// Reviewers see everything sent for their event.
    Reviewer,
}

impl Audience {
    pub fn wants(&self, event_id: &str, msg: &Msg) -> bool {
        if msg.event_id != event_id {
            return false;
        }
        match self {
            Audience::Present => msg.channel == Channel::Present,
            Audience::Reviewer => true,
        }
    }
}

pub async fn present_channel(
    ws: WebSocketUpgrade,
    Path(event_id): Path<String>,
    mut conn: Conn<false>,
    State(live): State<Live>,
) -> Result<Response, FailureResponse> {
    let event = Event::fetch(&event_id, &mut *conn)?;
    drop(conn);

    let rx = live.subscribe();
    Ok(ws.on_upgrade(move |socket| {
        handle_socket(socket, rx, live, event.id, Audience::Present)
    }))
}

pub async fn reviewer_channel(
    ws: WebSocketUpgrade,
    Path(event_id): Path<String>,
    user: User<false>,
    mut conn: Conn<false>,
    State(live): State<Live>,
) -> Result<Response, FailureResponse> {
    let event = Event::fetch(&event_id, &mut *conn)?;
    EventReviewer::require_active(&event.id, &user.id, &mut *conn)?;
    drop(conn);

    let rx = live.subscribe();
    Ok(ws.on_upgrade(move |socket| {
        handle_socket(socket, rx, live, event.id, Audience::Reviewer)
    }))
}

async fn handle_socket(
    socket: WebSocket,
    mut rx: Receiver<Msg>,
    live: Live,
    event_id: String,
    audience: Audience,
) {
    let (mut sender, mut receiver) = socket.split();

    let snapshot = live.timer(&event_id).and_then(|state| {
        MsgContents::timer_snapshot(&state, Utc::now().naive_utc()).to_frame()
    });
    if let Some(frame) = snapshot {
        if sender.send(Message::Text(frame)).await.is_err() {
            return;
        }
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = match rx.recv().await {
                Ok(msg) => msg,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "live client of event {event_id} missed {skipped} messages"
                    );
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if !audience.wants(&event_id, &msg) {
                continue;
            }
            let Some(frame) = msg.inner.to_frame() else {
                continue;
            };
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {
            // keep alive
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };
}

pub async fn live_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        include_str!("../../static/live.js"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PresentationStatus;

    fn msg(event_id: &str, channel: Channel) -> Msg {
        Msg {
            event_id: event_id.to_string(),
            channel,
            inner: MsgContents::PresentationStatus {
                event_id: event_id.to_string(),
                status: PresentationStatus::InProgress,
            },
        }
    }

    #[test]
    fn present_clients_only_see_the_present_channel() {
        assert!(Audience::Present.wants("e1", &msg("e1", Channel::Present)));
        assert!(!Audience::Present.wants("e1", &msg("e1", Channel::Reviewer)));
        assert!(!Audience::Present.wants("e1", &msg("e2", Channel::Present)));
    }

    #[test]
    fn reviewers_see_both_channels_of_their_event() {
        assert!(Audience::Reviewer.wants("e1", &msg("e1", Channel::Present)));
        assert!(Audience::Reviewer.wants("e1", &msg("e1", Channel::Reviewer)));
        assert!(!Audience::Reviewer.wants("e1", &msg("e2", Channel::Reviewer)));
    }
}

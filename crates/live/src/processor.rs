//! WebSocket message processing loop.
//!
//! Reads frames from the push-update connection, turns each
//! `lottery_update` into a validated [`LotterySnapshot`] and hands it to
//! the mailbox. Malformed frames are logged and dropped; they never end
//! the connection.

use chrono::Utc;
use futures::{Stream, StreamExt};
use islandboard_core::error::CoreError;
use islandboard_core::normalizer::{self, LotterySnapshot, Origin};
use islandboard_core::types::Timestamp;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use crate::messages::{parse_message, InboundMessage, MessageError};

/// Why a text frame produced no patch.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error(transparent)]
    Message(#[from] MessageError),

    #[error("Invalid lottery update: {0}")]
    Invalid(#[from] CoreError),
}

/// How the processing loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Close frame, receive error or end of stream.
    Disconnected,
    /// The cancellation token fired.
    Cancelled,
    /// The mailbox receiver is gone; nothing can consume patches.
    MailboxClosed,
}

/// Decode one text frame.
///
/// `Ok(None)` means the frame was valid but carries no lottery patch.
pub fn decode_patch(text: &str, now: Timestamp) -> Result<Option<LotterySnapshot>, PatchError> {
    match parse_message(text)? {
        InboundMessage::LotteryUpdate { island, data } => {
            let snapshot =
                normalizer::normalize_lottery_envelope(Origin::Scraper, &island, &data, now)?;
            Ok(Some(snapshot))
        }
        InboundMessage::OtherUpdate { kind, island } => {
            tracing::debug!(kind = %kind, island = ?island, "Ignoring non-lottery update");
            Ok(None)
        }
        InboundMessage::Control { kind } => {
            tracing::debug!(kind = %kind, "Control message");
            Ok(None)
        }
    }
}

/// Process frames until the stream ends, `cancel` fires, or the mailbox
/// closes.
///
/// A full mailbox applies backpressure: reading pauses until the consumer
/// catches up, so patches are never reordered or silently dropped.
pub async fn process_messages<S>(
    stream: &mut S,
    mailbox: &mpsc::Sender<LotterySnapshot>,
    cancel: &CancellationToken,
) -> StreamEnd
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return StreamEnd::Cancelled,
            frame = stream.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => match decode_patch(&text, Utc::now()) {
                Ok(Some(snapshot)) => {
                    tracing::debug!(
                        island_id = %snapshot.island_id,
                        games = snapshot.entries.len(),
                        "Lottery update received",
                    );
                    let sent = tokio::select! {
                        _ = cancel.cancelled() => return StreamEnd::Cancelled,
                        sent = mailbox.send(snapshot) => sent,
                    };
                    if sent.is_err() {
                        return StreamEnd::MailboxClosed;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, raw_message = %text, "Dropping malformed update");
                }
            },
            Some(Ok(Message::Binary(_))) => {
                tracing::trace!("Ignoring binary frame");
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                // Handled by tungstenite.
            }
            Some(Ok(Message::Close(frame))) => {
                tracing::info!(?frame, "Live update socket closed");
                return StreamEnd::Disconnected;
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Live update receive error");
                return StreamEnd::Disconnected;
            }
            None => return StreamEnd::Disconnected,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use futures::stream;
    use serde_json::json;

    use super::*;

    fn lottery_update(island: &str) -> String {
        json!({
            "type": "lottery_update",
            "island": island,
            "data": {
                "island": island,
                "operator": "Supreme Ventures",
                "games": [
                    { "game": "Lotto", "numbers": [3, 11, 19, 24, 30, 37], "draw_date": "2024-06-01" }
                ]
            }
        })
        .to_string()
    }

    #[test]
    fn decode_valid_lottery_update() {
        let snapshot = decode_patch(&lottery_update("jamaica"), Utc::now())
            .unwrap()
            .expect("lottery update yields a patch");
        assert_eq!(snapshot.island_id, "jamaica");
        assert_eq!(snapshot.entries.len(), 1);
    }

    #[test]
    fn decode_rejects_unknown_island() {
        assert_matches!(
            decode_patch(&lottery_update("atlantis"), Utc::now()),
            Err(PatchError::Invalid(CoreError::Validation { .. }))
        );
    }

    #[test]
    fn decode_rejects_empty_games() {
        let text = json!({"type": "lottery_update", "island": "jamaica", "data": {"games": []}})
            .to_string();
        assert_matches!(decode_patch(&text, Utc::now()), Err(PatchError::Invalid(_)));
    }

    #[test]
    fn non_lottery_frames_carry_no_patch() {
        let hotel = json!({"type": "hotel_update", "island": "jamaica", "data": {}}).to_string();
        assert!(decode_patch(&hotel, Utc::now()).unwrap().is_none());
        assert!(decode_patch(r#"{"type":"pong"}"#, Utc::now()).unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped_and_valid_ones_forwarded() {
        let frames: Vec<Result<Message, tungstenite::Error>> = vec![
            Ok(Message::Text("garbage".into())),
            Ok(Message::Text(lottery_update("jamaica"))),
            Ok(Message::Text(r#"{"type":"lottery_update","island":"jamaica"}"#.into())),
            Ok(Message::Binary(vec![1, 2, 3])),
            Ok(Message::Text(lottery_update("trinidad"))),
        ];
        let mut stream = stream::iter(frames);
        let (tx, mut rx) = mpsc::channel(8);

        let end = process_messages(&mut stream, &tx, &CancellationToken::new()).await;
        assert_eq!(end, StreamEnd::Disconnected);

        assert_eq!(rx.recv().await.unwrap().island_id, "jamaica");
        assert_eq!(rx.recv().await.unwrap().island_id, "trinidad");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn close_frame_ends_processing() {
        let frames: Vec<Result<Message, tungstenite::Error>> = vec![
            Ok(Message::Close(None)),
            Ok(Message::Text(lottery_update("jamaica"))),
        ];
        let mut stream = stream::iter(frames);
        let (tx, mut rx) = mpsc::channel(8);

        let end = process_messages(&mut stream, &tx, &CancellationToken::new()).await;
        assert_eq!(end, StreamEnd::Disconnected);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_mailbox_stops_processing() {
        let frames: Vec<Result<Message, tungstenite::Error>> =
            vec![Ok(Message::Text(lottery_update("jamaica")))];
        let mut stream = stream::iter(frames);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let end = process_messages(&mut stream, &tx, &CancellationToken::new()).await;
        assert_eq!(end, StreamEnd::MailboxClosed);
    }

    #[tokio::test]
    async fn cancellation_ends_processing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut stream = stream::pending::<Result<Message, tungstenite::Error>>();
        let (tx, _rx) = mpsc::channel(1);

        assert_eq!(
            process_messages(&mut stream, &tx, &cancel).await,
            StreamEnd::Cancelled
        );
    }
}

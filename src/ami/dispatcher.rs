//! Command dispatch
//!
//! Writes an action and reads its synchronous reply. Replies carry no
//! request id, so the reply is simply the next `Response` block on the
//! connection. Events the server pushes ahead of that reply are parked in
//! the caller's backlog for the correlator instead of being mistaken for
//! the reply or dropped.

use std::collections::VecDeque;

use crate::common::{Error, Result};

use super::codec;
use super::message::{Action, Message};
use super::session::WireSession;

async fn write_action<S: WireSession + ?Sized>(session: &mut S, action: &Action) -> Result<()> {
    if session.is_closed() {
        return Err(Error::SessionClosed);
    }
    let block = codec::encode(&action.name, &action.params)?;
    tracing::debug!("AMI >>> {} {}", action.name, action.params);
    session.send_block(&block).await
}

async fn read_message<S: WireSession + ?Sized>(session: &mut S, action: &str) -> Result<Message> {
    let raw = session.read_block().await?;
    let message = codec::decode(&raw).map_err(|e| Error::Protocol {
        action: action.to_string(),
        reason: e.to_string(),
    })?;
    tracing::debug!("AMI <<< {}", message);
    Ok(message)
}

async fn read_reply<S: WireSession + ?Sized>(
    session: &mut S,
    backlog: &mut VecDeque<Message>,
    action: &str,
) -> Result<Message> {
    loop {
        let message = read_message(session, action).await?;

        if message.is_empty() {
            tracing::warn!("Skipping empty block while waiting for '{}' reply", action);
            continue;
        }
        if message.is_response() {
            return Ok(message);
        }
        if message.is_event() {
            tracing::debug!(
                "Parking '{}' event received ahead of '{}' reply",
                message.event().unwrap_or_default(),
                action
            );
            backlog.push_back(message);
            continue;
        }

        tracing::warn!("Block without Response or Event taken as '{}' reply", action);
        return Ok(message);
    }
}

/// Send an action and return its single reply block
///
/// The reply is returned as-is; whether it reports success is up to the
/// caller.
pub async fn send<S: WireSession + ?Sized>(
    session: &mut S,
    backlog: &mut VecDeque<Message>,
    action: &Action,
) -> Result<Message> {
    write_action(session, action).await?;
    read_reply(session, backlog, &action.name).await
}

/// Send an action whose reply is a listing of several blocks
///
/// Blocks are collected until the session's [`ListFraming`] reports the
/// listing complete, and returned in receipt order with the reply first.
///
/// Only events that arrive ahead of the reply reach the backlog. Once the
/// reply is in, every block up to the end of the listing belongs to it,
/// including an unrelated event the server interleaves with the entries;
/// such an event is then not visible to a later event wait. Callers that
/// list while a change event is still outstanding should await the event
/// first.
///
/// [`ListFraming`]: super::framing::ListFraming
pub async fn send_list<S: WireSession + ?Sized>(
    session: &mut S,
    backlog: &mut VecDeque<Message>,
    action: &Action,
) -> Result<Vec<Message>> {
    let framing = session.list_framing().clone();

    write_action(session, action).await?;
    let mut received = vec![read_reply(session, backlog, &action.name).await?];

    while !framing.is_complete(&received) {
        let message = read_message(session, &action.name).await?;
        if message.is_empty() {
            continue;
        }
        received.push(message);
    }

    tracing::debug!("'{}' listing: {} blocks", action.name, received.len());
    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ami::framing::ListFraming;
    use crate::ami::memory::MemorySession;

    fn show(uuid: &str) -> Action {
        Action::new("OutCampaignShow").param("Uuid", uuid)
    }

    #[tokio::test]
    async fn test_send_writes_one_block_and_reads_reply() {
        let mut session =
            MemorySession::new().then(Message::from_pairs([("Response", "Success")]));
        let mut backlog = VecDeque::new();

        let action = Action::new("OutCampaignDelete").param("Uuid", "u-1");
        let reply = send(&mut session, &mut backlog, &action).await.unwrap();

        assert!(reply.is_success());
        assert_eq!(
            session.sent(),
            ["Action: OutCampaignDelete\r\nUuid: u-1\r\n\r\n"]
        );
        assert_eq!(session.reads(), 1);
        assert!(backlog.is_empty());
    }

    #[tokio::test]
    async fn test_send_returns_failure_reply_uninterpreted() {
        let mut session = MemorySession::new().then(Message::from_pairs([
            ("Response", "Error"),
            ("Message", "Permission denied"),
        ]));
        let mut backlog = VecDeque::new();

        let reply = send(&mut session, &mut backlog, &Action::new("OutCampaignCreate"))
            .await
            .unwrap();
        assert_eq!(reply.response(), Some("Error"));
    }

    #[tokio::test]
    async fn test_events_ahead_of_reply_go_to_backlog() {
        let mut session = MemorySession::new()
            .then(Message::from_pairs([("Event", "OutCampaignCreate"), ("Uuid", "u-1")]))
            .then(Message::from_pairs([("Response", "Success")]));
        let mut backlog = VecDeque::new();

        let reply = send(&mut session, &mut backlog, &Action::new("OutCampaignCreate"))
            .await
            .unwrap();

        assert!(reply.is_success());
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].uuid(), Some("u-1"));
    }

    #[tokio::test]
    async fn test_send_on_closed_session() {
        let mut session = MemorySession::new();
        session.close();
        let mut backlog = VecDeque::new();

        let err = send(&mut session, &mut backlog, &Action::new("Ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionClosed));
        assert!(session.sent().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_reply_is_protocol_error() {
        let mut session = MemorySession::new();
        session.push_raw("Response: Success\r\nnot a field\r\n");
        let mut backlog = VecDeque::new();

        let err = send(&mut session, &mut backlog, &Action::new("Ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_send_list_event_list_framing() {
        let mut session = MemorySession::new()
            .then(Message::from_pairs([
                ("Response", "Success"),
                ("EventList", "start"),
            ]))
            .then(Message::from_pairs([("Event", "OutCampaignEntry"), ("Uuid", "a")]))
            .then(Message::from_pairs([("Event", "OutCampaignEntry"), ("Uuid", "b")]))
            .then(Message::from_pairs([
                ("Event", "OutCampaignEntryComplete"),
                ("EventList", "Complete"),
            ]))
            .then(Message::from_pairs([("Event", "Unrelated")]));
        let mut backlog = VecDeque::new();

        let listing = send_list(&mut session, &mut backlog, &show("a")).await.unwrap();

        let uuids: Vec<Option<&str>> = listing.iter().map(|m| m.uuid()).collect();
        assert_eq!(uuids, [None, Some("a"), Some("b"), None]);
        assert_eq!(session.pending(), 1);
    }

    #[tokio::test]
    async fn test_send_list_fixed_count_framing() {
        let mut session = MemorySession::new()
            .with_framing(ListFraming::FixedCount(2))
            .then(Message::from_pairs([("Response", "Success")]))
            .then(Message::from_pairs([("Uuid", "a")]))
            .then(Message::from_pairs([("Uuid", "b")]));
        let mut backlog = VecDeque::new();

        let listing = send_list(&mut session, &mut backlog, &show("a")).await.unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(session.pending(), 1);
    }

    #[tokio::test]
    async fn test_event_inside_listing_stays_in_listing() {
        let mut session = MemorySession::new()
            .then(Message::from_pairs([
                ("Response", "Success"),
                ("EventList", "start"),
            ]))
            .then(Message::from_pairs([("Event", "OutCampaignEntry"), ("Uuid", "a")]))
            .then(Message::from_pairs([("Event", "OutCampaignDelete"), ("Uuid", "b")]))
            .then(Message::from_pairs([
                ("Event", "OutCampaignEntryComplete"),
                ("EventList", "Complete"),
            ]));
        let mut backlog = VecDeque::new();

        let listing = send_list(&mut session, &mut backlog, &show("a")).await.unwrap();

        assert_eq!(listing.len(), 4);
        assert_eq!(listing[2].event(), Some("OutCampaignDelete"));
        assert!(backlog.is_empty());
    }
}

//! Termination rules for multi-block listing replies
//!
//! A `...Show` action answers with a sequence of blocks. Where that
//! sequence ends is a property of the server, so it is configured on the
//! session rather than guessed by the dispatcher.

use serde::Deserialize;

use super::message::Message;

/// Field used by the manager's list convention
pub const EVENT_LIST: &str = "EventList";

/// How to recognise the last block of a listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListFraming {
    /// Reply carries `EventList: start`; the listing ends at the block
    /// carrying `EventList: Complete`. A reply without `start` is the
    /// whole listing (usually an error reply).
    #[default]
    EventList,
    /// The reply block alone
    Single,
    /// Exactly this many blocks, reply included
    FixedCount(usize),
    /// Ends at the first block whose `field` equals `value`
    Sentinel { field: String, value: String },
}

impl ListFraming {
    /// Whether `received` (reply first, in receipt order) is a full listing
    pub fn is_complete(&self, received: &[Message]) -> bool {
        let (Some(first), Some(last)) = (received.first(), received.last()) else {
            return false;
        };

        match self {
            ListFraming::Single => true,
            ListFraming::FixedCount(n) => received.len() >= (*n).max(1),
            ListFraming::EventList => {
                let started = first
                    .get_ignore_case(EVENT_LIST)
                    .map_or(false, |v| v.eq_ignore_ascii_case("start"));
                if !started {
                    return true;
                }
                received.len() > 1
                    && last
                        .get_ignore_case(EVENT_LIST)
                        .map_or(false, |v| v.eq_ignore_ascii_case("complete"))
            }
            ListFraming::Sentinel { field, value } => last.get(field) == Some(value.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_start() -> Message {
        Message::from_pairs([("Response", "Success"), ("EventList", "start")])
    }

    fn entry(uuid: &str) -> Message {
        Message::from_pairs([("Event", "OutCampaignEntry"), ("Uuid", uuid)])
    }

    fn complete() -> Message {
        Message::from_pairs([
            ("Event", "OutCampaignEntryComplete"),
            ("EventList", "Complete"),
            ("ListItems", "1"),
        ])
    }

    #[test]
    fn test_event_list_runs_until_complete() {
        let framing = ListFraming::EventList;
        let mut received = vec![reply_start()];
        assert!(!framing.is_complete(&received));
        received.push(entry("a"));
        assert!(!framing.is_complete(&received));
        received.push(complete());
        assert!(framing.is_complete(&received));
    }

    #[test]
    fn test_event_list_error_reply_ends_listing() {
        let reply = Message::from_pairs([("Response", "Error"), ("Message", "Not found")]);
        assert!(ListFraming::EventList.is_complete(&[reply]));
    }

    #[test]
    fn test_fixed_count_and_single() {
        let blocks = vec![reply_start(), entry("a")];
        assert!(!ListFraming::FixedCount(3).is_complete(&blocks));
        assert!(ListFraming::FixedCount(2).is_complete(&blocks));
        assert!(ListFraming::Single.is_complete(&blocks[..1]));
        assert!(!ListFraming::Single.is_complete(&[]));
    }

    #[test]
    fn test_sentinel() {
        let framing = ListFraming::Sentinel {
            field: "Event".to_string(),
            value: "OutCampaignEntryComplete".to_string(),
        };
        assert!(!framing.is_complete(&[reply_start(), entry("a")]));
        assert!(framing.is_complete(&[reply_start(), complete()]));
    }

    #[test]
    fn test_framing_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            framing: ListFraming,
        }

        let w: Wrapper = toml::from_str("framing = \"single\"").unwrap();
        assert_eq!(w.framing, ListFraming::Single);
        let w: Wrapper = toml::from_str("framing = { fixed_count = 4 }").unwrap();
        assert_eq!(w.framing, ListFraming::FixedCount(4));
    }
}

//! Manager message types
//!
//! A block on the wire is an ordered list of `Key: Value` lines. Order is
//! kept so re-encoding is stable; lookups go by field name.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Field carrying the synchronous reply status
pub const RESPONSE: &str = "Response";
/// Field naming an asynchronous event
pub const EVENT: &str = "Event";
/// Field naming the outbound action
pub const ACTION: &str = "Action";
/// Server-assigned entity identifier
pub const UUID: &str = "Uuid";
/// `Response` value of an accepted action
pub const SUCCESS: &str = "Success";

/// One decoded block: ordered `(name, value)` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    fields: Vec<(String, String)>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a message from `(name, value)` pairs, keeping their order
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Append a field (duplicates are kept; lookup returns the first)
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Builder form of [`Message::push`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive lookup, for fields whose casing varies by server version
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Synchronous reply to an action
    pub fn is_response(&self) -> bool {
        self.contains(RESPONSE)
    }

    /// Unsolicited event pushed by the server
    pub fn is_event(&self) -> bool {
        self.contains(EVENT)
    }

    pub fn response(&self) -> Option<&str> {
        self.get(RESPONSE)
    }

    pub fn event(&self) -> Option<&str> {
        self.get(EVENT)
    }

    pub fn uuid(&self) -> Option<&str> {
        self.get(UUID)
    }

    /// `Response: Success`
    pub fn is_success(&self) -> bool {
        self.response() == Some(SUCCESS)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Scalar accepted as a field value in scenario files
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => write!(f, "{}", s),
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
        }
    }
}

struct MessageVisitor;

impl<'de> Visitor<'de> for MessageVisitor {
    type Value = Message;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of field names to scalar values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Message, A::Error> {
        let mut message = Message::new();
        while let Some((key, value)) = access.next_entry::<String, Scalar>()? {
            message.push(key, value.to_string());
        }
        Ok(message)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MessageVisitor)
    }
}

/// An outbound command: a name plus ordered parameter fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub name: String,
    pub params: Message,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Message::new(),
        }
    }

    pub fn with_params(name: impl Into<String>, params: Message) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(name, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_returns_first_occurrence() {
        let msg = Message::from_pairs([("Event", "A"), ("Uuid", "1"), ("Uuid", "2")]);
        assert_eq!(msg.uuid(), Some("1"));
        assert_eq!(msg.len(), 3);
        assert!(msg.is_event());
        assert!(!msg.is_response());
    }

    #[test]
    fn test_success_requires_exact_value() {
        assert!(Message::new().with("Response", "Success").is_success());
        assert!(!Message::new().with("Response", "Error").is_success());
        assert!(!Message::new().with("Event", "Success").is_success());
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let msg = Message::new().with("EventList", "Complete");
        assert_eq!(msg.get("eventlist"), None);
        assert_eq!(msg.get_ignore_case("eventlist"), Some("Complete"));
    }

    #[test]
    fn test_yaml_preserves_field_order() {
        let msg: Message = serde_yaml::from_str("Name: TestCamp\nDetail: TestDetail\nRetries: 3\n")
            .unwrap();
        let names: Vec<&str> = msg.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["Name", "Detail", "Retries"]);
        assert_eq!(msg.get("Retries"), Some("3"));
    }

    #[test]
    fn test_json_shape() {
        let msg = Message::from_pairs([("Response", "Success"), ("Message", "ok")]);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"Response":"Success","Message":"ok"}"#);
    }
}

use serde_json::Value;

/// Top-level member that marks each notice type
const NOTICES: [(&str, MessageKind); 8] = [
    ("delete", MessageKind::Delete),
    ("scrub_geo", MessageKind::ScrubGeo),
    ("limit", MessageKind::Limit),
    ("status_withheld", MessageKind::StatusWithheld),
    ("user_withheld", MessageKind::UserWithheld),
    ("disconnect", MessageKind::Disconnect),
    ("warning", MessageKind::Warning),
    ("friends", MessageKind::Friends),
];

/// What a decoded stream message carries
///
/// Classification looks only at which top-level members are present; the
/// message itself is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// User/site stream event (`{"event": "favorite", ...}`)
    Event(String),
    /// Status deletion notice
    Delete,
    /// Location deletion notice
    ScrubGeo,
    /// Track limitation notice
    Limit,
    /// Status withheld in some countries
    StatusWithheld,
    /// User withheld in some countries
    UserWithheld,
    /// Server is about to close the connection
    Disconnect,
    /// Stall or follow-limit warning
    Warning,
    /// Friend list preamble of a user stream
    Friends,
    /// Anything else, typically a status
    Data,
}

impl MessageKind {
    /// Classifies a decoded message
    #[must_use]
    pub fn of(message: &Value) -> Self {
        let Some(obj) = message.as_object() else {
            return Self::Data;
        };

        if let Some(name) = obj.get("event").and_then(Value::as_str) {
            return Self::Event(name.to_string());
        }

        NOTICES
            .into_iter()
            .find(|(key, _)| obj.contains_key(*key))
            .map_or(Self::Data, |(_, kind)| kind)
    }

    /// True for the notices sent just before the server drops the connection
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnect)
    }
}

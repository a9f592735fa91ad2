//! Event classes and inbound event shapes.
//!
//! Every inbound occurrence belongs to exactly one [`EventClass`]. The class
//! decides which registry sequence is consulted, how the match subject is
//! derived, and whether dispatch stops at the first match.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the three independently dispatched categories of inbound events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventClass {
    /// A channel or private message. First match wins.
    #[default]
    Message,
    /// An explicit protocol command. Every match fires.
    Command,
    /// A membership change (e.g. a kick). Every match fires.
    Membership,
}

impl EventClass {
    /// All classes, in registry order.
    pub const ALL: [EventClass; 3] = [Self::Message, Self::Command, Self::Membership];

    /// Returns the class name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Command => "command",
            Self::Membership => "membership",
        }
    }

    /// Returns `true` if dispatch for this class stops after the first
    /// matching handler.
    pub fn stops_at_first_match(self) -> bool {
        matches!(self, Self::Message)
    }

    /// Position of this class in [`EventClass::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::Message => 0,
            Self::Command => 1,
            Self::Membership => 2,
        }
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown event class name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event class: {0}")]
pub struct UnknownEventClass(pub String);

impl FromStr for EventClass {
    type Err = UnknownEventClass;

    /// Accepts the class names and the IRC-flavoured aliases
    /// `privmsg`, `cmd` and `kick`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "message" | "privmsg" => Ok(Self::Message),
            "command" | "cmd" => Ok(Self::Command),
            "membership" | "kick" => Ok(Self::Membership),
            _ => Err(UnknownEventClass(s.to_string())),
        }
    }
}

/// An event as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A message `text` from `sender` to `target` (a channel or the bot).
    Message {
        sender: String,
        target: String,
        text: String,
    },
    /// A protocol command with its raw parameter string.
    Command {
        sender: String,
        cmd: String,
        params: String,
    },
    /// A membership change; `params` is its textual payload, for a kick
    /// `"<channel> <victim> :<reason>"`.
    Membership { params: String },
}

impl InboundEvent {
    /// Returns the class this event is dispatched under.
    pub fn class(&self) -> EventClass {
        match self {
            Self::Message { .. } => EventClass::Message,
            Self::Command { .. } => EventClass::Command,
            Self::Membership { .. } => EventClass::Membership,
        }
    }

    /// Returns the text handler rules are matched against.
    ///
    /// Messages match on their raw text, commands on `"<cmd> :<params>"`, and
    /// membership changes on their payload.
    pub fn subject(&self) -> String {
        match self {
            Self::Message { text, .. } => text.clone(),
            Self::Command { cmd, params, .. } => command_subject(cmd, params),
            Self::Membership { params } => params.clone(),
        }
    }

    /// Borrows the handler payload of this event.
    pub fn payload(&self) -> Payload<'_> {
        match self {
            Self::Message { sender, text, .. } => Payload::Message { sender, text },
            Self::Command { cmd, params, .. } => Payload::Command { cmd, params },
            Self::Membership { params } => Payload::Membership { params },
        }
    }

    /// Returns the originating nick or prefix, if the event carries one.
    pub fn sender(&self) -> Option<&str> {
        match self {
            Self::Message { sender, .. } | Self::Command { sender, .. } => Some(sender.as_str()),
            Self::Membership { .. } => None,
        }
    }
}

impl fmt::Display for InboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message {
                sender,
                target,
                text,
            } => write!(f, "message from {sender} to {target}: {text}"),
            Self::Command {
                sender,
                cmd,
                params,
            } => write!(f, "command {cmd} from {sender}: {params}"),
            Self::Membership { params } => write!(f, "membership change: {params}"),
        }
    }
}

/// The second argument of a handler's `run`: the event's essential fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    Message { sender: &'a str, text: &'a str },
    Command { cmd: &'a str, params: &'a str },
    Membership { params: &'a str },
}

/// Joins a command and its parameters into the command match subject.
pub fn command_subject(cmd: &str, params: &str) -> String {
    format!("{cmd} :{params}")
}

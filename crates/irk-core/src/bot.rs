//! Bot trait and related types.
//!
//! [`Bot`] is the set of bot-level capabilities a running handler can use.
//! It is the outbound half of the transport boundary: the transport provides
//! a way to put a line on the wire, and everything else is expressed on top
//! of [`Bot::send_raw`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ApiError, ApiResult};

/// An operator request against the handler registry.
///
/// Requests are queued by [`Bot::request_admin`] and executed by the runtime
/// between two events, never in the middle of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminRequest {
    /// Load every package allowed by the configuration.
    LoadAll,
    /// Load one package, optionally only the named handlers.
    Load {
        package: String,
        handlers: Option<Vec<String>>,
    },
    /// Unload a package, optionally only the handlers loaded under one name.
    Unload {
        package: String,
        handler_type: Option<String>,
    },
}

impl fmt::Display for AdminRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadAll => f.write_str("load all"),
            Self::Load {
                package,
                handlers: None,
            } => write!(f, "load {package}"),
            Self::Load {
                package,
                handlers: Some(names),
            } => write!(f, "load {package} [{}]", names.join(", ")),
            Self::Unload {
                package,
                handler_type: None,
            } => write!(f, "unload {package}"),
            Self::Unload {
                package,
                handler_type: Some(name),
            } => write!(f, "unload {package}.{name}"),
        }
    }
}

/// Bot-level capabilities exposed to handlers.
///
/// Only [`nick`](Bot::nick) and [`send_raw`](Bot::send_raw) are required;
/// the remaining methods format standard IRC commands on top of `send_raw`.
#[async_trait]
pub trait Bot: Send + Sync + 'static {
    /// Returns the bot's current nick.
    fn nick(&self) -> &str;

    /// Sends one raw protocol line to the server, without the trailing CRLF.
    async fn send_raw(&self, line: &str) -> ApiResult<()>;

    /// Sends a `PRIVMSG` to a channel or nick.
    async fn send_message(&self, target: &str, text: &str) -> ApiResult<()> {
        self.send_raw(&format!("PRIVMSG {target} :{text}")).await
    }

    /// Sends a `NOTICE` to a channel or nick.
    async fn send_notice(&self, target: &str, text: &str) -> ApiResult<()> {
        self.send_raw(&format!("NOTICE {target} :{text}")).await
    }

    /// Joins a channel.
    async fn join(&self, channel: &str) -> ApiResult<()> {
        self.send_raw(&format!("JOIN {channel}")).await
    }

    /// Leaves a channel.
    async fn part(&self, channel: &str, reason: Option<&str>) -> ApiResult<()> {
        match reason {
            Some(reason) => self.send_raw(&format!("PART {channel} :{reason}")).await,
            None => self.send_raw(&format!("PART {channel}")).await,
        }
    }

    /// Queues an administrative request against the handler registry.
    ///
    /// The default implementation reports the capability as unsupported.
    fn request_admin(&self, request: AdminRequest) -> ApiResult<()> {
        let _ = request;
        Err(ApiError::Unsupported("admin"))
    }
}

/// A shared Bot trait object.
pub type BoxedBot = Arc<dyn Bot>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingBot {
        lines: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Bot for RecordingBot {
        fn nick(&self) -> &str {
            "irk"
        }

        async fn send_raw(&self, line: &str) -> ApiResult<()> {
            self.lines.lock().unwrap().push(line.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_commands_format_lines() {
        let bot = RecordingBot {
            lines: Mutex::new(Vec::new()),
        };
        bot.send_message("#rust", "hello").await.unwrap();
        bot.send_notice("alice", "psst").await.unwrap();
        bot.join("#irk").await.unwrap();
        bot.part("#irk", Some("bye")).await.unwrap();
        bot.part("#irk", None).await.unwrap();

        assert_eq!(
            *bot.lines.lock().unwrap(),
            vec![
                "PRIVMSG #rust :hello",
                "NOTICE alice :psst",
                "JOIN #irk",
                "PART #irk :bye",
                "PART #irk",
            ]
        );
    }

    #[test]
    fn test_admin_unsupported_by_default() {
        let bot = RecordingBot {
            lines: Mutex::new(Vec::new()),
        };
        assert!(matches!(
            bot.request_admin(AdminRequest::LoadAll),
            Err(ApiError::Unsupported("admin"))
        ));
    }

    #[test]
    fn test_admin_request_display() {
        let req = AdminRequest::Unload {
            package: "greet".into(),
            handler_type: Some("Hello".into()),
        };
        assert_eq!(req.to_string(), "unload greet.Hello");
    }
}

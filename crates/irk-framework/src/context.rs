//! The per-invocation execution context handed to handlers.
//!
//! A fresh [`Context`] is built for every handler the dispatcher invokes and
//! dropped when `run` returns. It is a read-only view that combines:
//!
//! - the bot capabilities (the context derefs to `dyn Bot`, so
//!   `ctx.send_message(..)` works directly),
//! - the package the handler was loaded from,
//! - the fields of the firing event (`sender`, `target`, `line`, `cmd`,
//!   `params`, depending on its class),
//! - the match result of the handler's rule.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use irk_core::{ApiError, ApiResult, Bot, BoxedBot, EventClass, InboundEvent, Match};

/// The execution context passed to [`Handler::run`](crate::Handler::run).
pub struct Context {
    bot: BoxedBot,
    package: Arc<str>,
    event: InboundEvent,
    matched: Match,
}

impl Context {
    /// Creates a context for one handler invocation.
    pub fn new(bot: BoxedBot, package: Arc<str>, event: InboundEvent, matched: Match) -> Self {
        Self {
            bot,
            package,
            event,
            matched,
        }
    }

    /// Returns the bot capabilities.
    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// Returns the name of the package the running handler was loaded from.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Returns the firing event.
    pub fn event(&self) -> &InboundEvent {
        &self.event
    }

    /// Returns the class of the firing event.
    pub fn class(&self) -> EventClass {
        self.event.class()
    }

    /// Returns the match of the handler's rule against the event subject.
    pub fn matched(&self) -> &Match {
        &self.matched
    }

    // ─── Event fields ────────────────────────────────────────────────────────

    /// The sender prefix (`nick!user@host` or a server name).
    pub fn sender(&self) -> Option<&str> {
        self.event.sender()
    }

    /// The nick part of the sender prefix.
    pub fn sender_nick(&self) -> Option<&str> {
        self.sender().map(|s| s.split('!').next().unwrap_or(s))
    }

    /// The message target (message events only).
    pub fn target(&self) -> Option<&str> {
        match &self.event {
            InboundEvent::Message { target, .. } => Some(target),
            _ => None,
        }
    }

    /// The raw message text (message events only).
    pub fn line(&self) -> Option<&str> {
        match &self.event {
            InboundEvent::Message { text, .. } => Some(text),
            _ => None,
        }
    }

    /// The command name (command events only).
    pub fn cmd(&self) -> Option<&str> {
        match &self.event {
            InboundEvent::Command { cmd, .. } => Some(cmd),
            _ => None,
        }
    }

    /// The parameter string (command and membership events).
    pub fn params(&self) -> Option<&str> {
        match &self.event {
            InboundEvent::Command { params, .. } | InboundEvent::Membership { params } => {
                Some(params)
            }
            InboundEvent::Message { .. } => None,
        }
    }

    // ─── Helpers ─────────────────────────────────────────────────────────────

    /// Returns where a reply to this event should go.
    ///
    /// Channel messages are answered in the channel and private messages
    /// privately. Commands are answered to the sender, membership changes in
    /// the channel named by the first parameter.
    pub fn reply_target(&self) -> Option<&str> {
        match &self.event {
            InboundEvent::Message { target, .. } if is_channel(target) => Some(target),
            InboundEvent::Message { .. } | InboundEvent::Command { .. } => self.sender_nick(),
            InboundEvent::Membership { params } => params
                .split_whitespace()
                .next()
                .filter(|first| is_channel(first)),
        }
    }

    /// Sends `text` to the [`reply_target`](Self::reply_target).
    pub async fn reply(&self, text: &str) -> ApiResult<()> {
        let target = self
            .reply_target()
            .ok_or_else(|| ApiError::Other(format!("no reply target for {}", self.event)))?;
        self.bot.send_message(target, text).await
    }
}

/// Returns `true` if `name` is an IRC channel name.
pub fn is_channel(name: &str) -> bool {
    name.starts_with(['#', '&', '+', '!'])
}

impl Deref for Context {
    type Target = dyn Bot;

    fn deref(&self) -> &Self::Target {
        self.bot.as_ref()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wrapped: {}", self.event)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("bot", &self.bot.nick())
            .field("package", &self.package)
            .field("event", &self.event)
            .field("matched", &self.matched)
            .finish()
    }
}

//! The boundary between the runtime and an IRC transport.
//!
//! The transport (connection, TLS, framing, keep-alive) lives outside this
//! crate. It plugs in through two small surfaces:
//!
//! - **Outbound**: the transport implements [`Outbound`] (or uses
//!   [`ChannelOutbound`] and drains the receiver), and the runtime's bot
//!   writes protocol lines to it.
//! - **Inbound**: the transport feeds parsed events into an [`EventSink`].
//!   Sinks are cheap to clone and can be handed to any task.
//!
//! ```text
//! ┌───────────┐ on_message ┌───────────┐  dispatch  ┌──────────┐
//! │ Transport │───────────▶│ EventSink │──(queue)──▶│ Runtime  │
//! │           │◀───────────│ Outbound  │◀───────────│ (bot)    │
//! └───────────┘  send_line └───────────┘            └──────────┘
//! ```

use async_trait::async_trait;
use tokio::sync::mpsc;

use irk_core::{AdminRequest, ApiError, ApiResult, InboundEvent};

use crate::error::{RuntimeError, RuntimeResult};

/// The outbound half of a transport: puts one protocol line on the wire.
#[async_trait]
pub trait Outbound: Send + Sync + 'static {
    /// Sends `line`, without the trailing CRLF.
    async fn send_line(&self, line: &str) -> ApiResult<()>;
}

/// An [`Outbound`] that forwards lines to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelOutbound {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelOutbound {
    /// Creates the outbound and the receiver the transport drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Outbound for ChannelOutbound {
    async fn send_line(&self, line: &str) -> ApiResult<()> {
        self.tx
            .send(line.to_string())
            .map_err(|_| ApiError::NotConnected)
    }
}

/// One unit of work for the runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    Event(InboundEvent),
    Admin(AdminRequest),
}

/// The inbound half of a transport.
///
/// Every call enqueues; the runtime handles items strictly one at a time, in
/// order. The runtime stops once every sink has been dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<QueueItem>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<QueueItem>) -> Self {
        Self { tx }
    }

    /// A `PRIVMSG` from `sender` to `target`.
    pub fn on_message(
        &self,
        sender: impl Into<String>,
        target: impl Into<String>,
        text: impl Into<String>,
    ) -> RuntimeResult<()> {
        self.send_event(InboundEvent::Message {
            sender: sender.into(),
            target: target.into(),
            text: text.into(),
        })
    }

    /// Any other protocol command with its raw parameter string.
    pub fn on_command(
        &self,
        sender: impl Into<String>,
        cmd: impl Into<String>,
        params: impl Into<String>,
    ) -> RuntimeResult<()> {
        self.send_event(InboundEvent::Command {
            sender: sender.into(),
            cmd: cmd.into(),
            params: params.into(),
        })
    }

    /// A membership change, e.g. a `KICK` as `"<channel> <victim> :<reason>"`.
    pub fn on_membership_change(&self, params: impl Into<String>) -> RuntimeResult<()> {
        self.send_event(InboundEvent::Membership {
            params: params.into(),
        })
    }

    /// Enqueues an already built event.
    pub fn send_event(&self, event: InboundEvent) -> RuntimeResult<()> {
        self.push(QueueItem::Event(event))
    }

    /// Enqueues an administrative request.
    pub fn admin(&self, request: AdminRequest) -> RuntimeResult<()> {
        self.push(QueueItem::Admin(request))
    }

    fn push(&self, item: QueueItem) -> RuntimeResult<()> {
        self.tx.send(item).map_err(|_| RuntimeError::QueueClosed)
    }
}

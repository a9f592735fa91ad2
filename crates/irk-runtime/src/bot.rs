//! The bot handed to handlers by the runtime.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use irk_core::{AdminRequest, ApiError, ApiResult, Bot};

use crate::transport::{Outbound, QueueItem};

/// [`Bot`] implementation backed by a transport [`Outbound`].
///
/// Admin requests are queued behind the events already waiting, so they run
/// after the current dispatch completes. The bot only holds a weak handle on
/// the queue and does not keep the runtime alive.
pub struct RuntimeBot {
    nick: String,
    outbound: Arc<dyn Outbound>,
    queue: mpsc::WeakUnboundedSender<QueueItem>,
}

impl RuntimeBot {
    pub(crate) fn new(
        nick: impl Into<String>,
        outbound: Arc<dyn Outbound>,
        queue: mpsc::WeakUnboundedSender<QueueItem>,
    ) -> Self {
        Self {
            nick: nick.into(),
            outbound,
            queue,
        }
    }
}

#[async_trait]
impl Bot for RuntimeBot {
    fn nick(&self) -> &str {
        &self.nick
    }

    async fn send_raw(&self, line: &str) -> ApiResult<()> {
        if line.contains(['\r', '\n']) {
            return Err(ApiError::SendFailed(
                "line contains a CR or LF character".to_string(),
            ));
        }
        debug!(line, "Sending line");
        self.outbound.send_line(line).await
    }

    fn request_admin(&self, request: AdminRequest) -> ApiResult<()> {
        let queue = self.queue.upgrade().ok_or(ApiError::NotConnected)?;
        info!(%request, "Admin request queued");
        queue
            .send(QueueItem::Admin(request))
            .map_err(|_| ApiError::NotConnected)
    }
}

impl std::fmt::Debug for RuntimeBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeBot")
            .field("nick", &self.nick)
            .finish_non_exhaustive()
    }
}

//! Event dispatch.
//!
//! The dispatcher holds no state of its own. For each event it snapshots the
//! registry sequence of the event's class, matches every entry's rule against
//! the event subject in order, and runs the matching handlers:
//!
//! | Class | Subject | Policy |
//! |-------|---------|--------|
//! | message | raw text | first match wins |
//! | command | `"<cmd> :<params>"` | every match fires |
//! | membership | params | every match fires |
//!
//! A handler that returns an error or panics is logged and skipped; dispatch
//! always continues with the next entry and never fails.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{Instrument, debug, debug_span, error, trace};

use irk_core::{BoxedBot, HandlerError, InboundEvent};

use crate::context::Context;
use crate::registry::{Entry, Registry};

/// Routes inbound events to registered handlers.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    bot: BoxedBot,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, bot: BoxedBot) -> Self {
        Self { registry, bot }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Dispatches a message. At most one handler runs.
    pub async fn handle_message(&self, sender: &str, target: &str, text: &str) -> usize {
        self.dispatch(InboundEvent::Message {
            sender: sender.to_string(),
            target: target.to_string(),
            text: text.to_string(),
        })
        .await
    }

    /// Dispatches a protocol command to every matching handler.
    pub async fn handle_command(&self, sender: &str, cmd: &str, params: &str) -> usize {
        self.dispatch(InboundEvent::Command {
            sender: sender.to_string(),
            cmd: cmd.to_string(),
            params: params.to_string(),
        })
        .await
    }

    /// Dispatches a membership change to every matching handler.
    pub async fn handle_membership(&self, params: &str) -> usize {
        self.dispatch(InboundEvent::Membership {
            params: params.to_string(),
        })
        .await
    }

    /// Dispatches `event` and returns the number of handlers that ran,
    /// failed ones included.
    pub async fn dispatch(&self, event: InboundEvent) -> usize {
        let span = debug_span!("dispatch", class = %event.class());
        self.walk(event).instrument(span).await
    }

    async fn walk(&self, event: InboundEvent) -> usize {
        let class = event.class();
        let subject = event.subject();
        let first_match_only = class.stops_at_first_match();

        let mut visited = HashSet::new();
        let mut fired = 0;
        for entry in self.registry.entries_for(class) {
            // Duplicate registrations of one handler are evaluated once.
            if first_match_only && !visited.insert(entry.handler_id()) {
                trace!(handler = entry.type_name(), "Skipping repeated handler");
                continue;
            }
            let Some(matched) = entry.pattern().captures(&subject) else {
                continue;
            };

            debug!(
                package = entry.source(),
                handler = entry.type_name(),
                rule = entry.pattern().rule(),
                "Match"
            );
            let ctx = Context::new(
                self.bot.clone(),
                entry.source_arc().clone(),
                event.clone(),
                matched,
            );
            if let Err(e) = invoke(&entry, &ctx).await {
                error!(
                    package = entry.source(),
                    handler = entry.type_name(),
                    event = %ctx,
                    error = %e,
                    detail = ?e,
                    "Handler failed"
                );
            }
            fired += 1;

            if first_match_only {
                break;
            }
        }
        fired
    }
}

/// Runs one handler, turning both errors and panics into a [`HandlerError`].
async fn invoke(entry: &Entry, ctx: &Context) -> Result<(), HandlerError> {
    let payload = ctx.event().payload();
    match AssertUnwindSafe(entry.handler().run(ctx, payload))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HandlerError::Failed(e)),
        Err(panic) => Err(HandlerError::from_panic(panic)),
    }
}

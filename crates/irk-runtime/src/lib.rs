//! irk Runtime - Orchestration layer for the irk IRC bot framework.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `IrkConfig`)
//! - Logging configuration (`LoggingBuilder`)
//! - The transport boundary (`Outbound`, `EventSink`)
//! - The bot handed to handlers (`RuntimeBot`)
//! - The single-queue event loop (`IrkRuntime`)
//!
//! ```ignore
//! use irk_framework::LinkedModuleSource;
//! use irk_runtime::{ChannelOutbound, IrkRuntime};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (outbound, mut lines) = ChannelOutbound::new();
//!     let runtime = IrkRuntime::builder().build(LinkedModuleSource, outbound)?;
//!
//!     // The transport writes `lines` to the socket and feeds the sink.
//!     let sink = runtime.sink();
//!     spawn_transport(sink, lines);
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod transport;

// Re-exports
pub use bot::RuntimeBot;
pub use config::{ConfigError, ConfigLoader, ConfigResult, IrkConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{IrkRuntime, RuntimeBuilder};
pub use transport::{ChannelOutbound, EventSink, Outbound};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}

//! # irk
//!
//! A pluggable, pattern-routed IRC bot framework for Rust.
//!
//! ## Overview
//!
//! irk keeps the bot core small: packages of handlers are discovered at
//! startup, each handler declares a rule and the event class it listens to,
//! and incoming events are routed to matching handlers in priority order.
//!
//! ```text
//! ┌───────────┐     ┌─────────┐     ┌────────────┐     ┌──────────────────┐
//! │ Transport │────▶│ Runtime │────▶│ Dispatcher │────▶│ Handler (Context)│──▶ Bot
//! │ (sink)    │     │ (queue) │     │ (registry) │     └──────────────────┘
//! └───────────┘     └─────────┘     └────────────┘
//! ```
//!
//! - **Messages** go to the first handler whose rule matches the text
//! - **Commands** go to every handler whose rule matches `"<cmd> :<params>"`
//! - **Membership changes** go to every handler whose rule matches the params
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use irk::prelude::*;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Handler for Echo {
//!     fn rule(&self) -> &str {
//!         r"!echo (.+)"
//!     }
//!
//!     async fn run(&self, ctx: &Context, _payload: Payload<'_>) -> Result<(), BoxError> {
//!         ctx.reply(ctx.matched().group(1).unwrap_or_default()).await?;
//!         Ok(())
//!     }
//! }
//!
//! impl HandlerInit for Echo {
//!     fn init(_bot: BoxedBot, _config: &ValidatedConfig) -> Result<Self, BoxError> {
//!         Ok(Echo)
//!     }
//! }
//!
//! register_package! {
//!     name: "echo",
//!     handlers: [Echo],
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (outbound, lines) = ChannelOutbound::new();
//!     let runtime = IrkRuntime::builder().build(LinkedModuleSource, outbound)?;
//!     let sink = runtime.sink();
//!     // connect `sink` and `lines` to a transport ...
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use irk_core as core;
pub use irk_framework as framework;
pub use irk_runtime as runtime;

pub use irk_framework::{define_package, register_package};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use irk::prelude::*;
/// ```
pub mod prelude {
    pub use async_trait::async_trait;

    // Runtime - main entry point
    pub use irk_runtime::{ChannelOutbound, EventSink, IrkRuntime, Outbound};

    // Handlers and packages
    pub use irk_framework::{
        Context, Handler, HandlerInit, LinkedModuleSource, ModuleSource, Package, Payload,
        StaticModuleSource, define_package, register_package,
    };

    // Core vocabulary
    pub use irk_core::{
        AdminRequest, ApiError, ApiResult, Bot, BoxError, BoxedBot, ConfigSchema, EventClass,
        InboundEvent, OptionType, ValidatedConfig,
    };
}

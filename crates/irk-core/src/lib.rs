//! # irk Core
//!
//! Leaf types shared by every layer of the irk IRC bot framework.
//!
//! This crate has no notion of plugins or dispatch order; it only defines the
//! vocabulary the higher layers speak:
//!
//! - **Bot capabilities**: the outbound half of the transport boundary
//!   ([`Bot`], [`BoxedBot`], [`AdminRequest`])
//! - **Events**: the three event classes and the inbound event shapes
//!   ([`EventClass`], [`InboundEvent`])
//! - **Patterns**: compiled handler rules and their match results
//!   ([`Pattern`], [`Match`])
//! - **Config validation**: declared option schemas and their type check
//!   ([`ConfigSchema`], [`OptionType`], [`validate`])
//! - **Errors**: the error taxonomy used across the workspace
//!
//! ```text
//! ┌───────────┐     ┌────────────┐     ┌──────────────────┐
//! │ Transport │────▶│ Dispatcher │────▶│ Handler (Context)│──▶ Bot::send_*
//! └───────────┘     └────────────┘     └──────────────────┘
//! ```

pub mod bot;
pub mod config;
pub mod error;
pub mod event;
pub mod pattern;

pub use bot::{AdminRequest, Bot, BoxedBot};
pub use config::{ConfigSchema, OptionType, SchemaEntry, ValidatedConfig, validate};
pub use error::{
    ApiError, ApiResult, BoxError, ConfigError, ConfigResult, HandlerError, LoadError, LoadResult,
};
pub use event::{EventClass, InboundEvent, Payload};
pub use pattern::{Match, Pattern};

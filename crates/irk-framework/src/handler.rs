//! The handler contract implemented by every plugin unit.
//!
//! A handler declares a rule (a start-anchored regular expression) and the
//! event class it listens to, and reacts to matching events in
//! [`run`](Handler::run).
//!
//! ```rust,ignore
//! use irk::prelude::*;
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Handler for Hello {
//!     fn rule(&self) -> &str {
//!         r"^hello\b"
//!     }
//!
//!     async fn run(&self, ctx: &Context, _payload: Payload<'_>) -> Result<(), BoxError> {
//!         ctx.reply("hello yourself").await?;
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use irk_core::{BoxError, BoxedBot, ConfigSchema, EventClass, ValidatedConfig};

use crate::context::Context;

pub use irk_core::event::Payload;

/// A pluggable unit matched against incoming events.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// The rule events are matched against. Compiled once, at load time.
    fn rule(&self) -> &str;

    /// The event class this handler is registered under.
    fn handler_type(&self) -> EventClass {
        EventClass::default()
    }

    /// The name used to select this handler on load and unload.
    ///
    /// Defaults to the unqualified Rust type name.
    fn type_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Reacts to a matching event.
    async fn run(&self, ctx: &Context, payload: Payload<'_>) -> Result<(), BoxError>;

    /// Called once when the handler is removed from the registry.
    async fn unload(&self) {}
}

/// A boxed handler, as returned by constructors.
pub type BoxedHandler = Box<dyn Handler>;

/// Handlers that can be built from the bot and their validated config.
///
/// Implementing this trait lets a handler type be listed in
/// [`define_package!`](crate::define_package) or added with
/// [`Package::handler_init`](crate::package::Package::handler_init).
pub trait HandlerInit: Handler + Sized {
    /// Options declared by this handler alone, layered over the package's
    /// shared options before validation.
    fn schema() -> ConfigSchema {
        ConfigSchema::new()
    }

    /// Builds the handler.
    fn init(bot: BoxedBot, config: &ValidatedConfig) -> Result<Self, BoxError>;
}

/// Strips the module path and generic arguments from a type name.
pub fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    #[async_trait]
    impl Handler for Plain {
        fn rule(&self) -> &str {
            "x"
        }

        async fn run(&self, _ctx: &Context, _payload: Payload<'_>) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[test]
    fn test_defaults() {
        let h = Plain;
        assert_eq!(h.handler_type(), EventClass::Message);
        assert_eq!(h.type_name(), "Plain");
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("a::b::Greeter"), "Greeter");
        assert_eq!(short_type_name("a::Wrap<b::Inner>"), "Wrap");
        assert_eq!(short_type_name("Bare"), "Bare");
    }
}

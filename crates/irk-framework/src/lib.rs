//! # irk Framework
//!
//! The handler registry and event dispatch core of the irk IRC bot.
//!
//! This layer provides:
//! - The [`Handler`] contract and the per-invocation [`Context`]
//! - [`Package`]s of handler constructors and the [`ModuleSource`]s they come
//!   from, including link-time registration via [`register_package!`]
//! - The [`Registry`] of per-class, priority-ordered handler entries
//! - The [`Loader`], which validates, constructs and registers handlers
//! - The [`Dispatcher`], which routes inbound events to matching handlers
//!
//! It knows nothing about sockets or configuration files; those live in
//! `irk-runtime`.

pub mod context;
pub mod dispatcher;
pub mod handler;
pub mod loader;
pub mod macros;
pub mod package;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::Context;
pub use dispatcher::Dispatcher;
pub use handler::{BoxedHandler, Handler, HandlerInit, Payload};
pub use loader::{LoadReport, Loader, PackageOptions};
pub use package::{
    HandlerFactory, LinkedModuleSource, ModuleSource, Package, PackageDescriptor,
    StaticModuleSource,
};
pub use registry::{Entry, Registry};

#[doc(hidden)]
pub use irk_core as __irk_core;
#[doc(hidden)]
pub use linkme as __linkme;

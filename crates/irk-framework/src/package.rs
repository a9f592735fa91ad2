//! Packages and module sources.
//!
//! A [`Package`] is a named bundle of handler constructors plus an optional
//! shared option schema. A [`ModuleSource`] is the read-only collection the
//! loader enumerates packages from.
//!
//! Two sources are provided:
//!
//! - [`StaticModuleSource`]: packages added programmatically
//! - [`LinkedModuleSource`]: every package registered at link time with
//!   [`register_package!`](crate::register_package)

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use linkme::distributed_slice;

use irk_core::{BoxError, BoxedBot, ConfigSchema, ValidatedConfig};

use crate::handler::{BoxedHandler, HandlerInit};

// =============================================================================
// Handler factories
// =============================================================================

/// Constructor signature stored in a [`HandlerFactory`].
///
/// `Ok(None)` means the constructor ran but declined to produce a handler.
pub type ConstructFn =
    dyn Fn(BoxedBot, &ValidatedConfig) -> Result<Option<BoxedHandler>, BoxError> + Send + Sync;

/// A named handler constructor exported by a package.
#[derive(Clone)]
pub struct HandlerFactory {
    name: Cow<'static, str>,
    schema: ConfigSchema,
    construct: Arc<ConstructFn>,
}

impl HandlerFactory {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, construct: F) -> Self
    where
        F: Fn(BoxedBot, &ValidatedConfig) -> Result<Option<BoxedHandler>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            schema: ConfigSchema::new(),
            construct: Arc::new(construct),
        }
    }

    /// Adds options declared by this handler alone.
    pub fn with_schema(mut self, schema: ConfigSchema) -> Self {
        self.schema = schema;
        self
    }

    /// The name this handler is selected by on load.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &ConfigSchema {
        &self.schema
    }

    /// Runs the constructor.
    pub fn construct(
        &self,
        bot: BoxedBot,
        config: &ValidatedConfig,
    ) -> Result<Option<BoxedHandler>, BoxError> {
        (self.construct)(bot, config)
    }
}

impl fmt::Debug for HandlerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFactory")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Package
// =============================================================================

/// A named bundle of handler constructors.
#[derive(Debug, Clone)]
pub struct Package {
    name: Cow<'static, str>,
    schema: ConfigSchema,
    handlers: Vec<HandlerFactory>,
}

impl Package {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            schema: ConfigSchema::new(),
            handlers: Vec::new(),
        }
    }

    /// Sets the options shared by every handler of the package.
    pub fn schema(mut self, schema: ConfigSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Adds a handler constructor.
    pub fn handler<F>(self, name: impl Into<Cow<'static, str>>, construct: F) -> Self
    where
        F: Fn(BoxedBot, &ValidatedConfig) -> Result<Option<BoxedHandler>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.factory(HandlerFactory::new(name, construct))
    }

    /// Adds a handler constructor with its own options.
    pub fn handler_with_schema<F>(
        self,
        name: impl Into<Cow<'static, str>>,
        schema: ConfigSchema,
        construct: F,
    ) -> Self
    where
        F: Fn(BoxedBot, &ValidatedConfig) -> Result<Option<BoxedHandler>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.factory(HandlerFactory::new(name, construct).with_schema(schema))
    }

    /// Adds a [`HandlerInit`] type, named after its unqualified type name.
    pub fn handler_init<H: HandlerInit>(self) -> Self {
        let name = crate::handler::short_type_name(std::any::type_name::<H>());
        self.handler_with_schema(name, H::schema(), |bot, config| {
            Ok(Some(Box::new(H::init(bot, config)?) as BoxedHandler))
        })
    }

    /// Adds a prepared factory.
    pub fn factory(mut self, factory: HandlerFactory) -> Self {
        self.handlers.push(factory);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The options shared by every handler of the package.
    pub fn shared_schema(&self) -> &ConfigSchema {
        &self.schema
    }

    /// Handler names, in declaration order.
    pub fn handler_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(HandlerFactory::name)
    }

    pub fn factories(&self) -> &[HandlerFactory] {
        &self.handlers
    }
}

// =============================================================================
// Module sources
// =============================================================================

/// A read-only collection of discoverable packages.
pub trait ModuleSource: Send + Sync {
    /// Names of every package this source can produce.
    fn package_names(&self) -> Vec<String>;

    /// Produces the named package.
    fn package(&self, name: &str) -> Option<Package>;
}

/// A module source backed by an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct StaticModuleSource {
    packages: BTreeMap<String, Package>,
}

impl StaticModuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a package.
    pub fn with(mut self, package: Package) -> Self {
        self.insert(package);
        self
    }

    pub fn insert(&mut self, package: Package) {
        self.packages.insert(package.name().to_string(), package);
    }
}

impl ModuleSource for StaticModuleSource {
    fn package_names(&self) -> Vec<String> {
        self.packages.keys().cloned().collect()
    }

    fn package(&self, name: &str) -> Option<Package> {
        self.packages.get(name).cloned()
    }
}

/// A package registered at link time.
#[derive(Debug)]
pub struct PackageDescriptor {
    pub name: &'static str,
    pub create: fn() -> Package,
}

/// Every package registered with [`register_package!`](crate::register_package).
#[distributed_slice]
pub static PACKAGES: [&'static PackageDescriptor];

/// A module source over [`PACKAGES`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedModuleSource;

impl LinkedModuleSource {
    fn descriptors() -> impl Iterator<Item = &'static PackageDescriptor> {
        PACKAGES.iter().copied()
    }
}

impl ModuleSource for LinkedModuleSource {
    fn package_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Self::descriptors().map(|d| d.name.to_string()).collect();
        names.sort();
        names.dedup();
        names
    }

    fn package(&self, name: &str) -> Option<Package> {
        Self::descriptors()
            .find(|d| d.name == name)
            .map(|d| (d.create)())
    }
}

impl<S: ModuleSource + ?Sized> ModuleSource for Arc<S> {
    fn package_names(&self) -> Vec<String> {
        (**self).package_names()
    }

    fn package(&self, name: &str) -> Option<Package> {
        (**self).package(name)
    }
}

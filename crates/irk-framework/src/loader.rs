//! Turning packages into registry entries.
//!
//! For every handler a package exports, the loader:
//!
//! 1. layers the handler's own options over the package's shared options and
//!    applies operator overrides,
//! 2. validates the result,
//! 3. runs the constructor (errors and panics are caught),
//! 4. compiles the handler's rule,
//! 5. inserts the entry at the front of its event class's sequence.
//!
//! Any failure skips that handler only. Failures are logged and collected in
//! the returned [`LoadReport`]; they are never propagated.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use irk_core::error::panic_message;
use irk_core::{BoxedBot, LoadError, LoadResult, Pattern, validate};

use crate::package::{HandlerFactory, ModuleSource, Package};
use crate::registry::{Entry, Registry};

/// Operator-supplied option values, keyed by package name then option name.
pub type PackageOptions = BTreeMap<String, Map<String, Value>>;

/// Outcome of loading one package.
#[derive(Debug)]
pub struct LoadReport {
    /// The package name.
    pub package: String,
    /// Handlers that were registered, in load order.
    pub loaded: Vec<String>,
    /// Handlers that were skipped, with the reason.
    pub failed: Vec<LoadError>,
}

impl LoadReport {
    fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
            loaded: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Returns `true` if no handler was skipped.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Loads packages from a [`ModuleSource`] into a [`Registry`].
pub struct Loader {
    registry: Arc<Registry>,
    bot: BoxedBot,
    options: PackageOptions,
}

impl Loader {
    pub fn new(registry: Arc<Registry>, bot: BoxedBot) -> Self {
        Self {
            registry,
            bot,
            options: PackageOptions::new(),
        }
    }

    /// Sets operator overrides for declared option values.
    pub fn with_options(mut self, options: PackageOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Loads every package of `source` whose name is in `allow` and not in
    /// `deny`.
    pub fn load_all(
        &self,
        source: &dyn ModuleSource,
        allow: &[String],
        deny: &[String],
    ) -> Vec<LoadReport> {
        let mut reports = Vec::new();
        for name in source.package_names() {
            if !allow.contains(&name) {
                debug!(package = %name, "Package not in load list, skipping");
                continue;
            }
            if deny.contains(&name) {
                info!(package = %name, "Package is blocked, skipping");
                continue;
            }
            match self.load_by_name(source, &name, None) {
                Ok(report) => reports.push(report),
                Err(e) => warn!(package = %name, error = %e, "Cannot load package"),
            }
        }
        reports
    }

    /// Loads one package by name, optionally only the `selected` handlers.
    pub fn load_by_name(
        &self,
        source: &dyn ModuleSource,
        name: &str,
        selected: Option<&[String]>,
    ) -> LoadResult<LoadReport> {
        let package = source
            .package(name)
            .ok_or_else(|| LoadError::PackageNotFound(name.to_string()))?;
        Ok(self.load_one(&package, selected))
    }

    /// Loads the handlers of `package`, optionally only the `selected` ones.
    pub fn load_one(&self, package: &Package, selected: Option<&[String]>) -> LoadReport {
        let mut report = LoadReport::new(package.name());
        info!(
            package = package.name(),
            handlers = ?package.handler_names().collect::<Vec<_>>(),
            "Loading package"
        );

        if let Some(selected) = selected {
            for name in selected {
                if !package.handler_names().any(|h| h == name) {
                    let e = LoadError::HandlerNotFound {
                        package: package.name().to_string(),
                        handler: name.clone(),
                    };
                    warn!(package = package.name(), error = %e, "Cannot load handler");
                    report.failed.push(e);
                }
            }
        }

        let overrides = self.options.get(package.name());
        if let Some(overrides) = overrides {
            warn_undeclared(package, overrides);
        }

        let origin: Arc<str> = Arc::from(package.name());
        for factory in package.factories() {
            if selected.is_some_and(|names| !names.iter().any(|n| n == factory.name())) {
                continue;
            }
            match self.load_handler(package, factory, overrides, &origin) {
                Ok(()) => report.loaded.push(factory.name().to_string()),
                Err(e) => {
                    warn!(
                        package = package.name(),
                        handler = factory.name(),
                        error = %e,
                        "Cannot load handler"
                    );
                    report.failed.push(e);
                }
            }
        }

        info!(
            package = package.name(),
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Package loaded"
        );
        report
    }

    fn load_handler(
        &self,
        package: &Package,
        factory: &HandlerFactory,
        overrides: Option<&Map<String, Value>>,
        origin: &Arc<str>,
    ) -> LoadResult<()> {
        let mut schema = package.shared_schema().merged(factory.schema());
        for (option, value) in overrides.into_iter().flatten() {
            schema.set_value(option, value.clone());
        }
        let config = validate(&schema).map_err(|source| LoadError::Config {
            package: package.name().to_string(),
            handler: factory.name().to_string(),
            source,
        })?;

        let constructed = panic::catch_unwind(AssertUnwindSafe(|| {
            factory.construct(self.bot.clone(), &config)
        }));
        let handler = match constructed {
            Ok(Ok(Some(handler))) => handler,
            Ok(Ok(None)) => {
                return Err(LoadError::NothingConstructed {
                    package: package.name().to_string(),
                    handler: factory.name().to_string(),
                });
            }
            Ok(Err(e)) => {
                return Err(LoadError::Construction {
                    package: package.name().to_string(),
                    handler: factory.name().to_string(),
                    reason: e.to_string(),
                });
            }
            Err(payload) => {
                return Err(LoadError::Construction {
                    package: package.name().to_string(),
                    handler: factory.name().to_string(),
                    reason: format!("panicked: {}", panic_message(payload.as_ref())),
                });
            }
        };

        let pattern = Pattern::compile(handler.rule()).map_err(|source| LoadError::Pattern {
            package: package.name().to_string(),
            handler: factory.name().to_string(),
            rule: handler.rule().to_string(),
            source,
        })?;

        let class = handler.handler_type();
        info!(
            package = package.name(),
            handler = factory.name(),
            class = %class,
            "Handler loaded"
        );
        let entry = Entry::new(origin.clone(), pattern, handler).with_name(factory.name());
        self.registry.insert(class, entry);
        Ok(())
    }

    /// Unloads every handler of `source`, or only those loaded under
    /// `handler`, the same name [`load_one`](Self::load_one) selects by.
    pub async fn unload(&self, source: &str, handler: Option<&str>) -> usize {
        let removed = self.registry.remove(source, handler).await;
        info!(
            package = source,
            handler = handler.unwrap_or("*"),
            removed,
            "Unloaded"
        );
        removed
    }
}

/// Warns about overrides for options no handler of `package` declares.
fn warn_undeclared(package: &Package, overrides: &Map<String, Value>) {
    for option in overrides.keys() {
        let declared = package.shared_schema().get(option).is_some()
            || package
                .factories()
                .iter()
                .any(|f| f.schema().get(option).is_some());
        if !declared {
            warn!(
                package = package.name(),
                option = %option,
                "Ignoring override for undeclared option"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::BoxedHandler;
    use crate::package::StaticModuleSource;
    use crate::test_support::{Counting, RecordingBot};
    use irk_core::{ConfigSchema, EventClass, OptionType};
    use serde_json::json;

    fn counting(rule: &str, class: EventClass) -> BoxedHandler {
        Box::new(Counting::build(rule, rule, class, None))
    }

    fn loader() -> Loader {
        Loader::new(Arc::new(Registry::new()), RecordingBot::new())
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_invalid_schema_handler_is_skipped() {
        let package = Package::new("mixed")
            .handler("Good", |_, _| Ok(Some(counting("good", EventClass::Message))))
            .handler_with_schema(
                "Bad",
                ConfigSchema::new().option("limit", "ten", OptionType::Integer),
                |_, _| Ok(Some(counting("bad", EventClass::Message))),
            );

        let loader = loader();
        let report = loader.load_one(&package, None);
        assert_eq!(report.loaded, ["Good"]);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(&report.failed[0], LoadError::Config { handler, .. } if handler == "Bad"));
        assert_eq!(loader.registry().len(), 1);
    }

    #[test]
    fn test_constructor_failures_are_isolated() {
        let package = Package::new("flaky")
            .handler("Errors", |_, _| Err("nope".into()))
            .handler("Panics", |_, _| panic!("constructor blew up"))
            .handler("Declines", |_, _| Ok(None))
            .handler("BadRule", |_, _| Ok(Some(counting("(unclosed", EventClass::Message))))
            .handler("Fine", |_, _| Ok(Some(counting("fine", EventClass::Command))));

        let loader = loader();
        let report = loader.load_one(&package, None);
        assert_eq!(report.loaded, ["Fine"]);
        assert_eq!(report.failed.len(), 4);
        assert!(matches!(report.failed[0], LoadError::Construction { .. }));
        assert!(
            matches!(&report.failed[1], LoadError::Construction { reason, .. } if reason.contains("constructor blew up"))
        );
        assert!(matches!(report.failed[2], LoadError::NothingConstructed { .. }));
        assert!(matches!(report.failed[3], LoadError::Pattern { .. }));
        assert_eq!(loader.registry().len_of(EventClass::Command), 1);
        assert_eq!(loader.registry().len_of(EventClass::Message), 0);
    }

    #[test]
    fn test_constructor_receives_validated_config() {
        let package = Package::new("cfg")
            .schema(ConfigSchema::new().option("greeting", "hi", OptionType::String))
            .handler("Shared", |_, config| {
                assert_eq!(config.get_str("greeting"), Some("hello"));
                assert_eq!(config.get("depth"), None);
                Ok(Some(counting("x", EventClass::Message)))
            })
            .handler_with_schema(
                "Typed",
                ConfigSchema::new().option("depth", 1, OptionType::Integer),
                |_, config| {
                    assert_eq!(config.get_str("greeting"), Some("hello"));
                    assert_eq!(config.get_i64("depth"), Some(2));
                    Ok(Some(counting("y", EventClass::Message)))
                },
            );

        let mut options = PackageOptions::new();
        options.insert(
            "cfg".into(),
            json!({ "greeting": "hello", "depth": 2, "unknown": true })
                .as_object()
                .cloned()
                .unwrap(),
        );
        let loader = loader().with_options(options);

        // A failed assertion inside a constructor would surface as a
        // construction failure.
        let report = loader.load_one(&package, None);
        assert!(report.is_complete(), "{:?}", report.failed);
        assert_eq!(report.loaded, ["Shared", "Typed"]);
    }

    #[test]
    fn test_mistyped_override_fails_validation() {
        let package = Package::new("cfg")
            .schema(ConfigSchema::new().option("greeting", "hi", OptionType::String))
            .handler("H", |_, _| Ok(Some(counting("x", EventClass::Message))));
        let mut options = PackageOptions::new();
        options.insert(
            "cfg".into(),
            json!({ "greeting": 5 }).as_object().cloned().unwrap(),
        );

        let loader = loader().with_options(options);
        let report = loader.load_one(&package, None);
        assert!(report.loaded.is_empty());
        assert!(matches!(report.failed[0], LoadError::Config { .. }));
        assert!(loader.registry().is_empty());
    }

    #[test]
    fn test_selected_handlers() {
        let package = Package::new("pick")
            .handler("A", |_, _| Ok(Some(counting("a", EventClass::Message))))
            .handler("B", |_, _| Ok(Some(counting("b", EventClass::Message))));

        let loader = loader();
        let report = loader.load_one(&package, Some(&names(&["B", "Z"])));
        assert_eq!(report.loaded, ["B"]);
        assert!(matches!(
            &report.failed[..],
            [LoadError::HandlerNotFound { handler, .. }] if handler == "Z"
        ));
        assert_eq!(loader.registry().len(), 1);
    }

    #[test]
    fn test_load_all_honours_allow_and_deny() {
        let make = |name: &'static str| {
            Package::new(name).handler("H", |_, _| Ok(Some(counting("h", EventClass::Message))))
        };
        let source = StaticModuleSource::new()
            .with(make("one"))
            .with(make("two"))
            .with(make("three"));

        let loader = loader();
        let reports = loader.load_all(&source, &names(&["one", "two"]), &names(&["two"]));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].package, "one");
        assert_eq!(loader.registry().sources(), ["one"]);
    }

    #[test]
    fn test_later_package_is_matched_first() {
        let source = StaticModuleSource::new()
            .with(Package::new("old").handler("H", |_, _| Ok(Some(counting("hi", EventClass::Message)))))
            .with(Package::new("new").handler("H", |_, _| Ok(Some(counting("hi", EventClass::Message)))));

        let loader = loader();
        loader.load_by_name(&source, "old", None).unwrap();
        loader.load_by_name(&source, "new", None).unwrap();
        let order: Vec<_> = loader
            .registry()
            .entries_for(EventClass::Message)
            .iter()
            .map(|e| e.source().to_string())
            .collect();
        assert_eq!(order, ["new", "old"]);

        assert!(matches!(
            loader.load_by_name(&source, "missing", None),
            Err(LoadError::PackageNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unload_delegates_to_registry() {
        let package = Package::new("gone")
            .handler("A", |_, _| Ok(Some(counting("a", EventClass::Message))))
            .handler("B", |_, _| Ok(Some(counting("b", EventClass::Membership))));
        let loader = loader();
        loader.load_one(&package, None);
        assert_eq!(loader.unload("gone", None).await, 2);
        assert_eq!(loader.unload("gone", None).await, 0);
        assert!(loader.registry().is_empty());
    }

    #[tokio::test]
    async fn test_unload_by_loaded_name() {
        let package = Package::new("pkg")
            .handler("Good", |_, _| Ok(Some(counting("good", EventClass::Message))))
            .handler("Spare", |_, _| Ok(Some(counting("spare", EventClass::Command))));
        let loader = loader();

        let report = loader.load_one(&package, Some(&names(&["Good"])));
        assert_eq!(report.loaded, ["Good"]);
        loader.load_one(&package, Some(&names(&["Spare"])));

        assert_eq!(loader.unload("pkg", Some("Counting")).await, 0);
        assert_eq!(loader.unload("pkg", Some("Good")).await, 1);
        let left = loader.registry().entries_for(EventClass::Command);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].name(), "Spare");
        assert!(loader.registry().entries_for(EventClass::Message).is_empty());
    }
}

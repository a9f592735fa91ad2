//! Declarative package definition macros.
//!
//! # Example
//!
//! ```rust,ignore
//! use irk::prelude::*;
//!
//! register_package! {
//!     name: "greet",
//!     config: {
//!         greeting: ("hello", String),
//!         shout: (false, Bool),
//!     },
//!     handlers: [Hello, Bye],
//! }
//! ```
//!
//! Every listed handler type must implement
//! [`HandlerInit`](crate::HandlerInit). Option types name an
//! [`OptionType`](irk_core::OptionType) variant.

/// Builds a [`Package`](crate::package::Package) from a declarative
/// description.
///
/// | Field | Required | Type |
/// |-------|----------|------|
/// | `name` | ✓ | string literal |
/// | `config` | — | `{ option: (default, OptionType), … }` |
/// | `handlers` | — | `[HandlerInitType, …]` |
#[macro_export]
macro_rules! define_package {
    (
        name: $name:literal
        $(, config: { $($key:ident : ($value:expr, $ty:ident)),* $(,)? })?
        $(, handlers: [$($handler:ty),* $(,)?])?
        $(,)?
    ) => {{
        let package = $crate::package::Package::new($name).schema(
            $crate::__irk_core::ConfigSchema::new()
                $($(.option(
                    ::std::stringify!($key),
                    $value,
                    $crate::__irk_core::OptionType::$ty,
                ))*)?,
        );
        $($(let package = package.handler_init::<$handler>();)*)?
        package
    }};
}

/// Defines a package and registers it with
/// [`LinkedModuleSource`](crate::package::LinkedModuleSource).
///
/// Accepts the same fields as [`define_package!`].
#[macro_export]
macro_rules! register_package {
    (name: $name:literal $($rest:tt)*) => {
        const _: () = {
            fn __irk_create_package() -> $crate::package::Package {
                $crate::define_package!(name: $name $($rest)*)
            }

            #[$crate::__linkme::distributed_slice($crate::package::PACKAGES)]
            #[linkme(crate = $crate::__linkme)]
            static __IRK_PACKAGE: &$crate::package::PackageDescriptor =
                &$crate::package::PackageDescriptor {
                    name: $name,
                    create: __irk_create_package,
                };
        };
    };
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use irk_core::{BoxError, BoxedBot, ConfigSchema, OptionType, ValidatedConfig};

    use crate::context::Context;
    use crate::handler::{Handler, HandlerInit, Payload};
    use crate::package::{LinkedModuleSource, ModuleSource};

    struct Greeter {
        greeting: String,
    }

    #[async_trait]
    impl Handler for Greeter {
        fn rule(&self) -> &str {
            "hello"
        }

        async fn run(&self, ctx: &Context, _payload: Payload<'_>) -> Result<(), BoxError> {
            ctx.reply(&self.greeting).await?;
            Ok(())
        }
    }

    impl HandlerInit for Greeter {
        fn schema() -> ConfigSchema {
            ConfigSchema::new().option("loud", false, OptionType::Bool)
        }

        fn init(_bot: BoxedBot, config: &ValidatedConfig) -> Result<Self, BoxError> {
            let greeting = config.get_str("greeting").ok_or("greeting missing")?;
            Ok(Self {
                greeting: greeting.to_string(),
            })
        }
    }

    register_package! {
        name: "macro-test",
        config: {
            greeting: ("hi", String),
            retries: (3, Integer),
        },
        handlers: [Greeter],
    }

    #[test]
    fn test_define_package() {
        let package = define_package! {
            name: "inline",
            config: { ratio: (0.5, Float) },
            handlers: [Greeter],
        };
        assert_eq!(package.name(), "inline");
        assert_eq!(package.shared_schema().len(), 1);
        assert_eq!(package.handler_names().collect::<Vec<_>>(), ["Greeter"]);
        assert_eq!(package.factories()[0].schema().len(), 1);
    }

    #[test]
    fn test_define_package_name_only() {
        let package = define_package!(name: "empty");
        assert!(package.shared_schema().is_empty());
        assert_eq!(package.factories().len(), 0);
    }

    #[test]
    fn test_register_package_is_linked() {
        let source = LinkedModuleSource;
        assert!(source.package_names().iter().any(|n| n == "macro-test"));
        let package = source.package("macro-test").unwrap();
        assert_eq!(package.shared_schema().len(), 2);
        assert_eq!(package.handler_names().collect::<Vec<_>>(), ["Greeter"]);
    }
}

//! The runtime event loop.
//!
//! [`IrkRuntime`] owns the registry, the loader and the dispatcher, and
//! consumes a single queue fed by [`EventSink`]s and admin requests. Items
//! are handled strictly one at a time: an event's dispatch, including every
//! handler it runs, completes before the next item is taken.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use irk_runtime::{ChannelOutbound, IrkRuntime};
//! use irk_framework::LinkedModuleSource;
//!
//! let (outbound, lines) = ChannelOutbound::new();
//! let runtime = IrkRuntime::builder()
//!     .config_file("irk.toml")
//!     .build(LinkedModuleSource, outbound)?;
//!
//! let sink = runtime.sink();
//! // hand `sink` and `lines` to the transport ...
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use irk_core::{AdminRequest, BoxedBot};
use irk_framework::{Dispatcher, LoadReport, Loader, ModuleSource, Registry};

use crate::bot::RuntimeBot;
use crate::config::{ConfigLoader, IrkConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;
use crate::transport::{EventSink, Outbound, QueueItem};

/// Everything the loop needs to handle one queue item.
struct Core {
    config: IrkConfig,
    source: Arc<dyn ModuleSource>,
    loader: Loader,
    dispatcher: Dispatcher,
}

impl Core {
    fn load_configured(&self) -> Vec<LoadReport> {
        let reports = self.loader.load_all(
            &*self.source,
            &self.config.modules.load,
            &self.config.modules.block,
        );
        for report in reports.iter().filter(|r| !r.is_complete()) {
            warn!(
                package = %report.package,
                loaded = report.loaded.len(),
                failed = report.failed.len(),
                "Package loaded partially"
            );
        }
        reports
    }

    async fn handle(&self, item: QueueItem) {
        match item {
            QueueItem::Event(event) => {
                self.dispatcher.dispatch(event).await;
            }
            QueueItem::Admin(request) => self.admin(request).await,
        }
    }

    async fn admin(&self, request: AdminRequest) {
        info!(%request, "Executing admin request");
        match request {
            AdminRequest::LoadAll => {
                self.load_configured();
            }
            AdminRequest::Load { package, handlers } => {
                if let Err(e) =
                    self.loader
                        .load_by_name(&*self.source, &package, handlers.as_deref())
                {
                    warn!(package = %package, error = %e, "Admin load failed");
                }
            }
            AdminRequest::Unload {
                package,
                handler_type,
            } => {
                self.loader
                    .unload(&package, handler_type.as_deref())
                    .await;
            }
        }
    }
}

/// The irk runtime: loads packages and dispatches queued events.
///
/// The loop ends when every [`EventSink`] has been dropped or the shutdown
/// future resolves. On the way out every handler is unloaded.
pub struct IrkRuntime {
    core: Core,
    queue: mpsc::UnboundedReceiver<QueueItem>,
    sender: mpsc::UnboundedSender<QueueItem>,
}

impl IrkRuntime {
    /// Creates a runtime from an already loaded configuration.
    ///
    /// Logging is not initialized here; see [`RuntimeBuilder::build`].
    pub fn new(
        config: IrkConfig,
        source: impl ModuleSource + 'static,
        outbound: impl Outbound,
    ) -> Self {
        let (sender, queue) = mpsc::unbounded_channel();
        let bot: BoxedBot = Arc::new(RuntimeBot::new(
            config.server.nick.clone(),
            Arc::new(outbound),
            sender.downgrade(),
        ));

        let registry = Arc::new(Registry::new());
        let loader = Loader::new(Arc::clone(&registry), Arc::clone(&bot))
            .with_options(config.modules.options.clone());
        let dispatcher = Dispatcher::new(registry, bot);

        Self {
            core: Core {
                config,
                source: Arc::new(source),
                loader,
                dispatcher,
            },
            queue,
            sender,
        }
    }

    /// Creates a runtime builder that loads its configuration from files and
    /// the environment.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Returns a new inbound handle for the transport.
    pub fn sink(&self) -> EventSink {
        EventSink::new(self.sender.clone())
    }

    pub fn config(&self) -> &IrkConfig {
        &self.core.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.core.loader.registry()
    }

    /// Loads every package allowed by `modules.load` and not in
    /// `modules.block`.
    pub fn load_configured(&self) -> Vec<LoadReport> {
        self.core.load_configured()
    }

    /// Runs until every sink is dropped, Ctrl+C, or SIGTERM.
    pub async fn run(self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until every sink is dropped or `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let Self {
            core,
            mut queue,
            sender,
        } = self;
        // Only sinks handed out keep the queue open from here on.
        drop(sender);

        let reports = core.load_configured();
        info!(
            nick = %core.config.server.nick,
            packages = reports.len(),
            handlers = core.loader.registry().len(),
            "irk runtime is now running"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                item = queue.recv() => match item {
                    Some(item) => core.handle(item).await,
                    None => {
                        info!("All event sinks dropped, shutting down");
                        break;
                    }
                },
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        let removed = core.loader.registry().clear().await;
        info!(removed, "Runtime stopped");
        Ok(())
    }
}

impl std::fmt::Debug for IrkRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrkRuntime")
            .field("nick", &self.core.config.server.nick)
            .field("handlers", &self.core.loader.registry().len())
            .finish_non_exhaustive()
    }
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
///
/// If no signal handler can be installed the future never resolves and the
/// runtime stops only when its sinks are dropped.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler");
                return wait_for_ctrl_c().await;
            }
        };

        tokio::select! {
            () = wait_for_ctrl_c() => {}
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating an [`IrkRuntime`] from layered configuration.
///
/// ```rust,ignore
/// let runtime = IrkRuntime::builder()
///     .config_file("config/irk.toml")
///     .profile("production")
///     .build(LinkedModuleSource, outbound)?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: IrkConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads and validates the configuration, initializes logging from it
    /// and creates the runtime.
    pub fn build(
        self,
        source: impl ModuleSource + 'static,
        outbound: impl Outbound,
    ) -> RuntimeResult<IrkRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            "Runtime initialized from configuration"
        );
        Ok(IrkRuntime::new(config, source, outbound))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use irk_core::{BoxError, EventClass};
    use irk_framework::{Context, Handler, Package, Payload, StaticModuleSource};

    use crate::transport::ChannelOutbound;

    struct Echo;

    #[async_trait]
    impl Handler for Echo {
        fn rule(&self) -> &str {
            r"!echo (.+)"
        }

        async fn run(&self, ctx: &Context, _payload: Payload<'_>) -> Result<(), BoxError> {
            let text = ctx.matched().group(1).unwrap_or_default().to_string();
            ctx.reply(&text).await?;
            Ok(())
        }
    }

    /// Asks the runtime to unload its own package, then confirms.
    struct Quit;

    #[async_trait]
    impl Handler for Quit {
        fn rule(&self) -> &str {
            "!quit"
        }

        async fn run(&self, ctx: &Context, _payload: Payload<'_>) -> Result<(), BoxError> {
            ctx.request_admin(AdminRequest::Unload {
                package: ctx.package().to_string(),
                handler_type: None,
            })?;
            ctx.reply("bye").await?;
            Ok(())
        }
    }

    struct Tracked(Arc<AtomicUsize>);

    #[async_trait]
    impl Handler for Tracked {
        fn rule(&self) -> &str {
            "KICK"
        }

        fn handler_type(&self) -> EventClass {
            EventClass::Command
        }

        async fn run(&self, _ctx: &Context, _payload: Payload<'_>) -> Result<(), BoxError> {
            Ok(())
        }

        async fn unload(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config(load: &[&str], block: &[&str]) -> IrkConfig {
        let mut config = IrkConfig::default();
        config.modules.load = load.iter().map(|s| s.to_string()).collect();
        config.modules.block = block.iter().map(|s| s.to_string()).collect();
        config
    }

    fn source() -> StaticModuleSource {
        StaticModuleSource::new()
            .with(Package::new("echo").handler("Echo", |_, _| Ok(Some(Box::new(Echo)))))
            .with(Package::new("quit").handler("Quit", |_, _| Ok(Some(Box::new(Quit)))))
    }

    #[tokio::test]
    async fn test_event_gets_reply() {
        let (outbound, mut lines) = ChannelOutbound::new();
        let runtime = IrkRuntime::new(config(&["echo"], &[]), source(), outbound);

        let sink = runtime.sink();
        sink.on_message("alice!a@host", "#irk", "!echo hi there").unwrap();
        drop(sink);

        runtime.run_until(std::future::pending()).await.unwrap();
        assert_eq!(lines.recv().await.as_deref(), Some("PRIVMSG #irk :hi there"));
    }

    #[test]
    fn test_block_list_wins() {
        let (outbound, _lines) = ChannelOutbound::new();
        let runtime = IrkRuntime::new(config(&["echo", "quit"], &["quit"]), source(), outbound);

        runtime.load_configured();
        assert_eq!(runtime.registry().sources(), ["echo"]);
    }

    #[tokio::test]
    async fn test_admin_request_runs_after_current_event() {
        let (outbound, mut lines) = ChannelOutbound::new();
        let runtime = IrkRuntime::new(config(&["echo", "quit"], &[]), source(), outbound);
        let sink = runtime.sink();
        let task = tokio::spawn(runtime.run_until(std::future::pending()));

        sink.on_message("alice!a@host", "#irk", "!quit").unwrap();
        assert_eq!(lines.recv().await.as_deref(), Some("PRIVMSG #irk :bye"));

        // The unload was queued before this message.
        sink.on_message("alice!a@host", "#irk", "!quit").unwrap();
        sink.on_message("alice!a@host", "#irk", "!echo still here").unwrap();
        drop(sink);

        task.await.unwrap().unwrap();
        assert_eq!(lines.recv().await.as_deref(), Some("PRIVMSG #irk :still here"));
        assert!(lines.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_admin_load_from_sink() {
        let (outbound, mut lines) = ChannelOutbound::new();
        let runtime = IrkRuntime::new(config(&[], &[]), source(), outbound);
        let sink = runtime.sink();

        sink.admin(AdminRequest::Load {
            package: "echo".into(),
            handlers: None,
        })
        .unwrap();
        sink.admin(AdminRequest::Load {
            package: "missing".into(),
            handlers: None,
        })
        .unwrap();
        sink.on_message("bob!b@host", "irk", "!echo private").unwrap();
        drop(sink);

        runtime.run_until(std::future::pending()).await.unwrap();
        assert_eq!(lines.recv().await.as_deref(), Some("PRIVMSG bob :private"));
    }

    #[tokio::test]
    async fn test_handlers_unloaded_on_shutdown() {
        let unloads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&unloads);
        let source = StaticModuleSource::new().with(Package::new("tracked").handler(
            "Tracked",
            move |_, _| Ok(Some(Box::new(Tracked(Arc::clone(&counter))))),
        ));

        let (outbound, _lines) = ChannelOutbound::new();
        let runtime = IrkRuntime::new(config(&["tracked"], &[]), source, outbound);
        let _sink = runtime.sink();

        runtime.run_until(async {}).await.unwrap();
        assert_eq!(unloads.load(Ordering::SeqCst), 1);
    }
}

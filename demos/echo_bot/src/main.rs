//! Echo Bot Demo
//!
//! A small irk bot driven by a line-based stdin/stdout transport, so it can be
//! tried without a server. Each stdin line is parsed as a raw IRC line and
//! every line the bot sends is printed to stdout.
//!
//! # Packages
//!
//! - `echo`: `!echo <text>` repeats the text, `PING` is answered with `PONG`
//! - `greet`: answers `hello` with the configured greeting
//! - `rejoin`: rejoins a channel the bot was kicked from
//! - `admin`: `!load <package>` / `!unload <package> [handler]` for the owner
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot
//! :alice!a@host PRIVMSG #irk :!echo hi
//! :alice!a@host PRIVMSG #irk :hello
//! :op!o@host KICK #irk irk :out
//! PING :server
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use irk::prelude::*;
use irk::runtime::config::{ConfigLoader, validate_config};
use irk::runtime::logging;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

// ============================================================================
// Handlers
// ============================================================================

/// `!echo <text>`: repeats the text where it was said.
struct Echo;

#[async_trait]
impl Handler for Echo {
    fn rule(&self) -> &str {
        r"!echo\s+(?P<text>.+)"
    }

    async fn run(&self, ctx: &Context, _payload: Payload<'_>) -> Result<(), BoxError> {
        let text = ctx.matched().name("text").unwrap_or_default();
        ctx.reply(text).await?;
        Ok(())
    }
}

impl HandlerInit for Echo {
    fn init(_bot: BoxedBot, _config: &ValidatedConfig) -> Result<Self, BoxError> {
        Ok(Echo)
    }
}

/// Keeps the connection alive.
struct Ping;

#[async_trait]
impl Handler for Ping {
    fn rule(&self) -> &str {
        "PING"
    }

    fn handler_type(&self) -> EventClass {
        EventClass::Command
    }

    async fn run(&self, ctx: &Context, payload: Payload<'_>) -> Result<(), BoxError> {
        if let Payload::Command { params, .. } = payload {
            ctx.send_raw(&format!("PONG {params}")).await?;
        }
        Ok(())
    }
}

impl HandlerInit for Ping {
    fn init(_bot: BoxedBot, _config: &ValidatedConfig) -> Result<Self, BoxError> {
        Ok(Ping)
    }
}

/// Answers `hello` with the configured greeting.
struct Greeter {
    greeting: String,
}

#[async_trait]
impl Handler for Greeter {
    fn rule(&self) -> &str {
        r"(?i)(hello|hi)\b"
    }

    async fn run(&self, ctx: &Context, _payload: Payload<'_>) -> Result<(), BoxError> {
        let nick = ctx.sender_nick().unwrap_or("there");
        ctx.reply(&format!("{}, {nick}!", self.greeting)).await?;
        Ok(())
    }
}

impl HandlerInit for Greeter {
    fn init(_bot: BoxedBot, config: &ValidatedConfig) -> Result<Self, BoxError> {
        Ok(Greeter {
            greeting: config.get_str("greeting").unwrap_or("Hello").to_string(),
        })
    }
}

/// Rejoins after being kicked.
struct Rejoin;

#[async_trait]
impl Handler for Rejoin {
    fn rule(&self) -> &str {
        r"(?P<channel>\S+) (?P<victim>\S+)"
    }

    fn handler_type(&self) -> EventClass {
        EventClass::Membership
    }

    async fn run(&self, ctx: &Context, _payload: Payload<'_>) -> Result<(), BoxError> {
        let matched = ctx.matched();
        if let (Some(channel), Some(victim)) = (matched.name("channel"), matched.name("victim"))
            && victim == ctx.nick()
        {
            info!(channel, "Kicked, rejoining");
            ctx.join(channel).await?;
        }
        Ok(())
    }
}

impl HandlerInit for Rejoin {
    fn init(_bot: BoxedBot, _config: &ValidatedConfig) -> Result<Self, BoxError> {
        Ok(Rejoin)
    }
}

/// `!load` / `!unload` for the configured owner.
struct Admin {
    owner: String,
}

#[async_trait]
impl Handler for Admin {
    fn rule(&self) -> &str {
        r"!(?P<action>load|unload)\s+(?P<package>\S+)(?:\s+(?P<handler>\S+))?"
    }

    async fn run(&self, ctx: &Context, _payload: Payload<'_>) -> Result<(), BoxError> {
        if ctx.sender_nick() != Some(self.owner.as_str()) {
            ctx.reply("not allowed").await?;
            return Ok(());
        }

        let matched = ctx.matched();
        let package = matched.name("package").unwrap_or_default().to_string();
        let handler = matched.name("handler").map(str::to_string);
        let request = match matched.name("action") {
            Some("load") => AdminRequest::Load {
                package,
                handlers: handler.map(|h| vec![h]),
            },
            _ => AdminRequest::Unload {
                package,
                handler_type: handler,
            },
        };

        ctx.request_admin(request.clone())?;
        ctx.reply(&format!("queued: {request}")).await?;
        Ok(())
    }
}

impl HandlerInit for Admin {
    fn schema() -> ConfigSchema {
        ConfigSchema::new().option("owner", "admin", OptionType::String)
    }

    fn init(_bot: BoxedBot, config: &ValidatedConfig) -> Result<Self, BoxError> {
        let owner = config
            .get_str("owner")
            .ok_or("owner must be a string")?
            .to_string();
        Ok(Admin { owner })
    }
}

// ============================================================================
// Packages
// ============================================================================

register_package! {
    name: "echo",
    handlers: [Echo, Ping],
}

register_package! {
    name: "greet",
    config: {
        greeting: ("Hello", String),
    },
    handlers: [Greeter],
}

register_package! {
    name: "rejoin",
    handlers: [Rejoin],
}

register_package! {
    name: "admin",
    handlers: [Admin],
}

// ============================================================================
// Transport
// ============================================================================

/// Parses one raw IRC line and feeds it to the sink.
///
/// `PRIVMSG` becomes a message, `KICK` a membership change and anything else
/// a command.
fn feed(sink: &EventSink, line: &str) -> irk::runtime::RuntimeResult<()> {
    let (sender, rest) = match line.strip_prefix(':') {
        Some(prefixed) => prefixed.split_once(' ').unwrap_or((prefixed, "")),
        None => ("", line),
    };
    let (cmd, params) = rest.split_once(' ').unwrap_or((rest, ""));

    match cmd.to_ascii_uppercase().as_str() {
        "PRIVMSG" => {
            let (target, text) = params.split_once(' ').unwrap_or((params, ""));
            let text = text.strip_prefix(':').unwrap_or(text);
            sink.on_message(sender, target, text)
        }
        "KICK" => sink.on_membership_change(params),
        _ => sink.on_command(sender, cmd, params),
    }
}

// ============================================================================
// Main
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "echo-bot", about = "A stdin/stdout irk demo bot")]
struct Args {
    /// Configuration file; defaults to searching irk.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile.
    #[arg(short, long)]
    profile: Option<String>,

    /// Overrides the configured nick.
    #[arg(long)]
    nick: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new()
        .with_current_dir()
        .search_path(env!("CARGO_MANIFEST_DIR"));
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    if let Some(profile) = &args.profile {
        loader = loader.profile(profile);
    }
    let mut config = loader.load()?;
    if let Some(nick) = args.nick {
        config.server.nick = nick;
    }
    validate_config(&config)?;
    logging::LoggingBuilder::from_config(&config.logging)
        .output(irk::runtime::config::LogOutput::Stderr)
        .init();

    let (outbound, mut lines) = ChannelOutbound::new();
    let runtime = IrkRuntime::new(config, LinkedModuleSource, outbound);
    let sink = runtime.sink();

    let writer = tokio::spawn(async move {
        while let Some(line) = lines.recv().await {
            println!("{line}");
        }
    });

    tokio::spawn(async move {
        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match stdin.next_line().await {
                Ok(Some(line)) => {
                    if let Err(e) = feed(&sink, line.trim_end()) {
                        warn!(error = %e, "Runtime stopped accepting events");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
    });

    info!("echo-bot running, reading IRC lines from stdin");
    runtime.run().await?;
    writer.await?;
    Ok(())
}

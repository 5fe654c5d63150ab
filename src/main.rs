// src/main.rs
//! Launcher bridge CLI
//!
//! Drives the same dispatcher the Flutter activity talks to, against a
//! simulated device loaded from a JSON snapshot. Useful for checking channel
//! replies and package change notifications without a phone attached.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use mars_launcher_bridge::api::{channels, methods, LauncherBridge};
use mars_launcher_bridge::codec::{self, MethodCall, MethodResponse};
use mars_launcher_bridge::config::{BridgeConfig, DEFAULT_OWN_PACKAGE};
use mars_launcher_bridge::core::app_types::{InstalledApp, FLAG_SYSTEM};
use mars_launcher_bridge::core::intent::Intent;
use mars_launcher_bridge::core::platform::MethodInvoker;
use mars_launcher_bridge::listeners::{EventLogger, LogFormat};
use mars_launcher_bridge::platform::{SimulatedPackage, SimulatedPlatform};

/// Command line interface for the launcher bridge
#[derive(Debug, Parser)]
#[command(
    name = "launcher-bridge",
    about = "Exercise the Mars launcher's native method channels against a simulated device",
    long_about = "Runs the native dispatcher behind the launcher's method channels (installed apps, launch, settings, package change notifications) against a package snapshot, printing the exact replies the UI would receive."
)]
struct Args {
    /// Output format for results and events
    #[arg(long, default_value = "human", value_enum)]
    format: OutputFormat,

    /// Verbosity level for logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// JSON snapshot of installed packages (built-in demo device when absent)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Package identifier of the launcher itself
    #[arg(long, default_value = DEFAULT_OWN_PACKAGE)]
    own_package: String,

    /// Channel namespace (defaults to the own package identifier)
    #[arg(long)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List launchable installed apps
    List,
    /// Launch an app by package identifier
    Launch { package: String },
    /// Open the app details settings screen
    Settings { package: String },
    /// Open the default launcher chooser
    LauncherSettings,
    /// Send a raw method call through the JSON codec
    Call {
        /// Channel name, short (`launch_app`) or fully qualified
        channel: String,
        method: String,
        /// JSON arguments, e.g. '{"packageName":"com.android.settings"}'
        args: Option<String>,
    },
    /// Register for package changes and simulate installs from stdin
    Watch,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for programmatic processing
    Json,
}

impl From<OutputFormat> for LogFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => LogFormat::Human,
            OutputFormat::Json => LogFormat::Json,
        }
    }
}

/// Prints what the UI side would receive via `invokeMethod`
struct ConsoleInvoker {
    format: OutputFormat,
}

impl MethodInvoker for ConsoleInvoker {
    fn invoke_method(&self, channel: &str, method: &str, arguments: Value) {
        match self.format {
            OutputFormat::Human => println!("➡️  {}.{}({})", channel, method, arguments),
            OutputFormat::Json => {
                let call = MethodCall::new(method, arguments);
                println!("{}", String::from_utf8_lossy(&codec::encode_method_call(&call)));
            }
        }
    }
}

/// The CLI application state
struct BridgeApp {
    platform: Arc<SimulatedPlatform>,
    bridge: LauncherBridge,
    config: Args,
}

impl BridgeApp {
    fn new(config: Args) -> Result<Self> {
        Self::setup_logging(&config)?;
        info!("🚀 Starting launcher bridge v{}", env!("CARGO_PKG_VERSION"));
        debug!("Configuration: {:#?}", config);

        let platform = match &config.snapshot {
            Some(path) => SimulatedPlatform::from_snapshot_file(path)
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?,
            None => Self::demo_device(&config.own_package),
        };
        let platform = Arc::new(platform);

        let mut bridge_config = BridgeConfig::new(config.own_package.clone());
        if let Some(ns) = &config.namespace {
            bridge_config = bridge_config.with_namespace(ns.clone());
        }
        let invoker = Arc::new(ConsoleInvoker {
            format: config.format,
        });
        let bridge = LauncherBridge::new(bridge_config, platform.clone(), invoker);

        Ok(Self {
            platform,
            bridge,
            config,
        })
    }

    fn demo_device(own_package: &str) -> SimulatedPlatform {
        SimulatedPlatform::new(vec![
            SimulatedPackage::launchable(own_package, "Mars Launcher", 0),
            SimulatedPackage::launchable("com.android.settings", "Settings", FLAG_SYSTEM),
            SimulatedPackage::launchable("com.android.chrome", "Chrome", FLAG_SYSTEM),
            SimulatedPackage::headless("com.android.providers.media", "Media Storage", FLAG_SYSTEM),
            SimulatedPackage::launchable("org.fossify.notes", "Notes", 0),
        ])
    }

    async fn run(self) -> Result<()> {
        match &self.config.command {
            Command::List => {
                let apps = self
                    .bridge
                    .get_installed_apps()
                    .context("Failed to enumerate installed apps")?;
                self.print_apps(&apps)?;
            }
            Command::Launch { package } => {
                let ok = self.bridge.launch_app(package);
                self.print_result(methods::LAUNCH_APP, Value::Bool(ok));
            }
            Command::Settings { package } => {
                let ok = self.bridge.open_app_settings(package);
                self.print_result(methods::OPEN_APP_SETTINGS, Value::Bool(ok));
            }
            Command::LauncherSettings => {
                self.bridge.open_launcher_settings();
                self.print_result(methods::OPEN_LAUNCHER_SETTINGS, Value::Null);
            }
            Command::Call {
                channel,
                method,
                args,
            } => self.raw_call(channel, method, args.as_deref())?,
            Command::Watch => self.watch().await?,
        }

        for intent in self.platform.started_activities() {
            debug!("started: {}", intent);
        }
        Ok(())
    }

    fn raw_call(&self, channel: &str, method: &str, args: Option<&str>) -> Result<()> {
        let arguments = match args {
            Some(raw) => serde_json::from_str(raw).context("Arguments are not valid JSON")?,
            None => Value::Null,
        };
        let channel = if channel.contains('/') {
            channel.to_string()
        } else {
            self.bridge.config().channel_name(channel)
        };

        let message = codec::encode_method_call(&MethodCall::new(method, arguments));
        let reply = self.bridge.handle_message(&channel, &message);
        let response = codec::decode_envelope(reply.as_deref())?;

        match (self.config.format, &response) {
            (OutputFormat::Json, _) => match &reply {
                Some(bytes) => println!("{}", String::from_utf8_lossy(bytes)),
                None => println!("null"),
            },
            (OutputFormat::Human, MethodResponse::Success(value)) => {
                println!("✅ {}", serde_json::to_string_pretty(value)?)
            }
            (OutputFormat::Human, MethodResponse::Error { code, message, .. }) => {
                println!("❌ {}: {}", code, message.as_deref().unwrap_or(""))
            }
            (OutputFormat::Human, MethodResponse::NotImplemented) => {
                println!("🚫 not implemented: {} on {}", method, channel)
            }
        }
        Ok(())
    }

    /// Register the listener, then apply stdin commands as device changes
    ///
    /// Lines: `install <package> [label]`, `uninstall <package>`,
    /// `broadcast <action> [data-uri]`, `list`.
    async fn watch(&self) -> Result<()> {
        self.bridge
            .notifier()
            .receiver()
            .add_listener(EventLogger::new(self.config.format.into()));
        self.bridge
            .register_app_change_receiver()
            .context("Failed to register package change receiver")?;

        info!(
            "👀 Watching {}. Type commands, Ctrl+D to stop.",
            self.bridge.config().channel_name(channels::NOTIFY_APP_CHANGES)
        );

        let mut lines = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        loop {
            tokio::select! {
                line = lines.recv() => {
                    match line {
                        Some(line) => self.apply_watch_command(line?.trim())?,
                        None => break,
                    }
                }
                _ = &mut ctrl_c => {
                    info!("🛑 Interrupted");
                    break;
                }
            }
        }

        info!(
            "📊 Forwarded {} package change notifications",
            self.bridge.notifier().receiver().forwarded_count()
        );
        Ok(())
    }

    fn apply_watch_command(&self, line: &str) -> Result<()> {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (None, _) => {}
            (Some("install"), Some(package)) => {
                let label = parts.collect::<Vec<_>>().join(" ");
                let label = if label.is_empty() { package.to_string() } else { label };
                self.platform
                    .install(SimulatedPackage::launchable(package, &label, 0));
            }
            (Some("uninstall"), Some(package)) => {
                self.platform.uninstall(package);
            }
            (Some("broadcast"), Some(action)) => {
                let mut intent = Intent::new(action);
                if let Some(data) = parts.next() {
                    intent = intent.with_data(data);
                }
                let delivered = self.platform.broadcast(&intent);
                debug!("delivered to {} receivers", delivered);
            }
            (Some("list"), _) => {
                let apps = self.bridge.get_installed_apps()?;
                self.print_apps(&apps)?;
            }
            _ => warn!("⚠️  Unrecognized command: {}", line),
        }
        Ok(())
    }

    fn print_apps(&self, apps: &[InstalledApp]) -> Result<()> {
        match self.config.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(apps)?),
            OutputFormat::Human => {
                println!("📱 {} launchable apps", apps.len());
                for app in apps {
                    println!("   {}", app);
                }
            }
        }
        Ok(())
    }

    fn print_result(&self, method: &str, value: Value) {
        match self.config.format {
            OutputFormat::Json => println!("{}", String::from_utf8_lossy(&codec::encode_success(&value))),
            OutputFormat::Human => println!("{} -> {}", method, value),
        }
    }

    /// Set up logging based on verbosity level
    fn setup_logging(config: &Args) -> Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let level = match config.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(config.verbose > 1)
            .with_thread_ids(config.verbose > 2)
            .init();

        Ok(())
    }
}

/// Read lines on a plain thread and hand them over a channel.
///
/// The thread is never joined: a read blocked on a terminal cannot be
/// cancelled, so returning from `watch` must not wait for it. The channel
/// closes at end of input or after the first read error.
fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<std::io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    thread::spawn(move || {
        for line in reader.lines() {
            let failed = line.is_err();
            if tx.blocking_send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let app = BridgeApp::new(args)?;
    app.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[tokio::test]
    async fn line_reader_delivers_lines_then_closes() {
        let mut rx = spawn_line_reader(Cursor::new("install a.b Alpha\nlist\n"));
        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line.unwrap());
        }
        assert_eq!(lines, vec!["install a.b Alpha", "list"]);
    }

    #[tokio::test]
    async fn dropping_the_receiver_does_not_block_the_caller() {
        let rx = spawn_line_reader(Cursor::new("one\ntwo\nthree\n"));
        drop(rx);
        let mut rx = spawn_line_reader(Cursor::new(""));
        assert!(rx.recv().await.is_none());
    }
}

mod health;
mod settings_commands;

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    clap::{Parser, Subcommand},
    relaybot_config::{RelayConfig, RelaybotConfig},
    relaybot_relay::{RelayService, SettingsCache, Timing, store_sqlite::SqliteSettingsStore},
    relaybot_telegram::{BotState, TelegramBotConfig, TelegramOutbound},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "relaybot", version, about = "relaybot - debounced Telegram media relay")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/relaybot/).
    #[arg(long, global = true, env = "RELAYBOT_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite settings database (overrides config value).
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Liveness endpoint port (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default when no subcommand is provided).
    Run,
    /// Inspect or change relay settings without starting the bot.
    Settings {
        #[command(subcommand)]
        action: settings_commands::SettingsAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let mut config = relaybot_config::load(cli.config.as_deref())?;
    if let Some(path) = cli.database {
        config.database.path = Some(path);
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match cli.command {
        None | Some(Commands::Run) => run(config).await,
        Some(Commands::Settings { action }) => {
            settings_commands::handle_settings(action, &config).await
        },
    }
}

async fn run(config: RelaybotConfig) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "relaybot starting");

    let telegram = TelegramBotConfig::from_value(&config.telegram)?;
    if !telegram.has_token() {
        anyhow::bail!("no bot token configured: set BOT_TOKEN or [telegram] token");
    }
    if telegram.owners.is_empty() {
        warn!("no owners configured; authorized users can only be managed from the CLI");
    }

    let settings = Arc::new(SettingsCache::new(Arc::new(open_store(&config).await?)));
    seed_settings(&settings, &config.relay).await?;

    let timing = Timing {
        quiet_period: Duration::from_millis(config.relay.quiet_period_ms),
        pacing: Duration::from_millis(config.relay.pacing_ms),
    };
    let bot = relaybot_telegram::build_bot(&telegram)?;
    let outbound = Arc::new(TelegramOutbound::new(bot.clone(), telegram.caption_format));
    let service = RelayService::new(settings, outbound.clone(), outbound.clone(), timing);
    let state = Arc::new(BotState {
        bot,
        config: telegram,
        service: Arc::clone(&service),
        outbound,
    });

    let cancel = CancellationToken::new();

    let server = if config.server.enabled {
        let listener = health::bind(&config.server).await?;
        Some(tokio::spawn(health::serve(listener, cancel.clone())))
    } else {
        None
    };

    let polling = relaybot_telegram::start_polling(state, cancel.clone()).await?;
    info!(
        quiet_period_ms = config.relay.quiet_period_ms,
        pacing_ms = config.relay.pacing_ms,
        "relaybot running"
    );

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("shutdown requested");
        },
        _ = cancel.cancelled() => {
            warn!("telegram polling stopped, shutting down");
        },
    }

    cancel.cancel();
    if let Err(e) = polling.await {
        warn!(error = %e, "polling task ended abnormally");
    }
    service.shutdown().await;
    if let Some(server) = server {
        match server.await {
            Ok(Err(e)) => warn!(error = %e, "liveness server failed"),
            Err(e) => warn!(error = %e, "liveness server task ended abnormally"),
            Ok(Ok(())) => {},
        }
    }

    info!("relaybot stopped");
    Ok(())
}

/// Open the SQLite settings store, creating the file and running migrations.
pub(crate) async fn open_store(config: &RelaybotConfig) -> anyhow::Result<SqliteSettingsStore> {
    let path = relaybot_config::database_path(config);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    debug!(path = %path.display(), "opening settings database");
    let url = format!("sqlite:{}?mode=rwc", path.display());
    Ok(SqliteSettingsStore::connect(&url).await?)
}

/// Write the config file's channel and suffix into the store when it has
/// none yet. Stored values always win.
async fn seed_settings(settings: &SettingsCache, relay: &RelayConfig) -> anyhow::Result<()> {
    let current = settings.get().await?;

    if current.channel_id.is_none()
        && let Some(channel_id) = relay.channel_id.as_deref()
    {
        settings.set_channel_id(channel_id).await?;
        info!(channel_id, "destination channel seeded from config");
    }
    if current.caption_suffix.is_none()
        && let Some(suffix) = relay.caption_suffix.as_deref()
    {
        settings.set_caption_suffix(Some(suffix)).await?;
        info!("caption suffix seeded from config");
    }
    Ok(())
}

use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use admin_bot::application::errors::{BotError, LoadError};
use admin_bot::application::permissions::PermissionGuard;
use admin_bot::application::routing::{Capabilities, CommandRouter, SharedTable};
use admin_bot::application::scheduler::Scheduler;
use admin_bot::domain::traits::{AdminPersistence, Transport};
use admin_bot::infrastructure::adapters::{ConsoleAdapter, TelegramAdapter};
use admin_bot::infrastructure::config::{Config, ConfigFile};
use admin_bot::infrastructure::database::Database;
use admin_bot::infrastructure::plugins::ManifestDirectory;
use admin_bot::plugins::builtin::builtin_source;
use admin_bot::plugins::{CompositeSource, PluginLoader};

#[derive(Parser)]
#[command(name = "admin-bot")]
#[command(about = "Chat admin bot with hot-reloadable command modules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Failed to start runtime: {}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(run_bot(cli.config, cli.token)) {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("admin-bot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

async fn run_bot(config_path: String, token_override: Option<String>) -> Result<(), BotError> {
    // Load config
    let mut config = if Path::new(&config_path).exists() {
        Config::load(&config_path)?
    } else {
        tracing::warn!("{} not found, using defaults and environment", config_path);
        Config::load_env()?
    };
    config.bot.token = token_override
        .or(config.bot.token.take())
        .or_else(|| std::env::var("BOT_TOKEN").ok());

    tracing::info!("Starting admin-bot: {}", config.bot.name);

    std::fs::create_dir_all(&config.modules.directory).map_err(LoadError::Io)?;

    let db = match &config.database {
        Some(db) => {
            let db = Arc::new(Database::open(&db.path)?);
            tracing::info!("Database initialized");
            Some(db)
        }
        None => None,
    };

    let settings = Arc::new(ConfigFile::new(&config_path));
    let guard = Arc::new(PermissionGuard::new(
        config.admins.iter().copied(),
        Arc::clone(&settings) as Arc<dyn AdminPersistence>,
    ));
    if config.admins.is_empty() {
        tracing::warn!("No admins configured, every protected command will be denied");
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let scheduler = Arc::new(Scheduler::new(Arc::clone(&guard), tx.clone()));

    let table = Arc::new(SharedTable::new());
    let source = CompositeSource::new()
        .with_source(Arc::new(builtin_source()))
        .with_source(Arc::new(ManifestDirectory::new(&config.modules.directory)));
    let loader = Arc::new(PluginLoader::new(Arc::new(source), Arc::clone(&table)));

    let loaded = loader.load_all()?;
    tracing::info!("Loaded {} modules", loaded);

    if config.modules.watch {
        match loader.start_watching() {
            Ok(true) => {}
            Ok(false) => tracing::info!("Module sources do not support watching"),
            Err(e) => tracing::warn!("Module watching disabled: {}", e),
        }
    }

    let (transport, inbound) = match config.bot.token.clone() {
        Some(token) => {
            let mut telegram = TelegramAdapter::new(token);
            telegram.fetch_bot_info().await?;
            if let Err(e) = telegram.register_commands().await {
                tracing::warn!("Failed to register commands: {}", e);
            }
            let telegram = Arc::new(telegram);
            let poller = tokio::spawn(Arc::clone(&telegram).poll(tx));
            (telegram as Arc<dyn Transport>, poller)
        }
        None => {
            let console = Arc::new(ConsoleAdapter::new(config.console.actor_id, config.console.chat_id));
            let reader = Arc::clone(&console);
            let poller = tokio::spawn(async move { reader.run(tx).await });
            (console as Arc<dyn Transport>, poller)
        }
    };

    let mut caps =
        Capabilities::new(transport, guard, scheduler, loader, Arc::new(config)).with_settings(settings);
    if let Some(db) = db {
        caps = caps.with_relational(db.clone()).with_queries(db);
    }
    let router = Arc::new(CommandRouter::new(table, caps));

    tokio::select! {
        _ = router.serve(rx) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down...");
        }
    }
    inbound.abort();

    Ok(())
}

fn init_config() {
    match Config::default().to_yaml() {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => eprintln!("Failed to render default config: {}", e),
    }
}

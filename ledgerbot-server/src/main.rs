use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use axum_server::Handle;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use ledgerbot_common::models::AccountId;
use ledgerbot_common::traits::collaborator_traits::{MembershipChecker, Notifier};
use ledgerbot_core::http::{AllowAllMembership, BotApiMembership, BotApiNotifier, DefaultHttpClient, LogNotifier};
use ledgerbot_core::repositories::{LedgerRepos, MemoryLedgerStore};
use ledgerbot_core::utils::time::SystemClock;
use ledgerbot_core::{Database, LedgerBot, LedgerConfig};

mod health;

#[derive(Parser, Debug, Clone)]
#[command(name = "ledgerbot")]
#[command(author, version, about = "LedgerBot - points, coupons and payouts for a chat community")]
struct Args {
    /// Postgres connection URL.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://postgres@localhost:5432/ledgerbot")]
    db_url: String,

    /// Keep everything in memory instead of Postgres (lost on exit)
    #[arg(long, default_value = "false")]
    in_memory: bool,

    /// Address for the health endpoint
    #[arg(long, env = "HTTP_ADDR", default_value = "0.0.0.0:8080")]
    http_addr: SocketAddr,

    /// Overrides ADMIN_ID from the ledger config
    #[arg(long)]
    admin_id: Option<AccountId>,

    /// Bot API token; without one notifications are only logged
    #[arg(long, env = "BOT_TOKEN")]
    bot_token: Option<String>,

    #[arg(long, env = "BOT_API_BASE", default_value = "https://api.telegram.org")]
    bot_api_base: String,

    /// Channel or group users must join; without one everyone counts as a member
    #[arg(long, env = "CHANNEL_ID")]
    channel_id: Option<String>,

    /// Minutes between expired lot token sweeps
    #[arg(long, default_value = "10")]
    token_sweep_minutes: u64,
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_log::LogTracer::init()?;
    let filter = EnvFilter::from_default_env()
        .add_directive("ledgerbot=info".parse()?);
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;
    let args = Args::parse();
    info!("LedgerBot starting. in_memory={}, http_addr={}", args.in_memory, args.http_addr);

    if let Err(e) = run_server(args).await {
        error!("Server error: {:?}", e);
        return Err(e);
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run_server(args: Args) -> anyhow::Result<()> {
    let mut config = LedgerConfig::from_env()?;
    if args.admin_id.is_some() {
        config.admin_id = args.admin_id;
    }
    if config.admin_id.is_none() {
        warn!("No ADMIN_ID configured; every admin operation will be refused.");
    }

    let repos = if args.in_memory {
        info!("Using in-memory ledger store");
        LedgerRepos::memory(MemoryLedgerStore::new())
    } else {
        info!("Using Postgres DB URL: {}", args.db_url);
        let db = Database::new(&args.db_url).await?;
        db.migrate().await?;
        LedgerRepos::postgres(&db)
    };

    let (notifier, membership) = collaborators(&args, &config)?;
    let bot = Arc::new(LedgerBot::new(repos, membership, notifier, Arc::new(SystemClock), config));

    let sweeper = spawn_token_sweeper(bot.clone(), Duration::from_secs(args.token_sweep_minutes.max(1) * 60));

    let handle = Handle::new();
    let server = health::spawn_health_server(args.http_addr, bot.clone(), handle.clone());

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received; shutting down.");
    handle.graceful_shutdown(Some(Duration::from_secs(5)));
    sweeper.abort();
    if let Err(e) = server.await {
        warn!("Health server task ended abnormally: {:?}", e);
    }
    Ok(())
}

fn collaborators(
    args: &Args,
    config: &LedgerConfig,
) -> anyhow::Result<(Arc<dyn Notifier>, Arc<dyn MembershipChecker>)> {
    let Some(token) = args.bot_token.clone() else {
        info!("No BOT_TOKEN; notifications go to the log and membership is not checked");
        return Ok((Arc::new(LogNotifier), Arc::new(AllowAllMembership)));
    };

    let notifier: Arc<dyn Notifier> = Arc::new(BotApiNotifier::new(
        Box::new(DefaultHttpClient::new(config.notify_timeout())?),
        args.bot_api_base.clone(),
        token.clone(),
    ));
    let membership: Arc<dyn MembershipChecker> = match &args.channel_id {
        Some(chat_id) => Arc::new(BotApiMembership::new(
            Box::new(DefaultHttpClient::new(config.notify_timeout())?),
            args.bot_api_base.clone(),
            token,
            chat_id.clone(),
        )),
        None => Arc::new(AllowAllMembership),
    };
    Ok((notifier, membership))
}

fn spawn_token_sweeper(bot: Arc<LedgerBot>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let dropped = bot.purge_expired_tokens();
            if dropped > 0 {
                info!("Dropped {} expired lot tokens", dropped);
            }
        }
    })
}

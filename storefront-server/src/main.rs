use std::{net::SocketAddr, sync::Arc, time::Duration as StdDuration};

use chrono::Duration;
use clap::{Args, Parser, Subcommand};
use storefront::{
    IP_LIMITER_WINDOW_DAY_SECS, LoginProtectionConfig, MAX_CONSECUTIVE_FAILS_BY_USERNAME_AND_IP,
    MAX_WRONG_ATTEMPTS_BY_IP_PER_DAY, RateLimiterConfig, SqliteRepositoryProvider, SqliteStorage,
    Storefront, StorefrontBuilder, USERNAME_IP_LIMITER_BLOCK_SECS, USERNAME_IP_LIMITER_WINDOW_SECS,
};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Command line interface for the storefront server
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://storefront.db")]
    database_url: String,

    /// Secret used to sign session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve(ServeArgs),
    /// Run database migrations
    Migrate,
    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Replace a user's password
    SetPassword {
        #[arg(long)]
        username: String,
        #[arg(long, env = "NEW_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone)]
struct ServeArgs {
    #[arg(long, env = "PORT", default_value_t = 5500)]
    port: u16,

    /// Session token lifetime in seconds
    #[arg(long, env = "EXPIRES_IN", default_value_t = storefront::DEFAULT_SESSION_EXPIRY_SECS)]
    expires_in: i64,

    #[command(flatten)]
    limits: LimiterArgs,

    /// Seconds between sweeps of expired rate limiter rows
    #[arg(long, env = "LIMITER_CLEANUP_INTERVAL_SECS", default_value_t = 600)]
    cleanup_interval: u64,
}

#[derive(Args, Debug, Clone)]
struct LimiterArgs {
    #[arg(
        long,
        env = "MAX_WRONG_ATTEMPTS_BY_IP_PER_DAY",
        default_value_t = MAX_WRONG_ATTEMPTS_BY_IP_PER_DAY
    )]
    max_wrong_attempts_by_ip: u32,

    #[arg(
        long,
        env = "MAX_CONSECUTIVE_FAILS_BY_USERNAME_AND_IP",
        default_value_t = MAX_CONSECUTIVE_FAILS_BY_USERNAME_AND_IP
    )]
    max_consecutive_fails_by_username_and_ip: u32,

    #[arg(long, env = "IP_LIMITER_WINDOW_SECS", default_value_t = IP_LIMITER_WINDOW_DAY_SECS)]
    ip_window_secs: i64,

    #[arg(long, env = "IP_LIMITER_BLOCK_SECS", default_value_t = IP_LIMITER_WINDOW_DAY_SECS)]
    ip_block_secs: i64,

    #[arg(
        long,
        env = "USERNAME_IP_LIMITER_WINDOW_SECS",
        default_value_t = USERNAME_IP_LIMITER_WINDOW_SECS
    )]
    username_ip_window_secs: i64,

    #[arg(
        long,
        env = "USERNAME_IP_LIMITER_BLOCK_SECS",
        default_value_t = USERNAME_IP_LIMITER_BLOCK_SECS
    )]
    username_ip_block_secs: i64,
}

impl LimiterArgs {
    fn login_protection(&self) -> LoginProtectionConfig {
        LoginProtectionConfig {
            ip: RateLimiterConfig {
                duration: Duration::seconds(self.ip_window_secs),
                block_duration: Duration::seconds(self.ip_block_secs),
                ..RateLimiterConfig::ip_per_day(self.max_wrong_attempts_by_ip)
            },
            username_ip: RateLimiterConfig {
                duration: Duration::seconds(self.username_ip_window_secs),
                block_duration: Duration::seconds(self.username_ip_block_secs),
                ..RateLimiterConfig::consecutive_username_and_ip(
                    self.max_consecutive_fails_by_username_and_ip,
                )
            },
        }
    }
}

impl Cli {
    fn jwt_secret(&self) -> Result<&str, BoxError> {
        self.jwt_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| "JWT_SECRET must be set".into())
    }

    async fn storefront(
        &self,
        protection: LoginProtectionConfig,
        expires_in: Duration,
    ) -> Result<Storefront<SqliteRepositoryProvider>, BoxError> {
        let storefront = StorefrontBuilder::new()
            .with_sqlite(&self.database_url)
            .await?
            .with_jwt_secret(self.jwt_secret()?)
            .with_session_expiry(expires_in)
            .with_login_protection(protection)
            .apply_migrations(true)
            .build()
            .await?;
        Ok(storefront)
    }

    async fn admin_storefront(&self) -> Result<Storefront<SqliteRepositoryProvider>, BoxError> {
        self.storefront(
            LoginProtectionConfig::default(),
            Duration::seconds(storefront::DEFAULT_SESSION_EXPIRY_SECS),
        )
        .await
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve(args) => serve(&cli, args).await?,
        Commands::Migrate => {
            tracing::info!(database_url = %cli.database_url, "Running migrations");
            SqliteStorage::connect(&cli.database_url)
                .await?
                .migrate()
                .await?;
        }
        Commands::CreateAdmin {
            username,
            email,
            password,
        } => {
            let user = cli
                .admin_storefront()
                .await?
                .create_admin(username, email, password)
                .await?;
            println!("Created administrator {} ({})", user.username, user.id);
        }
        Commands::SetPassword { username, password } => {
            cli.admin_storefront()
                .await?
                .set_password(username, password)
                .await?;
            println!("Password updated for {username}");
        }
        Commands::Version => {
            println!("Storefront v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

async fn serve(cli: &Cli, args: &ServeArgs) -> Result<(), BoxError> {
    if args.expires_in <= 0 {
        return Err("EXPIRES_IN must be a positive number of seconds".into());
    }

    let storefront = Arc::new(
        cli.storefront(
            args.limits.login_protection(),
            Duration::seconds(args.expires_in),
        )
        .await?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let cleanup = storefront.start_cleanup_task(
        StdDuration::from_secs(args.cleanup_interval.max(1)),
        shutdown_rx,
    );

    let app = storefront_axum::create_router(storefront).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Storefront listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = shutdown_tx.send(true);
    cleanup.await?;
    tracing::info!("Storefront stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

//! Operator CLI for the auth and media services.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth_service::config::AuthServiceConfig;
use auth_service::service::{extract_bearer, TokenIssuer};
use common::{error_channel, guard, process_env, AppError, AppResult, ErrorKind, ServiceConfig};
use media_service::config::MediaServiceConfig;
use media_service::pipeline::IncomingFile;

#[derive(Parser)]
#[command(name = "streamhub")]
#[command(about = "Account tokens and media uploads")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate all configuration and exit
    CheckConfig,
    /// Push a local file through the upload pipeline and print its URL
    Upload {
        /// File to upload; the original is left untouched
        path: PathBuf,
    },
    /// Verify an access token and print its claims
    VerifyToken {
        /// Raw token or a full `Bearer <token>` header value
        token: String,
    },
}

fn init_tracing(verbose: bool) {
    let service = ServiceConfig::from_lookup(process_env);
    let default_filter = if verbose {
        "debug".to_string()
    } else {
        service.log_level
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn check_config() -> AppResult<()> {
    let auth = AuthServiceConfig::from_env()?;
    let media = MediaServiceConfig::from_env()?;

    info!(
        access_ttl = ?auth.tokens.access().ttl(),
        refresh_ttl = ?auth.tokens.refresh().ttl(),
        "Token configuration valid"
    );
    info!(
        temp_dir = %media.staging.destination_dir.display(),
        strategy = ?media.staging.filename_strategy,
        cloud = %media.cloudinary.cloud_name,
        "Media configuration valid"
    );
    println!("configuration ok");
    Ok(())
}

async fn upload(path: &Path) -> AppResult<()> {
    let config = MediaServiceConfig::from_env()?;
    let pipeline = media_service::build_pipeline(&config)?;

    let content = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::validation(format!("Cannot read {}: {}", path.display(), e)))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match pipeline
        .process(Some(IncomingFile::new(name, content)))
        .await
        .into_result()?
    {
        Some(object) => println!("{}", object.url),
        None => println!("nothing uploaded"),
    }
    Ok(())
}

async fn verify_token(token: &str) -> AppResult<()> {
    let config = AuthServiceConfig::from_env()?;
    let issuer = TokenIssuer::new(config.tokens);

    let token = extract_bearer(token).unwrap_or(token);
    let claims = issuer.verify_access(token)?;
    let rendered = serde_json::to_string_pretty(&claims)
        .map_err(|e| AppError::internal(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}

async fn run(command: Commands) -> AppResult<()> {
    match command {
        Commands::CheckConfig => check_config().await,
        Commands::Upload { path } => upload(&path).await,
        Commands::VerifyToken { token } => verify_token(&token).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (sink, mut failures) = error_channel();
    let command = guard(run, sink);

    if command.call(cli.command).await.into_inner().is_some() {
        return ExitCode::SUCCESS;
    }

    match failures.try_recv() {
        Ok(err) if err.kind() == ErrorKind::Configuration => {
            error!("{}", err);
            ExitCode::from(2)
        }
        Ok(err) => {
            error!(code = err.code(), "{}", err);
            ExitCode::FAILURE
        }
        Err(_) => ExitCode::FAILURE,
    }
}

use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use vcb_sync::args::{Args, Command};
use vcb_sync::{commands, Config, Mode, Result};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // This allows for testing the program without hitting the Gmail API. When
    // VCB_SYNC_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Gmail.
    let mode = Mode::from_env();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.client_secret())
            .await?
            .print(),

        Command::Auth(auth_args) => {
            let config = Config::load(home).await?;
            if auth_args.verify() {
                commands::auth_verify(&config, mode).await?.print()
            } else {
                commands::auth(&config).await?.print()
            }
        }

        Command::Run => {
            let config = Config::load(home).await?;
            commands::run(&config, mode).await?.print()
        }

        Command::Serve(serve_args) => {
            let config = Config::load(home).await?;
            commands::serve(config, mode, serve_args.port())
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

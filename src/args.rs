//! These structs provide the CLI interface for the vcb CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// vcb: pulls Vietcombank transaction notifications out of a Gmail mailbox.
///
/// The program searches your Gmail account for today's Vietcombank
/// notification emails (the classic card template and the VCB Digibank
/// transfer template), parses each one into a transaction, and stores new
/// transactions in a local SQLite database. It can run once (`vcb run`) or
/// stay resident with a daily schedule and an HTTP trigger (`vcb serve`).
///
/// You will need a Google Cloud OAuth client for the Gmail API. Download its
/// client secret JSON and pass it to `vcb init`, then run `vcb auth` once to
/// grant access.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and initialize the configuration files.
    ///
    /// This is the first command to run. Decide where you want the data to
    /// live and pass it as --home (default $HOME/vcb), and download your
    /// Google OAuth client secret JSON and pass it as --client-secret.
    Init(InitArgs),
    /// Authenticate with Gmail via OAuth.
    Auth(AuthArgs),
    /// Fetch and store today's transactions once, then exit.
    Run,
    /// Run resident: fetch daily at 23:59 and on HTTP trigger.
    ///
    /// Exposes GET /transactions/vcb/today which runs a fetch immediately and
    /// returns the processed transactions as JSON.
    Serve(ServeArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where vcb data and configuration is held. Defaults to ~/vcb
    #[arg(long, env = "VCB_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The path to your downloaded OAuth client secret. This file will be
    /// copied to the secrets location in the home directory.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Verify and refresh authentication instead of running the consent flow.
    #[arg(long)]
    verify: bool,
}

impl AuthArgs {
    pub fn verify(&self) -> bool {
        self.verify
    }
}

#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    /// The port for the HTTP trigger endpoint, bound on 127.0.0.1.
    #[arg(long, default_value_t = 3000)]
    port: u16,
}

impl ServeArgs {
    pub fn port(&self) -> u16 {
        self.port
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("vcb"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or VCB_HOME instead of relying on the default home \
                directory. If you continue using the program right now, you may have problems!",
            );
            PathBuf::from("vcb")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let args = Args::try_parse_from(["vcb", "--home", "/tmp/vcb", "run"]).unwrap();
        assert!(matches!(args.command(), Command::Run));
        assert_eq!(args.common().home().path(), Path::new("/tmp/vcb"));
        assert_eq!(args.common().log_level(), LevelFilter::INFO);
    }

    #[test]
    fn test_parse_init_requires_client_secret() {
        assert!(Args::try_parse_from(["vcb", "init"]).is_err());
        let args =
            Args::try_parse_from(["vcb", "init", "--client-secret", "/tmp/secret.json"]).unwrap();
        match args.command() {
            Command::Init(init) => {
                assert_eq!(init.client_secret(), Path::new("/tmp/secret.json"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_serve_port_default_and_override() {
        let args = Args::try_parse_from(["vcb", "serve"]).unwrap();
        match args.command() {
            Command::Serve(serve) => assert_eq!(serve.port(), 3000),
            other => panic!("unexpected command {other:?}"),
        }
        let args = Args::try_parse_from(["vcb", "serve", "--port", "8080"]).unwrap();
        match args.command() {
            Command::Serve(serve) => assert_eq!(serve.port(), 8080),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_auth_verify_flag() {
        let args = Args::try_parse_from(["vcb", "auth", "--verify"]).unwrap();
        match args.command() {
            Command::Auth(auth) => assert!(auth.verify()),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_log_level() {
        let args = Args::try_parse_from(["vcb", "--log-level", "debug", "run"]).unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
    }
}

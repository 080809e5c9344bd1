mod api;
pub mod args;
pub mod commands;
mod config;
mod db;
mod error;
mod model;
mod parse;
mod pipeline;
mod utils;

pub use api::Mode;
pub use config::Config;
pub use error::Error;
pub use error::Result;
pub use pipeline::{IngestOutcome, NotificationFormat, RunReport};

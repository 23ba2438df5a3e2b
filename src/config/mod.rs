pub mod command;

pub use command::Command;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use dotenv::dotenv;

use crate::entity::UserId;

#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Config {
    /// Starting location, e.g. `?tag=love&skip=10`
    #[arg(short = 'L', long, default_value = "", env = "POSTS_LOCATION")]
    location: String,
    /// Root of the REST backend
    #[arg(long, default_value = "https://dummyjson.com", env = "API_BASE_URL")]
    base_url: String,
    /// User id that authors new posts and comments
    #[arg(long, default_value = "1", env = "CURRENT_USER_ID")]
    user: UserId,
    /// Limit request concurrency
    #[arg(long, default_value = "5")]
    limit: usize,
    /// Retry transient failures this many times
    #[arg(long, default_value = "0")]
    retries: u32,
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
    #[command(subcommand)]
    command: Option<Command>,
}

impl Config {
    /// Parse the configuration from the environment and command line arguments
    pub fn parse() -> Self {
        dotenv().ok();
        <Self as Parser>::parse()
    }
    /// Create a logger with the configured verbosity level
    pub fn init_logger(&self) {
        env_logger::Builder::new()
            .filter_level(self.verbose.log_level_filter())
            .format_target(false)
            .init();
    }
    pub fn location(&self) -> &str {
        &self.location
    }
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
    pub const fn current_user(&self) -> UserId {
        self.user
    }
    pub const fn limit(&self) -> usize {
        self.limit
    }
    pub const fn retries(&self) -> u32 {
        self.retries
    }
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or_default()
    }
}

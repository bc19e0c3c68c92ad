#![allow(unused)]

use crate::prelude::*;
use clap::Parser;

mod error;
mod mcp;
mod prelude;
mod weather;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Current-weather lookups backed by the OpenWeatherMap API"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// OpenWeatherMap API key
    #[clap(long, env = "OPENWEATHER_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Default units when a command does not specify them: metric, imperial or standard
    #[clap(long, env = "OPENWEATHER_UNITS", global = true, default_value = "metric")]
    units: String,

    /// Default language for weather descriptions
    #[clap(long, env = "OPENWEATHER_LANG", global = true, default_value = "en")]
    lang: String,

    /// Upstream HTTP timeout in seconds
    #[clap(long, env = "OPENWEATHER_TIMEOUT", global = true, default_value = "30")]
    timeout: u64,

    /// Whether to display additional information.
    #[clap(long, env = "WEATHERTOOLS_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Current weather lookups (api.openweathermap.org)
    Weather(crate::weather::App),

    /// Model Context Protocol server
    MCP(crate::mcp::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Weather(sub_app) => crate::weather::run(sub_app, app.global).await,
        SubCommands::MCP(sub_app) => crate::mcp::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}

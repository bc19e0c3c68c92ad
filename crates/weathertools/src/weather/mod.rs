use crate::prelude::{eprintln, println, *};
use chrono::Utc;
use colored::Colorize;
use std::time::Duration;
use weathertools_core::error::WeatherError;
use weathertools_core::query::QuerySpec;
use weathertools_core::weather::{
    classify_error, parse_current, transform_current, WeatherReport,
};

pub mod by_city;
pub mod by_coords;
pub mod by_zip;

// Re-export public data functions
pub use by_city::city_data;
pub use by_coords::coords_data;
pub use by_zip::zip_data;

const OWM_API_BASE: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, clap::Parser)]
#[command(name = "weather")]
#[command(about = "Current weather lookups (api.openweathermap.org)")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Current weather for a city name
    #[clap(name = "city")]
    City(by_city::CityOptions),

    /// Current weather for geographic coordinates
    #[clap(name = "coords")]
    Coords(by_coords::CoordsOptions),

    /// Current weather for a zip/postal code
    #[clap(name = "zip")]
    Zip(by_zip::ZipOptions),
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!("OpenWeatherMap API Base: {}", OWM_API_BASE);
        println!();
    }

    match app.command {
        Commands::City(options) => by_city::run(options, global).await,
        Commands::Coords(options) => by_coords::run(options, global).await,
        Commands::Zip(options) => by_zip::run(options, global).await,
    }
}

// Shared utility functions
pub fn get_api_base() -> &'static str {
    OWM_API_BASE
}

/// Perform the single upstream GET for a validated query and classify the
/// outcome. One attempt per call; when the upstream throttles or times out
/// the caller decides whether to re-invoke.
pub async fn fetch_current(
    spec: &QuerySpec,
    global: &crate::Global,
) -> Result<WeatherReport, WeatherError> {
    let Some(api_key) = global.api_key.as_deref().filter(|k| !k.is_empty()) else {
        return Err(WeatherError::Auth(
            "no API key configured. Set OPENWEATHER_API_KEY or pass --api-key".to_string(),
        ));
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(global.timeout))
        .build()
        .map_err(|e| WeatherError::Transport(f!("failed to build HTTP client: {e}")))?;

    let url = f!("{}/weather", get_api_base());
    if global.verbose {
        eprintln!("GET {} for {}", url, spec.describe());
    }

    let mut params = spec.to_query_pairs();
    params.push(("appid", api_key.to_string()));

    let response = client
        .get(&url)
        .query(&params)
        .send()
        .await
        .map_err(|e| WeatherError::Transport(e.to_string()))?;

    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| WeatherError::Transport(e.to_string()))?;

    if !(200..300).contains(&status) {
        return Err(classify_error(status, &body));
    }

    let payload = parse_current(&body)?;
    Ok(transform_current(&payload, spec.units, Utc::now()))
}

/// Print the outcome of a lookup, as JSON or colored text. Classified
/// failures are data, not faults: they are printed in the requested format
/// and the process exits nonzero.
pub fn render_outcome(outcome: Result<WeatherReport, WeatherError>, json: bool) -> Result<()> {
    match outcome {
        Ok(report) => {
            if json {
                println!("{}", format_report_json(&report)?);
            } else {
                print!("{}", format_report_text(&report));
            }
            Ok(())
        }
        Err(err) => {
            if json {
                let payload = err.to_payload();
                let rendered = serde_json::to_string_pretty(&payload)
                    .map_err(|e| eyre!(Error::Generic(f!("JSON serialization failed: {e}"))))?;
                println!("{}", rendered);
            } else {
                eprint!("{}", format_error_text(&err));
            }
            std::process::exit(1);
        }
    }
}

/// Convert a report to a JSON string
pub fn format_report_json(report: &WeatherReport) -> Result<String> {
    serde_json::to_string_pretty(report)
        .map_err(|e| eyre!(Error::Generic(f!("JSON serialization failed: {e}"))))
}

/// Convert a report to formatted text with colors
pub fn format_report_text(report: &WeatherReport) -> String {
    let mut result = String::new();
    let units = report.units_used;
    let temp = units.temp_symbol();
    let wind = units.wind_symbol();

    let location = match &report.country {
        Some(country) => f!("{}, {}", report.location_name, country),
        None => report.location_name.clone(),
    };

    result.push_str(&f!("{}\n", "=".repeat(80).bright_cyan()));
    result.push_str(&f!(
        "{}\n",
        f!("CURRENT WEATHER: {location}").bright_cyan().bold()
    ));
    result.push_str(&f!("{}\n", "=".repeat(80).bright_cyan()));

    result.push_str(&f!(
        "\n{}: {}\n",
        "Conditions".green(),
        report.description.white().bold()
    ));
    result.push_str(&f!(
        "{}: {}{} ({}: {}{})\n",
        "Temperature".green(),
        report.temperature.to_string().bright_yellow(),
        temp,
        "feels like".green(),
        report.feels_like.to_string().bright_yellow(),
        temp
    ));
    result.push_str(&f!(
        "{}: {}% | {}: {} hPa\n",
        "Humidity".green(),
        report.humidity_pct.to_string().bright_white(),
        "Pressure".green(),
        report.pressure_hpa.to_string().bright_white()
    ));

    match report.wind_direction_deg {
        Some(deg) => result.push_str(&f!(
            "{}: {} {wind} at {}°\n",
            "Wind".green(),
            report.wind_speed.to_string().bright_white(),
            deg.to_string().bright_white()
        )),
        None => result.push_str(&f!(
            "{}: {} {wind}\n",
            "Wind".green(),
            report.wind_speed.to_string().bright_white()
        )),
    }

    if let Some(km) = report.visibility_km {
        result.push_str(&f!("{}: {km:.1} km\n", "Visibility".green()));
    }

    if let (Some(sunrise), Some(sunset)) = (&report.sunrise, &report.sunset) {
        result.push_str(&f!(
            "{}: {} | {}: {}\n",
            "Sunrise".green(),
            sunrise.bright_black(),
            "Sunset".green(),
            sunset.bright_black()
        ));
    }

    result.push_str(&f!(
        "{}: {} ({} units)\n",
        "Observed".green(),
        report.observed_at.bright_black(),
        units.as_str().bright_black()
    ));

    result.push_str(&f!(
        "{}: {:.4}, {:.4}\n",
        "Coordinates".green(),
        report.coordinates.lat,
        report.coordinates.lon
    ));

    result
}

/// Convert a classified failure to formatted text with colors
pub fn format_error_text(err: &WeatherError) -> String {
    let payload = err.to_payload();
    let mut result = String::new();

    result.push_str(&f!("{} {}\n", "Error:".red().bold(), payload.message));
    match payload.upstream_status {
        Some(status) => result.push_str(&f!(
            "{}: {} | {}: {}\n",
            "Kind".yellow(),
            payload.kind,
            "Upstream status".yellow(),
            status
        )),
        None => result.push_str(&f!("{}: {}\n", "Kind".yellow(), payload.kind)),
    }
    if payload.retryable {
        result.push_str(&f!(
            "{}\n",
            "This failure is transient; the same call may succeed if retried.".bright_black()
        ));
    }

    result
}

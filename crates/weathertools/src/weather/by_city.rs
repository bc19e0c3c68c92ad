use crate::prelude::{println, *};
use weathertools_core::error::WeatherError;
use weathertools_core::query::{LocationQuery, QuerySpec};
use weathertools_core::weather::WeatherReport;

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct CityOptions {
    /// City name (e.g. "London")
    #[arg(value_name = "CITY")]
    pub city: String,

    /// ISO 3166 country code (e.g. "uk" for the United Kingdom)
    #[arg(short, long)]
    pub country_code: Option<String>,

    /// Units of measurement: metric, imperial or standard
    #[arg(short, long)]
    pub units: Option<String>,

    /// Language for weather descriptions (e.g. "en", "es", "fr")
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(options: CityOptions, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!("Fetching weather for city: {}", options.city);
    }

    let outcome = city_data(
        &options.city,
        options.country_code.as_deref(),
        options.units.as_deref(),
        options.lang.as_deref(),
        &global,
    )
    .await;

    super::render_outcome(outcome, options.json)
}

/// Validates a by-city lookup, performs the upstream call and shapes the
/// report. Validation happens before any network I/O.
pub async fn city_data(
    city: &str,
    country_code: Option<&str>,
    units: Option<&str>,
    lang: Option<&str>,
    global: &crate::Global,
) -> Result<WeatherReport, WeatherError> {
    let location = LocationQuery::city(city, country_code)?;
    let spec = QuerySpec::new(
        location,
        units.or(Some(global.units.as_str())),
        lang.or(Some(global.lang.as_str())),
    )?;

    super::fetch_current(&spec, global).await
}

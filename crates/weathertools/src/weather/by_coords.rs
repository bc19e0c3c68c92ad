use crate::prelude::{println, *};
use weathertools_core::error::WeatherError;
use weathertools_core::query::{LocationQuery, QuerySpec};
use weathertools_core::weather::WeatherReport;

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct CoordsOptions {
    /// Latitude in degrees, -90 to 90
    #[arg(value_name = "LAT", allow_negative_numbers = true)]
    pub latitude: f64,

    /// Longitude in degrees, -180 to 180
    #[arg(value_name = "LON", allow_negative_numbers = true)]
    pub longitude: f64,

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

pub async fn run(options: CoordsOptions, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!(
            "Fetching weather for coordinates: {}, {}",
            options.latitude, options.longitude
        );
    }

    let outcome = coords_data(
        options.latitude,
        options.longitude,
        options.units.as_deref(),
        options.lang.as_deref(),
        &global,
    )
    .await;

    super::render_outcome(outcome, options.json)
}

/// Validates a by-coordinates lookup, performs the upstream call and shapes
/// the report. Validation happens before any network I/O.
pub async fn coords_data(
    latitude: f64,
    longitude: f64,
    units: Option<&str>,
    lang: Option<&str>,
    global: &crate::Global,
) -> Result<WeatherReport, WeatherError> {
    let location = LocationQuery::coordinates(latitude, longitude)?;
    let spec = QuerySpec::new(
        location,
        units.or(Some(global.units.as_str())),
        lang.or(Some(global.lang.as_str())),
    )?;

    super::fetch_current(&spec, global).await
}

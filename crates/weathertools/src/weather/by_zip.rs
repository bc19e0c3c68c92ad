use crate::prelude::{println, *};
use weathertools_core::error::WeatherError;
use weathertools_core::query::{LocationQuery, QuerySpec};
use weathertools_core::weather::WeatherReport;

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct ZipOptions {
    /// Zip/postal code (e.g. "94040")
    #[arg(value_name = "ZIP")]
    pub zip_code: String,

    /// ISO 3166 country code; the provider assumes "us" when omitted
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

pub async fn run(options: ZipOptions, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!("Fetching weather for zip code: {}", options.zip_code);
    }

    let outcome = zip_data(
        &options.zip_code,
        options.country_code.as_deref(),
        options.units.as_deref(),
        options.lang.as_deref(),
        &global,
    )
    .await;

    super::render_outcome(outcome, options.json)
}

/// Validates a by-zip lookup, performs the upstream call and shapes the
/// report. Validation happens before any network I/O.
pub async fn zip_data(
    zip_code: &str,
    country_code: Option<&str>,
    units: Option<&str>,
    lang: Option<&str>,
    global: &crate::Global,
) -> Result<WeatherReport, WeatherError> {
    let location = LocationQuery::zip(zip_code, country_code)?;
    let spec = QuerySpec::new(
        location,
        units.or(Some(global.units.as_str())),
        lang.or(Some(global.lang.as_str())),
    )?;

    super::fetch_current(&spec, global).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use weathertools_core::query::ValidationError;

    fn test_global() -> crate::Global {
        crate::Global {
            api_key: None,
            units: "metric".to_string(),
            lang: "en".to_string(),
            timeout: 5,
            verbose: false,
        }
    }

    #[tokio::test]
    async fn test_empty_zip_fails_before_any_network_call() {
        let err = zip_data("  ", None, None, None, &test_global())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            WeatherError::Validation(ValidationError::MissingField { field: "zip_code" })
        );
    }

    #[tokio::test]
    async fn test_invalid_country_code_fails_before_any_network_call() {
        let err = zip_data("94040", Some("usa"), None, None, &test_global())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WeatherError::Validation(ValidationError::InvalidCountryCode { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_an_auth_failure() {
        let err = zip_data("94040", None, None, None, &test_global())
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::Auth(_)));
    }
}

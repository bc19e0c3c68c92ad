//! Upstream payload model and report transformation
//!
//! All knowledge of OpenWeatherMap's field names lives in this module, so
//! a provider change touches one place. Parsing and classification take a
//! status and body and return plain data; the HTTP call itself happens in
//! the shell crate.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;
use crate::query::Units;

/// Geographic coordinates as the provider reports them.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// One entry of the provider's `weather` array.
#[derive(Debug, Deserialize, Clone)]
pub struct Condition {
    pub main: String,
    pub description: String,
}

/// The provider's `main` section. These fields are the minimum a usable
/// response must carry; their absence is a schema error.
#[derive(Debug, Deserialize, Clone)]
pub struct MainMetrics {
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: u32,
    pub humidity: u8,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Wind {
    #[serde(default)]
    pub speed: f64,
    pub deg: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Sys {
    pub country: Option<String>,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
}

/// Successful payload from `/data/2.5/weather`. Fields the provider only
/// sometimes sends are optional so a partial-but-successful response still
/// yields a report.
#[derive(Debug, Deserialize, Clone)]
pub struct CurrentWeather {
    pub coord: Coord,
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub main: MainMetrics,
    pub visibility: Option<f64>,
    pub wind: Option<Wind>,
    pub dt: Option<i64>,
    pub sys: Option<Sys>,
    pub timezone: Option<i32>,
    pub name: String,
}

/// The stable report returned to callers, for every lookup mode.
/// Immutable once constructed and only ever built from a successful
/// upstream payload.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct WeatherReport {
    pub location_name: String,
    pub country: Option<String>,
    pub coordinates: Coord,
    pub description: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: u32,
    pub wind_speed: f64,
    pub wind_direction_deg: Option<f64>,
    pub units_used: Units,
    pub observed_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunrise: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone_offset_secs: Option<i32>,
}

/// Parse a 200 body into the expected payload shape.
pub fn parse_current(body: &str) -> Result<CurrentWeather, WeatherError> {
    serde_json::from_str(body).map_err(|e| WeatherError::UpstreamSchema(e.to_string()))
}

/// Classify a non-success upstream response into a [`WeatherError`].
///
/// The provider reports errors as `{"cod": ..., "message": ...}`; when that
/// shape is absent the truncated raw body is used as the message.
pub fn classify_error(status: u16, body: &str) -> WeatherError {
    let message = upstream_message(body)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| truncate_body(trimmed))
        })
        .unwrap_or_else(|| format!("HTTP {status}"));

    match status {
        401 => WeatherError::Auth(message),
        404 => WeatherError::NotFound(message),
        429 => WeatherError::RateLimited(message),
        _ => WeatherError::Upstream { status, message },
    }
}

/// Map a successful payload into the stable report. A straight rename and
/// unit passthrough: conversion already happened upstream via the `units`
/// query parameter. `now` is only used when the payload carries no
/// observation timestamp.
pub fn transform_current(
    payload: &CurrentWeather,
    units: Units,
    now: DateTime<Utc>,
) -> WeatherReport {
    let description = payload
        .weather
        .first()
        .map(|w| capitalize(&w.description))
        .unwrap_or_else(|| "Unknown".to_string());

    let wind = payload.wind.clone().unwrap_or_default();
    let sys = payload.sys.clone().unwrap_or_default();

    WeatherReport {
        location_name: payload.name.clone(),
        country: sys.country,
        coordinates: payload.coord.clone(),
        description,
        temperature: payload.main.temp,
        feels_like: payload.main.feels_like,
        humidity_pct: payload.main.humidity,
        pressure_hpa: payload.main.pressure,
        wind_speed: wind.speed,
        wind_direction_deg: wind.deg,
        units_used: units,
        observed_at: payload
            .dt
            .and_then(format_timestamp)
            .unwrap_or_else(|| format_datetime(now)),
        visibility_km: payload.visibility.map(|meters| meters / 1000.0),
        sunrise: sys.sunrise.and_then(format_timestamp),
        sunset: sys.sunset.and_then(format_timestamp),
        timezone_offset_secs: payload.timezone,
    }
}

/// Convert a Unix timestamp to an RFC 3339 string.
pub fn format_timestamp(ts: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(format_datetime)
}

fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn upstream_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON_BODY: &str = r#"{
        "coord": {"lon": -0.1257, "lat": 51.5085},
        "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}],
        "base": "stations",
        "main": {"temp": 15.2, "feels_like": 14.6, "temp_min": 13.9, "temp_max": 16.1, "pressure": 1012, "humidity": 72},
        "visibility": 10000,
        "wind": {"speed": 4.12, "deg": 240},
        "clouds": {"all": 75},
        "dt": 1726900000,
        "sys": {"type": 2, "id": 2075535, "country": "GB", "sunrise": 1726894000, "sunset": 1726939000},
        "timezone": 3600,
        "id": 2643743,
        "name": "London",
        "cod": 200
    }"#;

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_parse_full_payload() {
        let payload = parse_current(LONDON_BODY).unwrap();
        assert_eq!(payload.name, "London");
        assert_eq!(payload.main.temp, 15.2);
        assert_eq!(payload.weather[0].main, "Clouds");
        assert_eq!(payload.visibility, Some(10000.0));
    }

    #[test]
    fn test_parse_rejects_missing_main_section() {
        let err = parse_current(r#"{"coord": {"lat": 0.0, "lon": 0.0}, "name": "X"}"#).unwrap_err();
        assert!(matches!(err, WeatherError::UpstreamSchema(_)));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = parse_current("<html>gateway error</html>").unwrap_err();
        assert!(matches!(err, WeatherError::UpstreamSchema(_)));
    }

    #[test]
    fn test_transform_maps_every_field() {
        let payload = parse_current(LONDON_BODY).unwrap();
        let report = transform_current(&payload, Units::Metric, now());

        assert_eq!(report.location_name, "London");
        assert_eq!(report.country.as_deref(), Some("GB"));
        assert_eq!(report.coordinates.lat, 51.5085);
        assert_eq!(report.coordinates.lon, -0.1257);
        assert_eq!(report.description, "Broken clouds");
        assert_eq!(report.temperature, 15.2);
        assert_eq!(report.feels_like, 14.6);
        assert_eq!(report.humidity_pct, 72);
        assert_eq!(report.pressure_hpa, 1012);
        assert_eq!(report.wind_speed, 4.12);
        assert_eq!(report.wind_direction_deg, Some(240.0));
        assert_eq!(report.units_used, Units::Metric);
        assert_eq!(report.observed_at, format_timestamp(1726900000).unwrap());
        assert_eq!(report.visibility_km, Some(10.0));
        assert_eq!(report.sunrise, format_timestamp(1726894000));
        assert_eq!(report.sunset, format_timestamp(1726939000));
        assert_eq!(report.timezone_offset_secs, Some(3600));
    }

    #[test]
    fn test_transform_echoes_requested_units() {
        let payload = parse_current(LONDON_BODY).unwrap();
        let report = transform_current(&payload, Units::Imperial, now());
        assert_eq!(report.units_used, Units::Imperial);
    }

    #[test]
    fn test_transform_partial_payload_uses_defaults() {
        let body = r#"{
            "coord": {"lat": 35.0, "lon": 139.0},
            "main": {"temp": 20.0, "feels_like": 19.0, "pressure": 1000, "humidity": 50},
            "name": "Somewhere"
        }"#;
        let payload = parse_current(body).unwrap();
        let report = transform_current(&payload, Units::Metric, now());

        assert_eq!(report.description, "Unknown");
        assert_eq!(report.country, None);
        assert_eq!(report.wind_speed, 0.0);
        assert_eq!(report.wind_direction_deg, None);
        assert_eq!(report.visibility_km, None);
        assert_eq!(report.sunrise, None);
        // No dt in the payload, so processing time stands in.
        assert_eq!(report.observed_at, format_timestamp(1_700_000_000).unwrap());
    }

    #[test]
    fn test_transform_missing_wind_direction_only() {
        let body = r#"{
            "coord": {"lat": 35.0, "lon": 139.0},
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
            "main": {"temp": 20.0, "feels_like": 19.0, "pressure": 1000, "humidity": 50},
            "wind": {"speed": 2.5},
            "name": "Somewhere"
        }"#;
        let payload = parse_current(body).unwrap();
        let report = transform_current(&payload, Units::Metric, now());

        assert_eq!(report.wind_speed, 2.5);
        assert_eq!(report.wind_direction_deg, None);
    }

    #[test]
    fn test_report_serialization_shape() {
        let payload = parse_current(LONDON_BODY).unwrap();
        let report = transform_current(&payload, Units::Metric, now());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["location_name"], "London");
        assert_eq!(json["units_used"], "metric");
        assert_eq!(json["coordinates"]["lat"], 51.5085);
        assert_eq!(json["humidity_pct"], 72);
        assert_eq!(json["pressure_hpa"], 1012);
        assert!(json.get("status").is_none());
    }

    #[test]
    fn test_classify_auth() {
        let body = r#"{"cod": 401, "message": "Invalid API key"}"#;
        let err = classify_error(401, body);
        assert_eq!(err, WeatherError::Auth("Invalid API key".to_string()));
    }

    #[test]
    fn test_classify_not_found() {
        let body = r#"{"cod": "404", "message": "city not found"}"#;
        let err = classify_error(404, body);
        assert_eq!(err, WeatherError::NotFound("city not found".to_string()));
    }

    #[test]
    fn test_classify_rate_limited() {
        let err = classify_error(429, r#"{"cod": 429, "message": "Too many requests"}"#);
        assert!(matches!(err, WeatherError::RateLimited(_)));
    }

    #[test]
    fn test_classify_other_statuses() {
        let err = classify_error(500, "");
        assert_eq!(
            err,
            WeatherError::Upstream {
                status: 500,
                message: "HTTP 500".to_string(),
            }
        );

        let err = classify_error(503, "upstream unavailable");
        assert_eq!(
            err,
            WeatherError::Upstream {
                status: 503,
                message: "upstream unavailable".to_string(),
            }
        );
    }

    #[test]
    fn test_classify_truncates_long_bodies() {
        let body = "x".repeat(500);
        let WeatherError::Upstream { message, .. } = classify_error(502, &body) else {
            panic!("expected upstream error");
        };
        assert!(message.len() < 250);
        assert!(message.ends_with("..."));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(1726900000).unwrap(),
            "2024-09-21T06:26:40Z"
        );
        assert!(format_timestamp(i64::MAX).is_none());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("broken clouds"), "Broken clouds");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("überwiegend bewölkt"), "Überwiegend bewölkt");
    }
}

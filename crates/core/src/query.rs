//! Lookup-mode validation and canonical query construction
//!
//! Pure functions that turn raw tool parameters into a validated
//! [`QuerySpec`]. The rest of the pipeline never inspects raw, untyped
//! input again: the provider client only sees the canonical descriptor
//! built here.

use serde::Serialize;

/// Latitude bounds accepted for coordinate lookups.
pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);
/// Longitude bounds accepted for coordinate lookups.
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

/// Country assumed for zip lookups when none is supplied. The provider
/// requires one; "us" is its own documented convention, not a guess.
pub const DEFAULT_ZIP_COUNTRY: &str = "us";

/// Language used for weather descriptions when none is supplied.
pub const DEFAULT_LANG: &str = "en";

/// Validation failure for raw tool parameters
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("missing or empty required field '{field}'")]
    MissingField { field: &'static str },

    #[error("{field} {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid units '{value}'. Valid units: metric, imperial, standard")]
    InvalidUnits { value: String },

    #[error("invalid country code '{value}'. Expected a 2-letter ISO 3166 code")]
    InvalidCountryCode { value: String },
}

/// Unit system requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    /// Parse a unit system name, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            "standard" => Ok(Units::Standard),
            _ => Err(ValidationError::InvalidUnits {
                value: value.to_string(),
            }),
        }
    }

    /// Resolve an optional raw value against the metric default.
    /// An empty string is treated as absent.
    pub fn resolve(value: Option<&str>) -> Result<Self, ValidationError> {
        match value {
            Some(v) if !v.trim().is_empty() => Units::parse(v),
            _ => Ok(Units::default()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    /// Temperature suffix the provider reports in for this unit system.
    pub fn temp_symbol(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
            Units::Standard => "K",
        }
    }

    /// Wind speed suffix the provider reports in for this unit system.
    pub fn wind_symbol(&self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            _ => "m/s",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical, mode-tagged location descriptor. Exactly one variant is
/// populated per request; construction goes through the validating
/// constructors below.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    City {
        city: String,
        country_code: Option<String>,
    },
    Coordinates {
        latitude: f64,
        longitude: f64,
    },
    Zip {
        zip_code: String,
        country_code: Option<String>,
    },
}

impl LocationQuery {
    /// Validate a by-city lookup. The city must be non-empty after
    /// trimming; the country code, when present, is lowercased.
    pub fn city(city: &str, country_code: Option<&str>) -> Result<Self, ValidationError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(ValidationError::MissingField { field: "city" });
        }
        Ok(LocationQuery::City {
            city: city.to_string(),
            country_code: normalize_country_code(country_code)?,
        })
    }

    /// Validate a by-coordinates lookup against the provider's ranges.
    pub fn coordinates(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        check_range("latitude", latitude, LATITUDE_RANGE)?;
        check_range("longitude", longitude, LONGITUDE_RANGE)?;
        Ok(LocationQuery::Coordinates {
            latitude,
            longitude,
        })
    }

    /// Validate a by-zip lookup. The country code defaults to
    /// [`DEFAULT_ZIP_COUNTRY`] at query-string construction time.
    pub fn zip(zip_code: &str, country_code: Option<&str>) -> Result<Self, ValidationError> {
        let zip_code = zip_code.trim();
        if zip_code.is_empty() {
            return Err(ValidationError::MissingField { field: "zip_code" });
        }
        Ok(LocationQuery::Zip {
            zip_code: zip_code.to_string(),
            country_code: normalize_country_code(country_code)?,
        })
    }
}

/// A fully resolved query: location plus unit system and language.
/// Both always have a value before the provider client runs.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub location: LocationQuery,
    pub units: Units,
    pub lang: String,
}

impl QuerySpec {
    pub fn new(
        location: LocationQuery,
        units: Option<&str>,
        lang: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(QuerySpec {
            location,
            units: Units::resolve(units)?,
            lang: resolve_lang(lang),
        })
    }

    /// Query-string pairs for the provider call, minus the secret `appid`
    /// that the shell appends. Encoding is left to the HTTP client.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = match &self.location {
            LocationQuery::City { city, country_code } => {
                let q = match country_code {
                    Some(cc) => format!("{city},{cc}"),
                    None => city.clone(),
                };
                vec![("q", q)]
            }
            LocationQuery::Coordinates {
                latitude,
                longitude,
            } => vec![
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
            ],
            LocationQuery::Zip {
                zip_code,
                country_code,
            } => {
                let cc = country_code.as_deref().unwrap_or(DEFAULT_ZIP_COUNTRY);
                vec![("zip", format!("{zip_code},{cc}"))]
            }
        };
        pairs.push(("units", self.units.as_str().to_string()));
        pairs.push(("lang", self.lang.clone()));
        pairs
    }

    /// Short human description of the lookup, for verbose diagnostics.
    pub fn describe(&self) -> String {
        match &self.location {
            LocationQuery::City { city, country_code } => match country_code {
                Some(cc) => format!("city '{city},{cc}'"),
                None => format!("city '{city}'"),
            },
            LocationQuery::Coordinates {
                latitude,
                longitude,
            } => format!("coordinates {latitude}, {longitude}"),
            LocationQuery::Zip {
                zip_code,
                country_code,
            } => format!(
                "zip '{zip_code},{}'",
                country_code.as_deref().unwrap_or(DEFAULT_ZIP_COUNTRY)
            ),
        }
    }
}

fn resolve_lang(lang: Option<&str>) -> String {
    match lang {
        // Passed through verbatim: the provider tolerates unknown codes
        // and falls back internally.
        Some(l) if !l.trim().is_empty() => l.trim().to_string(),
        _ => DEFAULT_LANG.to_string(),
    }
}

fn normalize_country_code(code: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(code) = code else {
        return Ok(None);
    };
    let code = code.trim();
    if code.is_empty() {
        return Ok(None);
    }
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(Some(code.to_lowercase()))
    } else {
        Err(ValidationError::InvalidCountryCode {
            value: code.to_string(),
        })
    }
}

fn check_range(
    field: &'static str,
    value: f64,
    (min, max): (f64, f64),
) -> Result<(), ValidationError> {
    // Written so NaN also fails the check.
    if min <= value && value <= max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

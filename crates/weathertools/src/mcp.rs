use crate::prelude::{eprintln, println, *};
use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use weathertools_core::error::WeatherError;
use weathertools_core::weather::WeatherReport;

#[derive(Debug, clap::Parser)]
#[command(name = "mcp")]
#[command(about = "Model Context Protocol server")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Start MCP server with stdio transport
    #[clap(name = "stdio")]
    Stdio,

    /// Start MCP server with SSE transport (HTTP)
    #[clap(name = "sse")]
    Sse(SseOptions),
}

#[derive(Debug, clap::Args)]
pub struct SseOptions {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
}

// JSON-RPC 2.0 types
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<serde_json::Value>,
    method: String,
    params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

// MCP Protocol types
#[derive(Debug, Serialize)]
struct ServerInfo {
    name: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct ServerCapabilities {
    tools: Option<ToolsCapability>,
    resources: Option<ResourcesCapability>,
}

#[derive(Debug, Serialize)]
struct ToolsCapability {}

#[derive(Debug, Serialize)]
struct ResourcesCapability {}

#[derive(Debug, Serialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    protocol_version: String,
    capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
struct Tool {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ToolsList {
    tools: Vec<Tool>,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    arguments: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct CallToolResult {
    content: Vec<Content>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    is_error: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum Content {
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct Resource {
    uri: String,
    name: String,
    description: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

#[derive(Debug, Serialize)]
struct ResourcesList {
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug, Serialize)]
struct ResourceContents {
    uri: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct ReadResourceResult {
    contents: Vec<ResourceContents>,
}

const ABOUT_URI: &str = "weather://about";

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    match app.command {
        Commands::Stdio => run_stdio(global).await,
        Commands::Sse(options) => run_sse(options, global).await,
    }
}

async fn run_stdio(global: crate::Global) -> Result<()> {
    if global.verbose {
        eprintln!("Starting MCP server with stdio transport...");
        eprintln!();
    }

    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if global.verbose {
            eprintln!("Received: {trimmed}");
        }

        let Some(response) = handle_request(trimmed, &global).await else {
            continue;
        };
        let response_json = serde_json::to_string(&response)?;

        if global.verbose {
            eprintln!("Sending: {response_json}");
        }

        stdout.write_all(response_json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}

async fn handle_request(request_str: &str, global: &crate::Global) -> Option<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_str(request_str) {
        Ok(req) => req,
        Err(e) => {
            return Some(JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: None,
                result: None,
                error: Some(JsonRpcError {
                    code: -32700,
                    message: f!("Parse error: {e}"),
                    data: None,
                }),
            });
        }
    };

    // A request without an id is a notification (e.g.
    // notifications/initialized) and must not be answered.
    if request.id.is_none() {
        return None;
    }

    let result = match request.method.as_str() {
        "initialize" => handle_initialize(),
        "tools/list" => handle_tools_list(),
        "tools/call" => handle_tools_call(request.params, global).await,
        "resources/list" => handle_resources_list(),
        "resources/read" => handle_resources_read(request.params),
        method => Err(JsonRpcError {
            code: -32601,
            message: f!("Method not found: {method}"),
            data: None,
        }),
    };

    Some(match result {
        Ok(value) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: Some(value),
            error: None,
        },
        Err(error) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: None,
            error: Some(error),
        },
    })
}

fn handle_initialize() -> Result<serde_json::Value, JsonRpcError> {
    let result = InitializeResult {
        protocol_version: "2024-11-05".to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {}),
            resources: Some(ResourcesCapability {}),
        },
        server_info: ServerInfo {
            name: "weathertools".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };

    serde_json::to_value(result).map_err(|e| JsonRpcError {
        code: -32603,
        message: f!("Internal error: {e}"),
        data: None,
    })
}

fn handle_tools_list() -> Result<serde_json::Value, JsonRpcError> {
    let units_schema = serde_json::json!({
        "type": "string",
        "description": "Units of measurement: 'metric' (°C), 'imperial' (°F) or 'standard' (K). Defaults to metric."
    });
    let lang_schema = serde_json::json!({
        "type": "string",
        "description": "Language for weather descriptions (e.g. 'en', 'es', 'fr'). Defaults to 'en'."
    });

    let tools = vec![
        Tool {
            name: "get_weather_by_city".to_string(),
            description: "Get current weather for a city, optionally narrowed by country code. \
                          Returns a structured report with conditions, temperature, humidity, \
                          pressure and wind."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "City name (e.g. 'London')"
                    },
                    "country_code": {
                        "type": "string",
                        "description": "2-letter ISO 3166 country code (e.g. 'uk')"
                    },
                    "units": units_schema.clone(),
                    "lang": lang_schema.clone()
                },
                "required": ["city"]
            }),
        },
        Tool {
            name: "get_weather_by_coordinates".to_string(),
            description: "Get current weather for geographic coordinates. Latitude must be \
                          within [-90, 90] and longitude within [-180, 180]."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "latitude": {
                        "type": "number",
                        "description": "Latitude in degrees",
                        "minimum": -90,
                        "maximum": 90
                    },
                    "longitude": {
                        "type": "number",
                        "description": "Longitude in degrees",
                        "minimum": -180,
                        "maximum": 180
                    },
                    "units": units_schema.clone(),
                    "lang": lang_schema.clone()
                },
                "required": ["latitude", "longitude"]
            }),
        },
        Tool {
            name: "get_weather_by_zip".to_string(),
            description: "Get current weather for a zip/postal code. The country code defaults \
                          to 'us' when omitted, mirroring the provider convention."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "zip_code": {
                        "type": "string",
                        "description": "Zip/postal code (e.g. '94040')"
                    },
                    "country_code": {
                        "type": "string",
                        "description": "2-letter ISO 3166 country code (default 'us')"
                    },
                    "units": units_schema.clone(),
                    "lang": lang_schema.clone()
                },
                "required": ["zip_code"]
            }),
        },
    ];

    let result = ToolsList { tools };

    serde_json::to_value(result).map_err(|e| JsonRpcError {
        code: -32603,
        message: f!("Internal error: {e}"),
        data: None,
    })
}

async fn handle_tools_call(
    params: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: CallToolParams = serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
        .map_err(|e| JsonRpcError {
            code: -32602,
            message: f!("Invalid params: {e}"),
            data: None,
        })?;

    match params.name.as_str() {
        "get_weather_by_city" => handle_get_weather_by_city(params.arguments, global).await,
        "get_weather_by_coordinates" => {
            handle_get_weather_by_coordinates(params.arguments, global).await
        }
        "get_weather_by_zip" => handle_get_weather_by_zip(params.arguments, global).await,
        _ => Err(JsonRpcError {
            code: -32602,
            message: f!("Unknown tool: {}", params.name),
            data: None,
        }),
    }
}

async fn handle_get_weather_by_city(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct CityArgs {
        city: String,
        country_code: Option<String>,
        units: Option<String>,
        lang: Option<String>,
    }

    let args: CityArgs = parse_arguments(arguments)?;

    if global.verbose {
        eprintln!(
            "Calling get_weather_by_city: city={}, country_code={:?}",
            args.city, args.country_code
        );
    }

    let outcome = crate::weather::city_data(
        &args.city,
        args.country_code.as_deref(),
        args.units.as_deref(),
        args.lang.as_deref(),
        global,
    )
    .await;

    outcome_to_result(outcome)
}

async fn handle_get_weather_by_coordinates(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct CoordsArgs {
        latitude: f64,
        longitude: f64,
        units: Option<String>,
        lang: Option<String>,
    }

    let args: CoordsArgs = parse_arguments(arguments)?;

    if global.verbose {
        eprintln!(
            "Calling get_weather_by_coordinates: latitude={}, longitude={}",
            args.latitude, args.longitude
        );
    }

    let outcome = crate::weather::coords_data(
        args.latitude,
        args.longitude,
        args.units.as_deref(),
        args.lang.as_deref(),
        global,
    )
    .await;

    outcome_to_result(outcome)
}

async fn handle_get_weather_by_zip(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct ZipArgs {
        zip_code: String,
        country_code: Option<String>,
        units: Option<String>,
        lang: Option<String>,
    }

    let args: ZipArgs = parse_arguments(arguments)?;

    if global.verbose {
        eprintln!(
            "Calling get_weather_by_zip: zip_code={}, country_code={:?}",
            args.zip_code, args.country_code
        );
    }

    let outcome = crate::weather::zip_data(
        &args.zip_code,
        args.country_code.as_deref(),
        args.units.as_deref(),
        args.lang.as_deref(),
        global,
    )
    .await;

    outcome_to_result(outcome)
}

fn parse_arguments<T: serde::de::DeserializeOwned>(
    arguments: Option<serde_json::Value>,
) -> Result<T, JsonRpcError> {
    serde_json::from_value(arguments.unwrap_or(serde_json::Value::Null)).map_err(|e| JsonRpcError {
        code: -32602,
        message: f!("Invalid arguments: {e}"),
        data: None,
    })
}

/// Wrap a lookup outcome in the MCP result format. Classified failures
/// become an error payload in the same interchange format as reports,
/// flagged with `isError` — they are data, not protocol faults.
fn outcome_to_result(
    outcome: Result<WeatherReport, WeatherError>,
) -> Result<serde_json::Value, JsonRpcError> {
    let (text, is_error) = match outcome {
        Ok(report) => {
            let json = serde_json::to_string_pretty(&report).map_err(|e| JsonRpcError {
                code: -32603,
                message: f!("Serialization error: {e}"),
                data: None,
            })?;
            (json, None)
        }
        Err(err) => {
            let json = serde_json::to_string_pretty(&err.to_payload()).map_err(|e| JsonRpcError {
                code: -32603,
                message: f!("Serialization error: {e}"),
                data: None,
            })?;
            (json, Some(true))
        }
    };

    let result = CallToolResult {
        content: vec![Content::Text { text }],
        is_error,
    };

    serde_json::to_value(result).map_err(|e| JsonRpcError {
        code: -32603,
        message: f!("Internal error: {e}"),
        data: None,
    })
}

fn handle_resources_list() -> Result<serde_json::Value, JsonRpcError> {
    let result = ResourcesList {
        resources: vec![Resource {
            uri: ABOUT_URI.to_string(),
            name: "About this server".to_string(),
            description: "Server name, version and capabilities".to_string(),
            mime_type: "application/json".to_string(),
        }],
    };

    serde_json::to_value(result).map_err(|e| JsonRpcError {
        code: -32603,
        message: f!("Internal error: {e}"),
        data: None,
    })
}

fn handle_resources_read(
    params: Option<serde_json::Value>,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: ReadResourceParams =
        serde_json::from_value(params.unwrap_or(serde_json::Value::Null)).map_err(|e| {
            JsonRpcError {
                code: -32602,
                message: f!("Invalid params: {e}"),
                data: None,
            }
        })?;

    if params.uri != ABOUT_URI {
        return Err(JsonRpcError {
            code: -32602,
            message: f!("Unknown resource: {}", params.uri),
            data: None,
        });
    }

    let text = serde_json::to_string_pretty(&about_info()).map_err(|e| JsonRpcError {
        code: -32603,
        message: f!("Serialization error: {e}"),
        data: None,
    })?;

    let result = ReadResourceResult {
        contents: vec![ResourceContents {
            uri: ABOUT_URI.to_string(),
            mime_type: "application/json".to_string(),
            text,
        }],
    };

    serde_json::to_value(result).map_err(|e| JsonRpcError {
        code: -32603,
        message: f!("Internal error: {e}"),
        data: None,
    })
}

fn about_info() -> serde_json::Value {
    serde_json::json!({
        "name": "weathertools",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Current-weather tools backed by the OpenWeatherMap API",
        "capabilities": [
            "Current weather by city name",
            "Current weather by geographic coordinates",
            "Current weather by zip/postal code"
        ],
        "supported_units": ["metric", "imperial", "standard"],
        "default_language": "en"
    })
}

async fn run_sse(options: SseOptions, global: crate::Global) -> Result<()> {
    use axum::{
        extract::State,
        response::sse::{Event, Sse},
        routing::{get, post},
        Json, Router,
    };
    use futures::stream::{self, Stream};
    use std::convert::Infallible;
    use std::sync::Arc;
    use tower_http::cors::{Any, CorsLayer};

    if global.verbose {
        eprintln!(
            "Starting MCP server with SSE transport on {}:{}...",
            options.host, options.port
        );
    }

    let addr = f!("{}:{}", options.host, options.port);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let shared_global = Arc::new(global.clone());

    let app_router = Router::new()
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler))
        .layer(cors)
        .with_state(shared_global);

    if global.verbose {
        eprintln!("MCP server listening on http://{}", addr);
        eprintln!("SSE endpoint: http://{}/sse", addr);
        eprintln!("Message endpoint: http://{}/message", addr);
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!(Error::Network(f!("failed to bind to {addr}: {e}"))))?;

    axum::serve(listener, app_router)
        .await
        .map_err(|e| eyre!(Error::Network(f!("server error: {e}"))))?;

    Ok(())
}

async fn sse_handler(
    State(_global): State<Arc<crate::Global>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = stream::once(async { Ok(Event::default().data("MCP SSE endpoint ready")) });
    Sse::new(stream)
}

async fn message_handler(
    State(global): State<Arc<crate::Global>>,
    Json(request): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let request_str = serde_json::to_string(&request).unwrap_or_default();
    let response = handle_request(&request_str, &global).await;
    Json(serde_json::to_value(response).unwrap_or(serde_json::Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

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
    async fn test_notification_gets_no_response() {
        let global = test_global();

        let request = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        assert!(handle_request(request, &global).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method_with_id_is_answered() {
        let global = test_global();

        let request = r#"{"jsonrpc":"2.0","id":7,"method":"prompts/list"}"#;
        let response = handle_request(request, &global).await.unwrap();

        assert_eq!(response.id, Some(serde_json::json!(7)));
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[test]
    fn test_initialize_advertises_tools_and_resources() {
        let value = handle_initialize().unwrap();

        assert_eq!(value["protocolVersion"], "2024-11-05");
        assert_eq!(value["serverInfo"]["name"], "weathertools");
        assert!(value["capabilities"]["tools"].is_object());
        assert!(value["capabilities"]["resources"].is_object());
    }

    #[test]
    fn test_tools_list_exposes_three_lookup_modes() {
        let value = handle_tools_list().unwrap();
        let tools = value["tools"].as_array().unwrap();

        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec![
                "get_weather_by_city",
                "get_weather_by_coordinates",
                "get_weather_by_zip"
            ]
        );
    }

    #[test]
    fn test_tools_list_required_fields() {
        let value = handle_tools_list().unwrap();
        let tools = value["tools"].as_array().unwrap();

        assert_eq!(tools[0]["inputSchema"]["required"][0], "city");
        assert_eq!(tools[1]["inputSchema"]["required"][0], "latitude");
        assert_eq!(tools[1]["inputSchema"]["required"][1], "longitude");
        assert_eq!(tools[2]["inputSchema"]["required"][0], "zip_code");
    }

    #[test]
    fn test_resources_list_contains_about() {
        let value = handle_resources_list().unwrap();
        let resources = value["resources"].as_array().unwrap();

        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0]["uri"], ABOUT_URI);
        assert_eq!(resources[0]["mimeType"], "application/json");
    }

    #[test]
    fn test_resources_read_about() {
        let params = serde_json::json!({ "uri": ABOUT_URI });
        let value = handle_resources_read(Some(params)).unwrap();

        let text = value["contents"][0]["text"].as_str().unwrap();
        let about: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(about["name"], "weathertools");
        assert_eq!(about["supported_units"][0], "metric");
    }

    #[test]
    fn test_resources_read_unknown_uri() {
        let params = serde_json::json!({ "uri": "weather://nope" });
        let err = handle_resources_read(Some(params)).unwrap_err();
        assert_eq!(err.code, -32602);
    }

    #[test]
    fn test_outcome_to_result_success_has_no_error_flag() {
        use weathertools_core::query::Units;
        use weathertools_core::weather::Coord;

        let report = WeatherReport {
            location_name: "London".to_string(),
            country: Some("GB".to_string()),
            coordinates: Coord {
                lat: 51.5,
                lon: -0.12,
            },
            description: "Clouds".to_string(),
            temperature: 15.2,
            feels_like: 14.6,
            humidity_pct: 72,
            pressure_hpa: 1012,
            wind_speed: 4.1,
            wind_direction_deg: Some(240.0),
            units_used: Units::Metric,
            observed_at: "2024-09-21T06:26:40Z".to_string(),
            visibility_km: None,
            sunrise: None,
            sunset: None,
            timezone_offset_secs: None,
        };

        let value = outcome_to_result(Ok(report)).unwrap();
        assert!(value.get("isError").is_none());
        let text = value["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("\"location_name\": \"London\""));
    }

    #[test]
    fn test_outcome_to_result_failure_is_flagged_error_payload() {
        let err = WeatherError::NotFound("city not found".to_string());
        let value = outcome_to_result(Err(err)).unwrap();

        assert_eq!(value["isError"], true);
        let text = value["content"][0]["text"].as_str().unwrap();
        let payload: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["kind"], "not_found");
        assert_eq!(payload["upstream_status"], 404);
    }
}

//! Weather lookup backed by Open-Meteo
//!
//! Two-hop wrapper: geocode the location name, then fetch the current
//! forecast for the resulting coordinates. The report's wire shape is
//! what the weather card validates against.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::client::Client;

pub const WEATHER_TOOL: &str = "get-weather";

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Current conditions for one location, in the shape the renderer's
/// weather card expects.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_gust: f64,
    pub conditions: String,
    pub location: String,
}

impl WeatherReport {
    /// Parse a report out of arbitrary tool output, if it has the right
    /// shape.
    pub fn from_output(output: &Value) -> Option<WeatherReport> {
        serde_json::from_value(output.clone()).ok()
    }
}

/// Shape validator used by the tool-UI registration.
pub fn is_weather_report(output: &Value) -> bool {
    WeatherReport::from_output(output).is_some()
}

/// Seam for the weather backend so the engine can run against a stub.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_weather(&self, location: &str) -> Result<WeatherReport>;
}

#[derive(Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Deserialize)]
struct GeocodingResult {
    latitude: f64,
    longitude: f64,
    name: String,
}

#[derive(Deserialize)]
struct ForecastResponse {
    current: CurrentWeather,
}

#[derive(Deserialize)]
struct CurrentWeather {
    temperature_2m: f64,
    apparent_temperature: f64,
    relative_humidity_2m: f64,
    wind_speed_10m: f64,
    wind_gusts_10m: f64,
    weather_code: i64,
}

/// Open-Meteo client (no API key required).
#[derive(Clone, Default)]
pub struct OpenMeteoClient {
    client: Client,
}

impl OpenMeteoClient {
    pub fn new() -> Self {
        OpenMeteoClient::default()
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn current_weather(&self, location: &str) -> Result<WeatherReport> {
        let geocoding_url = format!(
            "{}?name={}&count=1",
            GEOCODING_URL,
            urlencode(location)
        );
        let geocoding: GeocodingResponse = self.client.get(geocoding_url).await?;
        let place = geocoding
            .results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Location '{}' not found", location))?;

        let forecast_url = format!(
            "{}?latitude={}&longitude={}&current=temperature_2m,apparent_temperature,relative_humidity_2m,wind_speed_10m,wind_gusts_10m,weather_code",
            FORECAST_URL, place.latitude, place.longitude
        );
        let forecast: ForecastResponse = self.client.get(forecast_url).await?;
        let current = forecast.current;

        Ok(WeatherReport {
            temperature: current.temperature_2m,
            feels_like: current.apparent_temperature,
            humidity: current.relative_humidity_2m,
            wind_speed: current.wind_speed_10m,
            wind_gust: current.wind_gusts_10m,
            conditions: weather_condition(current.weather_code).to_string(),
            location: place.name,
        })
    }
}

/// Minimal percent-encoding for a query-string value.
fn urlencode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            b' ' => encoded.push('+'),
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

/// WMO weather interpretation codes, as reported by Open-Meteo.
pub fn weather_condition(code: i64) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Foggy",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_weather_condition_table() {
        assert_eq!(weather_condition(0), "Clear sky");
        assert_eq!(weather_condition(95), "Thunderstorm");
        assert_eq!(weather_condition(42), "Unknown");
    }

    #[test]
    fn test_report_validator_accepts_wire_shape() {
        let output = json!({
            "temperature": 18.2,
            "feelsLike": 16.9,
            "humidity": 67.0,
            "windSpeed": 12.0,
            "windGust": 20.0,
            "conditions": "Partly cloudy",
            "location": "Paris"
        });
        assert!(is_weather_report(&output));

        let report = WeatherReport::from_output(&output).unwrap();
        assert_eq!(report.location, "Paris");
        assert_eq!(report.conditions, "Partly cloudy");
    }

    #[test]
    fn test_report_validator_rejects_partial_shapes() {
        assert!(!is_weather_report(&json!({ "temperature": 18.2 })));
        assert!(!is_weather_report(&json!("sunny")));
        assert!(!is_weather_report(&json!(null)));
    }

    #[test]
    fn test_urlencode_query_values() {
        assert_eq!(urlencode("Paris"), "Paris");
        assert_eq!(urlencode("San José"), "San+Jos%C3%A9");
        assert_eq!(urlencode("a&b"), "a%26b");
    }
}

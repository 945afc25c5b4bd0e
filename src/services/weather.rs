use crate::config::Config;
use crate::models::{Coordinates, WeatherReport};
use crate::{AppError, Result};
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_ICON: &str = "01d";

#[derive(Debug, Deserialize)]
struct OpenWeatherResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    weather: Vec<OpenWeatherCondition>,
    main: OpenWeatherMain,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherCondition {
    #[serde(default)]
    description: String,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherMain {
    temp: f64,
}

/// Client for the OpenWeatherMap current-weather endpoint.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    icon_base_url: String,
}

impl WeatherClient {
    pub fn from_config(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build weather HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            });

        Self {
            http,
            api_key: config.open_weather_api_key().map(str::to_string),
            base_url: config.open_weather_base_url.clone(),
            icon_base_url: config.open_weather_icon_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn get_weather(&self, coordinates: Coordinates) -> Result<WeatherReport> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::Unavailable("OPEN_WEATHER_API_KEY is not configured".to_string())
        })?;

        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("lat", coordinates.lat.to_string()),
                ("lon", coordinates.lon.to_string()),
                ("appid", api_key.to_string()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Weather service unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Weather service returned {}",
                status
            )));
        }

        let body: OpenWeatherResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid weather response: {}", e)))?;

        Ok(summarize(body, &self.icon_base_url))
    }
}

fn summarize(body: OpenWeatherResponse, icon_base_url: &str) -> WeatherReport {
    let weather = body
        .weather
        .iter()
        .map(|w| capitalize_first(&w.description))
        .collect::<Vec<_>>()
        .join(", ");

    let icon = body
        .weather
        .first()
        .and_then(|w| w.icon.as_deref())
        .unwrap_or(DEFAULT_ICON);

    WeatherReport {
        city: body.name,
        weather,
        temperature: format!("{}°", body.main.temp.floor() as i64),
        icon: format!("{}/{}.png", icon_base_url, icon),
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first("light rain"), "Light rain");
        assert_eq!(capitalize_first("ébauche"), "Ébauche");
        assert_eq!(capitalize_first(""), "");
    }

    #[test]
    fn test_summarize_openweather_payload() {
        let body: OpenWeatherResponse = serde_json::from_value(json!({
            "name": "Lisbon",
            "weather": [
                {"description": "light rain", "icon": "10d"},
                {"description": "mist", "icon": "50d"}
            ],
            "main": {"temp": 17.8}
        }))
        .unwrap();

        let report = summarize(body, "https://openweathermap.org/img/wn");
        assert_eq!(report.city, "Lisbon");
        assert_eq!(report.weather, "Light rain, Mist");
        assert_eq!(report.temperature, "17°");
        assert_eq!(report.icon, "https://openweathermap.org/img/wn/10d.png");
    }

    #[test]
    fn test_summarize_defaults() {
        let body: OpenWeatherResponse = serde_json::from_value(json!({
            "main": {"temp": -2.3}
        }))
        .unwrap();

        let report = summarize(body, "http://icons");
        assert_eq!(report.weather, "");
        assert_eq!(report.temperature, "-3°");
        assert_eq!(report.icon, "http://icons/01d.png");
    }

    #[tokio::test]
    async fn test_missing_api_key_is_unavailable() {
        let config = Config::from_pairs([
            ("JWT_SECRET", "a"),
            ("JWT_REFRESH_SECRET", "b"),
        ])
        .unwrap();
        let client = WeatherClient::from_config(&config);

        let result = client.get_weather(Coordinates { lat: 38.7, lon: -9.1 }).await;
        assert!(matches!(result, Err(AppError::Unavailable(_))));
    }
}

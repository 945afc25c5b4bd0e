use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    // Token signing
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_seconds: u64,
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry_seconds: u64,

    #[serde(default = "default_max_request_body")]
    pub max_request_body_mb: u64,

    // OpenWeatherMap settings
    pub open_weather_api_key: Option<String>,
    #[serde(default = "default_open_weather_base_url")]
    pub open_weather_base_url: String,
    #[serde(default = "default_open_weather_icon_base_url")]
    pub open_weather_icon_base_url: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_database_url() -> String {
    "sqlite:./data/vitalgate.db?mode=rwc".to_string()
}

fn default_database_max_connections() -> u32 {
    5
}

fn default_access_token_expiry() -> u64 {
    // 15 minutes
    900
}

fn default_refresh_token_expiry() -> u64 {
    // 7 days
    604_800
}

fn default_max_request_body() -> u64 {
    15
}

fn default_open_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_open_weather_icon_base_url() -> String {
    "https://openweathermap.org/img/wn".to_string()
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Build a config from explicit `(KEY, value)` pairs, with the same
    /// defaults as [`Config::from_env`].
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        envy::from_iter(pairs.into_iter().map(|(k, v)| (k.into(), v.into())))
    }

    pub fn max_request_body_bytes(&self) -> usize {
        (self.max_request_body_mb * 1024 * 1024) as usize
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn open_weather_api_key(&self) -> Option<&str> {
        self.open_weather_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_pairs([
            ("JWT_SECRET", "access"),
            ("JWT_REFRESH_SECRET", "refresh"),
        ])
        .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.access_token_expiry_seconds, 900);
        assert_eq!(config.refresh_token_expiry_seconds, 604_800);
        assert_eq!(config.max_request_body_bytes(), 15 * 1024 * 1024);
        assert!(config.open_weather_api_key().is_none());
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let result = Config::from_pairs([("JWT_SECRET", "access")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_weather_key_is_treated_as_unset() {
        let config = Config::from_pairs([
            ("JWT_SECRET", "a"),
            ("JWT_REFRESH_SECRET", "b"),
            ("OPEN_WEATHER_API_KEY", "  "),
        ])
        .unwrap();
        assert!(config.open_weather_api_key().is_none());
    }
}

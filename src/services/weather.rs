use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

/// Weather lookup capability: city and date in, short description out.
#[async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn lookup_weather(&self, city: &str, date: NaiveDate) -> Result<String, WeatherError>;
}

/// Open-Meteo geocoding + daily forecast client.
pub struct OpenMeteoWeather {
    http: reqwest::Client,
    forecast_base_url: String,
    geocoding_base_url: String,
}

#[derive(Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Deserialize)]
struct Place {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct ForecastResponse {
    daily: DailyForecast,
}

#[derive(Deserialize)]
struct DailyForecast {
    time: Vec<String>,
    weather_code: Vec<Option<u8>>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
}

impl OpenMeteoWeather {
    pub fn new(forecast_base_url: &str, geocoding_base_url: &str) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            forecast_base_url: forecast_base_url.trim_end_matches('/').to_string(),
            geocoding_base_url: geocoding_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn locate(&self, city: &str) -> Result<Place, WeatherError> {
        let response: GeocodingResponse = self
            .http
            .get(format!("{}/v1/search", self.geocoding_base_url))
            .query(&[("name", city), ("count", "1"), ("language", "ko"), ("format", "json")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::UnknownCity(city.to_string()))
    }
}

#[async_trait]
impl WeatherLookup for OpenMeteoWeather {
    async fn lookup_weather(&self, city: &str, date: NaiveDate) -> Result<String, WeatherError> {
        let city = city.trim().trim_end_matches('역');
        let place = self.locate(city).await?;
        let day = date.format("%Y-%m-%d").to_string();

        let forecast: ForecastResponse = self
            .http
            .get(format!("{}/v1/forecast", self.forecast_base_url))
            .query(&[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                (
                    "daily",
                    "weather_code,temperature_2m_max,temperature_2m_min".to_string(),
                ),
                ("timezone", "Asia/Seoul".to_string()),
                ("start_date", day.clone()),
                ("end_date", day.clone()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let daily = forecast.daily;
        let idx = daily
            .time
            .iter()
            .position(|t| *t == day)
            .ok_or_else(|| WeatherError::NoForecast(day.clone()))?;

        let code = daily.weather_code.get(idx).copied().flatten();
        let max = daily.temperature_2m_max.get(idx).copied().flatten();
        let min = daily.temperature_2m_min.get(idx).copied().flatten();

        match (code, max, min) {
            (Some(code), Some(max), Some(min)) => Ok(format!(
                "{}의 {} 날씨는 '{}', 최고 기온 {:.0}°C, 최저 기온 {:.0}°C 입니다.",
                day,
                city,
                describe_weather_code(code),
                max,
                min
            )),
            _ => Err(WeatherError::NoForecast(day)),
        }
    }
}

/// Korean description of a WMO weather interpretation code.
pub fn describe_weather_code(code: u8) -> &'static str {
    match code {
        0 => "맑음",
        1 | 2 => "구름 조금",
        3 => "흐림",
        45 | 48 => "안개",
        51 | 53 | 55 | 56 | 57 => "이슬비",
        61 | 63 | 65 | 66 | 67 | 80 | 81 | 82 => "비",
        71 | 73 | 75 | 77 | 85 | 86 => "눈",
        95 | 96 | 99 => "뇌우",
        _ => "알 수 없음",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Weather request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No location found for '{0}'")]
    UnknownCity(String),

    #[error("No forecast available for {0}")]
    NoForecast(String),
}

//! Live current-weather lookup (OpenWeather "current weather" endpoint).
//!
//! A live reading is optional: any failure surfaces as `LiveWeatherError` and
//! the pipeline proceeds on historical data. A failed fetch never turns into a
//! zero reading.

use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::{Coordinates, LiveObservation};
use crate::error::LiveWeatherError;

const BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const API_KEY_VAR: &str = "OPENWEATHER_API_KEY";

/// Anything that can produce a current reading for a location.
pub trait LiveWeatherSource {
    fn current(&self, at: Coordinates) -> Result<LiveObservation, LiveWeatherError>;
}

/// A fixed reading (demo runs, tests).
#[derive(Debug, Clone)]
pub struct StaticReading(pub LiveObservation);

impl LiveWeatherSource for StaticReading {
    fn current(&self, _at: Coordinates) -> Result<LiveObservation, LiveWeatherError> {
        Ok(self.0.clone())
    }
}

pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, LiveWeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LiveWeatherError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        })
    }

    /// Read `OPENWEATHER_API_KEY` from the environment (after loading `.env`).
    pub fn from_env(timeout: Duration) -> Result<Self, LiveWeatherError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LiveWeatherError::MissingApiKey)?;
        Self::new(api_key, timeout)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl LiveWeatherSource for OpenWeatherClient {
    fn current(&self, at: Coordinates) -> Result<LiveObservation, LiveWeatherError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .map_err(request_error)?;

        if !resp.status().is_success() {
            return Err(LiveWeatherError::Status(resp.status().as_u16()));
        }

        let body = resp.text().map_err(request_error)?;
        parse_current(&body, Local::now().date_naive())
    }
}

fn request_error(e: reqwest::Error) -> LiveWeatherError {
    if e.is_timeout() {
        LiveWeatherError::Timeout
    } else {
        LiveWeatherError::Transport(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    main: MainBlock,
    #[serde(default)]
    rain: Option<RainBlock>,
    /// Observation time, unix seconds (UTC).
    #[serde(default)]
    dt: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct RainBlock {
    #[serde(rename = "1h", default)]
    one_hour: Option<f64>,
}

/// Parse a current-weather payload. `today` dates readings without a timestamp.
pub fn parse_current(body: &str, today: NaiveDate) -> Result<LiveObservation, LiveWeatherError> {
    let parsed: CurrentResponse =
        serde_json::from_str(body).map_err(|e| LiveWeatherError::Payload(e.to_string()))?;

    let (temperature, humidity) = (parsed.main.temp, parsed.main.humidity);
    if !(temperature.is_finite() && humidity.is_finite()) {
        return Err(LiveWeatherError::Payload("non-finite temperature or humidity".to_string()));
    }

    let date = parsed
        .dt
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map_or(today, |t| t.date_naive());

    Ok(LiveObservation {
        date,
        temperature,
        humidity,
        rainfall: parsed.rain.and_then(|r| r.one_hour).filter(|v| v.is_finite()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()
    }

    #[test]
    fn parses_temperature_humidity_and_rain() {
        let body = r#"{"main":{"temp":30.4,"humidity":84,"pressure":1002},"rain":{"1h":2.5},"dt":1752537600}"#;
        let live = parse_current(body, today()).unwrap();
        assert_eq!(live.temperature, 30.4);
        assert_eq!(live.humidity, 84.0);
        assert_eq!(live.rainfall, Some(2.5));
        assert_eq!(live.date, NaiveDate::from_ymd_opt(2025, 7, 15).unwrap());
    }

    #[test]
    fn missing_rain_block_is_none_and_missing_dt_uses_today() {
        let body = r#"{"main":{"temp":26.0,"humidity":70}}"#;
        let live = parse_current(body, today()).unwrap();
        assert_eq!(live.rainfall, None);
        assert_eq!(live.date, today());
    }

    #[test]
    fn malformed_payload_is_an_error_not_a_zero_reading() {
        let err = parse_current(r#"{"weather":[]}"#, today()).unwrap_err();
        assert!(matches!(err, LiveWeatherError::Payload(_)));
    }

    /// Serve one canned HTTP response on a local port; returns the base URL
    /// and a handle yielding the raw request line.
    fn serve_once(status: &'static str, body: &'static str) -> (String, std::thread::JoinHandle<String>) {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/weather", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
            }
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            request_line
        });
        (url, handle)
    }

    #[test]
    fn client_queries_metric_units_for_the_location() {
        let (url, server) = serve_once("200 OK", r#"{"main":{"temp":29.5,"humidity":81},"dt":1752537600}"#);
        let client = OpenWeatherClient::new("test-key", Duration::from_secs(5))
            .unwrap()
            .with_base_url(url);

        let live = client.current(Coordinates { lat: 23.5, lon: 90.25 }).unwrap();
        assert_eq!(live.temperature, 29.5);
        assert_eq!(live.humidity, 81.0);
        assert_eq!(live.date, today());

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /weather?"));
        assert!(request.contains("lat=23.5"));
        assert!(request.contains("lon=90.25"));
        assert!(request.contains("appid=test-key"));
        assert!(request.contains("units=metric"));
    }

    #[test]
    fn client_reports_http_status_failures() {
        let (url, server) = serve_once("401 Unauthorized", r#"{"cod":401}"#);
        let client = OpenWeatherClient::new("bad-key", Duration::from_secs(5))
            .unwrap()
            .with_base_url(url);

        let err = client.current(Coordinates::default()).unwrap_err();
        assert_eq!(err, LiveWeatherError::Status(401));
        server.join().unwrap();
    }

    #[test]
    fn static_reading_returns_its_observation() {
        let obs = LiveObservation {
            date: today(),
            temperature: 29.0,
            humidity: 90.0,
            rainfall: None,
        };
        let src = StaticReading(obs.clone());
        assert_eq!(src.current(Coordinates::default()).unwrap(), obs);
    }
}

//! AccuWeather adapter.
//!
//! Two requests per fetch: a location lookup for the AccuWeather location
//! key, then the 5-day daily forecast. The daily endpoint has no current
//! conditions, so they are approximated from the first forecast day.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::{
    error::FetchError,
    model::{WeatherQuery, WeatherSnapshot},
    normalize::{self, DEFAULT_VISIBILITY_M, DaySummary, Reading, codes, units},
    provider::{ProviderAdapter, ProviderDescriptor, ProviderKind, get_json},
};

const DEFAULT_HUMIDITY: f64 = 50.0;
const DEFAULT_PRESSURE_MB: f64 = 1013.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct AccuWeatherAdapter;

impl AccuWeatherAdapter {
    async fn lookup_location(
        &self,
        http: &Client,
        provider: &ProviderDescriptor,
        query: &WeatherQuery,
        api_key: &str,
    ) -> Result<Value, FetchError> {
        match query.coordinates() {
            Some(coords) => {
                let url = format!("{}/locations/v1/cities/geoposition/search", provider.base_url());
                let request =
                    http.get(url).query(&[("q", coords.to_string().as_str()), ("apikey", api_key)]);
                get_json(request).await
            }
            None => {
                let url = format!("{}/locations/v1/cities/search", provider.base_url());
                let request =
                    http.get(url).query(&[("q", query.location.as_str()), ("apikey", api_key)]);
                let found = get_json(request).await?;
                found
                    .as_array()
                    .and_then(|matches| matches.first())
                    .cloned()
                    .ok_or_else(|| FetchError::UnsupportedLocation(query.location.clone()))
            }
        }
    }
}

#[async_trait]
impl ProviderAdapter for AccuWeatherAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AccuWeather
    }

    async fn fetch(
        &self,
        http: &Client,
        provider: &ProviderDescriptor,
        query: &WeatherQuery,
    ) -> Result<Value, FetchError> {
        let api_key = provider.require_api_key()?;

        let location = self.lookup_location(http, provider, query, api_key).await?;
        let key = location
            .get("Key")
            .and_then(Value::as_str)
            .ok_or(FetchError::MissingField("Key"))?;

        let url = format!("{}/forecasts/v1/daily/5day/{}", provider.base_url(), key);
        let request = http.get(url).query(&[
            ("apikey", api_key),
            ("metric", "true"),
            ("details", "true"),
        ]);
        let mut forecast = get_json(request).await?;

        // Keep the resolved location next to the forecast for the request echo.
        if let Some(obj) = forecast.as_object_mut() {
            obj.insert("Location".to_string(), location);
        }
        Ok(forecast)
    }

    fn normalize(&self, raw: &Value, days: usize) -> Option<WeatherSnapshot> {
        normalize(raw, days)
    }
}

pub fn normalize(raw: &Value, days: usize) -> Option<WeatherSnapshot> {
    let forecasts = normalize::array(raw, &["DailyForecasts"]);
    let first = forecasts.first()?;

    let weather = forecasts.iter().take(days).map(|d| day(d).into_daily()).collect();

    let query = format!(
        "{},{}",
        normalize::num(raw, &["Location", "GeoPosition", "Latitude"]),
        normalize::num(raw, &["Location", "GeoPosition", "Longitude"])
    );

    Some(WeatherSnapshot::new(query, current(first).into_current(), weather))
}

/// Temperature object `{"Value": .., "Unit": "C"|"F"}` in °C.
fn celsius(data: &Value, path: &[&str]) -> Option<f64> {
    let temp = normalize::at(data, path)?;
    let value = normalize::opt_num(temp, &["Value"])?;
    Some(match normalize::str_or(temp, &["Unit"], "C") {
        "F" => units::f_to_c(value),
        _ => value,
    })
}

fn wind_kmh(data: &Value) -> f64 {
    let speed = normalize::at(data, &["Day", "Wind", "Speed"]).unwrap_or(&Value::Null);
    let value = normalize::num(speed, &["Value"]);
    match normalize::str_or(speed, &["Unit"], "km/h") {
        "mi/h" => units::mph_to_kmh(value),
        "m/s" => units::mps_to_kmh(value),
        _ => value,
    }
}

fn uv_index(data: &Value) -> f64 {
    normalize::array(data, &["AirAndPollen"])
        .iter()
        .find(|entry| normalize::str_or(entry, &["Name"], "") == "UVIndex")
        .map(|entry| normalize::num(entry, &["Value"]))
        .unwrap_or(0.0)
}

fn temperatures(data: &Value) -> (f64, f64, f64) {
    let max = celsius(data, &["Temperature", "Maximum"]).unwrap_or(0.0);
    let min = celsius(data, &["Temperature", "Minimum"]).unwrap_or(0.0);
    (max, min, (max + min) / 2.0)
}

fn current(data: &Value) -> Reading {
    let (_, _, avg) = temperatures(data);
    let phrase = normalize::at(data, &["Day", "IconPhrase"])
        .or_else(|| data.get("IconPhrase"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Reading {
        temp_c: avg,
        code: codes::from_accuweather(normalize::num(data, &["Day", "Icon"]) as i64),
        description: phrase,
        wind_kmh: wind_kmh(data),
        wind_degree: normalize::num(data, &["Day", "Wind", "Direction", "Degrees"]),
        wind_point: normalize::at(data, &["Day", "Wind", "Direction", "English"])
            .and_then(Value::as_str)
            .map(str::to_string),
        precip_mm: normalize::num(data, &["Day", "TotalLiquid", "Value"]),
        humidity: normalize::num_or(data, &["Day", "RelativeHumidity", "Average"], DEFAULT_HUMIDITY),
        pressure: DEFAULT_PRESSURE_MB,
        visibility_m: DEFAULT_VISIBILITY_M,
        cloudcover: normalize::num(data, &["Day", "CloudCover"]),
        feels_like_c: celsius(data, &["RealFeelTemperature", "Maximum"]).unwrap_or(avg),
        uv_index: uv_index(data),
        ..Default::default()
    }
}

fn day(data: &Value) -> DaySummary {
    let (max_c, min_c, avg_c) = temperatures(data);

    let snow = normalize::at(data, &["Day", "Snow"]).unwrap_or(&Value::Null);
    let snow_cm = match normalize::str_or(snow, &["Unit"], "cm") {
        "in" => normalize::num(snow, &["Value"]) * 2.54,
        _ => normalize::num(snow, &["Value"]),
    };

    DaySummary {
        date: normalize::str_or(data, &["Date"], "").chars().take(10).collect(),
        max_c,
        min_c,
        avg_c,
        snow_cm,
        sun_hours: normalize::opt_num(data, &["HoursOfSun"]),
        uv_index: uv_index(data),
        ..Default::default()
    }
}

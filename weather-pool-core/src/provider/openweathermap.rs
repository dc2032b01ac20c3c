//! OpenWeatherMap One Call adapter. Requires an API key and `lat,lon`
//! locations; values are requested in metric units.

use async_trait::async_trait;
use chrono::{DateTime, Timelike};
use reqwest::Client;
use serde_json::Value;

use crate::{
    error::FetchError,
    model::{WeatherQuery, WeatherSnapshot},
    normalize::{self, DEFAULT_VISIBILITY_M, DaySummary, Reading, codes, units},
    provider::{ProviderAdapter, ProviderDescriptor, ProviderKind, get_json},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenWeatherMapAdapter;

#[async_trait]
impl ProviderAdapter for OpenWeatherMapAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenWeatherMap
    }

    async fn fetch(
        &self,
        http: &Client,
        provider: &ProviderDescriptor,
        query: &WeatherQuery,
    ) -> Result<Value, FetchError> {
        let api_key = provider.require_api_key()?;
        let coords = query
            .coordinates()
            .ok_or_else(|| FetchError::UnsupportedLocation(query.location.clone()))?;

        let url = format!("{}/onecall", provider.base_url());
        let request = http.get(url).query(&[
            ("lat", coords.lat.to_string().as_str()),
            ("lon", coords.lon.to_string().as_str()),
            ("exclude", "minutely"),
            ("units", "metric"),
            ("appid", api_key),
        ]);

        get_json(request).await
    }

    fn normalize(&self, raw: &Value, days: usize) -> Option<WeatherSnapshot> {
        normalize(raw, days)
    }
}

pub fn normalize(raw: &Value, days: usize) -> Option<WeatherSnapshot> {
    let current = raw.get("current").filter(|v| v.is_object())?;
    let offset = normalize::num(raw, &["timezone_offset"]) as i64;

    let hourly = normalize::array(raw, &["hourly"]);
    let weather = normalize::array(raw, &["daily"])
        .iter()
        .take(days)
        .map(|d| day(d, hourly, offset).into_daily())
        .collect();

    let query = format!("{},{}", normalize::num(raw, &["lat"]), normalize::num(raw, &["lon"]));

    Some(WeatherSnapshot::new(query, reading(current).into_current(), weather))
}

fn reading(data: &Value) -> Reading {
    let temp_c = normalize::num(data, &["temp"]);
    let condition = normalize::array(data, &["weather"]).first().unwrap_or(&Value::Null);
    let description = normalize::str_or(condition, &["description"], "");

    Reading {
        temp_c,
        code: codes::from_openweathermap(normalize::num_or(condition, &["id"], 800.0) as i64),
        description: (!description.is_empty()).then(|| normalize::capitalize(description)),
        wind_kmh: units::mps_to_kmh(normalize::num(data, &["wind_speed"])),
        wind_degree: normalize::num(data, &["wind_deg"]),
        precip_mm: normalize::num(data, &["rain", "1h"]) + normalize::num(data, &["snow", "1h"]),
        humidity: normalize::num(data, &["humidity"]),
        pressure: normalize::num(data, &["pressure"]),
        visibility_m: normalize::num_or(data, &["visibility"], DEFAULT_VISIBILITY_M),
        cloudcover: normalize::num(data, &["clouds"]),
        feels_like_c: normalize::num_or(data, &["feels_like"], temp_c),
        uv_index: normalize::num(data, &["uvi"]),
        ..Default::default()
    }
}

/// `YYYY-MM-DD` and hour of day for a unix timestamp shifted by the location's offset.
fn local_date_hour(ts: i64, offset: i64) -> Option<(String, u32)> {
    let local = DateTime::from_timestamp(ts.checked_add(offset)?, 0)?;
    Some((local.format("%Y-%m-%d").to_string(), local.hour()))
}

fn day(data: &Value, hourly: &[Value], offset: i64) -> DaySummary {
    let date = local_date_hour(normalize::num(data, &["dt"]) as i64, offset)
        .map(|(d, _)| d)
        .unwrap_or_default();

    let sunrise = normalize::num(data, &["sunrise"]);
    let sunset = normalize::num(data, &["sunset"]);
    let sun_hours = (sunrise > 0.0 && sunset > sunrise).then(|| (sunset - sunrise) / 3600.0);

    let hourly = hourly
        .iter()
        .filter_map(|h| {
            let (d, hour) = local_date_hour(normalize::num(h, &["dt"]) as i64, offset)?;
            (d == date).then(|| reading(h).into_hourly((hour * 100).to_string()))
        })
        .collect();

    DaySummary {
        max_c: normalize::num(data, &["temp", "max"]),
        min_c: normalize::num(data, &["temp", "min"]),
        avg_c: normalize::num(data, &["temp", "day"]),
        // One Call reports snow in millimetres.
        snow_cm: normalize::num(data, &["snow"]) / 10.0,
        sun_hours,
        uv_index: normalize::num(data, &["uvi"]),
        hourly,
        date,
        ..Default::default()
    }
}

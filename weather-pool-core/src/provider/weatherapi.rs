//! WeatherAPI.com forecast adapter. Accepts free-text locations as well as
//! `lat,lon`, and reports both unit systems, so most paired values are
//! taken as-is.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::{
    error::FetchError,
    model::{WeatherQuery, WeatherSnapshot},
    normalize::{self, DEFAULT_VISIBILITY_M, DaySummary, Reading, codes},
    provider::{ProviderAdapter, ProviderDescriptor, ProviderKind, get_json},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherApiAdapter;

#[async_trait]
impl ProviderAdapter for WeatherApiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::WeatherApi
    }

    async fn fetch(
        &self,
        http: &Client,
        provider: &ProviderDescriptor,
        query: &WeatherQuery,
    ) -> Result<Value, FetchError> {
        let api_key = provider.require_api_key()?;
        let url = format!("{}/forecast.json", provider.base_url());

        let request = http.get(url).query(&[
            ("q", query.location.as_str()),
            ("days", query.days.to_string().as_str()),
            ("key", api_key),
        ]);

        get_json(request).await
    }

    fn normalize(&self, raw: &Value, days: usize) -> Option<WeatherSnapshot> {
        normalize(raw, days)
    }
}

pub fn normalize(raw: &Value, days: usize) -> Option<WeatherSnapshot> {
    let current = raw.get("current").filter(|v| v.is_object())?;
    let location = raw.get("location").filter(|v| v.is_object())?;

    let weather = normalize::array(raw, &["forecast", "forecastday"])
        .iter()
        .take(days)
        .map(|d| day(d).into_daily())
        .collect();

    let query = format!(
        "{},{}",
        normalize::num(location, &["lat"]),
        normalize::num(location, &["lon"])
    );

    Some(WeatherSnapshot::new(query, reading(current).into_current(), weather))
}

fn reading(data: &Value) -> Reading {
    let temp_c = normalize::num(data, &["temp_c"]);
    let description = normalize::str_or(data, &["condition", "text"], "");

    Reading {
        temp_c,
        temp_f: normalize::opt_num(data, &["temp_f"]),
        code: codes::from_weatherapi(normalize::num_or(data, &["condition", "code"], 1000.0) as i64),
        description: (!description.is_empty()).then(|| description.to_string()),
        wind_kmh: normalize::num(data, &["wind_kph"]),
        wind_mph: normalize::opt_num(data, &["wind_mph"]),
        wind_degree: normalize::num(data, &["wind_degree"]),
        wind_point: normalize::at(data, &["wind_dir"]).and_then(Value::as_str).map(str::to_string),
        precip_mm: normalize::num(data, &["precip_mm"]),
        humidity: normalize::num(data, &["humidity"]),
        pressure: normalize::num(data, &["pressure_mb"]),
        visibility_m: normalize::opt_num(data, &["vis_km"])
            .map(|km| km * 1000.0)
            .unwrap_or(DEFAULT_VISIBILITY_M),
        cloudcover: normalize::num(data, &["cloud"]),
        feels_like_c: normalize::num_or(data, &["feelslike_c"], temp_c),
        uv_index: normalize::num(data, &["uv"]),
    }
}

fn day(data: &Value) -> DaySummary {
    let summary = data.get("day").unwrap_or(&Value::Null);

    let fahrenheit = match (
        normalize::opt_num(summary, &["maxtemp_f"]),
        normalize::opt_num(summary, &["mintemp_f"]),
        normalize::opt_num(summary, &["avgtemp_f"]),
    ) {
        (Some(max), Some(min), Some(avg)) => Some((max, min, avg)),
        _ => None,
    };

    let sun_hours = normalize::sun_hours_between(
        normalize::str_or(data, &["astro", "sunrise"], ""),
        normalize::str_or(data, &["astro", "sunset"], ""),
    );

    let hourly = normalize::array(data, &["hour"])
        .iter()
        .map(|h| {
            // "2024-06-01 13:00" -> "1300"
            let time = normalize::str_or(h, &["time"], "");
            let hhmm: String = time.get(11..).unwrap_or("").chars().filter(char::is_ascii_digit).collect();
            let hhmm = hhmm.trim_start_matches('0');
            reading(h).into_hourly(if hhmm.is_empty() { "0" } else { hhmm })
        })
        .collect();

    DaySummary {
        date: normalize::str_or(data, &["date"], "").to_string(),
        max_c: normalize::num(summary, &["maxtemp_c"]),
        min_c: normalize::num(summary, &["mintemp_c"]),
        avg_c: normalize::num(summary, &["avgtemp_c"]),
        fahrenheit,
        snow_cm: normalize::num(summary, &["totalsnow_cm"]),
        sun_hours,
        uv_index: normalize::num(summary, &["uv"]),
        hourly,
    }
}

//! MET Norway locationforecast adapter. Needs no credential; only accepts
//! `lat,lon` locations.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::{
    error::FetchError,
    model::{DailyForecast, WeatherQuery, WeatherSnapshot},
    normalize::{self, DEFAULT_VISIBILITY_M, DaySummary, Reading, codes, units},
    provider::{ProviderAdapter, ProviderDescriptor, ProviderKind, get_json},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetnoAdapter;

#[async_trait]
impl ProviderAdapter for MetnoAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Metno
    }

    async fn fetch(
        &self,
        http: &Client,
        provider: &ProviderDescriptor,
        query: &WeatherQuery,
    ) -> Result<Value, FetchError> {
        let coords = query
            .coordinates()
            .ok_or_else(|| FetchError::UnsupportedLocation(query.location.clone()))?;

        let url = format!("{}/weatherapi/locationforecast/2.0/complete", provider.base_url());
        let request = http
            .get(url)
            .query(&[("lat", coords.lat.to_string()), ("lon", coords.lon.to_string())]);

        get_json(request).await
    }

    fn normalize(&self, raw: &Value, days: usize) -> Option<WeatherSnapshot> {
        normalize(raw, days)
    }
}

pub fn normalize(raw: &Value, days: usize) -> Option<WeatherSnapshot> {
    let series = normalize::array(raw, &["properties", "timeseries"]);
    let first = series.first()?;

    let current = reading(first).into_current();

    let mut summaries: Vec<(String, Vec<&Value>)> = Vec::new();
    for entry in series {
        let date: String = normalize::str_or(entry, &["time"], "").chars().take(10).collect();
        if date.len() != 10 {
            continue;
        }
        match summaries.last_mut() {
            Some((d, entries)) if *d == date => entries.push(entry),
            _ => {
                if summaries.len() == days {
                    break;
                }
                summaries.push((date, vec![entry]));
            }
        }
    }

    let weather: Vec<DailyForecast> =
        summaries.into_iter().map(|(date, entries)| day(date, &entries)).collect();

    let query = coordinates_echo(raw).unwrap_or_default();

    Some(WeatherSnapshot::new(query, current, normalize::take_days(weather, days)))
}

fn coordinates_echo(raw: &Value) -> Option<String> {
    let coords = normalize::at(raw, &["geometry", "coordinates"])?.as_array()?;
    let lon = coords.first()?.as_f64()?;
    let lat = coords.get(1)?.as_f64()?;
    Some(format!("{lat},{lon}"))
}

fn details(entry: &Value) -> &Value {
    normalize::at(entry, &["data", "instant", "details"]).unwrap_or(&Value::Null)
}

fn symbol(entry: &Value) -> &str {
    ["next_1_hours", "next_6_hours", "next_12_hours"]
        .iter()
        .find_map(|&period| {
            normalize::at(entry, &["data", period, "summary", "symbol_code"]).and_then(Value::as_str)
        })
        .unwrap_or("clearsky_day")
}

fn precipitation(entry: &Value) -> f64 {
    ["next_1_hours", "next_6_hours"]
        .iter()
        .find_map(|&period| {
            normalize::opt_num(entry, &["data", period, "details", "precipitation_amount"])
        })
        .unwrap_or(0.0)
}

fn reading(entry: &Value) -> Reading {
    let d = details(entry);
    let temp_c = normalize::num(d, &["air_temperature"]);
    Reading {
        temp_c,
        code: codes::from_metno(symbol(entry)),
        wind_kmh: units::mps_to_kmh(normalize::num(d, &["wind_speed"])),
        wind_degree: normalize::num(d, &["wind_from_direction"]),
        precip_mm: precipitation(entry),
        humidity: normalize::num(d, &["relative_humidity"]),
        pressure: normalize::num(d, &["air_pressure_at_sea_level"]),
        visibility_m: DEFAULT_VISIBILITY_M,
        cloudcover: normalize::num(d, &["cloud_area_fraction"]),
        feels_like_c: temp_c,
        uv_index: normalize::num(d, &["ultraviolet_index_clear_sky"]),
        ..Default::default()
    }
}

fn day(date: String, entries: &[&Value]) -> DailyForecast {
    let temps: Vec<f64> = entries
        .iter()
        .filter_map(|e| normalize::opt_num(details(e), &["air_temperature"]))
        .collect();

    let (max_c, min_c, avg_c) = if temps.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let max = temps.iter().copied().fold(f64::MIN, f64::max);
        let min = temps.iter().copied().fold(f64::MAX, f64::min);
        (max, min, temps.iter().sum::<f64>() / temps.len() as f64)
    };

    let uv_index = entries
        .iter()
        .map(|e| normalize::num(details(e), &["ultraviolet_index_clear_sky"]))
        .fold(0.0, f64::max);

    let hourly = entries
        .iter()
        .map(|e| {
            let time = normalize::str_or(e, &["time"], "");
            let hour: u32 = time.get(11..13).and_then(|h| h.parse().ok()).unwrap_or(0);
            reading(e).into_hourly((hour * 100).to_string())
        })
        .collect();

    DaySummary { date, max_c, min_c, avg_c, uv_index, hourly, ..Default::default() }.into_daily()
}

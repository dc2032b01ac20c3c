//! Shared building blocks for the per-provider normalizers.
//!
//! Provider payloads are read as loosely-typed JSON so that a missing or
//! mistyped optional field falls back to a default instead of failing the
//! whole document. Only the structurally required top-level fields are
//! checked by each adapter.

use serde_json::Value;

use crate::model::{CurrentCondition, DailyForecast, HourlyDetail, TextValue};

pub mod codes;
pub mod units;

/// Sun hours reported when a provider gives no sunrise/sunset data.
pub const DEFAULT_SUN_HOURS: f64 = 12.0;
/// Visibility in metres reported when a provider omits it.
pub const DEFAULT_VISIBILITY_M: f64 = 10_000.0;

/// One point-in-time observation in provider-neutral units.
///
/// `temp_f`, `wind_mph`, `wind_point` and `description` are taken from the
/// provider when it sends them and derived otherwise.
#[derive(Debug, Clone, Default)]
pub struct Reading {
    pub temp_c: f64,
    pub temp_f: Option<f64>,
    pub code: u16,
    pub description: Option<String>,
    pub wind_kmh: f64,
    pub wind_mph: Option<f64>,
    pub wind_degree: f64,
    pub wind_point: Option<String>,
    pub precip_mm: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub visibility_m: f64,
    pub cloudcover: f64,
    pub feels_like_c: f64,
    pub uv_index: f64,
}

impl Reading {
    fn temp_f_text(&self) -> String {
        units::whole(self.temp_f.unwrap_or_else(|| units::c_to_f(self.temp_c)))
    }

    fn wind_mph_text(&self) -> String {
        units::whole(self.wind_mph.unwrap_or_else(|| units::kmh_to_mph(self.wind_kmh)))
    }

    fn wind_point_text(&self) -> String {
        match &self.wind_point {
            Some(p) if !p.is_empty() => p.clone(),
            _ => units::compass_16(self.wind_degree).to_string(),
        }
    }

    fn description_value(&self) -> Vec<TextValue> {
        let text = match &self.description {
            Some(d) if !d.trim().is_empty() => d.trim().to_string(),
            _ => codes::description(self.code).to_string(),
        };
        vec![TextValue::new(text)]
    }

    pub fn into_current(self) -> CurrentCondition {
        CurrentCondition {
            temp_c: units::whole(self.temp_c),
            temp_f: self.temp_f_text(),
            weather_code: self.code.to_string(),
            weather_desc: self.description_value(),
            windspeed_kmph: units::whole(self.wind_kmh),
            windspeed_miles: self.wind_mph_text(),
            winddir_degree: units::measure(self.wind_degree),
            winddir_16_point: self.wind_point_text(),
            precip_mm: units::measure(self.precip_mm),
            humidity: units::measure(self.humidity),
            pressure: units::measure(self.pressure),
            visibility: units::measure(self.visibility_m),
            cloudcover: units::measure(self.cloudcover),
            feels_like_c: units::whole(self.feels_like_c),
            uv_index: units::index(self.uv_index),
        }
    }

    pub fn into_hourly(self, time: impl Into<String>) -> HourlyDetail {
        HourlyDetail {
            time: time.into(),
            temp_c: units::whole(self.temp_c),
            temp_f: self.temp_f_text(),
            weather_code: self.code.to_string(),
            weather_desc: self.description_value(),
            windspeed_kmph: units::whole(self.wind_kmh),
            windspeed_miles: self.wind_mph_text(),
            winddir_degree: units::measure(self.wind_degree),
            winddir_16_point: self.wind_point_text(),
            precip_mm: units::measure(self.precip_mm),
            humidity: units::measure(self.humidity),
        }
    }
}

/// One forecast day in provider-neutral units.
#[derive(Debug, Clone, Default)]
pub struct DaySummary {
    pub date: String,
    pub max_c: f64,
    pub min_c: f64,
    pub avg_c: f64,
    /// Provider-supplied Fahrenheit values as `(max, min, avg)`.
    pub fahrenheit: Option<(f64, f64, f64)>,
    pub snow_cm: f64,
    pub sun_hours: Option<f64>,
    pub uv_index: f64,
    pub hourly: Vec<HourlyDetail>,
}

impl DaySummary {
    pub fn into_daily(self) -> DailyForecast {
        let (max_f, min_f, avg_f) = self.fahrenheit.unwrap_or_else(|| {
            (units::c_to_f(self.max_c), units::c_to_f(self.min_c), units::c_to_f(self.avg_c))
        });
        DailyForecast {
            date: self.date,
            maxtemp_c: units::whole(self.max_c),
            maxtemp_f: units::whole(max_f),
            mintemp_c: units::whole(self.min_c),
            mintemp_f: units::whole(min_f),
            avgtemp_c: units::whole(self.avg_c),
            avgtemp_f: units::whole(avg_f),
            total_snow_cm: units::measure(self.snow_cm),
            sun_hour: units::measure(self.sun_hours.unwrap_or(DEFAULT_SUN_HOURS)),
            uv_index: units::index(self.uv_index),
            hourly: self.hourly,
        }
    }
}

/// Hours between two times of day given as `"05:43 AM"`-style strings.
pub fn sun_hours_between(sunrise: &str, sunset: &str) -> Option<f64> {
    let rise = chrono::NaiveTime::parse_from_str(sunrise.trim(), "%I:%M %p").ok()?;
    let set = chrono::NaiveTime::parse_from_str(sunset.trim(), "%I:%M %p").ok()?;
    let minutes = (set - rise).num_minutes();
    (minutes > 0).then(|| minutes as f64 / 60.0)
}

/// Walks `path` through nested objects.
pub fn at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(*key))
}

/// Numeric field at `path`, or `default` when absent or not a number.
pub fn num_or(value: &Value, path: &[&str], default: f64) -> f64 {
    at(value, path).and_then(Value::as_f64).unwrap_or(default)
}

pub fn num(value: &Value, path: &[&str]) -> f64 {
    num_or(value, path, 0.0)
}

pub fn opt_num(value: &Value, path: &[&str]) -> Option<f64> {
    at(value, path).and_then(Value::as_f64)
}

pub fn str_or<'a>(value: &'a Value, path: &[&str], default: &'a str) -> &'a str {
    at(value, path).and_then(Value::as_str).unwrap_or(default)
}

/// Array at `path`, empty when absent.
pub fn array<'a>(value: &'a Value, path: &[&str]) -> &'a [Value] {
    at(value, path).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

/// Keeps at most `days` entries, preserving order.
pub fn take_days<T>(mut items: Vec<T>, days: usize) -> Vec<T> {
    items.truncate(days);
    items
}

/// First letter upper-cased, the rest untouched.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

use serde::{Deserialize, Serialize};

/// Number of forecast days returned when the caller does not ask for a horizon.
pub const DEFAULT_FORECAST_DAYS: usize = 3;

/// A single weather lookup: where, and how many forecast days to keep.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherQuery {
    pub location: String,
    pub days: usize,
}

impl WeatherQuery {
    pub fn new(location: impl Into<String>) -> Self {
        Self { location: location.into(), days: DEFAULT_FORECAST_DAYS }
    }

    pub fn with_days(mut self, days: usize) -> Self {
        self.days = days;
        self
    }

    /// Parses the location as `"lat,lon"`, if it is one.
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::parse(&self.location)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn parse(s: &str) -> Option<Self> {
        let (lat, lon) = s.split_once(',')?;
        let lat: f64 = lat.trim().parse().ok()?;
        let lon: f64 = lon.trim().parse().ok()?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Self { lat, lon })
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// `{"value": "..."}` wrapper used for descriptions in the canonical schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextValue {
    pub value: String,
}

impl TextValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEcho {
    #[serde(rename = "type")]
    pub kind: String,
    pub query: String,
}

impl RequestEcho {
    pub fn feature(query: impl Into<String>) -> Self {
        Self { kind: "feature".to_string(), query: query.into() }
    }
}

/// Current conditions. Every numeric display field is carried as text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CurrentCondition {
    #[serde(rename = "temp_C")]
    pub temp_c: String,
    #[serde(rename = "temp_F")]
    pub temp_f: String,
    #[serde(rename = "weatherCode")]
    pub weather_code: String,
    #[serde(rename = "weatherDesc")]
    pub weather_desc: Vec<TextValue>,
    #[serde(rename = "windspeedKmph")]
    pub windspeed_kmph: String,
    #[serde(rename = "windspeedMiles")]
    pub windspeed_miles: String,
    #[serde(rename = "winddirDegree")]
    pub winddir_degree: String,
    #[serde(rename = "winddir16Point")]
    pub winddir_16_point: String,
    #[serde(rename = "precipMM")]
    pub precip_mm: String,
    pub humidity: String,
    pub pressure: String,
    pub visibility: String,
    pub cloudcover: String,
    #[serde(rename = "FeelsLikeC")]
    pub feels_like_c: String,
    #[serde(rename = "uvIndex")]
    pub uv_index: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HourlyDetail {
    pub time: String,
    #[serde(rename = "tempC")]
    pub temp_c: String,
    #[serde(rename = "tempF")]
    pub temp_f: String,
    #[serde(rename = "weatherCode")]
    pub weather_code: String,
    #[serde(rename = "weatherDesc")]
    pub weather_desc: Vec<TextValue>,
    #[serde(rename = "windspeedKmph")]
    pub windspeed_kmph: String,
    #[serde(rename = "windspeedMiles")]
    pub windspeed_miles: String,
    #[serde(rename = "winddirDegree")]
    pub winddir_degree: String,
    #[serde(rename = "winddir16Point")]
    pub winddir_16_point: String,
    #[serde(rename = "precipMM")]
    pub precip_mm: String,
    pub humidity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: String,
    #[serde(rename = "maxtempC")]
    pub maxtemp_c: String,
    #[serde(rename = "maxtempF")]
    pub maxtemp_f: String,
    #[serde(rename = "mintempC")]
    pub mintemp_c: String,
    #[serde(rename = "mintempF")]
    pub mintemp_f: String,
    #[serde(rename = "avgtempC")]
    pub avgtemp_c: String,
    #[serde(rename = "avgtempF")]
    pub avgtemp_f: String,
    #[serde(rename = "totalSnow_cm")]
    pub total_snow_cm: String,
    #[serde(rename = "sunHour")]
    pub sun_hour: String,
    #[serde(rename = "uvIndex")]
    pub uv_index: String,
    pub hourly: Vec<HourlyDetail>,
}

/// The canonical, provider-independent weather record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub request: Vec<RequestEcho>,
    pub current_condition: Vec<CurrentCondition>,
    pub weather: Vec<DailyForecast>,
}

impl WeatherSnapshot {
    pub fn new(query: impl Into<String>, current: CurrentCondition, weather: Vec<DailyForecast>) -> Self {
        Self {
            request: vec![RequestEcho::feature(query)],
            current_condition: vec![current],
            weather,
        }
    }

    pub fn current(&self) -> Option<&CurrentCondition> {
        self.current_condition.first()
    }

    /// Wraps the snapshot in the `{"data": ...}` envelope downstream renderers expect.
    pub fn to_envelope(&self) -> serde_json::Result<serde_json::Value> {
        Ok(serde_json::json!({ "data": serde_json::to_value(self)? }))
    }
}

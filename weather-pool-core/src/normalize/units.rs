//! Unit conversions and display formatting for the canonical schema.

pub const KMH_PER_MPS: f64 = 3.6;
pub const KMH_PER_MPH: f64 = 1.60934;

const COMPASS_16: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

pub fn mps_to_kmh(mps: f64) -> f64 {
    mps * KMH_PER_MPS
}

pub fn kmh_to_mph(kmh: f64) -> f64 {
    kmh / KMH_PER_MPH
}

pub fn mph_to_kmh(mph: f64) -> f64 {
    mph * KMH_PER_MPH
}

pub fn c_to_f(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn f_to_c(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

/// Wind direction in degrees to a 16-point compass label.
pub fn compass_16(degrees: f64) -> &'static str {
    let index = (degrees / 22.5).round() as i64;
    COMPASS_16[index.rem_euclid(16) as usize]
}

/// Rounded whole-number display text, e.g. `20.4` -> `"20"`.
pub fn whole(value: f64) -> String {
    let rounded = value.round() as i64;
    rounded.to_string()
}

/// Index text truncated toward zero, e.g. UV `3.7` -> `"3"`.
pub fn index(value: f64) -> String {
    (value.trunc() as i64).to_string()
}

/// Raw measurement text with at most two decimals, e.g. `0.25` -> `"0.25"`, `1013.0` -> `"1013"`.
pub fn measure(value: f64) -> String {
    let v = (value * 100.0).round() / 100.0;
    if v == 0.0 { "0".to_string() } else { v.to_string() }
}

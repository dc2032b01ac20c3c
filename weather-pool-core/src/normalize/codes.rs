//! Provider condition codes mapped into the WWO code space used by the
//! canonical schema. Every table is total: unknown inputs map to
//! [`CLEAR_SKY`].

pub const CLEAR_SKY: u16 = 113;

/// OpenWeatherMap condition id -> WWO code.
pub fn from_openweathermap(id: i64) -> u16 {
    match id {
        200 | 210 | 230 => 200,
        201 | 231 => 386,
        202 | 211 | 212 | 221 | 232 => 389,
        300 | 301 | 310 => 266,
        302 | 312 | 314 => 302,
        311 => 293,
        313 => 305,
        321 => 299,
        500 => 176,
        501 => 293,
        502 | 522 => 302,
        503 | 504 => 308,
        511 => 284,
        520 => 299,
        521 | 531 => 305,
        600 => 320,
        601 => 332,
        602 | 622 => 230,
        611 => 281,
        612 | 613 => 284,
        615 | 616 => 317,
        620 => 368,
        621 => 371,
        701 | 711 | 721 | 731 | 741 | 751 | 761 | 762 | 771 | 781 => 143,
        800 => 113,
        801 => 116,
        802 | 803 => 119,
        804 => 122,
        _ => CLEAR_SKY,
    }
}

/// WeatherAPI.com condition code -> WWO code.
pub fn from_weatherapi(code: i64) -> u16 {
    match code {
        1000 => 113,
        1003 => 116,
        1006 => 119,
        1009 => 122,
        1030 => 143,
        1063 => 176,
        1066 => 179,
        1069 => 182,
        1072 => 185,
        1087 => 200,
        1114 => 227,
        1117 => 230,
        1135 => 248,
        1147 => 260,
        1150 => 263,
        1153 => 266,
        1168 => 281,
        1171 => 284,
        1180 => 293,
        1183 => 296,
        1186 => 299,
        1189 => 302,
        1192 => 305,
        1195 => 308,
        1198 => 311,
        1201 => 314,
        1204 => 317,
        1207 => 320,
        1210 => 323,
        1213 => 326,
        1216 => 329,
        1219 => 332,
        1222 => 335,
        1225 => 338,
        1237 => 350,
        1240 => 353,
        1243 => 356,
        1246 => 359,
        1249 => 362,
        1252 => 365,
        1255 => 368,
        1258 => 371,
        1261 => 374,
        1264 => 377,
        1273 => 386,
        1276 => 389,
        1279 => 392,
        1282 => 395,
        _ => CLEAR_SKY,
    }
}

/// MET Norway symbol code (e.g. `"partlycloudy_night"`) -> WWO code.
pub fn from_metno(symbol: &str) -> u16 {
    let base = symbol
        .strip_suffix("_day")
        .or_else(|| symbol.strip_suffix("_night"))
        .or_else(|| symbol.strip_suffix("_polartwilight"))
        .unwrap_or(symbol);

    match base {
        "clearsky" => 113,
        "fair" | "partlycloudy" => 116,
        "cloudy" => 122,
        "fog" => 248,
        "lightrain" => 296,
        "rain" => 302,
        "heavyrain" => 308,
        "lightrainshowers" => 353,
        "rainshowers" => 356,
        "heavyrainshowers" => 359,
        "lightrainandthunder" | "lightrainshowersandthunder" => 386,
        "rainandthunder"
        | "heavyrainandthunder"
        | "rainshowersandthunder"
        | "heavyrainshowersandthunder" => 389,
        "lightsleet" => 317,
        "sleet" | "heavysleet" => 320,
        "lightsleetshowers" => 362,
        "sleetshowers" | "heavysleetshowers" => 365,
        "lightsnow" => 326,
        "snow" => 332,
        "heavysnow" => 338,
        "lightsnowshowers" => 368,
        "snowshowers" | "heavysnowshowers" => 371,
        // met.no spells two of these with a double "s".
        "lightsleetandthunder"
        | "sleetandthunder"
        | "lightsnowandthunder"
        | "sleetshowersandthunder"
        | "lightssleetshowersandthunder"
        | "lightssnowshowersandthunder" => 392,
        "heavysleetandthunder"
        | "snowandthunder"
        | "heavysnowandthunder"
        | "snowshowersandthunder"
        | "heavysnowshowersandthunder"
        | "heavysleetshowersandthunder" => 395,
        _ => CLEAR_SKY,
    }
}

/// AccuWeather icon number -> WWO code.
pub fn from_accuweather(icon: i64) -> u16 {
    match icon {
        1 | 2 | 30 | 31 | 32 | 33 | 34 => 113,
        3 | 4 | 35 | 36 => 116,
        5 | 37 => 143,
        6 | 7 | 38 => 119,
        8 => 122,
        11 => 248,
        12 => 356,
        13 | 14 | 39 | 40 => 353,
        15 => 389,
        16 | 17 | 41 | 42 => 386,
        18 => 302,
        19 => 323,
        20 | 21 | 43 => 368,
        22 => 332,
        23 | 44 => 371,
        24 => 311,
        25 => 317,
        26 => 314,
        29 => 320,
        _ => CLEAR_SKY,
    }
}

/// Human-readable text for a WWO code, for providers that send none.
pub fn description(code: u16) -> &'static str {
    match code {
        113 => "Clear",
        116 => "Partly cloudy",
        119 => "Cloudy",
        122 => "Overcast",
        143 => "Mist",
        176 => "Patchy rain possible",
        179 => "Patchy snow possible",
        182 => "Patchy sleet possible",
        185 => "Patchy freezing drizzle possible",
        200 => "Thundery outbreaks possible",
        227 => "Blowing snow",
        230 => "Blizzard",
        248 => "Fog",
        260 => "Freezing fog",
        263 => "Patchy light drizzle",
        266 => "Light drizzle",
        281 => "Freezing drizzle",
        284 => "Heavy freezing drizzle",
        293 => "Patchy light rain",
        296 => "Light rain",
        299 => "Moderate rain at times",
        302 => "Moderate rain",
        305 => "Heavy rain at times",
        308 => "Heavy rain",
        311 => "Light freezing rain",
        314 => "Moderate or heavy freezing rain",
        317 => "Light sleet",
        320 => "Moderate or heavy sleet",
        323 => "Patchy light snow",
        326 => "Light snow",
        329 => "Patchy moderate snow",
        332 => "Moderate snow",
        335 => "Patchy heavy snow",
        338 => "Heavy snow",
        350 => "Ice pellets",
        353 => "Light rain shower",
        356 => "Moderate or heavy rain shower",
        359 => "Torrential rain shower",
        362 => "Light sleet showers",
        365 => "Moderate or heavy sleet showers",
        368 => "Light snow showers",
        371 => "Moderate or heavy snow showers",
        374 => "Light showers of ice pellets",
        377 => "Moderate or heavy showers of ice pellets",
        386 => "Patchy light rain with thunder",
        389 => "Moderate or heavy rain with thunder",
        392 => "Patchy light snow with thunder",
        395 => "Moderate or heavy snow with thunder",
        _ => "Clear",
    }
}

//! Plain-text rendering of snapshots, AQI readings and errors.

use std::fmt::{self, Write};

use chrono::Local;

use airsky_core::{
    ErrorKind, WeatherError, WeatherSnapshot,
    aqi::{self, uv_level},
    model::{AqiProvenance, RecentSearchEntry, StationOverlay, UnitPreference, compass_point_name},
};

const HOURLY_STEP: usize = 3;

pub fn snapshot(
    out: &mut impl Write,
    snapshot: &WeatherSnapshot,
    units: UnitPreference,
) -> fmt::Result {
    let location = &snapshot.location;
    let current = &snapshot.current;

    writeln!(out, "{}", location.name)?;
    let subtitle = location.subtitle();
    if !subtitle.is_empty() {
        writeln!(out, "{subtitle}")?;
    }
    writeln!(
        out,
        "Updated {}",
        snapshot.fetched_at.with_timezone(&Local).format("%a %d %b, %H:%M")
    )?;
    writeln!(out)?;

    writeln!(
        out,
        "{}  {} (feels like {})",
        units.format_temperature(current.temperature_c, current.temperature_f),
        current.condition,
        units.format_temperature(current.feels_like_c, current.feels_like_f),
    )?;
    writeln!(out, "Humidity     {}%", current.humidity_pct)?;
    writeln!(out, "Wind         {}", wind(snapshot, units))?;
    writeln!(
        out,
        "Pressure     {}",
        units.format_pressure(current.pressure_mb, current.pressure_in)
    )?;
    writeln!(out, "UV           {} ({})", current.uv, uv_level(Some(current.uv)).label())?;
    writeln!(out)?;

    writeln!(out, "{}", aqi_line(snapshot.air_quality_index))?;
    writeln!(out, "Source       {}", source(snapshot))?;
    let pollutants = &snapshot.pollutants;
    for (label, value) in [
        ("PM2.5", pollutants.pm2_5),
        ("PM10", pollutants.pm10),
        ("O3", pollutants.o3),
        ("NO2", pollutants.no2),
        ("SO2", pollutants.so2),
        ("CO", pollutants.co),
    ] {
        if let Some(value) = value {
            writeln!(out, "  {label:<6} {value:.1} µg/m³")?;
        }
    }

    if let Some(today) = snapshot.forecast_days.first() {
        writeln!(out)?;
        writeln!(out, "Today (sunrise {}, sunset {})", today.sunrise, today.sunset)?;
        for hour in today.hours.iter().step_by(HOURLY_STEP) {
            let time = hour.time.rsplit(' ').next().unwrap_or(&hour.time);
            writeln!(
                out,
                "  {time}  {:>6}  {:>3}%  {}",
                units.format_temperature(hour.temperature_c, hour.temperature_f),
                hour.precipitation_chance,
                hour.condition,
            )?;
        }
    }

    if !snapshot.forecast_days.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}-day forecast", snapshot.forecast_days.len())?;
        for day in &snapshot.forecast_days {
            writeln!(
                out,
                "  {}  {:>6} / {:<6} {:>3}%  {}",
                day.date.format("%a %d"),
                units.format_temperature(day.max_c, day.max_f),
                units.format_temperature(day.min_c, day.min_f),
                day.precipitation_chance,
                day.condition,
            )?;
        }
    }

    Ok(())
}

pub fn aqi_line(index: Option<u16>) -> String {
    match index {
        Some(index) => {
            let category = aqi::classify(index);
            format!("AQI          {index} {} ({})", category.level, category.color_token)
        }
        None => "AQI          n/a".to_string(),
    }
}

fn wind(snapshot: &WeatherSnapshot, units: UnitPreference) -> String {
    let current = &snapshot.current;
    let direction = compass_point_name(&current.wind_dir).unwrap_or(current.wind_dir.as_str());
    format!(
        "{} from the {direction} ({}°)",
        units.format_wind(current.wind_kph, current.wind_mph),
        current.wind_degree
    )
}

fn source(snapshot: &WeatherSnapshot) -> String {
    let station = snapshot.location.monitoring_station_id;
    match (snapshot.location.aqi_provenance, snapshot.station_overlay, station) {
        (AqiProvenance::StationProvider, StationOverlay::Applied, Some(id)) => {
            format!("monitoring station #{id}")
        }
        (AqiProvenance::StationProvider, _, Some(id)) => {
            format!("general provider (station #{id} unavailable)")
        }
        _ => "general provider".to_string(),
    }
}

pub fn entry(entry: &RecentSearchEntry) -> String {
    let detail = [entry.region.as_str(), entry.country.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if detail.is_empty() { entry.name.clone() } else { format!("{} ({detail})", entry.name) }
}

pub fn error(err: &WeatherError) -> String {
    let hint = match err.kind() {
        ErrorKind::NotFound => "Check the spelling or try `airsky search`.",
        ErrorKind::NetworkFailure => "Is the backend reachable? See `airsky configure`.",
        _ => "",
    };
    if hint.is_empty() { format!("Error: {err}") } else { format!("Error: {err}\nHint: {hint}") }
}

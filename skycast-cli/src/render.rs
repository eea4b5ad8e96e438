//! Terminal render layer: a pure function from pipeline state to text.

use std::fmt::Write as _;

use skycast_core::{CurrentWeather, ForecastEntry, PipelineState, weekday_name};

/// Render one of the three views: spinner line, error line, or the
/// weather-plus-forecast display.
pub fn render(state: &PipelineState) -> String {
    match state {
        PipelineState::Loading => "Fetching weather...".to_string(),
        PipelineState::Failed { message } => message.clone(),
        PipelineState::Ready { current, daily } => render_ready(current, daily),
    }
}

fn render_ready(current: &CurrentWeather, daily: &[ForecastEntry]) -> String {
    let mut out = String::new();

    // writeln! into a String cannot fail
    let _ = writeln!(out, "{}", current.location_name);
    let _ = writeln!(
        out,
        "  {} {}°C  {}",
        condition_glyph(&current.icon),
        current.temperature_c.round(),
        current.condition
    );
    if !current.condition_detail.is_empty() {
        let _ = writeln!(out, "  {}", current.condition_detail);
    }
    let _ = writeln!(
        out,
        "  H: {}°  L: {}°",
        current.temperature_max_c.round(),
        current.temperature_min_c.round()
    );
    let _ = writeln!(
        out,
        "  Humidity {}%  Wind {:.1} m/s",
        current.humidity_pct, current.wind_speed_mps
    );

    if !daily.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "5-Day Forecast");
        for entry in daily {
            let _ = writeln!(
                out,
                "  {:<10} {} {:>3}° / {}°",
                weekday_name(entry.timestamp),
                condition_glyph(&entry.icon),
                entry.temperature_max_c.round(),
                entry.temperature_min_c.round()
            );
        }
    }

    out.trim_end().to_string()
}

/// Map the provider's icon code families onto terminal glyphs.
fn condition_glyph(icon: &str) -> &'static str {
    match icon.get(..2) {
        Some("01") => "☀",
        Some("02") => "⛅",
        Some("03") | Some("04") => "☁",
        Some("09") | Some("10") => "🌧",
        Some("11") => "⛈",
        Some("13") => "❄",
        Some("50") => "🌫",
        _ => "·",
    }
}

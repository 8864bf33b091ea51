//! Plain-text rendering of a [`ViewState`].

use chrono::{DateTime, Local};
use dashboard_core::{
    CurrentConditions, HourlyForecastEntry, Identity, Prediction, PredictionSlice, Slice,
    ViewState, model::LOADING,
};

pub fn render(vs: &ViewState, identity: &Identity) -> String {
    render_at(vs, identity, Local::now())
}

pub fn render_at(vs: &ViewState, identity: &Identity, now: DateTime<Local>) -> String {
    let mut lines = vec![format!(
        "Hello, {} - {}",
        identity.display_name,
        now.format("%A, %B %-d")
    )];

    match vs.coordinate {
        Some(coordinate) => lines.push(format!("{} ({coordinate})", vs.place_label())),
        None => lines.push(vs.place_label().to_string()),
    }
    if let Some(error) = &vs.error {
        lines.push(format!("Error: {error}"));
    }

    lines.push(String::new());
    match &vs.current {
        Slice::Pending => lines.push(format!("Now       {LOADING}")),
        Slice::Ready(current) => lines.extend(current_lines(current)),
        Slice::Failed(reason) => lines.push(format!("Now       unavailable ({reason})")),
    }

    let sun = vs.sun_times();
    lines.push(format!(
        "Sunrise   {:<10} Sunset {}",
        sun.sunrise_local, sun.sunset_local
    ));

    lines.push(String::new());
    lines.push("Next hours".to_string());
    match &vs.forecast {
        Slice::Pending => lines.push(format!("  {LOADING}")),
        Slice::Ready(entries) if entries.is_empty() => lines.push("  no data".to_string()),
        Slice::Ready(entries) => lines.extend(entries.iter().map(forecast_line)),
        Slice::Failed(_) => lines.push("  unavailable".to_string()),
    }

    match &vs.prediction {
        PredictionSlice::Absent => {}
        PredictionSlice::Predicting => {
            lines.push(String::new());
            lines.push("Predicting...".to_string());
        }
        PredictionSlice::Ready(prediction) => {
            lines.push(String::new());
            lines.push(prediction_line(prediction));
        }
        PredictionSlice::Unavailable => {
            lines.push(String::new());
            lines.push("Prediction unavailable".to_string());
        }
    }

    lines.join("\n")
}

fn current_lines(c: &CurrentConditions) -> Vec<String> {
    vec![
        format!("Now       {:.1}°C  {}", c.temperature_c, c.condition_label),
        format!(
            "Humidity  {}%  Wind {:.1} m/s @ {}°  Clouds {}%",
            c.humidity_pct, c.wind_speed_ms, c.wind_degrees, c.cloudiness_pct
        ),
        format!(
            "Precip    {:.1} mm  Pressure {:.0} hPa",
            c.precipitation_mm, c.pressure_hpa
        ),
    ]
}

fn forecast_line(entry: &HourlyForecastEntry) -> String {
    format!(
        "  {:>5}  {:>3}°C  {}",
        entry.time_label,
        entry.temperature_c,
        entry.condition_icon.as_str()
    )
}

fn prediction_line(p: &Prediction) -> String {
    let mut line = match p.temperature_c {
        Some(t) => format!("Predicted {t:.1}°C"),
        None => "Predicted --".to_string(),
    };
    if let Some(label) = &p.condition_label {
        line.push_str(&format!(", {label}"));
    }
    if let Some(confidence) = p.confidence {
        line.push_str(&format!(" (confidence {:.0}%)", confidence * 100.0));
    }
    line
}

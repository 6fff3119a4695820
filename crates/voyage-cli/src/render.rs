//! Plain-text rendering of plans for the terminal.

use std::fmt::Write;

use voyage_store::models::{Recommendation, TransportationGuide};
use voyage_store::{SavedPlan, TravelPlan};

/// Full itinerary as printed by `voyage generate`.
pub fn render_plan(plan: &TravelPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", plan.trip_title);
    let _ = writeln!(out, "{}", "=".repeat(plan.trip_title.chars().count().max(3)));
    let _ = writeln!(out, "{}", plan.trip_overview);
    let _ = writeln!(out, "Estimated cost: {}", plan.estimated_cost);

    for day in &plan.daily_itinerary {
        let _ = writeln!(out);
        let _ = writeln!(out, "{} ({}) - {}", day.day, day.date, day.theme);
        for item in &day.schedule {
            let _ = writeln!(out, "  {}  {}", item.time, item.activity);
            if !item.description.is_empty() {
                let _ = writeln!(out, "         {}", item.description);
            }
            let _ = writeln!(out, "         {}", item.transportation);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Recommendations:");
    for rec in plan.recommendations() {
        let _ = writeln!(out, "  {}", recommendation_line(&rec));
    }

    match &plan.transportation_guide {
        Some(TransportationGuide::Items(items)) => {
            let _ = writeln!(out);
            let _ = writeln!(out, "Getting around:");
            for item in items {
                let marker = if item.recommended { "*" } else { "-" };
                let _ = writeln!(
                    out,
                    "  {marker} {}: {}, {}. {}",
                    item.method, item.duration, item.cost, item.tips
                );
            }
        }
        Some(TransportationGuide::Text(text)) => {
            let _ = writeln!(out);
            let _ = writeln!(out, "Getting around: {text}");
        }
        None => {}
    }
    out
}

fn recommendation_line(rec: &Recommendation<'_>) -> String {
    let kind = match rec {
        Recommendation::Hotel(_) => "hotel",
        Recommendation::Plain(_) => "eat",
    };
    let mut line = format!("[{kind}] {} ({}) {:.1}", rec.name(), rec.area(), rec.rating());
    if let Some(price) = rec.price_range() {
        let _ = write!(line, ", {price}");
    }
    let _ = write!(line, " - {}", rec.notes());
    line
}

/// One line per saved plan for `voyage plans list`.
pub fn render_saved_line(saved: &SavedPlan) -> String {
    let created = chrono::DateTime::from_timestamp_millis(saved.id)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_owned());
    format!(
        "{id}  {created}  {country}/{destination}  {start}..{end}  {title}",
        id = saved.id,
        country = saved.trip.country_or_default(),
        destination = saved.trip.destination,
        start = saved.trip.start_date,
        end = saved.trip.end_date,
        title = saved.plan.trip_title,
    )
}

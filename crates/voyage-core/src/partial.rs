//! Best-effort reconstruction of a travel plan from an in-flight stream.
//!
//! [`reconstruct_partial`] never fails. While the text is not yet valid
//! JSON only the scalar fields are recovered, by pattern; the array fields
//! appear once the whole document parses. [`PartialPlanTracker`] feeds a
//! growing buffer through it and merges results so a field, once seen, is
//! never lost.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use voyage_store::models::{
    DailyPlan, HotelRecommendation, PlaceRecommendation, TransportationGuide, TravelPlan,
};

use crate::extract::{extract_json, parse_json_document};

/// Capture group 1 is the (possibly unterminated) raw string body.
fn scalar_pattern(key: &str) -> Regex {
    Regex::new(&format!(r#"(?s)"{key}"\s*:\s*"((?:[^"\\]|\\.)*)"#))
        .expect("scalar field pattern is valid")
}

static TRIP_TITLE: LazyLock<Regex> = LazyLock::new(|| scalar_pattern("tripTitle"));
static TRIP_OVERVIEW: LazyLock<Regex> = LazyLock::new(|| scalar_pattern("tripOverview"));
static ESTIMATED_COST: LazyLock<Regex> = LazyLock::new(|| scalar_pattern("estimatedCost"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A travel plan where every field may still be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialTravelPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_overview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_itinerary: Option<Vec<DailyPlan>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_recommendations: Option<Vec<HotelRecommendation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_recommendations: Option<Vec<PlaceRecommendation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transportation_guide: Option<TransportationGuide>,
}

/// Names the fields of [`PartialTravelPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartialField {
    TripTitle,
    TripOverview,
    EstimatedCost,
    DailyItinerary,
    HotelRecommendations,
    RestaurantRecommendations,
    TransportationGuide,
}

impl fmt::Display for PartialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TripTitle => "tripTitle",
            Self::TripOverview => "tripOverview",
            Self::EstimatedCost => "estimatedCost",
            Self::DailyItinerary => "dailyItinerary",
            Self::HotelRecommendations => "hotelRecommendations",
            Self::RestaurantRecommendations => "restaurantRecommendations",
            Self::TransportationGuide => "transportationGuide",
        };
        f.write_str(s)
    }
}

impl PartialTravelPlan {
    /// The fields recovered so far, in declaration order.
    pub fn fields(&self) -> Vec<PartialField> {
        let present = [
            (PartialField::TripTitle, self.trip_title.is_some()),
            (PartialField::TripOverview, self.trip_overview.is_some()),
            (PartialField::EstimatedCost, self.estimated_cost.is_some()),
            (PartialField::DailyItinerary, self.daily_itinerary.is_some()),
            (PartialField::HotelRecommendations, self.hotel_recommendations.is_some()),
            (
                PartialField::RestaurantRecommendations,
                self.restaurant_recommendations.is_some(),
            ),
            (PartialField::TransportationGuide, self.transportation_guide.is_some()),
        ];
        present
            .into_iter()
            .filter_map(|(field, is_set)| is_set.then_some(field))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Overlay `newer` onto `self`. Fields absent from `newer` keep their
    /// current value.
    pub fn merge(&mut self, newer: PartialTravelPlan) {
        fn keep<T>(slot: &mut Option<T>, newer: Option<T>) {
            if newer.is_some() {
                *slot = newer;
            }
        }
        keep(&mut self.trip_title, newer.trip_title);
        keep(&mut self.trip_overview, newer.trip_overview);
        keep(&mut self.estimated_cost, newer.estimated_cost);
        keep(&mut self.daily_itinerary, newer.daily_itinerary);
        keep(&mut self.hotel_recommendations, newer.hotel_recommendations);
        keep(&mut self.restaurant_recommendations, newer.restaurant_recommendations);
        keep(&mut self.transportation_guide, newer.transportation_guide);
    }

    fn from_object(value: &Value) -> Self {
        fn field<T: DeserializeOwned>(value: &Value, key: &str) -> Option<T> {
            value
                .get(key)
                .filter(|v| !v.is_null())
                .and_then(|v| T::deserialize(v).ok())
        }
        Self {
            trip_title: field(value, "tripTitle"),
            trip_overview: field(value, "tripOverview"),
            estimated_cost: field(value, "estimatedCost"),
            daily_itinerary: field(value, "dailyItinerary"),
            hotel_recommendations: field(value, "hotelRecommendations"),
            restaurant_recommendations: field(value, "restaurantRecommendations"),
            transportation_guide: field(value, "transportationGuide"),
        }
    }

    fn from_scalars(text: &str) -> Self {
        Self {
            trip_title: capture_scalar(&TRIP_TITLE, text),
            trip_overview: capture_scalar(&TRIP_OVERVIEW, text),
            estimated_cost: capture_scalar(&ESTIMATED_COST, text),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Reconstruction
// ---------------------------------------------------------------------------

/// Recover as much of a travel plan as `text` currently allows.
///
/// 1. Strict parse of `text`, then of its extraction candidate; a parsed
///    object yields every field that deserializes.
/// 2. Otherwise each scalar field is matched independently, accepting an
///    unterminated trailing string value.
///
/// Array fields are only ever produced by step 1.
pub fn reconstruct_partial(text: &str) -> PartialTravelPlan {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if value.is_object() {
            return PartialTravelPlan::from_object(&value);
        }
    }
    if let Some(value) = extract_json(text).and_then(|c| serde_json::from_str::<Value>(c).ok()) {
        if value.is_object() {
            return PartialTravelPlan::from_object(&value);
        }
    }
    PartialTravelPlan::from_scalars(text)
}

fn capture_scalar(pattern: &Regex, text: &str) -> Option<String> {
    let raw = pattern.captures(text)?.get(1)?.as_str();
    Some(decode_string_body(raw))
}

/// Decode JSON escapes in a string body that may end mid-escape.
fn decode_string_body(raw: &str) -> String {
    if let Ok(s) = serde_json::from_str::<String>(&format!("\"{raw}\"")) {
        return s;
    }
    // A trailing `\u00` (or similar) is still being generated; drop it.
    if let Some(cut) = raw.rfind('\\') {
        if let Ok(s) = serde_json::from_str::<String>(&format!("\"{}\"", &raw[..cut])) {
            return s;
        }
    }
    raw.to_owned()
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Accumulates a streamed response and keeps the best partial plan so far.
#[derive(Debug, Default)]
pub struct PartialPlanTracker {
    buffer: String,
    current: PartialTravelPlan,
}

impl PartialPlanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and re-derive. Returns the fields that became
    /// available with this chunk.
    pub fn push(&mut self, chunk: &str) -> Vec<PartialField> {
        self.buffer.push_str(chunk);
        let before = self.current.fields();
        self.current.merge(reconstruct_partial(&self.buffer));
        self.current
            .fields()
            .into_iter()
            .filter(|f| !before.contains(f))
            .collect()
    }

    pub fn current(&self) -> &PartialTravelPlan {
        &self.current
    }

    /// Everything received so far.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// The complete plan, if the accumulated text holds one.
    pub fn finish(&self) -> Option<TravelPlan> {
        let value = parse_json_document(&self.buffer)?;
        serde_json::from_value(value).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FULL: &str = r#"{
  "tripTitle": "Autumn in \"Kyoto\" cafés",
  "tripOverview": "Temples, markets and food.",
  "estimatedCost": "about 1,200,000 KRW",
  "dailyItinerary": [
    {"day": "Day 1", "date": "2025-10-01", "theme": "Arrival", "schedule": [
      {"time": "15:00", "activity": "Check in", "description": "Drop bags.", "transportation": "Walk"}
    ]}
  ],
  "hotelRecommendations": [
    {"name": "Station Hotel", "area": "Kyoto Station", "priceRange": "150,000 KRW", "rating": 4.5, "notes": "Central."}
  ],
  "restaurantRecommendations": [
    {"name": "Nishiki Stall", "area": "Nishiki", "rating": 4.4, "notes": "Go early."}
  ],
  "transportationGuide": null
}"#;

    #[test]
    fn complete_document_yields_all_fields() {
        let partial = reconstruct_partial(FULL);
        assert_eq!(partial.trip_title.as_deref(), Some("Autumn in \"Kyoto\" cafés"));
        assert_eq!(partial.daily_itinerary.as_ref().unwrap().len(), 1);
        assert_eq!(partial.hotel_recommendations.as_ref().unwrap()[0].rating, 4.5);
        assert_eq!(partial.restaurant_recommendations.as_ref().unwrap().len(), 1);
        assert!(partial.transportation_guide.is_none());
    }

    #[test]
    fn unterminated_title_is_recovered() {
        let partial = reconstruct_partial(r#"{"tripTitle": "Autumn in Ky"#);
        assert_eq!(partial.trip_title.as_deref(), Some("Autumn in Ky"));
        assert!(partial.trip_overview.is_none());
        assert!(partial.daily_itinerary.is_none());
    }

    #[test]
    fn scalars_recovered_while_arrays_are_open() {
        let cut = FULL.find("\"hotelRecommendations\"").unwrap();
        let partial = reconstruct_partial(&FULL[..cut]);
        assert_eq!(partial.trip_title.as_deref(), Some("Autumn in \"Kyoto\" cafés"));
        assert_eq!(partial.estimated_cost.as_deref(), Some("about 1,200,000 KRW"));
        assert!(partial.daily_itinerary.is_none());
        assert!(partial.hotel_recommendations.is_none());
    }

    #[test]
    fn trailing_partial_escape_is_dropped() {
        let partial = reconstruct_partial(r#"{"tripTitle": "caf\u00"#);
        assert_eq!(partial.trip_title.as_deref(), Some("caf"));
        let partial = reconstruct_partial(r#"{"tripTitle": "say \"#);
        assert_eq!(partial.trip_title.as_deref(), Some("say "));
    }

    #[test]
    fn key_without_value_yet_is_absent() {
        assert!(reconstruct_partial(r#"{"tripTitle": "#).trip_title.is_none());
        assert!(reconstruct_partial(r#"{"tripTi"#).is_empty());
    }

    #[test]
    fn garbage_never_panics() {
        for text in ["", "{", "}", "\"", "```json", "[1,2", "null", "\\", "{\"tripTitle\":\"\\"] {
            let _ = reconstruct_partial(text);
        }
    }

    #[test]
    fn fenced_complete_document_parses_arrays() {
        let text = format!("```json\n{FULL}\n```");
        let partial = reconstruct_partial(&text);
        assert!(partial.daily_itinerary.is_some());
    }

    #[test]
    fn mistyped_array_is_left_absent() {
        let partial = reconstruct_partial(r#"{"tripTitle": "T", "dailyItinerary": "soon"}"#);
        assert_eq!(partial.trip_title.as_deref(), Some("T"));
        assert!(partial.daily_itinerary.is_none());
    }

    #[test]
    fn merge_keeps_previous_values() {
        let mut acc = PartialTravelPlan {
            trip_title: Some("T".into()),
            ..Default::default()
        };
        acc.merge(PartialTravelPlan {
            trip_overview: Some("O".into()),
            ..Default::default()
        });
        assert_eq!(acc.trip_title.as_deref(), Some("T"));
        assert_eq!(acc.trip_overview.as_deref(), Some("O"));
    }

    #[test]
    fn tracker_reports_new_fields_and_finishes() {
        let mut tracker = PartialPlanTracker::new();
        let split = FULL.find("\"tripOverview\"").unwrap();
        let first = tracker.push(&FULL[..split]);
        assert_eq!(first, vec![PartialField::TripTitle]);
        assert!(tracker.finish().is_none());

        let rest = tracker.push(&FULL[split..]);
        assert!(rest.contains(&PartialField::DailyItinerary));
        assert!(!rest.contains(&PartialField::TripTitle));
        let plan = tracker.finish().expect("complete plan");
        assert_eq!(plan.trip_overview, "Temples, markets and food.");
        assert_eq!(tracker.text(), FULL);
    }

    #[test]
    fn tracker_never_regresses() {
        // The extraction candidate parses at first, then stops balancing
        // once more text arrives.
        let mut tracker = PartialPlanTracker::new();
        tracker.push(r#"Intro {"tripTitle": "T", "dailyItinerary": []} "#);
        assert!(tracker.current().daily_itinerary.is_some());
        tracker.push(r#"and {"oops": {}"#);
        assert!(reconstruct_partial(tracker.text()).daily_itinerary.is_none());
        assert!(tracker.current().daily_itinerary.is_some());
        assert_eq!(tracker.current().trip_title.as_deref(), Some("T"));
    }

    #[test]
    fn display_uses_wire_names() {
        assert_eq!(PartialField::RestaurantRecommendations.to_string(), "restaurantRecommendations");
    }

    proptest! {
        #[test]
        fn prop_prefix_fields_are_monotonic(cut_a in 0usize..2000, cut_b in 0usize..2000) {
            let boundaries: Vec<usize> = FULL
                .char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(FULL.len()))
                .collect();
            let a = boundaries[cut_a % boundaries.len()];
            let b = boundaries[cut_b % boundaries.len()];
            let (short, long) = if a <= b { (a, b) } else { (b, a) };

            let shorter = reconstruct_partial(&FULL[..short]).fields();
            let longer = reconstruct_partial(&FULL[..long]).fields();
            for field in shorter {
                prop_assert!(longer.contains(&field), "{field} lost between {short} and {long}");
            }
        }
    }
}

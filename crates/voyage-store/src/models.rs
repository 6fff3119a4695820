use serde::{Deserialize, Serialize};

/// Country assigned on read to saved plans written before trips carried one.
pub const DEFAULT_COUNTRY: &str = "Japan";

// ---------------------------------------------------------------------------
// Generated plan
// ---------------------------------------------------------------------------

/// One time slot within a day of the itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub time: String,
    pub activity: String,
    pub description: String,
    /// Route, duration and fare for getting to this activity.
    pub transportation: String,
}

/// A single itinerary day. Order within [`TravelPlan::daily_itinerary`] is
/// day order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlan {
    pub day: String,
    pub date: String,
    pub theme: String,
    pub schedule: Vec<ScheduleItem>,
}

/// A recommended place (restaurant, sight) without pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRecommendation {
    pub name: String,
    pub area: String,
    pub notes: String,
    pub rating: f64,
}

/// A recommended hotel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelRecommendation {
    pub name: String,
    pub area: String,
    pub notes: String,
    pub rating: f64,
    pub price_range: String,
}

/// One row of the inter-city transport comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportationGuideItem {
    pub method: String,
    pub tips: String,
    pub duration: String,
    pub cost: String,
    pub recommended: bool,
}

/// The model emits either a structured comparison or a prose paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransportationGuide {
    Items(Vec<TransportationGuideItem>),
    Text(String),
}

/// A complete generated travel plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelPlan {
    pub trip_title: String,
    pub trip_overview: String,
    pub estimated_cost: String,
    pub daily_itinerary: Vec<DailyPlan>,
    pub hotel_recommendations: Vec<HotelRecommendation>,
    pub restaurant_recommendations: Vec<PlaceRecommendation>,
    #[serde(default)]
    pub transportation_guide: Option<TransportationGuide>,
}

impl TravelPlan {
    /// All recommendations, hotels first, each tagged with its kind.
    pub fn recommendations(&self) -> impl Iterator<Item = Recommendation<'_>> {
        self.hotel_recommendations
            .iter()
            .map(Recommendation::Hotel)
            .chain(
                self.restaurant_recommendations
                    .iter()
                    .map(Recommendation::Plain),
            )
    }
}

/// A borrowed recommendation of either kind.
///
/// Renderers match on the variant (or use [`Recommendation::price_range`])
/// instead of probing for hotel-only fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recommendation<'a> {
    Plain(&'a PlaceRecommendation),
    Hotel(&'a HotelRecommendation),
}

impl<'a> Recommendation<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Self::Plain(p) => &p.name,
            Self::Hotel(h) => &h.name,
        }
    }

    pub fn area(&self) -> &'a str {
        match self {
            Self::Plain(p) => &p.area,
            Self::Hotel(h) => &h.area,
        }
    }

    pub fn notes(&self) -> &'a str {
        match self {
            Self::Plain(p) => &p.notes,
            Self::Hotel(h) => &h.notes,
        }
    }

    pub fn rating(&self) -> f64 {
        match self {
            Self::Plain(p) => p.rating,
            Self::Hotel(h) => h.rating,
        }
    }

    /// Nightly price range; only hotels carry one.
    pub fn price_range(&self) -> Option<&'a str> {
        match self {
            Self::Plain(_) => None,
            Self::Hotel(h) => Some(&h.price_range),
        }
    }
}

// ---------------------------------------------------------------------------
// Trip parameters and saved plans
// ---------------------------------------------------------------------------

/// The parameters a plan was generated for.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetails {
    /// `None` only for records written before the field existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub must_visit_places: Vec<String>,
}

impl TripDetails {
    /// The trip's country, or [`DEFAULT_COUNTRY`] when unset.
    pub fn country_or_default(&self) -> &str {
        self.country.as_deref().unwrap_or(DEFAULT_COUNTRY)
    }
}

/// A persisted plan together with the trip parameters that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPlan {
    /// Creation time in epoch milliseconds; unique key in the store.
    pub id: i64,
    pub plan: TravelPlan,
    #[serde(flatten)]
    pub trip: TripDetails,
}

impl SavedPlan {
    /// Wrap a plan for saving, keyed by the current time.
    pub fn new(plan: TravelPlan, trip: TripDetails) -> Self {
        Self {
            id: chrono::Utc::now().timestamp_millis(),
            plan,
            trip,
        }
    }

    /// Fill read-time defaults. The stored record is not rewritten.
    pub fn normalized(mut self) -> Self {
        if self.trip.country.is_none() {
            self.trip.country = Some(DEFAULT_COUNTRY.to_owned());
        }
        self
    }
}

//! Shared test utilities for voyage integration tests.
//!
//! - [`FakeModel`]: a scripted [`voyage_core::model::TextModel`] that never
//!   touches the network.
//! - [`FakeBlobServer`]: an in-process HTTP server speaking the object store
//!   API that [`voyage_store::BlobClient`] talks to, bound to an ephemeral
//!   local port.
//! - Fixture builders for plans and trips.

mod blob_server;
mod fake_model;

pub use blob_server::FakeBlobServer;
pub use fake_model::FakeModel;

use voyage_store::models::{
    DailyPlan, HotelRecommendation, PlaceRecommendation, ScheduleItem, TransportationGuide,
    TransportationGuideItem,
};
use voyage_store::{SavedPlan, TravelPlan, TripDetails};

/// A small but complete plan titled `title`.
pub fn sample_plan(title: &str) -> TravelPlan {
    TravelPlan {
        trip_title: title.to_owned(),
        trip_overview: "Temples in the morning, markets in the evening.".to_owned(),
        estimated_cost: "About 1,200,000 KRW per person".to_owned(),
        daily_itinerary: vec![DailyPlan {
            day: "Day 1".to_owned(),
            date: "2025-10-01".to_owned(),
            theme: "Arrival".to_owned(),
            schedule: vec![ScheduleItem {
                time: "15:00".to_owned(),
                activity: "Check in".to_owned(),
                description: "Drop bags at the hotel and walk to the river.".to_owned(),
                transportation: "Haruka express, 75 min, 3,600 JPY".to_owned(),
            }],
        }],
        hotel_recommendations: vec![HotelRecommendation {
            name: "Station Hotel".to_owned(),
            area: "Kyoto Station".to_owned(),
            notes: "Direct station access.".to_owned(),
            rating: 4.5,
            price_range: "150,000-250,000 KRW".to_owned(),
        }],
        restaurant_recommendations: vec![PlaceRecommendation {
            name: "Nishiki Stall".to_owned(),
            area: "Nishiki Market".to_owned(),
            notes: "Go early.".to_owned(),
            rating: 4.4,
        }],
        transportation_guide: Some(TransportationGuide::Items(vec![TransportationGuideItem {
            method: "Shinkansen".to_owned(),
            tips: "Reserve seats on weekends.".to_owned(),
            duration: "About 2h15m".to_owned(),
            cost: "About 14,000 JPY".to_owned(),
            recommended: true,
        }])),
    }
}

/// Trip parameters for a short Kyoto trip.
pub fn sample_trip() -> TripDetails {
    TripDetails {
        country: Some("Japan".to_owned()),
        destination: "Kyoto".to_owned(),
        start_date: "2025-10-01".to_owned(),
        end_date: "2025-10-03".to_owned(),
        must_visit_places: vec!["Fushimi Inari".to_owned()],
    }
}

/// A saved plan with a fixed `id`.
pub fn sample_saved_plan(id: i64) -> SavedPlan {
    SavedPlan {
        id,
        plan: sample_plan(&format!("Plan {id}")),
        trip: sample_trip(),
    }
}

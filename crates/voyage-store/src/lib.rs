//! Saved travel plan persistence.
//!
//! The [`PlanStore`] contract is implemented by two interchangeable
//! backends: a single JSON file on local disk ([`FileStore`]) and a
//! networked object store addressed by `plans/<id>.json` keys
//! ([`BlobStore`]). [`StoreConfig`] picks one at startup.

pub mod blob;
pub mod config;
pub mod error;
pub mod file;
pub mod models;
pub mod store;

pub use blob::{BlobClient, BlobStore};
pub use config::StoreConfig;
pub use error::StoreError;
pub use file::FileStore;
pub use models::{SavedPlan, TravelPlan, TripDetails};
pub use store::PlanStore;

//! Generation and recovery pipeline for voyage.
//!
//! ```text
//! Dispatcher --generatePlan/searchInfo--> Relay --> TextModel (Gemini)
//!     |                                     |
//!     |                                     +--> extract (buffered / materialized output)
//!     +--getPlans/savePlan/deletePlan--> PlanStore
//!
//! client side: streamed text --> partial::PartialPlanTracker --> render
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod model;
pub mod partial;
pub mod prompt;
pub mod relay;

pub use config::ModelConfig;
pub use dispatch::{Action, DispatchOptions, Dispatcher};
pub use error::DispatchError;
pub use extract::{extract_json, parse_json_document};
pub use partial::{PartialField, PartialPlanTracker, PartialTravelPlan, reconstruct_partial};
pub use relay::{ActionBody, ActionResult, Relay, RelayMode};

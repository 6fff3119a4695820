//! Action dispatch: routes a named action and its JSON payload to the plan
//! store or the generation relay, and always answers with an
//! [`ActionResult`].

pub mod action;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::{error, info, warn};

use voyage_store::{PlanStore, SavedPlan, StoreConfig, TripDetails};

use crate::config::ModelConfig;
use crate::error::DispatchError;
use crate::model::{GeminiClient, TextModel};
use crate::prompt::{build_plan_prompt, build_search_prompt};
use crate::relay::{ActionResult, Relay, RelayMode};

pub use action::Action;
use action::{SearchPayload, parse_payload, plan_id};

/// Tunables for generation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Serve non-streaming `generatePlan` through a streamed upstream call
    /// that is materialized before answering. Keeps slow generations from
    /// hitting upstream request timeouts.
    pub materialize_via_stream: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            materialize_via_stream: true,
        }
    }
}

/// Routes actions to the store or the model.
///
/// Constructed once at startup from explicit configuration; holds no
/// per-request state.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn PlanStore>,
    relay: Option<Relay>,
    options: DispatchOptions,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("store", &self.store.backend())
            .field("relay", &self.relay)
            .field("options", &self.options)
            .finish()
    }
}

impl Dispatcher {
    /// `model` is `None` when no credential is configured.
    pub fn new(store: Arc<dyn PlanStore>, model: Option<Arc<dyn TextModel>>) -> Self {
        Self {
            store,
            relay: model.map(Relay::new),
            options: DispatchOptions::default(),
        }
    }

    /// Build the production dispatcher: Gemini when a key is present, and
    /// the configured store backend.
    pub fn from_config(model: &ModelConfig, store: &StoreConfig, options: DispatchOptions) -> Self {
        let client: Option<Arc<dyn TextModel>> = model.api_key.as_ref().map(|key| {
            Arc::new(
                GeminiClient::new(key.clone(), model.model.clone()).with_base_url(&model.base_url),
            ) as Arc<dyn TextModel>
        });
        Self::new(store.open(), client).with_options(options)
    }

    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &Arc<dyn PlanStore> {
        &self.store
    }

    /// Run `action` with `payload`.
    ///
    /// `streaming` only affects `generatePlan`, which then returns the raw
    /// model stream as the body. Failures of any kind, including panics in
    /// a handler, come back as error results.
    pub async fn dispatch(&self, action: &str, payload: Value, streaming: bool) -> ActionResult {
        info!(action, streaming, "dispatching action");
        let outcome = AssertUnwindSafe(self.route(action, payload, streaming))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                match e.status() {
                    400 => warn!(action, error = %e, "rejected action"),
                    _ => error!(action, error = %e, "action failed"),
                }
                e.into()
            }
            Err(_) => {
                error!(action, "action handler panicked");
                DispatchError::Internal("handler panicked".to_owned()).into()
            }
        }
    }

    async fn route(
        &self,
        action: &str,
        payload: Value,
        streaming: bool,
    ) -> Result<ActionResult, DispatchError> {
        let action: Action = action.parse()?;
        if action.needs_model() && self.relay.is_none() {
            return Err(DispatchError::Configuration);
        }

        match action {
            Action::GetPlans => self.plans_result().await,
            Action::SavePlan => {
                let plan: SavedPlan = parse_payload(action, payload)?;
                self.store.put(&plan).await?;
                info!(plan_id = plan.id, backend = self.store.backend(), "saved plan");
                self.plans_result().await
            }
            Action::DeletePlan => {
                let id = plan_id(&payload)?;
                if let Err(e) = self.store.delete(id).await {
                    error!(plan_id = id, error = %e, "delete failed; returning current plans");
                }
                self.plans_result().await
            }
            Action::GeneratePlan => {
                let trip: TripDetails = parse_payload(action, payload)?;
                let mode = if streaming {
                    RelayMode::Forward
                } else if self.options.materialize_via_stream {
                    RelayMode::Materialize
                } else {
                    RelayMode::Buffered
                };
                let body = self.relay()?.try_relay(&build_plan_prompt(&trip), mode).await?;
                Ok(ActionResult { status: 200, body })
            }
            Action::SearchInfo => {
                let SearchPayload { query } = parse_payload(action, payload)?;
                if query.trim().is_empty() {
                    return Err(DispatchError::Validation("query must not be empty".to_owned()));
                }
                let text = self.relay()?.complete_text(&build_search_prompt(&query)).await?;
                Ok(ActionResult::ok(serde_json::json!({ "result": text })))
            }
        }
    }

    fn relay(&self) -> Result<&Relay, DispatchError> {
        self.relay.as_ref().ok_or(DispatchError::Configuration)
    }

    /// The full plan list, freshly read from the store.
    async fn plans_result(&self) -> Result<ActionResult, DispatchError> {
        let plans = self.store.list().await?;
        Ok(ActionResult::ok(serde_json::to_value(plans)?))
    }
}

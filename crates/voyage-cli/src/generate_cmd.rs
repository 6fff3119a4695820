//! `voyage generate` and `voyage search`: run model-backed actions from the
//! terminal through the same dispatcher the HTTP endpoint uses.

use std::io::Write;

use anyhow::{Context, Result, bail};
use futures::StreamExt;
use serde_json::{Value, json};

use voyage_core::relay::forward_chunks;
use voyage_core::{ActionBody, ActionResult, Dispatcher, PartialPlanTracker};
use voyage_store::{SavedPlan, TravelPlan, TripDetails};

use crate::render::render_plan;

/// Options for `voyage generate`.
#[derive(Debug)]
pub struct GenerateOptions {
    pub trip: TripDetails,
    pub stream: bool,
    pub save: bool,
}

pub async fn run_generate(dispatcher: &Dispatcher, opts: GenerateOptions) -> Result<()> {
    let payload = serde_json::to_value(&opts.trip)?;
    let result = dispatcher.dispatch("generatePlan", payload, opts.stream).await;
    let result = ensure_ok(result)?;

    let plan = match result.body {
        ActionBody::Stream(stream) => follow_stream(stream).await?,
        ActionBody::Json(value) => {
            serde_json::from_value(value).context("model returned an incomplete plan")?
        }
    };

    println!("{}", render_plan(&plan));

    if opts.save {
        let saved = SavedPlan::new(plan, opts.trip);
        let id = saved.id;
        let result = dispatcher
            .dispatch("savePlan", serde_json::to_value(&saved)?, false)
            .await;
        ensure_ok(result)?;
        println!("Saved as plan {id}.");
    }
    Ok(())
}

/// Consume a streamed generation, reporting each field as it becomes
/// available on stderr.
async fn follow_stream(stream: voyage_core::model::TextStream) -> Result<TravelPlan> {
    let mut tracker = PartialPlanTracker::new();
    let mut chunks = Box::pin(forward_chunks(stream));
    let mut stderr = std::io::stderr();
    while let Some(chunk) = chunks.next().await {
        for field in tracker.push(&chunk) {
            let _ = writeln!(stderr, "  received {field}");
        }
        if tracker.current().is_empty() {
            let _ = write!(stderr, ".");
            let _ = stderr.flush();
        }
    }
    let _ = writeln!(stderr);

    match tracker.finish() {
        Some(plan) => Ok(plan),
        None => {
            tracing::debug!(received = tracker.text().len(), "stream ended without a full plan");
            let got: Vec<String> = tracker.current().fields().iter().map(ToString::to_string).collect();
            bail!(
                "generation ended before a complete plan arrived (received: {})",
                if got.is_empty() { "nothing".to_owned() } else { got.join(", ") }
            )
        }
    }
}

pub async fn run_search(dispatcher: &Dispatcher, query: &str) -> Result<()> {
    let result = dispatcher
        .dispatch("searchInfo", json!({ "query": query }), false)
        .await;
    let value = ensure_ok(result)?.into_json().unwrap_or(Value::Null);
    match value.get("result").and_then(Value::as_str) {
        Some(text) => println!("{text}"),
        None => bail!("unexpected search response: {value}"),
    }
    Ok(())
}

/// Turn a non-200 result into an error carrying its message.
pub fn ensure_ok(result: ActionResult) -> Result<ActionResult> {
    if result.status == 200 {
        return Ok(result);
    }
    let status = result.status;
    let message = result
        .into_json()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| "request failed".to_owned());
    bail!("{message} (status {status})")
}

//! `voyage plans` subcommands.

use anyhow::Result;

use voyage_core::Dispatcher;
use voyage_store::SavedPlan;

use crate::PlansCommands;
use crate::generate_cmd::ensure_ok;
use crate::render::render_saved_line;

pub async fn run_plans_command(command: PlansCommands, dispatcher: &Dispatcher) -> Result<()> {
    let (action, payload) = match command {
        PlansCommands::List => ("getPlans", serde_json::Value::Null),
        PlansCommands::Delete { plan_id } => ("deletePlan", serde_json::json!({ "planId": plan_id })),
    };
    let result = ensure_ok(dispatcher.dispatch(action, payload, false).await)?;
    let plans: Vec<SavedPlan> = serde_json::from_value(result.into_json().unwrap_or_default())?;

    if plans.is_empty() {
        println!("No saved plans.");
        return Ok(());
    }
    for plan in &plans {
        println!("{}", render_saved_line(plan));
    }
    Ok(())
}

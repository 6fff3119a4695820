//! The `PlanStore` trait -- the contract both persistence backends satisfy.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::SavedPlan;

/// Durable list/put/delete over [`SavedPlan`] records keyed by id.
///
/// `list` always returns normalized records (see [`SavedPlan::normalized`])
/// ordered by id, newest first.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Short backend name for logs (e.g. "file", "blob").
    fn backend(&self) -> &'static str;

    async fn list(&self) -> Result<Vec<SavedPlan>, StoreError>;

    /// Insert `plan`, replacing any existing record with the same id.
    async fn put(&self, plan: &SavedPlan) -> Result<(), StoreError>;

    /// Remove the record with `id`. Removing a missing id is not an error.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PlanStore) {}
};

/// Shared tail of every `list` implementation.
pub(crate) fn into_listing(plans: Vec<SavedPlan>) -> Vec<SavedPlan> {
    let mut plans: Vec<SavedPlan> = plans.into_iter().map(SavedPlan::normalized).collect();
    plans.sort_by(|a, b| b.id.cmp(&a.id));
    plans
}

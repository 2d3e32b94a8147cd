//! The persistence boundary: the pipeline's flat records in, durable
//! upserts out. No graph is constructed here — see the design notes on
//! cyclic/backref relationships.

use async_trait::async_trait;
use dspm_classifier::{Category, Sensitivity};
use dspm_pipeline::{Asset, Classification, Finding};

use crate::account::Account;
use crate::error::PersistenceError;

#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Resolves a job's `account_id` to the connector configuration the
    /// worker needs before it can build a `Connector`. `Ok(None)` means the
    /// account is missing, per the worker runtime's "resolve account; if
    /// missing, mark job permanently failed" contract.
    async fn get_account(&self, account_id: &str) -> Result<Option<Account>, PersistenceError>;

    async fn upsert_asset(&self, asset: &Asset) -> Result<(), PersistenceError>;

    async fn insert_classification(&self, classification: &Classification) -> Result<(), PersistenceError>;

    /// Recomputes an asset's aggregate sensitivity/categories/classification
    /// count after a classification is inserted.
    async fn recompute_asset_aggregate(
        &self,
        asset_id: uuid::Uuid,
        sensitivity: Sensitivity,
        category: Category,
        match_count: u32,
    ) -> Result<(), PersistenceError>;

    async fn insert_finding(&self, finding: &Finding) -> Result<(), PersistenceError>;
}

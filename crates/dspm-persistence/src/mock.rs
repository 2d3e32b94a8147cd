//! An in-memory `PersistenceAdapter` for worker-runtime tests that don't
//! need a real Postgres instance.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use dspm_classifier::{Category, Sensitivity};
use dspm_pipeline::{Asset, Classification, Finding};
use uuid::Uuid;

use crate::account::Account;
use crate::adapter::PersistenceAdapter;
use crate::error::PersistenceError;

#[derive(Default)]
pub struct MockPersistenceAdapter {
    accounts: HashMap<String, Account>,
    assets: Mutex<HashMap<Uuid, Asset>>,
    classifications: Mutex<Vec<Classification>>,
    findings: Mutex<Vec<Finding>>,
}

impl MockPersistenceAdapter {
    pub fn new(accounts: HashMap<String, Account>) -> Self {
        Self {
            accounts,
            assets: Mutex::new(HashMap::new()),
            classifications: Mutex::new(Vec::new()),
            findings: Mutex::new(Vec::new()),
        }
    }

    pub fn assets(&self) -> Vec<Asset> {
        self.assets.lock().expect("mock assets poisoned").values().cloned().collect()
    }

    pub fn classifications(&self) -> Vec<Classification> {
        self.classifications.lock().expect("mock classifications poisoned").clone()
    }

    pub fn findings(&self) -> Vec<Finding> {
        self.findings.lock().expect("mock findings poisoned").clone()
    }
}

#[async_trait]
impl PersistenceAdapter for MockPersistenceAdapter {
    async fn get_account(&self, account_id: &str) -> Result<Option<Account>, PersistenceError> {
        Ok(self.accounts.get(account_id).cloned())
    }

    async fn upsert_asset(&self, asset: &Asset) -> Result<(), PersistenceError> {
        self.assets.lock().expect("mock assets poisoned").insert(asset.id, asset.clone());
        Ok(())
    }

    async fn insert_classification(&self, classification: &Classification) -> Result<(), PersistenceError> {
        self.classifications
            .lock()
            .expect("mock classifications poisoned")
            .push(classification.clone());
        Ok(())
    }

    async fn recompute_asset_aggregate(
        &self,
        asset_id: Uuid,
        sensitivity: Sensitivity,
        category: Category,
        match_count: u32,
    ) -> Result<(), PersistenceError> {
        let mut assets = self.assets.lock().expect("mock assets poisoned");
        if let Some(asset) = assets.get_mut(&asset_id) {
            asset.sensitivity = asset.sensitivity.max(sensitivity);
            asset.categories.insert(category);
            asset.classification_count += match_count as u64;
        }
        Ok(())
    }

    async fn insert_finding(&self, finding: &Finding) -> Result<(), PersistenceError> {
        self.findings.lock().expect("mock findings poisoned").push(finding.clone());
        Ok(())
    }
}

//! `sqlx`-backed `PersistenceAdapter`. Flat upserts only — matching the
//! worker's job-state updates (`UPDATE jobs SET status = ...`) in shape.

use async_trait::async_trait;
use dspm_classifier::{Category, Sensitivity};
use dspm_pipeline::{Asset, Classification, Finding};
use sqlx::PgPool;
use tracing::debug;

use crate::account::Account;
use crate::adapter::PersistenceAdapter;
use crate::error::PersistenceError;

pub struct PostgresPersistenceAdapter {
    pool: PgPool,
}

impl PostgresPersistenceAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersistenceAdapter for PostgresPersistenceAdapter {
    async fn get_account(&self, account_id: &str) -> Result<Option<Account>, PersistenceError> {
        let row: Option<(String, serde_json::Value)> =
            sqlx::query_as("SELECT id, connector_config FROM accounts WHERE id = $1")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(match row {
            Some((id, connector_config)) => Some(Account {
                id,
                connector_config: serde_json::from_value(connector_config)
                    .map_err(|e| PersistenceError::Database(sqlx::Error::Decode(Box::new(e))))?,
            }),
            None => None,
        })
    }

    async fn upsert_asset(&self, asset: &Asset) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO assets
                (id, account_id, provider, resource_type, name, region, encryption,
                 versioning, logging, public_access, tags, sensitivity, categories,
                 classification_count, last_scanned_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             ON CONFLICT (id) DO UPDATE SET
                region = EXCLUDED.region,
                encryption = EXCLUDED.encryption,
                versioning = EXCLUDED.versioning,
                logging = EXCLUDED.logging,
                public_access = EXCLUDED.public_access,
                tags = EXCLUDED.tags,
                last_scanned_at = EXCLUDED.last_scanned_at",
        )
        .bind(asset.id)
        .bind(&asset.account_id)
        .bind(serde_json::to_value(asset.provider).unwrap_or_default())
        .bind(serde_json::to_value(asset.resource_type).unwrap_or_default())
        .bind(&asset.name)
        .bind(&asset.region)
        .bind(serde_json::to_value(&asset.encryption).unwrap_or_default())
        .bind(asset.versioning)
        .bind(asset.logging)
        .bind(asset.public_access)
        .bind(serde_json::to_value(&asset.tags).unwrap_or_default())
        .bind(serde_json::to_value(asset.sensitivity).unwrap_or_default())
        .bind(serde_json::to_value(&asset.categories).unwrap_or_default())
        .bind(asset.classification_count as i64)
        .bind(asset.last_scanned_at)
        .execute(&self.pool)
        .await?;

        debug!(asset_id = %asset.id, "upserted asset");
        Ok(())
    }

    async fn insert_classification(&self, classification: &Classification) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO classifications
                (id, asset_id, object_key, object_size_bytes, rule_name, category,
                 sensitivity, redacted_sample, match_count, line_numbers, scanned_bytes,
                 detected_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(classification.id)
        .bind(classification.asset_id)
        .bind(&classification.object_key)
        .bind(classification.object_size_bytes as i64)
        .bind(&classification.rule_name)
        .bind(serde_json::to_value(classification.category).unwrap_or_default())
        .bind(serde_json::to_value(classification.sensitivity).unwrap_or_default())
        .bind(&classification.redacted_sample)
        .bind(classification.match_count as i64)
        .bind(
            classification
                .line_numbers
                .iter()
                .map(|n| *n as i64)
                .collect::<Vec<i64>>(),
        )
        .bind(classification.scanned_bytes as i64)
        .bind(classification.detected_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recompute_asset_aggregate(
        &self,
        asset_id: uuid::Uuid,
        sensitivity: Sensitivity,
        category: Category,
        match_count: u32,
    ) -> Result<(), PersistenceError> {
        // `sensitivity` is stored as a jsonb-wrapped enum string, so a bare
        // GREATEST() would order it alphabetically ("Unknown" > "Critical"),
        // not by severity. Rank both sides against the fixed severity order
        // before picking the max.
        sqlx::query(
            "UPDATE assets SET
                sensitivity = CASE
                    WHEN array_position(
                            ARRAY['\"Unknown\"','\"Low\"','\"Medium\"','\"High\"','\"Critical\"'],
                            sensitivity::text)
                        >= array_position(
                            ARRAY['\"Unknown\"','\"Low\"','\"Medium\"','\"High\"','\"Critical\"'],
                            $2::text)
                    THEN sensitivity ELSE $2 END,
                categories = categories || $3::jsonb,
                classification_count = classification_count + $4
             WHERE id = $1",
        )
        .bind(asset_id)
        .bind(serde_json::to_value(sensitivity).unwrap_or_default())
        .bind(serde_json::json!([category]))
        .bind(match_count as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_finding(&self, finding: &Finding) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO findings
                (id, asset_id, finding_type, severity, compliance_frameworks, evidence, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(finding.id)
        .bind(finding.asset_id)
        .bind(serde_json::to_value(finding.finding_type).unwrap_or_default())
        .bind(serde_json::to_value(finding.severity).unwrap_or_default())
        .bind(serde_json::to_value(&finding.compliance_frameworks).unwrap_or_default())
        .bind(&finding.evidence)
        .bind(finding.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory [`IssuerStore`] for tests and local runs.
//!
//! Keeps the two relations apart exactly like the Postgres store does:
//! issuer rows by tenant and configuration rows by (tenant, configuration
//! id). Each call validates before mutating and holds the write lock for
//! its whole duration, so writes touching both relations are atomic here
//! as well.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::IssuerError;

use super::models::{CredentialSupported, Issuer, IssuerUpdate};
use super::IssuerStore;

#[derive(Default)]
struct Tables {
    issuers: HashMap<String, Issuer>,
    credentials_supported: HashMap<String, BTreeMap<String, CredentialSupported>>,
}

impl Tables {
    /// Removes the named and evicted ids of `tenant_id`, then stores
    /// `configurations`. Nothing is touched when the set is rejected.
    fn replace_configurations(&mut self, tenant_id: &str, configurations: &[CredentialSupported], evicted: &[String]) -> Result<(), IssuerError> {
        if configurations.is_empty() && evicted.is_empty() {
            return Ok(());
        }

        let mut seen = HashSet::with_capacity(configurations.len());
        for c in configurations {
            if !seen.insert(c.credential_configuration_id.as_str()) {
                return Err(IssuerError::store(
                    "failed to insert credentials supported",
                    format!("duplicate configuration {} for tenant {}", c.credential_configuration_id, tenant_id),
                ));
            }
        }

        let stored = self.credentials_supported.entry(tenant_id.to_owned()).or_default();
        for id in evicted {
            stored.remove(id);
        }
        for c in configurations {
            stored.insert(c.credential_configuration_id.clone(), c.clone());
        }

        if stored.is_empty() {
            self.credentials_supported.remove(tenant_id);
        }
        Ok(())
    }
}

/// Cheaply cloneable; all clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IssuerStore for MemoryStore {
    async fn get(&self, tenant_id: &str) -> Result<Issuer, IssuerError> {
        let tables = self.tables.read().await;
        let mut issuer = tables.issuers.get(tenant_id).cloned().ok_or(IssuerError::NotFound)?;
        issuer.credentials_supported = tables
            .credentials_supported
            .get(tenant_id)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default();
        Ok(issuer)
    }

    async fn get_configurations(&self, tenant_id: &str) -> Result<Vec<CredentialSupported>, IssuerError> {
        let tables = self.tables.read().await;
        tables
            .credentials_supported
            .get(tenant_id)
            .filter(|c| !c.is_empty())
            .map(|c| c.values().cloned().collect())
            .ok_or(IssuerError::NotFound)
    }

    async fn insert(&self, issuer: &Issuer, evicted: &[String]) -> Result<(), IssuerError> {
        let mut tables = self.tables.write().await;
        if tables.issuers.contains_key(&issuer.tenant_id) {
            return Err(IssuerError::store(
                "failed to execute query",
                format!("duplicate issuer for tenant {}", issuer.tenant_id),
            ));
        }

        tables.replace_configurations(&issuer.tenant_id, &issuer.credentials_supported, evicted)?;

        let mut row = issuer.clone();
        row.credentials_supported = Vec::new();
        tables.issuers.insert(issuer.tenant_id.clone(), row);
        Ok(())
    }

    async fn update(&self, tenant_id: &str, credential_issuer: &str, update: &IssuerUpdate) -> Result<(), IssuerError> {
        let mut tables = self.tables.write().await;

        match tables
            .issuers
            .get_mut(tenant_id)
            .filter(|row| row.credential_issuer == credential_issuer)
        {
            Some(row) => {
                if let Some(v) = &update.authorization_servers {
                    row.authorization_servers = v.clone();
                }
                if let Some(v) = &update.credential_endpoint {
                    row.credential_endpoint = v.clone();
                }
                if let Some(v) = &update.batch_credential_endpoint {
                    row.batch_credential_endpoint = Some(v.clone());
                }
                if let Some(v) = &update.deferred_credential_endpoint {
                    row.deferred_credential_endpoint = Some(v.clone());
                }
                if let Some(v) = &update.notification_endpoint {
                    row.notification_endpoint = Some(v.clone());
                }
                if let Some(v) = &update.credential_response_encryption {
                    row.credential_response_encryption = Some(v.clone());
                }
                if let Some(v) = update.credential_identifiers_supported {
                    row.credential_identifiers_supported = v;
                }
                if let Some(v) = &update.display {
                    row.display = v.clone();
                }
                if let Some(v) = &update.signed_metadata {
                    row.signed_metadata = Some(v.clone());
                }
                if let Some(v) = update.last_seen {
                    row.last_seen = v;
                }
            }
            None => log::warn!("no issuer row of {} matches credential issuer {}", tenant_id, credential_issuer),
        }

        tables.replace_configurations(tenant_id, &update.credentials_supported, &update.evicted)
    }

    async fn update_configurations(&self, tenant_id: &str, configurations: &[CredentialSupported], evicted: &[String]) -> Result<(), IssuerError> {
        let mut tables = self.tables.write().await;
        tables.replace_configurations(tenant_id, configurations, evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testutil::{configuration, issuer};

    #[tokio::test]
    async fn get_unknown_tenant_is_not_found() {
        let store = MemoryStore::new();

        assert!(store.get("missing").await.unwrap_err().is_not_found());
        assert!(store.get_configurations("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn insert_twice_fails() {
        let store = MemoryStore::new();
        let mut record = issuer("T1");
        record.credentials_supported = vec![configuration("a")];

        store.insert(&record, &[]).await.expect("first insert");
        let err = store.insert(&record, &[]).await.unwrap_err();

        assert!(matches!(err, IssuerError::Store { .. }));
    }

    #[tokio::test]
    async fn issuer_without_configurations_reads_back_empty() {
        let store = MemoryStore::new();
        store.insert(&issuer("T1"), &[]).await.expect("insert");

        let stored = store.get("T1").await.expect("stored issuer");
        assert!(stored.credentials_supported.is_empty());
        assert!(store.get_configurations("T1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn replace_leaves_unnamed_configurations_alone() {
        let store = MemoryStore::new();
        let mut record = issuer("T1");
        record.credentials_supported = vec![configuration("a"), configuration("b"), configuration("c")];
        store.insert(&record, &[]).await.expect("insert");

        let mut b = configuration("b");
        b.format = "vc+sd-jwt".to_owned();
        store
            .update_configurations("T1", &[b], &["c".to_owned()])
            .await
            .expect("replace");

        let stored = store.get_configurations("T1").await.expect("configurations");
        let ids: Vec<_> = stored.iter().map(|c| c.credential_configuration_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(stored[1].format, "vc+sd-jwt");
    }

    #[tokio::test]
    async fn update_only_touches_present_columns() {
        let store = MemoryStore::new();
        let mut record = issuer("T1");
        record.signed_metadata = Some("eyJ...".to_owned());
        store.insert(&record, &[]).await.expect("insert");

        let update = IssuerUpdate {
            credential_endpoint: Some("https://issuer.example.com/v2/credential".to_owned()),
            ..Default::default()
        };
        store.update("T1", &record.credential_issuer, &update).await.expect("update");

        let stored = store.get("T1").await.expect("stored issuer");
        assert_eq!(stored.credential_endpoint, "https://issuer.example.com/v2/credential");
        assert_eq!(stored.signed_metadata.as_deref(), Some("eyJ..."));
        assert_eq!(stored.first_seen, record.first_seen);
    }

    #[tokio::test]
    async fn update_with_other_issuer_url_keeps_row() {
        let store = MemoryStore::new();
        let record = issuer("T1");
        store.insert(&record, &[]).await.expect("insert");

        let update = IssuerUpdate {
            credential_endpoint: Some("https://elsewhere.example.com/credential".to_owned()),
            credentials_supported: vec![configuration("a")],
            ..Default::default()
        };
        store.update("T1", "https://elsewhere.example.com", &update).await.expect("update");

        let stored = store.get("T1").await.expect("stored issuer");
        assert_eq!(stored.credential_endpoint, record.credential_endpoint);
        assert_eq!(stored.credentials_supported.len(), 1);
    }

    #[tokio::test]
    async fn insert_adopts_configurations_stored_before_the_issuer() {
        let store = MemoryStore::new();
        store
            .update_configurations("T1", &[configuration("a"), configuration("stale")], &[])
            .await
            .expect("orphan configurations");

        let mut record = issuer("T1");
        record.credentials_supported = vec![configuration("a"), configuration("b")];
        store.insert(&record, &["stale".to_owned()]).await.expect("insert");

        let stored = store.get("T1").await.expect("stored issuer");
        let ids: Vec<_> = stored.credentials_supported.iter().map(|c| c.credential_configuration_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn rejected_insert_leaves_both_tables_untouched() {
        let store = MemoryStore::new();
        let mut record = issuer("T1");
        record.credentials_supported = vec![configuration("a"), configuration("a")];

        let err = store.insert(&record, &[]).await.unwrap_err();

        assert!(matches!(err, IssuerError::Store { .. }));
        assert!(store.get("T1").await.unwrap_err().is_not_found());
        assert!(store.get_configurations("T1").await.unwrap_err().is_not_found());
    }
}

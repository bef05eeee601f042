// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::dtos::metadata_dtos::{CredentialConfiguration, IssuerMetadata};
use crate::errors::IssuerError;
use crate::repository::models::{CredentialSupported, Issuer, IssuerUpdate};
use crate::repository::IssuerStore;
use crate::services::reconcile::{merge_issuer_configurations, merge_single_configuration};

/// Reconciles incoming issuer snapshots with the stored state of a tenant
/// and renders the merged metadata back.
///
/// Each call is a read-merge-write against the store; concurrent calls for
/// the same tenant are not serialized and the last write wins.
#[derive(Clone)]
pub struct IssuerService {
    store: Arc<dyn IssuerStore>,
    expiry: Duration,
}

impl IssuerService {
    pub fn new(store: Arc<dyn IssuerStore>, expiry: Duration) -> Self {
        Self { store, expiry }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Merged metadata of `tenant_id`. Schema and subject of each
    /// configuration are only rendered with `include_internal`.
    pub async fn get_issuer(&self, tenant_id: &str, include_internal: bool) -> Result<IssuerMetadata, IssuerError> {
        let issuer = self.store.get(tenant_id).await.map_err(|e| {
            match &e {
                IssuerError::NotFound => log::info!("issuer record of {} not found", tenant_id),
                other => log::error!("failed to load issuer record of {}: {}", tenant_id, other),
            }
            e
        })?;

        Ok(issuer_metadata(issuer, include_internal))
    }

    pub async fn upsert_issuer(&self, tenant_id: &str, snapshot: IssuerMetadata) -> Result<(), IssuerError> {
        self.upsert_issuer_at(tenant_id, snapshot, Utc::now()).await
    }

    /// Stores `snapshot` as the new issuer of `tenant_id`, or merges it into
    /// the existing record as of `now`.
    pub async fn upsert_issuer_at(&self, tenant_id: &str, snapshot: IssuerMetadata, now: DateTime<Utc>) -> Result<(), IssuerError> {
        if tenant_id.is_empty() {
            return Err(IssuerError::InvalidRequest("empty tenant id".to_owned()));
        }

        let stored = match self.store.get(tenant_id).await {
            Ok(issuer) => Some(issuer),
            Err(IssuerError::NotFound) => None,
            Err(e) => {
                log::error!("failed to look up issuer {}: {}", tenant_id, e);
                return Err(e);
            }
        };

        let IssuerMetadata {
            credential_issuer,
            authorization_servers,
            credential_endpoint,
            batch_credential_endpoint,
            deferred_credential_endpoint,
            notification_endpoint,
            credential_response_encryption,
            credential_identifiers_supported,
            signed_metadata,
            display,
            credential_configurations_supported,
        } = snapshot;

        let incoming = credential_configurations_supported
            .into_iter()
            .map(|(id, configuration)| configuration_record(id, configuration, now))
            .collect::<Vec<_>>();

        let Some(stored) = stored else {
            // configurations may have been announced on their own before
            let orphans = match self.store.get_configurations(tenant_id).await {
                Ok(configurations) => configurations,
                Err(IssuerError::NotFound) => Vec::new(),
                Err(e) => {
                    log::error!("failed to load configurations of {}: {}", tenant_id, e);
                    return Err(e);
                }
            };
            let reconciled = merge_issuer_configurations(orphans, incoming, now, self.expiry);

            let issuer = Issuer {
                tenant_id: tenant_id.to_owned(),
                credential_issuer,
                authorization_servers,
                credential_endpoint,
                batch_credential_endpoint,
                deferred_credential_endpoint,
                notification_endpoint,
                credential_response_encryption,
                display,
                credential_identifiers_supported,
                signed_metadata,
                credentials_supported: reconciled.configurations,
                first_seen: now,
                last_seen: now,
            };

            self.store.insert(&issuer, &reconciled.evicted).await.map_err(|e| {
                log::error!("failed to insert new issuer {}: {}", tenant_id, e);
                e
            })?;
            log::info!(
                "registered issuer {} for tenant {} with {} configurations",
                issuer.credential_issuer,
                tenant_id,
                issuer.credentials_supported.len()
            );
            return Ok(());
        };

        let reconciled = merge_issuer_configurations(stored.credentials_supported, incoming, now, self.expiry);
        if !reconciled.evicted.is_empty() {
            log::info!("tenant {}: expired configurations {:?}", tenant_id, reconciled.evicted);
        }

        let update = IssuerUpdate {
            authorization_servers: Some(authorization_servers),
            credential_endpoint: Some(credential_endpoint),
            batch_credential_endpoint,
            deferred_credential_endpoint,
            notification_endpoint,
            credential_response_encryption,
            credential_identifiers_supported: Some(credential_identifiers_supported),
            display: Some(display),
            signed_metadata,
            last_seen: Some(now),
            credentials_supported: reconciled.configurations,
            evicted: reconciled.evicted,
        };

        self.store
            .update(tenant_id, &credential_issuer, &update)
            .await
            .map_err(|e| {
                log::error!("failed to update existing issuer {}: {}", tenant_id, e);
                e
            })?;
        log::debug!(
            "tenant {}: reconciled {} configurations",
            tenant_id,
            update.credentials_supported.len()
        );
        Ok(())
    }

    pub async fn upsert_configuration(
        &self,
        tenant_id: &str,
        configuration_id: &str,
        configuration: CredentialConfiguration,
    ) -> Result<(), IssuerError> {
        self.upsert_configuration_at(tenant_id, configuration_id, configuration, Utc::now()).await
    }

    /// Merges one configuration into the stored set of `tenant_id` without
    /// touching the issuer row or the other configurations.
    pub async fn upsert_configuration_at(
        &self,
        tenant_id: &str,
        configuration_id: &str,
        configuration: CredentialConfiguration,
        now: DateTime<Utc>,
    ) -> Result<(), IssuerError> {
        if tenant_id.is_empty() {
            return Err(IssuerError::InvalidRequest("empty tenant id".to_owned()));
        }
        if configuration_id.is_empty() {
            return Err(IssuerError::InvalidRequest("empty configuration id".to_owned()));
        }

        let stored = match self.store.get_configurations(tenant_id).await {
            Ok(configurations) => configurations,
            Err(IssuerError::NotFound) => Vec::new(),
            Err(e) => {
                log::error!("failed to load configurations of {}: {}", tenant_id, e);
                return Err(e);
            }
        };

        let incoming = configuration_record(configuration_id.to_owned(), configuration, now);
        let merged = merge_single_configuration(stored, incoming, now);

        self.store
            .update_configurations(tenant_id, &merged, &[])
            .await
            .map_err(|e| {
                log::error!("failed to upsert configuration {} of {}: {}", configuration_id, tenant_id, e);
                e
            })
    }
}

fn configuration_record(id: String, configuration: CredentialConfiguration, now: DateTime<Utc>) -> CredentialSupported {
    CredentialSupported {
        credential_configuration_id: id,
        format: configuration.format,
        scope: configuration.scope,
        cryptographic_binding_methods_supported: configuration.cryptographic_binding_methods_supported,
        credential_signing_alg_values_supported: configuration.credential_signing_alg_values_supported,
        credential_definition: configuration.credential_definition,
        proof_types_supported: configuration.proof_types_supported,
        display: configuration.display,
        schema: configuration.schema,
        subject: configuration.subject,
        vct: configuration.vct,
        claims: configuration.claims,
        order: configuration.order,
        first_seen: now,
        last_seen: now,
    }
}

fn configuration_entry(record: CredentialSupported, include_internal: bool) -> CredentialConfiguration {
    let (schema, subject) = if include_internal {
        (record.schema, record.subject)
    } else {
        (None, None)
    };

    CredentialConfiguration {
        format: record.format,
        scope: record.scope,
        cryptographic_binding_methods_supported: record.cryptographic_binding_methods_supported,
        credential_signing_alg_values_supported: record.credential_signing_alg_values_supported,
        credential_definition: record.credential_definition,
        proof_types_supported: record.proof_types_supported,
        display: record.display,
        vct: record.vct,
        claims: record.claims,
        order: record.order,
        schema,
        subject,
    }
}

fn issuer_metadata(issuer: Issuer, include_internal: bool) -> IssuerMetadata {
    let credential_configurations_supported = issuer
        .credentials_supported
        .into_iter()
        .map(|record| (record.credential_configuration_id.clone(), configuration_entry(record, include_internal)))
        .collect();

    IssuerMetadata {
        credential_issuer: issuer.credential_issuer,
        authorization_servers: issuer.authorization_servers,
        credential_endpoint: issuer.credential_endpoint,
        batch_credential_endpoint: issuer.batch_credential_endpoint,
        deferred_credential_endpoint: issuer.deferred_credential_endpoint,
        notification_endpoint: issuer.notification_endpoint,
        credential_response_encryption: issuer.credential_response_encryption,
        credential_identifiers_supported: issuer.credential_identifiers_supported,
        signed_metadata: issuer.signed_metadata,
        display: issuer.display,
        credential_configurations_supported,
    }
}

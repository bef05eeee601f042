// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio_pg_mapper_derive::PostgresMapper;
use tokio_postgres::types::Json;

use crate::dtos::metadata_dtos::{CredentialDefinition, CredentialRespEnc, LocalizedCredential, ProofType};

/// Issuer record of a tenant together with its credential configurations.
#[derive(Clone, Debug, PartialEq)]
pub struct Issuer {
    pub tenant_id: String,
    pub credential_issuer: String,
    pub authorization_servers: Vec<String>,
    pub credential_endpoint: String,
    pub batch_credential_endpoint: Option<String>,
    pub deferred_credential_endpoint: Option<String>,
    pub notification_endpoint: Option<String>,
    pub credential_response_encryption: Option<CredentialRespEnc>,
    pub display: Vec<LocalizedCredential>,
    pub credential_identifiers_supported: bool,
    pub signed_metadata: Option<String>,
    pub credentials_supported: Vec<CredentialSupported>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// A credential configuration announced by a tenant, keyed by
/// `(tenant, credential_configuration_id)`.
#[derive(Clone, Debug, PartialEq)]
pub struct CredentialSupported {
    pub credential_configuration_id: String,
    pub format: String,
    pub scope: Option<String>,
    pub cryptographic_binding_methods_supported: Vec<String>,
    pub credential_signing_alg_values_supported: Vec<String>,
    pub credential_definition: CredentialDefinition,
    pub proof_types_supported: BTreeMap<String, ProofType>,
    pub display: Vec<LocalizedCredential>,
    pub schema: Option<Value>,
    pub subject: Option<String>,
    pub vct: Option<String>,
    pub claims: Option<Value>,
    pub order: Vec<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Partial update of an issuer row. `None` leaves the column unchanged.
#[derive(Clone, Debug, Default)]
pub struct IssuerUpdate {
    pub authorization_servers: Option<Vec<String>>,
    pub credential_endpoint: Option<String>,
    pub batch_credential_endpoint: Option<String>,
    pub deferred_credential_endpoint: Option<String>,
    pub notification_endpoint: Option<String>,
    pub credential_response_encryption: Option<CredentialRespEnc>,
    pub credential_identifiers_supported: Option<bool>,
    pub display: Option<Vec<LocalizedCredential>>,
    pub signed_metadata: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    /// Final configuration set replacing the tenant's stored one.
    pub credentials_supported: Vec<CredentialSupported>,
    /// Ids dropped from the stored set because they expired.
    pub evicted: Vec<String>,
}

/// Issuer side of a stored row.
#[derive(PostgresMapper, Debug)]
#[pg_mapper(table = "issuers")]
pub struct IssuerRow {
    pub tenant_id: String,
    pub credential_issuer: String,
    pub authorization_servers: Option<Vec<String>>,
    pub credential_endpoint: String,
    pub batch_credential_endpoint: Option<String>,
    pub deferred_credential_endpoint: Option<String>,
    pub credential_response_encryption: Option<Json<CredentialRespEnc>>,
    pub display: Option<Json<Vec<LocalizedCredential>>>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub signed_metadata: Option<String>,
    pub notification_endpoint: Option<String>,
    pub credential_identifiers_supported: bool,
}

impl From<IssuerRow> for Issuer {
    fn from(row: IssuerRow) -> Self {
        Issuer {
            tenant_id: row.tenant_id,
            credential_issuer: row.credential_issuer,
            authorization_servers: row.authorization_servers.unwrap_or_default(),
            credential_endpoint: row.credential_endpoint,
            batch_credential_endpoint: row.batch_credential_endpoint,
            deferred_credential_endpoint: row.deferred_credential_endpoint,
            notification_endpoint: row.notification_endpoint,
            credential_response_encryption: row.credential_response_encryption.map(|Json(enc)| enc),
            display: row.display.map(|Json(display)| display).unwrap_or_default(),
            credential_identifiers_supported: row.credential_identifiers_supported,
            signed_metadata: row.signed_metadata,
            credentials_supported: Vec::new(),
            first_seen: row.first_seen,
            last_seen: row.last_seen,
        }
    }
}

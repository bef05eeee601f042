// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use wellknown_issuer::dtos::metadata_dtos::{
    CredentialConfiguration, CredentialDefinition, IssuerMetadata, LocalizedCredential,
};
use wellknown_issuer::repository::memory_repo::MemoryStore;
use wellknown_issuer::services::issuer_service::IssuerService;

pub const EXPIRY_SECS: i64 = 60;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn service() -> (IssuerService, MemoryStore) {
    let store = MemoryStore::new();
    let service = IssuerService::new(Arc::new(store.clone()), Duration::seconds(EXPIRY_SECS));
    (service, store)
}

pub fn configuration(id: &str, display_name: &str) -> CredentialConfiguration {
    CredentialConfiguration {
        format: "jwt_vc_json".to_owned(),
        scope: Some(id.to_owned()),
        cryptographic_binding_methods_supported: vec!["did:iota".to_owned()],
        credential_signing_alg_values_supported: vec!["EdDSA".to_owned()],
        credential_definition: CredentialDefinition {
            types: vec!["VerifiableCredential".to_owned(), id.to_owned()],
            ..Default::default()
        },
        display: vec![LocalizedCredential {
            name: display_name.to_owned(),
            locale: Some("en-US".to_owned()),
            ..Default::default()
        }],
        schema: Some(serde_json::json!({ "type": "object" })),
        subject: Some(format!("{}Subject", id)),
        ..Default::default()
    }
}

/// Whole-issuer snapshot announcing `ids`.
pub fn snapshot(ids: &[&str]) -> IssuerMetadata {
    IssuerMetadata {
        credential_issuer: "https://issuer.example.com".to_owned(),
        authorization_servers: vec!["https://auth.example.com/realms/master".to_owned()],
        credential_endpoint: "https://issuer.example.com/credential".to_owned(),
        display: vec![LocalizedCredential {
            name: "Example Issuer".to_owned(),
            ..Default::default()
        }],
        credential_configurations_supported: ids
            .iter()
            .map(|id| (id.to_string(), configuration(id, id)))
            .collect(),
        ..Default::default()
    }
}

// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

use chrono::{TimeZone, Utc};

use crate::dtos::metadata_dtos::{CredentialDefinition, LocalizedCredential};

use super::models::{CredentialSupported, Issuer};

pub fn issuer(tenant_id: &str) -> Issuer {
    let seen = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    Issuer {
        tenant_id: tenant_id.to_owned(),
        credential_issuer: "https://issuer.example.com".to_owned(),
        authorization_servers: vec!["https://auth.example.com/realms/master".to_owned()],
        credential_endpoint: "https://issuer.example.com/credential".to_owned(),
        batch_credential_endpoint: None,
        deferred_credential_endpoint: None,
        notification_endpoint: None,
        credential_response_encryption: None,
        display: vec![LocalizedCredential {
            name: "Example Issuer".to_owned(),
            locale: Some("en-US".to_owned()),
            ..Default::default()
        }],
        credential_identifiers_supported: false,
        signed_metadata: None,
        credentials_supported: Vec::new(),
        first_seen: seen,
        last_seen: seen,
    }
}

pub fn configuration(id: &str) -> CredentialSupported {
    let seen = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    CredentialSupported {
        credential_configuration_id: id.to_owned(),
        format: "jwt_vc_json".to_owned(),
        scope: Some(id.to_owned()),
        cryptographic_binding_methods_supported: vec!["did:example".to_owned()],
        credential_signing_alg_values_supported: vec!["ES256".to_owned()],
        credential_definition: CredentialDefinition {
            types: vec!["VerifiableCredential".to_owned(), id.to_owned()],
            ..Default::default()
        },
        proof_types_supported: Default::default(),
        display: Vec::new(),
        schema: None,
        subject: None,
        vct: None,
        claims: None,
        order: Vec::new(),
        first_seen: seen,
        last_seen: seen,
    }
}

// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire shapes of the OpenID credential issuer metadata document.
//!
//! The same types are used to decode incoming snapshots and to render the
//! `/.well-known/openid-credential-issuer` document. Sub-documents
//! (display entries, credential definitions, proof types) are also the
//! shapes persisted in the JSONB columns of the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
pub struct IssuerMetadata {
    pub credential_issuer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorization_servers: Vec<String>,
    pub credential_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_credential_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deferred_credential_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_response_encryption: Option<CredentialRespEnc>,
    #[serde(default)]
    pub credential_identifiers_supported: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display: Vec<LocalizedCredential>,
    #[serde(default)]
    pub credential_configurations_supported: BTreeMap<String, CredentialConfiguration>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
pub struct CredentialRespEnc {
    #[serde(default)]
    pub alg_values_supported: Vec<String>,
    #[serde(default)]
    pub enc_values_supported: Vec<String>,
    #[serde(default)]
    pub encryption_required: bool,
}

/// One entry of `credential_configurations_supported`.
///
/// `schema` and `subject` are operator-internal and are only rendered on
/// the internal read path.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
pub struct CredentialConfiguration {
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cryptographic_binding_methods_supported: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credential_signing_alg_values_supported: Vec<String>,
    #[serde(default)]
    pub credential_definition: CredentialDefinition,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub proof_types_supported: BTreeMap<String, ProofType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display: Vec<LocalizedCredential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vct: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
pub struct CredentialDefinition {
    #[serde(rename = "type", default)]
    pub types: Vec<String>,
    #[serde(rename = "credentialSubject", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub credential_subject: BTreeMap<String, CredentialSubject>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
pub struct CredentialSubject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display: Vec<Display>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
pub struct Display {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
pub struct ProofType {
    #[serde(default)]
    pub proof_signing_alg_values_supported: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
pub struct LocalizedCredential {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<DescriptiveUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
pub struct DescriptiveUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_minimal_snapshot() {
        let snapshot: IssuerMetadata = serde_json::from_value(json!({
            "credential_issuer": "https://issuer.example.com",
            "credential_endpoint": "https://issuer.example.com/credential",
            "credential_configurations_supported": {
                "DeveloperCredential": {
                    "format": "jwt_vc_json",
                    "credential_definition": { "type": ["VerifiableCredential", "DeveloperCredential"] }
                }
            }
        }))
        .expect("minimal snapshot should decode");

        assert!(snapshot.authorization_servers.is_empty());
        assert!(snapshot.credential_response_encryption.is_none());
        let config = &snapshot.credential_configurations_supported["DeveloperCredential"];
        assert_eq!(config.credential_definition.types[1], "DeveloperCredential");
    }

    #[test]
    fn rejects_snapshot_without_endpoint() {
        let decoded = serde_json::from_value::<IssuerMetadata>(json!({
            "credential_issuer": "https://issuer.example.com"
        }));
        assert!(decoded.is_err());
    }

    #[test]
    fn omits_absent_internal_fields() {
        let config = CredentialConfiguration {
            format: "vc+sd-jwt".to_owned(),
            ..Default::default()
        };
        let rendered = serde_json::to_value(&config).expect("serializable");
        assert!(rendered.get("schema").is_none());
        assert!(rendered.get("subject").is_none());
    }
}

// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dtos::metadata_dtos::{CredentialConfiguration, IssuerMetadata};
use crate::errors::IssuerError;

pub const EVENT_TYPE_ISSUER_REGISTRATION: &str = "issuer.registration";
pub const EVENT_TYPE_CREDENTIAL_REGISTRATION: &str = "issuer.credential.registration";
pub const SOURCE_WELL_KNOWN_SERVICE: &str = "/wellknown-service";

/// Structured-mode CloudEvents envelope.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CloudEvent {
    pub specversion: String,
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl CloudEvent {
    pub fn new(source: &str, ty: &str, data: Value) -> Self {
        Self {
            specversion: "1.0".to_owned(),
            id: uuid::Uuid::new_v4().to_string(),
            source: source.to_owned(),
            ty: ty.to_owned(),
            datacontenttype: Some("application/json".to_owned()),
            data,
        }
    }

    /// Decodes the event payload.
    pub fn data_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, IssuerError> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| IssuerError::MalformedSnapshot(format!("{} event {}: {}", self.ty, self.id, e)))
    }
}

/// Whole-issuer snapshot published by an issuer.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct IssuerRegistration {
    pub tenant_id: String,
    #[serde(default)]
    pub request_id: String,
    pub issuer: IssuerMetadata,
}

/// Single credential configuration published independently of its issuer.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CredentialRegistration {
    pub tenant_id: String,
    #[serde(default)]
    pub request_id: String,
    pub configuration_id: String,
    pub credential_configuration: CredentialConfiguration,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GetIssuerMetadataReq {
    pub tenant_id: String,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GetIssuerMetadataReply {
    pub tenant_id: String,
    pub request_id: String,
    pub issuer: IssuerMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_credential_registration_payload() {
        let event = CloudEvent::new(
            "test-client",
            EVENT_TYPE_CREDENTIAL_REGISTRATION,
            json!({
                "tenant_id": "tenant_space",
                "configuration_id": "DeveloperCredential",
                "credential_configuration": { "format": "jwt_vc_json" }
            }),
        );

        let msg: CredentialRegistration = event.data_as().expect("payload should decode");
        assert_eq!(msg.configuration_id, "DeveloperCredential");
        assert_eq!(msg.credential_configuration.format, "jwt_vc_json");
        assert!(msg.request_id.is_empty());
    }

    #[test]
    fn malformed_payload_is_reported() {
        let event = CloudEvent::new("test-client", EVENT_TYPE_ISSUER_REGISTRATION, json!({ "tenant_id": 7 }));
        let err = event.data_as::<IssuerRegistration>().unwrap_err();
        assert!(matches!(err, IssuerError::MalformedSnapshot(_)));
    }
}

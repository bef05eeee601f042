// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_pg_mapper::FromTokioPostgresRow;
use tokio_postgres::types::{FromSql, Json};
use tokio_postgres::{GenericClient, Row};

use crate::errors::IssuerError;

use super::models::{CredentialSupported, Issuer, IssuerRow, IssuerUpdate};
use super::query::{param, BoxedParam, InsertStatement, UpdateStatement};
use super::rows::{reduce_configurations, reduce_issuers, ConfigurationRow, JoinedRow};

pub const TBL_ISSUERS: &str = "issuers";
pub const TBL_CREDENTIALS_SUPPORTED: &str = "credentials_supported";

const CONFIGURATION_COLUMNS: &[&str] = &[
    "tenant_id",
    "credential_configuration_id",
    "format",
    "scope",
    "cryptographic_binding_methods_supported",
    "credential_signing_alg_values_supported",
    "credential_definition",
    "proof_types_supported",
    "schema",
    "subject",
    "display",
    "vct",
    "claims",
    "\"order\"",
    "first_seen",
    "last_seen",
];

/// Prefix of the aliased configuration columns in select lists, keeps them
/// apart from the issuer columns of the same name in the join.
const CONFIGURATION_ALIAS: &str = "cs_";

/// `credentials_supported.<col> AS cs_<col>, ...` without the tenant column.
fn configuration_fields() -> String {
    CONFIGURATION_COLUMNS
        .iter()
        .skip(1)
        .map(|col| {
            format!(
                "{}.{} AS {}{}",
                TBL_CREDENTIALS_SUPPORTED,
                col,
                CONFIGURATION_ALIAS,
                col.trim_matches('"')
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn issuers_get_statement() -> String {
    include_str!("./sql/issuers_get.sql")
        .replace("$table_fields", &IssuerRow::sql_table_fields())
        .replace("$configuration_fields", &configuration_fields())
}

fn configurations_get_statement() -> String {
    include_str!("./sql/credentials_supported_get.sql").replace("$configuration_fields", &configuration_fields())
}

fn column<'a, T: FromSql<'a>>(row: &'a Row, name: &str) -> Result<T, IssuerError> {
    row.try_get(name).map_err(|e| {
        log::error!("failed to scan column {}: {}", name, e);
        IssuerError::store("failed to scan row", e)
    })
}

fn aliased<'a, T: FromSql<'a>>(row: &'a Row, name: &str) -> Result<T, IssuerError> {
    column(row, &format!("{}{}", CONFIGURATION_ALIAS, name))
}

/// Decodes the configuration side of a row. A null id means the left join
/// matched nothing.
fn configuration_from_row(row: &Row) -> Result<Option<CredentialSupported>, IssuerError> {
    let id: Option<String> = aliased(row, "credential_configuration_id")?;
    let Some(credential_configuration_id) = id else {
        return Ok(None);
    };

    let credential_definition: Option<Json<_>> = aliased(row, "credential_definition")?;
    let proof_types_supported: Option<Json<_>> = aliased(row, "proof_types_supported")?;
    let schema: Option<Json<_>> = aliased(row, "schema")?;
    let display: Option<Json<_>> = aliased(row, "display")?;
    let claims: Option<Json<_>> = aliased(row, "claims")?;
    let binding: Option<Vec<String>> = aliased(row, "cryptographic_binding_methods_supported")?;
    let signing: Option<Vec<String>> = aliased(row, "credential_signing_alg_values_supported")?;
    let order: Option<Vec<String>> = aliased(row, "order")?;
    let first_seen: DateTime<Utc> = aliased(row, "first_seen")?;
    let last_seen: DateTime<Utc> = aliased(row, "last_seen")?;

    Ok(Some(CredentialSupported {
        credential_configuration_id,
        format: aliased(row, "format")?,
        scope: aliased(row, "scope")?,
        cryptographic_binding_methods_supported: binding.unwrap_or_default(),
        credential_signing_alg_values_supported: signing.unwrap_or_default(),
        credential_definition: credential_definition.map(|Json(v)| v).unwrap_or_default(),
        proof_types_supported: proof_types_supported.map(|Json(v)| v).unwrap_or_default(),
        display: display.map(|Json(v)| v).unwrap_or_default(),
        schema: schema.map(|Json(v)| v),
        subject: aliased(row, "subject")?,
        vct: aliased(row, "vct")?,
        claims: claims.map(|Json(v)| v),
        order: order.unwrap_or_default(),
        first_seen,
        last_seen,
    }))
}

fn configuration_params(tenant_id: &str, c: &CredentialSupported) -> Vec<BoxedParam> {
    vec![
        param(tenant_id.to_owned()),
        param(c.credential_configuration_id.clone()),
        param(c.format.clone()),
        param(c.scope.clone()),
        param(c.cryptographic_binding_methods_supported.clone()),
        param(c.credential_signing_alg_values_supported.clone()),
        param(Json(c.credential_definition.clone())),
        param(Json(c.proof_types_supported.clone())),
        param(c.schema.clone().map(Json)),
        param(c.subject.clone()),
        param(Json(c.display.clone())),
        param(c.vct.clone()),
        param(c.claims.clone().map(Json)),
        param(c.order.clone()),
        param(c.first_seen),
        param(c.last_seen),
    ]
}

/// Issuer record operations, available on plain connections and on
/// transactions alike.
#[async_trait]
pub trait IssuerRecordsExt {
    async fn list_issuers(&self, tenant_id: &str) -> Result<Vec<Issuer>, IssuerError>;
    async fn list_configurations(&self, tenant_id: &str) -> Result<Vec<(String, Vec<CredentialSupported>)>, IssuerError>;
    async fn insert_issuer_record(&self, issuer: &Issuer) -> Result<(), IssuerError>;
    async fn update_issuer_record(&self, tenant_id: &str, credential_issuer: &str, update: &IssuerUpdate) -> Result<u64, IssuerError>;
    async fn insert_configurations(&self, tenant_id: &str, configurations: &[CredentialSupported]) -> Result<(), IssuerError>;
    async fn delete_configurations(&self, tenant_id: &str, ids: &[String]) -> Result<u64, IssuerError>;
    async fn replace_configurations(&self, tenant_id: &str, configurations: &[CredentialSupported], evicted: &[String]) -> Result<(), IssuerError>;
}

#[async_trait]
impl<C> IssuerRecordsExt for C
where
    C: GenericClient + Sync,
{
    async fn list_issuers(&self, tenant_id: &str) -> Result<Vec<Issuer>, IssuerError> {
        let stmt = issuers_get_statement();

        let rows = self.query(stmt.as_str(), &[&tenant_id]).await.map_err(|e| {
            log::error!("failed to list issuer {}: {}", tenant_id, e);
            IssuerError::store("failed to execute query", e)
        })?;

        let joined = rows
            .iter()
            .map(|row| -> Result<JoinedRow, IssuerError> {
                Ok(JoinedRow {
                    issuer: Issuer::from(IssuerRow::from_row_ref(row)?),
                    configuration: configuration_from_row(row)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reduce_issuers(joined))
    }

    async fn list_configurations(&self, tenant_id: &str) -> Result<Vec<(String, Vec<CredentialSupported>)>, IssuerError> {
        let stmt = configurations_get_statement();

        let rows = self.query(stmt.as_str(), &[&tenant_id]).await.map_err(|e| {
            log::error!("failed to list configurations of {}: {}", tenant_id, e);
            IssuerError::store("failed to execute query", e)
        })?;

        let mut flat = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            // not joined, the id column is never null here
            if let Some(configuration) = configuration_from_row(row)? {
                flat.push(ConfigurationRow { tenant_id: aliased(row, "tenant_id")?, configuration });
            }
        }

        Ok(reduce_configurations(flat))
    }

    async fn insert_issuer_record(&self, issuer: &Issuer) -> Result<(), IssuerError> {
        let stmt = include_str!("./sql/issuers_insert.sql");

        self.execute(
            stmt,
            &[
                &issuer.tenant_id,
                &issuer.credential_issuer,
                &issuer.authorization_servers,
                &issuer.credential_endpoint,
                &issuer.batch_credential_endpoint,
                &issuer.deferred_credential_endpoint,
                &issuer.credential_response_encryption.as_ref().map(Json),
                &Json(&issuer.display),
                &issuer.first_seen,
                &issuer.last_seen,
                &issuer.signed_metadata,
                &issuer.notification_endpoint,
                &issuer.credential_identifiers_supported,
            ],
        )
        .await
        .map_err(|e| {
            log::error!("failed to insert issuer {}: {}", issuer.tenant_id, e);
            IssuerError::store("failed to execute query", e)
        })?;
        Ok(())
    }

    async fn update_issuer_record(&self, tenant_id: &str, credential_issuer: &str, update: &IssuerUpdate) -> Result<u64, IssuerError> {
        let stmt = UpdateStatement::new(TBL_ISSUERS)
            .set_if("authorization_servers", update.authorization_servers.clone())
            .set_if("credential_endpoint", update.credential_endpoint.clone())
            .set_if("batch_credential_endpoint", update.batch_credential_endpoint.clone())
            .set_if("deferred_credential_endpoint", update.deferred_credential_endpoint.clone())
            .set_if("notification_endpoint", update.notification_endpoint.clone())
            .set_if("credential_response_encryption", update.credential_response_encryption.clone().map(Json))
            .set_if("credential_identifiers_supported", update.credential_identifiers_supported)
            .set_if("display", update.display.clone().map(Json))
            .set_if("signed_metadata", update.signed_metadata.clone())
            .set_if("last_seen", update.last_seen)
            .filter("tenant_id", tenant_id.to_owned())
            .filter("credential_issuer", credential_issuer.to_owned());

        let (sql, params) = stmt.to_sql()?;
        self.execute(sql.as_str(), &params).await.map_err(|e| {
            log::error!("failed to update issuer {}: {}", tenant_id, e);
            IssuerError::store("failed to execute query", e)
        })
    }

    async fn insert_configurations(&self, tenant_id: &str, configurations: &[CredentialSupported]) -> Result<(), IssuerError> {
        let stmt = configurations
            .iter()
            .fold(InsertStatement::new(TBL_CREDENTIALS_SUPPORTED, CONFIGURATION_COLUMNS), |stmt, c| {
                stmt.values(configuration_params(tenant_id, c))
            });

        if stmt.is_empty() {
            return Ok(());
        }

        let (sql, params) = stmt.to_sql()?;
        self.execute(sql.as_str(), &params).await.map_err(|e| {
            log::error!("failed to insert credentials supported of {}: {}", tenant_id, e);
            IssuerError::store("failed to insert credentials supported", e)
        })?;
        Ok(())
    }

    async fn delete_configurations(&self, tenant_id: &str, ids: &[String]) -> Result<u64, IssuerError> {
        let stmt = include_str!("./sql/credentials_supported_delete.sql");
        self.execute(stmt, &[&tenant_id, &ids]).await.map_err(|e| {
            log::error!("failed to delete credentials supported of {}: {}", tenant_id, e);
            IssuerError::store("failed to update credentials supported", e)
        })
    }

    async fn replace_configurations(&self, tenant_id: &str, configurations: &[CredentialSupported], evicted: &[String]) -> Result<(), IssuerError> {
        if configurations.is_empty() && evicted.is_empty() {
            return Ok(());
        }

        let ids = configurations
            .iter()
            .map(|c| c.credential_configuration_id.clone())
            .chain(evicted.iter().cloned())
            .collect::<Vec<_>>();

        let removed = self.delete_configurations(tenant_id, &ids).await?;
        log::debug!("tenant {}: removed {} configuration rows before insert", tenant_id, removed);

        self.insert_configurations(tenant_id, configurations).await
    }
}

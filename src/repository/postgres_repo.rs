// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::Result;
use async_trait::async_trait;

use deadpool_postgres::{ManagerConfig, Pool, PoolConfig, RecyclingMethod};
use tokio_postgres::NoTls;

use crate::errors::IssuerError;
use crate::utils::configs::DatabaseConfig;

use super::models::{CredentialSupported, Issuer, IssuerUpdate};
use super::operations::IssuerRecordsExt;
use super::IssuerStore;

pub async fn init(configuration: DatabaseConfig) -> Result<Pool> {
    log::info!("init database");

    let mut config = deadpool_postgres::Config::new();
    config.user = Some(configuration.db_user);
    config.password = Some(configuration.db_password.value());
    config.dbname = Some(configuration.db_name);
    config.host = Some(configuration.db_host);
    config.port = Some(configuration.db_port);
    config.pool = Some(PoolConfig::new(configuration.db_max_pool_size));

    config.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    let pool = config.create_pool(None, NoTls)?;
    log::info!("pool database");
    Ok(pool)
}

/// Creates the issuers and credentials_supported relations when missing.
pub async fn migrate(pool: &Pool) -> Result<(), IssuerError> {
    let client = pool.get().await?;
    client
        .batch_execute(include_str!("./sql/schema.sql"))
        .await
        .map_err(|e| IssuerError::store("failed to apply schema", e))?;
    log::info!("database schema ready");
    Ok(())
}

/// [`IssuerStore`] backed by Postgres. Writes touching both relations run
/// in one transaction.
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IssuerStore for PostgresStore {
    async fn get(&self, tenant_id: &str) -> Result<Issuer, IssuerError> {
        let client = self.pool.get().await?;
        let client: &tokio_postgres::Client = &client;

        client
            .list_issuers(tenant_id)
            .await?
            .into_iter()
            .next()
            .ok_or(IssuerError::NotFound)
    }

    async fn get_configurations(&self, tenant_id: &str) -> Result<Vec<CredentialSupported>, IssuerError> {
        let client = self.pool.get().await?;
        let client: &tokio_postgres::Client = &client;

        client
            .list_configurations(tenant_id)
            .await?
            .into_iter()
            .next()
            .map(|(_, configurations)| configurations)
            .ok_or(IssuerError::NotFound)
    }

    async fn insert(&self, issuer: &Issuer, evicted: &[String]) -> Result<(), IssuerError> {
        let mut client = self.pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| IssuerError::store("failed to open transaction", e))?;

        let db: &tokio_postgres::Transaction<'_> = &tx;
        db.insert_issuer_record(issuer).await?;
        db.replace_configurations(&issuer.tenant_id, &issuer.credentials_supported, evicted)
            .await?;

        tx.commit()
            .await
            .map_err(|e| IssuerError::store("failed to commit transaction", e))
    }

    async fn update(&self, tenant_id: &str, credential_issuer: &str, update: &IssuerUpdate) -> Result<(), IssuerError> {
        let mut client = self.pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| IssuerError::store("failed to open transaction", e))?;

        let db: &tokio_postgres::Transaction<'_> = &tx;
        let updated = db.update_issuer_record(tenant_id, credential_issuer, update).await?;
        if updated == 0 {
            log::warn!("no issuer row of {} matches credential issuer {}", tenant_id, credential_issuer);
        }
        db.replace_configurations(tenant_id, &update.credentials_supported, &update.evicted)
            .await?;

        tx.commit()
            .await
            .map_err(|e| IssuerError::store("failed to commit transaction", e))
    }

    async fn update_configurations(&self, tenant_id: &str, configurations: &[CredentialSupported], evicted: &[String]) -> Result<(), IssuerError> {
        let mut client = self.pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| IssuerError::store("failed to open transaction", e))?;

        let db: &tokio_postgres::Transaction<'_> = &tx;
        db.replace_configurations(tenant_id, configurations, evicted).await?;

        tx.commit()
            .await
            .map_err(|e| IssuerError::store("failed to commit transaction", e))
    }
}

// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod models;
pub mod operations;
pub mod postgres_repo;
pub mod memory_repo;
pub mod query;
pub mod rows;

#[cfg(test)]
pub(crate) mod testutil;

use async_trait::async_trait;

use crate::errors::IssuerError;
use models::{CredentialSupported, Issuer, IssuerUpdate};

/// Persistence of issuer records and their credential configurations.
///
/// Implementations must be safe for concurrent callers; no locking happens
/// above this layer.
#[async_trait]
pub trait IssuerStore: Send + Sync {
    /// Issuer of `tenant_id` with its full configuration set.
    async fn get(&self, tenant_id: &str) -> Result<Issuer, IssuerError>;

    /// Configuration set of `tenant_id`, ordered by configuration id.
    /// `NotFound` when the tenant has no configuration.
    async fn get_configurations(&self, tenant_id: &str) -> Result<Vec<CredentialSupported>, IssuerError>;

    /// Inserts the issuer row, then replaces the configurations it carries
    /// and removes the `evicted` ids. Configurations stored before the issuer
    /// row existed are replaced, not duplicated. Fails when the tenant
    /// already has an issuer row.
    async fn insert(&self, issuer: &Issuer, evicted: &[String]) -> Result<(), IssuerError>;

    /// Applies the partial update to the issuer row identified by tenant
    /// and issuer url, then replaces the configurations named in `update`.
    async fn update(&self, tenant_id: &str, credential_issuer: &str, update: &IssuerUpdate) -> Result<(), IssuerError>;

    /// Replaces the configurations named in `configurations` and removes the
    /// `evicted` ids, leaving every other configuration of the tenant alone.
    async fn update_configurations(&self, tenant_id: &str, configurations: &[CredentialSupported], evicted: &[String]) -> Result<(), IssuerError>;
}

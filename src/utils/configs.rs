// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{convert::Infallible, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Result};
use clap::{Args, ValueEnum};
use zeroize::ZeroizeOnDrop;

/// Simple configuration of a generic secret read from Args.
/// Must be deleted when it is not needed anymore
#[derive(Debug, Clone, ZeroizeOnDrop)]
pub struct ConfigSecret(String);

impl FromStr for ConfigSecret {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl ConfigSecret {
    pub fn value(&self) -> String {
        self.0.clone()
    }
}

/// Configuration parameters for the issuer database
#[derive(Args, Debug)]
pub struct DatabaseConfig {
    /// Postgres host address
    #[arg(long, env, required = true)]
    pub db_host: String,
    /// Postgres db port
    #[arg(long, env, default_value_t = 5432)]
    pub db_port: u16,
    /// Postgres db name
    #[arg(long, env, required = true)]
    pub db_name: String,
    /// Postgres username
    #[arg(long, env, required = true)]
    pub db_user: String,
    /// Postgres password
    #[arg(long, env, required = true)]
    pub db_password: ConfigSecret,
    /// Postgres max pool size
    #[arg(long, env, default_value_t = 16)]
    pub db_max_pool_size: usize,
}

/// Configuration for_ the http server
#[derive(Args, Debug)]
pub struct HttpServerConfig {
    /// Bind address for the http server
    #[arg(long, env, required = true)]
    pub host_address: String,

    /// Listening port for the http server
    #[arg(long, env, default_value_t = 8080)]
    pub host_port: u16,
}

/// Reconciliation parameters
#[derive(Args, Debug)]
pub struct ReconcilerConfig {
    /// Seconds after which a credential configuration that was not announced
    /// again is dropped
    #[arg(long, env, default_value_t = 60)]
    pub credential_configuration_expiration: u64,
}

impl ReconcilerConfig {
    pub fn expiry(&self) -> Result<chrono::Duration> {
        i64::try_from(self.credential_configuration_expiration)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                anyhow!(
                    "credential configuration expiration of {}s is out of range",
                    self.credential_configuration_expiration
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImporterKind {
    /// Periodically pull issuer metadata from a git repository
    Git,
    /// Receive issuer metadata as CloudEvents
    Broadcast,
}

/// Update source configuration
#[derive(Args, Debug, Clone)]
pub struct ImporterConfig {
    /// Source of issuer metadata updates
    #[arg(long, env, value_enum, default_value_t = ImporterKind::Broadcast)]
    pub importer: ImporterKind,

    /// Repository holding one directory per tenant
    #[arg(long, env, required_if_eq("importer", "git"))]
    pub git_repo: Option<String>,

    /// Access token for https repositories
    #[arg(long, env)]
    pub git_token: Option<ConfigSecret>,

    /// Seconds between two pulls of the repository, must stay below the
    /// credential configuration expiration
    #[arg(long, env, default_value_t = 20)]
    pub git_interval: u64,

    /// Local checkout of the repository
    #[arg(long, env)]
    pub git_cache_dir: Option<PathBuf>,

    /// Url path the checkout is served under, e.g. `/images`, so that logo
    /// urls in the published metadata resolve
    #[arg(long, env)]
    pub git_image_path: Option<String>,

    /// Events buffered between ingestion and reconciliation
    #[arg(long, env, default_value_t = 256)]
    pub event_queue_capacity: usize,
}

impl ImporterConfig {
    pub fn git_interval(&self) -> Duration {
        Duration::from_secs(self.git_interval.max(1))
    }

    pub fn git_cache_dir(&self) -> PathBuf {
        self.git_cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("cache"))
    }

    /// A git source re-announces every configuration once per interval, so
    /// the interval has to fit in the expiry window with room for the pull.
    pub fn check_git_interval(&self, expiry: chrono::Duration) -> Result<()> {
        if self.importer != ImporterKind::Git {
            return Ok(());
        }
        let interval = i64::try_from(self.git_interval().as_secs()).unwrap_or(i64::MAX);
        if interval >= expiry.num_seconds() {
            bail!(
                "git interval of {}s must be shorter than the credential configuration expiration of {}s",
                interval,
                expiry.num_seconds()
            );
        }
        Ok(())
    }
}

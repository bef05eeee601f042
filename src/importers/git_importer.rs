// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Pull-based source: a git repository with one directory per tenant.
//!
//! ```text
//! <tenant>/issuer.json
//! <tenant>/credentials/<configuration id>.json
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::process::Command;
use tokio::sync::watch;

use crate::dtos::metadata_dtos::{CredentialConfiguration, IssuerMetadata};
use crate::errors::IssuerError;
use crate::services::issuer_service::IssuerService;
use crate::utils::configs::{ConfigSecret, ImporterConfig};

use super::{stopped, Importer, LoopHandle};

const ISSUER_FILE: &str = "issuer.json";
const CREDENTIALS_DIR: &str = "credentials";

pub struct GitImporter {
    source: Arc<GitSource>,
    handle: LoopHandle,
}

struct GitSource {
    service: IssuerService,
    remote: String,
    token: Option<ConfigSecret>,
    checkout: PathBuf,
    interval: Duration,
    errored: AtomicBool,
}

impl GitImporter {
    pub fn new(service: IssuerService, config: &ImporterConfig) -> Result<Self, IssuerError> {
        let remote = config
            .git_repo
            .clone()
            .filter(|repo| !repo.is_empty())
            .ok_or_else(|| IssuerError::Importer("no git repository configured".to_owned()))?;

        Ok(Self {
            source: Arc::new(GitSource {
                service,
                remote,
                token: config.git_token.clone(),
                checkout: config.git_cache_dir(),
                interval: config.git_interval(),
                errored: AtomicBool::new(false),
            }),
            handle: LoopHandle::new(),
        })
    }
}

#[async_trait]
impl Importer for GitImporter {
    async fn start(&self) -> Result<(), IssuerError> {
        let source = self.source.clone();
        let stop = self.handle.subscribe();
        log::info!(
            "starting git importer on {} every {}s",
            source.remote,
            source.interval.as_secs()
        );
        self.handle.attach(tokio::spawn(source.run(stop))).await
    }

    async fn stop(&self) -> Result<(), IssuerError> {
        self.handle.shutdown().await
    }

    fn got_errors(&self) -> bool {
        self.source.errored.load(Ordering::Relaxed)
    }

    async fn get_credential_issuer_metadata(&self, tenant_id: &str) -> Result<IssuerMetadata, IssuerError> {
        self.source.service.get_issuer(tenant_id, false).await
    }
}

impl GitSource {
    async fn run(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stopped(&mut stop) => break,
                _ = ticker.tick() => self.sync().await,
            }
        }
        log::info!("git importer stopped");
    }

    async fn sync(&self) {
        if let Err(e) = self.checkout().await {
            log::error!("checkout of {} failed: {}", self.remote, e);
            self.errored.store(true, Ordering::Relaxed);
            return;
        }
        self.errored.store(false, Ordering::Relaxed);

        let snapshots = match load_snapshots(&self.checkout).await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                log::error!("failed to scan {}: {}", self.checkout.display(), e);
                return;
            }
        };

        for (tenant_id, snapshot) in snapshots {
            if let Err(e) = self.service.upsert_issuer(&tenant_id, snapshot).await {
                log::error!("failed to import issuer of {}: {}", tenant_id, e);
            }
        }
    }

    async fn checkout(&self) -> Result<(), IssuerError> {
        let auth = auth_env(&self.remote, self.token.as_ref());
        let target = self.checkout.to_string_lossy().into_owned();

        if tokio::fs::metadata(self.checkout.join(".git")).await.is_ok() {
            run_git(&["-C", &target, "pull", "--ff-only", &self.remote], &auth).await?;
        } else {
            if let Some(parent) = self.checkout.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| IssuerError::Importer(format!("creating {}: {}", parent.display(), e)))?;
            }
            run_git(&["clone", &self.remote, &target], &auth).await?;
        }

        let head = run_git(&["-C", &target, "rev-parse", "HEAD"], &[]).await?;
        log::debug!("{} checked out at {}", self.remote, head);
        Ok(())
    }
}

async fn run_git(args: &[&str], env: &[(String, String)]) -> Result<String, IssuerError> {
    let output = Command::new("git")
        .args(args)
        .envs(env.iter().map(|(key, value)| (key, value)))
        .env("GIT_TERMINAL_PROMPT", "0")
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| IssuerError::Importer(format!("cannot run git: {}", e)))?;

    if !output.status.success() {
        return Err(IssuerError::Importer(format!(
            "git exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

/// Git configuration carrying `token` as a basic auth header for https
/// remotes. Passed through the environment so the token stays off the
/// command line and out of the stored remote url.
pub fn auth_env(remote: &str, token: Option<&ConfigSecret>) -> Vec<(String, String)> {
    match token {
        Some(token) if remote.starts_with("https://") => {
            let credentials = STANDARD.encode(format!("token:{}", token.value()));
            vec![
                ("GIT_CONFIG_COUNT".to_owned(), "1".to_owned()),
                ("GIT_CONFIG_KEY_0".to_owned(), "http.extraHeader".to_owned()),
                ("GIT_CONFIG_VALUE_0".to_owned(), format!("Authorization: Basic {}", credentials)),
            ]
        }
        _ => Vec::new(),
    }
}

/// Builds one whole-issuer snapshot per tenant directory under `root`.
///
/// Tenants without a readable `issuer.json` are skipped, as are credential
/// files that do not decode.
pub async fn load_snapshots(root: &Path) -> Result<Vec<(String, IssuerMetadata)>, IssuerError> {
    let mut tenants = Vec::new();
    let mut entries = tokio::fs::read_dir(root)
        .await
        .map_err(|e| IssuerError::Importer(format!("reading {}: {}", root.display(), e)))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| IssuerError::Importer(format!("reading {}: {}", root.display(), e)))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir || name.starts_with('.') {
            continue;
        }
        tenants.push(name);
    }
    tenants.sort();

    let mut snapshots = Vec::with_capacity(tenants.len());
    for tenant_id in tenants {
        match load_tenant(&root.join(&tenant_id)).await {
            Ok(snapshot) => snapshots.push((tenant_id, snapshot)),
            Err(e) => log::warn!("skipping tenant {}: {}", tenant_id, e),
        }
    }
    Ok(snapshots)
}

async fn load_tenant(dir: &Path) -> Result<IssuerMetadata, IssuerError> {
    let mut issuer: IssuerMetadata = read_json(&dir.join(ISSUER_FILE)).await?;
    let configurations = load_configurations(&dir.join(CREDENTIALS_DIR)).await?;
    issuer.credential_configurations_supported.extend(configurations);
    Ok(issuer)
}

async fn load_configurations(dir: &Path) -> Result<BTreeMap<String, CredentialConfiguration>, IssuerError> {
    let mut configurations = BTreeMap::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(configurations),
        Err(e) => return Err(IssuerError::Importer(format!("reading {}: {}", dir.display(), e))),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| IssuerError::Importer(format!("reading {}: {}", dir.display(), e)))?
    {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let Some(id) = path.file_stem().and_then(|stem| stem.to_str()).map(str::to_owned) else {
            continue;
        };

        match read_json::<CredentialConfiguration>(&path).await {
            Ok(configuration) => {
                configurations.insert(id, configuration);
            }
            Err(e) => log::warn!("skipping {}: {}", path.display(), e),
        }
    }
    Ok(configurations)
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, IssuerError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| IssuerError::Importer(format!("reading {}: {}", path.display(), e)))?;
    serde_json::from_slice(&raw).map_err(|e| IssuerError::MalformedSnapshot(format!("{}: {}", path.display(), e)))
}

// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Update sources feeding issuer snapshots into the [`IssuerService`].
//!
//! [`IssuerService`]: crate::services::issuer_service::IssuerService

pub mod broadcast_importer;
pub mod git_importer;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::dtos::metadata_dtos::IssuerMetadata;
use crate::errors::IssuerError;

#[async_trait]
pub trait Importer: Send + Sync {
    /// Spawns the listen loop. Returns once the loop is running.
    async fn start(&self) -> Result<(), IssuerError>;

    /// Signals the listen loop to exit and waits for it.
    async fn stop(&self) -> Result<(), IssuerError>;

    /// Whether the last unit of work of the source failed.
    fn got_errors(&self) -> bool;

    async fn get_credential_issuer_metadata(&self, tenant_id: &str) -> Result<IssuerMetadata, IssuerError>;
}

/// Stop signal and handle of a spawned listen loop.
pub(crate) struct LoopHandle {
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LoopHandle {
    pub(crate) fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self { stop, task: Mutex::new(None) }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }

    pub(crate) async fn attach(&self, task: JoinHandle<()>) -> Result<(), IssuerError> {
        let mut slot = self.task.lock().await;
        if slot.is_some() {
            task.abort();
            return Err(IssuerError::Importer("importer already started".to_owned()));
        }
        *slot = Some(task);
        Ok(())
    }

    pub(crate) async fn shutdown(&self) -> Result<(), IssuerError> {
        self.stop.send_replace(true);
        if let Some(task) = self.task.lock().await.take() {
            task.await
                .map_err(|e| IssuerError::Importer(format!("listen loop failed: {}", e)))?;
        }
        Ok(())
    }
}

/// Resolves once the stop signal is raised or its sender is gone.
pub(crate) async fn stopped(stop: &mut watch::Receiver<bool>) {
    loop {
        let raised = *stop.borrow();
        if raised || stop.changed().await.is_err() {
            return;
        }
    }
}

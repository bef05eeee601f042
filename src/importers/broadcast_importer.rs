// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Push-based source: CloudEvents published by issuers, buffered in a
//! bounded queue and reconciled one at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};

use crate::dtos::events_dtos::{
    CloudEvent, CredentialRegistration, IssuerRegistration, EVENT_TYPE_CREDENTIAL_REGISTRATION,
    EVENT_TYPE_ISSUER_REGISTRATION,
};
use crate::dtos::metadata_dtos::IssuerMetadata;
use crate::errors::IssuerError;
use crate::services::issuer_service::IssuerService;

use super::{stopped, Importer, LoopHandle};

/// Producer side of the event queue, handed to the ingestion route.
#[derive(Clone)]
pub struct EventSender(mpsc::Sender<CloudEvent>);

impl EventSender {
    pub async fn publish(&self, event: CloudEvent) -> Result<(), IssuerError> {
        self.0
            .send(event)
            .await
            .map_err(|_| IssuerError::Importer("event queue closed".to_owned()))
    }
}

pub struct BroadcastImporter {
    service: IssuerService,
    sender: mpsc::Sender<CloudEvent>,
    receiver: Mutex<Option<mpsc::Receiver<CloudEvent>>>,
    errored: Arc<AtomicBool>,
    handle: LoopHandle,
}

impl BroadcastImporter {
    pub fn new(service: IssuerService, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            service,
            sender,
            receiver: Mutex::new(Some(receiver)),
            errored: Arc::new(AtomicBool::new(false)),
            handle: LoopHandle::new(),
        }
    }

    pub fn sender(&self) -> EventSender {
        EventSender(self.sender.clone())
    }
}

#[async_trait]
impl Importer for BroadcastImporter {
    async fn start(&self) -> Result<(), IssuerError> {
        let receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| IssuerError::Importer("importer already started".to_owned()))?;

        log::info!("starting broadcast importer");
        let task = tokio::spawn(listen(
            self.service.clone(),
            receiver,
            self.handle.subscribe(),
            self.errored.clone(),
        ));
        self.handle.attach(task).await
    }

    async fn stop(&self) -> Result<(), IssuerError> {
        self.handle.shutdown().await
    }

    fn got_errors(&self) -> bool {
        self.errored.load(Ordering::Relaxed)
    }

    async fn get_credential_issuer_metadata(&self, tenant_id: &str) -> Result<IssuerMetadata, IssuerError> {
        self.service.get_issuer(tenant_id, false).await
    }
}

async fn listen(
    service: IssuerService,
    mut receiver: mpsc::Receiver<CloudEvent>,
    mut stop: watch::Receiver<bool>,
    errored: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            _ = stopped(&mut stop) => break,
            event = receiver.recv() => match event {
                Some(event) => {
                    if let Err(e) = handle_event(&service, event).await {
                        log::error!("{}", e);
                    }
                }
                None => {
                    log::error!("event queue closed");
                    errored.store(true, Ordering::Relaxed);
                    break;
                }
            },
        }
    }
    log::info!("broadcast importer stopped");
}

/// Reconciles a single event.
///
/// Unknown event types are ignored. Store failures are returned, every
/// other rejection is logged here and the event is dropped.
pub async fn handle_event(service: &IssuerService, event: CloudEvent) -> Result<(), IssuerError> {
    log::debug!("received {} event {} from {}", event.ty, event.id, event.source);

    let outcome = match event.ty.as_str() {
        EVENT_TYPE_ISSUER_REGISTRATION => match event.data_as::<IssuerRegistration>() {
            Ok(msg) if msg.tenant_id.is_empty() => Err(IssuerError::InvalidRequest(format!(
                "issuer registration {} without tenant id",
                event.id
            ))),
            Ok(msg) => service.upsert_issuer(&msg.tenant_id, msg.issuer).await,
            Err(e) => Err(e),
        },
        EVENT_TYPE_CREDENTIAL_REGISTRATION => match event.data_as::<CredentialRegistration>() {
            Ok(msg) if msg.tenant_id.is_empty() => Err(IssuerError::InvalidRequest(format!(
                "credential registration {} without tenant id",
                event.id
            ))),
            Ok(msg) => {
                service
                    .upsert_configuration(&msg.tenant_id, &msg.configuration_id, msg.credential_configuration)
                    .await
            }
            Err(e) => Err(e),
        },
        other => {
            log::info!("ignoring event {} of unknown type {}", event.id, other);
            Ok(())
        }
    };

    match outcome {
        Err(e @ (IssuerError::InvalidRequest(_) | IssuerError::MalformedSnapshot(_))) => {
            log::warn!("dropping event {}: {}", event.id, e);
            Ok(())
        }
        other => other,
    }
}

// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

use actix_web::{post, web, HttpResponse, Responder};

use crate::dtos::events_dtos::CloudEvent;
use crate::errors::IssuerError;
use crate::importers::broadcast_importer::EventSender;

/// Structured-mode CloudEvents ingestion. The event is queued and
/// reconciled asynchronously.
/// @param res --> 202, 400, 503
#[post("/events")]
async fn ingest_event(
    event: web::Json<CloudEvent>,
    sender: web::Data<EventSender>,
) -> Result<impl Responder, IssuerError> {
    let event = event.into_inner();
    if event.id.is_empty() || event.ty.is_empty() {
        return Err(IssuerError::InvalidRequest("event without id or type".to_owned()));
    }

    log::debug!("queueing {} event {}", event.ty, event.id);
    sender.publish(event).await?;
    Ok(HttpResponse::Accepted().finish())
}

pub fn scoped_config(cfg: &mut web::ServiceConfig) {
    cfg
    .service(ingest_event);
}

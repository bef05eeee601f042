// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

use actix_web::{post, web, HttpResponse, Responder};

use crate::dtos::events_dtos::{GetIssuerMetadataReply, GetIssuerMetadataReq};
use crate::errors::IssuerError;
use crate::services::issuer_service::IssuerService;

/// Full issuer metadata, internal fields included, for trusted callers.
#[post("/internal/issuer-metadata")]
async fn get_issuer_metadata(
    req: web::Json<GetIssuerMetadataReq>,
    service: web::Data<IssuerService>,
) -> Result<impl Responder, IssuerError> {
    let GetIssuerMetadataReq { tenant_id, request_id } = req.into_inner();
    if tenant_id.is_empty() {
        return Err(IssuerError::InvalidRequest("empty tenant id".to_owned()));
    }

    let issuer = service.get_issuer(&tenant_id, true).await?;
    Ok(HttpResponse::Ok().json(GetIssuerMetadataReply { tenant_id, request_id, issuer }))
}

pub fn scoped_config(cfg: &mut web::ServiceConfig) {
    cfg
    .service(get_issuer_metadata);
}

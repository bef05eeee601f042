// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

use actix_cors::Cors;
use actix_web::{get, http, web, HttpResponse, Responder};
use serde::Serialize;

use crate::errors::IssuerError;
use crate::importers::Importer;

/// Public credential issuer metadata of a tenant.
/// @param res --> 200, 404, 500
#[get("/{tenant_id}/.well-known/openid-credential-issuer")]
async fn get_credential_issuer(
    path: web::Path<String>,
    importer: web::Data<dyn Importer>,
) -> Result<impl Responder, IssuerError> {
    let tenant_id = path.into_inner();
    log::debug!("well-known document requested for {}", tenant_id);

    let metadata = importer.get_credential_issuer_metadata(&tenant_id).await?;
    Ok(HttpResponse::Ok().json(metadata))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[get("/health")]
async fn health(importer: web::Data<dyn Importer>) -> impl Responder {
    if importer.got_errors() {
        HttpResponse::ServiceUnavailable().json(HealthResponse { status: "unhealthy" })
    } else {
        HttpResponse::Ok().json(HealthResponse { status: "ok" })
    }
}

/// Any origin may read the public document. The other routes are for
/// backend callers and get no cross-origin access.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET"])
        .allowed_header(http::header::ACCEPT)
        .max_age(3600)
}

pub fn scoped_config(cfg: &mut web::ServiceConfig) {
    cfg
    .service(health)
    .service(get_credential_issuer);
}

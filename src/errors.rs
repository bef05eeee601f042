// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

use actix_web::{http::header::ContentType, HttpResponse, ResponseError};
use actix_web::http::StatusCode;
use deadpool_postgres::PoolError;

type BoxedCause = Box<dyn std::error::Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum IssuerError {

    // Lookup Errors
    #[error("Record not found")]
    NotFound,

    // Store Errors
    #[error("{context}")]
    Store {
        context: &'static str,
        #[source]
        source: BoxedCause,
    },

    // Source Errors
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),
    #[error("Importer error: {0}")]
    Importer(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl IssuerError {
    /// Wraps a driver/mapper failure into a store error, keeping the cause.
    pub fn store<E>(context: &'static str, cause: E) -> Self
    where
        E: Into<BoxedCause>,
    {
        IssuerError::Store { context, source: cause.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, IssuerError::NotFound)
    }
}

impl From<PoolError> for IssuerError {
    fn from(err: PoolError) -> Self {
        IssuerError::store("failed to acquire database connection", err)
    }
}

impl From<tokio_pg_mapper::Error> for IssuerError {
    fn from(err: tokio_pg_mapper::Error) -> Self {
        IssuerError::store("failed to map row", err)
    }
}

impl ResponseError for IssuerError {

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            // details stay in the logs
            IssuerError::Store { .. } => "Internal server error".to_owned(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::plaintext())
            .body(body)
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            IssuerError::NotFound => StatusCode::NOT_FOUND,
            IssuerError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            IssuerError::MalformedSnapshot(_) => StatusCode::BAD_REQUEST,
            IssuerError::Importer(_) => StatusCode::SERVICE_UNAVAILABLE,
            IssuerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn store_error_keeps_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let err = IssuerError::store("failed to execute query", cause);

        assert_eq!(err.to_string(), "failed to execute query");
        assert_eq!(err.source().map(|s| s.to_string()), Some("connection reset".to_owned()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_is_distinct_from_store_failures() {
        assert!(IssuerError::NotFound.is_not_found());
        assert!(!IssuerError::store("failed to build query", "no columns").is_not_found());
        assert_eq!(IssuerError::NotFound.status_code(), StatusCode::NOT_FOUND);
    }
}

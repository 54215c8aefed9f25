use std::collections::BTreeMap;

use jsonwebtoken::errors::Error as JwtError;
use log::{debug, error};
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{status::Custom, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::model::{api::validation::FieldErrors, mongodb::is_duplicate_key_error};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] naming the missing entity.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Shorthand for a [`Error::Validation`] with a single failing field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::NotFound(_) => Status::NotFound,
            Self::Validation(_) => Status::UnprocessableEntity,
            Self::Conflict(_) => Status::Conflict,
            Self::Unauthorized(_) | Self::Jwt(_) => Status::Unauthorized,
            Self::Db(err) if is_duplicate_key_error(err) => Status::Conflict,
            Self::Db(_) => Status::InternalServerError,
        }
    }
}

/// JSON body sent back alongside every error status.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    errors: BTreeMap<String, Vec<String>>,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.class().is_server_error() {
            error!("{self}");
        } else {
            debug!("{self}");
        }

        let body = match self {
            // Never leak storage internals to the client.
            Self::Db(_) if status == Status::InternalServerError => ErrorBody {
                message: "Internal storage failure".to_string(),
                errors: BTreeMap::new(),
            },
            Self::Validation(errors) => ErrorBody {
                message: "Validation error".to_string(),
                errors: errors.into_inner(),
            },
            other => ErrorBody {
                message: other.to_string(),
                errors: BTreeMap::new(),
            },
        };
        Custom(status, Json(body)).respond_to(req)
    }
}

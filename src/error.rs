use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::db::DbError;
use crate::pickle::LoadError;
use crate::script::ScriptError;
use crate::shell::ShellError;
use crate::xml::XmlError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

/// Faults that escape a handler. They are reported in full, debug-page style.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("database error: {0}")] Database(#[from] DbError),
    #[error("script error: {0}")] Script(#[from] ScriptError),
    #[error("deserialization error: {0}")] Load(#[from] LoadError),
    #[error("command error: {0}")] Shell(#[from] ShellError),
    #[error("xml error: {0}")] Xml(#[from] XmlError),
    #[error("upstream error: {0}")] Upstream(#[from] reqwest::Error),
    #[error("io error: {0}")] Io(#[from] std::io::Error),
    #[error("multipart error: {0}")] Multipart(String),
}

impl From<actix_multipart::MultipartError> for ApiError {
    fn from(e: actix_multipart::MultipartError) -> Self {
        ApiError::Multipart(e.to_string())
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        log::error!("unhandled: {self}");
        HttpResponse::InternalServerError().json(ApiErrorBody { error: self.to_string() })
    }
}

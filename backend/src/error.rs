use crate::flow::Page;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use tracing::error;

/// Everything a flow step can answer instead of its normal result.
#[derive(Debug)]
pub enum FlowError {
    /// Bad or missing user input, shown to the user as is.
    Validation(String),
    /// The page is not reachable with the current storage.
    Redirect(Page),
    Internal(anyhow::Error),
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::Validation(msg) => write!(f, "{}", msg),
            FlowError::Redirect(page) => write!(f, "redirect to {}", page),
            FlowError::Internal(e) => write!(f, "internal error: {:#}", e),
        }
    }
}

impl From<anyhow::Error> for FlowError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<Page> for FlowError {
    fn from(page: Page) -> Self {
        Self::Redirect(page)
    }
}

impl IntoResponse for FlowError {
    fn into_response(self) -> Response {
        match self {
            FlowError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            FlowError::Redirect(page) => (
                StatusCode::SEE_OTHER,
                [(header::LOCATION, page.path())],
                Json(json!({ "redirect": page.path() })),
            )
                .into_response(),
            FlowError::Internal(err) => {
                error!("Internal Server Error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}

impl aide::OperationOutput for FlowError {
    type Inner = ();
}

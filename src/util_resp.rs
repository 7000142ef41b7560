use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use hypertext::{Rendered, prelude::*};
use serde::Serialize;

use crate::{template::Page, widgets::alert::ErrorAlert};

pub fn see_other_ok(r: Redirect) -> StandardResponse {
    Ok(SuccessResponse::SeeOther(Box::new(r)))
}

pub fn err_not_found() -> StandardResponse {
    Err(FailureResponse::NotFound(()))
}

pub fn bad_request(html: Rendered<String>) -> StandardResponse {
    Err(FailureResponse::BadRequest(html))
}

pub fn success(html: Rendered<String>) -> StandardResponse {
    Ok(SuccessResponse::Success(html))
}

pub fn unauthorized() -> StandardResponse {
    Err(FailureResponse::Unauthorized(()))
}

pub fn bad_request_msg(msg: impl ToString) -> StandardResponse {
    Err(FailureResponse::bad_request_msg(msg))
}

pub type StandardResponse = Result<SuccessResponse, FailureResponse>;

pub enum SuccessResponse {
    Success(Rendered<String>),
    SeeOther(Box<Redirect>),
}

impl IntoResponse for SuccessResponse {
    fn into_response(self) -> Response {
        match self {
            SuccessResponse::Success(html) => {
                Html(html.into_inner()).into_response()
            }
            SuccessResponse::SeeOther(redirect) => redirect.into_response(),
        }
    }
}

#[derive(Debug)]
pub enum FailureResponse {
    BadRequest(Rendered<String>),
    NotFound(()),
    Unauthorized(()),
    ServerError(()),
}

impl FailureResponse {
    /// A `400 Bad Request` page which displays `msg`.
    pub fn bad_request_msg(msg: impl ToString) -> Self {
        let msg = msg.to_string();
        FailureResponse::BadRequest(
            Page::new()
                .body(maud! {
                    ErrorAlert msg=(&msg);
                })
                .render(),
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            FailureResponse::BadRequest(_) => StatusCode::BAD_REQUEST,
            FailureResponse::NotFound(()) => StatusCode::NOT_FOUND,
            FailureResponse::Unauthorized(()) => StatusCode::FORBIDDEN,
            FailureResponse::ServerError(()) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Converts the failure into the JSON envelope used by the API routes.
    pub fn into_envelope(self) -> Response {
        let status = self.status();
        let message = match self {
            FailureResponse::BadRequest(_) => "Bad request",
            FailureResponse::NotFound(()) => "Not found",
            FailureResponse::Unauthorized(()) => "Forbidden",
            FailureResponse::ServerError(()) => "Internal Server Error",
        };
        envelope_err(status, message)
    }
}

impl IntoResponse for FailureResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            FailureResponse::BadRequest(html) => {
                (status, Html(html.into_inner())).into_response()
            }
            FailureResponse::NotFound(()) => (status, "Not found").into_response(),
            FailureResponse::Unauthorized(()) => {
                (status, "You do not have permission to do that.").into_response()
            }
            FailureResponse::ServerError(()) => {
                (status, "Internal server error").into_response()
            }
        }
    }
}

impl From<diesel::result::Error> for FailureResponse {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => FailureResponse::NotFound(()),
            e => {
                tracing::error!("database error: {e}");
                FailureResponse::ServerError(())
            }
        }
    }
}

impl From<diesel::r2d2::PoolError> for FailureResponse {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        tracing::error!("could not get a connection from the pool: {e}");
        FailureResponse::ServerError(())
    }
}

#[derive(Serialize)]
pub struct EnvelopeError {
    pub status: u16,
    pub message: String,
}

#[derive(Serialize)]
pub struct EnvelopeData<T> {
    pub status: u16,
    pub payload: T,
}

/// The uniform `{error, data}` body returned by the JSON routes. Exactly one
/// of the two fields is set.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub error: Option<EnvelopeError>,
    pub data: Option<EnvelopeData<T>>,
}

pub fn envelope_ok<T: Serialize>(payload: T) -> Response {
    Json(Envelope {
        error: None,
        data: Some(EnvelopeData {
            status: StatusCode::OK.as_u16(),
            payload,
        }),
    })
    .into_response()
}

pub fn envelope_err(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(Envelope::<()> {
            error: Some(EnvelopeError {
                status: status.as_u16(),
                message: message.into(),
            }),
            data: None,
        }),
    )
        .into_response()
}

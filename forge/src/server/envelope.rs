//! Uniform response envelope

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_models::Envelope;
use serde::Serialize;

use crate::context::OpContext;
use crate::errors::ForgeError;
use crate::utils::generate_uuid;

/// An envelope together with the HTTP status it is sent with
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub envelope: Envelope,
}

impl Reply {
    pub fn ok<T: Serialize>(ctx: &OpContext, result: Result<T, ForgeError>) -> Self {
        Self::with_status(ctx, StatusCode::OK, result)
    }

    pub fn created<T: Serialize>(ctx: &OpContext, result: Result<T, ForgeError>) -> Self {
        Self::with_status(ctx, StatusCode::CREATED, result)
    }

    fn with_status<T: Serialize>(
        ctx: &OpContext,
        status: StatusCode,
        result: Result<T, ForgeError>,
    ) -> Self {
        let result = result.and_then(|data| serde_json::to_value(data).map_err(ForgeError::from));
        match result {
            Ok(data) => Self {
                status,
                envelope: Envelope {
                    request_id: ctx.correlation_id().to_string(),
                    success: true,
                    logs: ctx.entries(),
                    data: Some(data),
                    error: None,
                    message: None,
                    allowed_methods: None,
                },
            },
            Err(err) => Self::failure(ctx, &err),
        }
    }

    pub fn failure(ctx: &OpContext, err: &ForgeError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            envelope: Envelope {
                request_id: ctx.correlation_id().to_string(),
                success: false,
                logs: ctx.entries(),
                data: None,
                error: Some(err.code().to_string()),
                message: Some(ctx.redactor().redact(&err.to_string())),
                allowed_methods: None,
            },
        }
    }

    pub fn method_not_allowed(allowed: &[&str]) -> Self {
        let mut allowed: Vec<String> = allowed.iter().map(|m| m.to_string()).collect();
        allowed.push("OPTIONS".to_string());
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            envelope: Envelope {
                request_id: generate_uuid(),
                success: false,
                logs: Vec::new(),
                data: None,
                error: Some("method_not_allowed".to_string()),
                message: Some(format!("Allowed methods: {}", allowed.join(", "))),
                allowed_methods: Some(allowed),
            },
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            envelope: Envelope {
                request_id: generate_uuid(),
                success: false,
                logs: Vec::new(),
                data: None,
                error: Some("not_found".to_string()),
                message: Some("No such endpoint".to_string()),
                allowed_methods: None,
            },
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let allow = self
            .envelope
            .allowed_methods
            .as_ref()
            .map(|methods| methods.join(", "));
        let mut response = (self.status, Json(self.envelope)).into_response();
        if let Some(allow) = allow.and_then(|a| a.parse().ok()) {
            response.headers_mut().insert(axum::http::header::ALLOW, allow);
        }
        response
    }
}

/// Turn a body extraction failure into a validation error
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ForgeError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ForgeError::Validation(rejection.body_text()))
}

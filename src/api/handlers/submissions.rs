// src/api/handlers/submissions.rs
use actix_web::http::header::CONTENT_LENGTH;
use actix_web::{web, HttpRequest, HttpResponse, Result};
use bytes::BytesMut;
use futures::StreamExt;
use crate::api::AppState;
use crate::api::handlers::ViewResponse;
use crate::models::PickedFile;
use crate::presenter::{Phase, ViewState, VALIDATION_REJECTED};
use crate::transport::http::FILENAME_HEADER;

/// Accepts the raw file body; the original name travels percent-encoded in `X-Filename`.
///
/// The body is streamed against the configured limit, so an oversized or
/// unsupported upload gets the same 422 rejection view the validator gives
/// everywhere else.
pub async fn create_submission(
    state: web::Data<AppState>,
    req: HttpRequest,
    mut payload: web::Payload,
) -> Result<HttpResponse> {
    let Some(file_name) = file_name_from(&req) else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("Missing or invalid {} header", FILENAME_HEADER)
        })));
    };

    let workbench = &state.workbench;
    let declared = declared_length(&req);
    if let Err(rejection) = workbench.validate(&file_name, declared.unwrap_or(0)) {
        log::warn!("🚫 Rejected {} before reading: {}", file_name, rejection);
        return Ok(unprocessable(workbench.reject(&rejection)));
    }

    let limit = workbench.validator().max_file_size();
    let mut body = BytesMut::with_capacity(declared.unwrap_or(0).min(limit) as usize);
    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        let seen = (body.len() + chunk.len()) as u64;
        if let Err(rejection) = workbench.validate(&file_name, seen) {
            log::warn!("🚫 Rejected {} mid-upload: {}", file_name, rejection);
            return Ok(unprocessable(workbench.reject(&rejection)));
        }
        body.extend_from_slice(&chunk);
    }

    log::info!("📥 Received {} ({} bytes)", file_name, body.len());
    let file = PickedFile::from_bytes(file_name, body.freeze());

    match workbench.submit(file).await {
        Some(view) => {
            let rejected = view.phase == Phase::Error
                && view.error.as_ref().is_some_and(|e| e.kind == VALIDATION_REJECTED);
            if rejected {
                Ok(unprocessable(view))
            } else {
                Ok(HttpResponse::Ok().json(ViewResponse::from(view)))
            }
        }
        None => Ok(HttpResponse::Conflict().json(serde_json::json!({
            "status": "superseded"
        }))),
    }
}

pub async fn cancel_submission(state: web::Data<AppState>) -> Result<HttpResponse> {
    let cancelled = state.workbench.cancel();
    Ok(HttpResponse::Ok().json(serde_json::json!({ "cancelled": cancelled })))
}

fn file_name_from(req: &HttpRequest) -> Option<String> {
    let raw = req.headers().get(FILENAME_HEADER)?.to_str().ok()?;
    let decoded = urlencoding::decode(raw).ok()?;
    let name = decoded.trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn declared_length(req: &HttpRequest) -> Option<u64> {
    req.headers().get(CONTENT_LENGTH)?.to_str().ok()?.parse().ok()
}

fn unprocessable(view: ViewState) -> HttpResponse {
    HttpResponse::UnprocessableEntity().json(ViewResponse::from(view))
}

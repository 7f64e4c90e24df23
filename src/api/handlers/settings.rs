// src/api/handlers/settings.rs
use actix_web::{web, HttpResponse, Result};
use serde::Serialize;
use crate::api::AppState;
use crate::validator::SUPPORTED_EXTENSIONS;

/// What the drop page needs to validate before uploading.
#[derive(Serialize)]
pub struct ConfigResponse {
    pub api_base: String,
    pub endpoint: String,
    pub max_file_size: u64,
    pub timeout_secs: u64,
    pub supported_extensions: Vec<&'static str>,
}

pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse> {
    let config = &state.config;
    Ok(HttpResponse::Ok().json(ConfigResponse {
        api_base: config.api_base.clone(),
        endpoint: config.endpoint_path.clone(),
        max_file_size: config.max_file_size,
        timeout_secs: config.timeout.as_secs(),
        supported_extensions: SUPPORTED_EXTENSIONS.to_vec(),
    }))
}

// src/api/handlers/view.rs
use actix_web::{web, HttpResponse, Result};
use serde::{Deserialize, Serialize};
use crate::api::AppState;
use crate::presenter::{Tab, ViewState};

/// View state plus its escaped markup, ready to drop into the result area.
#[derive(Serialize)]
pub struct ViewResponse {
    pub view: ViewState,
    pub html: String,
}

impl From<ViewState> for ViewResponse {
    fn from(view: ViewState) -> Self {
        let html = view.to_html();
        Self { view, html }
    }
}

#[derive(Deserialize)]
pub struct SelectTabRequest {
    pub tab: Tab,
}

pub async fn get_view(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ViewResponse::from(state.workbench.current_view())))
}

pub async fn select_tab(
    state: web::Data<AppState>,
    req: web::Json<SelectTabRequest>,
) -> Result<HttpResponse> {
    if state.workbench.select_tab(req.tab) {
        Ok(HttpResponse::Ok().json(ViewResponse::from(state.workbench.current_view())))
    } else {
        Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("Tab '{}' is not shown for this result", req.tab.id())
        })))
    }
}

pub async fn toggle_fragment(
    state: web::Data<AppState>,
    path: web::Path<usize>,
) -> Result<HttpResponse> {
    let index = path.into_inner();
    match state.workbench.toggle_fragment(index) {
        Some(visible) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "index": index,
            "visible": visible
        }))),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("No decompiled fragment {}", index)
        }))),
    }
}

// src/api/routes.rs
use actix_web::web;
use super::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health_check))
            .route("/config", web::get().to(handlers::get_config))
            .service(
                web::scope("/submissions")
                    .route("", web::post().to(handlers::create_submission))
                    .route("/cancel", web::post().to(handlers::cancel_submission))
            )
            .service(
                web::scope("/view")
                    .route("", web::get().to(handlers::get_view))
                    .route("/tab", web::post().to(handlers::select_tab))
                    .route("/fragments/{index}/toggle", web::post().to(handlers::toggle_fragment))
            )
    );
}

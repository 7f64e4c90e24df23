use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, middleware, Responder};
use clap::{Parser, Subcommand};
use inspector::api::{configure_routes, AppState};
use inspector::banner;
use inspector::config::AppConfig;
use inspector::models::PickedFile;
use inspector::presenter::{Phase, Presenter, ViewState, VALIDATION_REJECTED};
use inspector::surface::{DropZone, SurfaceEffect, SurfaceEvent};
use inspector::transfer::TransferPhase;
use inspector::transport::HttpTransport;
use inspector::validator::Rejection;
use inspector::workbench::Workbench;
use rust_embed::RustEmbed;
use std::borrow::Cow;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

#[derive(Parser)]
#[command(name = "inspector", version, about = "Submit Python and EXE files for malware analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one file. When several are given, only the first is sent.
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Also write the rendered result as HTML.
        #[arg(long)]
        html: Option<PathBuf>,
        /// Print the view state as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Serve the drop page and its local API.
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

const EXIT_REJECTED: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

#[actix_web::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    banner::print_banner();

    if let Err(e) = dotenvy::dotenv() {
        eprintln!("⚠️  No .env file loaded: {}", e);
    }

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Analyze { files, html, json } => analyze(config, files, html, json).await,
        Command::Serve { bind } => match serve(config, bind).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("❌ Server error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn analyze(
    config: AppConfig,
    files: Vec<PathBuf>,
    html: Option<PathBuf>,
    json: bool,
) -> ExitCode {
    let presenter = Presenter::new(config.display);

    let mut picked = Vec::new();
    for path in &files {
        match PickedFile::from_path(path).await {
            Ok(file) => picked.push(file),
            Err(e) if picked.is_empty() => {
                let rejection = Rejection::unreadable(path.display().to_string(), e.to_string());
                return report(&presenter.rejected(&rejection), html, json);
            }
            Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
        }
    }
    if picked.len() > 1 {
        log::info!("Only the first file is analyzed, {} ignored", picked.len() - 1);
    }

    let transport = HttpTransport::from_config(reqwest::Client::new(), &config);
    log::info!("🌐 Analysis endpoint: {}", transport.endpoint());

    let workbench = Arc::new(Workbench::new(&config, transport));
    let mut views = workbench.subscribe();
    let mut phases = workbench.controller().phase();
    let mut zone = DropZone::new(Arc::clone(&workbench));

    let name = match zone.handle(SurfaceEvent::Drop(picked)) {
        SurfaceEffect::Submitted(name) => name,
        SurfaceEffect::Rejected(rejection) => {
            return report(&presenter.rejected(&rejection), html, json);
        }
        _ => return ExitCode::FAILURE,
    };

    let view = loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    return ExitCode::FAILURE;
                }
                break views.borrow_and_update().clone();
            }
            Ok(()) = phases.changed() => {
                match *phases.borrow_and_update() {
                    TransferPhase::Uploading(_) => eprintln!("⏳ Uploading {}...", name),
                    TransferPhase::Analyzing(_) => eprintln!("🔬 Analyzing..."),
                    TransferPhase::Idle => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("🛑 Cancelling...");
                zone.handle(SurfaceEvent::CancelPressed);
            }
        }
    };

    report(&view, html, json)
}

fn report(view: &ViewState, html: Option<PathBuf>, json: bool) -> ExitCode {
    if json {
        match serde_json::to_string_pretty(view) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Could not serialize result: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", view);
    }

    if let Some(path) = html {
        let page = format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Analysis result</title></head><body>{}</body></html>\n",
            view.to_html()
        );
        if let Err(e) = std::fs::write(&path, page) {
            eprintln!("❌ Could not write {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
        log::info!("📄 HTML report written to {}", path.display());
    }

    match view.phase {
        Phase::Done => ExitCode::SUCCESS,
        Phase::Idle => ExitCode::from(EXIT_CANCELLED),
        Phase::Error
            if view
                .error
                .as_ref()
                .is_some_and(|e| e.kind == VALIDATION_REJECTED) =>
        {
            ExitCode::from(EXIT_REJECTED)
        }
        _ => ExitCode::FAILURE,
    }
}

async fn serve(config: AppConfig, bind: Option<String>) -> std::io::Result<()> {
    let bind = bind.unwrap_or_else(|| config.bind.clone());
    let state = AppState::new(config);

    println!("🚀 Starting server...");
    println!("📊 Drop page available at http://{}", bind);
    println!("🔗 Forwarding to {}{}", state.config.api_base, state.config.endpoint_path);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
            .route("/{_:.*}", web::get().to(static_file_handler))
    })
    .bind(bind)?
    .run()
    .await
}

async fn static_file_handler(req: HttpRequest) -> impl Responder {
    let path = if req.path() == "/" {
        "index.html"
    } else {
        &req.path()[1..]
    };

    match StaticAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            HttpResponse::Ok().content_type(mime.as_ref()).body(Cow::into_owned(content.data))
        }
        None => HttpResponse::NotFound().body("404 Not Found"),
    }
}

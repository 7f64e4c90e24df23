// src/api/state.rs
use crate::config::AppConfig;
use crate::transport::HttpTransport;
use crate::workbench::Workbench;
use reqwest::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub workbench: Arc<Workbench<HttpTransport>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let transport = HttpTransport::from_config(Client::new(), &config);
        let workbench = Workbench::new(&config, transport);
        Self {
            config: Arc::new(config),
            workbench: Arc::new(workbench),
        }
    }
}

// src/api/handlers/mod.rs
mod health;
mod settings;
mod submissions;
mod view;

pub use health::health_check;
pub use settings::get_config;
pub use submissions::{cancel_submission, create_submission};
pub use view::{get_view, select_tab, toggle_fragment, ViewResponse};

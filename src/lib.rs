// src/lib.rs
pub mod api;
pub mod banner;
pub mod config;
pub mod document;
pub mod errors;
pub mod models;
pub mod presenter;
pub mod surface;
pub mod transfer;
pub mod transport;
pub mod validator;
pub mod workbench;

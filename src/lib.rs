pub mod app;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod http;
pub mod jobs;
pub mod output;
pub mod proteomics;
pub mod user;

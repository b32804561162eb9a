pub mod app;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod error;
pub mod filters;
pub mod graphql;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod storage;
pub mod validation;

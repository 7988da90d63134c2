pub mod adapter;
pub mod app;
pub mod config;
pub mod errors;
pub mod function;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod services;
pub mod store;
pub mod types;
pub mod utils;

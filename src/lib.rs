// Prompt Transformer - library root

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod frameworks;
pub mod http_client;
pub mod middleware;
pub mod models;
pub mod resolver;
pub mod routes;
pub mod store;
pub mod templates;

pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod kafka;
pub mod outbox;
pub mod routes;
pub mod service;

pub mod analytics;
pub mod config;
pub mod crypto;
pub mod db;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod passwords;
pub mod services;
pub mod state;
pub mod web;

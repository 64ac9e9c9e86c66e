pub mod admin;
pub mod app;
pub mod auth;
pub mod billing;
pub mod chat;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod state;

#[cfg(test)]
mod test_support;

//! # jobwatch
//!
//! Client library for the dashboard REST API: a polling job monitor with a
//! pure filter/sort projection and detail selection, plus the account, email
//! and session endpoints the dashboard exposes.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod notify;
pub mod render;
pub mod telemetry;
pub mod views;

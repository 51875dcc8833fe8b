//! Crop yield prediction service.
//!
//! `GET /health`, `GET /features` and `POST /predict` in front of a single
//! pre-trained regression model, plus a client that mirrors the form frontend.

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod estimator;
pub mod gateway;
pub mod handler;
pub mod model;
pub mod schema;

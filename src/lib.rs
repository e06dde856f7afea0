//! # Tender Market Library
//!
//! Backend for a tendering marketplace: organizations publish versioned
//! tenders, employees submit versioned bids, and every operation is
//! authorized against the organization-responsibility graph.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod server;
pub mod services;
pub mod telemetry;
pub use migration;

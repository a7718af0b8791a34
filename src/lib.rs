//! Ravebill - Flutterwave-backed subscription billing service
//!
//! This library provides the core functionality for the Ravebill billing
//! service, including the subscription store, Flutterwave API integration,
//! charge reconciliation, and API handlers.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod flutterwave;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod rate_limit;
pub mod reconcile;

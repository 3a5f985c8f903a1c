//! unicms - Multi-tenant university content management
//!
//! This library provides the backend (tenants, colleges, programs, FAQs,
//! forms, rendered public content) and the admin client that drives its
//! staged workflows.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod workflow;

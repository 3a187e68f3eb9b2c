//! Survey Lifecycle & Response-Collection Workflow Engine
//!
//! This library provides the core workflow logic for authoring, funding,
//! activating and answering surveys against an external survey-engine API:
//! the multi-step builder wizard, the cost-estimation/wallet-funding gate,
//! the respondent session runner, and the live analytics merge.
//!
//! # Modules
//!
//! - `activation`: DRAFT -> ACTIVE gate with the wallet-funding sub-flow.
//! - `analytics`: live analytics push channel and aggregate merge.
//! - `auth`: client-side auth state; unauthorized responses force logout.
//! - `builder`: five-step survey authoring wizard.
//! - `circuit_breaker`: circuit breaker for the analytics channel.
//! - `config`: environment configuration.
//! - `cost`: debounced cost estimation.
//! - `draft`: the in-progress draft survey owned by the wizard.
//! - `errors`: error handling types.
//! - `models`: core data models.
//! - `obs`: tracing initialization.
//! - `participant`: reward-claim contact validation.
//! - `question`: question variants and answer validation.
//! - `services`: external survey-engine API clients.
//! - `session`: respondent-facing traversal engine.

pub mod activation;
pub mod analytics;
pub mod auth;
pub mod builder;
pub mod circuit_breaker;
pub mod config;
pub mod cost;
pub mod draft;
pub mod errors;
pub mod models;
pub mod obs;
pub mod participant;
pub mod question;
pub mod services;
pub mod session;

//! Scribeflow - capture processing and publication core
//!
//! Scribeflow is the client-side core of a capture-and-publish application.
//! It drives asynchronous backend processing of captured artifacts (audio
//! recordings and screenshots), derives per-artifact status and session
//! progress, and fans publish actions out to the chatbot vector index and
//! the blog pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     SessionController                         │
//! │  ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌──────────┐ │
//! │  │  Poller   │  │ Reconciler │  │ Publisher │  │ViewModel │ │
//! │  │ process + │  │ fan-out,   │  │ primary + │  │ commit-  │ │
//! │  │ poll loop │  │ barrier    │  │ vectorize │  │ only     │ │
//! │  └─────┬─────┘  └─────┬──────┘  └─────┬─────┘  └────▲─────┘ │
//! │        └──────────────┴───────┬───────┘             │       │
//! └───────────────────────────────┼─────────────────────┼───────┘
//!                                 │ dyn Backend          │ commits
//!                        ┌────────▼─────────┐            │
//!                        │ collaborator API │────────────┘
//!                        └──────────────────┘
//! ```
//!
//! Data flow: a user action (Describe / Publish) goes through the poller or
//! publisher, reaches the collaborator HTTP API, then the reconciler
//! re-derives the processed/published sets and the view model is updated in
//! a single commit. The classifier turns the derived sets into per-artifact
//! status badges.
//!
//! ## Modules
//!
//! - [`controller`]: facade wiring the components around one view model
//! - [`poller`]: epoch-guarded polling of asynchronous processing
//! - [`reconcile`]: bounded fan-out derivation of processed/published sets
//! - [`publish`]: two-destination publish with tolerated secondary failure
//! - [`status`]: pure status classification and progress percentages
//! - [`backend`]: the collaborator API seam (HTTP and mock)
//! - [`view`]: commit-only session view model
//! - [`model`]: session and artifact data types
//! - [`config`]: configuration management

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod poller;
pub mod publish;
pub mod reconcile;
pub mod status;
pub mod transcript;
pub mod view;

pub use config::ScribeflowConfig;
pub use error::{Error, Result};

//! HIE integration
//!
//! The pipeline depends on the [`IdentityResolver`], [`BundleSink`] and
//! [`DeadLetterSink`] traits. [`HieClient`] implements all three over HTTP,
//! authenticating with tokens from [`TokenProvider`].

pub mod auth;
pub mod client;
pub mod models;
mod traits;

pub use auth::TokenProvider;
pub use client::HieClient;
pub use models::DeliveryOutcome;
pub use traits::{BundleSink, DeadLetterSink, IdentityResolver};

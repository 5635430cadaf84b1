//! Cross-system identity mapping

pub mod service;

pub use service::IdentityMappingService;

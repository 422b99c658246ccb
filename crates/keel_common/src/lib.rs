//! Shared foundational types for the Keel HDL regression tool.
//!
//! This crate provides content fingerprinting for cache invalidation and the
//! ordered, name-indexed registry collection used throughout the scanner and
//! project model.

#![warn(missing_docs)]

pub mod hash;
pub mod registry;

pub use hash::Fingerprint;
pub use registry::{Registry, RegistryError, RegistryItem};

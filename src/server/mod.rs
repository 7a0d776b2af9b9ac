//! HTTP integration
//!
//! Wires the resolver into axum handlers through the [`SpecArg`] extractor.

pub mod extractor;

pub use extractor::SpecArg;

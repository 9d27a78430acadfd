//! # aa-connectors
//!
//! External data-source connectors for Attack Atlas. Currently a single
//! connector: the STIX bundle source, fetched over HTTPS with a bounded
//! timeout and SHA-256 content verification.

pub mod integrity;
pub mod stix;

pub use integrity::{sha256_hex, verify};
pub use stix::{BundleSource, StixClient};

//! Content-hash verification for fetched bundles.
//!
//! The digest is computed over the exact bytes received, before any
//! parsing. When an expected digest is configured a mismatch fails closed;
//! with none configured the observed digest is surfaced as a
//! trust-on-first-use advisory and the build proceeds. The asymmetry is a
//! documented operational trade-off, not an accident.

use aa_core::{AtlasError, AtlasResult};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Computes the SHA-256 of `bytes` as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Verifies `bytes` against an optional expected digest.
///
/// Returns the observed digest on success. Comparison is
/// case-insensitive on the configured value.
pub fn verify(bytes: &[u8], expected: Option<&str>) -> AtlasResult<String> {
    let actual = sha256_hex(bytes);

    match expected {
        Some(expected) => {
            let expected = expected.trim().to_lowercase();
            if expected != actual {
                return Err(AtlasError::Integrity {
                    expected,
                    actual,
                });
            }
            debug!(sha256 = %actual, "Bundle digest verified");
            Ok(actual)
        }
        None => {
            warn!(
                sha256 = %actual,
                "No expected bundle digest configured; trusting on first use. \
                 Pin this digest in the configuration to fail closed."
            );
            Ok(actual)
        }
    }
}

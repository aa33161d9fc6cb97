//! Optimal Bloom filter sizing
//!
//! Formulas:
//! - m = ceil(-n * ln(p) / ln(2)^2)  -- bits
//! - k = ceil(ln(2) * m / n)         -- hash rounds
//!
//! Both round up so a filter is never under-provisioned.

use std::f64::consts::LN_2;

use crate::error::FilterError;

/// Derived Bloom filter parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BloomFilterParams {
    /// Number of bits in the logical bit array (m)
    pub bits: u64,
    /// Number of hash rounds (k)
    pub hashes: u32,
}

/// Calculate the bit count and hash round count for a capacity and error rate
///
/// # Arguments
/// * `capacity` - Expected number of items (n), at least 1
/// * `error_rate` - Target false positive rate (p), strictly between 0 and 1
///
/// # Errors
/// `InvalidConfig` when `capacity` is zero or `error_rate` is outside (0, 1).
pub fn calculate_optimal_parameters(
    capacity: u64,
    error_rate: f64,
) -> Result<BloomFilterParams, FilterError> {
    if capacity == 0 {
        return Err(FilterError::InvalidConfig(
            "capacity must be at least 1".to_string(),
        ));
    }

    // NaN fails both comparisons and lands here too
    if !(error_rate > 0.0 && error_rate < 1.0) {
        return Err(FilterError::InvalidConfig(format!(
            "error rate {error_rate} must be strictly between 0 and 1"
        )));
    }

    let n = capacity as f64;
    let m = (-n * error_rate.ln() / (LN_2 * LN_2)).ceil();
    if m >= u64::MAX as f64 {
        return Err(FilterError::InvalidConfig(format!(
            "capacity {capacity} at error rate {error_rate} needs more than 2^64 bits"
        )));
    }
    let bits = m as u64;

    let k = (LN_2 * bits as f64 / n).ceil();
    if k > u32::MAX as f64 {
        return Err(FilterError::InvalidConfig(format!(
            "error rate {error_rate} needs more than 2^32 hash rounds"
        )));
    }
    let hashes = (k as u32).max(1);

    Ok(BloomFilterParams { bits, hashes })
}

/// Expected false positive rate after `n` insertions
///
/// Formula: FPR = (1 - e^(-kn/m))^k
pub fn calculate_fpr(bits: u64, n: u64, hashes: u32) -> f64 {
    if bits == 0 {
        return 1.0;
    }
    let exponent = -(hashes as f64) * (n as f64) / (bits as f64);
    (1.0 - exponent.exp()).powi(hashes as i32)
}

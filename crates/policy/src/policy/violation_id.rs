//! Violation identity tokens.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Number of digest bytes kept; renders as twice as many hex characters.
const ID_BYTES: usize = 6;

/// Short hex token naming one violation episode.
///
/// SHA-256 over the nanosecond timestamp followed by the policy name,
/// truncated to the first six bytes. The token is for humans to correlate
/// notifications, so collisions are tolerable.
pub fn generate_violation_id(policy_name: &str, at: DateTime<Utc>) -> String {
    let nanos = at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| at.timestamp_micros().saturating_mul(1_000));
    let digest = Sha256::digest(format!("{nanos}{policy_name}").as_bytes());
    hex::encode(&digest[..ID_BYTES])
}

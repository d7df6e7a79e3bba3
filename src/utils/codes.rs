use std::future::Future;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::error::AppResult;

const BOOKING_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const BOOKING_CODE_LEN: usize = 5;
pub const MAX_BOOKING_CODE_ATTEMPTS: usize = 10;
const BASE36_DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy)]
pub enum CodeKind<'a> {
    /// Six digits in [100000, 999999]
    Verification,
    /// Prefix followed by five characters from A-Z0-9
    Booking { prefix: &'a str },
}

pub fn generate_code(kind: CodeKind<'_>) -> String {
    match kind {
        CodeKind::Verification => verification_code(),
        CodeKind::Booking { prefix } => booking_code(prefix),
    }
}

fn verification_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

fn booking_code(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..BOOKING_CODE_LEN)
        .map(|_| BOOKING_CODE_ALPHABET[rng.gen_range(0..BOOKING_CODE_ALPHABET.len())] as char)
        .collect();

    format!("{}{}", prefix, suffix)
}

/// Timestamp-derived code used once random attempts are exhausted.
///
/// Very likely unique but not guaranteed; the unique index on insert has the
/// final say.
pub fn fallback_booking_code(prefix: &str, now: DateTime<Utc>) -> String {
    let encoded = to_base36(now.timestamp_millis().unsigned_abs());
    let start = encoded.len().saturating_sub(BOOKING_CODE_LEN);
    format!("{}{}", prefix, &encoded[start..])
}

/// Draw random booking codes until `is_taken` reports a free one.
///
/// A failed lookup counts as a used attempt.
pub async fn unique_booking_code<F, Fut>(prefix: &str, mut is_taken: F) -> String
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = AppResult<bool>>,
{
    for attempt in 1..=MAX_BOOKING_CODE_ATTEMPTS {
        let candidate = generate_code(CodeKind::Booking { prefix });

        match is_taken(candidate.clone()).await {
            Ok(false) => return candidate,
            Ok(true) => {
                tracing::debug!(attempt, "booking code collision, retrying");
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "booking code uniqueness check failed, retrying");
            }
        }
    }

    tracing::warn!(
        attempts = MAX_BOOKING_CODE_ATTEMPTS,
        "falling back to timestamp booking code"
    );
    fallback_booking_code(prefix, Utc::now())
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36_DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();

    String::from_utf8(digits).unwrap_or_default()
}

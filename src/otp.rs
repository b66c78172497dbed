//! One-time password verification engine
//!
//! Implements the RFC 4226 HOTP code generator and the RFC 6238 TOTP
//! time-window matcher that checks operator-supplied codes against the
//! shared secret, tolerating bounded clock drift.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use crate::error::{GateError, Result};

/// Default code length in decimal digits
pub const DEFAULT_DIGITS: u32 = 6;

/// Default time step in seconds
pub const DEFAULT_PERIOD: u64 = 30;

/// HMAC hash algorithm used for code generation
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
}

impl Algorithm {
    /// Name of the algorithm as it appears in otpauth URIs
    pub fn uri_name(&self) -> &'static str {
        match self {
            Algorithm::Sha1 => "SHA1",
            Algorithm::Sha256 => "SHA256",
            Algorithm::Sha512 => "SHA512",
        }
    }
}

/// Generate an HOTP code for the given secret and counter
///
/// The counter is hashed as 8 big-endian bytes; the code is the low-order
/// `digits` decimal digits of the dynamically truncated HMAC value.
pub fn hotp(secret: &[u8], counter: u64, digits: u32, algorithm: Algorithm) -> Result<String> {
    let message = counter.to_be_bytes();

    let digest = match algorithm {
        Algorithm::Sha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(secret)
                .map_err(|_| GateError::Secret("invalid HMAC key".to_string()))?;
            mac.update(&message);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(secret)
                .map_err(|_| GateError::Secret("invalid HMAC key".to_string()))?;
            mac.update(&message);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::Sha512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(secret)
                .map_err(|_| GateError::Secret("invalid HMAC key".to_string()))?;
            mac.update(&message);
            mac.finalize().into_bytes().to_vec()
        }
    };

    // Dynamic truncation (RFC 4226): the low nibble of the final digest byte
    // selects the offset of a 31-bit big-endian integer within the digest.
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);

    let code = binary % 10u32.pow(digits);
    Ok(format!("{:0width$}", code, width = digits as usize))
}

/// Time-window matcher for a single credential
///
/// Derives the current counter from wall-clock time and checks candidate
/// codes against a window of adjacent counters. Codes are not consumed;
/// a code stays valid for its whole period.
pub struct Totp {
    secret: Zeroizing<Vec<u8>>,
    digits: u32,
    period: u64,
    algorithm: Algorithm,
}

impl Totp {
    /// Create a matcher, validating the tunables
    pub fn new(secret: &[u8], digits: u32, period: u64, algorithm: Algorithm) -> Result<Self> {
        if period == 0 {
            return Err(GateError::Config("period must be non-zero".to_string()));
        }
        if !(6..=8).contains(&digits) {
            return Err(GateError::Config(format!(
                "unsupported code length: {digits}"
            )));
        }

        Ok(Self {
            secret: Zeroizing::new(secret.to_vec()),
            digits,
            period,
            algorithm,
        })
    }

    /// Code for the counter at `unix_time`, shifted by `drift` steps
    pub fn at(&self, unix_time: u64, drift: i64) -> Result<String> {
        let counter = unix_time / self.period;
        let counter = if drift < 0 {
            counter.saturating_sub(drift.unsigned_abs())
        } else {
            counter.saturating_add(drift as u64)
        };

        hotp(&self.secret, counter, self.digits, self.algorithm)
    }

    /// Code for the current wall-clock time
    pub fn generate(&self) -> Result<String> {
        self.at(unix_now(), 0)
    }

    /// Check a candidate code against the drift window around `unix_time`
    ///
    /// Counters from `backward` steps behind the current one to `forward`
    /// steps ahead are accepted; matching stops at the first hit.
    pub fn check_at(
        &self,
        candidate: &str,
        backward: u64,
        forward: u64,
        unix_time: u64,
    ) -> Result<bool> {
        for drift in -(backward as i64)..=(forward as i64) {
            let expected = self.at(unix_time, drift)?;
            if constant_time_eq(candidate.as_bytes(), expected.as_bytes()) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Check a candidate code against the drift window around the current time
    pub fn check(&self, candidate: &str, backward: u64, forward: u64) -> Result<bool> {
        self.check_at(candidate, backward, forward, unix_now())
    }
}

/// Seconds since the UNIX epoch
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the UNIX epoch")
        .as_secs()
}

/// Constant-time equality for code strings
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

//! Enrollment and reset
//!
//! Provisions the shared secret and renders the otpauth URI plus a QR-code
//! URL for the operator to scan into an authenticator app. Nothing here
//! touches the verification engine; the secret travels through the
//! credential store.

use std::env;
use std::fs;

use data_encoding::BASE32_NOPAD;
use rand::rngs::OsRng;
use rand::RngCore;

/// Entropy of a freshly provisioned secret, bytes (320 bits)
pub const SECRET_LEN: usize = 40;

/// Generate a base32-encoded secret from the system CSPRNG
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_LEN];
    OsRng.fill_bytes(&mut bytes);
    BASE32_NOPAD.encode(&bytes)
}

/// otpauth URI for an authenticator app, labeled `ssh <user>@<host>`
///
/// The label is percent-encoded as a single path component; the secret
/// rides in the query string.
pub fn enrollment_uri(secret: &str, user: &str, host: &str) -> String {
    format!(
        "otpauth://totp/{}?secret={}",
        urlencoding::encode(&format!("ssh {user}@{host}")),
        secret
    )
}

/// QR-code rendering URL embedding the enrollment URI
pub fn qr_url(uri: &str) -> String {
    format!(
        "https://www.google.com/chart?chs=200x200&chld=M|0&cht=qr&chl={}",
        urlencoding::encode(uri)
    )
}

/// Login name of the invoking operator
pub fn operator() -> String {
    env::var("USER").unwrap_or_else(|_| String::from("user"))
}

/// Host name used in the enrollment label
pub fn host() -> String {
    if let Ok(name) = env::var("HOSTNAME") {
        if !name.is_empty() {
            return name;
        }
    }
    if let Ok(name) = fs::read_to_string("/etc/hostname") {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }

    String::from("localhost")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_secret_shape() {
        let secret = generate_secret();

        // 40 bytes come out as 64 unpadded base32 characters.
        assert_eq!(secret.len(), 64);
        assert!(BASE32_NOPAD.decode(secret.as_bytes()).is_ok());
    }

    #[test]
    fn test_generated_secrets_differ() {
        assert_ne!(generate_secret(), generate_secret());
    }

    #[test]
    fn test_enrollment_uri() {
        let uri = enrollment_uri("JBSWY3DPEHPK3PXP", "alice", "bastion");

        assert_eq!(
            uri,
            "otpauth://totp/ssh%20alice%40bastion?secret=JBSWY3DPEHPK3PXP"
        );
    }

    #[test]
    fn test_qr_url_embeds_uri() {
        let uri = enrollment_uri("JBSWY3DPEHPK3PXP", "alice", "bastion");
        let url = qr_url(&uri);

        assert!(url.starts_with("https://www.google.com/chart?"));
        assert!(url.contains("cht=qr"));
        assert!(url.contains(&*urlencoding::encode(&uri)));
    }
}

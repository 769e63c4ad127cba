//! Voter identity hashing.
//!
//! Raw IPs and client fingerprints are never stored. Both are reduced to
//! blake3 hex digests keyed with a server-side pepper, so vote records can
//! be compared for deduplication but not reversed into the original
//! identifiers.

use actix_web::HttpRequest;

/// Deterministic one-way hasher for voter identifiers.
#[derive(Clone)]
pub struct IdentityHasher {
    pepper: String,
}

/// The deduplication key pair for one voter on one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterIdentity {
    pub ip_hash: String,
    pub fingerprint_hash: String,
}

impl IdentityHasher {
    pub fn new(pepper: impl Into<String>) -> Self {
        Self { pepper: pepper.into() }
    }

    /// Build from the IDENTITY_PEPPER env var. An empty pepper still works
    /// but makes hashes guessable for known inputs, so warn about it.
    pub fn from_env() -> Self {
        match std::env::var("IDENTITY_PEPPER") {
            Ok(pepper) if !pepper.is_empty() => Self::new(pepper),
            _ => {
                log::warn!("No IDENTITY_PEPPER set — identity hashes are unsalted");
                Self::new("")
            }
        }
    }

    pub fn hash(&self, identifier: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.pepper.as_bytes());
        hasher.update(b":");
        hasher.update(identifier.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    pub fn identity(&self, ip: &str, fingerprint: &str) -> VoterIdentity {
        VoterIdentity {
            ip_hash: self.hash(ip),
            fingerprint_hash: self.hash(fingerprint),
        }
    }
}

/// Extract the client IP: first hop of X-Forwarded-For when present
/// (the site runs behind a reverse proxy), otherwise the peer address.
pub fn client_ip(req: &HttpRequest) -> String {
    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let hasher = IdentityHasher::new("pepper");
        assert_eq!(hasher.hash("10.0.0.1"), hasher.hash("10.0.0.1"));
    }

    #[test]
    fn hash_differs_per_input_and_pepper() {
        let a = IdentityHasher::new("pepper");
        let b = IdentityHasher::new("other");
        assert_ne!(a.hash("10.0.0.1"), a.hash("10.0.0.2"));
        assert_ne!(a.hash("10.0.0.1"), b.hash("10.0.0.1"));
    }

    #[test]
    fn hash_is_hex_digest() {
        let hasher = IdentityHasher::new("pepper");
        let digest = hasher.hash("fp-abc");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

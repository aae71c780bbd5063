use sha2::{Digest, Sha256};

/// Hash a bearer token the way `session_tokens.session_token_hash` stores it (SHA-256 hex).
/// Tokens are issued by the auth service; this side only looks them up.
pub fn hash_access_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let out = hasher.finalize();
    hex::encode(out)
}

//! Per-subject signing secrets

use rand::RngCore;

/// Length of a freshly generated secret (one HMAC-SHA512 block)
pub const SECRET_LEN: usize = 64;

/// Opaque signing key owned by a single subject.
///
/// Never serialized into tokens or responses, and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Generate a new random secret for a subject at registration time
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSecret")
            .field("len", &self.0.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_random() {
        let a = SigningSecret::generate();
        let b = SigningSecret::generate();
        assert_eq!(a.as_bytes().len(), SECRET_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_hides_material() {
        let secret = SigningSecret::from_bytes(b"topsecret".to_vec());
        let printed = format!("{:?}", secret);
        assert!(!printed.contains("topsecret"));
        assert!(printed.contains("len"));
    }
}

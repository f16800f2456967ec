//! Cryptographic helpers: Ed25519 key handling, signing and verification.
//!
//! Addresses are the lowercase hex of the Ed25519 verifying key, so every
//! input's `address` doubles as the key its `signature` is verified against.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// SHA-256 of `data`, lowercase hex.
pub fn hash_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Random 64-char hex identifier (32 bytes from the OS RNG).
pub fn random_id() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generate a fresh random secret seed, hex-encoded.
pub fn generate_secret_hex() -> String {
    random_id()
}

/// Rebuild a signing key from a hex-encoded 32-byte secret seed.
pub fn signing_key_from_secret(secret_hex: &str) -> Result<SigningKey, &'static str> {
    let bytes = hex::decode(secret_hex).map_err(|_| "invalid secret hex")?;
    let seed: [u8; 32] = bytes.try_into().map_err(|_| "secret must be 32 bytes")?;
    Ok(SigningKey::from_bytes(&seed))
}

/// Derive the address (hex verifying key) for a secret seed.
pub fn address_from_secret(secret_hex: &str) -> Result<String, &'static str> {
    let key = signing_key_from_secret(secret_hex)?;
    Ok(hex::encode(key.verifying_key().to_bytes()))
}

/// Sign a hex digest string with the given key; returns the signature as hex.
pub fn sign_hash_hex(key: &SigningKey, hash_hex: &str) -> String {
    let sig = key.sign(hash_hex.as_bytes());
    hex::encode(sig.to_bytes())
}

/// Verify a hex signature over a hex digest string against an address.
/// Malformed addresses or signatures verify as `false`.
pub fn verify_signature_hex(address_hex: &str, signature_hex: &str, hash_hex: &str) -> bool {
    let Ok(key_bytes) = hex::decode(address_hex) else {
        return false;
    };
    let Ok(key_array) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
        return false;
    };
    let Ok(verifying) = VerifyingKey::from_bytes(&key_array) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(&sig_bytes) else {
        return false;
    };
    verifying.verify(hash_hex.as_bytes(), &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let secret = generate_secret_hex();
        let key = signing_key_from_secret(&secret).unwrap();
        let address = address_from_secret(&secret).unwrap();

        let digest = hash_hex(b"payload");
        let sig = sign_hash_hex(&key, &digest);
        assert!(verify_signature_hex(&address, &sig, &digest));
    }

    #[test]
    fn verify_rejects_wrong_message_and_garbage() {
        let secret = generate_secret_hex();
        let key = signing_key_from_secret(&secret).unwrap();
        let address = address_from_secret(&secret).unwrap();

        let sig = sign_hash_hex(&key, &hash_hex(b"one"));
        assert!(!verify_signature_hex(&address, &sig, &hash_hex(b"two")));
        assert!(!verify_signature_hex("zz", &sig, &hash_hex(b"one")));
        assert!(!verify_signature_hex(&address, "zz", &hash_hex(b"one")));
    }

    #[test]
    fn random_ids_are_unique_hex() {
        let a = random_id();
        let b = random_id();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}

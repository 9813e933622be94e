//! Cryptographic operations for transactions
//!
//! This module provides:
//! - Ed25519 key pair generation and signing
//! - Signatures that carry the signer's public key, so the signer address
//!   can be recovered from the signature alone
//! - SHA-256 hashing of signing payloads and address derivation

use crate::{Error, Result};
use account_core::{Address, ADDRESS_LEN};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Ed25519 key pair for signing
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let signing_key = SigningKey::from_bytes(&rand::random::<[u8; 32]>());
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Get public key bytes
    pub fn public_key(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Account address controlled by this key
    pub fn address(&self) -> Address {
        address_of(&self.public_key())
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            public_key: self.public_key(),
            bytes: self.signing_key.sign(message),
        }
    }
}

/// Ed25519 signature together with the signing public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    public_key: [u8; 32],
    bytes: DalekSignature,
}

impl Signature {
    /// Signing public key
    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    /// Verify against `message` and return the signer address
    pub fn recover(&self, message: &[u8]) -> Result<Address> {
        let verifying_key = VerifyingKey::from_bytes(&self.public_key)
            .map_err(|e| Error::SignatureError(format!("Invalid public key: {}", e)))?;
        verifying_key
            .verify(message, &self.bytes)
            .map_err(|e| Error::SignatureError(format!("Verification failed: {}", e)))?;
        Ok(address_of(&self.public_key))
    }
}

/// Address of a public key: the first 20 bytes of its SHA-256 digest
pub fn address_of(public_key: &[u8; 32]) -> Address {
    let digest = hash_bytes(public_key);
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
    Address::new(bytes)
}

/// Recover distinct signer addresses, failing on any invalid signature
pub fn recover_signers(message: &[u8], signatures: &[Signature]) -> Result<Vec<Address>> {
    let mut signers = Vec::with_capacity(signatures.len());
    for signature in signatures {
        let signer = signature.recover(message)?;
        if signers.contains(&signer) {
            return Err(Error::SignatureError(format!("duplicate signer {}", signer)));
        }
        signers.push(signer);
    }
    Ok(signers)
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_from_seed() {
        let seed = [42u8; 32];
        let keypair1 = KeyPair::from_seed(&seed);
        let keypair2 = KeyPair::from_seed(&seed);

        // Same seed should produce same keys
        assert_eq!(keypair1.public_key(), keypair2.public_key());
        assert_eq!(keypair1.address(), keypair2.address());
        assert_ne!(keypair1.address(), KeyPair::generate().address());
    }

    #[test]
    fn test_sign_and_recover() {
        let keypair = KeyPair::generate();
        let message = b"test message";

        let signature = keypair.sign(message);
        assert_eq!(signature.recover(message).unwrap(), keypair.address());

        // Wrong message should fail
        assert!(signature.recover(b"wrong message").is_err());
    }

    #[test]
    fn test_recover_signers() {
        let a = KeyPair::from_seed(&[1u8; 32]);
        let b = KeyPair::from_seed(&[2u8; 32]);
        let message = b"payload";

        let signers = recover_signers(message, &[a.sign(message), b.sign(message)]).unwrap();
        assert_eq!(signers, vec![a.address(), b.address()]);

        let err = recover_signers(message, &[a.sign(message), a.sign(message)]).unwrap_err();
        assert!(matches!(err, Error::SignatureError(_)));
    }

    #[test]
    fn test_signature_bincode() {
        let keypair = KeyPair::from_seed(&[7u8; 32]);
        let signature = keypair.sign(b"msg");
        let bytes = bincode::serialize(&signature).unwrap();
        let decoded: Signature = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, signature);
    }

    #[test]
    fn test_known_signature_vector() {
        // RFC 8032 test vector
        let seed = [
            0x9d, 0x61, 0xb1, 0x9d, 0xef, 0xfd, 0x5a, 0x60,
            0xba, 0x84, 0x4a, 0xf4, 0x92, 0xec, 0x2c, 0xc4,
            0x44, 0x49, 0xc5, 0x69, 0x7b, 0x32, 0x69, 0x19,
            0x70, 0x3b, 0xac, 0x03, 0x1c, 0xae, 0x7f, 0x60,
        ];

        let keypair = KeyPair::from_seed(&seed);
        assert_eq!(
            hex::encode(keypair.public_key()),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
        let signature = keypair.sign(b"");
        assert!(signature.recover(b"").is_ok());
    }
}

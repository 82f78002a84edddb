//! Password-sealed manifest envelope.
//!
//! Sealing derives a 256-bit key from the password with HKDF-SHA256 over a
//! random salt, then encrypts the serialized export tree with
//! XChaCha20-Poly1305. Wire format of the ciphertext blob:
//!
//! `nonce (24 bytes) ‖ ciphertext ‖ tag (16 bytes)`
//!
//! both it and the salt travel base64-encoded inside the manifest JSON.
//! A wrong password and a tampered envelope are indistinguishable: the
//! AEAD tag check fails either way.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chacha20poly1305::XChaCha20Poly1305;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::manifest::{Manifest, ManifestNode};

/// Size of the XChaCha20-Poly1305 nonce in bytes.
pub const NONCE_SIZE: usize = 24;

/// Size of the Poly1305 authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Size of the key-derivation salt in bytes.
pub const SALT_SIZE: usize = 16;

/// Size of the derived encryption key in bytes.
pub const KEY_SIZE: usize = 32;

/// Domain separation string for manifest key derivation.
const MANIFEST_KEY_INFO: &[u8] = b"process-package-manifest-key-v1";

/// Error while sealing or opening a manifest envelope.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum CryptoError {
    /// The manifest is sealed and no password was supplied.
    #[error("password required")]
    PasswordRequired,
    /// AEAD authentication failed: wrong password or tampered envelope.
    #[error("incorrect password")]
    IncorrectPassword,
    /// The envelope itself is structurally broken.
    #[error("malformed envelope: {0}")]
    Envelope(String),
}

/// Seals and opens manifests with a password.
pub struct ExportEncrypted {
    password: String,
}

impl ExportEncrypted {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }

    /// Seal a plain manifest. The export tree is replaced by the ciphertext
    /// envelope; the root key stays readable for previews and bookkeeping.
    pub fn encrypt(&self, manifest: &Manifest) -> Result<Manifest, CryptoError> {
        let tree = manifest
            .export
            .as_ref()
            .ok_or_else(|| CryptoError::Envelope("manifest has no export tree".to_string()))?;
        let plaintext = serde_json::to_vec(tree)
            .map_err(|e| CryptoError::Envelope(format!("serialize failed: {e}")))?;

        let mut salt = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        let key = derive_key(&self.password, &salt);

        let cipher = XChaCha20Poly1305::new(&key.into());
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|_| CryptoError::Envelope("encryption failed".to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);

        Ok(Manifest {
            root: manifest.root,
            encrypted: true,
            export: None,
            ciphertext: Some(BASE64.encode(blob)),
            salt: Some(BASE64.encode(salt)),
        })
    }

    /// Open a sealed manifest back into its plain form.
    pub fn decrypt(&self, manifest: &Manifest) -> Result<Manifest, CryptoError> {
        let blob = decode_field(manifest.ciphertext.as_deref(), "ciphertext")?;
        let salt = decode_field(manifest.salt.as_deref(), "salt")?;

        if blob.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Envelope("ciphertext too short".to_string()));
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);

        let key = derive_key(&self.password, &salt);
        let cipher = XChaCha20Poly1305::new(&key.into());
        let plaintext = cipher
            .decrypt(nonce.into(), ciphertext)
            .map_err(|_| CryptoError::IncorrectPassword)?;

        let tree: ManifestNode = serde_json::from_slice(&plaintext)
            .map_err(|e| CryptoError::Envelope(format!("decrypted payload invalid: {e}")))?;

        Ok(Manifest {
            root: manifest.root,
            encrypted: false,
            export: Some(tree),
            ciphertext: None,
            salt: None,
        })
    }
}

fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_SIZE] {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), password.as_bytes());
    let mut key = [0u8; KEY_SIZE];
    hkdf.expand(MANIFEST_KEY_INFO, &mut key)
        .expect("HKDF expand never fails for 32-byte output");
    key
}

fn decode_field(value: Option<&str>, field: &str) -> Result<Vec<u8>, CryptoError> {
    let encoded =
        value.ok_or_else(|| CryptoError::Envelope(format!("missing '{field}' field")))?;
    BASE64
        .decode(encoded)
        .map_err(|e| CryptoError::Envelope(format!("invalid base64 in '{field}': {e}")))
}

//! At-rest encryption for stored API keys.
//!
//! Keys are sealed with AES-256-GCM under a key derived from this
//! machine's hostname and username, so a copied settings.toml is
//! useless elsewhere. The encoded form is base64(nonce || ciphertext).

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

const NONCE_SIZE: usize = 12;
const KEY_LABEL: &[u8] = b"waypoint-api-key-encryption-v1";

/// Build the cipher for this machine's derived key.
fn machine_cipher() -> Result<Aes256Gcm, String> {
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string());
    let identity = format!("{}:{}", hostname, whoami::username());

    let digest = Sha256::new()
        .chain_update(KEY_LABEL)
        .chain_update(identity.as_bytes())
        .finalize();

    Aes256Gcm::new_from_slice(&digest).map_err(|e| format!("Bad key length: {}", e))
}

/// Encrypt a plaintext value for storage in settings.toml.
pub fn encrypt_string(plaintext: &str) -> Result<String, String> {
    let cipher = machine_cipher()?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|e| format!("Encryption failed: {}", e))?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(&sealed))
}

/// Decrypt a value produced by [`encrypt_string`] on this machine.
pub fn decrypt_string(encrypted: &str) -> Result<String, String> {
    let sealed = BASE64
        .decode(encrypted)
        .map_err(|e| format!("Stored key is not valid base64: {}", e))?;
    if sealed.len() < NONCE_SIZE {
        return Err("Stored key is truncated".to_string());
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);

    let plaintext = machine_cipher()?
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| format!("Decryption failed: {}", e))?;

    String::from_utf8(plaintext).map_err(|e| format!("Decrypted key is not UTF-8: {}", e))
}

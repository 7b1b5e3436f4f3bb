//! Credential vault
//!
//! Passphrase-keyed encryption of single credential fields. Each call draws
//! a fresh salt and nonce, derives an AES-256 key with PBKDF2-HMAC-SHA512 and
//! seals the field with AES-256-GCM. The result is an envelope of four
//! colon-separated lowercase hex fields:
//!
//! ```text
//! <salt>:<nonce>:<tag>:<ciphertext>
//! ```
//!
//! The vault keeps no state; the passphrase is supplied on every call.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce, Tag};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha512;

use crate::errors::DockhandError;

/// AES-256-GCM with a 16 byte nonce
type FieldCipher = AesGcm<Aes256, U16>;

pub const SALT_LEN: usize = 64;
pub const NONCE_LEN: usize = 16;
pub const TAG_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const FIELD_COUNT: usize = 4;

/// Encrypt `plaintext` under `passphrase` into an envelope.
pub fn encrypt(plaintext: &str, passphrase: &SecretString) -> Result<String, DockhandError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce);

    let cipher = cipher_for(passphrase, &salt)?;
    let mut buffer = plaintext.as_bytes().to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<U16>::from_slice(&nonce), b"", &mut buffer)
        .map_err(|_| DockhandError::Internal("field encryption failed".to_string()))?;

    Ok(format!(
        "{}:{}:{}:{}",
        hex::encode(salt),
        hex::encode(nonce),
        hex::encode(tag),
        hex::encode(buffer)
    ))
}

/// Decrypt an envelope produced by [`encrypt`].
///
/// A wrong passphrase and a tampered envelope are indistinguishable: both
/// fail with [`DockhandError::AuthenticationFailure`].
pub fn decrypt(envelope: &str, passphrase: &SecretString) -> Result<String, DockhandError> {
    let parts = Envelope::parse(envelope)?;

    let cipher = cipher_for(passphrase, &parts.salt)?;
    let mut buffer = parts.ciphertext;
    cipher
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(&parts.nonce),
            b"",
            &mut buffer,
            Tag::<U16>::from_slice(&parts.tag),
        )
        .map_err(|_| DockhandError::AuthenticationFailure)?;

    String::from_utf8(buffer).map_err(|_| DockhandError::AuthenticationFailure)
}

/// Whether `value` has the shape of an envelope (does not check the key).
pub fn is_envelope(value: &str) -> bool {
    Envelope::parse(value).is_ok()
}

struct Envelope {
    salt: Vec<u8>,
    nonce: Vec<u8>,
    tag: Vec<u8>,
    ciphertext: Vec<u8>,
}

impl Envelope {
    fn parse(envelope: &str) -> Result<Self, DockhandError> {
        let fields: Vec<&str> = envelope.split(':').collect();
        if fields.len() != FIELD_COUNT {
            return Err(DockhandError::MalformedEnvelope(format!(
                "expected {} fields, found {}",
                FIELD_COUNT,
                fields.len()
            )));
        }

        let salt = decode_field("salt", fields[0], Some(SALT_LEN))?;
        let nonce = decode_field("nonce", fields[1], Some(NONCE_LEN))?;
        let tag = decode_field("tag", fields[2], Some(TAG_LEN))?;
        let ciphertext = decode_field("ciphertext", fields[3], None)?;

        Ok(Self {
            salt,
            nonce,
            tag,
            ciphertext,
        })
    }
}

fn decode_field(name: &str, hex_value: &str, expected_len: Option<usize>) -> Result<Vec<u8>, DockhandError> {
    let bytes = hex::decode(hex_value)
        .map_err(|e| DockhandError::MalformedEnvelope(format!("{} is not valid hex: {}", name, e)))?;

    match expected_len {
        Some(len) if bytes.len() != len => Err(DockhandError::MalformedEnvelope(format!(
            "{} must be {} bytes, found {}",
            name,
            len,
            bytes.len()
        ))),
        _ => Ok(bytes),
    }
}

fn cipher_for(passphrase: &SecretString, salt: &[u8]) -> Result<FieldCipher, DockhandError> {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha512>(
        passphrase.expose_secret().as_bytes(),
        salt,
        PBKDF2_ITERATIONS,
        &mut key,
    );
    let cipher = FieldCipher::new_from_slice(&key)
        .map_err(|_| DockhandError::Internal("invalid derived key length".to_string()));
    key.fill(0);
    cipher
}

// Pack cipher: encrypts the inner JSON of every packed datagram.
//
// The appliance family uses AES-128-ECB with PKCS#7 padding and standard
// base64 for the `pack` field. Before binding every pack is sealed with a
// well-known key; afterwards with the key the appliance issued in `bindok`.
// The algorithm sits behind `PackCipher` so sessions can swap it out.

use std::fmt;

use aes::Aes128;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Key used for every pack exchanged before a session key is issued.
pub const GENERIC_KEY: &str = "a3K8Bx%2r8Y7#xDh";

const BLOCK_LEN: usize = 16;

// ── SessionKey ───────────────────────────────────────────────────────

/// A device-issued session key. Redacted in `Debug` output.
#[derive(Clone)]
pub struct SessionKey(SecretString);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for SessionKey {}

impl From<&str> for SessionKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

// ── PackCipher ───────────────────────────────────────────────────────

/// Encrypt/decrypt contract for the `pack` field.
///
/// `key = None` always means the well-known pre-bind key.
pub trait PackCipher: Send + Sync {
    /// Encrypt `plaintext` and return the text placed in `pack`.
    fn seal(&self, plaintext: &[u8], key: Option<&SessionKey>) -> Result<String, Error>;

    /// Decrypt a `pack` string back to plaintext bytes.
    fn open(&self, pack: &str, key: Option<&SessionKey>) -> Result<Vec<u8>, Error>;
}

/// AES-128-ECB + PKCS#7 + base64, as spoken by the appliances.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesEcbCipher;

impl AesEcbCipher {
    fn block_cipher(key: Option<&SessionKey>) -> Result<Aes128, Error> {
        let raw = key.map_or(GENERIC_KEY, SessionKey::expose).as_bytes();
        Aes128::new_from_slice(raw).map_err(|_| Error::InvalidKeyLength { len: raw.len() })
    }
}

impl PackCipher for AesEcbCipher {
    fn seal(&self, plaintext: &[u8], key: Option<&SessionKey>) -> Result<String, Error> {
        let cipher = Self::block_cipher(key)?;

        let mut buf = plaintext.to_vec();
        pad_pkcs7(&mut buf);
        for block in buf.chunks_exact_mut(BLOCK_LEN) {
            cipher.encrypt_block(aes::Block::from_mut_slice(block));
        }

        Ok(STANDARD.encode(buf))
    }

    fn open(&self, pack: &str, key: Option<&SessionKey>) -> Result<Vec<u8>, Error> {
        let cipher = Self::block_cipher(key)?;

        let mut buf = STANDARD.decode(pack.trim())?;
        if buf.is_empty() || buf.len() % BLOCK_LEN != 0 {
            return Err(Error::Padding("ciphertext is not a whole number of blocks"));
        }
        for block in buf.chunks_exact_mut(BLOCK_LEN) {
            cipher.decrypt_block(aes::Block::from_mut_slice(block));
        }

        unpad_pkcs7(&mut buf)?;
        Ok(buf)
    }
}

// ── Padding ──────────────────────────────────────────────────────────

fn pad_pkcs7(buf: &mut Vec<u8>) {
    let pad = BLOCK_LEN - buf.len() % BLOCK_LEN;
    // pad is in 1..=16, fits a byte
    let byte = u8::try_from(pad).unwrap_or(16);
    buf.resize(buf.len() + pad, byte);
}

fn unpad_pkcs7(buf: &mut Vec<u8>) -> Result<(), Error> {
    let Some(&last) = buf.last() else {
        return Err(Error::Padding("empty plaintext"));
    };
    let pad = usize::from(last);
    if pad == 0 || pad > BLOCK_LEN || pad > buf.len() {
        return Err(Error::Padding("invalid PKCS#7 padding length"));
    }
    if !buf[buf.len() - pad..].iter().all(|&b| b == last) {
        return Err(Error::Padding("inconsistent PKCS#7 padding bytes"));
    }
    buf.truncate(buf.len() - pad);
    Ok(())
}

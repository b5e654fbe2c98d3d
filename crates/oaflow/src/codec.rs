// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RSA credential codec for the OA open API.
//!
//! The vendor hands out its public key as a bare base64 body. Both the app
//! secret and the impersonated user id are sent as base64 PKCS#1 v1.5
//! ciphertext under that key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};

use crate::error::OaError;

pub const PUBLIC_KEY_HEADER: &str = "-----BEGIN PUBLIC KEY-----";
pub const PUBLIC_KEY_FOOTER: &str = "-----END PUBLIC KEY-----";

const PEM_LINE_WIDTH: usize = 64;

/// Wrap a bare key body into PEM. Keys that already carry the header pass
/// through untouched.
pub fn normalize_public_key(raw: &str) -> String {
    if raw.starts_with(PUBLIC_KEY_HEADER) {
        return raw.to_owned();
    }
    let body: Vec<char> = raw.trim().chars().collect();
    let mut pem = String::with_capacity(body.len() + body.len() / PEM_LINE_WIDTH + 64);
    pem.push_str(PUBLIC_KEY_HEADER);
    pem.push('\n');
    for line in body.chunks(PEM_LINE_WIDTH) {
        pem.extend(line);
        pem.push('\n');
    }
    pem.push_str(PUBLIC_KEY_FOOTER);
    pem.push('\n');
    pem
}

/// Parsed vendor public key.
#[derive(Clone)]
pub struct PublicKey {
    inner: RsaPublicKey,
}

impl PublicKey {
    /// Normalize and parse a configured key.
    pub fn parse(raw: &str) -> Result<Self, OaError> {
        let pem = normalize_public_key(raw);
        let inner = RsaPublicKey::from_public_key_pem(&pem)
            .map_err(|e| OaError::Crypto(format!("invalid public key: {e}")))?;
        Ok(Self { inner })
    }

    /// Encrypt `plaintext` and return the base64 ciphertext.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, OaError> {
        if plaintext.is_empty() {
            return Err(OaError::usage("nothing to encrypt: plaintext is empty"));
        }
        let mut rng = rand::thread_rng();
        let sealed = self
            .inner
            .encrypt(&mut rng, Pkcs1v15Encrypt, plaintext.as_bytes())
            .map_err(|e| OaError::Crypto(e.to_string()))?;
        Ok(STANDARD.encode(sealed))
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PublicKey(..)")
    }
}

/// One-shot helper: normalize `raw_key`, then encrypt.
pub fn encrypt(plaintext: &str, raw_key: &str) -> Result<String, OaError> {
    PublicKey::parse(raw_key)?.encrypt(plaintext)
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;

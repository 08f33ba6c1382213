//! AES helpers.
//!
//! - [`encrypt_aes256`] / [`decrypt_aes256`]: AES-GCM over a string, hex
//!   encoded as `nonce || ciphertext || tag`.
//! - [`ApiKeyCipher`]: AES-CTR over a `user_id:scope` pair, URL-safe base64
//!   encoded as `iv || ciphertext`.
//!
//! The key size picks the AES variant: 16, 24 or 32 bytes for AES-128,
//! AES-192 or AES-256.

use std::fmt;

use aes_gcm::{
    aead::{consts::U12, Aead, KeyInit},
    aes::Aes192,
    Aes128Gcm, Aes256Gcm, AesGcm,
};
use base64::{engine::general_purpose::URL_SAFE, Engine};
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::{rngs::OsRng, RngCore};

use crate::CryptoError;

type Aes192Gcm = AesGcm<Aes192, U12>;
type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;
type Aes192Ctr = ctr::Ctr128BE<aes::Aes192>;
type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

const GCM_NONCE_SIZE: usize = 12;
const CTR_IV_SIZE: usize = 16;

/// Encrypts `plaintext` with AES-GCM and returns lowercase hex of
/// `nonce || ciphertext || tag`.
pub fn encrypt_aes256(plaintext: &str, key: &str) -> Result<String, CryptoError> {
    let key = key.as_bytes();
    let mut nonce = [0u8; GCM_NONCE_SIZE];
    fill_random(&mut nonce)?;

    let sealed = match key.len() {
        16 => seal::<Aes128Gcm>(key, &nonce, plaintext.as_bytes()),
        24 => seal::<Aes192Gcm>(key, &nonce, plaintext.as_bytes()),
        32 => seal::<Aes256Gcm>(key, &nonce, plaintext.as_bytes()),
        other => Err(CryptoError::InvalidKeyLength(other)),
    }?;

    let mut out = Vec::with_capacity(GCM_NONCE_SIZE + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(hex::encode(out))
}

/// Reverses [`encrypt_aes256`]. Fails on bad hex, truncated input, a wrong
/// key, or tampered ciphertext.
pub fn decrypt_aes256(encrypted: &str, key: &str) -> Result<String, CryptoError> {
    let key = key.as_bytes();
    let data = hex::decode(encrypted).map_err(|err| CryptoError::Encoding(err.to_string()))?;
    if data.len() < GCM_NONCE_SIZE {
        return Err(CryptoError::TooShort);
    }
    let (nonce, sealed) = data.split_at(GCM_NONCE_SIZE);

    let plaintext = match key.len() {
        16 => open::<Aes128Gcm>(key, nonce, sealed),
        24 => open::<Aes192Gcm>(key, nonce, sealed),
        32 => open::<Aes256Gcm>(key, nonce, sealed),
        other => Err(CryptoError::InvalidKeyLength(other)),
    }?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidFormat)
}

fn seal<C: Aead + KeyInit>(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
    cipher
        .encrypt(aes_gcm::aead::Nonce::<C>::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::Encrypt)
}

fn open<C: Aead + KeyInit>(key: &[u8], nonce: &[u8], sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
    cipher
        .decrypt(aes_gcm::aead::Nonce::<C>::from_slice(nonce), sealed)
        .map_err(|_| CryptoError::Decrypt)
}

fn fill_random(buf: &mut [u8]) -> Result<(), CryptoError> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|err| CryptoError::Random(err.to_string()))
}

/// Identity carried inside an API key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserData {
    pub user_id: String,
    pub scope: String,
}

impl UserData {
    pub fn new(user_id: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            scope: scope.into(),
        }
    }
}

/// Encodes [`UserData`] into an opaque API key and back.
pub trait ApiKeyCodec {
    fn encrypt_api_key(&self, user: &UserData) -> Result<String, CryptoError>;
    fn decrypt_api_key(&self, encrypted: &str) -> Result<UserData, CryptoError>;
}

/// AES-CTR API-key codec keyed by a shared secret.
#[derive(Clone)]
pub struct ApiKeyCipher {
    secret: Vec<u8>,
}

impl fmt::Debug for ApiKeyCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyCipher")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl ApiKeyCipher {
    /// Creates a codec. The secret must be 16, 24 or 32 bytes long.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, CryptoError> {
        let secret = secret.as_ref();
        match secret.len() {
            16 | 24 | 32 => Ok(Self {
                secret: secret.to_vec(),
            }),
            other => Err(CryptoError::InvalidKeyLength(other)),
        }
    }

    fn apply_keystream(&self, iv: &[u8], buf: &mut [u8]) -> Result<(), CryptoError> {
        let key = self.secret.as_slice();
        let invalid = |_| CryptoError::InvalidKeyLength(key.len());
        match key.len() {
            16 => Aes128Ctr::new_from_slices(key, iv)
                .map_err(invalid)?
                .apply_keystream(buf),
            24 => Aes192Ctr::new_from_slices(key, iv)
                .map_err(invalid)?
                .apply_keystream(buf),
            32 => Aes256Ctr::new_from_slices(key, iv)
                .map_err(invalid)?
                .apply_keystream(buf),
            other => return Err(CryptoError::InvalidKeyLength(other)),
        }
        Ok(())
    }
}

impl ApiKeyCodec for ApiKeyCipher {
    fn encrypt_api_key(&self, user: &UserData) -> Result<String, CryptoError> {
        let mut iv = [0u8; CTR_IV_SIZE];
        fill_random(&mut iv)?;

        let mut payload = format!("{}:{}", user.user_id, user.scope).into_bytes();
        self.apply_keystream(&iv, &mut payload)?;

        let mut out = Vec::with_capacity(CTR_IV_SIZE + payload.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&payload);
        Ok(URL_SAFE.encode(out))
    }

    fn decrypt_api_key(&self, encrypted: &str) -> Result<UserData, CryptoError> {
        let data = URL_SAFE
            .decode(encrypted)
            .map_err(|err| CryptoError::Encoding(err.to_string()))?;
        if data.len() < CTR_IV_SIZE {
            return Err(CryptoError::TooShort);
        }

        let (iv, ciphertext) = data.split_at(CTR_IV_SIZE);
        let mut plaintext = ciphertext.to_vec();
        self.apply_keystream(iv, &mut plaintext)?;

        let plaintext = String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidFormat)?;
        let mut parts = plaintext.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(user_id), Some(scope), None) => Ok(UserData::new(user_id, scope)),
            _ => Err(CryptoError::InvalidFormat),
        }
    }
}

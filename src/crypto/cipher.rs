//! AES-256-GCM sealing of secret strings under a per-user derived key.

// crates.io
use aes_gcm::{
	Aes256Gcm, Key, Nonce,
	aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use zeroize::Zeroizing;
// self
use crate::{
	_prelude::*,
	auth::{SecretString, UserSalt},
	config::AggregatorConfig,
	crypto::{CryptoError, kdf},
};

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

const FORMAT_VERSION: u8 = 1;
const HEADER_SIZE: usize = 1 + NONCE_SIZE;

/// Opaque sealed secret as persisted: `version || nonce || ciphertext+tag`.
///
/// Serializes as unpadded URL-safe base64 so it fits text columns and JSON snapshots.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Ciphertext(Vec<u8>);
impl Ciphertext {
	/// Wraps raw bytes loaded from persistence. Validity is checked on decryption.
	pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
		Self(bytes.into())
	}

	/// Raw sealed bytes.
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// Encodes the sealed bytes as URL-safe base64 without padding.
	pub fn to_base64(&self) -> String {
		URL_SAFE_NO_PAD.encode(&self.0)
	}

	/// Decodes a value produced by [`Ciphertext::to_base64`].
	pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
		URL_SAFE_NO_PAD.decode(encoded).map(Self).map_err(|_| CryptoError::InvalidEncoding)
	}
}
impl From<Ciphertext> for String {
	fn from(value: Ciphertext) -> Self {
		value.to_base64()
	}
}
impl TryFrom<String> for Ciphertext {
	type Error = CryptoError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::from_base64(&value)
	}
}
impl Debug for Ciphertext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Ciphertext({} bytes)", self.0.len())
	}
}

/// Encrypts and decrypts secrets for a user, re-deriving the key on every call.
#[derive(Clone, Debug)]
pub struct SecretCipher {
	master_key: SecretString,
	iterations: u32,
}
impl SecretCipher {
	/// Creates a cipher bound to the master key and PBKDF2 iteration count.
	pub fn new(master_key: SecretString, iterations: u32) -> Self {
		Self { master_key, iterations }
	}

	/// Creates a cipher from the aggregator configuration.
	pub fn from_config(config: &AggregatorConfig) -> Self {
		Self::new(config.master_key.clone(), config.kdf_iterations)
	}

	/// Seals `plaintext` under the key derived for `salt`.
	pub fn encrypt(&self, plaintext: &str, salt: &UserSalt) -> Result<Ciphertext, CryptoError> {
		let cipher = self.cipher_for(salt);
		let nonce: [u8; NONCE_SIZE] = rand::random();
		let sealed = cipher
			.encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
			.map_err(|_| CryptoError::Encryption)?;
		let mut bytes = Vec::with_capacity(HEADER_SIZE + sealed.len());

		bytes.push(FORMAT_VERSION);
		bytes.extend_from_slice(&nonce);
		bytes.extend_from_slice(&sealed);

		Ok(Ciphertext(bytes))
	}

	/// Opens a ciphertext sealed for `salt`.
	///
	/// Fails with [`CryptoError::Decryption`] on malformed input, a different salt or master
	/// key, or any tampering caught by the authentication tag.
	pub fn decrypt(
		&self,
		ciphertext: &Ciphertext,
		salt: &UserSalt,
	) -> Result<SecretString, CryptoError> {
		let bytes = ciphertext.as_bytes();

		if bytes.len() < HEADER_SIZE + TAG_SIZE || bytes[0] != FORMAT_VERSION {
			return Err(CryptoError::Decryption);
		}

		let (nonce, sealed) = bytes[1..].split_at(NONCE_SIZE);
		let opened = Zeroizing::new(
			self.cipher_for(salt)
				.decrypt(Nonce::from_slice(nonce), sealed)
				.map_err(|_| CryptoError::Decryption)?,
		);
		let text = std::str::from_utf8(&opened).map_err(|_| CryptoError::InvalidUtf8)?;

		Ok(SecretString::new(text))
	}

	fn cipher_for(&self, salt: &UserSalt) -> Aes256Gcm {
		let key = kdf::derive_key(&self.master_key, salt, self.iterations);

		Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()))
	}
}

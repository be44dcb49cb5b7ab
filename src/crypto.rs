//! Key derivation and authenticated encryption for per-user secrets.
//!
//! Keys are derived with PBKDF2-HMAC-SHA256 from the process master key and the user's salt
//! on every call and wiped afterwards, so no derived key ever exists at rest. Secrets are
//! sealed with AES-256-GCM under a fresh random nonce.

pub mod cipher;
pub mod kdf;

pub use cipher::*;
pub use kdf::*;

// self
use crate::_prelude::*;

/// Failures raised while sealing, opening, or encoding secrets.
///
/// Messages never include plaintext or key material.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CryptoError {
	/// Ciphertext is malformed, was sealed under another key, or was tampered with.
	#[error("Stored secret could not be decrypted.")]
	Decryption,
	/// Plaintext could not be sealed.
	#[error("Secret could not be encrypted.")]
	Encryption,
	/// Decrypted bytes are not valid UTF-8.
	#[error("Decrypted secret is not valid UTF-8.")]
	InvalidUtf8,
	/// Text-encoded ciphertext is not valid base64.
	#[error("Encoded ciphertext is not valid base64.")]
	InvalidEncoding,
	/// Token signing failed.
	#[error("Token could not be signed: {message}.")]
	Signing {
		/// Signer-supplied description.
		message: String,
	},
}

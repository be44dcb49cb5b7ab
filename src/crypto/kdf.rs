//! PBKDF2 key derivation from the master key and a per-user salt.

// crates.io
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;
// self
use crate::auth::{SecretString, UserSalt};

/// Size of derived keys in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Ephemeral symmetric key; zeroized when dropped.
pub type DerivedKey = Zeroizing<[u8; KEY_SIZE]>;

/// Derives the user's symmetric key from the master secret and salt.
///
/// Deterministic for identical inputs. An empty master secret still derives a key.
pub fn derive_key(master: &SecretString, salt: &UserSalt, iterations: u32) -> DerivedKey {
	stretch(master.expose().as_bytes(), salt.as_bytes(), iterations)
}

fn stretch(secret: &[u8], salt: &[u8], iterations: u32) -> DerivedKey {
	let mut key = Zeroizing::new([0_u8; KEY_SIZE]);

	pbkdf2_hmac::<Sha256>(secret, salt, iterations, &mut key[..]);

	key
}

//! Caller identity handed in by the HTTP layer: user id plus the per-user encryption salt.

// self
use crate::{_prelude::*, auth::UserId};

/// Length of a [`UserSalt`] in bytes.
pub const USER_SALT_LEN: usize = 32;

/// Errors raised when restoring a persisted salt.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SaltError {
	/// Persisted salt does not have the expected length.
	#[error("User salt must be {expected} bytes, got {actual}.")]
	InvalidLength {
		/// Required length.
		expected: usize,
		/// Length that was supplied.
		actual: usize,
	},
}

/// Random per-user salt mixed into key derivation.
///
/// Generated once when the account is created and stored next to the user record. It must
/// never be regenerated: every secret encrypted for the user becomes unrecoverable if it is.
#[derive(Clone, PartialEq, Eq)]
pub struct UserSalt([u8; USER_SALT_LEN]);
impl UserSalt {
	/// Draws a fresh salt from the operating system RNG.
	pub fn generate() -> Self {
		Self(rand::random())
	}

	/// Restores a salt loaded from persistence.
	pub fn from_slice(bytes: &[u8]) -> Result<Self, SaltError> {
		let raw = <[u8; USER_SALT_LEN]>::try_from(bytes).map_err(|_| SaltError::InvalidLength {
			expected: USER_SALT_LEN,
			actual: bytes.len(),
		})?;

		Ok(Self(raw))
	}

	/// Raw salt bytes for persistence.
	pub fn as_bytes(&self) -> &[u8; USER_SALT_LEN] {
		&self.0
	}
}
impl From<[u8; USER_SALT_LEN]> for UserSalt {
	fn from(value: [u8; USER_SALT_LEN]) -> Self {
		Self(value)
	}
}
impl Debug for UserSalt {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("UserSalt(..)")
	}
}

/// Authenticated aggregator user as seen by the core operations.
#[derive(Clone, Debug)]
pub struct UserAccount {
	/// Account identifier.
	pub id: UserId,
	/// Salt used to derive the account's encryption key.
	pub salt: UserSalt,
}
impl UserAccount {
	/// Creates an account with a freshly generated salt.
	pub fn new(id: UserId) -> Self {
		Self { id, salt: UserSalt::generate() }
	}

	/// Rebuilds an account from persisted fields.
	pub fn with_salt(id: UserId, salt: UserSalt) -> Self {
		Self { id, salt }
	}
}

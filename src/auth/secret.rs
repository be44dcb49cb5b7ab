//! Plaintext secret wrapper that redacts itself and wipes its buffer on drop.

// crates.io
use zeroize::Zeroizing;
// self
use crate::_prelude::*;

/// Plaintext secret (JWT signing secret, admin password, bearer token).
///
/// Formatting never prints the value, and the backing buffer is zeroized when the wrapper is
/// dropped, so decrypted values live only as long as the call that needs them.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct SecretString(Zeroizing<String>);
impl SecretString {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(Zeroizing::new(value.into()))
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the secret holds no characters.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl Debug for SecretString {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SecretString").field(&"<redacted>").finish()
	}
}
impl Display for SecretString {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = SecretString::new("super-secret");

		assert_eq!(format!("{secret:?}"), "SecretString(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(secret.expose(), "super-secret");
	}

	#[test]
	fn deserializes_from_plain_string() {
		let secret: SecretString =
			serde_json::from_str("\"hunter2\"").expect("Secret should deserialize from a string.");

		assert_eq!(secret.expose(), "hunter2");
		assert!(!secret.is_empty());
	}
}

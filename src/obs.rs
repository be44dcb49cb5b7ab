//! Optional observability helpers for aggregator operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `swagger_aggregator.op` with the `op`
//!   (operation) and `stage` (call site) fields, plus warning events when a stored secret
//!   turns out to be unusable.
//! - Enable `metrics` to increment the `swagger_aggregator_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`, and the
//!   `swagger_aggregator_spec_cache_total` counter labeled by `result` (`hit`/`miss`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Aggregator operations observed by the facade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Document fetch, cached or forced.
	FetchSpec,
	/// Endpoint listing derived from a fetched document.
	ListEndpoints,
	/// Secret status, save, and delete.
	Secrets,
	/// Service token generation.
	GenerateToken,
	/// Authenticated proxy call.
	Proxy,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::FetchSpec => "fetch_spec",
			OpKind::ListEndpoints => "list_endpoints",
			OpKind::Secrets => "secrets",
			OpKind::GenerateToken => "generate_token",
			OpKind::Proxy => "proxy",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a facade operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Result of a fresh-cache lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheLookup {
	/// A fresh entry was served.
	Hit,
	/// No fresh entry existed, or the caller forced a refresh.
	Miss,
}
impl CacheLookup {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheLookup::Hit => "hit",
			CacheLookup::Miss => "miss",
		}
	}
}

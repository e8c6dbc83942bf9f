use thiserror::Error;

/// Errors raised at the store's call boundary.
///
/// Every failure is detected before any state is touched, so a failed
/// operation never leaves a half-applied write or a partial notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	/// A key path could not be parsed or a path argument had a disallowed shape.
	#[error("invalid argument: {0}")]
	InvalidArgument(String),
}

impl Error {
	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Error::InvalidArgument(message.into())
	}
}

pub type Result<T> = std::result::Result<T, Error>;

use crate::error::Result;
use crate::key::{IntoKeyPath, KeyPath};

/// Every prefix of `path` with its canonical form, root first.
pub(crate) fn chain(path: &KeyPath) -> Vec<(KeyPath, String)> {
	path.ancestry()
		.into_iter()
		.map(|prefix| {
			let key = prefix.canonical();
			(prefix, key)
		})
		.collect()
}

/// Builds the propagation chain for a change at `path`.
///
/// The result holds the canonical form of every prefix of `path`, root
/// first and `path` itself last. All but the last entry are matched against
/// descendant-scoped subscriptions, the last against exact ones.
pub fn notification_paths(path: impl IntoKeyPath) -> Result<Vec<String>> {
	let path = path.into_key_path()?;
	Ok(chain(&path).into_iter().map(|(_, key)| key).collect())
}

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::key::{IntoKeyPath, KeyPath};
use crate::store::Store;

/// Read access handed to effects and derivations.
///
/// Every path read through a tracker is recorded, and the set of paths read
/// during one run becomes the dependency set for that run.
pub struct Tracker {
	store: Store,
	base: KeyPath,
	inner: RefCell<TrackerInner>,
}

impl AsRef<Tracker> for Tracker {
	fn as_ref(&self) -> &Tracker {
		self
	}
}

struct TrackerInner {
	hot: BTreeMap<String, KeyPath>,
}

impl Tracker {
	pub(crate) fn new(store: Store, base: KeyPath) -> Self {
		Tracker {
			store,
			base,
			inner: RefCell::new(TrackerInner {
				hot: BTreeMap::new(),
			}),
		}
	}

	/// Reads `base + path` and records it as a dependency.
	pub fn get(&self, path: impl IntoKeyPath) -> Option<Value> {
		let relative = match path.into_key_path() {
			Ok(relative) => relative,
			Err(err) => {
				tracing::warn!(%err, "tracked read of a malformed key path");
				return None;
			}
		};

		let full = self.base.join(&relative);
		self.inner
			.borrow_mut()
			.hot
			.insert(full.canonical(), full.clone());

		self.store.read(&full)
	}

	pub fn base(&self) -> &KeyPath {
		&self.base
	}

	pub(crate) fn take(self) -> BTreeMap<String, KeyPath> {
		self.inner.into_inner().hot
	}
}

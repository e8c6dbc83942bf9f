use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::key::KeyPath;
use crate::registry::Subscription;
use crate::store::Store;
use crate::Dependent;

/// The paths a dependent read on its latest run, each with a live subscription.
///
/// A single change can reach the dependent through several of these paths
/// (both `a` and `a.b` on a write to `a.b`); it is told once per dispatch.
#[derive(Default)]
pub(crate) struct Dependencies {
	hot: BTreeMap<String, Subscription>,
	last_dispatch: Rc<Cell<u64>>,
}

impl Dependencies {
	pub fn new() -> Self {
		Self {
			hot: BTreeMap::new(),
			last_dispatch: Rc::new(Cell::new(0)),
		}
	}

	/// Canonical paths currently subscribed, sorted.
	pub fn paths(&self) -> Vec<String> {
		self.hot.keys().cloned().collect()
	}

	/// Unsubscribes from every path.
	pub fn release(&mut self) {
		for (_, subscription) in std::mem::take(&mut self.hot) {
			subscription.unsubscribe();
		}
	}

	/// Replaces the dependency set with the paths read on the latest run.
	///
	/// Paths kept from the previous run keep their subscription, new paths
	/// are subscribed to, and paths no longer read are unsubscribed.
	pub(crate) fn swap(
		&mut self,
		next: BTreeMap<String, KeyPath>,
		store: &Store,
		dependent: &Weak<dyn Dependent>,
	) {
		let mut prev = std::mem::take(&mut self.hot);

		for (key, path) in next {
			let subscription = match prev.remove(&key) {
				Some(existing) => existing,
				None => {
					let dependent = dependent.clone();
					let owner = store.downgrade();
					let last_dispatch = self.last_dispatch.clone();
					store.subscribe_path(
						path,
						Rc::new(move |_: &Value| {
							let Some(store) = Store::upgrade(&owner) else {
								return;
							};
							let current = store.current_dispatch();
							if current != 0 && last_dispatch.replace(current) == current {
								return;
							}
							if let Some(dependent) = dependent.upgrade() {
								dependent.dependency_changed();
							}
						}),
					)
				}
			};
			self.hot.insert(key, subscription);
		}

		// Diff the keys
		for (_, stale) in prev {
			stale.unsubscribe();
		}
	}
}

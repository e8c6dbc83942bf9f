use serde_json::Value;

use crate::effect::AutoSubscription;
use crate::error::Result;
use crate::key::{IntoKeyPath, KeyPath};
use crate::registry::Subscription;
use crate::store::Store;
use crate::tracker::Tracker;

/// A store seen from a sub-path.
///
/// Every operation prefixes its path argument and delegates to the store.
/// A view owns nothing and cannot outlive the store it borrows.
#[derive(Clone, Debug)]
pub struct View<'a> {
	store: &'a Store,
	prefix: KeyPath,
}

impl<'a> View<'a> {
	pub(crate) fn new(store: &'a Store, prefix: KeyPath) -> Self {
		View { store, prefix }
	}

	/// The absolute path this view is bound to.
	pub fn path(&self) -> &KeyPath {
		&self.prefix
	}

	pub fn store(&self) -> &'a Store {
		self.store
	}

	fn resolve(&self, path: impl IntoKeyPath) -> Result<KeyPath> {
		Ok(self.prefix.join(&path.into_key_path()?))
	}

	pub fn get(&self, path: impl IntoKeyPath) -> Option<Value> {
		match self.resolve(path) {
			Ok(path) => self.store.get(path),
			Err(err) => {
				tracing::warn!(%err, prefix = %self.prefix, "read of a malformed key path");
				None
			}
		}
	}

	pub fn set(&self, path: impl IntoKeyPath, value: impl Into<Value>) -> Result<()> {
		self.store.set(self.resolve(path)?, value)
	}

	pub fn subscribe<F>(&self, path: impl IntoKeyPath, handler: F) -> Result<Subscription>
	where
		F: Fn(&Value) + 'static,
	{
		self.store.subscribe(self.resolve(path)?, handler)
	}

	/// Subscribes at the view's own path.
	pub fn subscribe_here<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&Value) + 'static,
	{
		self.store.subscribe_path(self.prefix.clone(), std::rc::Rc::new(handler))
	}

	/// Runs `effect` with tracker reads relative to this view.
	pub fn auto_subscribe<F>(&self, effect: F) -> AutoSubscription
	where
		F: Fn(&Tracker) + 'static,
	{
		AutoSubscription::new(self.store, self.prefix.clone(), Box::new(effect))
	}

	pub fn at(&self, path: impl IntoKeyPath) -> Result<View<'a>> {
		Ok(View::new(self.store, self.resolve(path)?))
	}
}

use std::cell::Cell;
use std::fmt::{self, Display};
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;
use serde_json::Value;
use smallvec::SmallVec;

use crate::key::KeyPath;
use crate::store::StoreBody;

pub(crate) type Handler = Rc<dyn Fn(&Value)>;

/// Which changes a registration matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
	/// The changed path is the registered path.
	Exact,
	/// The changed path lies strictly below the registered path.
	Descendant,
}

/// Index key of the registry: a canonical path tagged with a scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ScopedKey {
	scope: Scope,
	path: String,
}

impl ScopedKey {
	pub fn new(scope: Scope, path: impl Into<String>) -> Self {
		ScopedKey {
			scope,
			path: path.into(),
		}
	}
}

impl Display for ScopedKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.scope {
			Scope::Exact => write!(f, "self::{}", self.path),
			Scope::Descendant => write!(f, "children::{}", self.path),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct SubscriptionId(u64);

/// One registration as stored under a scoped key.
///
/// The exact and descendant entries of a registration share `live`, which
/// turns false as soon as it is removed, so snapshots taken before the
/// removal skip it.
#[derive(Clone)]
pub(crate) struct Observer {
	id: SubscriptionId,
	handler: Handler,
	live: Rc<Cell<bool>>,
}

impl Observer {
	/// Calls the handler unless the registration was removed in the meantime.
	pub fn notify(&self, value: &Value) {
		if self.live.get() {
			(self.handler)(value);
		}
	}

	pub fn is_live(&self) -> bool {
		self.live.get()
	}
}

/// Observers per scoped key, in registration order.
///
/// A key is present only while it has at least one observer.
#[derive(Default)]
pub(crate) struct Registry {
	index: FxHashMap<ScopedKey, SmallVec<[Observer; 1]>>,
	next_id: u64,
}

impl Registry {
	/// Registers `handler` for exact and descendant changes of `path`.
	pub fn insert(&mut self, path: &str, handler: Handler) -> SubscriptionId {
		let id = SubscriptionId(self.next_id);
		self.next_id += 1;

		let observer = Observer {
			id,
			handler,
			live: Rc::new(Cell::new(true)),
		};
		for scope in [Scope::Exact, Scope::Descendant] {
			self.index
				.entry(ScopedKey::new(scope, path))
				.or_default()
				.push(observer.clone());
		}

		id
	}

	/// Returns `false` when `id` was not registered at `path`.
	pub fn remove(&mut self, path: &str, id: SubscriptionId) -> bool {
		let mut removed = false;
		for scope in [Scope::Exact, Scope::Descendant] {
			let key = ScopedKey::new(scope, path);
			let Some(observers) = self.index.get_mut(&key) else {
				continue;
			};
			if let Some(position) = observers.iter().position(|o| o.id == id) {
				observers.remove(position).live.set(false);
				removed = true;
			}
			if observers.is_empty() {
				self.index.remove(&key);
			}
		}
		removed
	}

	/// Snapshot of the observers under one scoped key.
	pub fn observers(&self, scope: Scope, path: &str) -> SmallVec<[Observer; 4]> {
		self.index
			.get(&ScopedKey::new(scope, path))
			.map(|list| list.iter().cloned().collect())
			.unwrap_or_default()
	}

	pub fn count(&self, scope: Scope, path: &str) -> usize {
		self.index
			.get(&ScopedKey::new(scope, path))
			.map_or(0, |list| list.len())
	}

	#[cfg(test)]
	pub fn keys(&self) -> impl Iterator<Item = &ScopedKey> {
		self.index.keys()
	}
}

/// Handle to one registration.
///
/// Dropping the handle leaves the registration in place; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
	store: Weak<StoreBody>,
	path: KeyPath,
	key: String,
	id: SubscriptionId,
	active: Cell<bool>,
}

impl Subscription {
	pub(crate) fn new(store: Weak<StoreBody>, path: KeyPath, key: String, id: SubscriptionId) -> Self {
		Subscription {
			store,
			path,
			key,
			id,
			active: Cell::new(true),
		}
	}

	/// Removes the registration.
	///
	/// Returns `true` only for the call that actually removed it. Repeated
	/// calls are a no-op and return `false`.
	pub fn unsubscribe(&self) -> bool {
		if !self.active.replace(false) {
			return false;
		}

		match self.store.upgrade() {
			Some(store) => store.release(&self.key, self.id),
			None => false,
		}
	}

	pub fn is_active(&self) -> bool {
		self.active.get()
	}

	pub fn path(&self) -> &KeyPath {
		&self.path
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("path", &self.key)
			.field("active", &self.active.get())
			.finish()
	}
}

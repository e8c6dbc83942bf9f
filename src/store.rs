use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;
use serde_json::Value;

use crate::computed::{ComputationBody, Derivation};
use crate::effect::AutoSubscription;
use crate::error::Result;
use crate::key::{IntoKeyPath, KeyPath};
use crate::notification;
use crate::registry::{Handler, Registry, Scope, Subscription, SubscriptionId};
use crate::tracker::Tracker;
use crate::tree;
use crate::view::View;

/// A single mutable tree of values, addressed by key paths.
///
/// `Store` is a cheap handle; clones share the same tree, subscriptions and
/// computations. Everything runs synchronously on the caller's stack: by the
/// time [`Store::set`] returns, every affected observer has been called.
#[derive(Clone)]
pub struct Store {
	body: Rc<StoreBody>,
}

pub(crate) struct StoreBody {
	root: RefCell<Value>,
	registry: RefCell<Registry>,
	derivations: FxHashMap<String, (KeyPath, Derivation)>,
	computations: RefCell<FxHashMap<String, Rc<ComputationBody>>>,
	dispatches: Cell<u64>,
	current_dispatch: Cell<u64>,
}

impl StoreBody {
	pub(crate) fn release(&self, key: &str, id: SubscriptionId) -> bool {
		self.registry.borrow_mut().remove(key, id)
	}
}

impl Default for Store {
	fn default() -> Self {
		Store::new()
	}
}

impl Store {
	/// An empty store whose root value is `null`.
	pub fn new() -> Self {
		Store::from_parts(Value::Null, FxHashMap::default())
	}

	pub fn builder() -> StoreBuilder {
		StoreBuilder::default()
	}

	fn from_parts(root: Value, derivations: FxHashMap<String, (KeyPath, Derivation)>) -> Self {
		Store {
			body: Rc::new(StoreBody {
				root: RefCell::new(root),
				registry: RefCell::new(Registry::default()),
				derivations,
				computations: RefCell::new(FxHashMap::default()),
				dispatches: Cell::new(0),
				current_dispatch: Cell::new(0),
			}),
		}
	}

	pub(crate) fn downgrade(&self) -> Weak<StoreBody> {
		Rc::downgrade(&self.body)
	}

	pub(crate) fn upgrade(body: &Weak<StoreBody>) -> Option<Store> {
		body.upgrade().map(|body| Store { body })
	}

	/// Returns the value at `path`.
	///
	/// When the tree has nothing there but a computation is defined for the
	/// path, the computation is activated (or reused) and its value returned.
	/// A malformed path reads as absent.
	pub fn get(&self, path: impl IntoKeyPath) -> Option<Value> {
		match path.into_key_path() {
			Ok(path) => self.read(&path),
			Err(err) => {
				tracing::warn!(%err, "read of a malformed key path");
				None
			}
		}
	}

	/// The whole root value.
	pub fn get_root(&self) -> Value {
		self.body.root.borrow().clone()
	}

	pub(crate) fn read(&self, path: &KeyPath) -> Option<Value> {
		let found = tree::get_at(&self.body.root.borrow(), path).cloned();
		match found {
			Some(value) => Some(value),
			None => self.heat_up(path).and_then(|computation| computation.value()),
		}
	}

	/// Writes `value` at `path` and notifies observers.
	///
	/// Setting the root replaces the whole value. Any other path is written in
	/// place, creating intermediate containers. Fails without touching the
	/// tree when the path would pad an array beyond [`tree::MAX_ARRAY_GAP`].
	pub fn set(&self, path: impl IntoKeyPath, value: impl Into<Value>) -> Result<()> {
		let path = path.into_key_path()?;
		tree::set_at(&mut self.body.root.borrow_mut(), &path, value.into())?;
		self.dispatch(&path);
		Ok(())
	}

	/// Calls `handler` whenever `path` or anything beneath it changes.
	pub fn subscribe<F>(&self, path: impl IntoKeyPath, handler: F) -> Result<Subscription>
	where
		F: Fn(&Value) + 'static,
	{
		let path = path.into_key_path()?;
		Ok(self.subscribe_path(path, Rc::new(handler)))
	}

	/// Calls `handler` on every change anywhere in the store.
	pub fn subscribe_root<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&Value) + 'static,
	{
		self.subscribe_path(KeyPath::root(), Rc::new(handler))
	}

	pub(crate) fn subscribe_path(&self, path: KeyPath, handler: Handler) -> Subscription {
		let key = path.canonical();
		let id = self.body.registry.borrow_mut().insert(&key, handler);
		tracing::trace!(path = %key, "subscribed");

		let shadowed = tree::get_at(&self.body.root.borrow(), &path).is_some();
		if !shadowed {
			self.heat_up(&path);
		}
		Subscription::new(self.downgrade(), path, key, id)
	}

	/// Runs `effect` now and again whenever a path it read changes.
	pub fn auto_subscribe<F>(&self, effect: F) -> AutoSubscription
	where
		F: Fn(&Tracker) + 'static,
	{
		AutoSubscription::new(self, KeyPath::root(), Box::new(effect))
	}

	/// Like [`Store::auto_subscribe`], with tracker reads relative to `base`.
	pub fn auto_subscribe_at<F>(&self, base: impl IntoKeyPath, effect: F) -> Result<AutoSubscription>
	where
		F: Fn(&Tracker) + 'static,
	{
		let base = base.into_key_path()?;
		Ok(AutoSubscription::new(self, base, Box::new(effect)))
	}

	/// A view of the subtree at `path`.
	pub fn at(&self, path: impl IntoKeyPath) -> Result<View<'_>> {
		Ok(View::new(self, path.into_key_path()?))
	}

	/// Number of subscriptions registered exactly at `path`.
	pub fn observer_count(&self, path: impl IntoKeyPath) -> Result<usize> {
		let path = path.into_key_path()?;
		Ok(self.observers(Scope::Exact, &path.canonical()))
	}

	/// Whether the computation at `path` currently holds a cached value.
	pub fn is_hot(&self, path: impl IntoKeyPath) -> Result<bool> {
		let path = path.into_key_path()?;
		Ok(self
			.body
			.computations
			.borrow()
			.contains_key(&path.canonical()))
	}

	/// Canonical paths the hot computation at `path` depends on.
	pub fn computation_dependencies(&self, path: impl IntoKeyPath) -> Result<Option<Vec<String>>> {
		let path = path.into_key_path()?;
		Ok(self
			.body
			.computations
			.borrow()
			.get(&path.canonical())
			.map(|computation| computation.dependencies()))
	}

	pub(crate) fn observers(&self, scope: Scope, key: &str) -> usize {
		self.body.registry.borrow().count(scope, key)
	}

	/// Notifies everyone affected by a change at `path`.
	///
	/// Descendant-scoped observers of each strict ancestor fire first, root
	/// downwards, then exact observers of `path`. Each observer receives the
	/// value at the path it registered.
	pub(crate) fn dispatch(&self, path: &KeyPath) {
		let chain = notification::chain(path);
		let Some(((changed, changed_key), ancestors)) = chain.split_last() else {
			return;
		};

		let id = self.body.dispatches.get() + 1;
		self.body.dispatches.set(id);
		let outer = self.body.current_dispatch.replace(id);
		tracing::trace!(path = %changed_key, dispatch = id, "dispatching change");

		for (ancestor, key) in ancestors {
			self.notify(Scope::Descendant, ancestor, key);
		}
		self.notify(Scope::Exact, changed, changed_key);

		self.body.current_dispatch.set(outer);
	}

	/// Id of the innermost dispatch in progress, 0 outside of any dispatch.
	pub(crate) fn current_dispatch(&self) -> u64 {
		self.body.current_dispatch.get()
	}

	fn notify(&self, scope: Scope, path: &KeyPath, key: &str) {
		let observers = self.body.registry.borrow().observers(scope, key);
		for observer in observers {
			if !observer.is_live() {
				continue;
			}
			let value = self.read(path).unwrap_or(Value::Null);
			observer.notify(&value);
		}
	}

	fn heat_up(&self, path: &KeyPath) -> Option<Rc<ComputationBody>> {
		let key = path.canonical();
		if let Some(hot) = self.body.computations.borrow().get(&key) {
			return Some(hot.clone());
		}

		let (path, derive) = self.body.derivations.get(&key)?.clone();
		let computation = ComputationBody::activate(self, path, derive);
		self.body
			.computations
			.borrow_mut()
			.insert(key, computation.clone());
		Some(computation)
	}

	pub(crate) fn forget_computation(&self, key: &str, computation: &ComputationBody) {
		let removed = {
			let mut computations = self.body.computations.borrow_mut();
			let current = computations
				.get(key)
				.map_or(false, |cached| std::ptr::eq(Rc::as_ptr(cached), computation));
			if current {
				computations.remove(key)
			} else {
				None
			}
		};
		drop(removed);
	}
}

impl std::fmt::Debug for Store {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Store")
			.field("root", &*self.body.root.borrow())
			.finish()
	}
}

/// Construction-time configuration of a [`Store`].
#[derive(Default)]
pub struct StoreBuilder {
	value: Value,
	computed: Vec<(Result<KeyPath>, Derivation)>,
}

impl StoreBuilder {
	/// The initial root value. Defaults to `null`.
	pub fn value(mut self, value: impl Into<Value>) -> Self {
		self.value = value.into();
		self
	}

	/// Defines `path` as a computed value.
	///
	/// A later definition for the same canonical path replaces an earlier one.
	pub fn computed<F>(mut self, path: impl IntoKeyPath, derive: F) -> Self
	where
		F: Fn(&Tracker) -> Value + 'static,
	{
		let derive: Derivation = Rc::new(derive);
		self.computed.push((path.into_key_path(), derive));
		self
	}

	/// Fails with [`crate::Error::InvalidArgument`] if any computed path is malformed.
	pub fn build(self) -> Result<Store> {
		let mut derivations = FxHashMap::default();
		for (path, derive) in self.computed {
			let path = path?;
			derivations.insert(path.canonical(), (path, derive));
		}
		Ok(Store::from_parts(self.value, derivations))
	}
}

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::dependencies::Dependencies;
use crate::key::KeyPath;
use crate::registry::Scope;
use crate::store::{Store, StoreBody};
use crate::{Dependent, Tracker};

/// A pure function of other paths in the store.
pub type Derivation = Rc<dyn Fn(&Tracker) -> Value>;

/// A hot computation: cached value plus live dependency subscriptions.
///
/// Lives in the store's computation cache from activation until a
/// dependency changes while nobody observes the computation's path.
pub(crate) struct ComputationBody {
	store: Weak<StoreBody>,
	path: KeyPath,
	key: String,
	derive: Derivation,
	value: RefCell<Option<Value>>,
	dependencies: RefCell<Dependencies>,
	hot: Cell<bool>,
	this: Weak<ComputationBody>,
}

impl Drop for ComputationBody {
	fn drop(&mut self) {
		self.dependencies.get_mut().release();
	}
}

impl ComputationBody {
	/// Runs the derivation for the first time. No observer is notified.
	pub fn activate(store: &Store, path: KeyPath, derive: Derivation) -> Rc<Self> {
		let key = path.canonical();
		tracing::debug!(path = %key, "activating computation");

		let body = Rc::new_cyclic(|this| ComputationBody {
			store: store.downgrade(),
			path,
			key,
			derive,
			value: RefCell::new(None),
			dependencies: RefCell::new(Dependencies::new()),
			hot: Cell::new(true),
			this: this.clone(),
		});

		body.evaluate(store);
		body
	}

	pub fn value(&self) -> Option<Value> {
		self.value.borrow().clone()
	}

	pub fn dependencies(&self) -> Vec<String> {
		self.dependencies.borrow().paths()
	}

	fn evaluate(&self, store: &Store) {
		let tracker = Tracker::new(store.clone(), KeyPath::root());
		let value = (self.derive)(&tracker);
		*self.value.borrow_mut() = Some(value);

		let this = self.this.clone() as Weak<dyn Dependent>;
		self.dependencies
			.borrow_mut()
			.swap(tracker.take(), store, &this);
	}

	fn cool_down(&self, store: &Store) {
		tracing::debug!(path = %self.key, "computation went cold");
		self.hot.set(false);
		self.dependencies.borrow_mut().release();
		self.value.borrow_mut().take();
		store.forget_computation(&self.key, self);
	}
}

impl Dependent for ComputationBody {
	fn dependency_changed(self: Rc<Self>) {
		if !self.hot.get() {
			return;
		}

		let Some(store) = Store::upgrade(&self.store) else {
			return;
		};

		if store.observers(Scope::Exact, &self.key) == 0 {
			self.cool_down(&store);
			return;
		}

		tracing::trace!(path = %self.key, "recomputing");
		self.evaluate(&store);
		store.dispatch(&self.path);
	}
}

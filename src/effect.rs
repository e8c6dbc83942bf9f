use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::dependencies::Dependencies;
use crate::key::KeyPath;
use crate::store::{Store, StoreBody};
use crate::{Dependent, Tracker};

/// A running auto-subscription.
///
/// The effect re-runs whenever a path it read on its previous run changes.
/// Dropping the handle tears the effect down.
#[must_use = "dropping an AutoSubscription tears it down immediately"]
pub struct AutoSubscription {
	body: Rc<EffectBody>,
}

pub(crate) struct EffectBody {
	store: Weak<StoreBody>,
	base: KeyPath,
	func: Box<dyn Fn(&Tracker)>,
	dependencies: RefCell<Dependencies>,
	active: Cell<bool>,
	this: Weak<EffectBody>,
}

impl Drop for EffectBody {
	fn drop(&mut self) {
		self.dependencies.get_mut().release();
	}
}

impl AutoSubscription {
	pub(crate) fn new(store: &Store, base: KeyPath, func: Box<dyn Fn(&Tracker)>) -> Self {
		let body = Rc::new_cyclic(|this| EffectBody {
			store: store.downgrade(),
			base,
			func,
			dependencies: RefCell::new(Dependencies::new()),
			active: Cell::new(true),
			this: this.clone(),
		});

		body.run();
		AutoSubscription { body }
	}

	/// Unsubscribes from every path the effect currently depends on.
	///
	/// Returns `false` if the effect was already torn down.
	pub fn teardown(&self) -> bool {
		self.body.teardown()
	}

	pub fn is_active(&self) -> bool {
		self.body.active.get()
	}

	/// Canonical paths read on the latest run.
	pub fn dependencies(&self) -> Vec<String> {
		self.body.dependencies.borrow().paths()
	}
}

impl EffectBody {
	fn run(&self) {
		if !self.active.get() {
			return;
		}

		let Some(store) = Store::upgrade(&self.store) else {
			return;
		};

		let tracker = Tracker::new(store.clone(), self.base.clone());
		(self.func)(&tracker);

		// The effect may have torn itself down while running.
		if !self.active.get() {
			return;
		}

		let this = self.this.clone() as Weak<dyn Dependent>;
		self.dependencies
			.borrow_mut()
			.swap(tracker.take(), &store, &this);
	}

	fn teardown(&self) -> bool {
		if !self.active.replace(false) {
			return false;
		}

		self.dependencies.borrow_mut().release();
		true
	}
}

impl Dependent for EffectBody {
	fn dependency_changed(self: Rc<Self>) {
		tracing::trace!(base = %self.base, "re-running effect");
		self.run();
	}
}

impl std::fmt::Debug for AutoSubscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AutoSubscription")
			.field("base", &self.body.base.canonical())
			.field("active", &self.body.active.get())
			.finish()
	}
}

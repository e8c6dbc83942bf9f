//! A path-addressable reactive value store.
//!
//! One mutable [`Value`] tree lives in a [`Store`]. Values are read and
//! written by key path, observers subscribe to any sub-path, and computed
//! paths derive their value from other paths, re-evaluating when the paths
//! they actually read change.
//!
//! ```
//! use pathstream::{Store, Value};
//! use serde_json::json;
//!
//! let store = Store::builder()
//!     .value(json!({ "x": 1, "y": 2 }))
//!     .computed("sum", |t| {
//!         let x = t.get("x").and_then(|v| v.as_i64()).unwrap_or(0);
//!         let y = t.get("y").and_then(|v| v.as_i64()).unwrap_or(0);
//!         Value::from(x + y)
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(store.get("sum"), Some(json!(3)));
//! store.set("x", 10).unwrap();
//! assert_eq!(store.get("x"), Some(json!(10)));
//! ```

pub mod macros;

mod computed;
mod dependencies;
mod effect;
mod error;
mod key;
mod notification;
mod registry;
mod store;
mod tracker;
pub mod tree;
mod view;

use std::rc::Rc;

pub use computed::Derivation;
pub use effect::AutoSubscription;
pub use error::{Error, Result};
pub use key::{IntoKeyPath, Key, KeyPath};
pub use notification::notification_paths;
pub use registry::Subscription;
pub use serde_json::Value;
pub use store::{Store, StoreBuilder};
pub use tracker::Tracker;
pub use view::View;

/// Something that re-runs when a path it read changes.
pub(crate) trait Dependent: 'static {
	/// Called synchronously from dispatch of a change to one of the
	/// dependent's subscribed paths.
	fn dependency_changed(self: Rc<Self>);
}

//! Reading and writing inside a nested [`Value`].

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::key::{Key, KeyPath};

/// Largest number of `null` slots a single write may pad an array with.
pub const MAX_ARRAY_GAP: usize = 1 << 16;

/// Returns the value at `path`, or `None` when any step is missing.
pub fn get_at<'a>(value: &'a Value, path: &KeyPath) -> Option<&'a Value> {
	path.keys().iter().try_fold(value, |current, key| step(current, key))
}

fn step<'a>(value: &'a Value, key: &Key) -> Option<&'a Value> {
	match value {
		Value::Object(map) => map.get(&*key.as_name()),
		Value::Array(items) => items.get(key.as_index()?),
		_ => None,
	}
}

/// Writes `new` at `path`, creating intermediate containers as needed.
///
/// The root path replaces `value` wholesale. Fails, leaving `value`
/// untouched, when an index lies more than [`MAX_ARRAY_GAP`] past the end of
/// the array it addresses.
pub fn set_at(value: &mut Value, path: &KeyPath, new: Value) -> Result<()> {
	check_gaps(value, path)?;

	let Some((last, init)) = path.keys().split_last() else {
		*value = new;
		return Ok(());
	};

	let mut current = value;
	for (i, key) in init.iter().enumerate() {
		let next = &path.keys()[i + 1];
		let entry = slot(current, key);
		if !is_container(entry) {
			*entry = empty_for(next);
		}
		current = entry;
	}

	*slot(current, last) = new;
	Ok(())
}

/// Walks `path` the way [`set_at`] would, without writing.
fn check_gaps(value: &Value, path: &KeyPath) -> Result<()> {
	let mut current = Some(value);
	for key in path.keys() {
		let len = match current {
			Some(Value::Object(_)) => None,
			Some(Value::Array(items)) => Some(items.len()),
			// Scalars and missing slots become a fresh container for `key`.
			_ => matches!(key, Key::Index(_)).then_some(0),
		};

		if let (Some(len), Some(index)) = (len, key.as_index()) {
			if index.saturating_sub(len) > MAX_ARRAY_GAP {
				return Err(Error::invalid(format!(
					"index {} of {} is too far past the end of an array of length {}",
					index,
					path.canonical(),
					len
				)));
			}
		}

		current = current.and_then(|value| step(value, key));
	}
	Ok(())
}

fn is_container(value: &Value) -> bool {
	matches!(value, Value::Object(_) | Value::Array(_))
}

fn empty_for(key: &Key) -> Value {
	match key {
		Key::Index(_) => Value::Array(Vec::new()),
		Key::Name(_) => Value::Object(Map::new()),
	}
}

/// Makes `container` able to hold `key` and returns the slot for it.
fn slot<'a>(container: &'a mut Value, key: &Key) -> &'a mut Value {
	if !is_container(container) {
		*container = empty_for(key);
	}

	if let (Value::Array(_), None) = (&*container, key.as_index()) {
		let Value::Array(items) = std::mem::take(container) else {
			unreachable!()
		};
		*container = Value::Object(
			items
				.into_iter()
				.enumerate()
				.map(|(i, item)| (i.to_string(), item))
				.collect(),
		);
	}

	match container {
		Value::Array(items) => {
			// Only reachable with an index key.
			let index = key.as_index().unwrap_or_default();
			if items.len() <= index {
				items.resize(index + 1, Value::Null);
			}
			&mut items[index]
		}
		Value::Object(map) => map.entry(key.as_name().into_owned()).or_insert(Value::Null),
		_ => unreachable!("container was normalized above"),
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn path(input: &str) -> KeyPath {
		KeyPath::parse(input).unwrap()
	}

	#[test]
	fn reads_nested_values() {
		let value = json!({ "a": { "b": [10, { "c": true }] } });
		assert_eq!(get_at(&value, &path("a.b[0]")), Some(&json!(10)));
		assert_eq!(get_at(&value, &path("a.b.1.c")), Some(&json!(true)));
		assert_eq!(get_at(&value, &path("a.x")), None);
		assert_eq!(get_at(&value, &path("a.b[5]")), None);
		assert_eq!(get_at(&value, &path("a.b[0].z")), None);
		assert_eq!(get_at(&value, &KeyPath::root()), Some(&value));
	}

	#[test]
	fn creates_intermediate_containers() {
		let mut value = Value::Null;
		set_at(&mut value, &path("a.b"), json!(1)).unwrap();
		assert_eq!(value, json!({ "a": { "b": 1 } }));

		set_at(&mut value, &path("a.list[2]"), json!("z")).unwrap();
		assert_eq!(value, json!({ "a": { "b": 1, "list": [null, null, "z"] } }));

		set_at(&mut value, &path("a.b.c"), json!(2)).unwrap();
		assert_eq!(value, json!({ "a": { "b": { "c": 2 }, "list": [null, null, "z"] } }));
	}

	#[test]
	fn index_keys_on_objects_use_field_names() {
		let mut value = json!({});
		set_at(&mut value, &path("[0]"), json!("zero")).unwrap();
		assert_eq!(value, json!({ "0": "zero" }));
		assert_eq!(get_at(&value, &path("[0]")), Some(&json!("zero")));
	}

	#[test]
	fn names_on_arrays_convert_them_to_objects() {
		let mut value = json!([1, 2]);
		set_at(&mut value, &path("x"), json!(3)).unwrap();
		assert_eq!(value, json!({ "0": 1, "1": 2, "x": 3 }));
	}

	#[test]
	fn root_set_replaces_everything() {
		let mut value = json!({ "a": 1 });
		set_at(&mut value, &KeyPath::root(), json!([true])).unwrap();
		assert_eq!(value, json!([true]));
	}

	#[test]
	fn far_indices_are_rejected_without_writing() {
		let mut value = json!({ "a": [1, 2] });
		let before = value.clone();

		assert!(set_at(&mut value, &path("a[18446744073709551615]"), json!(0)).is_err());
		assert!(set_at(&mut value, &path("a[10000000000]"), json!(0)).is_err());
		assert!(set_at(&mut value, &path("fresh[10000000000].b"), json!(0)).is_err());
		assert!(set_at(&mut value, &path("a.18446744073709551615"), json!(0)).is_err());
		assert_eq!(value, before);
	}

	#[test]
	fn gaps_up_to_the_limit_are_padded() {
		let mut value = json!({ "a": [1] });
		set_at(&mut value, &KeyPath::parse(&format!("a[{}]", MAX_ARRAY_GAP + 1)).unwrap(), json!(true))
			.unwrap();

		let items = value["a"].as_array().unwrap();
		assert_eq!(items.len(), MAX_ARRAY_GAP + 2);
		assert_eq!(items[MAX_ARRAY_GAP + 1], json!(true));
		assert_eq!(items[1], Value::Null);
	}

	#[test]
	fn far_names_on_objects_are_plain_fields() {
		let mut value = json!({});
		set_at(&mut value, &path("[10000000000]"), json!(1)).unwrap();
		assert_eq!(value, json!({ "10000000000": 1 }));
	}
}

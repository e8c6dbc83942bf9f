//! Key paths: the addressing scheme of the store.
//!
//! A [`KeyPath`] is an ordered sequence of [`Key`]s. Paths are written either
//! as a sequence (`["x", "y"]`) or as a string (`"x.y"`, `"x[0]"`,
//! `"['x']['y']"`), and every path has a canonical string form that the
//! store uses to index subscriptions and computations.

use std::fmt::{self, Display, Write};
use std::hash::{Hash, Hasher};
use std::iter::Peekable;
use std::str::Chars;

use smallvec::SmallVec;

use crate::error::{Error, Result};

/// One step of a [`KeyPath`].
///
/// A name made only of decimal digits (without a leading zero) addresses the
/// same location as the equivalent index, so `Key::from("0") == Key::from(0)`.
#[derive(Clone, Debug)]
pub enum Key {
	Name(String),
	Index(usize),
}

impl Key {
	/// Returns the array index this key denotes, if any.
	pub fn as_index(&self) -> Option<usize> {
		match self {
			Key::Index(index) => Some(*index),
			Key::Name(name) => decimal(name),
		}
	}

	/// Returns the key as an object field name.
	pub fn as_name(&self) -> std::borrow::Cow<'_, str> {
		match self {
			Key::Name(name) => std::borrow::Cow::Borrowed(name.as_str()),
			Key::Index(index) => std::borrow::Cow::Owned(index.to_string()),
		}
	}

	fn write_canonical(&self, out: &mut String) {
		if let Some(index) = self.as_index() {
			let _ = write!(out, "[{}]", index);
			return;
		}

		out.push_str("['");
		for c in self.as_name().chars() {
			if c == '\\' || c == '\'' {
				out.push('\\');
			}
			out.push(c);
		}
		out.push_str("']");
	}
}

fn decimal(name: &str) -> Option<usize> {
	let digits = !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit());
	if !digits || (name.len() > 1 && name.starts_with('0')) {
		return None;
	}
	name.parse().ok()
}

impl PartialEq for Key {
	fn eq(&self, other: &Self) -> bool {
		match (self.as_index(), other.as_index()) {
			(Some(a), Some(b)) => a == b,
			(None, None) => self.as_name() == other.as_name(),
			_ => false,
		}
	}
}

impl Eq for Key {}

impl Hash for Key {
	fn hash<H: Hasher>(&self, state: &mut H) {
		match self.as_index() {
			Some(index) => {
				state.write_u8(0);
				index.hash(state);
			}
			None => {
				state.write_u8(1);
				self.as_name().hash(state);
			}
		}
	}
}

impl From<&str> for Key {
	fn from(name: &str) -> Self {
		Key::Name(name.to_owned())
	}
}

impl From<String> for Key {
	fn from(name: String) -> Self {
		Key::Name(name)
	}
}

impl From<&String> for Key {
	fn from(name: &String) -> Self {
		Key::Name(name.clone())
	}
}

impl From<usize> for Key {
	fn from(index: usize) -> Self {
		Key::Index(index)
	}
}

impl Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut out = String::new();
		self.write_canonical(&mut out);
		f.write_str(&out)
	}
}

/// An ordered sequence of keys. The empty path is the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
	keys: SmallVec<[Key; 4]>,
}

impl KeyPath {
	pub const fn root() -> Self {
		KeyPath {
			keys: SmallVec::new_const(),
		}
	}

	/// Parses the string form of a path.
	///
	/// Dotted names, bracketed indices and bracketed quoted names can be mixed:
	/// `a.b[0]['c d']`. The empty string is the root.
	pub fn parse(input: &str) -> Result<Self> {
		Parser::new(input).parse()
	}

	pub fn is_root(&self) -> bool {
		self.keys.is_empty()
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	pub fn keys(&self) -> &[Key] {
		&self.keys
	}

	pub fn push(&mut self, key: impl Into<Key>) {
		self.keys.push(key.into());
	}

	/// Returns `self` followed by `child`.
	pub fn join(&self, child: &KeyPath) -> KeyPath {
		let mut keys = self.keys.clone();
		keys.extend(child.keys.iter().cloned());
		KeyPath { keys }
	}

	pub fn parent(&self) -> Option<KeyPath> {
		if self.is_root() {
			return None;
		}
		let mut keys = self.keys.clone();
		keys.pop();
		Some(KeyPath { keys })
	}

	pub fn starts_with(&self, prefix: &KeyPath) -> bool {
		self.keys.starts_with(&prefix.keys)
	}

	/// Every prefix of this path, from the root down to the path itself.
	pub fn ancestry(&self) -> Vec<KeyPath> {
		(0..=self.keys.len())
			.map(|len| KeyPath {
				keys: self.keys[..len].iter().cloned().collect(),
			})
			.collect()
	}

	/// The canonical string form: `['x'][0]`, or `""` for the root.
	pub fn canonical(&self) -> String {
		let mut out = String::new();
		for key in &self.keys {
			key.write_canonical(&mut out);
		}
		out
	}
}

impl Display for KeyPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.canonical())
	}
}

impl<K: Into<Key>> FromIterator<K> for KeyPath {
	fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
		KeyPath {
			keys: iter.into_iter().map(Into::into).collect(),
		}
	}
}

struct Parser<'a> {
	input: &'a str,
	chars: Peekable<Chars<'a>>,
	keys: SmallVec<[Key; 4]>,
}

impl<'a> Parser<'a> {
	fn new(input: &'a str) -> Self {
		Parser {
			input,
			chars: input.chars().peekable(),
			keys: SmallVec::new(),
		}
	}

	fn error(&self, reason: &str) -> Error {
		Error::invalid(format!("malformed key path {:?}: {}", self.input, reason))
	}

	fn parse(mut self) -> Result<KeyPath> {
		if self.input.is_empty() {
			return Ok(KeyPath::root());
		}

		if self.chars.peek() != Some(&'[') {
			self.bare()?;
		}

		while let Some(c) = self.chars.next() {
			match c {
				'.' => self.bare()?,
				'[' => self.bracket()?,
				other => return Err(self.error(&format!("unexpected {:?}", other))),
			}
		}

		Ok(KeyPath { keys: self.keys })
	}

	fn bare(&mut self) -> Result<()> {
		let mut name = String::new();
		while let Some(&c) = self.chars.peek() {
			match c {
				'.' | '[' => break,
				']' | '\'' | '"' => return Err(self.error(&format!("unexpected {:?}", c))),
				_ => {
					name.push(c);
					self.chars.next();
				}
			}
		}

		if name.is_empty() {
			return Err(self.error("empty key"));
		}

		self.keys.push(Key::Name(name));
		Ok(())
	}

	fn bracket(&mut self) -> Result<()> {
		match self.chars.peek().copied() {
			Some(quote @ ('\'' | '"')) => {
				self.chars.next();
				let name = self.quoted(quote)?;
				self.keys.push(Key::Name(name));
			}
			_ => {
				let mut digits = String::new();
				while let Some(&c) = self.chars.peek() {
					if c == ']' {
						break;
					}
					digits.push(c);
					self.chars.next();
				}
				let numeric = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
				let index = digits
					.parse()
					.ok()
					.filter(|_| numeric)
					.ok_or_else(|| self.error(&format!("{:?} is not an index", digits)))?;
				self.keys.push(Key::Index(index));
			}
		}

		match self.chars.next() {
			Some(']') => Ok(()),
			_ => Err(self.error("unterminated bracket")),
		}
	}

	fn quoted(&mut self, quote: char) -> Result<String> {
		let mut name = String::new();
		loop {
			match self.chars.next() {
				Some('\\') => match self.chars.next() {
					Some(c) => name.push(c),
					None => return Err(self.error("dangling escape")),
				},
				Some(c) if c == quote => return Ok(name),
				Some(c) => name.push(c),
				None => return Err(self.error("unterminated quote")),
			}
		}
	}
}

/// Anything that can name a location in the store: a string to be parsed,
/// or a sequence of keys.
pub trait IntoKeyPath {
	fn into_key_path(self) -> Result<KeyPath>;
}

impl IntoKeyPath for KeyPath {
	fn into_key_path(self) -> Result<KeyPath> {
		Ok(self)
	}
}

impl IntoKeyPath for &KeyPath {
	fn into_key_path(self) -> Result<KeyPath> {
		Ok(self.clone())
	}
}

impl IntoKeyPath for () {
	fn into_key_path(self) -> Result<KeyPath> {
		Ok(KeyPath::root())
	}
}

impl IntoKeyPath for &str {
	fn into_key_path(self) -> Result<KeyPath> {
		KeyPath::parse(self)
	}
}

impl IntoKeyPath for String {
	fn into_key_path(self) -> Result<KeyPath> {
		KeyPath::parse(&self)
	}
}

impl IntoKeyPath for &String {
	fn into_key_path(self) -> Result<KeyPath> {
		KeyPath::parse(self)
	}
}

impl IntoKeyPath for Key {
	fn into_key_path(self) -> Result<KeyPath> {
		Ok(std::iter::once(self).collect())
	}
}

impl<K: Into<Key>> IntoKeyPath for Vec<K> {
	fn into_key_path(self) -> Result<KeyPath> {
		Ok(self.into_iter().collect())
	}
}

impl<K: Into<Key>, const N: usize> IntoKeyPath for [K; N] {
	fn into_key_path(self) -> Result<KeyPath> {
		Ok(self.into_iter().collect())
	}
}

impl<K: Into<Key> + Clone> IntoKeyPath for &[K] {
	fn into_key_path(self) -> Result<KeyPath> {
		Ok(self.iter().cloned().collect())
	}
}

//! A hash map with per-entry use counts and deferred reclamation.
//!
//! Entries are acquired and released like handles; releasing never removes
//! anything by itself, so a value can be re-acquired cheaply within one
//! reconciliation pass. Unused entries are reclaimed in bulk through
//! [`RcHashMap::drain_unused`], which the backend runs as post-patch
//! housekeeping.

use core::{
	borrow::Borrow,
	hash::{BuildHasher, Hash},
};
use hashbrown::{
	hash_map::{DefaultHashBuilder, DrainFilter, Entry},
	HashMap,
};
use num_traits::{CheckedAdd, CheckedSub, One, Zero};

pub struct RcHashMap<K, C, V, S = DefaultHashBuilder>(HashMap<K, (C, V), S>)
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher;

impl<K, C, V, S> Default for RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: Default + BuildHasher,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<K, C, V, S> RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher,
{
	#[must_use]
	pub fn new() -> Self
	where
		S: Default,
	{
		Self(HashMap::with_hasher(S::default()))
	}

	/// Bumps the use count for `k`, first inserting `v(&k)` with a count of
	/// one if the key is vacant.
	pub fn acquire_or_insert_with<F: FnOnce(&K) -> V>(&mut self, k: K, v: F) -> Result<&mut V, CountSaturatedError> {
		match self.0.entry(k) {
			Entry::Occupied(occupied) => {
				let (c, v) = occupied.into_mut();
				*c = c.checked_add(&C::one()).ok_or(CountSaturatedError)?;
				Ok(v)
			}
			Entry::Vacant(vacant) => {
				let v = v(vacant.key());
				let (_, v) = vacant.insert((C::one(), v));
				Ok(v)
			}
		}
	}

	/// Drops one use of `k` without removing the entry; reclamation is
	/// deferred to [`drain_unused`](`RcHashMap::drain_unused`). Unknown keys
	/// release to `Ok(None)`.
	pub fn release<Q: ?Sized>(&mut self, k: &Q) -> Result<Option<&mut V>, CountSaturatedError>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		match self.0.get_mut(k) {
			Some((c, v)) => {
				*c = c.checked_sub(&C::one()).ok_or(CountSaturatedError)?;
				Ok(Some(v))
			}
			None => Ok(None),
		}
	}

	/// Removes and yields every entry whose use count reached zero.
	pub fn drain_unused(&mut self) -> DrainUnused<'_, K, C, V> {
		DrainUnused(self.0.drain_filter(DrainUnused::unused_filter))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	#[must_use]
	pub fn capacity(&self) -> usize {
		self.0.capacity()
	}
}

pub struct DrainUnused<'a, K, C, V>(DrainFilter<'a, K, (C, V), fn(&K, &mut (C, V)) -> bool>);

impl<'a, K, C, V> DrainUnused<'a, K, C, V>
where
	C: Zero,
{
	fn unused_filter(_: &K, (c, _): &mut (C, V)) -> bool {
		c.is_zero()
	}
}

impl<'a, K, C, V> Iterator for DrainUnused<'a, K, C, V> {
	type Item = (K, V);

	fn next(&mut self) -> Option<Self::Item> {
		self.0.next().map(|(k, (_, v))| (k, v))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.0.size_hint()
	}
}

/// A use count overflowed or underflowed its counter type.
#[derive(Debug)]
pub struct CountSaturatedError;

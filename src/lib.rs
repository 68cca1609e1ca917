//! # FixedMap
//!
//! A fixed-capacity hash map from string keys to borrowed values. The bucket array is
//! allocated once at construction and never grows; collisions are resolved by chaining.
//!
//! ## Characteristics
//!
//! - Capacity is fixed at construction: the map holds at most `capacity` entries and
//!   uses exactly `capacity` buckets, so the load factor never exceeds 1
//! - Keys are hashed with 32-bit FNV-1a and reduced modulo the capacity
//! - Each bucket is a singly linked chain with O(1) insertion at the head
//! - Values are stored as `&'a V`: the map never owns, clones or drops a value
//! - Cloning copies every bucket and chain node, but the clones share the referenced values
//!
//! ## Example
//!
//! ```rust
//! use fixedmap::FixedHashMap;
//!
//! let one = 1;
//! let two = 2;
//!
//! // Room for exactly two entries
//! let mut map = FixedHashMap::new(2);
//! assert!(map.set("one", &one));
//! assert!(map.set("two", &two));
//!
//! // Full: new keys are rejected, existing keys can still be updated
//! assert!(!map.set("three", &two));
//! assert!(map.set("one", &two));
//!
//! assert_eq!(map.get("one"), Some(&2));
//! assert_eq!(map.load(), 1.0);
//! ```

use std::fmt;
use std::iter::{self, FusedIterator};

use log::{debug, trace};

#[cfg(test)]
mod proptests;

/// Errors reported by the fallible `FixedHashMap` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FixedMapError {
    /// A new key was offered to a map that already holds `capacity` entries.
    /// Updating an existing key never produces this error.
    #[error("map is at full capacity ({capacity} entries)")]
    MapFull { capacity: usize },
    /// A map must have at least one bucket.
    #[error("map capacity must be at least 1")]
    ZeroCapacity,
}

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Computes the 32-bit FNV-1a hash of the UTF-8 bytes of `key`.
///
/// The bucket for a key is `fnv1a(key) % capacity`.
///
/// # Examples
///
/// ```
/// use fixedmap::fnv1a;
///
/// assert_eq!(fnv1a(""), 2_166_136_261);
/// assert_eq!(fnv1a("a"), 0xe40c_292c);
/// ```
pub fn fnv1a(key: &str) -> u32 {
    key.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

type Link<'a, V> = Option<Box<Node<'a, V>>>;

struct Node<'a, V> {
    key: Box<str>,
    value: &'a V,
    next: Link<'a, V>,
}

/// The entries of one bucket, most recently inserted first.
struct Chain<'a, V> {
    head: Link<'a, V>,
}

impl<'a, V> Chain<'a, V> {
    const fn new() -> Self {
        Self { head: None }
    }

    fn nodes(&self) -> impl Iterator<Item = &Node<'a, V>> {
        iter::successors(self.head.as_deref(), |node| node.next.as_deref())
    }

    fn find(&self, key: &str) -> Option<&Node<'a, V>> {
        self.nodes().find(|node| &*node.key == key)
    }

    fn find_mut(&mut self, key: &str) -> Option<&mut Node<'a, V>> {
        let mut link = self.head.as_deref_mut();
        while let Some(node) = link {
            if &*node.key == key {
                return Some(node);
            }
            link = node.next.as_deref_mut();
        }
        None
    }

    fn push_front(&mut self, key: &str, value: &'a V) {
        let next = self.head.take();
        self.head = Some(Box::new(Node {
            key: key.into(),
            value,
            next,
        }));
    }

    /// Detaches the node holding `key` by re-pointing its predecessor's link at its
    /// successor. Works the same for the head, an inner node and the last node.
    fn unlink(&mut self, key: &str) -> Option<&'a V> {
        let mut cursor = &mut self.head;
        while cursor.as_ref().is_some_and(|node| &*node.key != key) {
            cursor = &mut cursor.as_mut()?.next;
        }
        let mut removed = cursor.take()?;
        *cursor = removed.next.take();
        Some(removed.value)
    }

    fn clear(&mut self) {
        // Iterative, so a long chain cannot overflow the stack through recursive drops.
        let mut link = self.head.take();
        while let Some(mut node) = link {
            link = node.next.take();
        }
    }
}

impl<V> Drop for Chain<'_, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<V> Clone for Chain<'_, V> {
    /// Copies every node in chain order. The copies point at the same values.
    fn clone(&self) -> Self {
        let mut copy = Self::new();
        let mut tail = &mut copy.head;
        for node in self.nodes() {
            let appended = tail.insert(Box::new(Node {
                key: node.key.clone(),
                value: node.value,
                next: None,
            }));
            tail = &mut appended.next;
        }
        copy
    }

    fn clone_from(&mut self, source: &Self) {
        self.clear();
        *self = source.clone();
    }
}

/// A hash map with a fixed number of buckets and a matching entry limit.
///
/// `FixedHashMap` maps string keys to `&'a V` references. It is meant for workloads
/// where the maximum number of entries is known up front and a resize would be
/// unwelcome:
/// - Buckets are allocated once in [`FixedHashMap::new`] and never reallocated
/// - Inserting a new key into a full map fails instead of growing the table
/// - Updating, looking up and removing keys never allocate in the map itself; an
///   installed logger may still allocate to format the map's `log` records
///
/// The map is single-threaded; callers sharing one across threads must serialize access.
///
/// Type Parameters:
/// - `'a`: Lifetime of the referenced values, which must outlive the map
/// - `V`: Value type; no trait bounds are required
pub struct FixedHashMap<'a, V> {
    buckets: Box<[Chain<'a, V>]>,
    // Live entries; never exceeds `buckets.len()`
    count: usize,
}

impl<'a, V> FixedHashMap<'a, V> {
    /// Creates an empty map with `capacity` pre-initialized buckets.
    ///
    /// Time Complexity: O(capacity)
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`FixedHashMap::try_new`] to handle that case
    /// without panicking.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixedmap::FixedHashMap;
    ///
    /// let map = FixedHashMap::<u32>::new(16);
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), 16);
    /// assert_eq!(map.load(), 0.0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        match Self::try_new(capacity) {
            Ok(map) => map,
            Err(err) => panic!("FixedHashMap::new: {err}"),
        }
    }

    /// Creates an empty map with `capacity` pre-initialized buckets.
    ///
    /// # Returns
    /// - `Ok(map)` for any non-zero capacity
    /// - `Err(FixedMapError::ZeroCapacity)` if `capacity` is zero
    ///
    /// # Examples
    ///
    /// ```
    /// use fixedmap::{FixedHashMap, FixedMapError};
    ///
    /// assert!(FixedHashMap::<u32>::try_new(4).is_ok());
    /// assert_eq!(
    ///     FixedHashMap::<u32>::try_new(0).err(),
    ///     Some(FixedMapError::ZeroCapacity)
    /// );
    /// ```
    pub fn try_new(capacity: usize) -> Result<Self, FixedMapError> {
        if capacity == 0 {
            debug!("rejecting fixed map with zero capacity");
            return Err(FixedMapError::ZeroCapacity);
        }
        Ok(Self {
            buckets: (0..capacity).map(|_| Chain::new()).collect(),
            count: 0,
        })
    }

    /// Associates `value` with `key`, inserting a new entry or updating an existing one.
    ///
    /// A map at full capacity still accepts updates to keys it already holds.
    ///
    /// Time Complexity: O(1) expected, O(chain length) worst case
    ///
    /// # Returns
    /// - `true` if the key was inserted or its value updated
    /// - `false` if `key` is new and the map is full; nothing is changed in that case
    ///
    /// # Examples
    ///
    /// ```
    /// use fixedmap::FixedHashMap;
    ///
    /// let (a, b) = ("apple", "banana");
    /// let mut map = FixedHashMap::new(1);
    ///
    /// assert!(map.set("fruit", &a));
    /// assert!(map.set("fruit", &b)); // update, even though the map is full
    /// assert!(!map.set("other", &a)); // new key, map is full
    /// assert_eq!(map.get("fruit"), Some(&"banana"));
    /// ```
    pub fn set(&mut self, key: &str, value: &'a V) -> bool {
        self.try_set(key, value).is_ok()
    }

    /// Like [`FixedHashMap::set`], but reports a rejected insert as an error.
    ///
    /// # Returns
    /// - `Ok(())` if the key was inserted or its value updated
    /// - `Err(FixedMapError::MapFull)` if `key` is new and the map is full
    pub fn try_set(&mut self, key: &str, value: &'a V) -> Result<(), FixedMapError> {
        let capacity = self.buckets.len();
        let chain = &mut self.buckets[bucket_index(key, capacity)];

        if let Some(node) = chain.find_mut(key) {
            node.value = value;
            return Ok(());
        }

        if self.count == capacity {
            debug!("rejecting insert of {key:?}: map holds {capacity} of {capacity} entries");
            return Err(FixedMapError::MapFull { capacity });
        }

        chain.push_front(key, value);
        self.count += 1;
        Ok(())
    }

    /// Returns the value stored for `key`, or `None` if the key is absent.
    ///
    /// The returned reference is the one passed to `set`, with its original lifetime.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixedmap::FixedHashMap;
    ///
    /// let answer = 42;
    /// let mut map = FixedHashMap::new(8);
    /// map.set("answer", &answer);
    ///
    /// assert!(std::ptr::eq(map.get("answer").unwrap(), &answer));
    /// assert_eq!(map.get("question"), None);
    /// ```
    pub fn get(&self, key: &str) -> Option<&'a V> {
        self.bucket(key).find(key).map(|node| node.value)
    }

    /// Removes `key` from the map, returning its value if it was present.
    ///
    /// Every other entry, including those sharing the removed key's bucket,
    /// stays reachable.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixedmap::FixedHashMap;
    ///
    /// let value = 7;
    /// let mut map = FixedHashMap::new(8);
    /// map.set("seven", &value);
    ///
    /// assert_eq!(map.remove("seven"), Some(&7));
    /// assert_eq!(map.remove("seven"), None);
    /// assert!(map.is_empty());
    /// ```
    pub fn remove(&mut self, key: &str) -> Option<&'a V> {
        let index = bucket_index(key, self.buckets.len());
        let value = self.buckets[index].unlink(key)?;
        self.count -= 1;
        Some(value)
    }

    /// Returns `true` if the map holds an entry for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the load factor, `count / capacity`, in `[0, 1]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixedmap::FixedHashMap;
    ///
    /// let v = ();
    /// let mut map = FixedHashMap::new(4);
    /// assert_eq!(map.load(), 0.0);
    ///
    /// map.set("a", &v);
    /// assert_eq!(map.load(), 0.25);
    /// ```
    pub fn load(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        self.count as f32 / self.buckets.len() as f32
    }

    /// Returns the number of entries currently in the map.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the maximum number of entries, which is also the number of buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Removes every entry. The buckets are kept, so the capacity is unchanged.
    ///
    /// The referenced values are not touched.
    pub fn clear(&mut self) {
        trace!("clearing {} entries from fixed map", self.count);
        for chain in self.buckets.iter_mut() {
            chain.clear();
        }
        self.count = 0;
    }

    /// Returns an iterator over the entries, bucket by bucket.
    ///
    /// Within a bucket, the most recently inserted key comes first. The order is
    /// otherwise unspecified.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixedmap::FixedHashMap;
    ///
    /// let (x, y) = (1, 2);
    /// let mut map = FixedHashMap::new(4);
    /// map.set("x", &x);
    /// map.set("y", &y);
    ///
    /// let mut pairs: Vec<_> = map.iter().collect();
    /// pairs.sort();
    /// assert_eq!(pairs, [("x", &1), ("y", &2)]);
    /// ```
    pub fn iter(&self) -> Iter<'_, 'a, V> {
        Iter {
            buckets: self.buckets.iter(),
            node: None,
            remaining: self.count,
        }
    }

    fn bucket(&self, key: &str) -> &Chain<'a, V> {
        &self.buckets[bucket_index(key, self.buckets.len())]
    }
}

fn bucket_index(key: &str, capacity: usize) -> usize {
    fnv1a(key) as usize % capacity
}

impl<V> Clone for FixedHashMap<'_, V> {
    /// Deep-copies the bucket array and every chain. Both maps reference the same values,
    /// but inserting or removing keys in one is never visible in the other.
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            count: self.count,
        }
    }

    /// Releases this map's entries, then copies `source` into it. Bucket storage is
    /// reused when both maps have the same capacity.
    fn clone_from(&mut self, source: &Self) {
        trace!(
            "copying fixed map of {} entries over one of {}",
            source.count,
            self.count
        );
        if self.buckets.len() == source.buckets.len() {
            for (chain, source_chain) in self.buckets.iter_mut().zip(source.buckets.iter()) {
                chain.clone_from(source_chain);
            }
        } else {
            self.buckets = Box::default();
            self.buckets = source.buckets.clone();
        }
        self.count = source.count;
    }
}

impl<V: fmt::Debug> fmt::Debug for FixedHashMap<'_, V> {
    /// Dumps every bucket on its own line:
    /// `bin[3]: ["b" -> 2] -> ["a" -> 1] -> END`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "FixedHashMap {{ count: {}, capacity: {} }}",
            self.count,
            self.buckets.len()
        )?;
        for (index, chain) in self.buckets.iter().enumerate() {
            write!(f, "bin[{index}]:")?;
            for node in chain.nodes() {
                write!(f, " [{:?} -> {:?}] ->", node.key, node.value)?;
            }
            writeln!(f, " END")?;
        }
        Ok(())
    }
}

/// Iterator over the entries of a [`FixedHashMap`], created by [`FixedHashMap::iter`].
pub struct Iter<'m, 'a, V> {
    buckets: std::slice::Iter<'m, Chain<'a, V>>,
    node: Option<&'m Node<'a, V>>,
    remaining: usize,
}

impl<'m, 'a, V> Iterator for Iter<'m, 'a, V> {
    type Item = (&'m str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.node {
                self.node = node.next.as_deref();
                self.remaining -= 1;
                return Some((&*node.key, node.value));
            }
            self.node = self.buckets.next()?.head.as_deref();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, '_, V> {}

impl<V> FusedIterator for Iter<'_, '_, V> {}

impl<'m, 'a, V> IntoIterator for &'m FixedHashMap<'a, V> {
    type Item = (&'m str, &'a V);
    type IntoIter = Iter<'m, 'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

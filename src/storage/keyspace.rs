//! Shared Keyspace with Expiry Support
//!
//! This module implements the single shared map from keys to typed values,
//! together with the parallel table of absolute expiration instants.
//!
//! ## Design Decisions
//!
//! 1. **One coarse lock**: the keyspace and the expiry table live behind a
//!    single `Mutex` so every command executes atomically with respect to
//!    every other command.
//! 2. **Lazy expiry**: every operation that resolves a key first removes it
//!    if its deadline has elapsed, so no caller ever observes an expired
//!    key. The background sweeper handles keys nobody touches.
//! 3. **Absolute instants**: the expiry table stores deadlines, not
//!    remaining durations, so sweeper wake jitter cannot extend a key's
//!    lifetime.
//! 4. **No empty collections**: the operation that removes the last
//!    element of a list, set, or hash also removes the key and its expiry
//!    entry inside the same critical section.
//!
//! ## Concurrency Model
//!
//! Critical sections are short and never span socket I/O or an await
//! point, so a synchronous `Mutex` shared across async connection tasks
//! is sufficient. Helpers operate on the already-locked inner state; the
//! lock is taken exactly once per public operation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::storage::value::{normalize_range, Value};

/// Errors surfaced to clients as command-level reply frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key holds a value of a different kind than the operation expects
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// A string could not be interpreted as a signed 64-bit integer, or
    /// the arithmetic left the representable range
    #[error("value is not an integer or out of range")]
    NotAnInteger,
}

/// Result type for keyspace operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// The data behind the lock: the value map and the expiry table.
///
/// Invariant: every key in `expiry` is also a key in `data`.
#[derive(Debug, Default)]
struct Inner {
    data: HashMap<String, Value>,
    expiry: HashMap<String, Instant>,
}

impl Inner {
    /// Lazily removes the key if its deadline has elapsed.
    fn remove_if_expired(&mut self, key: &str) {
        let elapsed = self
            .expiry
            .get(key)
            .map(|&deadline| Instant::now() >= deadline)
            .unwrap_or(false);
        if elapsed {
            self.data.remove(key);
            self.expiry.remove(key);
        }
    }

    /// Resolves the live value for a key, expiring it first if needed.
    fn live(&mut self, key: &str) -> Option<&Value> {
        self.remove_if_expired(key);
        self.data.get(key)
    }

    /// Mutable variant of [`live`](Self::live).
    fn live_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.remove_if_expired(key);
        self.data.get_mut(key)
    }

    /// Removes a key and its expiry entry. Returns whether a value was
    /// actually removed.
    fn remove(&mut self, key: &str) -> bool {
        self.expiry.remove(key);
        self.data.remove(key).is_some()
    }

    /// Removes the key if its collection has just lost its last element.
    fn drop_if_empty(&mut self, key: &str) {
        let emptied = self
            .data
            .get(key)
            .map(|value| value.is_empty_collection())
            .unwrap_or(false);
        if emptied {
            self.remove(key);
        }
    }

    /// Removes every elapsed entry. Returns the number of keys removed.
    fn sweep(&mut self) -> u64 {
        let now = Instant::now();
        let expired: Vec<String> = self
            .expiry
            .iter()
            .filter(|(_, &deadline)| now >= deadline)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.data.remove(key);
            self.expiry.remove(key);
        }
        expired.len() as u64
    }
}

/// The shared keyspace.
///
/// Designed to be wrapped in an `Arc` and shared across all connection
/// tasks plus the background sweeper. Every public method is atomic with
/// respect to every other.
///
/// # Example
///
/// ```
/// use flintkv::storage::Keyspace;
///
/// let store = Keyspace::new();
/// store.set("name".to_string(), "flint".to_string());
/// assert_eq!(store.get("name").unwrap(), Some("flint".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct Keyspace {
    inner: Mutex<Inner>,
}

impl Keyspace {
    /// Creates a new, empty keyspace.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    // ========================================================================
    // String operations
    // ========================================================================

    /// Stores a string value, replacing any prior value of any kind and
    /// clearing any prior expiry.
    pub fn set(&self, key: String, value: String) {
        let mut inner = self.lock();
        inner.expiry.remove(&key);
        inner.data.insert(key, Value::String(value));
    }

    /// Returns the string value for a key, or `None` if absent.
    pub fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut inner = self.lock();
        match inner.live(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    /// Adds `delta` to the integer interpretation of a string value.
    ///
    /// An absent key is treated as `"0"`. The stored text is replaced with
    /// the new decimal representation; any expiry is left untouched.
    pub fn incr_by(&self, key: &str, delta: i64) -> StoreResult<i64> {
        let mut inner = self.lock();
        inner.remove_if_expired(key);
        let value = inner
            .data
            .entry(key.to_string())
            .or_insert_with(|| Value::String("0".to_string()));
        let Value::String(text) = value else {
            return Err(StoreError::WrongType);
        };
        let current: i64 = text.parse().map_err(|_| StoreError::NotAnInteger)?;
        let next = current.checked_add(delta).ok_or(StoreError::NotAnInteger)?;
        *text = next.to_string();
        Ok(next)
    }

    // ========================================================================
    // List operations
    // ========================================================================

    /// Pushes elements onto the head of a list, one at a time in argument
    /// order, creating the list if needed. Returns the new length.
    pub fn lpush(&self, key: &str, elements: &[String]) -> StoreResult<usize> {
        self.push(key, elements, true)
    }

    /// Pushes elements onto the tail of a list, creating it if needed.
    /// Returns the new length.
    pub fn rpush(&self, key: &str, elements: &[String]) -> StoreResult<usize> {
        self.push(key, elements, false)
    }

    fn push(&self, key: &str, elements: &[String], front: bool) -> StoreResult<usize> {
        let mut inner = self.lock();
        inner.remove_if_expired(key);
        let value = inner
            .data
            .entry(key.to_string())
            .or_insert_with(|| Value::List(Default::default()));
        let Value::List(list) = value else {
            return Err(StoreError::WrongType);
        };
        for element in elements {
            if front {
                list.push_front(element.clone());
            } else {
                list.push_back(element.clone());
            }
        }
        Ok(list.len())
    }

    /// Removes and returns the head element, or `None` if the list is
    /// absent or empty. Removes the key when the last element goes.
    pub fn lpop(&self, key: &str) -> StoreResult<Option<String>> {
        self.pop(key, true)
    }

    /// Removes and returns the tail element, or `None`.
    pub fn rpop(&self, key: &str) -> StoreResult<Option<String>> {
        self.pop(key, false)
    }

    fn pop(&self, key: &str, front: bool) -> StoreResult<Option<String>> {
        let mut inner = self.lock();
        let element = {
            let Some(value) = inner.live_mut(key) else {
                return Ok(None);
            };
            let Value::List(list) = value else {
                return Err(StoreError::WrongType);
            };
            if front {
                list.pop_front()
            } else {
                list.pop_back()
            }
        };
        inner.drop_if_empty(key);
        Ok(element)
    }

    /// Returns the list length, `0` if absent.
    pub fn llen(&self, key: &str) -> StoreResult<usize> {
        let mut inner = self.lock();
        match inner.live(key) {
            None => Ok(0),
            Some(Value::List(list)) => Ok(list.len()),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    /// Returns the inclusive range `[start, stop]` of a list. Negative
    /// indices count from the tail. Out-of-range bounds are clamped; a
    /// normalized `start > stop` yields the empty vector.
    pub fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let mut inner = self.lock();
        match inner.live(key) {
            None => Ok(Vec::new()),
            Some(Value::List(list)) => {
                let (s, e) = normalize_range(start, stop, list.len() as i64);
                if s > e {
                    return Ok(Vec::new());
                }
                Ok(list
                    .iter()
                    .skip(s as usize)
                    .take((e - s + 1) as usize)
                    .cloned()
                    .collect())
            }
            Some(_) => Err(StoreError::WrongType),
        }
    }

    // ========================================================================
    // Set operations
    // ========================================================================

    /// Adds members to a set, creating it if needed. Returns the number of
    /// members that were not already present.
    pub fn sadd(&self, key: &str, members: &[String]) -> StoreResult<usize> {
        let mut inner = self.lock();
        inner.remove_if_expired(key);
        let value = inner
            .data
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(Default::default()));
        let Value::Set(set) = value else {
            return Err(StoreError::WrongType);
        };
        Ok(members
            .iter()
            .filter(|member| set.insert((*member).clone()))
            .count())
    }

    /// Removes members from a set. Returns the number actually removed;
    /// removes the key when the set becomes empty.
    pub fn srem(&self, key: &str, members: &[String]) -> StoreResult<usize> {
        let mut inner = self.lock();
        let removed = {
            let Some(value) = inner.live_mut(key) else {
                return Ok(0);
            };
            let Value::Set(set) = value else {
                return Err(StoreError::WrongType);
            };
            members
                .iter()
                .filter(|member| set.remove(member.as_str()))
                .count()
        };
        inner.drop_if_empty(key);
        Ok(removed)
    }

    /// Returns all members of a set in unspecified order, empty if absent.
    pub fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut inner = self.lock();
        match inner.live(key) {
            None => Ok(Vec::new()),
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    /// Returns the set cardinality, `0` if absent.
    pub fn scard(&self, key: &str) -> StoreResult<usize> {
        let mut inner = self.lock();
        match inner.live(key) {
            None => Ok(0),
            Some(Value::Set(set)) => Ok(set.len()),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    /// Membership test; `false` for an absent key.
    pub fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut inner = self.lock();
        match inner.live(key) {
            None => Ok(false),
            Some(Value::Set(set)) => Ok(set.contains(member)),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    // ========================================================================
    // Hash operations
    // ========================================================================

    /// Sets field/value pairs on a hash, creating it if needed. Returns
    /// the number of fields newly created (updates do not count).
    pub fn hset(&self, key: &str, pairs: &[(String, String)]) -> StoreResult<usize> {
        let mut inner = self.lock();
        inner.remove_if_expired(key);
        let value = inner
            .data
            .entry(key.to_string())
            .or_insert_with(|| Value::Hash(Default::default()));
        let Value::Hash(hash) = value else {
            return Err(StoreError::WrongType);
        };
        Ok(pairs
            .iter()
            .filter(|(field, val)| hash.insert(field.clone(), val.clone()).is_none())
            .count())
    }

    /// Returns the value of a hash field, or `None`.
    pub fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let mut inner = self.lock();
        match inner.live(key) {
            None => Ok(None),
            Some(Value::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    /// Deletes hash fields. Returns the number removed; removes the key
    /// when the hash becomes empty.
    pub fn hdel(&self, key: &str, fields: &[String]) -> StoreResult<usize> {
        let mut inner = self.lock();
        let removed = {
            let Some(value) = inner.live_mut(key) else {
                return Ok(0);
            };
            let Value::Hash(hash) = value else {
                return Err(StoreError::WrongType);
            };
            fields
                .iter()
                .filter(|field| hash.remove(field.as_str()).is_some())
                .count()
        };
        inner.drop_if_empty(key);
        Ok(removed)
    }

    /// Returns all field names, empty if absent.
    pub fn hkeys(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut inner = self.lock();
        match inner.live(key) {
            None => Ok(Vec::new()),
            Some(Value::Hash(hash)) => Ok(hash.keys().cloned().collect()),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    /// Returns all field values, empty if absent.
    pub fn hvals(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut inner = self.lock();
        match inner.live(key) {
            None => Ok(Vec::new()),
            Some(Value::Hash(hash)) => Ok(hash.values().cloned().collect()),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    /// Returns fields and values interleaved (field, value, field, value,
    /// ...), empty if absent.
    pub fn hgetall(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut inner = self.lock();
        match inner.live(key) {
            None => Ok(Vec::new()),
            Some(Value::Hash(hash)) => {
                let mut items = Vec::with_capacity(hash.len() * 2);
                for (field, val) in hash {
                    items.push(field.clone());
                    items.push(val.clone());
                }
                Ok(items)
            }
            Some(_) => Err(StoreError::WrongType),
        }
    }

    // ========================================================================
    // Generic key operations
    // ========================================================================

    /// Deletes a single key. Returns whether a live value was removed.
    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.lock();
        inner.remove_if_expired(key);
        inner.remove(key)
    }

    /// Deletes several keys in one critical section. Returns the number of
    /// live keys actually removed.
    pub fn delete_many(&self, keys: &[String]) -> u64 {
        let mut inner = self.lock();
        keys.iter()
            .filter(|key| {
                inner.remove_if_expired(key);
                inner.remove(key)
            })
            .count() as u64
    }

    /// Live-existence check for a single key.
    pub fn exists(&self, key: &str) -> bool {
        let mut inner = self.lock();
        inner.live(key).is_some()
    }

    /// Counts how many of the given keys exist; duplicates are counted
    /// each time they appear.
    pub fn exists_many(&self, keys: &[String]) -> u64 {
        let mut inner = self.lock();
        keys.iter()
            .filter(|key| inner.live(key).is_some())
            .count() as u64
    }

    /// Sets an absolute expiration `seconds` from now on an existing key.
    ///
    /// Returns `false` if the key is absent. Non-positive seconds delete
    /// the key immediately (still reported as success).
    pub fn expire(&self, key: &str, seconds: i64) -> bool {
        let mut inner = self.lock();
        inner.remove_if_expired(key);
        if !inner.data.contains_key(key) {
            return false;
        }
        if seconds <= 0 {
            inner.remove(key);
            return true;
        }
        inner
            .expiry
            .insert(key.to_string(), Instant::now() + Duration::from_secs(seconds as u64));
        true
    }

    /// Returns the remaining time-to-live in seconds: `-2` if the key is
    /// absent, `-1` if it has no expiry, otherwise the ceiling of the
    /// remaining duration.
    pub fn ttl(&self, key: &str) -> i64 {
        let mut inner = self.lock();
        inner.remove_if_expired(key);
        if !inner.data.contains_key(key) {
            return -2;
        }
        let Some(&deadline) = inner.expiry.get(key) else {
            return -1;
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            // The deadline passed between the lazy check and here.
            inner.remove(key);
            return -2;
        }
        ((remaining.as_millis() + 999) / 1000) as i64
    }

    /// Returns all live keys matching a glob pattern over the whole key.
    ///
    /// `*` matches zero or more characters, `?` matches exactly one. The
    /// match is case-sensitive; there are no character classes.
    pub fn keys_matching(&self, pattern: &str) -> Vec<String> {
        let mut inner = self.lock();
        inner.sweep();
        inner
            .data
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect()
    }

    /// Removes every key and every expiry entry.
    pub fn flush_all(&self) {
        let mut inner = self.lock();
        inner.data.clear();
        inner.expiry.clear();
    }

    /// Removes all elapsed entries; called by the background sweeper.
    /// Returns the number of keys removed.
    pub fn sweep_expired(&self) -> u64 {
        self.lock().sweep()
    }

    /// Number of keys currently stored (including any not yet swept).
    pub fn len(&self) -> usize {
        self.lock().data.len()
    }

    /// Returns true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Matches `text` against a glob `pattern` supporting `*` and `?` only.
///
/// The whole text must match; comparison is per character and
/// case-sensitive.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    matches_from(&pattern, &text)
}

fn matches_from(pattern: &[char], text: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('*') => (0..=text.len()).any(|i| matches_from(&pattern[1..], &text[i..])),
        Some('?') => !text.is_empty() && matches_from(&pattern[1..], &text[1..]),
        Some(&c) => text.first() == Some(&c) && matches_from(&pattern[1..], &text[1..]),
    }
}

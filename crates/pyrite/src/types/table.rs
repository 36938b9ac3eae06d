use hashbrown::HashTable;

use crate::{
    exception::{ExcType, RunError, RunResult},
    heap::{Heap, HeapId},
    object::PyObject,
    resource::ResourceTracker,
};

/// Insertion ordered hash table shared by [`Dict`](super::Dict) and [`Set`](super::Set).
///
/// Uses a `HashTable<usize>` for hash lookups combined with a dense `Vec<TableEntry>`
/// that preserves insertion order. The hash table maps key hashes to indices in the
/// entries vector.
///
/// `version` changes on every structural change (insert of a new key or removal) so
/// iteration cursors can detect mutation even when the length is unchanged.
/// Replacing the value of an existing key is not structural.
#[derive(Debug, Clone)]
pub(crate) struct Table<K, V> {
    /// indices mapping from the entry hash to its index.
    indices: HashTable<usize>,
    /// entries is a dense vec maintaining entry order.
    entries: Vec<TableEntry<K, V>>,
    version: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct TableEntry<K, V> {
    pub key: K,
    pub value: V,
    /// the hash is needed here for correct use of insert_unique
    pub hash: u64,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            indices: HashTable::new(),
            entries: Vec::new(),
            version: 0,
        }
    }
}

impl<K: PyObject, V> Table<K, V> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: HashTable::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
            version: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn entries(&self) -> &[TableEntry<K, V>] {
        &self.entries
    }

    pub fn entry_at(&self, index: usize) -> Option<&TableEntry<K, V>> {
        self.entries.get(index)
    }

    pub fn value_at_mut(&mut self, index: usize) -> Option<&mut V> {
        self.entries.get_mut(index).map(|entry| &mut entry.value)
    }

    /// Finds the entry whose key equals `key`.
    ///
    /// Key comparison may fail (nested containers hit the depth limit); the first
    /// such error is returned instead of a match.
    pub fn find(&self, key: &K, hash: u64, heap: &Heap<impl ResourceTracker>) -> RunResult<Option<usize>> {
        let mut failure = None;
        let found = self
            .indices
            .find(hash, |&index| {
                let entry = &self.entries[index];
                if failure.is_some() || entry.hash != hash {
                    return false;
                }
                match entry.key.py_eq(key, heap) {
                    Ok(equal) => equal,
                    Err(err) => {
                        failure = Some(err);
                        false
                    }
                }
            })
            .copied();
        match failure {
            Some(err) => Err(err),
            None => Ok(found),
        }
    }

    /// Appends a key known to be absent.
    pub fn insert_new(&mut self, key: K, value: V, hash: u64) {
        let index = self.entries.len();
        self.entries.push(TableEntry { key, value, hash });
        self.indices
            .insert_unique(hash, index, |index| self.entries[*index].hash);
        self.version = self.version.wrapping_add(1);
    }

    /// Removes the entry at `index`, keeping the remaining entries in order.
    pub fn remove_at(&mut self, index: usize) -> RunResult<TableEntry<K, V>> {
        let hash = self
            .entries
            .get(index)
            .map(|entry| entry.hash)
            .ok_or_else(|| RunError::internal("table index out of range"))?;
        if let Ok(slot) = self.indices.find_entry(hash, |&candidate| candidate == index) {
            slot.remove();
        }
        let entry = self.entries.remove(index);
        // Entries after the removed slot shift left by one, so stored indices
        // in the hash table must be updated to stay aligned with `entries`.
        for stored in &mut self.indices {
            if *stored > index {
                *stored -= 1;
            }
        }
        self.version = self.version.wrapping_add(1);
        Ok(entry)
    }

    /// Removes the most recently inserted entry.
    pub fn pop_last(&mut self) -> Option<TableEntry<K, V>> {
        let last = self.entries.len().checked_sub(1)?;
        self.remove_at(last).ok()
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.version = self.version.wrapping_add(1);
        }
        self.indices.clear();
        self.entries.clear();
    }

    pub fn trace_keys(&self, out: &mut Vec<HeapId>) {
        for entry in &self.entries {
            entry.key.trace(out);
        }
    }
}

/// Position in a [`Table`] plus the shape the table had when iteration began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCursor {
    position: usize,
    len: usize,
    version: u64,
}

impl TableCursor {
    pub(crate) fn start<K: PyObject, V>(table: &Table<K, V>) -> Self {
        Self {
            position: 0,
            len: table.len(),
            version: table.version(),
        }
    }

    /// Verifies the table is structurally unchanged.
    ///
    /// `changed_size` builds the RuntimeError for a length change and `changed_keys`
    /// the one for a same length insert/remove pair.
    pub(crate) fn check<K: PyObject, V>(
        &self,
        table: &Table<K, V>,
        changed_size: fn() -> RunError,
        changed_keys: fn() -> RunError,
    ) -> RunResult<()> {
        if table.len() != self.len {
            return Err(changed_size());
        }
        if table.version() != self.version {
            return Err(changed_keys());
        }
        Ok(())
    }

    pub(crate) fn has_next(&self) -> bool {
        self.position < self.len
    }

    /// Returns the current position and advances past it.
    pub(crate) fn advance(&mut self) -> RunResult<usize> {
        if !self.has_next() {
            return Err(ExcType::stop_iteration());
        }
        let position = self.position;
        self.position += 1;
        Ok(position)
    }
}

//! Queue Store
//!
//! Pending items keyed by admission index, plus the signature set used for
//! duplicate suppression. Indices increase monotonically and are never
//! reused, so key order is admission order.

use std::collections::{BTreeMap, HashSet};

use super::types::{QueueEntry, QueueIndex, Signature, UploadItem};

/// Ordered pending items and their signatures
#[derive(Debug, Default)]
pub struct QueueStore {
    /// Live entries, ordered by index
    entries: BTreeMap<QueueIndex, UploadItem>,

    /// Signatures of live entries that are not force-new
    signatures: HashSet<Signature>,

    /// Next index to hand out
    next_index: u64,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Admission & Removal
    // ========================================================================

    /// Admit an item unless its signature is already queued
    ///
    /// Returns the assigned index, or `None` for a suppressed duplicate.
    pub fn admit(&mut self, item: UploadItem) -> Option<QueueIndex> {
        if !item.is_force_new() {
            let signature = item.signature();
            if self.signatures.contains(&signature) {
                tracing::debug!(signature = %signature, "Duplicate upload suppressed");
                return None;
            }
            self.signatures.insert(signature);
        }

        let index = QueueIndex::from(self.next_index);
        self.next_index += 1;
        self.entries.insert(index, item);
        Some(index)
    }

    /// Remove an entry and its signature
    ///
    /// Unknown indices are ignored.
    pub fn remove(&mut self, index: &QueueIndex) -> Option<UploadItem> {
        let item = self.entries.remove(index)?;
        if !item.is_force_new() {
            self.signatures.remove(&item.signature());
        }
        Some(item)
    }

    /// Remove every entry matching `predicate`, oldest first
    pub fn extract_where<F>(&mut self, predicate: F) -> Vec<QueueEntry>
    where
        F: Fn(&UploadItem) -> bool,
    {
        let matching: Vec<QueueIndex> = self
            .entries
            .iter()
            .filter(|(_, item)| predicate(item))
            .map(|(index, _)| *index)
            .collect();

        matching
            .into_iter()
            .filter_map(|index| {
                self.remove(&index)
                    .map(|item| QueueEntry { index, item })
            })
            .collect()
    }

    /// Clear entries and signatures; the index counter keeps counting
    pub fn reset(&mut self) {
        self.entries.clear();
        self.signatures.clear();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Oldest live entry
    pub fn oldest(&self) -> Option<QueueEntry> {
        self.entries
            .first_key_value()
            .map(|(index, item)| QueueEntry {
                index: *index,
                item: item.clone(),
            })
    }

    pub fn contains_signature(&self, signature: &Signature) -> bool {
        self.signatures.contains(signature)
    }

    /// Live entries in admission order
    pub fn indices(&self) -> Vec<QueueIndex> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Order sequence manager.
//!
//! An [`OrderSequence`] holds a strict total order over a set of ids,
//! independent of the entities those ids refer to. After every mutation the
//! entries are sorted by `order_index` and indexed `0..len` with no gaps or
//! duplicates. Entries loaded from the server may be unpositioned (`None`)
//! until the next mutation re-packs them to the end.

use std::cmp::Ordering;

use planner_proto::order::{OrderEntry, Position};

/// Errors raised by relative moves.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    /// The moved id or the anchor id is not in the sequence.
    #[error("id {0} is not in the order sequence")]
    UnknownId(String),
}

/// Compares two optional order indices: positioned before unpositioned,
/// positioned ascending, two unpositioned equal.
#[must_use]
pub fn compare_index(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Ordered sequence of ids for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSequence<I> {
    entries: Vec<OrderEntry<I>>,
}

impl<I> Default for OrderSequence<I> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<I: Copy + Eq + std::fmt::Display> OrderSequence<I> {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sequence from server entries, sorted for display.
    ///
    /// Indices are kept as received; the next mutation re-packs them.
    #[must_use]
    pub fn from_entries(mut entries: Vec<OrderEntry<I>>) -> Self {
        entries.sort_by(|a, b| compare_index(a.order_index, b.order_index));
        Self { entries }
    }

    /// Builds a contiguous sequence from ids in display order.
    pub fn from_ids(ids: impl IntoIterator<Item = I>) -> Self {
        let mut sequence = Self::new();
        for id in ids {
            sequence.insert_at_end(id);
        }
        sequence
    }

    /// Returns the entries in display order.
    #[must_use]
    pub fn entries(&self) -> &[OrderEntry<I>] {
        &self.entries
    }

    /// Returns the ids in display order.
    pub fn ids(&self) -> impl Iterator<Item = I> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the sequence is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `id` has an entry.
    #[must_use]
    pub fn contains(&self, id: I) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Returns the array position of `id`.
    #[must_use]
    pub fn position(&self, id: I) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Returns the stored order index of `id`; `None` if absent or unpositioned.
    #[must_use]
    pub fn order_index(&self, id: I) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .and_then(|e| e.order_index)
    }

    /// Appends `id` with `order_index = len`.
    ///
    /// An id already present is left where it is.
    pub fn insert_at_end(&mut self, id: I) {
        if self.contains(id) {
            return;
        }
        self.repack();
        let index = index_for(self.entries.len());
        self.entries.push(OrderEntry::new(id, index));
    }

    /// Inserts `id` at array position `position` (clamped to the end) and
    /// re-packs. Used to put an entry back where a rolled-back patch found it.
    pub fn insert_at(&mut self, id: I, position: usize) {
        if self.contains(id) {
            return;
        }
        self.repack();
        let position = position.min(self.entries.len());
        self.entries.insert(position, OrderEntry::unpositioned(id));
        self.reindex();
    }

    /// Removes the entry for `id`, returning the array position it held.
    ///
    /// The remaining entries are re-packed so indices stay contiguous.
    pub fn remove(&mut self, id: I) -> Option<usize> {
        self.repack();
        let position = self.position(id)?;
        self.entries.remove(position);
        self.reindex();
        Some(position)
    }

    /// Moves `moved` immediately before or after `anchor`.
    ///
    /// Moving an id relative to itself leaves the sequence unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::UnknownId`] if either id is absent; the sequence
    /// is not modified in that case.
    pub fn move_relative(
        &mut self,
        moved: I,
        anchor: I,
        position: Position,
    ) -> Result<(), OrderError> {
        for id in [moved, anchor] {
            if !self.contains(id) {
                return Err(OrderError::UnknownId(id.to_string()));
            }
        }
        if moved == anchor {
            return Ok(());
        }

        self.entries
            .sort_by(|a, b| compare_index(a.order_index, b.order_index));
        let from = self
            .position(moved)
            .ok_or_else(|| OrderError::UnknownId(moved.to_string()))?;
        let entry = self.entries.remove(from);
        let at = self
            .position(anchor)
            .ok_or_else(|| OrderError::UnknownId(anchor.to_string()))?;
        let insert_at = match position {
            Position::Before => at,
            Position::After => at + 1,
        };
        self.entries.insert(insert_at, entry);
        self.reindex();
        Ok(())
    }

    /// Replaces the id of an entry in place, keeping its index.
    ///
    /// Returns `false` if `old` has no entry.
    pub fn rewrite_id(&mut self, old: I, new: I) -> bool {
        match self.entries.iter_mut().find(|e| e.id == old) {
            Some(entry) => {
                entry.id = new;
                true
            }
            None => false,
        }
    }

    /// Keeps only the entries whose id satisfies `keep`, then re-packs.
    pub fn retain(&mut self, mut keep: impl FnMut(I) -> bool) {
        self.entries.retain(|e| keep(e.id));
        self.repack();
    }

    /// Returns `true` if the indices are exactly `0..len` in array order.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(i, e)| e.order_index == u32::try_from(i).ok())
    }

    /// Sorts by index (unpositioned last, stable) and reindexes `0..len`.
    fn repack(&mut self) {
        if self.is_contiguous() {
            return;
        }
        self.entries
            .sort_by(|a, b| compare_index(a.order_index, b.order_index));
        self.reindex();
    }

    fn reindex(&mut self) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.order_index = Some(index_for(i));
        }
    }
}

fn index_for(position: usize) -> u32 {
    u32::try_from(position).unwrap_or(u32::MAX)
}

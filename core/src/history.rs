//! Grouped history stack
//!
//! Entries are pushed as `Pending`, filled with opaque events, then either
//! committed or cancelled. Entries live in groups; a group is a checkpoint
//! that can be discarded in one go. The base group always exists.

use crate::error::HistoryError;
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::debug;

/// Unique identifier of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    Pending,
    Committed,
    Cancelled,
}

impl EntryStatus {
    pub fn is_final(self) -> bool {
        !matches!(self, EntryStatus::Pending)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Committed => "committed",
            EntryStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// One recorded step of history
#[derive(Debug, Clone)]
pub struct HistoryEntry<E> {
    id: EntryId,
    events: Vec<E>,
    status: EntryStatus,
    created_at: DateTime<Utc>,
}

impl<E> HistoryEntry<E> {
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Events in insertion order
    pub fn events(&self) -> &[E] {
        &self.events
    }

    pub fn status(&self) -> EntryStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Consume the entry, keeping only its events
    pub fn into_events(self) -> Vec<E> {
        self.events
    }
}

#[derive(Debug, Clone)]
struct HistoryGroup<E> {
    entries: Vec<HistoryEntry<E>>,
}

impl<E> Default for HistoryGroup<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

/// Append-only, grouped stack of history entries
#[derive(Debug, Clone)]
pub struct HistoryStack<E> {
    groups: Vec<HistoryGroup<E>>,
    next_id: u64,
}

impl<E> HistoryStack<E> {
    /// Create a stack holding only the empty base group
    pub fn new() -> Self {
        Self {
            groups: vec![HistoryGroup::default()],
            next_id: 1,
        }
    }

    /// Create a pending entry in the top group
    pub fn push_new_entry(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;

        let entry = HistoryEntry {
            id,
            events: Vec::new(),
            status: EntryStatus::Pending,
            created_at: Utc::now(),
        };
        self.top_group_mut().entries.push(entry);

        debug!(entry = %id, groups = self.groups.len(), "History entry pushed");
        id
    }

    /// Append an event to a pending entry
    pub fn append(&mut self, id: EntryId, event: E) -> Result<(), HistoryError> {
        let entry = self.find_mut(id)?;
        if entry.status.is_final() {
            return Err(HistoryError::InvalidState {
                id,
                status: entry.status,
            });
        }
        entry.events.push(event);
        Ok(())
    }

    /// Mark a pending entry as committed
    pub fn commit_entry(&mut self, id: EntryId) -> Result<(), HistoryError> {
        let entry = self.find_mut(id)?;
        if entry.status.is_final() {
            return Err(HistoryError::InvalidState {
                id,
                status: entry.status,
            });
        }
        entry.status = EntryStatus::Committed;

        debug!(entry = %id, "History entry committed");
        Ok(())
    }

    /// Cancel a pending entry and remove it from its group
    pub fn cancel_entry(&mut self, id: EntryId) -> Result<HistoryEntry<E>, HistoryError> {
        let (group_index, entry_index) = self.locate(id).ok_or(HistoryError::NotFound { id })?;
        let status = self.groups[group_index].entries[entry_index].status;
        if status.is_final() {
            return Err(HistoryError::InvalidState { id, status });
        }

        let mut entry = self.groups[group_index].entries.remove(entry_index);
        entry.status = EntryStatus::Cancelled;
        self.drop_group_if_emptied(group_index);

        debug!(entry = %id, "History entry cancelled");
        Ok(entry)
    }

    /// Remove and return the most recent entry, scanning down through groups
    pub fn pop(&mut self) -> Result<HistoryEntry<E>, HistoryError> {
        let group_index = self
            .groups
            .iter()
            .rposition(|group| !group.entries.is_empty())
            .ok_or(HistoryError::Empty)?;

        let entry = self.groups[group_index]
            .entries
            .pop()
            .ok_or(HistoryError::Empty)?;
        self.drop_group_if_emptied(group_index);

        debug!(entry = %entry.id, "History entry popped");
        Ok(entry)
    }

    /// The entry [`HistoryStack::pop`] would return
    pub fn peek(&self) -> Option<&HistoryEntry<E>> {
        self.groups
            .iter()
            .rev()
            .find_map(|group| group.entries.last())
    }

    /// Look up an entry anywhere in the stack
    pub fn get(&self, id: EntryId) -> Option<&HistoryEntry<E>> {
        self.locate(id)
            .map(|(group, entry)| &self.groups[group].entries[entry])
    }

    /// Push an empty group, establishing a checkpoint
    pub fn add_new_group(&mut self) {
        self.groups.push(HistoryGroup::default());
        debug!(groups = self.groups.len(), "History group added");
    }

    /// Discard the top group and everything in it; the base group stays
    pub fn clear_active_group(&mut self) -> bool {
        if self.groups.len() <= 1 {
            return false;
        }
        let removed = self.groups.pop().map(|g| g.entries.len()).unwrap_or(0);
        debug!(removed, groups = self.groups.len(), "History group cleared");
        true
    }

    /// Discard every group except the base and empty it
    pub fn clear(&mut self) -> bool {
        if self.groups.len() == 1 && self.groups[0].entries.is_empty() {
            return false;
        }
        self.groups.truncate(1);
        self.groups[0].entries.clear();
        debug!("History cleared");
        true
    }

    /// Total number of entries across all groups
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.entries.is_empty())
    }

    /// Number of groups, the base group included
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// All entries, most recent first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry<E>> {
        self.groups
            .iter()
            .rev()
            .flat_map(|group| group.entries.iter().rev())
    }

    fn top_group_mut(&mut self) -> &mut HistoryGroup<E> {
        if self.groups.is_empty() {
            self.groups.push(HistoryGroup::default());
        }
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }

    fn locate(&self, id: EntryId) -> Option<(usize, usize)> {
        self.groups.iter().enumerate().rev().find_map(|(g, group)| {
            group
                .entries
                .iter()
                .position(|entry| entry.id == id)
                .map(|e| (g, e))
        })
    }

    fn find_mut(&mut self, id: EntryId) -> Result<&mut HistoryEntry<E>, HistoryError> {
        let (group, entry) = self.locate(id).ok_or(HistoryError::NotFound { id })?;
        Ok(&mut self.groups[group].entries[entry])
    }

    fn drop_group_if_emptied(&mut self, group_index: usize) {
        if group_index > 0 && self.groups[group_index].entries.is_empty() {
            self.groups.remove(group_index);
            debug!(groups = self.groups.len(), "Emptied history group removed");
        }
    }
}

impl<E> Default for HistoryStack<E> {
    fn default() -> Self {
        Self::new()
    }
}

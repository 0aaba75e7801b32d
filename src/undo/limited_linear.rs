//! Bounded linear undo/redo model

use super::OperationEvent;
use std::collections::VecDeque;

/// Two stacks of operation events with an optional size limit
///
/// A limit of 0 means unbounded. New entries clear the redo stack; entries
/// beyond the limit are evicted oldest first.
#[derive(Debug, Default)]
pub struct LimitedLinearUndo {
    undo_list: VecDeque<OperationEvent>,
    redo_list: VecDeque<OperationEvent>,
    limit: usize,
}

impl LimitedLinearUndo {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_list: VecDeque::new(),
            redo_list: VecDeque::new(),
            limit,
        }
    }

    /// Record a new undoable step
    pub fn set_operation_event(&mut self, event: OperationEvent) -> bool {
        tracing::debug!(
            "Undo entry {} (object {}, group {})",
            event.description(),
            event.object_event_id(),
            event.group_event_id()
        );
        self.undo_list.push_back(event);
        self.redo_list.clear();
        self.enforce_limit();
        true
    }

    /// Undo exactly one entry
    pub fn undo(&mut self) -> bool {
        let Some(event) = self.undo_list.pop_back() else {
            return false;
        };
        event.execute_undo();
        self.redo_list.push_back(event);
        true
    }

    /// Redo exactly one entry
    pub fn redo(&mut self) -> bool {
        let Some(event) = self.redo_list.pop_back() else {
            return false;
        };
        event.execute_redo();
        self.undo_list.push_back(event);
        true
    }

    /// Undo entries until the top entry's object event id drops below
    /// `object_event_id`. At least one entry is undone when any exist.
    pub fn undo_to(&mut self, object_event_id: u64) -> bool {
        if !self.undo() {
            return false;
        }
        while self
            .undo_list
            .back()
            .is_some_and(|e| e.object_event_id() >= object_event_id)
        {
            self.undo();
        }
        true
    }

    /// Redo entries while the top redo entry's object event id is at most
    /// `object_event_id`. At least one entry is redone when any exist.
    pub fn redo_to(&mut self, object_event_id: u64) -> bool {
        if !self.redo() {
            return false;
        }
        while self
            .redo_list
            .back()
            .is_some_and(|e| e.object_event_id() <= object_event_id)
        {
            self.redo();
        }
        true
    }

    /// Fine undoes everything of the latest object event, coarse the whole
    /// latest group.
    pub fn undo_fine(&mut self, fine: bool) -> bool {
        let Some(top) = self.undo_list.back() else {
            return false;
        };
        if fine {
            let object_event_id = top.object_event_id();
            return self.undo_to(object_event_id);
        }
        let group_event_id = top.group_event_id();
        while self
            .undo_list
            .back()
            .is_some_and(|e| e.group_event_id() == group_event_id)
        {
            self.undo();
        }
        true
    }

    pub fn redo_fine(&mut self, fine: bool) -> bool {
        let Some(top) = self.redo_list.back() else {
            return false;
        };
        if fine {
            let object_event_id = top.object_event_id();
            return self.redo_to(object_event_id);
        }
        let group_event_id = top.group_event_id();
        while self
            .redo_list
            .back()
            .is_some_and(|e| e.group_event_id() == group_event_id)
        {
            self.redo();
        }
        true
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the limit; shrinking evicts immediately
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        if self.limit == 0 {
            return;
        }
        while self.undo_list.len() > self.limit {
            if let Some(evicted) = self.undo_list.pop_front() {
                tracing::debug!("Undo limit {} reached, evicting {}", self.limit, evicted.description());
            }
        }
    }

    pub fn undo_len(&self) -> usize {
        self.undo_list.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_list.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_list.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_list.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_list.clear();
        self.redo_list.clear();
    }

    pub fn clear_redo(&mut self) {
        self.redo_list.clear();
    }

    /// Undo stack from newest to oldest
    pub fn undo_entries(&self) -> impl Iterator<Item = &OperationEvent> {
        self.undo_list.iter().rev()
    }

    /// Redo stack from newest to oldest
    pub fn redo_entries(&self) -> impl Iterator<Item = &OperationEvent> {
        self.redo_list.iter().rev()
    }

    pub fn undo_descriptions(&self) -> Vec<String> {
        self.undo_entries()
            .map(|e| e.description().to_string())
            .collect()
    }

    pub fn redo_descriptions(&self) -> Vec<String> {
        self.redo_entries()
            .map(|e| e.description().to_string())
            .collect()
    }
}

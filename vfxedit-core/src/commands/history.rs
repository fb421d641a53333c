//! # History
//!
//! A bounded run of applied commands and a cursor into it. Entries before and at the cursor are applied, the ones
//! after it were undone and can be redone until something new is added.
//!
//! Once an entry falls off the front it can never be undone. Its effect becomes part of the baseline.

use super::{CommandConsumer, CommandError, DoUndo};
use std::collections::VecDeque;

pub struct History<C> {
    entries: VecDeque<C>,
    /// How many of `entries` are currently applied, counted from the front.
    applied: usize,
    max: usize,
    dirty: bool,
}
impl<C> History<C> {
    /// An empty history holding at most `max` entries. A `max` of zero is treated as one.
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            applied: 0,
            max: max.max(1),
            dirty: false,
        }
    }
    /// Apply `command` to `target`, then record it. A command that fails to apply is not recorded.
    pub fn add<S>(&mut self, command: C, target: &mut S) -> Result<(), CommandError>
    where
        S: CommandConsumer<C> + ?Sized,
    {
        target.apply(DoUndo::Do(&command))?;
        self.push_executed(command);
        Ok(())
    }
    /// Record a command that has already been applied.
    ///
    /// The redo branch is dropped, and the oldest entries are evicted to stay within capacity.
    pub fn push_executed(&mut self, command: C) {
        self.entries.truncate(self.applied);
        self.entries.push_back(command);
        self.evict();
        self.applied = self.entries.len();
        self.dirty = true;
    }
    fn evict(&mut self) {
        while self.entries.len() > self.max {
            if self.applied > 0 {
                self.entries.pop_front();
                self.applied -= 1;
            } else {
                // Everything left is undone. Dropping the front would break redo order.
                self.entries.pop_back();
            }
        }
    }
    /// Revert the most recently applied entry. `Ok(false)` if there was none.
    pub fn undo<S>(&mut self, target: &mut S) -> Result<bool, CommandError>
    where
        S: CommandConsumer<C> + ?Sized,
    {
        let Some(idx) = self.applied.checked_sub(1) else {
            return Ok(false);
        };
        // In range, applied never exceeds len.
        target.apply(DoUndo::Undo(&self.entries[idx]))?;
        self.applied = idx;
        self.dirty = true;
        Ok(true)
    }
    /// Re-apply the next undone entry. `Ok(false)` if there was none.
    pub fn redo<S>(&mut self, target: &mut S) -> Result<bool, CommandError>
    where
        S: CommandConsumer<C> + ?Sized,
    {
        let Some(command) = self.entries.get(self.applied) else {
            return Ok(false);
        };
        target.apply(DoUndo::Do(command))?;
        self.applied += 1;
        self.dirty = true;
        Ok(true)
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }
    /// Forget every entry. The state they produced is left as it is.
    pub fn dispose(&mut self) {
        self.entries.clear();
        self.applied = 0;
    }
    /// Index of the most recently applied entry, or None if everything is undone.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    #[must_use]
    pub fn max(&self) -> usize {
        self.max
    }
    /// Change the capacity, evicting from the front if the history is now over it.
    pub fn set_max(&mut self, max: usize) {
        self.max = max.max(1);
        self.evict();
    }
    /// Whether anything was added, undone or redone since the last [`Self::mark_clean`].
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
    /// Every retained entry, oldest first, with whether it is currently applied.
    pub fn iter(&self) -> impl Iterator<Item = (&C, bool)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, command)| (command, idx < self.applied))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Append(i32);
    #[derive(Default)]
    struct List(Vec<i32>);
    impl CommandConsumer<Append> for List {
        fn apply(&mut self, command: DoUndo<'_, Append>) -> Result<(), CommandError> {
            match command {
                DoUndo::Do(Append(value)) => self.0.push(*value),
                DoUndo::Undo(Append(value)) => {
                    if self.0.last() != Some(value) {
                        return Err(CommandError::MismatchedState);
                    }
                    self.0.pop();
                }
            }
            Ok(())
        }
    }

    #[test]
    fn eviction_is_permanent() {
        let mut list = List::default();
        let mut history = History::new(3);
        for value in 1..=4 {
            history.add(Append(value), &mut list).unwrap();
        }
        assert_eq!(list.0, [1, 2, 3, 4]);
        assert!(history.can_undo());
        assert_eq!(history.len(), 3);

        for _ in 0..3 {
            assert!(history.undo(&mut list).unwrap());
        }
        assert_eq!(list.0, [1]);
        assert!(!history.can_undo());
        assert_eq!(history.cursor(), None);
        // Nothing left, not an error.
        assert!(!history.undo(&mut list).unwrap());
    }
    #[test]
    fn add_prunes_redo_branch() {
        let mut list = List::default();
        let mut history = History::new(10);
        history.add(Append(1), &mut list).unwrap();
        history.add(Append(2), &mut list).unwrap();
        history.undo(&mut list).unwrap();
        assert!(history.can_redo());

        history.add(Append(3), &mut list).unwrap();
        assert!(!history.can_redo());
        assert_eq!(list.0, [1, 3]);
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), Some(1));

        history.undo(&mut list).unwrap();
        history.undo(&mut list).unwrap();
        history.redo(&mut list).unwrap();
        history.redo(&mut list).unwrap();
        assert_eq!(list.0, [1, 3]);
        assert!(!history.redo(&mut list).unwrap());
    }
    #[test]
    fn failed_command_is_not_recorded() {
        let mut list = List(vec![5]);
        let mut history = History::new(4);
        history.push_executed(Append(6));
        // The list never got the 6, so the undo does not match.
        assert!(matches!(
            history.undo(&mut list),
            Err(CommandError::MismatchedState)
        ));
        assert_eq!(history.cursor(), Some(0));
        assert_eq!(list.0, [5]);
    }
    #[test]
    fn dispose_and_dirty() {
        let mut list = List::default();
        let mut history = History::new(2);
        assert!(!history.is_dirty());
        history.add(Append(1), &mut list).unwrap();
        assert!(history.is_dirty());
        history.mark_clean();
        assert!(!history.is_dirty());

        history.dispose();
        assert!(history.is_empty());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(list.0, [1]);
    }
    #[test]
    fn shrinking_capacity_evicts_oldest() {
        let mut list = List::default();
        let mut history = History::new(5);
        for value in 1..=4 {
            history.add(Append(value), &mut list).unwrap();
        }
        history.undo(&mut list).unwrap();
        history.set_max(2);
        // 1 and 2 are gone, 3 is applied and 4 is still redoable.
        let retained: Vec<_> = history.iter().map(|(c, applied)| (c.0, applied)).collect();
        assert_eq!(retained, [(3, true), (4, false)]);
    }
}

use vfxedit_core::commands::{history::History, CommandConsumer, CommandError, DoUndo};

/// Appends its value to the list. Undo pops it back off.
#[derive(Debug)]
struct Append(i32);

#[derive(Default)]
struct List(Vec<i32>);
impl CommandConsumer<Append> for List {
    fn apply(&mut self, command: DoUndo<'_, Append>) -> Result<(), CommandError> {
        match command {
            DoUndo::Do(Append(value)) => {
                self.0.push(*value);
                Ok(())
            }
            DoUndo::Undo(Append(value)) => {
                if self.0.last() != Some(value) {
                    return Err(CommandError::MismatchedState);
                }
                self.0.pop();
                Ok(())
            }
        }
    }
}

#[test]
fn eviction_bakes_in_oldest() {
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
    // C1 fell off the front, nothing can take it back.
    assert!(!history.undo(&mut list).unwrap());
    assert_eq!(list.0, [1]);
    assert_eq!(history.cursor(), None);

    for _ in 0..3 {
        assert!(history.redo(&mut list).unwrap());
    }
    assert_eq!(list.0, [1, 2, 3, 4]);
    assert!(!history.can_redo());
    assert!(!history.redo(&mut list).unwrap());
}

#[test]
fn add_prunes_redo_branch() {
    let mut list = List::default();
    let mut history = History::new(10);
    for value in 1..=3 {
        history.add(Append(value), &mut list).unwrap();
    }
    history.undo(&mut list).unwrap();
    history.undo(&mut list).unwrap();
    assert!(history.can_redo());
    assert_eq!(history.cursor(), Some(0));

    history.add(Append(5), &mut list).unwrap();
    assert_eq!(list.0, [1, 5]);
    assert!(!history.can_redo());
    assert_eq!(history.len(), 2);
    assert_eq!(history.cursor(), Some(1));
}

#[test]
fn failed_command_is_not_recorded() {
    let mut list = List(vec![7]);
    let mut history = History::new(3);
    history.add(Append(1), &mut list).unwrap();
    // Someone else changed the list behind the history's back.
    list.0.push(9);
    assert!(matches!(
        history.undo(&mut list),
        Err(CommandError::MismatchedState)
    ));
    // Still applied, so it can be tried again once the state matches.
    assert!(history.can_undo());
    list.0.pop();
    assert!(history.undo(&mut list).unwrap());
    assert_eq!(list.0, [7]);
}

#[test]
fn dispose_forgets_everything() {
    let mut list = List::default();
    let mut history = History::new(3);
    history.add(Append(1), &mut list).unwrap();
    history.add(Append(2), &mut list).unwrap();
    history.undo(&mut list).unwrap();
    history.dispose();
    assert!(!history.can_undo());
    assert!(!history.can_redo());
    assert_eq!(history.cursor(), None);
    assert!(history.is_empty());
    assert_eq!(list.0, [1]);
}

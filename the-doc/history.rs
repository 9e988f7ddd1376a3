//! Undo and redo on top of an [`Editor`].
//!
//! [`HistoryEditor`] records every operation applied through it, including
//! the repairs normalization makes, into undo batches. Consecutive typing
//! (or consecutive backspacing) lands in one batch, so one undo reverts a
//! whole run. Selection changes are never recorded.

use std::{
  cell::Cell,
  rc::Rc,
};

use thiserror::Error;
use tracing::trace;

use crate::{
  editor::{
    Change,
    Editor,
    EditorError,
    SuspendGuard,
  },
  operation::Operation,
  range::Range,
};

pub type Result<T> = std::result::Result<T, HistoryError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
  #[error(transparent)]
  Editor(#[from] EditorError),
}

/// One undo step.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
  pub operations:       Vec<Operation>,
  /// The selection to restore once the batch is undone.
  pub selection_before: Option<Range>,
}

/// Sets a cell for as long as it lives, then puts the previous value back.
struct Restore<T: Copy> {
  cell:     Rc<Cell<T>>,
  previous: T,
}

impl<T: Copy> Restore<T> {
  fn set(cell: &Rc<Cell<T>>, value: T) -> Self {
    Self {
      cell:     Rc::clone(cell),
      previous: cell.replace(value),
    }
  }
}

impl<T: Copy> Drop for Restore<T> {
  fn drop(&mut self) {
    self.cell.set(self.previous);
  }
}

#[derive(Debug)]
pub struct HistoryEditor {
  editor:     Editor,
  undos:      Vec<Batch>,
  redos:      Vec<Batch>,
  // Raised while recording is off.
  not_saving: Rc<Cell<usize>>,
  merging:    Rc<Cell<Option<bool>>>,
  split_once: bool,
  limit:      usize,
}

impl HistoryEditor {
  pub fn new(editor: Editor) -> Self {
    let limit = editor.config().history.limit;
    Self {
      editor,
      undos: Vec::new(),
      redos: Vec::new(),
      not_saving: Rc::new(Cell::new(0)),
      merging: Rc::new(Cell::new(None)),
      split_once: false,
      limit,
    }
  }

  pub fn editor(&self) -> &Editor {
    &self.editor
  }

  /// Changes made directly on the inner editor are not recorded.
  pub fn editor_mut(&mut self) -> &mut Editor {
    &mut self.editor
  }

  pub fn into_inner(self) -> Editor {
    self.editor
  }

  pub fn undos(&self) -> &[Batch] {
    &self.undos
  }

  pub fn redos(&self) -> &[Batch] {
    &self.redos
  }

  pub fn can_undo(&self) -> bool {
    !self.undos.is_empty()
  }

  pub fn can_redo(&self) -> bool {
    !self.redos.is_empty()
  }

  pub fn is_saving(&self) -> bool {
    self.not_saving.get() == 0
  }

  pub fn clear(&mut self) {
    self.undos.clear();
    self.redos.clear();
  }

  pub fn flush(&mut self) -> Option<Change> {
    self.editor.flush()
  }

  pub fn apply(&mut self, op: Operation) -> Result<()> {
    self.edit(|editor| editor.apply(op))
  }

  /// Run `f` on the editor and record what it applied. `f` must not flush
  /// the editor.
  ///
  /// Operations applied before `f` fails are recorded too, since they stay
  /// in the document.
  pub fn edit<R>(&mut self, f: impl FnOnce(&mut Editor) -> crate::editor::Result<R>) -> Result<R> {
    let start = self.editor.operations().len();
    let selection_before = self.editor.value().selection().cloned();
    let result = f(&mut self.editor);
    self.record(start, selection_before);
    Ok(result?)
  }

  fn record(&mut self, start: usize, selection_before: Option<Range>) {
    if !self.is_saving() {
      return;
    }
    let Some(applied) = self.editor.operations().get(start..) else {
      return;
    };

    for (index, op) in (start..).zip(applied) {
      if !should_save(op) {
        continue;
      }
      let mut merge = match (self.merging.get(), self.undos.last()) {
        (Some(merging), _) => merging,
        (None, None) => false,
        // Applied in the same flush batch as an earlier operation.
        (None, Some(_)) if index > 0 => true,
        (None, Some(batch)) => should_merge(op, batch.operations.last()),
      };
      if self.split_once {
        merge = false;
        self.split_once = false;
      }

      match self.undos.last_mut() {
        Some(batch) if merge => batch.operations.push(op.clone()),
        _ => {
          self.undos.push(Batch {
            operations:       vec![op.clone()],
            selection_before: selection_before.clone(),
          });
          trace!(undos = self.undos.len(), "new undo batch");
        },
      }
      self.redos.clear();
    }

    if self.undos.len() > self.limit {
      let excess = self.undos.len() - self.limit;
      self.undos.drain(..excess);
    }
  }

  /// Revert the last batch. Returns whether there was one.
  pub fn undo(&mut self) -> Result<bool> {
    let Some(batch) = self.undos.pop() else {
      return Ok(false);
    };
    let _not_saving = SuspendGuard::new(&self.not_saving);
    self.editor.without_normalizing(|editor| {
      editor.apply_all(batch.operations.iter().rev().map(Operation::inverse))?;
      match batch.selection_before.clone() {
        Some(selection) => editor.select(selection),
        None => editor.deselect(),
      }
    })?;
    self.redos.push(batch);
    Ok(true)
  }

  /// Re-apply the last undone batch. Returns whether there was one.
  pub fn redo(&mut self) -> Result<bool> {
    let Some(batch) = self.redos.pop() else {
      return Ok(false);
    };
    let _not_saving = SuspendGuard::new(&self.not_saving);
    self.editor.without_normalizing(|editor| {
      if let Some(selection) = batch.selection_before.clone() {
        editor.select(selection)?;
      }
      editor.apply_all(batch.operations.iter().cloned())
    })?;
    self.undos.push(batch);
    Ok(true)
  }

  /// Run `f` with every recorded operation merged into the previous batch.
  pub fn with_merging<R>(&mut self, f: impl FnOnce(&mut HistoryEditor) -> Result<R>) -> Result<R> {
    let _merging = Restore::set(&self.merging, Some(true));
    f(self)
  }

  /// Run `f` with every recorded operation starting a new batch.
  pub fn without_merging<R>(&mut self, f: impl FnOnce(&mut HistoryEditor) -> Result<R>) -> Result<R> {
    let _merging = Restore::set(&self.merging, Some(false));
    f(self)
  }

  /// Run `f` without recording anything.
  pub fn without_saving<R>(&mut self, f: impl FnOnce(&mut HistoryEditor) -> Result<R>) -> Result<R> {
    let _not_saving = SuspendGuard::new(&self.not_saving);
    f(self)
  }

  /// Start a new batch with the next recorded operation, whatever the merge
  /// policy says.
  pub fn split_once(&mut self) {
    self.split_once = true;
  }
}

/// Selection changes are not undoable on their own.
pub fn should_save(op: &Operation) -> bool {
  !matches!(op, Operation::SetSelection { .. })
}

/// Whether `op` continues the run `prev` ended: typing right after the
/// previous insert, or deleting right before the previous removal.
pub fn should_merge(op: &Operation, prev: Option<&Operation>) -> bool {
  match (op, prev) {
    (
      Operation::InsertText { path, offset, .. },
      Some(Operation::InsertText {
        path: prev_path,
        offset: prev_offset,
        text: prev_text,
      }),
    ) => path == prev_path && *offset == prev_offset + prev_text.chars().count(),
    (
      Operation::RemoveText { path, offset, text },
      Some(Operation::RemoveText {
        path: prev_path,
        offset: prev_offset,
        ..
      }),
    ) => path == prev_path && offset + text.chars().count() == *prev_offset,
    _ => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    node::Node,
    path::Path,
    point::Point,
    value::Value,
  };

  fn history(text: &str) -> HistoryEditor {
    let value = Value::new(vec![Node::element(vec![Node::text(text)])])
      .with_selection(Range::collapsed(Point::new([0, 0], 0)));
    HistoryEditor::new(Editor::new(value))
  }

  fn text(history: &HistoryEditor) -> String {
    history.editor().value().document().string()
  }

  fn insert(offset: usize, text: &str) -> Operation {
    Operation::InsertText {
      path: Path::from([0, 0]),
      offset,
      text: text.into(),
    }
  }

  fn remove(offset: usize, text: &str) -> Operation {
    Operation::RemoveText {
      path: Path::from([0, 0]),
      offset,
      text: text.into(),
    }
  }

  #[test]
  fn merge_policy() {
    assert!(should_merge(&insert(2, "c"), Some(&insert(0, "ab"))));
    assert!(!should_merge(&insert(3, "c"), Some(&insert(0, "ab"))));
    assert!(should_merge(&remove(1, "b"), Some(&remove(2, "c"))));
    assert!(!should_merge(&remove(2, "c"), Some(&remove(1, "b"))));
    assert!(!should_merge(&insert(0, "a"), None));
    assert!(!should_save(&Operation::SetSelection {
      properties:     None,
      new_properties: None,
    }));
  }

  #[test]
  fn contiguous_typing_is_one_batch() {
    let mut history = history("");
    history.apply(insert(0, "a")).unwrap();
    history.flush();
    history.apply(insert(1, "b")).unwrap();
    history.flush();
    assert_eq!(history.undos().len(), 1);
    assert_eq!(history.undos()[0].operations, vec![insert(0, "a"), insert(1, "b")]);

    // A jump breaks the run.
    history.apply(insert(0, "x")).unwrap();
    assert_eq!(history.undos().len(), 2);
  }

  #[test]
  fn same_flush_batch_merges() {
    let mut history = history("");
    history.apply(insert(0, "a")).unwrap();
    history.apply(insert(0, "b")).unwrap();
    assert_eq!(history.undos().len(), 1);
  }

  #[test]
  fn undo_and_redo_restore_text_and_selection() {
    let mut history = history("");
    history
      .edit(|editor| editor.insert_text("hello"))
      .unwrap();
    history.flush();
    assert_eq!(text(&history), "hello");

    assert!(history.undo().unwrap());
    assert_eq!(text(&history), "");
    assert_eq!(
      history.editor().value().selection(),
      Some(&Range::collapsed(Point::new([0, 0], 0)))
    );
    assert!(!history.can_undo());
    assert!(history.can_redo());

    assert!(history.redo().unwrap());
    assert_eq!(text(&history), "hello");
    assert!(!history.redo().unwrap());

    // Recording something new drops the redos.
    history.undo().unwrap();
    history.flush();
    history.apply(insert(0, "x")).unwrap();
    assert!(!history.can_redo());
  }

  #[test]
  fn scopes() {
    let mut history = history("");
    history
      .without_saving(|history| history.apply(insert(0, "a")))
      .unwrap();
    assert!(history.undos().is_empty());
    assert!(history.is_saving());

    history.flush();
    history.apply(insert(1, "b")).unwrap();
    history.flush();
    history
      .without_merging(|history| history.apply(insert(2, "c")))
      .unwrap();
    assert_eq!(history.undos().len(), 2);

    history.flush();
    history
      .with_merging(|history| history.apply(insert(0, "z")))
      .unwrap();
    assert_eq!(history.undos().len(), 2);

    history.split_once();
    history.apply(insert(0, "y")).unwrap();
    assert_eq!(history.undos().len(), 3);
  }

  #[test]
  fn limit_drops_the_oldest_batches() {
    let mut history = history("");
    history.limit = 2;
    for _ in 0..4 {
      history.flush();
      history.apply(insert(0, "a")).unwrap();
    }
    assert_eq!(history.undos().len(), 2);
  }
}

//! The editor: a [`Value`] plus everything needed to change it safely.
//!
//! Every change goes through [`Editor::apply`], which
//!
//! 1. applies the operation to the value (copy-on-write, so snapshots handed
//!    out earlier never change),
//! 2. carries every live ref across it,
//! 3. re-maps the pending dirty paths and adds the ones the operation dirtied,
//! 4. records the operation in the current batch,
//! 5. normalizes, unless normalization is suspended.
//!
//! The batch is delivered to the change observer by [`Editor::flush`], which
//! the host calls once its synchronous work is done. Any number of applies
//! before a flush coalesce into one [`Change`].

use std::{
  cell::Cell,
  fmt,
  rc::Rc,
  sync::Arc,
};

use indexmap::IndexSet;
use thiserror::Error;
use tracing::{
  debug,
  trace,
};

use crate::{
  config::Config,
  node::NodeError,
  normalize::{
    NormalizeError,
    NormalizeOptions,
  },
  operation::{
    Operation,
    OperationError,
  },
  path::{
    Affinity,
    Path,
    PathError,
    operation_can_transform_path,
  },
  point::Point,
  range::{
    Range,
    RangeAffinity,
  },
  refs::{
    PathRef,
    PointRef,
    RangeRef,
    Refs,
  },
  schema::Schema,
  value::Value,
};

pub type Result<T> = std::result::Result<T, EditorError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EditorError {
  #[error(transparent)]
  Operation(#[from] OperationError),
  #[error(transparent)]
  Normalize(#[from] NormalizeError),
  #[error(transparent)]
  Node(#[from] NodeError),
  #[error(transparent)]
  Path(#[from] PathError),
  #[error("the editor has no selection")]
  NoSelection,
}

/// One flushed batch: the operations applied since the previous flush and
/// the value they produced.
#[derive(Debug, Clone)]
pub struct Change {
  pub operations: Vec<Operation>,
  pub value:      Arc<Value>,
}

/// Keeps a suspension counter raised for as long as it lives.
///
/// The counter is restored on drop, so a scope that returns early, fails or
/// panics never leaves the counter raised.
#[must_use]
pub struct SuspendGuard {
  counter: Rc<Cell<usize>>,
}

impl SuspendGuard {
  pub fn new(counter: &Rc<Cell<usize>>) -> Self {
    counter.set(counter.get() + 1);
    Self {
      counter: Rc::clone(counter),
    }
  }
}

impl Drop for SuspendGuard {
  fn drop(&mut self) {
    self.counter.set(self.counter.get().saturating_sub(1));
  }
}

pub struct Editor {
  value:         Arc<Value>,
  operations:    Vec<Operation>,
  dirty:         IndexSet<Path>,
  refs:          Refs,
  schema:        Schema,
  config:        Config,
  suspended:     Rc<Cell<usize>>,
  flush_pending: bool,
  on_change:     Option<Box<dyn FnMut(&Change)>>,
}

impl fmt::Debug for Editor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Editor")
      .field("value", &self.value)
      .field("operations", &self.operations)
      .field("dirty", &self.dirty)
      .field("refs", &self.refs)
      .field("schema", &self.schema)
      .field("config", &self.config)
      .field("suspended", &self.suspended.get())
      .field("flush_pending", &self.flush_pending)
      .finish_non_exhaustive()
  }
}

impl Default for Editor {
  fn default() -> Self {
    Self::new(Value::default())
  }
}

impl Editor {
  pub fn new(value: Value) -> Self {
    Self::with_config(value, Config::default())
  }

  /// The value is taken as is; call [`Editor::normalize`] with `force` to
  /// repair a value of unknown quality.
  pub fn with_config(value: Value, config: Config) -> Self {
    Self {
      value: Arc::new(value),
      operations: Vec::new(),
      dirty: IndexSet::new(),
      refs: Refs::default(),
      schema: Schema::from_config(&config.schema),
      config,
      suspended: Rc::new(Cell::new(0)),
      flush_pending: false,
      on_change: None,
    }
  }

  pub fn value(&self) -> &Value {
    &self.value
  }

  /// A handle to the current value that later edits will not affect.
  pub fn snapshot(&self) -> Arc<Value> {
    Arc::clone(&self.value)
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn schema(&self) -> &Schema {
    &self.schema
  }

  pub fn schema_mut(&mut self) -> &mut Schema {
    &mut self.schema
  }

  /// Operations applied since the last flush.
  pub fn operations(&self) -> &[Operation] {
    &self.operations
  }

  pub fn dirty_paths(&self) -> impl Iterator<Item = &Path> {
    self.dirty.iter()
  }

  pub fn is_normalizing_suspended(&self) -> bool {
    self.suspended.get() > 0
  }

  /// Register the observer that [`Editor::flush`] delivers batches to.
  pub fn on_change(&mut self, observer: impl FnMut(&Change) + 'static) {
    self.on_change = Some(Box::new(observer));
  }

  pub fn apply(&mut self, op: Operation) -> Result<()> {
    trace!(op = op.kind(), path = ?op.path(), "apply");

    Arc::make_mut(&mut self.value).apply_operation(&op)?;
    self.refs.transform(&op);
    self.update_dirty_paths(&op);
    self.operations.push(op);
    self.flush_pending = true;

    self.normalize(NormalizeOptions::default())
  }

  pub fn apply_all(&mut self, ops: impl IntoIterator<Item = Operation>) -> Result<()> {
    ops.into_iter().try_for_each(|op| self.apply(op))
  }

  fn update_dirty_paths(&mut self, op: &Operation) {
    let mut dirty = IndexSet::with_capacity(self.dirty.len());
    if operation_can_transform_path(op) {
      dirty.extend(
        self
          .dirty
          .drain(..)
          .filter_map(|path| path.transform(op, Some(Affinity::Forward))),
      );
    } else {
      dirty.extend(self.dirty.drain(..));
    }
    dirty.extend(op.dirty_paths());
    self.dirty = dirty;
  }

  /// Run `f` with normalization suspended, then normalize once.
  ///
  /// The suspension is lifted however `f` exits. If `f` fails, its error is
  /// returned and the pending dirty paths are left for the next pass.
  pub fn without_normalizing<R>(&mut self, f: impl FnOnce(&mut Editor) -> Result<R>) -> Result<R> {
    let result = {
      let _guard = SuspendGuard::new(&self.suspended);
      f(self)
    };
    let value = result?;
    self.normalize(NormalizeOptions::default())?;
    Ok(value)
  }

  pub(crate) fn suspend_normalizing(&self) -> SuspendGuard {
    SuspendGuard::new(&self.suspended)
  }

  pub(crate) fn mark_dirty(&mut self, paths: impl IntoIterator<Item = Path>) {
    self.dirty.extend(paths);
  }

  /// The most recently dirtied path.
  pub(crate) fn pop_dirty(&mut self) -> Option<Path> {
    self.dirty.pop()
  }

  pub(crate) fn dirty_len(&self) -> usize {
    self.dirty.len()
  }

  /// Deliver the pending batch to the observer, if there is one, and start a
  /// new batch. Returns the delivered change, or `None` if nothing was
  /// applied since the last flush.
  pub fn flush(&mut self) -> Option<Change> {
    if !self.flush_pending {
      return None;
    }
    self.flush_pending = false;

    let change = Change {
      operations: std::mem::take(&mut self.operations),
      value:      self.snapshot(),
    };
    debug!(operations = change.operations.len(), "flush");
    if let Some(observer) = self.on_change.as_mut() {
      observer(&change);
    }
    Some(change)
  }

  /// Swap in a whole new value and normalize all of it. Live refs are
  /// dropped since they point into the old tree.
  pub fn replace_value(&mut self, value: Value) -> Result<()> {
    self.value = Arc::new(value);
    self.dirty.clear();
    self.refs = Refs::default();
    self.normalize(NormalizeOptions { force: true })
  }

  // Refs.
  //

  pub fn path_ref(&mut self, path: Path, affinity: Option<Affinity>) -> PathRef {
    self.refs.insert_path(path, affinity)
  }

  pub fn point_ref(&mut self, point: Point, affinity: Option<Affinity>) -> PointRef {
    self.refs.insert_point(point, affinity)
  }

  pub fn range_ref(&mut self, range: Range, affinity: Option<RangeAffinity>) -> RangeRef {
    self.refs.insert_range(range, affinity)
  }

  /// Where the ref points now, or `None` once its location was removed.
  pub fn current_path(&self, key: PathRef) -> Option<&Path> {
    self.refs.path(key)
  }

  pub fn current_point(&self, key: PointRef) -> Option<&Point> {
    self.refs.point(key)
  }

  pub fn current_range(&self, key: RangeRef) -> Option<&Range> {
    self.refs.range(key)
  }

  pub fn unref_path(&mut self, key: PathRef) -> Option<Path> {
    self.refs.remove_path(key)
  }

  pub fn unref_point(&mut self, key: PointRef) -> Option<Point> {
    self.refs.remove_point(key)
  }

  pub fn unref_range(&mut self, key: RangeRef) -> Option<Range> {
    self.refs.remove_range(key)
  }
}

//! Index-chain addressing of nodes in the document tree.
//!
//! A [`Path`] is the list of child indices leading from the root to a node.
//! The empty path is the root itself:
//!
//! ```text
//! root            []
//! ├─ paragraph    [0]
//! │  ├─ "Hello "  [0, 0]
//! │  └─ "world"   [0, 1]
//! └─ paragraph    [1]
//!    └─ ""        [1, 0]
//! ```
//!
//! Paths are plain values. They go stale after structural edits and must be
//! re-derived, or carried forward with [`Path::transform`] (which is what
//! [`crate::refs`] does for every applied operation).
//!
//! # Ordering
//!
//! [`Path::compare`] orders paths in document order but treats a path and its
//! ancestors as equal: `[0]` compares `Equal` to `[0, 3, 1]`. This is not the
//! same as `==`, and is why `Path` does not implement `Ord`.

use std::{
  cmp::Ordering,
  fmt,
};

use serde::{
  Deserialize,
  Serialize,
};
use smallvec::SmallVec;
use thiserror::Error;

use crate::operation::Operation;

pub type Result<T> = std::result::Result<T, PathError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum PathError {
  #[error("cannot get the parent of the root path")]
  RootParent,
  #[error("cannot get the next sibling of the root path")]
  RootNext,
  #[error("cannot get the previous sibling of path {path} because it has none")]
  NoPrevious { path: Path },
  #[error("path {path} is not a descendant of {ancestor}")]
  NotDescendant { path: Path, ancestor: Path },
}

/// How a location resolves ties when an edit lands exactly on it.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Affinity {
  /// Follow content inserted at this location.
  #[default]
  Forward,
  /// Stay before content inserted at this location.
  Backward,
}

#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(SmallVec<[usize; 8]>);

impl Path {
  pub fn root() -> Self {
    Self(SmallVec::new())
  }

  pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
    Self(indices.into_iter().collect())
  }

  #[inline]
  pub fn as_slice(&self) -> &[usize] {
    &self.0
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  #[inline]
  pub fn is_root(&self) -> bool {
    self.0.is_empty()
  }

  /// Index of the addressed node within its parent.
  #[inline]
  pub fn last(&self) -> Option<usize> {
    self.0.last().copied()
  }

  pub fn child(&self, index: usize) -> Self {
    let mut path = self.clone();
    path.0.push(index);
    path
  }

  /// `self` followed by the indices of `relative`.
  pub fn join(&self, relative: &Path) -> Self {
    let mut path = self.clone();
    path.0.extend_from_slice(&relative.0);
    path
  }

  fn prefix(&self, len: usize) -> &[usize] {
    &self.0[..len.min(self.0.len())]
  }

  /// The first `len` indices, i.e. the ancestor at depth `len`.
  pub fn truncated(&self, len: usize) -> Path {
    Path::new(self.prefix(len).iter().copied())
  }

  /// Shift the index at `depth` by `delta`, saturating at zero.
  fn shift(&mut self, depth: usize, delta: isize) {
    if let Some(index) = self.0.get_mut(depth) {
      *index = index.saturating_add_signed(delta);
    }
  }

  // Comparison and ancestry.
  //

  /// Document-order comparison where a path equals all of its ancestors.
  pub fn compare(&self, other: &Path) -> Ordering {
    self
      .0
      .iter()
      .zip(other.0.iter())
      .map(|(a, b)| a.cmp(b))
      .find(|ordering| ordering.is_ne())
      .unwrap_or(Ordering::Equal)
  }

  pub fn is_before(&self, other: &Path) -> bool {
    self.compare(other) == Ordering::Less
  }

  pub fn is_after(&self, other: &Path) -> bool {
    self.compare(other) == Ordering::Greater
  }

  /// Whether `self` is a proper prefix of `other`.
  pub fn is_ancestor(&self, other: &Path) -> bool {
    self.len() < other.len() && self.compare(other) == Ordering::Equal
  }

  pub fn is_descendant(&self, other: &Path) -> bool {
    other.is_ancestor(self)
  }

  pub fn is_parent(&self, other: &Path) -> bool {
    self.len() + 1 == other.len() && self.compare(other) == Ordering::Equal
  }

  pub fn is_child(&self, other: &Path) -> bool {
    other.is_parent(self)
  }

  /// Equal to, or an ancestor of, `other`.
  pub fn is_common(&self, other: &Path) -> bool {
    self.len() <= other.len() && self.compare(other) == Ordering::Equal
  }

  pub fn is_sibling(&self, other: &Path) -> bool {
    if self.is_empty() || self.len() != other.len() {
      return false;
    }
    let depth = self.len() - 1;
    self.0[..depth] == other.0[..depth] && self.0[depth] != other.0[depth]
  }

  /// Whether `self` ends at an index before `other`'s index at the same
  /// depth, under the same parent.
  pub fn ends_before(&self, other: &Path) -> bool {
    self.ends_cmp(other) == Some(Ordering::Less)
  }

  pub fn ends_after(&self, other: &Path) -> bool {
    self.ends_cmp(other) == Some(Ordering::Greater)
  }

  pub fn ends_at(&self, other: &Path) -> bool {
    self.ends_cmp(other) == Some(Ordering::Equal)
  }

  fn ends_cmp(&self, other: &Path) -> Option<Ordering> {
    let depth = self.len().checked_sub(1)?;
    if other.len() <= depth || self.0[..depth] != other.0[..depth] {
      return None;
    }
    Some(self.0[depth].cmp(&other.0[depth]))
  }

  pub fn has_previous(&self) -> bool {
    self.last().is_some_and(|index| index > 0)
  }

  /// Longest shared prefix of two paths.
  pub fn common(&self, other: &Path) -> Path {
    Path::new(
      self
        .0
        .iter()
        .zip(other.0.iter())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| *a),
    )
  }

  // Navigation.
  //

  pub fn parent(&self) -> Result<Path> {
    if self.is_empty() {
      return Err(PathError::RootParent);
    }
    Ok(Path::new(self.prefix(self.len() - 1).iter().copied()))
  }

  pub fn next(&self) -> Result<Path> {
    let Some(last) = self.last() else {
      return Err(PathError::RootNext);
    };
    let mut path = self.clone();
    path.0[self.len() - 1] = last + 1;
    Ok(path)
  }

  pub fn previous(&self) -> Result<Path> {
    match self.last() {
      Some(last) if last > 0 => {
        let mut path = self.clone();
        path.0[self.len() - 1] = last - 1;
        Ok(path)
      },
      _ => {
        Err(PathError::NoPrevious {
          path: self.clone(),
        })
      },
    }
  }

  /// `self` expressed relative to `ancestor`.
  pub fn relative(&self, ancestor: &Path) -> Result<Path> {
    if !ancestor.is_common(self) {
      return Err(PathError::NotDescendant {
        path:     self.clone(),
        ancestor: ancestor.clone(),
      });
    }
    Ok(Path::new(self.0[ancestor.len()..].iter().copied()))
  }

  /// All proper prefixes, deepest first. Reverse the iterator for
  /// shallowest first.
  pub fn ancestors(&self) -> impl DoubleEndedIterator<Item = Path> + '_ {
    (0..self.len())
      .rev()
      .map(|len| Path::new(self.0[..len].iter().copied()))
  }

  /// Every prefix including `self`, shallowest (the root) first.
  pub fn levels(&self) -> impl DoubleEndedIterator<Item = Path> + '_ {
    (0..=self.len()).map(|len| Path::new(self.0[..len].iter().copied()))
  }

  // Transformation.
  //

  /// Carry a path that existed before `op` over to the equivalent path after
  /// it, or `None` if the node at `self` no longer exists.
  ///
  /// `affinity` only matters when `op` splits the node at `self`: `Forward`
  /// follows the new right-hand sibling, `Backward` stays on the left one,
  /// and `None` gives up.
  pub fn transform(&self, op: &Operation, affinity: Option<Affinity>) -> Option<Path> {
    if self.is_empty() {
      return Some(self.clone());
    }

    // Structural edits at the root are never applied.
    match op {
      Operation::RemoveNode { path, .. } if path.is_root() => return None,
      Operation::InsertNode { path, .. }
      | Operation::SplitNode { path, .. }
      | Operation::MergeNode { path, .. }
        if path.is_root() =>
      {
        return Some(self.clone());
      },
      Operation::MoveNode { path, new_path } if path.is_root() || new_path.is_root() => {
        return Some(self.clone());
      },
      _ => {},
    }

    let mut p = self.clone();

    match op {
      Operation::InsertNode { path: op, .. } => {
        if *op == p || op.ends_before(&p) || op.is_ancestor(&p) {
          p.shift(op.len() - 1, 1);
        }
      },
      Operation::RemoveNode { path: op, .. } => {
        if *op == p || op.is_ancestor(&p) {
          return None;
        }
        if op.ends_before(&p) {
          p.shift(op.len() - 1, -1);
        }
      },
      Operation::MergeNode {
        path: op, position, ..
      } => {
        if *op == p || op.ends_before(&p) {
          p.shift(op.len() - 1, -1);
        } else if op.is_ancestor(&p) {
          p.shift(op.len() - 1, -1);
          p.shift(op.len(), *position as isize);
        }
      },
      Operation::SplitNode {
        path: op, position, ..
      } => {
        if *op == p {
          match affinity {
            Some(Affinity::Forward) => p.shift(p.len() - 1, 1),
            Some(Affinity::Backward) => {},
            None => return None,
          }
        } else if op.ends_before(&p) {
          p.shift(op.len() - 1, 1);
        } else if op.is_ancestor(&p) && self.0[op.len()] >= *position {
          p.shift(op.len() - 1, 1);
          p.shift(op.len(), -(*position as isize));
        }
      },
      Operation::MoveNode {
        path: op,
        new_path: onp,
      } => {
        if op == onp {
          return Some(p);
        }
        // Moving a node inside itself has no meaning.
        if op.is_ancestor(onp) {
          return None;
        }

        if op.is_common(&p) {
          let mut moved = onp.clone();
          if op.ends_before(onp) && op.len() < onp.len() {
            moved.shift(op.len() - 1, -1);
          }
          moved.0.extend_from_slice(&p.0[op.len()..]);
          return Some(moved);
        }

        if op.is_sibling(onp) && onp.is_common(&p) {
          if op.ends_before(&p) {
            p.shift(op.len() - 1, -1);
          } else {
            p.shift(op.len() - 1, 1);
          }
        } else if onp.ends_before(&p) || onp.is_common(&p) {
          if op.ends_before(&p) {
            p.shift(op.len() - 1, -1);
          }
          p.shift(onp.len() - 1, 1);
        } else if op.ends_before(&p) {
          p.shift(op.len() - 1, -1);
        }
      },
      _ => {},
    }

    Some(p)
  }
}

impl fmt::Debug for Path {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self.as_slice(), f)
  }
}

impl fmt::Display for Path {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self.as_slice(), f)
  }
}

impl From<&[usize]> for Path {
  fn from(indices: &[usize]) -> Self {
    Self(SmallVec::from_slice(indices))
  }
}

impl<const N: usize> From<[usize; N]> for Path {
  fn from(indices: [usize; N]) -> Self {
    Self(SmallVec::from_slice(&indices))
  }
}

impl From<Vec<usize>> for Path {
  fn from(indices: Vec<usize>) -> Self {
    Self(SmallVec::from_vec(indices))
  }
}

impl std::ops::Index<usize> for Path {
  type Output = usize;

  fn index(&self, index: usize) -> &usize {
    &self.0[index]
  }
}

/// Whether `op` can change the addresses of existing nodes.
pub fn operation_can_transform_path(op: &Operation) -> bool {
  matches!(
    op,
    Operation::InsertNode { .. }
      | Operation::RemoveNode { .. }
      | Operation::MergeNode { .. }
      | Operation::SplitNode { .. }
      | Operation::MoveNode { .. }
  )
}

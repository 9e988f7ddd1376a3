//! Cursor locations inside text leaves.

use std::cmp::Ordering;

use serde::{
  Deserialize,
  Serialize,
};

use crate::{
  operation::Operation,
  path::{
    Affinity,
    Path,
  },
};

/// A position inside the text leaf at `path`, `offset` chars from its start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
  pub path:   Path,
  pub offset: usize,
}

impl Point {
  pub fn new(path: impl Into<Path>, offset: usize) -> Self {
    Self {
      path: path.into(),
      offset,
    }
  }

  pub fn compare(&self, other: &Point) -> Ordering {
    match self.path.compare(&other.path) {
      Ordering::Equal => self.offset.cmp(&other.offset),
      ordering => ordering,
    }
  }

  pub fn is_before(&self, other: &Point) -> bool {
    self.compare(other) == Ordering::Less
  }

  pub fn is_after(&self, other: &Point) -> bool {
    self.compare(other) == Ordering::Greater
  }

  /// Carry the point across `op`. Returns `None` when the leaf it was in
  /// was removed, or when it sits exactly on a split seam and `affinity` is
  /// `None`.
  pub fn transform(&self, op: &Operation, affinity: Option<Affinity>) -> Option<Point> {
    let mut point = self.clone();

    match op {
      Operation::InsertNode { .. } | Operation::MoveNode { .. } => {
        point.path = self.path.transform(op, affinity)?;
      },
      Operation::InsertText { path, offset, text } => {
        if *path == self.path
          && (*offset < self.offset
            || (*offset == self.offset && affinity == Some(Affinity::Forward)))
        {
          point.offset += text.chars().count();
        }
      },
      Operation::RemoveText { path, offset, text } => {
        if *path == self.path && *offset <= self.offset {
          point.offset -= (self.offset - offset).min(text.chars().count());
        }
      },
      Operation::MergeNode { path, position, .. } => {
        if *path == self.path {
          point.offset += position;
        }
        point.path = self.path.transform(op, affinity)?;
      },
      Operation::RemoveNode { path, .. } => {
        if path.is_common(&self.path) {
          return None;
        }
        point.path = self.path.transform(op, affinity)?;
      },
      Operation::SplitNode { path, position, .. } => {
        if *path == self.path {
          if *position == self.offset && affinity.is_none() {
            return None;
          }
          if *position < self.offset
            || (*position == self.offset && affinity == Some(Affinity::Forward))
          {
            point.offset -= position;
            point.path = self.path.transform(op, Some(Affinity::Forward))?;
          }
        } else {
          point.path = self.path.transform(op, affinity)?;
        }
      },
      _ => {},
    }

    Some(point)
  }
}

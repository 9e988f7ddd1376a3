//! Live locations that follow the document through edits.
//!
//! A ref is registered with a starting location and an affinity, and is
//! carried across every applied operation. When the location stops existing
//! the ref is dropped, and later lookups return `None`.

use slotmap::SlotMap;
use tracing::trace;

use crate::{
  operation::Operation,
  path::{
    Affinity,
    Path,
  },
  point::Point,
  range::{
    Range,
    RangeAffinity,
  },
};

slotmap::new_key_type! {
    pub struct PathRef;
    pub struct PointRef;
    pub struct RangeRef;
}

#[derive(Debug, Clone)]
struct Tracked<T, A> {
  current:  T,
  affinity: Option<A>,
}

/// Every live ref of one editor.
#[derive(Debug, Default)]
pub struct Refs {
  paths:  SlotMap<PathRef, Tracked<Path, Affinity>>,
  points: SlotMap<PointRef, Tracked<Point, Affinity>>,
  ranges: SlotMap<RangeRef, Tracked<Range, RangeAffinity>>,
}

impl Refs {
  pub fn insert_path(&mut self, current: Path, affinity: Option<Affinity>) -> PathRef {
    self.paths.insert(Tracked { current, affinity })
  }

  pub fn insert_point(&mut self, current: Point, affinity: Option<Affinity>) -> PointRef {
    self.points.insert(Tracked { current, affinity })
  }

  pub fn insert_range(&mut self, current: Range, affinity: Option<RangeAffinity>) -> RangeRef {
    self.ranges.insert(Tracked { current, affinity })
  }

  pub fn path(&self, key: PathRef) -> Option<&Path> {
    self.paths.get(key).map(|tracked| &tracked.current)
  }

  pub fn point(&self, key: PointRef) -> Option<&Point> {
    self.points.get(key).map(|tracked| &tracked.current)
  }

  pub fn range(&self, key: RangeRef) -> Option<&Range> {
    self.ranges.get(key).map(|tracked| &tracked.current)
  }

  /// Stop tracking, returning the last location.
  pub fn remove_path(&mut self, key: PathRef) -> Option<Path> {
    self.paths.remove(key).map(|tracked| tracked.current)
  }

  pub fn remove_point(&mut self, key: PointRef) -> Option<Point> {
    self.points.remove(key).map(|tracked| tracked.current)
  }

  pub fn remove_range(&mut self, key: RangeRef) -> Option<Range> {
    self.ranges.remove(key).map(|tracked| tracked.current)
  }

  pub fn len(&self) -> usize {
    self.paths.len() + self.points.len() + self.ranges.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Carry every ref across `op`, dropping the ones whose location is gone.
  pub fn transform(&mut self, op: &Operation) {
    self.paths.retain(|key, tracked| {
      match tracked.current.transform(op, tracked.affinity) {
        Some(path) => {
          tracked.current = path;
          true
        },
        None => {
          trace!(?key, op = op.kind(), "path ref invalidated");
          false
        },
      }
    });
    self.points.retain(|key, tracked| {
      match tracked.current.transform(op, tracked.affinity) {
        Some(point) => {
          tracked.current = point;
          true
        },
        None => {
          trace!(?key, op = op.kind(), "point ref invalidated");
          false
        },
      }
    });
    self.ranges.retain(|key, tracked| {
      match tracked.current.transform(op, tracked.affinity) {
        Some(range) => {
          tracked.current = range;
          true
        },
        None => {
          trace!(?key, op = op.kind(), "range ref invalidated");
          false
        },
      }
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::Node;

  #[test]
  fn refs_follow_edits_and_drop_when_removed() {
    let mut refs = Refs::default();
    let path = refs.insert_path(Path::from([1, 0]), Some(Affinity::Forward));
    let point = refs.insert_point(Point::new([1, 0], 2), Some(Affinity::Forward));
    let range = refs.insert_range(
      Range::collapsed(Point::new([0, 0], 0)),
      Some(RangeAffinity::Inward),
    );

    refs.transform(&Operation::InsertNode {
      path: Path::from([0]),
      node: Node::element(vec![Node::text("")]),
    });
    assert_eq!(refs.path(path), Some(&Path::from([2, 0])));
    assert_eq!(refs.point(point), Some(&Point::new([2, 0], 2)));
    assert_eq!(
      refs.range(range),
      Some(&Range::collapsed(Point::new([1, 0], 0)))
    );

    refs.transform(&Operation::RemoveNode {
      path: Path::from([2]),
      node: Node::element(vec![Node::text("")]),
    });
    assert_eq!(refs.path(path), None);
    assert_eq!(refs.remove_point(point), None);
    assert_eq!(
      refs.remove_range(range),
      Some(Range::collapsed(Point::new([1, 0], 0)))
    );
    assert!(refs.is_empty());
  }
}

//! Intervals between two points.
//!
//! A [`Range`] has an `anchor` (where an interaction started) and a `focus`
//! (where it currently ends). When `anchor == focus` the range is collapsed,
//! which is how a plain cursor is represented:
//!
//! ```text
//! anchor=[0,0]:2, focus=[0,0]:5  "he[llo] world"  (forward)
//! anchor=[0,0]:5, focus=[0,0]:2  "he]llo[ world"  (backward)
//! anchor=focus=[0,0]:5           "hello| world"   (collapsed)
//! ```
//!
//! Ranges serve both as the editor selection and as named annotations.

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
  point::Point,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
  pub anchor: Point,
  pub focus:  Point,
}

/// Partial range, used by `set_selection` and `set_annotation` payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangePatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub anchor: Option<Point>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub focus:  Option<Point>,
}

/// How the two ends of a range resolve ties during a transform.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeAffinity {
  Forward,
  Backward,
  /// Both ends resist growing to include content inserted at their edge.
  #[default]
  Inward,
  /// Both ends grow to include content inserted at their edge.
  Outward,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Edge {
  Anchor,
  Focus,
  Start,
  End,
}

impl Range {
  pub fn new(anchor: Point, focus: Point) -> Self {
    Self { anchor, focus }
  }

  pub fn collapsed(point: Point) -> Self {
    Self {
      anchor: point.clone(),
      focus:  point,
    }
  }

  #[inline]
  pub fn is_collapsed(&self) -> bool {
    self.anchor == self.focus
  }

  #[inline]
  pub fn is_expanded(&self) -> bool {
    !self.is_collapsed()
  }

  /// Whether the focus comes before the anchor.
  pub fn is_backward(&self) -> bool {
    self.anchor.is_after(&self.focus)
  }

  pub fn is_forward(&self) -> bool {
    !self.is_backward()
  }

  /// `(start, end)` in document order.
  pub fn edges(&self) -> (&Point, &Point) {
    if self.is_backward() {
      (&self.focus, &self.anchor)
    } else {
      (&self.anchor, &self.focus)
    }
  }

  pub fn start(&self) -> &Point {
    self.edges().0
  }

  pub fn end(&self) -> &Point {
    self.edges().1
  }

  pub fn edge(&self, edge: Edge) -> &Point {
    match edge {
      Edge::Anchor => &self.anchor,
      Edge::Focus => &self.focus,
      Edge::Start => self.start(),
      Edge::End => self.end(),
    }
  }

  pub fn points(&self) -> [&Point; 2] {
    [&self.anchor, &self.focus]
  }

  pub fn includes_point(&self, point: &Point) -> bool {
    let (start, end) = self.edges();
    point.compare(start) != Ordering::Less && point.compare(end) != Ordering::Greater
  }

  /// Whether the node at `path` overlaps the range.
  pub fn includes_path(&self, path: &Path) -> bool {
    let (start, end) = self.edges();
    path.compare(&start.path) != Ordering::Less && path.compare(&end.path) != Ordering::Greater
  }

  /// Whether `other` lies entirely inside `self`.
  pub fn surrounds(&self, other: &Range) -> bool {
    let (start, end) = other.edges();
    self.includes_point(start) && self.includes_point(end)
  }

  pub fn intersection(&self, other: &Range) -> Option<Range> {
    let (s1, e1) = self.edges();
    let (s2, e2) = other.edges();
    let start = if s1.is_before(s2) { s2 } else { s1 };
    let end = if e1.is_before(e2) { e1 } else { e2 };
    if end.is_before(start) {
      None
    } else {
      Some(Range::new(start.clone(), end.clone()))
    }
  }

  /// Overlay the points present in `patch`.
  pub fn patched(&self, patch: &RangePatch) -> Range {
    Range {
      anchor: patch.anchor.clone().unwrap_or_else(|| self.anchor.clone()),
      focus:  patch.focus.clone().unwrap_or_else(|| self.focus.clone()),
    }
  }

  /// Carry both ends across `op`. `None` if either end no longer exists.
  pub fn transform(&self, op: &Operation, affinity: Option<RangeAffinity>) -> Option<Range> {
    let (anchor_affinity, focus_affinity) = match affinity {
      Some(RangeAffinity::Inward) => {
        if self.is_forward() {
          let anchor = Some(Affinity::Forward);
          (anchor, if self.is_collapsed() { anchor } else { Some(Affinity::Backward) })
        } else {
          let anchor = Some(Affinity::Backward);
          (anchor, if self.is_collapsed() { anchor } else { Some(Affinity::Forward) })
        }
      },
      Some(RangeAffinity::Outward) => {
        if self.is_forward() {
          (Some(Affinity::Backward), Some(Affinity::Forward))
        } else {
          (Some(Affinity::Forward), Some(Affinity::Backward))
        }
      },
      Some(RangeAffinity::Forward) => (Some(Affinity::Forward), Some(Affinity::Forward)),
      Some(RangeAffinity::Backward) => (Some(Affinity::Backward), Some(Affinity::Backward)),
      None => (None, None),
    };

    let anchor = self.anchor.transform(op, anchor_affinity)?;
    let focus = self.focus.transform(op, focus_affinity)?;
    Some(Range { anchor, focus })
  }
}

impl From<Range> for RangePatch {
  fn from(range: Range) -> Self {
    Self {
      anchor: Some(range.anchor),
      focus:  Some(range.focus),
    }
  }
}

impl RangePatch {
  pub fn is_complete(&self) -> bool {
    self.anchor.is_some() && self.focus.is_some()
  }

  pub fn is_empty(&self) -> bool {
    self.anchor.is_none() && self.focus.is_none()
  }

  /// A full range, if both points are present.
  pub fn to_range(&self) -> Option<Range> {
    Some(Range {
      anchor: self.anchor.clone()?,
      focus:  self.focus.clone()?,
    })
  }

  /// The points of `old` that `new` replaces, paired with their new values.
  pub fn diff(old: &Range, new: &Range) -> (RangePatch, RangePatch) {
    let mut before = RangePatch::default();
    let mut after = RangePatch::default();
    if old.anchor != new.anchor {
      before.anchor = Some(old.anchor.clone());
      after.anchor = Some(new.anchor.clone());
    }
    if old.focus != new.focus {
      before.focus = Some(old.focus.clone());
      after.focus = Some(new.focus.clone());
    }
    (before, after)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn range(anchor: (usize, usize), focus: (usize, usize)) -> Range {
    Range::new(
      Point::new([0, anchor.0], anchor.1),
      Point::new([0, focus.0], focus.1),
    )
  }

  #[test]
  fn direction_and_edges() {
    let forward = range((0, 1), (0, 4));
    let backward = range((0, 4), (0, 1));
    assert!(forward.is_forward());
    assert!(backward.is_backward());
    assert_eq!(backward.start(), &Point::new([0, 0], 1));
    assert_eq!(backward.end(), &Point::new([0, 0], 4));
    assert!(range((0, 2), (0, 2)).is_collapsed());
    assert!(forward.is_expanded());
  }

  #[test]
  fn intersection_and_includes() {
    let a = range((0, 0), (1, 3));
    let b = range((1, 1), (2, 0));
    assert_eq!(a.intersection(&b), Some(range((1, 1), (1, 3))));
    assert_eq!(range((0, 0), (0, 1)).intersection(&range((0, 2), (0, 3))), None);
    assert!(a.includes_point(&Point::new([0, 1], 0)));
    assert!(!a.includes_point(&Point::new([0, 2], 0)));
    assert!(a.includes_path(&Path::from([0, 1])));
    assert!(a.surrounds(&range((0, 2), (1, 1))));
  }

  #[test]
  fn inward_ranges_do_not_grow_at_edges() {
    let op = Operation::InsertText {
      path:   Path::from([0, 0]),
      offset: 4,
      text:   "!!".into(),
    };
    let selected = range((0, 1), (0, 4));
    assert_eq!(
      selected.transform(&op, Some(RangeAffinity::Inward)),
      Some(range((0, 1), (0, 4)))
    );
    assert_eq!(
      selected.transform(&op, Some(RangeAffinity::Outward)),
      Some(range((0, 1), (0, 6)))
    );

    // a collapsed range follows the anchor's affinity
    let cursor = range((0, 4), (0, 4));
    assert_eq!(
      cursor.transform(&op, Some(RangeAffinity::Inward)),
      Some(range((0, 6), (0, 6)))
    );
  }

  #[test]
  fn patch_diff_only_carries_changed_points() {
    let old = range((0, 1), (0, 4));
    let new = range((0, 1), (0, 6));
    let (before, after) = RangePatch::diff(&old, &new);
    assert_eq!(before.anchor, None);
    assert_eq!(before.focus, Some(Point::new([0, 0], 4)));
    assert_eq!(old.patched(&after), new);
  }
}

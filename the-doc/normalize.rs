//! The normalization engine.
//!
//! Operations may leave the tree in shapes the rest of the crate does not
//! expect: empty elements, runs of same-formatted texts, blocks mixed with
//! inline content. Every operation marks the paths it may have broken as
//! dirty, and [`Editor::normalize`] drains that set, repairing one node at a
//! time until no rule fires on it. Repairs are ordinary operations, so they
//! dirty further paths, which the same pass then drains.
//!
//! The core rules, in the order they are tried on an element:
//!
//! 1. A non-root element with no children gets an empty text.
//! 2. Adjacent texts with the same marks are merged. Otherwise an empty one
//!    of the pair is removed.
//! 3. In an inline container, an inline element has a text right before it
//!    and, if it is the last child, right after it.
//! 4. Children are either all blocks, or all texts and inline elements,
//!    following the first child. Offenders are removed.
//!
//! Schema [`Rule`](crate::schema::Rule)s run after these. A pass gives up
//! with [`NormalizeError::IterationLimit`] once it has done
//! `iteration-factor` times as many steps as it had dirty paths, which only
//! happens when rules undo each other.
//!
//! Once the tree is stable, the selection and annotations are checked: each
//! point must sit in a text leaf, within its length.

use thiserror::Error;
use tracing::{
  debug,
  trace,
  warn,
};

use crate::{
  editor::{
    Editor,
    Result,
  },
  node::{
    Element,
    Node,
    NodesOptions,
    Text,
  },
  operation::Operation,
  path::{
    Affinity,
    Path,
  },
  point::Point,
  range::{
    Range,
    RangePatch,
  },
  refs::PathRef,
  schema::{
    Repair,
    Schema,
  },
  value::fallback_point,
};

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum NormalizeError {
  #[error(
    "normalization did not settle after {limit} iterations (last at {path}); a rule is probably \
     undoing another one"
  )]
  IterationLimit { limit: usize, path: Path },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
  /// Treat every node as dirty.
  pub force: bool,
}

/// What the range pass does with one range.
enum RangeFix {
  Keep,
  Replace(Range),
  Drop,
}

struct Budget {
  spent: usize,
  limit: usize,
}

impl Budget {
  fn spend(&mut self, path: &Path) -> Result<()> {
    self.spent += 1;
    if self.spent > self.limit {
      warn!(limit = self.limit, %path, "normalization iteration limit exceeded");
      return Err(
        NormalizeError::IterationLimit {
          limit: self.limit,
          path:  path.clone(),
        }
        .into(),
      );
    }
    Ok(())
  }
}

impl Editor {
  /// Drain the dirty paths, repairing every invalid node. A no-op while
  /// normalization is suspended.
  pub fn normalize(&mut self, options: NormalizeOptions) -> Result<()> {
    if self.is_normalizing_suspended() {
      return Ok(());
    }
    if options.force {
      let paths: Vec<Path> = self
        .value()
        .document()
        .nodes(NodesOptions::default())
        .map(|(path, _)| path)
        .collect();
      self.mark_dirty(paths);
    }
    if self.dirty_len() == 0 {
      return Ok(());
    }

    let _guard = self.suspend_normalizing();
    let mut budget = Budget {
      spent: 0,
      limit: self.dirty_len().max(1) * self.config().normalize.iteration_factor,
    };
    let mut repairs = 0;

    while let Some(path) = self.pop_dirty() {
      budget.spend(&path)?;
      if !self.value().document().has(&path) {
        continue;
      }

      let tracked = self.path_ref(path, Some(Affinity::Forward));
      let result = self.normalize_node(tracked, &mut budget, &mut repairs);
      self.unref_path(tracked);
      result?;
    }

    repairs += self.normalize_ranges()?;
    debug!(iterations = budget.spent, repairs, "normalized");
    Ok(())
  }

  /// Repair the node tracked by `tracked` until no rule fires on it or it
  /// stops existing.
  fn normalize_node(
    &mut self,
    tracked: PathRef,
    budget: &mut Budget,
    repairs: &mut usize,
  ) -> Result<()> {
    loop {
      let Some(path) = self.current_path(tracked).cloned() else {
        return Ok(());
      };
      let Some(repair) = self.find_repair(&path) else {
        return Ok(());
      };
      budget.spend(&path)?;
      repair(self)?;
      *repairs += 1;
    }
  }

  fn find_repair(&self, path: &Path) -> Option<Repair> {
    let node = self.value().document().get(path).ok()?;
    if let Node::Element(element) = node {
      if let Some((rule, repair)) = core_repair(self.schema(), element, path) {
        trace!(%path, rule, "repair");
        return Some(repair);
      }
    }
    self.schema().rules().iter().find_map(|rule| {
      let repair = rule.validate(self, node, path)?;
      trace!(%path, rule = rule.name(), "repair");
      Some(repair)
    })
  }

  /// Make the selection and every annotation point at text leaves again.
  /// Returns the number of ranges changed.
  fn normalize_ranges(&mut self) -> Result<usize> {
    let mut fixed = 0;

    if let Some(selection) = self.value().selection().cloned() {
      match self.fix_range(&selection) {
        RangeFix::Keep => {},
        RangeFix::Replace(range) => {
          let (before, after) = RangePatch::diff(&selection, &range);
          self.apply(Operation::SetSelection {
            properties:     Some(before),
            new_properties: Some(after),
          })?;
          fixed += 1;
        },
        RangeFix::Drop => {
          self.apply(Operation::SetSelection {
            properties:     Some(selection.into()),
            new_properties: None,
          })?;
          fixed += 1;
        },
      }
    }

    let annotations: Vec<(String, Range)> = self
      .value()
      .annotations()
      .iter()
      .map(|(key, range)| (key.clone(), range.clone()))
      .collect();
    for (key, annotation) in annotations {
      match self.fix_range(&annotation) {
        RangeFix::Keep => {},
        RangeFix::Replace(range) => {
          let (properties, new_properties) = RangePatch::diff(&annotation, &range);
          self.apply(Operation::SetAnnotation {
            key,
            properties,
            new_properties,
          })?;
          fixed += 1;
        },
        RangeFix::Drop => {
          debug!(key = %key, "annotation has no text left, removing");
          self.apply(Operation::RemoveAnnotation { key, annotation })?;
          fixed += 1;
        },
      }
    }

    Ok(fixed)
  }

  fn fix_range(&self, range: &Range) -> RangeFix {
    let (Some(anchor), Some(focus)) = (self.fix_point(&range.anchor), self.fix_point(&range.focus))
    else {
      return RangeFix::Drop;
    };
    if anchor == range.anchor && focus == range.focus {
      RangeFix::Keep
    } else {
      RangeFix::Replace(Range { anchor, focus })
    }
  }

  fn fix_point(&self, point: &Point) -> Option<Point> {
    let root = self.value().document();
    match root.leaf(&point.path) {
      Ok(text) => {
        Some(Point {
          path:   point.path.clone(),
          offset: point.offset.min(text.len()),
        })
      },
      Err(_) => fallback_point(root, &point.path),
    }
  }
}

fn insert_empty_text(path: Path) -> Repair {
  Box::new(move |editor: &mut Editor| {
    editor.apply(Operation::InsertNode {
      path,
      node: Node::text(""),
    })
  })
}

fn apply_one(op: Operation) -> Repair {
  Box::new(move |editor: &mut Editor| editor.apply(op))
}

/// Whether `element` holds texts and inline elements rather than blocks.
fn should_have_inlines(schema: &Schema, element: &Element, path: &Path) -> bool {
  if path.is_root() {
    return false;
  }
  schema.is_inline(element)
    || element
      .children
      .first()
      .is_none_or(|first| schema.is_inline_or_text(first))
}

/// The first core rule that fires on `element`, with its name.
fn core_repair(schema: &Schema, element: &Element, path: &Path) -> Option<(&'static str, Repair)> {
  let children = &element.children;

  if children.is_empty() && !path.is_root() {
    return Some(("empty-element", insert_empty_text(path.child(0))));
  }

  if let Some(repair) = adjacent_texts(schema, children, path) {
    return Some(("adjacent-texts", repair));
  }

  let inlines = should_have_inlines(schema, element, path);

  if inlines {
    for (index, child) in children.iter().enumerate() {
      let Node::Element(child) = child else {
        continue;
      };
      if !schema.is_inline(child) {
        continue;
      }
      let prev_is_text = index
        .checked_sub(1)
        .is_some_and(|prev| children[prev].is_text());
      if !prev_is_text {
        return Some(("inline-padding", insert_empty_text(path.child(index))));
      }
      if index + 1 == children.len() {
        return Some(("inline-padding", insert_empty_text(path.child(index + 1))));
      }
    }
  }

  let offenders: Vec<(Path, Node)> = children
    .iter()
    .enumerate()
    .filter(|(_, child)| schema.is_inline_or_text(child) != inlines)
    .map(|(index, child)| (path.child(index), child.clone()))
    .collect();
  if !offenders.is_empty() {
    let repair: Repair = Box::new(move |editor: &mut Editor| {
      // Last first, so the earlier paths stay valid.
      editor.apply_all(
        offenders
          .into_iter()
          .rev()
          .map(|(path, node)| Operation::RemoveNode { path, node }),
      )
    });
    return Some(("mixed-children", repair));
  }

  None
}

fn adjacent_texts(schema: &Schema, children: &[Node], path: &Path) -> Option<Repair> {
  let pads_inline = |index: usize| {
    children
      .get(index + 1)
      .and_then(Node::as_element)
      .is_some_and(|next| schema.is_inline(next))
  };
  children.windows(2).enumerate().find_map(|(index, pair)| {
    let (Node::Text(prev), Node::Text(text)) = (&pair[0], &pair[1]) else {
      return None;
    };
    let op = if prev.equals_loose(text) {
      merge_texts(path.child(index + 1), prev, text)
    } else if prev.is_empty() {
      Operation::RemoveNode {
        path: path.child(index),
        node: Node::Text(prev.clone()),
      }
    } else if text.is_empty() && !pads_inline(index + 1) {
      Operation::RemoveNode {
        path: path.child(index + 1),
        node: Node::Text(text.clone()),
      }
    } else {
      return None;
    };
    Some(apply_one(op))
  })
}

fn merge_texts(path: Path, prev: &Text, text: &Text) -> Operation {
  Operation::MergeNode {
    path,
    position: prev.len(),
    properties: text.marks.clone(),
  }
}

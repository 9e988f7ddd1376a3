//! The editor's root state: the document tree, the selection and the named
//! annotations.
//!
//! [`Value::apply_operation`] is the single place where the tree is mutated.
//! It validates the operation's payload against the current tree, performs
//! the edit, then carries the selection and every annotation across it.

use std::{
  cmp::Ordering,
  collections::BTreeMap,
};

use serde::{
  Deserialize,
  Serialize,
};
use tracing::debug;

use crate::{
  Tendril,
  node::{
    Element,
    Node,
    NodeError,
    Properties,
    Text,
  },
  operation::{
    Operation,
    OperationError,
    Result,
  },
  path::{
    Affinity,
    Path,
  },
  point::Point,
  range::Range,
};

/// Keys that `set_node` and `set_mark` may not touch, since they hold the
/// node's content rather than its properties.
const CONTENT_KEYS: [&str; 2] = ["text", "children"];

/// Keys that `set_value` may not touch.
const VALUE_KEYS: [&str; 3] = ["children", "selection", "annotations"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ValueRepr", into = "ValueRepr")]
pub struct Value {
  // Always an element; its properties are the value's top-level data.
  root:        Node,
  selection:   Option<Range>,
  annotations: BTreeMap<String, Range>,
}

#[derive(Serialize, Deserialize)]
struct ValueRepr {
  children:    Vec<Node>,
  #[serde(default)]
  selection:   Option<Range>,
  #[serde(default)]
  annotations: BTreeMap<String, Range>,
  #[serde(flatten)]
  data:        Properties,
}

impl From<ValueRepr> for Value {
  fn from(repr: ValueRepr) -> Self {
    Self {
      root:        Node::Element(Element {
        children:   repr.children,
        properties: repr.data,
      }),
      selection:   repr.selection,
      annotations: repr.annotations,
    }
  }
}

impl From<Value> for ValueRepr {
  fn from(value: Value) -> Self {
    let (children, data) = match value.root {
      Node::Element(element) => (element.children, element.properties),
      Node::Text(_) => (Vec::new(), Properties::new()),
    };
    Self {
      children,
      selection: value.selection,
      annotations: value.annotations,
      data,
    }
  }
}

impl Default for Value {
  fn default() -> Self {
    Self::new(Vec::new())
  }
}

impl Value {
  pub fn new(children: Vec<Node>) -> Self {
    Self {
      root:        Node::element(children),
      selection:   None,
      annotations: BTreeMap::new(),
    }
  }

  pub fn with_selection(mut self, selection: Range) -> Self {
    self.selection = Some(selection);
    self
  }

  pub fn with_annotation(mut self, key: impl Into<String>, annotation: Range) -> Self {
    self.annotations.insert(key.into(), annotation);
    self
  }

  /// The root element. Its path is the empty path.
  #[inline]
  pub fn document(&self) -> &Node {
    &self.root
  }

  pub fn children(&self) -> &[Node] {
    self.root.children()
  }

  /// Top-level properties, patched by `set_value`.
  pub fn data(&self) -> &Properties {
    self.root.properties()
  }

  pub fn selection(&self) -> Option<&Range> {
    self.selection.as_ref()
  }

  pub fn annotations(&self) -> &BTreeMap<String, Range> {
    &self.annotations
  }

  pub fn annotation(&self, key: &str) -> Option<&Range> {
    self.annotations.get(key)
  }

  /// Apply `op` to this value.
  ///
  /// A payload that does not fit the tree is rejected before anything
  /// changes.
  pub fn apply_operation(&mut self, op: &Operation) -> Result<()> {
    match op {
      Operation::InsertNode { path, node } => {
        let (parent, index) = self.parent_mut(path, "insert")?;
        if index > parent.children.len() {
          return Err(OperationError::IndexOutOfBounds {
            parent: path.parent()?,
            index,
          });
        }
        parent.children.insert(index, node.clone());
      },
      Operation::RemoveNode { path, .. } => {
        let (parent, index) = self.parent_mut(path, "remove")?;
        if index >= parent.children.len() {
          return Err(OperationError::IndexOutOfBounds {
            parent: path.parent()?,
            index,
          });
        }
        parent.children.remove(index);
      },
      Operation::MergeNode { path, .. } => {
        path.previous()?;
        let (parent, index) = self.parent_mut(path, "merge")?;
        if index >= parent.children.len() {
          return Err(OperationError::IndexOutOfBounds {
            parent: path.parent()?,
            index,
          });
        }
        if parent.children[index - 1].is_text() != parent.children[index].is_text() {
          return Err(OperationError::MergeMismatch { path: path.clone() });
        }
        let node = parent.children.remove(index);
        match (&mut parent.children[index - 1], node) {
          (Node::Text(prev), Node::Text(text)) => {
            prev.text.push_str(&text.text);
          },
          (Node::Element(prev), Node::Element(element)) => {
            prev.children.extend(element.children);
          },
          _ => unreachable!("merge kinds were checked above"),
        }
      },
      Operation::SplitNode {
        path,
        position,
        properties,
      } => {
        let (parent, index) = self.parent_mut(path, "split")?;
        let node = parent
          .children
          .get_mut(index)
          .ok_or_else(|| NodeError::NotFound { path: path.clone() })?;
        if *position > node.size() {
          return Err(OperationError::PositionOutOfBounds {
            path:     path.clone(),
            position: *position,
          });
        }
        let right = match node {
          Node::Text(text) => {
            let at = text.byte_offset(*position);
            let tail = Tendril::from(&text.text[at..]);
            text.text = Tendril::from(&text.text[..at]);
            Node::Text(Text {
              text:  tail,
              marks: properties.clone(),
            })
          },
          Node::Element(element) => {
            Node::Element(Element {
              children:   element.children.split_off(*position),
              properties: properties.clone(),
            })
          },
        };
        parent.children.insert(index + 1, right);
      },
      Operation::MoveNode { path, new_path } => {
        if path.is_ancestor(new_path) {
          return Err(OperationError::MoveIntoSelf {
            path:     path.clone(),
            new_path: new_path.clone(),
          });
        }
        if new_path.is_root() {
          return Err(OperationError::Root { op: "move to" });
        }
        if path == new_path {
          // Still has to exist.
          self.root.descendant(path)?;
        } else {
          // The destination is expressed before the removal.
          let true_path = path.transform(op, None).ok_or_else(|| {
            OperationError::MoveIntoSelf {
              path:     path.clone(),
              new_path: new_path.clone(),
            }
          })?;
          let (parent, index) = self.parent_mut(path, "move")?;
          if index >= parent.children.len() {
            return Err(OperationError::IndexOutOfBounds {
              parent: path.parent()?,
              index,
            });
          }
          let node = parent.children.remove(index);
          if let Err((err, node)) = self.place(&true_path, node) {
            let (parent, _) = self.parent_mut(path, "move")?;
            parent.children.insert(index, node);
            return Err(err);
          }
        }
      },
      Operation::SetNode {
        path,
        new_properties,
        ..
      } => {
        if path.is_root() {
          return Err(OperationError::Root {
            op: "set properties on",
          });
        }
        check_reserved(new_properties, &CONTENT_KEYS)?;
        patch(self.root.get_mut(path)?.properties_mut(), new_properties);
      },
      Operation::InsertText { path, offset, text } => {
        let leaf = self.root.leaf_mut(path)?;
        if *offset > leaf.len() {
          return Err(OperationError::PositionOutOfBounds {
            path:     path.clone(),
            position: *offset,
          });
        }
        let at = leaf.byte_offset(*offset);
        let mut spliced = Tendril::from(&leaf.text[..at]);
        spliced.push_str(text);
        spliced.push_str(&leaf.text[at..]);
        leaf.text = spliced;
      },
      Operation::RemoveText { path, offset, text } => {
        let leaf = self.root.leaf_mut(path)?;
        let start = leaf.byte_offset(*offset);
        let end = leaf.byte_offset(offset + text.chars().count());
        if *offset > leaf.len() || leaf.text[start..end] != **text {
          return Err(OperationError::TextMismatch {
            path:     path.clone(),
            offset:   *offset,
            expected: text.clone(),
          });
        }
        let mut spliced = Tendril::from(&leaf.text[..start]);
        spliced.push_str(&leaf.text[end..]);
        leaf.text = spliced;
      },
      Operation::AddMark { path, mark } => {
        check_reserved_key(&mark.key, &CONTENT_KEYS)?;
        let leaf = self.root.leaf_mut(path)?;
        if leaf.marks.contains_key(&mark.key) {
          return Err(OperationError::MarkExists {
            path: path.clone(),
            key:  mark.key.clone(),
          });
        }
        leaf.marks.insert(mark.key.clone(), mark.value.clone());
      },
      Operation::RemoveMark { path, mark } => {
        let leaf = self.root.leaf_mut(path)?;
        if leaf.marks.get(&mark.key) != Some(&mark.value) {
          return Err(OperationError::MarkMismatch {
            path: path.clone(),
            key:  mark.key.clone(),
          });
        }
        leaf.marks.remove(&mark.key);
      },
      Operation::SetMark {
        path,
        new_properties,
        ..
      } => {
        check_reserved(new_properties, &CONTENT_KEYS)?;
        patch(&mut self.root.leaf_mut(path)?.marks, new_properties);
      },
      Operation::SetSelection { new_properties, .. } => {
        self.selection = match (new_properties, &self.selection) {
          (None, _) => None,
          (Some(patch), Some(selection)) => Some(selection.patched(patch)),
          (Some(patch), None) => Some(patch.to_range().ok_or(OperationError::IncompleteSelection)?),
        };
      },
      Operation::AddAnnotation { key, annotation } => {
        if self.annotations.contains_key(key) {
          return Err(OperationError::AnnotationExists { key: key.clone() });
        }
        self.annotations.insert(key.clone(), annotation.clone());
      },
      Operation::RemoveAnnotation { key, .. } => {
        if self.annotations.remove(key).is_none() {
          return Err(OperationError::AnnotationMissing { key: key.clone() });
        }
      },
      Operation::SetAnnotation {
        key,
        new_properties,
        ..
      } => {
        let annotation = self
          .annotations
          .get_mut(key)
          .ok_or_else(|| OperationError::AnnotationMissing { key: key.clone() })?;
        *annotation = annotation.patched(new_properties);
      },
      Operation::SetValue { new_properties, .. } => {
        check_reserved(new_properties, &VALUE_KEYS)?;
        patch(self.root.properties_mut(), new_properties);
      },
    }

    if moves_points(op) {
      self.transform_ranges(op);
    }
    Ok(())
  }

  /// Insert a moved node at `path`, handing it back when there is no slot
  /// for it.
  fn place(&mut self, path: &Path, node: Node) -> std::result::Result<(), (OperationError, Node)> {
    let (parent, index) = match self.parent_mut(path, "move to") {
      Ok(found) => found,
      Err(err) => return Err((err, node)),
    };
    if index > parent.children.len() {
      let err = match path.parent() {
        Ok(parent) => OperationError::IndexOutOfBounds { parent, index },
        Err(err) => err.into(),
      };
      return Err((err, node));
    }
    parent.children.insert(index, node);
    Ok(())
  }

  fn parent_mut(&mut self, path: &Path, op: &'static str) -> Result<(&mut Element, usize)> {
    let Some(index) = path.last() else {
      return Err(OperationError::Root { op });
    };
    let parent = self.root.element_at_mut(&path.parent()?)?;
    Ok((parent, index))
  }

  fn transform_ranges(&mut self, op: &Operation) {
    let removed = match op {
      Operation::RemoveNode { path, .. } => Some(path),
      _ => None,
    };

    if let Some(selection) = self.selection.take() {
      self.selection = self.transform_range(&selection, op, removed);
      if self.selection.is_none() {
        debug!(op = op.kind(), "selection has no surviving text, deselecting");
      }
    }

    let annotations = std::mem::take(&mut self.annotations);
    for (key, annotation) in annotations {
      match self.transform_range(&annotation, op, removed) {
        Some(annotation) => {
          self.annotations.insert(key, annotation);
        },
        None => debug!(key = %key, op = op.kind(), "annotation has no surviving text, dropping"),
      }
    }
  }

  fn transform_range(&self, range: &Range, op: &Operation, removed: Option<&Path>) -> Option<Range> {
    let transform = |point: &Point| {
      point
        .transform(op, Some(Affinity::Forward))
        .or_else(|| removed.and_then(|path| fallback_point(&self.root, path)))
    };
    Some(Range {
      anchor: transform(&range.anchor)?,
      focus:  transform(&range.focus)?,
    })
  }
}

/// Operations after which selection and annotation points must be carried
/// forward.
fn moves_points(op: &Operation) -> bool {
  matches!(
    op,
    Operation::InsertNode { .. }
      | Operation::RemoveNode { .. }
      | Operation::MoveNode { .. }
      | Operation::SplitNode { .. }
      | Operation::MergeNode { .. }
      | Operation::InsertText { .. }
      | Operation::RemoveText { .. }
  )
}

fn check_reserved_key(key: &str, reserved: &[&str]) -> Result<()> {
  if reserved.contains(&key) {
    return Err(OperationError::ReservedProperty {
      key: key.to_string(),
    });
  }
  Ok(())
}

fn check_reserved(properties: &Properties, reserved: &[&str]) -> Result<()> {
  properties
    .keys()
    .try_for_each(|key| check_reserved_key(key, reserved))
}

/// Overlay `changes` onto `properties`; a `null` value removes the key.
fn patch(properties: &mut Properties, changes: &Properties) {
  for (key, value) in changes {
    if value.is_null() {
      properties.remove(key);
    } else {
      properties.insert(key.clone(), value.clone());
    }
  }
}

/// Where a point that lived at or below `removed` should go, looking at the
/// tree after the removal.
///
/// The end of the last text before `removed` wins, unless the first text at
/// or after it shares a deeper common ancestor with `removed` (or took the
/// removed node's place as a first child), in which case the start of that
/// text wins. `None` when the tree has no text left.
pub fn fallback_point(root: &Node, removed: &Path) -> Option<Point> {
  let mut prev = None;
  let mut next = None;
  for (path, text) in root.texts() {
    if path.compare(removed) == Ordering::Less {
      prev = Some((path, text.len()));
    } else {
      next = Some(path);
      break;
    }
  }

  let prefer_next = match (&prev, &next) {
    (Some((prev, _)), Some(next)) => {
      if next == removed {
        !next.has_previous()
      } else {
        prev.common(removed).len() < next.common(removed).len()
      }
    },
    _ => false,
  };

  match (prev, next) {
    (Some((path, len)), _) if !prefer_next => Some(Point::new(path, len)),
    (_, Some(path)) => Some(Point::new(path, 0)),
    _ => None,
  }
}

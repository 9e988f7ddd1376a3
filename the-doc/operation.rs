//! The closed set of mutations a document can undergo.
//!
//! An [`Operation`] is a self-contained value: it carries everything needed
//! both to apply it and to undo it, so [`Operation::inverse`] never needs to
//! look at the document.
//!
//! # Wire format
//!
//! Operations serialize as tagged JSON objects with camelCase payload keys,
//! which is the format of operation logs:
//!
//! ```text
//! { "type": "insert_text", "path": [0, 0], "offset": 0, "text": "Hi " }
//! { "type": "move_node", "path": [0, 2], "newPath": [0, 1] }
//! ```
//!
//! Logs read from an untrusted source can be checked with [`is_operation`]
//! and [`is_operation_list`] before decoding.

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

use crate::{
  Tendril,
  node::{
    Mark,
    Node,
    NodeError,
    NodesOptions,
    Properties,
  },
  path::{
    Path,
    PathError,
  },
  range::{
    Range,
    RangePatch,
  },
};

pub type Result<T> = std::result::Result<T, OperationError>;

/// A payload that does not fit the document it is applied to.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum OperationError {
  #[error(transparent)]
  Node(#[from] NodeError),
  #[error(transparent)]
  Path(#[from] PathError),
  #[error("cannot {op} the root node")]
  Root { op: &'static str },
  #[error("index {index} is out of bounds under {parent}")]
  IndexOutOfBounds { parent: Path, index: usize },
  #[error("position {position} is past the end of the node at {path}")]
  PositionOutOfBounds { path: Path, position: usize },
  #[error("cannot merge the node at {path} into a sibling of a different kind")]
  MergeMismatch { path: Path },
  #[error("cannot move the node at {path} inside itself at {new_path}")]
  MoveIntoSelf { path: Path, new_path: Path },
  #[error("text at {path} offset {offset} does not match {expected:?}")]
  TextMismatch {
    path:     Path,
    offset:   usize,
    expected: Tendril,
  },
  #[error("property {key:?} cannot be set directly")]
  ReservedProperty { key: String },
  #[error("mark {key:?} is already set on the text at {path}")]
  MarkExists { path: Path, key: String },
  #[error("mark {key:?} on the text at {path} does not match")]
  MarkMismatch { path: Path, key: String },
  #[error("cannot set a partial selection when there is no selection")]
  IncompleteSelection,
  #[error("annotation {key:?} already exists")]
  AnnotationExists { key: String },
  #[error("annotation {key:?} does not exist")]
  AnnotationMissing { key: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Operation {
  InsertNode {
    path: Path,
    node: Node,
  },
  RemoveNode {
    path: Path,
    node: Node,
  },
  MoveNode {
    path:     Path,
    new_path: Path,
  },
  SetNode {
    path:           Path,
    properties:     Properties,
    new_properties: Properties,
  },
  /// Split the node at `path` at `position` (chars for a text, children for
  /// an element). The new right-hand sibling gets `properties`.
  SplitNode {
    path:       Path,
    position:   usize,
    properties: Properties,
  },
  /// Merge the node at `path` into its previous sibling, whose size was
  /// `position`. `properties` are those of the merged node.
  MergeNode {
    path:       Path,
    position:   usize,
    properties: Properties,
  },
  InsertText {
    path:   Path,
    offset: usize,
    text:   Tendril,
  },
  RemoveText {
    path:   Path,
    offset: usize,
    text:   Tendril,
  },
  AddMark {
    path: Path,
    mark: Mark,
  },
  RemoveMark {
    path: Path,
    mark: Mark,
  },
  SetMark {
    path:           Path,
    properties:     Properties,
    new_properties: Properties,
  },
  /// `None` on either side stands for "no selection".
  SetSelection {
    properties:     Option<RangePatch>,
    new_properties: Option<RangePatch>,
  },
  AddAnnotation {
    key:        String,
    annotation: Range,
  },
  RemoveAnnotation {
    key:        String,
    annotation: Range,
  },
  SetAnnotation {
    key:            String,
    properties:     RangePatch,
    new_properties: RangePatch,
  },
  SetValue {
    #[serde(default)]
    properties:     Properties,
    new_properties: Properties,
  },
}

impl Operation {
  /// The wire name of this operation.
  pub fn kind(&self) -> &'static str {
    match self {
      Operation::InsertNode { .. } => "insert_node",
      Operation::RemoveNode { .. } => "remove_node",
      Operation::MoveNode { .. } => "move_node",
      Operation::SetNode { .. } => "set_node",
      Operation::SplitNode { .. } => "split_node",
      Operation::MergeNode { .. } => "merge_node",
      Operation::InsertText { .. } => "insert_text",
      Operation::RemoveText { .. } => "remove_text",
      Operation::AddMark { .. } => "add_mark",
      Operation::RemoveMark { .. } => "remove_mark",
      Operation::SetMark { .. } => "set_mark",
      Operation::SetSelection { .. } => "set_selection",
      Operation::AddAnnotation { .. } => "add_annotation",
      Operation::RemoveAnnotation { .. } => "remove_annotation",
      Operation::SetAnnotation { .. } => "set_annotation",
      Operation::SetValue { .. } => "set_value",
    }
  }

  /// The node the operation targets, for operations that target one.
  pub fn path(&self) -> Option<&Path> {
    match self {
      Operation::InsertNode { path, .. }
      | Operation::RemoveNode { path, .. }
      | Operation::MoveNode { path, .. }
      | Operation::SetNode { path, .. }
      | Operation::SplitNode { path, .. }
      | Operation::MergeNode { path, .. }
      | Operation::InsertText { path, .. }
      | Operation::RemoveText { path, .. }
      | Operation::AddMark { path, .. }
      | Operation::RemoveMark { path, .. }
      | Operation::SetMark { path, .. } => Some(path),
      Operation::SetSelection { .. }
      | Operation::AddAnnotation { .. }
      | Operation::RemoveAnnotation { .. }
      | Operation::SetAnnotation { .. }
      | Operation::SetValue { .. } => None,
    }
  }

  pub fn is_node_op(&self) -> bool {
    matches!(
      self,
      Operation::InsertNode { .. }
        | Operation::RemoveNode { .. }
        | Operation::MoveNode { .. }
        | Operation::SetNode { .. }
        | Operation::SplitNode { .. }
        | Operation::MergeNode { .. }
    )
  }

  pub fn is_text_op(&self) -> bool {
    matches!(
      self,
      Operation::InsertText { .. }
        | Operation::RemoveText { .. }
        | Operation::AddMark { .. }
        | Operation::RemoveMark { .. }
        | Operation::SetMark { .. }
    )
  }

  pub fn is_selection_op(&self) -> bool {
    matches!(self, Operation::SetSelection { .. })
  }

  pub fn is_annotation_op(&self) -> bool {
    matches!(
      self,
      Operation::AddAnnotation { .. }
        | Operation::RemoveAnnotation { .. }
        | Operation::SetAnnotation { .. }
    )
  }

  /// The operation that exactly undoes `self`, expressed in the coordinates
  /// of the document after `self` was applied.
  pub fn inverse(&self) -> Operation {
    match self.clone() {
      Operation::InsertNode { path, node } => Operation::RemoveNode { path, node },
      Operation::RemoveNode { path, node } => Operation::InsertNode { path, node },
      Operation::InsertText { path, offset, text } => Operation::RemoveText { path, offset, text },
      Operation::RemoveText { path, offset, text } => Operation::InsertText { path, offset, text },
      Operation::AddMark { path, mark } => Operation::RemoveMark { path, mark },
      Operation::RemoveMark { path, mark } => Operation::AddMark { path, mark },
      Operation::AddAnnotation { key, annotation } => {
        Operation::RemoveAnnotation { key, annotation }
      },
      Operation::RemoveAnnotation { key, annotation } => {
        Operation::AddAnnotation { key, annotation }
      },
      Operation::SetNode {
        path,
        properties,
        new_properties,
      } => {
        Operation::SetNode {
          path,
          properties: new_properties,
          new_properties: properties,
        }
      },
      Operation::SetMark {
        path,
        properties,
        new_properties,
      } => {
        Operation::SetMark {
          path,
          properties: new_properties,
          new_properties: properties,
        }
      },
      Operation::SetSelection {
        properties,
        new_properties,
      } => {
        Operation::SetSelection {
          properties:     new_properties,
          new_properties: properties,
        }
      },
      Operation::SetAnnotation {
        key,
        properties,
        new_properties,
      } => {
        Operation::SetAnnotation {
          key,
          properties: new_properties,
          new_properties: properties,
        }
      },
      Operation::SetValue {
        properties,
        new_properties,
      } => {
        Operation::SetValue {
          properties:     new_properties,
          new_properties: properties,
        }
      },
      // A split at the root is rejected when applied, so the fallbacks below
      // only keep `inverse` total.
      Operation::SplitNode {
        path,
        position,
        properties,
      } => {
        Operation::MergeNode {
          path: path.next().unwrap_or_else(|_| path.clone()),
          position,
          properties,
        }
      },
      Operation::MergeNode {
        path,
        position,
        properties,
      } => {
        Operation::SplitNode {
          path: path.previous().unwrap_or_else(|_| path.clone()),
          position,
          properties,
        }
      },
      Operation::MoveNode { path, new_path } => {
        if path == new_path {
          return self.clone();
        }
        // Sibling moves land exactly on `new_path`, so swapping is enough.
        if path.is_sibling(&new_path) {
          return Operation::MoveNode {
            path:     new_path,
            new_path: path,
          };
        }
        // Otherwise both ends have to be expressed after the move: the node
        // now lives at the transformed `path`, and it goes back to wherever
        // its old next sibling ended up.
        let inverse_path = path.transform(self, None).unwrap_or_else(|| path.clone());
        let inverse_new_path = path
          .next()
          .ok()
          .and_then(|next| next.transform(self, None))
          .unwrap_or_else(|| path.clone());
        Operation::MoveNode {
          path:     inverse_path,
          new_path: inverse_new_path,
        }
      },
    }
  }

  /// Paths whose subtrees may violate the document invariants once this
  /// operation has been applied, shallowest first.
  pub fn dirty_paths(&self) -> Vec<Path> {
    match self {
      Operation::InsertText { path, .. }
      | Operation::RemoveText { path, .. }
      | Operation::SetNode { path, .. }
      | Operation::AddMark { path, .. }
      | Operation::RemoveMark { path, .. }
      | Operation::SetMark { path, .. } => path.levels().collect(),
      Operation::InsertNode { path, node } => {
        let mut paths: Vec<Path> = path.levels().collect();
        if node.is_element() {
          paths.extend(
            node
              .nodes(NodesOptions::default())
              .skip(1)
              .map(|(relative, _)| path.join(&relative)),
          );
        }
        paths
      },
      Operation::MergeNode { path, .. } => {
        let mut paths: Vec<Path> = path.ancestors().rev().collect();
        paths.extend(path.previous().ok());
        paths
      },
      Operation::MoveNode { path, new_path } => {
        if path == new_path {
          return Vec::new();
        }
        let mut paths: Vec<Path> = path
          .ancestors()
          .rev()
          .filter_map(|ancestor| ancestor.transform(self, None))
          .collect();
        let new_ancestors: Vec<Path> = new_path
          .ancestors()
          .rev()
          .filter_map(|ancestor| ancestor.transform(self, None))
          .collect();
        let result = new_ancestors
          .last()
          .zip(new_path.last())
          .map(|(parent, index)| parent.child(index));
        paths.extend(new_ancestors);
        paths.extend(result);
        paths
      },
      Operation::RemoveNode { path, .. } => path.ancestors().rev().collect(),
      Operation::SplitNode { path, .. } => {
        let mut paths: Vec<Path> = path.levels().collect();
        paths.extend(path.next().ok());
        paths
      },
      Operation::SetSelection { .. }
      | Operation::AddAnnotation { .. }
      | Operation::RemoveAnnotation { .. }
      | Operation::SetAnnotation { .. }
      | Operation::SetValue { .. } => Vec::new(),
    }
  }
}

/// Required payload keys per operation type, in wire naming.
const PAYLOAD_KEYS: &[(&str, &[&str])] = &[
  ("insert_node", &["path", "node"]),
  ("remove_node", &["path", "node"]),
  ("move_node", &["path", "newPath"]),
  ("set_node", &["path", "properties", "newProperties"]),
  ("split_node", &["path", "position", "properties"]),
  ("merge_node", &["path", "position", "properties"]),
  ("insert_text", &["path", "offset", "text"]),
  ("remove_text", &["path", "offset", "text"]),
  ("add_mark", &["path", "mark"]),
  ("remove_mark", &["path", "mark"]),
  ("set_mark", &["path", "properties", "newProperties"]),
  ("set_selection", &["properties", "newProperties"]),
  ("add_annotation", &["key", "annotation"]),
  ("remove_annotation", &["key", "annotation"]),
  ("set_annotation", &["key", "properties", "newProperties"]),
  ("set_value", &["newProperties"]),
];

/// Whether `value` has the shape of an operation: a known `type` tag and
/// every payload key that type requires. Payload values are not checked.
pub fn is_operation(value: &serde_json::Value) -> bool {
  let Some(object) = value.as_object() else {
    return false;
  };
  let Some(kind) = object.get("type").and_then(serde_json::Value::as_str) else {
    return false;
  };
  PAYLOAD_KEYS
    .iter()
    .find(|(name, _)| *name == kind)
    .is_some_and(|(_, keys)| keys.iter().all(|key| object.contains_key(*key)))
}

/// Whether `value` is an array whose every element [`is_operation`]. An
/// empty array is an operation list.
pub fn is_operation_list(value: &serde_json::Value) -> bool {
  value
    .as_array()
    .is_some_and(|items| items.iter().all(is_operation))
}

//! The document tree.
//!
//! A [`Node`] is either an [`Element`] (a container with custom properties
//! and children) or a [`Text`] leaf (a string plus flat formatting marks).
//! The JSON shape follows the variant, with no explicit tag:
//!
//! ```text
//! { "type": "paragraph", "children": [ ... ] }   element
//! { "text": "Hello", "bold": true }             text
//! ```
//!
//! All traversal is read-only and path based; see [`crate::path`] for the
//! addressing scheme. Mutation only happens through operations applied to a
//! [`crate::value::Value`].

use std::collections::BTreeMap;

use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  de,
};
use thiserror::Error;

use crate::{
  Tendril,
  path::{
    Path,
    PathError,
  },
};

/// Custom properties of an element, or the marks of a text leaf.
pub type Properties = BTreeMap<String, serde_json::Value>;

pub type Result<T> = std::result::Result<T, NodeError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum NodeError {
  #[error("no node at path {path}")]
  NotFound { path: Path },
  #[error("node at path {path} is not an element")]
  NotElement { path: Path },
  #[error("node at path {path} is not a text")]
  NotText { path: Path },
  #[error("the root node has no {what}")]
  Root { what: &'static str },
  #[error(transparent)]
  Path(#[from] PathError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Text {
  pub text:  Tendril,
  #[serde(flatten)]
  pub marks: Properties,
}

/// A single formatting mark, `key: value` on a text leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
  pub key:   String,
  pub value: serde_json::Value,
}

impl Mark {
  pub fn new(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    Self {
      key:   key.into(),
      value: value.into(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
  pub children:   Vec<Node>,
  #[serde(flatten)]
  pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
  Text(Text),
  Element(Element),
}

impl Text {
  pub fn new(text: impl Into<Tendril>) -> Self {
    Self {
      text:  text.into(),
      marks: Properties::new(),
    }
  }

  /// Length in chars, which is the unit of every text offset.
  #[inline]
  pub fn len(&self) -> usize {
    self.text.chars().count()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.text.is_empty()
  }

  /// Same marks, regardless of content.
  pub fn equals_loose(&self, other: &Text) -> bool {
    self.marks == other.marks
  }

  /// Byte index of the char at `offset`, clamped to the end of the text.
  pub fn byte_offset(&self, offset: usize) -> usize {
    self
      .text
      .char_indices()
      .nth(offset)
      .map_or(self.text.len(), |(index, _)| index)
  }
}

impl Element {
  pub fn new(children: Vec<Node>) -> Self {
    Self {
      children,
      properties: Properties::new(),
    }
  }
}

impl Node {
  pub fn text(text: impl Into<Tendril>) -> Self {
    Node::Text(Text::new(text))
  }

  pub fn element(children: Vec<Node>) -> Self {
    Node::Element(Element::new(children))
  }

  /// Builder-style property (or mark) setter.
  pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    self.properties_mut().insert(key.into(), value.into());
    self
  }

  #[inline]
  pub fn is_text(&self) -> bool {
    matches!(self, Node::Text(_))
  }

  #[inline]
  pub fn is_element(&self) -> bool {
    matches!(self, Node::Element(_))
  }

  pub fn as_text(&self) -> Option<&Text> {
    match self {
      Node::Text(text) => Some(text),
      Node::Element(_) => None,
    }
  }

  pub fn as_element(&self) -> Option<&Element> {
    match self {
      Node::Element(element) => Some(element),
      Node::Text(_) => None,
    }
  }

  /// Children of an element; a text leaf has none.
  pub fn children(&self) -> &[Node] {
    match self {
      Node::Element(element) => &element.children,
      Node::Text(_) => &[],
    }
  }

  pub fn properties(&self) -> &Properties {
    match self {
      Node::Element(element) => &element.properties,
      Node::Text(text) => &text.marks,
    }
  }

  pub fn properties_mut(&mut self) -> &mut Properties {
    match self {
      Node::Element(element) => &mut element.properties,
      Node::Text(text) => &mut text.marks,
    }
  }

  /// The node's properties without its content, as carried by split and
  /// merge operations.
  pub fn extract_props(&self) -> Properties {
    self.properties().clone()
  }

  /// Chars of a text, children of an element. This is the unit of
  /// `position` in split and merge operations.
  pub fn size(&self) -> usize {
    match self {
      Node::Element(element) => element.children.len(),
      Node::Text(text) => text.len(),
    }
  }

  /// All text below this node, concatenated.
  pub fn string(&self) -> String {
    match self {
      Node::Text(text) => text.text.to_string(),
      Node::Element(_) => self.texts().map(|(_, text)| text.text.as_str()).collect(),
    }
  }

  pub fn text_len(&self) -> usize {
    self.texts().map(|(_, text)| text.len()).sum()
  }

  // Lookup.
  //

  pub fn child(&self, index: usize) -> Option<&Node> {
    self.children().get(index)
  }

  pub fn get(&self, path: &Path) -> Result<&Node> {
    let mut node = self;
    for &index in path.as_slice() {
      node = node
        .child(index)
        .ok_or_else(|| NodeError::NotFound { path: path.clone() })?;
    }
    Ok(node)
  }

  pub fn get_mut(&mut self, path: &Path) -> Result<&mut Node> {
    let mut node = self;
    for &index in path.as_slice() {
      node = match node {
        Node::Element(element) => element.children.get_mut(index),
        Node::Text(_) => None,
      }
      .ok_or_else(|| NodeError::NotFound { path: path.clone() })?;
    }
    Ok(node)
  }

  pub fn has(&self, path: &Path) -> bool {
    self.get(path).is_ok()
  }

  /// Like [`Node::get`], but the root itself is not a descendant.
  pub fn descendant(&self, path: &Path) -> Result<&Node> {
    if path.is_root() {
      return Err(NodeError::Root { what: "descendant" });
    }
    self.get(path)
  }

  pub fn element_at(&self, path: &Path) -> Result<&Element> {
    self
      .get(path)?
      .as_element()
      .ok_or_else(|| NodeError::NotElement { path: path.clone() })
  }

  pub fn element_at_mut(&mut self, path: &Path) -> Result<&mut Element> {
    match self.get_mut(path)? {
      Node::Element(element) => Ok(element),
      Node::Text(_) => Err(NodeError::NotElement { path: path.clone() }),
    }
  }

  /// The text leaf at `path`.
  pub fn leaf(&self, path: &Path) -> Result<&Text> {
    self
      .get(path)?
      .as_text()
      .ok_or_else(|| NodeError::NotText { path: path.clone() })
  }

  pub fn leaf_mut(&mut self, path: &Path) -> Result<&mut Text> {
    match self.get_mut(path)? {
      Node::Text(text) => Ok(text),
      Node::Element(_) => Err(NodeError::NotText { path: path.clone() }),
    }
  }

  pub fn parent(&self, path: &Path) -> Result<&Node> {
    if path.is_root() {
      return Err(NodeError::Root { what: "parent" });
    }
    self.get(&path.parent()?)
  }

  /// Every ancestor of the node at `path` with its path, root first.
  pub fn ancestors(&self, path: &Path) -> Result<Vec<(Path, &Node)>> {
    path
      .ancestors()
      .rev()
      .map(|ancestor| {
        let node = self.get(&ancestor)?;
        Ok((ancestor, node))
      })
      .collect()
  }

  /// The deepest node that contains both `a` and `b`.
  pub fn common(&self, a: &Path, b: &Path) -> Result<(Path, &Node)> {
    let path = a.common(b);
    let node = self.get(&path)?;
    Ok((path, node))
  }

  /// Whether the node at `ancestor` contains the node at `path`, both being
  /// present in this tree.
  pub fn is_ancestor(&self, ancestor: &Path, path: &Path) -> bool {
    ancestor.is_ancestor(path) && self.has(path)
  }

  /// First text leaf at or below `path`.
  pub fn first(&self, path: &Path) -> Result<(Path, &Text)> {
    self.edge_leaf(path, |children| children.first().map(|node| (0, node)))
  }

  /// Last text leaf at or below `path`.
  pub fn last(&self, path: &Path) -> Result<(Path, &Text)> {
    self.edge_leaf(path, |children| {
      children
        .len()
        .checked_sub(1)
        .map(|index| (index, &children[index]))
    })
  }

  fn edge_leaf<'a>(
    &'a self,
    path: &Path,
    pick: impl Fn(&'a [Node]) -> Option<(usize, &'a Node)>,
  ) -> Result<(Path, &'a Text)> {
    let mut path = path.clone();
    let mut node = self.get(&path)?;
    loop {
      match node {
        Node::Text(text) => return Ok((path, text)),
        Node::Element(element) => {
          let (index, child) =
            pick(&element.children).ok_or_else(|| NodeError::NotFound { path: path.child(0) })?;
          path = path.child(index);
          node = child;
        },
      }
    }
  }

  // Iteration.
  //

  /// Depth-first, pre-order walk of this node and its descendants.
  pub fn nodes(&self, options: NodesOptions) -> Nodes<'_> {
    Nodes {
      root:      self,
      path:      Path::root(),
      ascending: false,
      done:      false,
      options,
    }
  }

  pub fn texts(&self) -> impl Iterator<Item = (Path, &Text)> + '_ {
    self
      .nodes(NodesOptions::default())
      .filter_map(|(path, node)| node.as_text().map(|text| (path, text)))
  }

  pub fn elements(&self) -> impl Iterator<Item = (Path, &Element)> + '_ {
    self
      .nodes(NodesOptions::default())
      .filter_map(|(path, node)| node.as_element().map(|element| (path, element)))
  }
}

impl<'de> Deserialize<'de> for Node {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let mut map = Properties::deserialize(deserializer)?;
    if let Some(children) = map.remove("children") {
      let children = Vec::<Node>::deserialize(children).map_err(de::Error::custom)?;
      return Ok(Node::Element(Element {
        children,
        properties: map,
      }));
    }
    match map.remove("text") {
      Some(serde_json::Value::String(text)) => {
        Ok(Node::Text(Text {
          text:  text.into(),
          marks: map,
        }))
      },
      Some(_) => Err(de::Error::custom("`text` must be a string")),
      None => Err(de::Error::custom("node has neither `children` nor `text`")),
    }
  }
}

impl From<Text> for Node {
  fn from(text: Text) -> Self {
    Node::Text(text)
  }
}

impl From<Element> for Node {
  fn from(element: Element) -> Self {
    Node::Element(element)
  }
}

/// Bounds for [`Node::nodes`].
#[derive(Debug, Clone, Default)]
pub struct NodesOptions {
  /// Skip straight to this path; its ancestors are still visited.
  pub from:    Option<Path>,
  /// Stop after this path and its descendants.
  pub to:      Option<Path>,
  pub reverse: bool,
}

/// Iterator returned by [`Node::nodes`].
///
/// Holds only a cursor path, so it is cheap to restart and never allocates
/// more than one path per step.
pub struct Nodes<'a> {
  root:      &'a Node,
  path:      Path,
  // Set when the cursor came back up from a child, in which case the node
  // was already yielded and its children already walked.
  ascending: bool,
  done:      bool,
  options:   NodesOptions,
}

impl<'a> Nodes<'a> {
  fn advance(&mut self, node: &'a Node) {
    let reverse = self.options.reverse;

    if !self.ascending && !node.children().is_empty() {
      let mut index = if reverse {
        node.children().len() - 1
      } else {
        0
      };
      if let Some(from) = self.options.from.as_ref().filter(|from| self.path.is_ancestor(from)) {
        index = from[self.path.len()];
      }
      self.path = self.path.child(index);
      return;
    }

    let Some(last) = self.path.last() else {
      self.done = true;
      return;
    };

    let sibling = if reverse {
      last.checked_sub(1)
    } else {
      Some(last + 1).filter(|&index| index < self.parent_len())
    };
    let parent = self.path.parent().unwrap_or_default();
    match sibling {
      Some(index) => {
        self.path = parent.child(index);
        self.ascending = false;
      },
      None => {
        self.path = parent;
        self.ascending = true;
      },
    }
  }

  fn parent_len(&self) -> usize {
    self
      .root
      .parent(&self.path)
      .map_or(0, |node| node.children().len())
  }
}

impl<'a> Iterator for Nodes<'a> {
  type Item = (Path, &'a Node);

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      if self.done {
        return None;
      }

      if let Some(to) = &self.options.to {
        let past = if self.options.reverse {
          self.path.is_before(to)
        } else {
          self.path.is_after(to)
        };
        if past {
          self.done = true;
          return None;
        }
      }

      let Ok(node) = self.root.get(&self.path) else {
        self.done = true;
        return None;
      };

      let yielded = !self.ascending;
      let path = self.path.clone();
      self.advance(node);
      if yielded {
        return Some((path, node));
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn tree() -> Node {
    Node::element(vec![
      Node::element(vec![Node::text("one"), Node::text("two").with_property("bold", true)])
        .with_property("type", "paragraph"),
      Node::element(vec![Node::element(vec![Node::text("three")])]),
    ])
  }

  fn p<const N: usize>(indices: [usize; N]) -> Path {
    Path::from(indices)
  }

  #[test]
  fn lookup() {
    let root = tree();
    assert_eq!(root.leaf(&p([0, 1])).unwrap().text, "two");
    assert_eq!(root.get(&p([1, 0, 0])).unwrap().string(), "three");
    assert_eq!(
      root.get(&p([2])),
      Err(NodeError::NotFound { path: p([2]) })
    );
    assert_eq!(
      root.leaf(&p([0])),
      Err(NodeError::NotText { path: p([0]) })
    );
    assert_eq!(
      root.get(&p([0, 0, 0])),
      Err(NodeError::NotFound { path: p([0, 0, 0]) })
    );
    assert!(matches!(root.parent(&Path::root()), Err(NodeError::Root { .. })));
    assert_eq!(root.parent(&p([0, 1])).unwrap().size(), 2);
    assert_eq!(root.string(), "onetwothree");
    assert_eq!(root.text_len(), 11);
  }

  #[test]
  fn first_last_and_common() {
    let root = tree();
    assert_eq!(root.first(&Path::root()).unwrap().0, p([0, 0]));
    assert_eq!(root.last(&Path::root()).unwrap().0, p([1, 0, 0]));
    assert_eq!(root.last(&p([0])).unwrap().1.text, "two");
    assert_eq!(root.common(&p([0, 0]), &p([0, 1])).unwrap().0, p([0]));
    let ancestors = root.ancestors(&p([1, 0, 0])).unwrap();
    let paths: Vec<_> = ancestors.into_iter().map(|(path, _)| path).collect();
    assert_eq!(paths, vec![Path::root(), p([1]), p([1, 0])]);
  }

  #[test]
  fn nodes_walks_depth_first() {
    let root = tree();
    let paths: Vec<_> = root
      .nodes(NodesOptions::default())
      .map(|(path, _)| path)
      .collect();
    assert_eq!(paths, vec![
      Path::root(),
      p([0]),
      p([0, 0]),
      p([0, 1]),
      p([1]),
      p([1, 0]),
      p([1, 0, 0]),
    ]);

    let reversed: Vec<_> = root
      .nodes(NodesOptions {
        reverse: true,
        ..Default::default()
      })
      .map(|(path, _)| path)
      .collect();
    assert_eq!(reversed, vec![
      Path::root(),
      p([1]),
      p([1, 0]),
      p([1, 0, 0]),
      p([0]),
      p([0, 1]),
      p([0, 0]),
    ]);
  }

  #[test]
  fn nodes_respects_bounds() {
    let root = tree();
    let paths: Vec<_> = root
      .nodes(NodesOptions {
        from: Some(p([0, 1])),
        to: Some(p([1, 0])),
        ..Default::default()
      })
      .map(|(path, _)| path)
      .collect();
    assert_eq!(paths, vec![
      Path::root(),
      p([0]),
      p([0, 1]),
      p([1]),
      p([1, 0]),
      p([1, 0, 0]),
    ]);

    let texts: Vec<_> = root.texts().map(|(_, text)| text.text.to_string()).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
    // restartable
    assert_eq!(root.texts().count(), 3);
  }

  #[test]
  fn json_shape() {
    let node: Node = serde_json::from_value(json!({
      "type": "paragraph",
      "children": [{ "text": "hi", "bold": true }, { "text": "" }],
    }))
    .unwrap();
    let element = node.as_element().unwrap();
    assert_eq!(element.properties["type"], json!("paragraph"));
    assert_eq!(element.children[0].properties()["bold"], json!(true));
    assert_eq!(
      serde_json::to_value(&node).unwrap(),
      json!({
        "type": "paragraph",
        "children": [{ "text": "hi", "bold": true }, { "text": "" }],
      })
    );
    assert!(serde_json::from_value::<Node>(json!({ "type": "x" })).is_err());
    assert!(serde_json::from_value::<Node>(json!({ "text": 3 })).is_err());
  }

  #[test]
  fn loose_equality_ignores_content() {
    let a = Text::new("a");
    let mut b = Text::new("b");
    assert!(a.equals_loose(&b));
    b.marks.insert("bold".into(), json!(true));
    assert!(!a.equals_loose(&b));
    assert_eq!(Text::new("héllo").byte_offset(2), 3);
    assert_eq!(Text::new("abc").byte_offset(9), 3);
  }
}

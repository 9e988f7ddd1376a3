//! Element kinds and pluggable normalization rules.
//!
//! The core only knows two things about an element beyond its shape: whether
//! it is *inline* (flows inside text, like a link) and whether it is *void*
//! (its content is not editable, like an image). Both are decided by the
//! element's type property, as configured in [`crate::config::SchemaConfig`].
//!
//! Extra invariants are added with [`Rule`]s, which run after the core rules
//! on every dirty node.

use std::{
  collections::HashSet,
  fmt,
};

use crate::{
  config::SchemaConfig,
  editor::{
    Editor,
    Result,
  },
  node::{
    Element,
    Node,
  },
  path::Path,
};

/// A deferred fix for an invalid node. Repairs change the document only
/// through [`Editor::apply`] and the transforms built on it.
pub type Repair = Box<dyn FnOnce(&mut Editor) -> Result<()>>;

/// A schema plugin.
pub trait Rule {
  /// Shown in logs when the rule fires.
  fn name(&self) -> &str;

  /// Inspect the node at `path`, returning a repair if it is invalid. The
  /// repair must make progress: a rule that keeps firing on the same node
  /// trips the normalization iteration limit.
  fn validate(&self, editor: &Editor, node: &Node, path: &Path) -> Option<Repair>;
}

pub struct Schema {
  type_key: String,
  inline:   HashSet<String>,
  void:     HashSet<String>,
  rules:    Vec<Box<dyn Rule>>,
}

impl Default for Schema {
  fn default() -> Self {
    Self::from_config(&SchemaConfig::default())
  }
}

impl fmt::Debug for Schema {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Schema")
      .field("type_key", &self.type_key)
      .field("inline", &self.inline)
      .field("void", &self.void)
      .field(
        "rules",
        &self.rules.iter().map(|rule| rule.name()).collect::<Vec<_>>(),
      )
      .finish()
  }
}

impl Schema {
  pub fn from_config(config: &SchemaConfig) -> Self {
    Self {
      type_key: config.type_key.clone(),
      inline:   config.inline.iter().cloned().collect(),
      void:     config.void.iter().cloned().collect(),
      rules:    Vec::new(),
    }
  }

  pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
    self.add_rule(rule);
    self
  }

  pub fn add_rule(&mut self, rule: impl Rule + 'static) {
    self.rules.push(Box::new(rule));
  }

  pub fn rules(&self) -> &[Box<dyn Rule>] {
    &self.rules
  }

  /// The element's type, if it has a string one.
  pub fn element_type<'a>(&self, element: &'a Element) -> Option<&'a str> {
    element
      .properties
      .get(&self.type_key)
      .and_then(serde_json::Value::as_str)
  }

  pub fn is_inline(&self, element: &Element) -> bool {
    self
      .element_type(element)
      .is_some_and(|kind| self.inline.contains(kind))
  }

  pub fn is_void(&self, element: &Element) -> bool {
    self
      .element_type(element)
      .is_some_and(|kind| self.void.contains(kind))
  }

  /// Text leaves and inline elements can share a parent; blocks cannot
  /// share one with either.
  pub fn is_inline_or_text(&self, node: &Node) -> bool {
    match node {
      Node::Text(_) => true,
      Node::Element(element) => self.is_inline(element),
    }
  }
}

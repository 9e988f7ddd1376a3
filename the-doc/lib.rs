//! Document and operation core for a nested rich-text editor.
//!
//! The tree is made of [`node::Node`]s (elements and text leaves), addressed
//! by [`path::Path`]s. Every mutation is an [`operation::Operation`] applied
//! through [`editor::Editor::apply`], which re-points the selection,
//! annotations and live refs, and then runs the normalization engine over
//! the paths the operation dirtied.

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod config;
pub mod editor;
pub mod history;
pub mod node;
pub mod normalize;
pub mod operation;
pub mod path;
pub mod point;
pub mod range;
pub mod refs;
pub mod schema;
pub mod transforms;
pub mod value;

pub type Tendril = SmartString<LazyCompact>;

pub use editor::{
  Change,
  Editor,
};
pub use node::{
  Element,
  Node,
  Properties,
  Text,
};
pub use operation::Operation;
pub use path::{
  Affinity,
  Path,
};
pub use point::Point;
pub use range::{
  Range,
  RangeAffinity,
};
pub use value::Value;

//! Higher-level commands on the editor.
//!
//! Each command compiles to a handful of [`Operation`]s and runs them inside
//! [`Editor::without_normalizing`], so the document is normalized once per
//! command rather than once per operation.

use crate::{
  Tendril,
  editor::{
    Editor,
    EditorError,
    Result,
  },
  node::{
    Mark,
    Node,
    NodesOptions,
    Properties,
  },
  operation::{
    Operation,
    OperationError,
  },
  path::{
    Affinity,
    Path,
  },
  point::Point,
  range::{
    Edge,
    Range,
    RangePatch,
  },
  refs::PathRef,
};

impl Editor {
  fn selection_or_err(&self) -> Result<Range> {
    self
      .value()
      .selection()
      .cloned()
      .ok_or(EditorError::NoSelection)
  }

  // Selection.
  //

  /// Set the selection to `range`, emitting only the points that changed.
  pub fn select(&mut self, range: Range) -> Result<()> {
    let op = match self.value().selection() {
      Some(selection) if *selection == range => return Ok(()),
      Some(selection) => {
        let (before, after) = RangePatch::diff(selection, &range);
        Operation::SetSelection {
          properties:     Some(before),
          new_properties: Some(after),
        }
      },
      None => {
        Operation::SetSelection {
          properties:     None,
          new_properties: Some(range.into()),
        }
      },
    };
    self.apply(op)
  }

  pub fn deselect(&mut self) -> Result<()> {
    let Some(selection) = self.value().selection().cloned() else {
      return Ok(());
    };
    self.apply(Operation::SetSelection {
      properties:     Some(selection.into()),
      new_properties: None,
    })
  }

  /// Move one or both points of the selection. Without a selection, the
  /// patch must carry both points.
  pub fn set_selection_patch(&mut self, patch: RangePatch) -> Result<()> {
    match self.value().selection() {
      Some(selection) => {
        let range = selection.patched(&patch);
        self.select(range)
      },
      None => {
        let range = patch.to_range().ok_or(OperationError::IncompleteSelection)?;
        self.select(range)
      },
    }
  }

  /// Collapse the selection onto one of its edges.
  pub fn collapse(&mut self, edge: Edge) -> Result<()> {
    let Some(selection) = self.value().selection() else {
      return Ok(());
    };
    let point = selection.edge(edge).clone();
    self.select(Range::collapsed(point))
  }

  // Text.
  //

  /// Type `text` at the selection, replacing it if it is expanded.
  pub fn insert_text(&mut self, text: &str) -> Result<()> {
    let selection = self.selection_or_err()?;
    if text.is_empty() && selection.is_collapsed() {
      return Ok(());
    }
    self.without_normalizing(|editor| {
      let point = if selection.is_expanded() {
        let point = editor.delete_range(&selection)?;
        editor.select(Range::collapsed(point.clone()))?;
        point
      } else {
        selection.anchor.clone()
      };
      editor.insert_text_at(&point, text)
    })
  }

  /// Insert `text` at `at`. Text inside void elements is not editable, so
  /// nothing happens there.
  pub fn insert_text_at(&mut self, at: &Point, text: &str) -> Result<()> {
    if text.is_empty() || self.is_in_void(&at.path) {
      return Ok(());
    }
    self.apply(Operation::InsertText {
      path:   at.path.clone(),
      offset: at.offset,
      text:   Tendril::from(text),
    })
  }

  /// Delete the content of the selection, leaving it collapsed at its start.
  pub fn delete_fragment(&mut self) -> Result<()> {
    let selection = self.selection_or_err()?;
    if selection.is_collapsed() {
      return Ok(());
    }
    self.without_normalizing(|editor| {
      let point = editor.delete_range(&selection)?;
      editor.select(Range::collapsed(point))
    })
  }

  /// Delete one char before the cursor. At the start of a block, the block
  /// is merged into the previous one.
  pub fn delete_backward(&mut self) -> Result<()> {
    let selection = self.selection_or_err()?;
    if selection.is_expanded() {
      return self.delete_fragment();
    }
    let point = selection.anchor;

    self.without_normalizing(|editor| {
      if point.offset > 0 {
        return editor.remove_text_span(&point.path, point.offset - 1, point.offset);
      }
      let root = editor.value().document();
      let Some((prev, prev_len)) = root
        .texts()
        .take_while(|(path, _)| path.is_before(&point.path))
        .last()
        .map(|(path, text)| (path, text.len()))
      else {
        return Ok(());
      };

      if editor.block_of(&prev) == editor.block_of(&point.path) {
        if prev_len == 0 {
          return Ok(());
        }
        editor.remove_text_span(&prev, prev_len - 1, prev_len)
      } else {
        let point = editor.delete_range(&Range::new(Point::new(prev, prev_len), point))?;
        editor.select(Range::collapsed(point))
      }
    })
  }

  /// Delete one char after the cursor. At the end of a block, the next
  /// block is merged into this one.
  pub fn delete_forward(&mut self) -> Result<()> {
    let selection = self.selection_or_err()?;
    if selection.is_expanded() {
      return self.delete_fragment();
    }
    let point = selection.anchor;

    self.without_normalizing(|editor| {
      let len = editor.value().document().leaf(&point.path)?.len();
      if point.offset < len {
        return editor.remove_text_span(&point.path, point.offset, point.offset + 1);
      }
      let root = editor.value().document();
      let Some((next, next_len)) = root
        .texts()
        .find(|(path, _)| path.is_after(&point.path))
        .map(|(path, text)| (path, text.len()))
      else {
        return Ok(());
      };

      if editor.block_of(&next) == editor.block_of(&point.path) {
        if next_len == 0 {
          return Ok(());
        }
        editor.remove_text_span(&next, 0, 1)
      } else {
        let point = editor.delete_range(&Range::new(point, Point::new(next, 0)))?;
        editor.select(Range::collapsed(point))
      }
    })
  }

  /// Delete everything between the edges of `range`, then merge the branch
  /// holding its end into the one holding its start. Returns where the start
  /// ended up.
  fn delete_range(&mut self, range: &Range) -> Result<Point> {
    let (start, end) = range.edges();
    let (start, end) = (start.clone(), end.clone());
    if start == end {
      return Ok(start);
    }
    if start.path == end.path {
      self.remove_text_span(&start.path, start.offset, end.offset)?;
      return Ok(start);
    }

    let start_ref = self.point_ref(start.clone(), Some(Affinity::Backward));
    let end_ref = self.path_ref(end.path.clone(), Some(Affinity::Forward));
    let result = self.delete_across(&start, &end, end_ref);
    self.unref_path(end_ref);
    let point = self.unref_point(start_ref);
    result?;
    Ok(point.unwrap_or(start))
  }

  fn delete_across(&mut self, start: &Point, end: &Point, end_ref: PathRef) -> Result<()> {
    let start_len = self.value().document().leaf(&start.path)?.len();
    self.remove_text_span(&end.path, 0, end.offset)?;
    self.remove_text_span(&start.path, start.offset, start_len)?;

    // Outermost nodes lying wholly between the two leaves, in document order.
    let mut between: Vec<(Path, Node)> = Vec::new();
    for (path, node) in self.value().document().nodes(NodesOptions::default()) {
      if !path.is_after(&start.path) || !path.is_before(&end.path) {
        continue;
      }
      if between.last().is_some_and(|(last, _)| last.is_ancestor(&path)) {
        continue;
      }
      between.push((path, node.clone()));
    }
    self.apply_all(
      between
        .into_iter()
        .rev()
        .map(|(path, node)| Operation::RemoveNode { path, node }),
    )?;

    let mut depth = start.path.common(&end.path).len() + 1;
    while depth < start.path.len() {
      let op = {
        let Some(end_leaf) = self.current_path(end_ref) else {
          break;
        };
        if depth >= end_leaf.len() {
          break;
        }
        let at = end_leaf.truncated(depth);
        let prev = start.path.truncated(depth);
        if prev.next().ok() != Some(at.clone()) {
          break;
        }
        let root = self.value().document();
        let (Ok(element), Ok(prev_element)) = (root.element_at(&at), root.element_at(&prev))
        else {
          break;
        };
        if self.schema().is_inline(element) || self.schema().is_inline(prev_element) {
          break;
        }
        Operation::MergeNode {
          path:       at,
          position:   prev_element.children.len(),
          properties: element.properties.clone(),
        }
      };
      self.apply(op)?;
      depth += 1;
    }
    Ok(())
  }

  /// Remove the chars `from..to` of the text at `path`.
  fn remove_text_span(&mut self, path: &Path, from: usize, to: usize) -> Result<()> {
    if from >= to {
      return Ok(());
    }
    let leaf = self.value().document().leaf(path)?;
    let text = Tendril::from(&leaf.text[leaf.byte_offset(from)..leaf.byte_offset(to)]);
    self.apply(Operation::RemoveText {
      path: path.clone(),
      offset: from,
      text,
    })
  }

  /// The closest non-inline element holding `path`, or the root.
  fn block_of(&self, path: &Path) -> Path {
    let root = self.value().document();
    path
      .ancestors()
      .find(|ancestor| {
        !ancestor.is_root()
          && root
            .element_at(ancestor)
            .is_ok_and(|element| !self.schema().is_inline(element))
      })
      .unwrap_or_default()
  }

  fn is_in_void(&self, path: &Path) -> bool {
    let root = self.value().document();
    path.levels().any(|level| {
      root
        .element_at(&level)
        .is_ok_and(|element| self.schema().is_void(element))
    })
  }

  // Nodes.
  //

  pub fn insert_node(&mut self, at: &Path, node: Node) -> Result<()> {
    self.without_normalizing(|editor| {
      editor.apply(Operation::InsertNode {
        path: at.clone(),
        node,
      })
    })
  }

  pub fn remove_node(&mut self, at: &Path) -> Result<()> {
    let node = self.value().document().descendant(at)?.clone();
    self.without_normalizing(|editor| {
      editor.apply(Operation::RemoveNode {
        path: at.clone(),
        node,
      })
    })
  }

  /// Move the node at `from` to `to`. Between siblings, `to` is where the
  /// node ends up.
  pub fn move_node(&mut self, from: &Path, to: &Path) -> Result<()> {
    self.without_normalizing(|editor| {
      editor.apply(Operation::MoveNode {
        path:     from.clone(),
        new_path: to.clone(),
      })
    })
  }

  /// Set properties on the node at `at`; a `null` value removes the key.
  pub fn set_node(&mut self, at: &Path, properties: Properties) -> Result<()> {
    let node = self.value().document().descendant(at)?;
    let old = properties
      .keys()
      .map(|key| {
        let value = node
          .properties()
          .get(key)
          .cloned()
          .unwrap_or(serde_json::Value::Null);
        (key.clone(), value)
      })
      .collect();
    self.without_normalizing(|editor| {
      editor.apply(Operation::SetNode {
        path:           at.clone(),
        properties:     old,
        new_properties: properties,
      })
    })
  }

  /// Merge the node at `at` into its previous sibling.
  pub fn merge_node(&mut self, at: &Path) -> Result<()> {
    let root = self.value().document();
    let node = root.descendant(at)?;
    let prev = root.descendant(&at.previous()?)?;
    let op = Operation::MergeNode {
      path:       at.clone(),
      position:   prev.size(),
      properties: node.extract_props(),
    };
    self.without_normalizing(|editor| editor.apply(op))
  }

  /// Split the node at `at` before `position`; the new right-hand node
  /// copies its properties.
  pub fn split_node(&mut self, at: &Path, position: usize) -> Result<()> {
    let properties = self.value().document().descendant(at)?.extract_props();
    self.without_normalizing(|editor| {
      editor.apply(Operation::SplitNode {
        path: at.clone(),
        position,
        properties,
      })
    })
  }

  /// Split the text at `at`, then its ancestors up to `height` levels above
  /// it. Returns the path of the outermost right-hand node.
  pub fn split_node_at(&mut self, at: &Point, height: usize) -> Result<Path> {
    self.value().document().leaf(&at.path)?;
    self.without_normalizing(|editor| {
      let mut path = at.path.clone();
      let mut position = at.offset;
      for level in 0..=height {
        if path.is_root() {
          break;
        }
        let properties = editor.value().document().get(&path)?.extract_props();
        editor.apply(Operation::SplitNode {
          path: path.clone(),
          position,
          properties,
        })?;
        if level == height || path.len() == 1 {
          return Ok(path.next()?);
        }
        position = path.last().map_or(0, |index| index + 1);
        path = path.parent()?;
      }
      Ok(path.next()?)
    })
  }

  // Marks.
  //

  /// Add `mark` to every text in the selection, splitting the texts at its
  /// edges. A collapsed selection is left alone.
  pub fn add_mark(&mut self, mark: Mark) -> Result<()> {
    let selection = self.selection_or_err()?;
    if selection.is_collapsed() {
      return Ok(());
    }
    self.without_normalizing(|editor| {
      for path in editor.isolate_texts(&selection)? {
        let leaf = editor.value().document().leaf(&path)?;
        let op = match leaf.marks.get(&mark.key) {
          Some(value) if *value == mark.value => continue,
          Some(value) => {
            Operation::SetMark {
              path,
              properties: [(mark.key.clone(), value.clone())].into(),
              new_properties: [(mark.key.clone(), mark.value.clone())].into(),
            }
          },
          None => {
            Operation::AddMark {
              path,
              mark: mark.clone(),
            }
          },
        };
        editor.apply(op)?;
      }
      Ok(())
    })
  }

  pub fn remove_mark(&mut self, key: &str) -> Result<()> {
    let selection = self.selection_or_err()?;
    if selection.is_collapsed() {
      return Ok(());
    }
    self.without_normalizing(|editor| {
      for path in editor.isolate_texts(&selection)? {
        let leaf = editor.value().document().leaf(&path)?;
        let Some(value) = leaf.marks.get(key) else {
          continue;
        };
        let mark = Mark::new(key, value.clone());
        editor.apply(Operation::RemoveMark { path, mark })?;
      }
      Ok(())
    })
  }

  /// Remove `mark` if every selected text already has it, add it otherwise.
  pub fn toggle_mark(&mut self, mark: Mark) -> Result<()> {
    let selection = self.selection_or_err()?;
    if self.is_mark_active(&selection, &mark) {
      self.remove_mark(&mark.key)
    } else {
      self.add_mark(mark)
    }
  }

  fn is_mark_active(&self, range: &Range, mark: &Mark) -> bool {
    let (start, end) = range.edges();
    let mut texts = self
      .value()
      .document()
      .texts()
      .filter(|(path, text)| {
        let after_start = path.is_after(&start.path)
          || (*path == start.path && (start.offset < text.len() || start.path == end.path));
        let before_end = path.is_before(&end.path) || (*path == end.path && end.offset > 0);
        after_start && before_end
      })
      .peekable();
    texts.peek().is_some() && texts.all(|(_, text)| text.marks.get(&mark.key) == Some(&mark.value))
  }

  /// Split the texts at the edges of `range` so that it covers whole texts,
  /// and return their paths. The selection is moved onto them.
  fn isolate_texts(&mut self, range: &Range) -> Result<Vec<Path>> {
    let (start, end) = range.edges();
    let start_ref = self.point_ref(start.clone(), Some(Affinity::Forward));
    let end_ref = self.point_ref(end.clone(), Some(Affinity::Backward));

    let result = self.split_edges(start, end);
    let start = self.unref_point(start_ref);
    let end = self.unref_point(end_ref);
    result?;
    let (Some(start), Some(end)) = (start, end) else {
      return Ok(Vec::new());
    };

    let paths = self
      .value()
      .document()
      .texts()
      .filter(|(path, text)| {
        let after_start =
          path.is_after(&start.path) || (*path == start.path && start.offset < text.len());
        let before_end = path.is_before(&end.path) || (*path == end.path && end.offset > 0);
        after_start && before_end
      })
      .map(|(path, _)| path)
      .collect();

    let isolated = if range.is_backward() {
      Range::new(end, start)
    } else {
      Range::new(start, end)
    };
    self.select(isolated)?;
    Ok(paths)
  }

  fn split_edges(&mut self, start: &Point, end: &Point) -> Result<()> {
    // The end first, so the start's split does not move it.
    for point in [end, start] {
      let leaf = self.value().document().leaf(&point.path)?;
      if point.offset == 0 || point.offset >= leaf.len() {
        continue;
      }
      let properties = leaf.marks.clone();
      self.apply(Operation::SplitNode {
        path: point.path.clone(),
        position: point.offset,
        properties,
      })?;
    }
    Ok(())
  }

  // Annotations and document data.
  //

  pub fn add_annotation(&mut self, key: impl Into<String>, annotation: Range) -> Result<()> {
    self.without_normalizing(|editor| {
      editor.apply(Operation::AddAnnotation {
        key: key.into(),
        annotation,
      })
    })
  }

  pub fn remove_annotation(&mut self, key: &str) -> Result<()> {
    let annotation = self
      .value()
      .annotation(key)
      .cloned()
      .ok_or_else(|| OperationError::AnnotationMissing { key: key.to_string() })?;
    self.without_normalizing(|editor| {
      editor.apply(Operation::RemoveAnnotation {
        key: key.to_string(),
        annotation,
      })
    })
  }

  /// Move the annotation `key` to `annotation`.
  pub fn set_annotation(&mut self, key: &str, annotation: &Range) -> Result<()> {
    let current = self
      .value()
      .annotation(key)
      .ok_or_else(|| OperationError::AnnotationMissing { key: key.to_string() })?;
    if current == annotation {
      return Ok(());
    }
    let (properties, new_properties) = RangePatch::diff(current, annotation);
    self.without_normalizing(|editor| {
      editor.apply(Operation::SetAnnotation {
        key: key.to_string(),
        properties,
        new_properties,
      })
    })
  }

  /// Set document-level data; a `null` value removes the key.
  pub fn set_data(&mut self, properties: Properties) -> Result<()> {
    let old = properties
      .keys()
      .map(|key| {
        let value = self
          .value()
          .data()
          .get(key)
          .cloned()
          .unwrap_or(serde_json::Value::Null);
        (key.clone(), value)
      })
      .collect();
    self.without_normalizing(|editor| {
      editor.apply(Operation::SetValue {
        properties:     old,
        new_properties: properties,
      })
    })
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{
    config::{
      Config,
      SchemaConfig,
    },
    value::Value,
  };

  fn paragraph(text: &str) -> Node {
    Node::element(vec![Node::text(text)])
  }

  fn editor_at(children: Vec<Node>, selection: Range) -> Editor {
    Editor::new(Value::new(children).with_selection(selection))
  }

  fn cursor<const N: usize>(path: [usize; N], offset: usize) -> Range {
    Range::collapsed(Point::new(path, offset))
  }

  fn texts(editor: &Editor) -> Vec<String> {
    editor
      .value()
      .children()
      .iter()
      .map(Node::string)
      .collect()
  }

  #[test]
  fn select_emits_only_changed_points() {
    let mut editor = editor_at(vec![paragraph("abc")], cursor([0, 0], 1));
    editor
      .select(Range::new(Point::new([0, 0], 1), Point::new([0, 0], 3)))
      .unwrap();
    assert_eq!(editor.operations(), &[Operation::SetSelection {
      properties:     Some(RangePatch {
        anchor: None,
        focus:  Some(Point::new([0, 0], 1)),
      }),
      new_properties: Some(RangePatch {
        anchor: None,
        focus:  Some(Point::new([0, 0], 3)),
      }),
    }]);

    editor.collapse(Edge::End).unwrap();
    assert_eq!(editor.value().selection(), Some(&cursor([0, 0], 3)));
    editor.deselect().unwrap();
    assert_eq!(editor.value().selection(), None);
    assert!(matches!(
      editor.set_selection_patch(RangePatch {
        anchor: Some(Point::new([0, 0], 0)),
        focus:  None,
      }),
      Err(EditorError::Operation(OperationError::IncompleteSelection))
    ));
  }

  #[test]
  fn insert_text_moves_the_cursor() {
    let mut editor = editor_at(vec![paragraph("world")], cursor([0, 0], 0));
    editor.insert_text("Hi ").unwrap();
    assert_eq!(texts(&editor), vec!["Hi world"]);
    assert_eq!(editor.value().selection(), Some(&cursor([0, 0], 3)));

    let mut editor = Editor::new(Value::new(vec![paragraph("")]));
    assert!(matches!(editor.insert_text("x"), Err(EditorError::NoSelection)));
  }

  #[test]
  fn insert_text_replaces_an_expanded_selection() {
    let mut editor = editor_at(
      vec![paragraph("one"), paragraph("two")],
      Range::new(Point::new([1, 0], 1), Point::new([0, 0], 1)),
    );
    editor.insert_text("X").unwrap();
    assert_eq!(texts(&editor), vec!["oXwo"]);
    assert_eq!(editor.value().selection(), Some(&cursor([0, 0], 2)));
  }

  #[test]
  fn delete_fragment_across_blocks() {
    let mut editor = editor_at(
      vec![paragraph("alpha"), paragraph("beta"), paragraph("gamma")],
      Range::new(Point::new([0, 0], 2), Point::new([2, 0], 3)),
    );
    editor.delete_fragment().unwrap();
    assert_eq!(editor.value().children(), &[paragraph("alma")]);
    assert_eq!(editor.value().selection(), Some(&cursor([0, 0], 2)));
  }

  #[test]
  fn delete_fragment_keeps_formatting_apart() {
    let mut editor = editor_at(
      vec![
        Node::element(vec![Node::text("ab").with_property("bold", true)]),
        paragraph("cd"),
      ],
      Range::new(Point::new([0, 0], 1), Point::new([1, 0], 1)),
    );
    editor.delete_fragment().unwrap();
    assert_eq!(editor.value().children(), &[Node::element(vec![
      Node::text("a").with_property("bold", true),
      Node::text("d"),
    ])]);
  }

  #[test]
  fn delete_backward_and_forward() {
    let mut editor = editor_at(vec![paragraph("ab"), paragraph("cd")], cursor([1, 0], 1));
    editor.delete_backward().unwrap();
    assert_eq!(texts(&editor), vec!["ab", "d"]);

    // At the start of a block the blocks merge.
    editor.delete_backward().unwrap();
    assert_eq!(editor.value().children(), &[paragraph("abd")]);
    assert_eq!(editor.value().selection(), Some(&cursor([0, 0], 2)));

    editor.delete_forward().unwrap();
    assert_eq!(texts(&editor), vec!["ab"]);
    // Nothing after the end of the document.
    editor.delete_forward().unwrap();
    assert_eq!(texts(&editor), vec!["ab"]);
  }

  #[test]
  fn node_commands() {
    let mut editor = Editor::new(Value::new(vec![paragraph("a"), paragraph("b")]));
    editor.move_node(&Path::from([0]), &Path::from([1])).unwrap();
    assert_eq!(texts(&editor), vec!["b", "a"]);

    editor.merge_node(&Path::from([1])).unwrap();
    assert_eq!(editor.value().children(), &[Node::element(vec![Node::text("ba")])]);

    editor
      .without_normalizing(|editor| {
        editor.split_node(&Path::from([0, 0]), 1)?;
        editor.split_node(&Path::from([0]), 1)
      })
      .unwrap();
    assert_eq!(texts(&editor), vec!["b", "a"]);

    editor
      .set_node(&Path::from([1]), [("type".to_string(), json!("quote"))].into())
      .unwrap();
    assert_eq!(editor.operations().last(), Some(&Operation::SetNode {
      path:           Path::from([1]),
      properties:     [("type".to_string(), json!(null))].into(),
      new_properties: [("type".to_string(), json!("quote"))].into(),
    }));

    editor.remove_node(&Path::from([0])).unwrap();
    assert_eq!(editor.value().children(), &[
      paragraph("a").with_property("type", "quote")
    ]);
  }

  #[test]
  fn split_node_at_splits_ancestors() {
    let mut editor = Editor::new(Value::new(vec![Node::element(vec![paragraph("word")])]));
    let right = editor
      .split_node_at(&Point::new([0, 0, 0], 2), 1)
      .unwrap();
    assert_eq!(right, Path::from([0, 1]));
    assert_eq!(editor.value().children(), &[Node::element(vec![
      paragraph("wo"),
      paragraph("rd"),
    ])]);
  }

  #[test]
  fn marks_split_the_edge_texts() {
    let mut editor = editor_at(
      vec![paragraph("hello")],
      Range::new(Point::new([0, 0], 1), Point::new([0, 0], 4)),
    );
    editor.add_mark(Mark::new("bold", true)).unwrap();
    assert_eq!(editor.value().children(), &[Node::element(vec![
      Node::text("h"),
      Node::text("ell").with_property("bold", true),
      Node::text("o"),
    ])]);
    assert_eq!(
      editor.value().selection(),
      Some(&Range::new(Point::new([0, 1], 0), Point::new([0, 1], 3)))
    );

    editor.toggle_mark(Mark::new("bold", true)).unwrap();
    assert_eq!(editor.value().children(), &[paragraph("hello")]);
  }

  #[test]
  fn marks_ignore_collapsed_selections() {
    let mut editor = editor_at(vec![paragraph("hello")], cursor([0, 0], 2));
    editor.add_mark(Mark::new("bold", true)).unwrap();
    assert!(editor.operations().is_empty());
  }

  #[test]
  fn void_text_is_not_editable() {
    let config = Config {
      schema: SchemaConfig {
        void: vec!["image".into()],
        ..Default::default()
      },
      ..Default::default()
    };
    let value = Value::new(vec![paragraph("").with_property("type", "image")])
      .with_selection(cursor([0, 0], 0));
    let mut editor = Editor::with_config(value, config);
    editor.insert_text("x").unwrap();
    assert!(editor.operations().is_empty());
  }

  #[test]
  fn annotations_and_data() {
    let mut editor = Editor::new(Value::new(vec![paragraph("abc")]));
    editor.add_annotation("comment", cursor([0, 0], 1)).unwrap();
    editor
      .set_annotation(
        "comment",
        &Range::new(Point::new([0, 0], 1), Point::new([0, 0], 2)),
      )
      .unwrap();
    assert_eq!(
      editor.value().annotation("comment"),
      Some(&Range::new(Point::new([0, 0], 1), Point::new([0, 0], 2)))
    );
    editor.remove_annotation("comment").unwrap();
    assert!(editor.value().annotations().is_empty());
    assert!(matches!(
      editor.remove_annotation("comment"),
      Err(EditorError::Operation(OperationError::AnnotationMissing { .. }))
    ));

    editor
      .set_data([("title".to_string(), json!("Notes"))].into())
      .unwrap();
    assert_eq!(editor.value().data().get("title"), Some(&json!("Notes")));
  }
}

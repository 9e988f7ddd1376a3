//! End-to-end behaviour of the editor, through its public API only.

use serde_json::json;
use the_doc::{
  Editor,
  Node,
  Operation,
  Path,
  Point,
  Range,
  Value,
  history::{
    HistoryEditor,
    should_merge,
  },
};

fn paragraph(text: &str) -> Node {
  Node::element(vec![Node::text(text)])
}

fn cursor<const N: usize>(path: [usize; N], offset: usize) -> Range {
  Range::collapsed(Point::new(path, offset))
}

#[test]
fn insert_text_shifts_the_selection() {
  let value = Value::new(vec![paragraph("world")]).with_selection(Range::new(
    Point::new([0, 0], 0),
    Point::new([0, 0], 2),
  ));
  let mut editor = Editor::new(value);
  editor
    .apply(Operation::InsertText {
      path:   Path::from([0, 0]),
      offset: 0,
      text:   "Hi ".into(),
    })
    .unwrap();

  assert_eq!(editor.value().children(), &[paragraph("Hi world")]);
  assert_eq!(
    editor.value().selection(),
    Some(&Range::new(Point::new([0, 0], 3), Point::new([0, 0], 5)))
  );
}

#[test]
fn split_text_moves_the_cursor_to_the_right_half() {
  let mut value = Value::new(vec![paragraph("word")]).with_selection(cursor([0, 0], 3));
  value
    .apply_operation(&Operation::SplitNode {
      path:       Path::from([0, 0]),
      position:   2,
      properties: Default::default(),
    })
    .unwrap();

  assert_eq!(value.children(), &[Node::element(vec![
    Node::text("wo"),
    Node::text("rd"),
  ])]);
  assert_eq!(value.selection(), Some(&cursor([0, 1], 1)));

  // Through the editor, the halves only survive normalization when their
  // marks differ.
  let mut editor = Editor::new(Value::new(vec![paragraph("word")]));
  editor
    .apply(Operation::SplitNode {
      path:       Path::from([0, 0]),
      position:   2,
      properties: [("bold".to_string(), json!(true))].into(),
    })
    .unwrap();
  assert_eq!(editor.value().children(), &[Node::element(vec![
    Node::text("wo"),
    Node::text("rd").with_property("bold", true),
  ])]);
}

#[test]
fn removing_the_selected_block_reanchors_the_selection() {
  let remove = |editor: &mut Editor, index: usize| {
    let node = editor.value().children()[index].clone();
    editor
      .apply(Operation::RemoveNode {
        path: Path::from([index]),
        node,
      })
      .unwrap();
  };

  // Nothing before it, so the start of the following text.
  let value = Value::new(vec![paragraph("one"), paragraph("two")]).with_selection(cursor([0, 0], 2));
  let mut editor = Editor::new(value);
  remove(&mut editor, 0);
  assert_eq!(editor.value().selection(), Some(&cursor([0, 0], 0)));

  // The end of the preceding text wins when there is one.
  let value = Value::new(vec![paragraph("one"), paragraph("two")]).with_selection(cursor([1, 0], 2));
  let mut editor = Editor::new(value);
  remove(&mut editor, 1);
  assert_eq!(editor.value().selection(), Some(&cursor([0, 0], 3)));

  // No text left at all.
  remove(&mut editor, 0);
  assert!(editor.value().children().is_empty());
  assert_eq!(editor.value().selection(), None);
}

#[test]
fn contiguous_inserts_stay_separate_operations_but_one_undo() {
  let value = Value::new(vec![paragraph("")]).with_selection(cursor([0, 0], 0));
  let mut history = HistoryEditor::new(Editor::new(value));

  let first = Operation::InsertText {
    path:   Path::from([0, 0]),
    offset: 0,
    text:   "ab".into(),
  };
  let second = Operation::InsertText {
    path:   Path::from([0, 0]),
    offset: 2,
    text:   "c".into(),
  };
  assert!(should_merge(&second, Some(&first)));

  history.apply(first).unwrap();
  history.flush();
  history.apply(second).unwrap();
  let change = history.flush().unwrap();
  assert_eq!(change.operations.len(), 1);
  assert_eq!(history.undos().len(), 1);
  assert_eq!(history.undos()[0].operations.len(), 2);

  history.undo().unwrap();
  assert_eq!(history.editor().value().document().string(), "");
}

#[test]
fn nested_moves_round_trip() {
  let value = Value::new(vec![Node::element(vec![
    paragraph("a"),
    paragraph("b"),
    Node::element(vec![paragraph("c0"), paragraph("c1")]),
    paragraph("d"),
  ])]);

  for (from, to) in [
    (Path::from([0, 2, 1]), Path::from([0, 2])),
    (Path::from([0, 2]), Path::from([0, 1])),
    (Path::from([0, 0]), Path::from([0, 2, 1])),
  ] {
    let op = Operation::MoveNode {
      path:     from,
      new_path: to,
    };
    let mut moved = value.clone();
    moved.apply_operation(&op).unwrap();
    assert_ne!(moved, value);
    moved.apply_operation(&op.inverse()).unwrap();
    assert_eq!(moved, value, "{op:?}");
  }
}

#[test]
fn json_shape() {
  let source = json!({
    "children": [
      {
        "type": "paragraph",
        "children": [{ "text": "hi", "bold": true }, { "text": "!" }],
      },
    ],
    "selection": {
      "anchor": { "path": [0, 0], "offset": 0 },
      "focus": { "path": [0, 1], "offset": 1 },
    },
    "annotations": {
      "comment": {
        "anchor": { "path": [0, 0], "offset": 1 },
        "focus": { "path": [0, 0], "offset": 2 },
      },
    },
    "title": "Notes",
  });

  let value: Value = serde_json::from_value(source.clone()).unwrap();
  assert_eq!(value.children(), &[Node::element(vec![
    Node::text("hi").with_property("bold", true),
    Node::text("!"),
  ])
  .with_property("type", "paragraph")]);
  assert_eq!(value.data().get("title"), Some(&json!("Notes")));
  assert_eq!(
    value.annotation("comment"),
    Some(&Range::new(Point::new([0, 0], 1), Point::new([0, 0], 2)))
  );
  assert_eq!(serde_json::to_value(&value).unwrap(), source);
}

#[test]
fn operation_logs_are_validated_before_decoding() {
  let log = json!([
    { "type": "insert_text", "path": [0, 0], "offset": 0, "text": "x" },
    { "type": "set_selection", "properties": null, "newProperties": null },
  ]);
  assert!(the_doc::operation::is_operation_list(&log));
  assert!(!the_doc::operation::is_operation_list(&json!([{ "type": "insert_text" }])));

  let ops: Vec<Operation> = serde_json::from_value(log).unwrap();
  assert_eq!(ops[0].kind(), "insert_text");
}

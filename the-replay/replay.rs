use std::{
  fs,
  path::Path,
  sync::Arc,
};

use eyre::{
  Result,
  WrapErr,
  bail,
};
use the_doc::{
  Editor,
  Operation,
  Value,
  config::Config,
  normalize::NormalizeOptions,
  operation::{
    is_operation,
    is_operation_list,
  },
};
use tracing::{
  debug,
  info,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
  pub invert:          bool,
  pub force_normalize: bool,
}

#[derive(Debug)]
pub struct Outcome {
  pub value:   Arc<Value>,
  /// Operations from the log.
  pub applied: usize,
  /// Operations normalization added on top of them.
  pub repairs: usize,
}

pub fn read_json(path: &Path) -> Result<serde_json::Value> {
  let source =
    fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))?;
  serde_json::from_str(&source).wrap_err_with(|| format!("{} is not valid JSON", path.display()))
}

/// Check the shape of every entry, then decode the log.
pub fn decode_log(log: serde_json::Value) -> Result<Vec<Operation>> {
  if !is_operation_list(&log) {
    let Some(items) = log.as_array() else {
      bail!("the operation log must be a JSON array");
    };
    if let Some(index) = items.iter().position(|item| !is_operation(item)) {
      bail!("entry {index} of the operation log is not an operation");
    }
  }
  serde_json::from_value(log).wrap_err("failed to decode the operation log")
}

pub fn run(
  value: Value,
  operations: Vec<Operation>,
  config: Config,
  options: Options,
) -> Result<Outcome> {
  let mut editor = Editor::with_config(value, config);
  if options.force_normalize {
    editor.normalize(NormalizeOptions { force: true })?;
  }
  editor.flush();
  let start = editor.snapshot();

  let count = operations.len();
  for (index, op) in operations.into_iter().enumerate() {
    debug!(index, op = op.kind(), "replay");
    editor
      .apply(op)
      .wrap_err_with(|| format!("operation {index} could not be applied"))?;
  }
  let applied = editor
    .flush()
    .map(|change| change.operations)
    .unwrap_or_default();
  let repairs = applied.len().saturating_sub(count);
  let value = editor.snapshot();
  info!(operations = count, repairs, "replayed");

  if options.invert {
    editor
      .without_normalizing(|editor| editor.apply_all(applied.iter().rev().map(Operation::inverse)))
      .wrap_err("the inverted log could not be applied")?;
    if editor.value().document() != start.document() {
      bail!("the inverted log did not restore the document");
    }
    info!("round trip verified");
  }

  Ok(Outcome {
    value,
    applied: count,
    repairs,
  })
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use serde_json::json;
  use the_doc::Node;

  use super::*;

  fn document() -> Value {
    serde_json::from_value(json!({
      "children": [
        { "children": [{ "text": "one" }] },
        { "children": [{ "text": "two" }] },
      ],
    }))
    .unwrap()
  }

  #[test]
  fn replays_and_inverts() {
    let log = decode_log(json!([
      { "type": "insert_text", "path": [0, 0], "offset": 3, "text": "!" },
      { "type": "move_node", "path": [1], "newPath": [0] },
      { "type": "merge_node", "path": [1], "position": 1, "properties": {} },
    ]))
    .unwrap();

    let outcome = run(document(), log, Config::default(), Options {
      invert:          true,
      force_normalize: false,
    })
    .unwrap();
    assert_eq!(outcome.applied, 3);
    // The two texts end up adjacent with the same marks, and are merged.
    assert_eq!(outcome.repairs, 1);
    assert_eq!(outcome.value.children(), &[Node::element(vec![Node::text(
      "twoone!"
    )])]);
  }

  #[test]
  fn rejects_malformed_logs() {
    let err = decode_log(json!({ "type": "insert_text" })).unwrap_err();
    assert!(err.to_string().contains("JSON array"));

    let err = decode_log(json!([
      { "type": "insert_text", "path": [0, 0], "offset": 0, "text": "x" },
      { "type": "insert_text", "path": [0, 0] },
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("entry 1"));
  }

  #[test]
  fn failed_operations_name_their_index() {
    let log = decode_log(json!([
      { "type": "remove_text", "path": [0, 0], "offset": 0, "text": "nope" },
    ]))
    .unwrap();
    let err = run(document(), log, Config::default(), Options::default()).unwrap_err();
    assert!(err.to_string().contains("operation 0"));
  }

  #[test]
  fn reads_json_files() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[]").unwrap();
    assert_eq!(read_json(file.path()).unwrap(), json!([]));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{").unwrap();
    assert!(read_json(file.path()).is_err());
  }
}

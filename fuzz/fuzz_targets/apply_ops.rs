#![no_main]

mod common;

use std::mem;

use libfuzzer_sys::fuzz_target;
use the_doc::{
  Editor,
  normalize::NormalizeOptions,
};

use crate::common::{
  fill_payload,
  session_from_bytes,
};

fuzz_target!(|data: &[u8]| {
  let Some(mut session) = session_from_bytes(data) else {
    return;
  };

  // Every operation that applies cleanly must be undone by its inverse.
  let mut value = session.value.clone();
  for op in &session.ops {
    let op = &fill_payload(&value, op.clone());
    let before = value.clone();
    if value.apply_operation(op).is_err() {
      value = before;
      continue;
    }
    let mut undone = value.clone();
    undone.apply_operation(&op.inverse()).unwrap();
    assert_eq!(undone.document(), before.document(), "{op:?}");
  }

  // Through the editor, normalization must always settle.
  let mut editor = Editor::new(mem::take(&mut session.value));
  editor.normalize(NormalizeOptions { force: true }).unwrap();
  for op in mem::take(&mut session.ops) {
    let _ = editor.apply(op);
  }
  editor.normalize(NormalizeOptions { force: true }).unwrap();
});

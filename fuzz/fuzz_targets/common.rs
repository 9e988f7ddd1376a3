use the_doc::{
  Node,
  Operation,
  Path,
  Point,
  Range,
  Value,
  node::Mark,
};

const MAX_BLOCKS: usize = 4;
const MAX_OPS: usize = 64;
const OP_BYTES: usize = 4;

pub struct Session {
  pub value: Value,
  pub ops:   Vec<Operation>,
}

fn text(byte: u8) -> Node {
  let content = &"lorem ipsum dolör"[..(byte as usize % 6)];
  let node = Node::text(content);
  if byte & 0x80 != 0 {
    node.with_property("bold", true)
  } else {
    node
  }
}

fn path(a: u8, b: u8, depth: u8) -> Path {
  match depth % 3 {
    0 => Path::from([a as usize % MAX_BLOCKS]),
    1 => Path::from([a as usize % MAX_BLOCKS, b as usize % 4]),
    _ => Path::root(),
  }
}

/// Decode four bytes into an operation. Most of them will not fit the
/// document; those are rejected when applied.
fn operation(bytes: &[u8]) -> Operation {
  let [kind, a, b, c] = [bytes[0], bytes[1], bytes[2], bytes[3]];
  let at = path(a, b, c);
  let leaf = Path::from([a as usize % MAX_BLOCKS, b as usize % 4]);
  let offset = c as usize % 8;
  match kind % 10 {
    0 => {
      Operation::InsertText {
        path: leaf,
        offset,
        text: "zß".into(),
      }
    },
    1 => {
      Operation::RemoveText {
        path: leaf,
        offset,
        text: "o".into(),
      }
    },
    2 => {
      Operation::InsertNode {
        path: at,
        node: text(c),
      }
    },
    3 => {
      Operation::RemoveNode {
        path: at,
        node: text(c),
      }
    },
    4 => {
      Operation::SplitNode {
        path:       at,
        position:   offset,
        properties: Default::default(),
      }
    },
    5 => {
      Operation::MergeNode {
        path:       at,
        position:   offset,
        properties: Default::default(),
      }
    },
    6 => {
      Operation::MoveNode {
        path:     at,
        new_path: path(b, c, a),
      }
    },
    7 => {
      Operation::AddMark {
        path: leaf,
        mark: Mark::new("italic", true),
      }
    },
    8 => {
      Operation::SetSelection {
        properties:     None,
        new_properties: Some(Range::collapsed(Point::new(leaf, offset)).into()),
      }
    },
    _ => {
      Operation::SetNode {
        path:           at,
        properties:     Default::default(),
        new_properties: [("level".to_string(), (c as u64).into())].into(),
      }
    },
  }
}

/// Fill in the payload fields that must mirror the document for the
/// operation to be invertible.
pub fn fill_payload(value: &Value, op: Operation) -> Operation {
  let root = value.document();
  match op {
    Operation::RemoveNode { path, node } => {
      let node = root.get(&path).cloned().unwrap_or(node);
      Operation::RemoveNode { path, node }
    },
    Operation::MergeNode {
      path,
      position,
      properties,
    } => {
      let prev = path.previous().ok().and_then(|prev| root.get(&prev).ok());
      let node = root.get(&path).ok();
      match (prev, node) {
        (Some(prev), Some(node)) => {
          Operation::MergeNode {
            position: prev.size(),
            properties: node.extract_props(),
            path,
          }
        },
        _ => {
          Operation::MergeNode {
            path,
            position,
            properties,
          }
        },
      }
    },
    Operation::SetNode {
      path,
      new_properties,
      ..
    } => {
      let current = root.get(&path).map(|node| node.properties().clone()).unwrap_or_default();
      let properties = new_properties
        .keys()
        .map(|key| (key.clone(), current.get(key).cloned().unwrap_or_default()))
        .collect();
      Operation::SetNode {
        path,
        properties,
        new_properties,
      }
    },
    op => op,
  }
}

pub fn session_from_bytes(data: &[u8]) -> Option<Session> {
  let (&blocks, rest) = data.split_first()?;
  let blocks = 1 + blocks as usize % MAX_BLOCKS;
  if rest.len() < blocks {
    return None;
  }
  let (seeds, script) = rest.split_at(blocks);
  let children = seeds
    .iter()
    .map(|&seed| Node::element(vec![text(seed), text(seed.rotate_left(3))]))
    .collect();

  let ops = script
    .chunks_exact(OP_BYTES)
    .take(MAX_OPS)
    .map(operation)
    .collect();
  Some(Session {
    value: Value::new(children),
    ops,
  })
}

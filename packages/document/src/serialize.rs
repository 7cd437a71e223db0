//! # Document Serialization
//!
//! Tree ⇄ JSON. The serialized form is what the persistence service stores
//! as the opaque `serializedDocument` string: a `root` object where every
//! node is `{type, version, ...fields, children}`.
//!
//! Deserialization fails closed at the node level: missing or malformed
//! fields default, and an unrecognized `type` becomes an opaque
//! [`Node::Unknown`] that round-trips its raw JSON untouched. Only
//! JSON-syntax errors surface to the caller; a document that parses as JSON
//! always opens.

use serde_json::{json, Map, Value};

use crate::error::DocumentError;
use crate::key::NodeKey;
use crate::node::{Node, NodeKind};
use crate::tree::DocumentTree;

/// Schema version stamped on every serialized node.
const NODE_VERSION: u64 = 1;

/// Serialize the whole tree to its JSON document form.
pub fn serialize_document(tree: &DocumentTree) -> Value {
    json!({ "root": export_node(tree, tree.root()) })
}

/// Serialize to the string stored in the `serializedDocument` column.
pub fn serialize_string(tree: &DocumentTree) -> String {
    serialize_document(tree).to_string()
}

/// Deserialize a JSON document value. Never fails; malformed parts degrade
/// per the fail-closed rules above.
pub fn deserialize_document(value: &Value) -> DocumentTree {
    let mut tree = DocumentTree::new();
    let root = tree.root();

    // Drop the placeholder paragraph `DocumentTree::new` seeds.
    for child in tree.children(root).to_vec() {
        tree.remove(child).ok();
    }

    if let Some(children) = value
        .get("root")
        .and_then(|r| r.get("children"))
        .and_then(Value::as_array)
    {
        for child in children {
            import_node(&mut tree, root, child);
        }
    }

    // A document must never open empty.
    if tree.children(root).is_empty() {
        let paragraph = tree.create(Node::Paragraph);
        tree.append_child(root, paragraph).expect("root is a container");
    }

    tree
}

/// Deserialize from the persisted string form.
pub fn deserialize_str(raw: &str) -> Result<DocumentTree, DocumentError> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(deserialize_document(&value))
}

fn export_node(tree: &DocumentTree, key: NodeKey) -> Value {
    let node = match tree.node(key) {
        Some(node) => node,
        None => return Value::Null,
    };

    // Unknown nodes are emitted back verbatim so foreign data survives a
    // load/save cycle.
    if let Node::Unknown { raw } = node {
        return raw.clone();
    }

    let mut obj = Map::new();
    obj.insert("type".to_string(), json!(node.kind().type_name()));
    obj.insert("version".to_string(), json!(NODE_VERSION));

    match node {
        Node::Text { text } => {
            obj.insert("text".to_string(), json!(text));
        }
        Node::Word {
            word,
            translations,
            database_id,
            auto_fill,
        } => {
            obj.insert("word".to_string(), json!(word));
            obj.insert("translations".to_string(), json!(translations));
            obj.insert("databaseId".to_string(), json!(database_id));
            obj.insert("isAutoFill".to_string(), json!(auto_fill));
        }
        Node::Sentence {
            translation,
            database_id,
            show_translation,
        } => {
            obj.insert("translation".to_string(), json!(translation));
            obj.insert("databaseId".to_string(), json!(database_id));
            obj.insert("showTranslation".to_string(), json!(show_translation));
        }
        Node::GrammarPointContainer { database_id, open } => {
            obj.insert("databaseId".to_string(), json!(database_id));
            obj.insert("open".to_string(), json!(open));
        }
        Node::Image { src, alt } => {
            obj.insert("src".to_string(), json!(src));
            obj.insert("alt".to_string(), json!(alt));
        }
        Node::Remark { text } => {
            obj.insert("text".to_string(), json!(text));
        }
        _ => {}
    }

    if node.is_container() {
        let children: Vec<Value> = tree
            .children(key)
            .iter()
            .map(|&child| export_node(tree, child))
            .collect();
        obj.insert("children".to_string(), Value::Array(children));
    }

    Value::Object(obj)
}

/// Import one serialized node (and its subtree) as a child of `parent`.
fn import_node(tree: &mut DocumentTree, parent: NodeKey, value: &Value) {
    let type_name = value.get("type").and_then(Value::as_str);

    let kind = match type_name.and_then(NodeKind::from_type_name) {
        Some(kind) => kind,
        None => {
            // Unrecognized or missing type: keep the raw JSON opaque,
            // children included.
            let key = tree.create(Node::Unknown { raw: value.clone() });
            tree.append_child(parent, key).ok();
            return;
        }
    };

    let node = match kind {
        NodeKind::Root => Node::Paragraph, // a nested "root" is not a root
        NodeKind::Paragraph => Node::Paragraph,
        NodeKind::Text => Node::Text {
            text: str_field(value, "text"),
        },
        NodeKind::Word => Node::Word {
            word: str_field(value, "word"),
            translations: str_list_field(value, "translations"),
            database_id: opt_str_field(value, "databaseId"),
            auto_fill: bool_field(value, "isAutoFill"),
        },
        NodeKind::Sentence => Node::Sentence {
            translation: str_field(value, "translation"),
            database_id: opt_str_field(value, "databaseId"),
            show_translation: bool_field(value, "showTranslation"),
        },
        NodeKind::SentenceToggle => Node::SentenceToggle,
        NodeKind::GrammarPointContainer => Node::GrammarPointContainer {
            database_id: opt_str_field(value, "databaseId"),
            open: bool_field(value, "open"),
        },
        NodeKind::GrammarPointTitle => Node::GrammarPointTitle,
        NodeKind::GrammarPointContent => Node::GrammarPointContent,
        NodeKind::DialogueContainer => Node::DialogueContainer,
        NodeKind::DialogueSpeaker => Node::DialogueSpeaker,
        NodeKind::DialogueSpeech => Node::DialogueSpeech,
        NodeKind::SplitLayoutContainer => Node::SplitLayoutContainer,
        NodeKind::SplitLayoutColumn => Node::SplitLayoutColumn,
        NodeKind::Image => Node::Image {
            src: str_field(value, "src"),
            alt: str_field(value, "alt"),
        },
        NodeKind::Remark => Node::Remark {
            text: str_field(value, "text"),
        },
        NodeKind::Unknown => unreachable!("from_type_name never yields Unknown"),
    };

    let is_container = node.is_container();
    let key = tree.create(node);
    if tree.append_child(parent, key).is_err() {
        return;
    }

    if is_container {
        if let Some(children) = value.get("children").and_then(Value::as_array) {
            for child in children {
                import_node(tree, key, child);
            }
        }
    }
}

fn str_field(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn opt_str_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn bool_field(value: &Value, field: &str) -> bool {
    value.get(field).and_then(Value::as_bool).unwrap_or(false)
}

fn str_list_field(value: &Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reload(tree: &DocumentTree) -> DocumentTree {
        deserialize_document(&serialize_document(tree))
    }

    fn nodes_of(tree: &DocumentTree, kind: NodeKind) -> Vec<Node> {
        tree.keys_of_kind(kind)
            .into_iter()
            .map(|k| tree.node(k).unwrap().clone())
            .collect()
    }

    #[test]
    fn test_round_trip_every_variant() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let p = tree.first_child(root).unwrap();

        let word = tree.create(Node::Word {
            word: "casa".to_string(),
            translations: vec!["house".to_string(), "home".to_string()],
            database_id: Some("w1".to_string()),
            auto_fill: true,
        });
        tree.append_child(p, word).unwrap();

        let sentence = tree.create(Node::Sentence {
            translation: "I live here".to_string(),
            database_id: None,
            show_translation: true,
        });
        tree.append_child(p, sentence).unwrap();
        let st = tree.create(Node::Text {
            text: "vivo aquí".to_string(),
        });
        tree.append_child(sentence, st).unwrap();
        let toggle = tree.create(Node::SentenceToggle);
        tree.append_child(sentence, toggle).unwrap();

        let gp = tree.create(Node::GrammarPointContainer {
            database_id: Some("g1".to_string()),
            open: true,
        });
        tree.append_child(root, gp).unwrap();
        let title = tree.create(Node::GrammarPointTitle);
        tree.append_child(gp, title).unwrap();
        let content = tree.create(Node::GrammarPointContent);
        tree.append_child(gp, content).unwrap();

        let dialogue = tree.create(Node::DialogueContainer);
        tree.append_child(root, dialogue).unwrap();
        let speaker = tree.create(Node::DialogueSpeaker);
        tree.append_child(dialogue, speaker).unwrap();
        let speech = tree.create(Node::DialogueSpeech);
        tree.append_child(dialogue, speech).unwrap();

        let split = tree.create(Node::SplitLayoutContainer);
        tree.append_child(root, split).unwrap();
        for _ in 0..2 {
            let col = tree.create(Node::SplitLayoutColumn);
            tree.append_child(split, col).unwrap();
            let filler = tree.create(Node::Paragraph);
            tree.append_child(col, filler).unwrap();
        }

        let image = tree.create(Node::Image {
            src: "https://example.com/cat.png".to_string(),
            alt: "a cat".to_string(),
        });
        tree.append_child(root, image).unwrap();

        let remark = tree.create(Node::Remark {
            text: "needs review".to_string(),
        });
        tree.append_child(root, remark).unwrap();

        let reloaded = reload(&tree);

        // Same shape, same fields, every variant.
        assert_eq!(serialize_document(&tree), serialize_document(&reloaded));
        assert_eq!(
            nodes_of(&tree, NodeKind::Word),
            nodes_of(&reloaded, NodeKind::Word)
        );
        assert_eq!(
            nodes_of(&tree, NodeKind::Sentence),
            nodes_of(&reloaded, NodeKind::Sentence)
        );
        assert_eq!(
            nodes_of(&tree, NodeKind::GrammarPointContainer),
            nodes_of(&reloaded, NodeKind::GrammarPointContainer)
        );
    }

    #[test]
    fn test_word_round_trip_without_database_id() {
        // Insert a word with translations and no persisted id; reload must
        // restore identical word/translations and still no id.
        let mut tree = DocumentTree::new();
        let p = tree.first_child(tree.root()).unwrap();
        let word = tree.create(Node::Word {
            word: "casa".to_string(),
            translations: vec!["house".to_string()],
            database_id: None,
            auto_fill: false,
        });
        tree.append_child(p, word).unwrap();

        let reloaded = reload(&tree);
        let words = nodes_of(&reloaded, NodeKind::Word);
        assert_eq!(words.len(), 1);
        assert_eq!(
            words[0],
            Node::Word {
                word: "casa".to_string(),
                translations: vec!["house".to_string()],
                database_id: None,
                auto_fill: false,
            }
        );
    }

    #[test]
    fn test_missing_fields_fail_closed() {
        let value = json!({
            "root": {
                "type": "root",
                "children": [
                    { "type": "paragraph", "children": [
                        { "type": "word" },
                        { "type": "text", "text": 42 }
                    ]}
                ]
            }
        });

        let tree = deserialize_document(&value);
        let words = nodes_of(&tree, NodeKind::Word);
        assert_eq!(
            words[0],
            Node::Word {
                word: String::new(),
                translations: vec![],
                database_id: None,
                auto_fill: false,
            }
        );
        let texts = nodes_of(&tree, NodeKind::Text);
        assert_eq!(texts[0], Node::Text { text: String::new() });
    }

    #[test]
    fn test_unknown_type_round_trips_verbatim() {
        let foreign = json!({
            "type": "hologram",
            "version": 9,
            "payload": { "nested": [1, 2, 3] }
        });
        let value = json!({
            "root": { "type": "root", "children": [foreign.clone()] }
        });

        let tree = deserialize_document(&value);
        let unknown = nodes_of(&tree, NodeKind::Unknown);
        assert_eq!(unknown.len(), 1);

        // Saving again emits the foreign node untouched.
        let saved = serialize_document(&tree);
        assert_eq!(saved["root"]["children"][0], foreign);
    }

    #[test]
    fn test_empty_or_garbage_document_still_opens() {
        let tree = deserialize_document(&json!({}));
        assert_eq!(tree.children(tree.root()).len(), 1);
        assert_eq!(
            tree.kind(tree.first_child(tree.root()).unwrap()),
            Some(NodeKind::Paragraph)
        );

        let tree = deserialize_document(&json!({ "root": { "children": "nope" } }));
        assert_eq!(tree.children(tree.root()).len(), 1);

        assert!(deserialize_str("{ not json").is_err());
    }

    #[test]
    fn test_string_form_round_trip() {
        let mut tree = DocumentTree::new();
        let p = tree.first_child(tree.root()).unwrap();
        let t = tree.create(Node::Text {
            text: "hello".to_string(),
        });
        tree.append_child(p, t).unwrap();

        let raw = serialize_string(&tree);
        let reloaded = deserialize_str(&raw).unwrap();
        assert_eq!(serialize_string(&reloaded), raw);
    }
}

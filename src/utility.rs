//! Path resolution and structural helpers over any layer
//!
//! Paths are dotted (`a.b.3.c`). Empty tokens are ignored, so `".a..b."`
//! and `"a.b"` address the same node. A token indexes into a list only
//! when it is a plain decimal number.

use crate::encoding::Decode;
use crate::layer::{get_item, TypeFlag, ViewLayer};

/// Splits a dotted path into its non-empty tokens.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|token| !token.is_empty())
}

fn parse_index(token: &str) -> Option<usize> {
    if token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}

/// Walks `path` from `layer` and returns the node it reaches.
pub fn resolve_layer<'a, L: ViewLayer<'a>>(layer: L, path: &str) -> Option<L> {
    let mut cursor = layer;
    for token in split_path(path) {
        cursor = match cursor.type_flag() {
            TypeFlag::Object => cursor.find_member(token)?,
            TypeFlag::List => get_item(cursor, parse_index(token)?)?,
            _ => return None,
        };
    }
    Some(cursor)
}

/// Calls `callback` with the node at `path`, if the path resolves.
/// Returns whether the callback ran.
pub fn resolve<'a, L, F>(layer: L, path: &str, callback: F) -> bool
where
    L: ViewLayer<'a>,
    F: FnOnce(L),
{
    match resolve_layer(layer, path) {
        Some(found) => {
            callback(found);
            true
        }
        None => false,
    }
}

/// Like `resolve`, but only calls `callback` when the node at `path`
/// decodes as `T`.
pub fn safe_resolve<'a, T, L, F>(layer: L, path: &str, callback: F) -> bool
where
    T: Decode<'a>,
    L: ViewLayer<'a>,
    F: FnOnce(T),
{
    match resolve_layer(layer, path).and_then(T::safe_decode) {
        Some(value) => {
            callback(value);
            true
        }
        None => false,
    }
}

/// Calls `callback` with the value of the first member named `key`.
pub fn get_member<'a, L, F>(layer: L, key: &str, callback: F) -> bool
where
    L: ViewLayer<'a>,
    F: FnOnce(L),
{
    match layer.find_member(key) {
        Some(value) => {
            callback(value);
            true
        }
        None => false,
    }
}

/// Deep structural equality between two layers of possibly different
/// backing types.
///
/// Integers only equal integers and doubles only equal doubles. Objects
/// compare member by member in iteration order.
pub fn cmp_layers<'a, 'b, A, B>(left: A, right: B) -> bool
where
    A: ViewLayer<'a>,
    B: ViewLayer<'b>,
{
    let flag = left.type_flag();
    if flag != right.type_flag() {
        return false;
    }
    match flag {
        TypeFlag::Null => true,
        TypeFlag::Boolean => left.get_bool() == right.get_bool(),
        TypeFlag::Integer => left.get_int() == right.get_int(),
        TypeFlag::Double => left.get_double() == right.get_double(),
        TypeFlag::String => left.get_str() == right.get_str(),
        TypeFlag::List => {
            let mut lhs = left.iter_list();
            let mut rhs = right.iter_list();
            loop {
                match (lhs.next(), rhs.next()) {
                    (None, None) => return true,
                    (Some(a), Some(b)) if cmp_layers(a, b) => {}
                    _ => return false,
                }
            }
        }
        TypeFlag::Object => {
            let mut lhs = left.iter_members();
            let mut rhs = right.iter_members();
            loop {
                match (lhs.next(), rhs.next()) {
                    (None, None) => return true,
                    (Some((ka, va)), Some((kb, vb))) if ka == kb && cmp_layers(va, vb) => {}
                    _ => return false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Node;
    use serde_json::json;

    #[test]
    fn test_split_ignores_empty_tokens() {
        let tokens: Vec<&str> = split_path(".a..b.").collect();
        assert_eq!(tokens, vec!["a", "b"]);
        assert_eq!(split_path("...").count(), 0);
    }

    #[test]
    fn test_resolve_through_objects_and_lists() {
        let doc = json!({"a": {"b": [0, 1, 2, {"c": "leaf"}]}});

        let mut leaf = None;
        assert!(resolve(&doc, "a.b.3.c", |v| leaf = Some(v.get_string())));
        assert_eq!(leaf.as_deref(), Some("leaf"));

        assert!(resolve_layer(&doc, "..a..b..3..c..").is_some());
        assert!(resolve_layer(&doc, "a.b.4.c").is_none());
        assert!(resolve_layer(&doc, "a.b.-1").is_none());
        assert!(resolve_layer(&doc, "a.b.+1").is_none());
        assert!(resolve_layer(&doc, "a.b.0.x").is_none());
        assert!(!resolve(&doc, "a.missing", |_| panic!("must not be called")));
    }

    #[test]
    fn test_empty_path_yields_root() {
        let doc = json!(7);
        assert_eq!(resolve_layer(&doc, "").map(|v| v.get_int()), Some(7));
    }

    #[test]
    fn test_safe_resolve_checks_leaf_variant() {
        let doc = json!({"port": 8080, "host": "localhost"});
        let mut port = 0;
        assert!(safe_resolve(&doc, "port", |v: i64| port = v));
        assert_eq!(port, 8080);
        assert!(!safe_resolve(&doc, "host", |_: i64| panic!("wrong variant")));
    }

    #[test]
    fn test_get_member() {
        let doc = json!({"name": "garlic"});
        assert!(get_member(&doc, "name", |v| assert_eq!(v.get_str(), "garlic")));
        assert!(!get_member(&doc, "other", |_| {}));
    }

    #[test]
    fn test_cmp_layers() {
        let json = json!({"a": [1, 2.0, "x", null, true]});
        let node = Node::from_layer(&json);
        assert!(cmp_layers(&json, &node));

        assert!(!cmp_layers(&json!(1), &json!(1.0)));
        assert!(!cmp_layers(&json!([1, 2]), &json!([1, 2, 3])));
        assert!(!cmp_layers(&json!({"a": 1, "b": 2}), &json!({"b": 2, "a": 1})));
    }
}

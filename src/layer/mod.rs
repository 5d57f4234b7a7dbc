//! Layer contract: one interface over JSON/YAML-like document trees
//!
//! A layer is a node in a tree holding exactly one of:
//! - null, boolean, 64-bit integer, 64-bit float, UTF-8 string
//! - an ordered list of layers
//! - an ordered mapping from string keys to layers
//!
//! `ViewLayer` is the read-only flavor, implemented by shared references
//! into a backing store. `RefLayer` is the mutable flavor, implemented by
//! the backing node type itself and used through `&mut`. Because a `&mut`
//! borrow excludes every view and iterator taken from the same node,
//! mutation can never leave a dangling sub-layer behind.
//!
//! Adapters:
//! - `serde_json::Value` (see `json`)
//! - `serde_yaml::Value` (see `yaml`)
//! - the built-in `Node` tree (see `node`)

pub mod json;
pub mod node;
pub mod yaml;

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::encoding::Encode;
use crate::text::Text;

pub use node::{Member, Node};

/// The variant a layer currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFlag {
    Null,
    Boolean,
    Integer,
    Double,
    String,
    List,
    Object,
}

impl TypeFlag {
    /// Returns the type name used in module descriptions
    pub fn type_name(&self) -> &'static str {
        match self {
            TypeFlag::Null => "null",
            TypeFlag::Boolean => "bool",
            TypeFlag::Integer => "integer",
            TypeFlag::Double => "double",
            TypeFlag::String => "string",
            TypeFlag::List => "list",
            TypeFlag::Object => "object",
        }
    }

    /// Parses a type name as written in module descriptions.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(TypeFlag::Null),
            "bool" | "boolean" => Some(TypeFlag::Boolean),
            "integer" | "int" => Some(TypeFlag::Integer),
            "double" | "float" => Some(TypeFlag::Double),
            "string" => Some(TypeFlag::String),
            "list" => Some(TypeFlag::List),
            "object" => Some(TypeFlag::Object),
            _ => None,
        }
    }
}

impl fmt::Display for TypeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Read-only access to a node of a document tree.
///
/// Implementors are cheap `Copy` handles (usually `&'a Backing`). Extractors
/// called on the wrong variant return the type's default value; callers are
/// expected to check the discriminator first.
///
/// Lists and objects iterate in insertion order, and two traversals of an
/// unmodified layer yield the same sequence.
pub trait ViewLayer<'a>: Copy + 'a {
    /// Iterator over list elements
    type ListIter: Iterator<Item = Self>;
    /// Iterator over object members as (key, value) pairs
    type MemberIter: Iterator<Item = (Text<'a>, Self)>;

    /// True when `element` is O(1).
    const RANDOM_ACCESS: bool = false;

    fn type_flag(&self) -> TypeFlag;

    fn is_null(&self) -> bool {
        self.type_flag() == TypeFlag::Null
    }

    fn is_bool(&self) -> bool {
        self.type_flag() == TypeFlag::Boolean
    }

    fn is_int(&self) -> bool {
        self.type_flag() == TypeFlag::Integer
    }

    fn is_double(&self) -> bool {
        self.type_flag() == TypeFlag::Double
    }

    fn is_string(&self) -> bool {
        self.type_flag() == TypeFlag::String
    }

    fn is_list(&self) -> bool {
        self.type_flag() == TypeFlag::List
    }

    fn is_object(&self) -> bool {
        self.type_flag() == TypeFlag::Object
    }

    fn get_bool(&self) -> bool;
    fn get_int(&self) -> i64;
    fn get_double(&self) -> f64;

    /// Borrowed string content, tied to the backing store.
    fn get_str(&self) -> &'a str;

    fn get_string(&self) -> String {
        self.get_str().to_owned()
    }

    fn get_text(&self) -> Text<'a> {
        Text::borrowed(self.get_str())
    }

    /// Elements of a list. Empty for any other variant.
    fn iter_list(&self) -> Self::ListIter;

    /// Members of an object. Empty for any other variant.
    fn iter_members(&self) -> Self::MemberIter;

    /// Number of list elements. Linear unless the adapter overrides it.
    fn list_len(&self) -> usize {
        self.iter_list().count()
    }

    /// Element at `index`. Linear unless the adapter overrides it.
    fn element(&self, index: usize) -> Option<Self> {
        self.iter_list().nth(index)
    }

    /// Value of the first member named `key`.
    fn find_member(&self, key: &str) -> Option<Self> {
        self.iter_members()
            .find(|(name, _)| name.as_str() == key)
            .map(|(_, value)| value)
    }
}

/// Mutable access to a node of a document tree.
///
/// List operations on a node that is not a list first turn it into an
/// empty list; object operations do the same for objects. Removals on the
/// wrong variant, or out of range, do nothing.
pub trait RefLayer: Sized {
    type View<'v>: ViewLayer<'v>
    where
        Self: 'v;

    /// Read-only view of this node.
    fn view(&self) -> Self::View<'_>;

    fn set_null(&mut self);
    fn set_bool(&mut self, value: bool);
    fn set_int(&mut self, value: i64);
    fn set_double(&mut self, value: f64);
    fn set_string(&mut self, value: &str);
    /// Replaces the content with an empty list.
    fn set_list(&mut self);
    /// Replaces the content with an empty object.
    fn set_object(&mut self);

    /// Appends a null slot and hands it to `build`.
    fn push_back_builder<F: FnOnce(&mut Self)>(&mut self, build: F);
    fn pop_back(&mut self);
    /// Removes the element at `index`.
    fn erase(&mut self, index: usize);
    fn erase_range(&mut self, range: Range<usize>);
    /// Removes every element of a list or member of an object.
    fn clear(&mut self);

    /// Appends a member holding a null slot and hands the slot to `build`.
    fn add_member_builder<F: FnOnce(&mut Self)>(&mut self, key: &str, build: F);
    /// Removes the first member named `key`.
    fn remove_member(&mut self, key: &str);
    /// Removes the member at `position` in iteration order.
    fn erase_member(&mut self, position: usize);

    /// Child reference to the element at `index`.
    fn element_mut(&mut self, index: usize) -> Option<&mut Self>;
    /// Child reference to the first member named `key`.
    fn member_mut(&mut self, key: &str) -> Option<&mut Self>;

    fn push_back<T: Encode + ?Sized>(&mut self, value: &T) {
        self.push_back_builder(|slot| value.encode(slot));
    }

    fn add_member<T: Encode + ?Sized>(&mut self, key: &str, value: &T) {
        self.add_member_builder(key, |slot| value.encode(slot));
    }
}

/// Element access that uses O(1) indexing when the adapter supports it
/// and walks the list otherwise.
pub fn get_item<'a, L: ViewLayer<'a>>(layer: L, index: usize) -> Option<L> {
    if L::RANDOM_ACCESS {
        layer.element(index)
    } else {
        layer.iter_list().nth(index)
    }
}

/// Iterator that is empty when the layer is not of the iterated variant.
pub struct Optional<I>(Option<I>);

impl<I> Optional<I> {
    pub fn some(inner: I) -> Self {
        Self(Some(inner))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl<I: Iterator> Iterator for Optional<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.as_mut()?.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.0 {
            Some(inner) => inner.size_hint(),
            None => (0, Some(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_round_trip() {
        for flag in [
            TypeFlag::Null,
            TypeFlag::Boolean,
            TypeFlag::Integer,
            TypeFlag::Double,
            TypeFlag::String,
            TypeFlag::List,
            TypeFlag::Object,
        ] {
            assert_eq!(TypeFlag::from_name(flag.type_name()), Some(flag));
        }
        assert_eq!(TypeFlag::from_name("decimal"), None);
    }

    #[test]
    fn test_get_item_linear_and_random_access() {
        let node = Node::List(vec![Node::Int(1), Node::Int(2), Node::Int(3)]);
        assert_eq!(get_item(&node, 2).map(|v| v.get_int()), Some(3));
        assert!(get_item(&node, 3).is_none());

        let value = serde_json::json!([true, false]);
        assert_eq!(get_item(&value, 1).map(|v| v.get_bool()), Some(false));
    }
}

//! Built-in value tree
//!
//! `Node` is the crate's own document representation. Objects keep their
//! members in a vector, so insertion order is preserved and duplicate keys
//! can be represented. Lookups return the first member with a given key.
//!
//! `Node` deserializes straight from any serde format, so a JSON document
//! with a repeated key keeps every occurrence.

use std::fmt;
use std::ops::Range;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

use crate::encoding::copy_layer;
use crate::text::Text;

use super::{Optional, RefLayer, TypeFlag, ViewLayer};

/// A key/value pair inside an object node.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub key: String,
    pub value: Node,
}

/// A document node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    List(Vec<Node>),
    Object(Vec<Member>),
}

impl Node {
    /// Creates an empty object node.
    pub fn object() -> Self {
        Node::Object(Vec::new())
    }

    /// Creates an empty list node.
    pub fn list() -> Self {
        Node::List(Vec::new())
    }

    /// Deep-copies any layer into a new tree.
    pub fn from_layer<'a, L: ViewLayer<'a>>(layer: L) -> Self {
        let mut node = Node::Null;
        copy_layer(layer, &mut node);
        node
    }

    fn as_list_mut(&mut self) -> &mut Vec<Node> {
        match *self {
            Node::List(ref mut items) => items,
            _ => {
                *self = Node::list();
                self.as_list_mut()
            }
        }
    }

    fn as_object_mut(&mut self) -> &mut Vec<Member> {
        match *self {
            Node::Object(ref mut members) => members,
            _ => {
                *self = Node::object();
                self.as_object_mut()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a document value")
    }

    fn visit_unit<E>(self) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::Null)
    }

    fn visit_none<E>(self) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Node, D::Error>
    where
        D: Deserializer<'de>,
    {
        Node::deserialize(deserializer)
    }

    fn visit_bool<E>(self, value: bool) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::Bool(value))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::Int(value))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Node, E>
    where
        E: de::Error,
    {
        // Out of i64 range: keep the magnitude as a double.
        Ok(i64::try_from(value).map_or(Node::Double(value as f64), Node::Int))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::Double(value))
    }

    fn visit_str<E>(self, value: &str) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::String(value.to_string()))
    }

    fn visit_string<E>(self, value: String) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::String(value))
    }

    fn visit_seq<S>(self, mut seq: S) -> Result<Node, S::Error>
    where
        S: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Node::List(items))
    }

    fn visit_map<M>(self, mut map: M) -> Result<Node, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut members = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value()?;
            members.push(Member { key, value });
        }
        Ok(Node::Object(members))
    }
}

/// Member iterator for `&Node`.
pub struct NodeMembers<'a> {
    inner: Optional<std::slice::Iter<'a, Member>>,
}

impl<'a> Iterator for NodeMembers<'a> {
    type Item = (Text<'a>, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|member| (Text::borrowed(&member.key), &member.value))
    }
}

impl<'a> ViewLayer<'a> for &'a Node {
    type ListIter = Optional<std::slice::Iter<'a, Node>>;
    type MemberIter = NodeMembers<'a>;

    const RANDOM_ACCESS: bool = true;

    fn type_flag(&self) -> TypeFlag {
        match *self {
            Node::Null => TypeFlag::Null,
            Node::Bool(_) => TypeFlag::Boolean,
            Node::Int(_) => TypeFlag::Integer,
            Node::Double(_) => TypeFlag::Double,
            Node::String(_) => TypeFlag::String,
            Node::List(_) => TypeFlag::List,
            Node::Object(_) => TypeFlag::Object,
        }
    }

    fn get_bool(&self) -> bool {
        matches!(self, Node::Bool(true))
    }

    fn get_int(&self) -> i64 {
        match *self {
            Node::Int(value) => *value,
            _ => 0,
        }
    }

    fn get_double(&self) -> f64 {
        match *self {
            Node::Double(value) => *value,
            _ => 0.0,
        }
    }

    fn get_str(&self) -> &'a str {
        match *self {
            Node::String(value) => value,
            _ => "",
        }
    }

    fn iter_list(&self) -> Self::ListIter {
        match *self {
            Node::List(items) => Optional::some(items.iter()),
            _ => Optional::none(),
        }
    }

    fn iter_members(&self) -> Self::MemberIter {
        let inner = match *self {
            Node::Object(members) => Optional::some(members.iter()),
            _ => Optional::none(),
        };
        NodeMembers { inner }
    }

    fn list_len(&self) -> usize {
        match *self {
            Node::List(items) => items.len(),
            _ => 0,
        }
    }

    fn element(&self, index: usize) -> Option<Self> {
        match *self {
            Node::List(items) => items.get(index),
            _ => None,
        }
    }
}

impl RefLayer for Node {
    type View<'v> = &'v Node;

    fn view(&self) -> &Node {
        self
    }

    fn set_null(&mut self) {
        *self = Node::Null;
    }

    fn set_bool(&mut self, value: bool) {
        *self = Node::Bool(value);
    }

    fn set_int(&mut self, value: i64) {
        *self = Node::Int(value);
    }

    fn set_double(&mut self, value: f64) {
        *self = Node::Double(value);
    }

    fn set_string(&mut self, value: &str) {
        *self = Node::String(value.to_owned());
    }

    fn set_list(&mut self) {
        *self = Node::list();
    }

    fn set_object(&mut self) {
        *self = Node::object();
    }

    fn push_back_builder<F: FnOnce(&mut Self)>(&mut self, build: F) {
        let items = self.as_list_mut();
        items.push(Node::Null);
        if let Some(slot) = items.last_mut() {
            build(slot);
        }
    }

    fn pop_back(&mut self) {
        if let Node::List(items) = self {
            items.pop();
        }
    }

    fn erase(&mut self, index: usize) {
        if let Node::List(items) = self {
            if index < items.len() {
                items.remove(index);
            }
        }
    }

    fn erase_range(&mut self, range: Range<usize>) {
        if let Node::List(items) = self {
            let end = range.end.min(items.len());
            if range.start < end {
                items.drain(range.start..end);
            }
        }
    }

    fn clear(&mut self) {
        match self {
            Node::List(items) => items.clear(),
            Node::Object(members) => members.clear(),
            _ => {}
        }
    }

    fn add_member_builder<F: FnOnce(&mut Self)>(&mut self, key: &str, build: F) {
        let members = self.as_object_mut();
        members.push(Member {
            key: key.to_owned(),
            value: Node::Null,
        });
        if let Some(member) = members.last_mut() {
            build(&mut member.value);
        }
    }

    fn remove_member(&mut self, key: &str) {
        if let Node::Object(members) = self {
            if let Some(position) = members.iter().position(|member| member.key == key) {
                members.remove(position);
            }
        }
    }

    fn erase_member(&mut self, position: usize) {
        if let Node::Object(members) = self {
            if position < members.len() {
                members.remove(position);
            }
        }
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut Self> {
        match self {
            Node::List(items) => items.get_mut(index),
            _ => None,
        }
    }

    fn member_mut(&mut self, key: &str) -> Option<&mut Self> {
        match self {
            Node::Object(members) => members
                .iter_mut()
                .find(|member| member.key == key)
                .map(|member| &mut member.value),
            _ => None,
        }
    }
}

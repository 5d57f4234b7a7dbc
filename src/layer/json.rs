//! `serde_json::Value` adapter
//!
//! Requires serde_json's `preserve_order` feature so objects iterate in
//! insertion order. Integers that do not fit in an `i64` are presented as
//! doubles. Setting a non-finite double stores null, since JSON has no
//! representation for it.

use std::ops::Range;

use serde_json::{Map, Number, Value};

use crate::text::Text;

use super::{Optional, RefLayer, TypeFlag, ViewLayer};

/// Member iterator for `&serde_json::Value`.
pub struct JsonMembers<'a> {
    inner: Optional<serde_json::map::Iter<'a>>,
}

impl<'a> Iterator for JsonMembers<'a> {
    type Item = (Text<'a>, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(key, value)| (Text::borrowed(key), value))
    }
}

impl<'a> ViewLayer<'a> for &'a Value {
    type ListIter = Optional<std::slice::Iter<'a, Value>>;
    type MemberIter = JsonMembers<'a>;

    const RANDOM_ACCESS: bool = true;

    fn type_flag(&self) -> TypeFlag {
        match *self {
            Value::Null => TypeFlag::Null,
            Value::Bool(_) => TypeFlag::Boolean,
            Value::Number(number) if number.is_i64() => TypeFlag::Integer,
            Value::Number(_) => TypeFlag::Double,
            Value::String(_) => TypeFlag::String,
            Value::Array(_) => TypeFlag::List,
            Value::Object(_) => TypeFlag::Object,
        }
    }

    fn get_bool(&self) -> bool {
        self.as_bool().unwrap_or_default()
    }

    fn get_int(&self) -> i64 {
        self.as_i64().unwrap_or_default()
    }

    fn get_double(&self) -> f64 {
        match *self {
            Value::Number(number) if !number.is_i64() => number.as_f64().unwrap_or_default(),
            _ => 0.0,
        }
    }

    fn get_str(&self) -> &'a str {
        match *self {
            Value::String(value) => value,
            _ => "",
        }
    }

    fn iter_list(&self) -> Self::ListIter {
        match *self {
            Value::Array(items) => Optional::some(items.iter()),
            _ => Optional::none(),
        }
    }

    fn iter_members(&self) -> Self::MemberIter {
        let inner = match *self {
            Value::Object(members) => Optional::some(members.iter()),
            _ => Optional::none(),
        };
        JsonMembers { inner }
    }

    fn list_len(&self) -> usize {
        match *self {
            Value::Array(items) => items.len(),
            _ => 0,
        }
    }

    fn element(&self, index: usize) -> Option<Self> {
        match *self {
            Value::Array(items) => items.get(index),
            _ => None,
        }
    }

    fn find_member(&self, key: &str) -> Option<Self> {
        match *self {
            Value::Object(members) => members.get(key),
            _ => None,
        }
    }
}

impl RefLayer for Value {
    type View<'v> = &'v Value;

    fn view(&self) -> &Value {
        self
    }

    fn set_null(&mut self) {
        *self = Value::Null;
    }

    fn set_bool(&mut self, value: bool) {
        *self = Value::Bool(value);
    }

    fn set_int(&mut self, value: i64) {
        *self = Value::Number(value.into());
    }

    fn set_double(&mut self, value: f64) {
        *self = Number::from_f64(value).map_or(Value::Null, Value::Number);
    }

    fn set_string(&mut self, value: &str) {
        *self = Value::String(value.to_owned());
    }

    fn set_list(&mut self) {
        *self = Value::Array(Vec::new());
    }

    fn set_object(&mut self) {
        *self = Value::Object(Map::new());
    }

    fn push_back_builder<F: FnOnce(&mut Self)>(&mut self, build: F) {
        if !self.is_array() {
            self.set_list();
        }
        if let Value::Array(items) = self {
            items.push(Value::Null);
            if let Some(slot) = items.last_mut() {
                build(slot);
            }
        }
    }

    fn pop_back(&mut self) {
        if let Value::Array(items) = self {
            items.pop();
        }
    }

    fn erase(&mut self, index: usize) {
        if let Value::Array(items) = self {
            if index < items.len() {
                items.remove(index);
            }
        }
    }

    fn erase_range(&mut self, range: Range<usize>) {
        if let Value::Array(items) = self {
            let end = range.end.min(items.len());
            if range.start < end {
                items.drain(range.start..end);
            }
        }
    }

    fn clear(&mut self) {
        match self {
            Value::Array(items) => items.clear(),
            Value::Object(members) => members.clear(),
            _ => {}
        }
    }

    fn add_member_builder<F: FnOnce(&mut Self)>(&mut self, key: &str, build: F) {
        if !self.is_object() {
            self.set_object();
        }
        if let Value::Object(members) = self {
            // JSON objects hold unique keys; an existing member keeps its
            // position and receives the new value.
            let slot = members.entry(key).or_insert(Value::Null);
            *slot = Value::Null;
            build(slot);
        }
    }

    fn remove_member(&mut self, key: &str) {
        let position = match self {
            Value::Object(members) => members.keys().position(|name| name == key),
            _ => None,
        };
        if let Some(position) = position {
            self.erase_member(position);
        }
    }

    fn erase_member(&mut self, position: usize) {
        if let Value::Object(members) = self {
            if position < members.len() {
                let old = std::mem::take(members);
                *members = old
                    .into_iter()
                    .enumerate()
                    .filter_map(|(index, member)| (index != position).then_some(member))
                    .collect();
            }
        }
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut Self> {
        match self {
            Value::Array(items) => items.get_mut(index),
            _ => None,
        }
    }

    fn member_mut(&mut self, key: &str) -> Option<&mut Self> {
        match self {
            Value::Object(members) => members.get_mut(key),
            _ => None,
        }
    }
}

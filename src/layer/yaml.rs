//! `serde_yaml::Value` adapter
//!
//! - Tagged values (`!tag value`) are looked through on read
//! - Mapping keys that are strings are borrowed; boolean, number and null
//!   keys are presented as their textual form; list and map keys are
//!   skipped by member iteration
//! - Mappings keep insertion order

use std::ops::Range;

use serde_yaml::{Mapping, Number, Value};

use crate::text::Text;

use super::{Optional, RefLayer, TypeFlag, ViewLayer};

fn untag(mut value: &Value) -> &Value {
    while let Value::Tagged(tagged) = value {
        value = &tagged.value;
    }
    value
}

fn untag_mut(value: &mut Value) -> &mut Value {
    match value {
        Value::Tagged(tagged) => untag_mut(&mut tagged.value),
        other => other,
    }
}

/// Textual form of a mapping key, or `None` for keys that cannot be
/// presented as text.
fn key_text(key: &Value) -> Option<Text<'_>> {
    match untag(key) {
        Value::String(value) => Some(Text::borrowed(value)),
        Value::Bool(value) => Some(Text::owned(value.to_string())),
        Value::Number(value) => Some(Text::owned(value.to_string())),
        Value::Null => Some(Text::borrowed("null")),
        _ => None,
    }
}

fn key_matches(key: &Value, name: &str) -> bool {
    key_text(key).is_some_and(|text| text == name)
}

/// Member iterator for `&serde_yaml::Value`.
pub struct YamlMembers<'a> {
    inner: Optional<serde_yaml::mapping::Iter<'a>>,
}

impl<'a> Iterator for YamlMembers<'a> {
    type Item = (Text<'a>, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        for (key, value) in self.inner.by_ref() {
            if let Some(text) = key_text(key) {
                return Some((text, value));
            }
        }
        None
    }
}

impl<'a> ViewLayer<'a> for &'a Value {
    type ListIter = Optional<std::slice::Iter<'a, Value>>;
    type MemberIter = YamlMembers<'a>;

    const RANDOM_ACCESS: bool = true;

    fn type_flag(&self) -> TypeFlag {
        match untag(*self) {
            Value::Null => TypeFlag::Null,
            Value::Bool(_) => TypeFlag::Boolean,
            Value::Number(number) if number.is_i64() => TypeFlag::Integer,
            Value::Number(_) => TypeFlag::Double,
            Value::String(_) => TypeFlag::String,
            Value::Sequence(_) => TypeFlag::List,
            Value::Mapping(_) => TypeFlag::Object,
            Value::Tagged(_) => TypeFlag::Null,
        }
    }

    fn get_bool(&self) -> bool {
        matches!(untag(*self), Value::Bool(true))
    }

    fn get_int(&self) -> i64 {
        match untag(*self) {
            Value::Number(number) => number.as_i64().unwrap_or_default(),
            _ => 0,
        }
    }

    fn get_double(&self) -> f64 {
        match untag(*self) {
            Value::Number(number) if !number.is_i64() => number.as_f64().unwrap_or_default(),
            _ => 0.0,
        }
    }

    fn get_str(&self) -> &'a str {
        match untag(*self) {
            Value::String(value) => value,
            _ => "",
        }
    }

    fn iter_list(&self) -> Self::ListIter {
        match untag(*self) {
            Value::Sequence(items) => Optional::some(items.iter()),
            _ => Optional::none(),
        }
    }

    fn iter_members(&self) -> Self::MemberIter {
        let inner = match untag(*self) {
            Value::Mapping(members) => Optional::some(members.iter()),
            _ => Optional::none(),
        };
        YamlMembers { inner }
    }

    fn list_len(&self) -> usize {
        match untag(*self) {
            Value::Sequence(items) => items.len(),
            _ => 0,
        }
    }

    fn element(&self, index: usize) -> Option<Self> {
        match untag(*self) {
            Value::Sequence(items) => items.get(index),
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
        *self = Value::Number(Number::from(value));
    }

    fn set_double(&mut self, value: f64) {
        *self = Value::Number(Number::from(value));
    }

    fn set_string(&mut self, value: &str) {
        *self = Value::String(value.to_owned());
    }

    fn set_list(&mut self) {
        *self = Value::Sequence(Vec::new());
    }

    fn set_object(&mut self) {
        *self = Value::Mapping(Mapping::new());
    }

    fn push_back_builder<F: FnOnce(&mut Self)>(&mut self, build: F) {
        let target = untag_mut(self);
        if !target.is_sequence() {
            target.set_list();
        }
        if let Value::Sequence(items) = target {
            items.push(Value::Null);
            if let Some(slot) = items.last_mut() {
                build(slot);
            }
        }
    }

    fn pop_back(&mut self) {
        if let Value::Sequence(items) = untag_mut(self) {
            items.pop();
        }
    }

    fn erase(&mut self, index: usize) {
        if let Value::Sequence(items) = untag_mut(self) {
            if index < items.len() {
                items.remove(index);
            }
        }
    }

    fn erase_range(&mut self, range: Range<usize>) {
        if let Value::Sequence(items) = untag_mut(self) {
            let end = range.end.min(items.len());
            if range.start < end {
                items.drain(range.start..end);
            }
        }
    }

    fn clear(&mut self) {
        match untag_mut(self) {
            Value::Sequence(items) => items.clear(),
            Value::Mapping(members) => members.clear(),
            _ => {}
        }
    }

    fn add_member_builder<F: FnOnce(&mut Self)>(&mut self, key: &str, build: F) {
        let target = untag_mut(self);
        if !target.is_mapping() {
            target.set_object();
        }
        if let Value::Mapping(members) = target {
            // Mapping keys are unique; re-adding keeps the original position.
            members.insert(Value::String(key.to_owned()), Value::Null);
            if let Some(slot) = members.get_mut(key) {
                build(slot);
            }
        }
    }

    fn remove_member(&mut self, key: &str) {
        let position = match untag(self) {
            Value::Mapping(members) => members
                .iter()
                .position(|(name, _)| key_matches(name, key)),
            _ => None,
        };
        if let Some(position) = position {
            self.erase_member(position);
        }
    }

    fn erase_member(&mut self, position: usize) {
        if let Value::Mapping(members) = untag_mut(self) {
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
        match untag_mut(self) {
            Value::Sequence(items) => items.get_mut(index),
            _ => None,
        }
    }

    fn member_mut(&mut self, key: &str) -> Option<&mut Self> {
        match untag_mut(self) {
            Value::Mapping(members) => members
                .iter_mut()
                .find(|(name, _)| key_matches(name, key))
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

//! Conversion between native values and layers
//!
//! - `Encode` writes a value into any `RefLayer`
//! - `Decode` reads a value out of any `ViewLayer`, either unchecked
//!   (`decode`, which returns defaults on a variant mismatch) or checked
//!   (`safe_decode`, which only produces a value when the variant matches)
//! - `copy_layer` deep-copies any view into any reference
//!
//! User types take part by implementing the traits.

use std::collections::BTreeMap;

use crate::layer::{Node, RefLayer, TypeFlag, ViewLayer};
use crate::text::Text;

/// Writes a native value into a layer.
pub trait Encode {
    fn encode<R: RefLayer>(&self, out: &mut R);
}

/// Reads a native value out of a layer.
pub trait Decode<'a>: Sized {
    /// Returns true when `layer` holds the variant this type decodes from.
    fn accepts<L: ViewLayer<'a>>(layer: &L) -> bool;

    /// Reads the value without checking the variant.
    fn decode<L: ViewLayer<'a>>(layer: L) -> Self;

    /// Reads the value only when the variant matches.
    fn safe_decode<L: ViewLayer<'a>>(layer: L) -> Option<Self> {
        if Self::accepts(&layer) {
            Some(Self::decode(layer))
        } else {
            None
        }
    }
}

/// Reads `T` out of `layer` without checking the variant.
pub fn decode<'a, T: Decode<'a>, L: ViewLayer<'a>>(layer: L) -> T {
    T::decode(layer)
}

/// Writes `value` into `out`, replacing its content.
pub fn encode<T: Encode + ?Sized, R: RefLayer>(out: &mut R, value: &T) {
    value.encode(out);
}

/// Calls `callback` with the decoded value only when `layer` holds the
/// matching variant. Returns whether the callback ran.
pub fn safe_decode<'a, T, L, F>(layer: L, callback: F) -> bool
where
    T: Decode<'a>,
    L: ViewLayer<'a>,
    F: FnOnce(T),
{
    match T::safe_decode(layer) {
        Some(value) => {
            callback(value);
            true
        }
        None => false,
    }
}

/// Deep-copies `layer` into `out`.
pub fn copy_layer<'a, L: ViewLayer<'a>, R: RefLayer>(layer: L, out: &mut R) {
    match layer.type_flag() {
        TypeFlag::Null => out.set_null(),
        TypeFlag::Boolean => out.set_bool(layer.get_bool()),
        TypeFlag::Integer => out.set_int(layer.get_int()),
        TypeFlag::Double => out.set_double(layer.get_double()),
        TypeFlag::String => out.set_string(layer.get_str()),
        TypeFlag::List => {
            out.set_list();
            for item in layer.iter_list() {
                out.push_back_builder(|slot| copy_layer(item, slot));
            }
        }
        TypeFlag::Object => {
            out.set_object();
            for (key, value) in layer.iter_members() {
                out.add_member_builder(&key, |slot| copy_layer(value, slot));
            }
        }
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode<R: RefLayer>(&self, out: &mut R) {
        (**self).encode(out);
    }
}

impl Encode for bool {
    fn encode<R: RefLayer>(&self, out: &mut R) {
        out.set_bool(*self);
    }
}

macro_rules! encode_int {
    ($($ty:ty),*) => {
        $(
            impl Encode for $ty {
                fn encode<R: RefLayer>(&self, out: &mut R) {
                    out.set_int(i64::from(*self));
                }
            }
        )*
    };
}

encode_int!(i8, i16, i32, i64, u8, u16, u32);

impl Encode for f32 {
    fn encode<R: RefLayer>(&self, out: &mut R) {
        out.set_double(f64::from(*self));
    }
}

impl Encode for f64 {
    fn encode<R: RefLayer>(&self, out: &mut R) {
        out.set_double(*self);
    }
}

impl Encode for str {
    fn encode<R: RefLayer>(&self, out: &mut R) {
        out.set_string(self);
    }
}

impl Encode for String {
    fn encode<R: RefLayer>(&self, out: &mut R) {
        out.set_string(self);
    }
}

impl Encode for Text<'_> {
    fn encode<R: RefLayer>(&self, out: &mut R) {
        out.set_string(self.as_str());
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode<R: RefLayer>(&self, out: &mut R) {
        match self {
            Some(value) => value.encode(out),
            None => out.set_null(),
        }
    }
}

impl<T: Encode> Encode for [T] {
    fn encode<R: RefLayer>(&self, out: &mut R) {
        out.set_list();
        for item in self {
            out.push_back(item);
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<R: RefLayer>(&self, out: &mut R) {
        self.as_slice().encode(out);
    }
}

impl<T: Encode> Encode for BTreeMap<String, T> {
    fn encode<R: RefLayer>(&self, out: &mut R) {
        out.set_object();
        for (key, value) in self {
            out.add_member(key, value);
        }
    }
}

impl Encode for Node {
    fn encode<R: RefLayer>(&self, out: &mut R) {
        copy_layer(self, out);
    }
}

impl Encode for serde_json::Value {
    fn encode<R: RefLayer>(&self, out: &mut R) {
        copy_layer(self, out);
    }
}

impl Encode for serde_yaml::Value {
    fn encode<R: RefLayer>(&self, out: &mut R) {
        copy_layer(self, out);
    }
}

impl<'a> Decode<'a> for bool {
    fn accepts<L: ViewLayer<'a>>(layer: &L) -> bool {
        layer.is_bool()
    }

    fn decode<L: ViewLayer<'a>>(layer: L) -> Self {
        layer.get_bool()
    }
}

impl<'a> Decode<'a> for i64 {
    fn accepts<L: ViewLayer<'a>>(layer: &L) -> bool {
        layer.is_int()
    }

    fn decode<L: ViewLayer<'a>>(layer: L) -> Self {
        layer.get_int()
    }
}

impl<'a> Decode<'a> for i32 {
    /// Integers outside the `i32` range are rejected.
    fn accepts<L: ViewLayer<'a>>(layer: &L) -> bool {
        layer.is_int() && i32::try_from(layer.get_int()).is_ok()
    }

    fn decode<L: ViewLayer<'a>>(layer: L) -> Self {
        i32::try_from(layer.get_int()).unwrap_or_default()
    }
}

impl<'a> Decode<'a> for usize {
    fn accepts<L: ViewLayer<'a>>(layer: &L) -> bool {
        layer.is_int() && usize::try_from(layer.get_int()).is_ok()
    }

    fn decode<L: ViewLayer<'a>>(layer: L) -> Self {
        usize::try_from(layer.get_int()).unwrap_or_default()
    }
}

impl<'a> Decode<'a> for f64 {
    fn accepts<L: ViewLayer<'a>>(layer: &L) -> bool {
        layer.is_double()
    }

    fn decode<L: ViewLayer<'a>>(layer: L) -> Self {
        layer.get_double()
    }
}

impl<'a> Decode<'a> for String {
    fn accepts<L: ViewLayer<'a>>(layer: &L) -> bool {
        layer.is_string()
    }

    fn decode<L: ViewLayer<'a>>(layer: L) -> Self {
        layer.get_string()
    }
}

impl<'a> Decode<'a> for &'a str {
    fn accepts<L: ViewLayer<'a>>(layer: &L) -> bool {
        layer.is_string()
    }

    fn decode<L: ViewLayer<'a>>(layer: L) -> Self {
        layer.get_str()
    }
}

impl<'a> Decode<'a> for Text<'a> {
    fn accepts<L: ViewLayer<'a>>(layer: &L) -> bool {
        layer.is_string()
    }

    fn decode<L: ViewLayer<'a>>(layer: L) -> Self {
        layer.get_text()
    }
}

impl<'a> Decode<'a> for Node {
    fn accepts<L: ViewLayer<'a>>(_layer: &L) -> bool {
        true
    }

    fn decode<L: ViewLayer<'a>>(layer: L) -> Self {
        Node::from_layer(layer)
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Vec<T> {
    /// Accepts a list whose every element is accepted by `T`.
    fn accepts<L: ViewLayer<'a>>(layer: &L) -> bool {
        layer.is_list() && layer.iter_list().all(|item| T::accepts(&item))
    }

    fn decode<L: ViewLayer<'a>>(layer: L) -> Self {
        layer.iter_list().map(T::decode).collect()
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Option<T> {
    /// Null decodes to `None`; anything `T` accepts decodes to `Some`.
    fn accepts<L: ViewLayer<'a>>(layer: &L) -> bool {
        layer.is_null() || T::accepts(layer)
    }

    fn decode<L: ViewLayer<'a>>(layer: L) -> Self {
        if layer.is_null() {
            None
        } else {
            Some(T::decode(layer))
        }
    }
}

//! Constraint engine
//!
//! A `Constraint` is a cheaply clonable handle to an immutable tag payload
//! plus the properties every tag shares (`name`, `message`, `fatal`).
//! Dispatch is a match over `Tag`; `test` builds a full `ConstraintResult`
//! and `quick_test` only answers pass/fail.
//!
//! Built-in tags:
//! - type: the layer holds a given variant
//! - range: string byte length, list size or numeric value within bounds
//! - regex: full match on strings
//! - any / all: disjunction and conjunction of child constraints
//! - list / tuple / map: element-wise checks on containers
//! - literal: equality with a scalar
//! - field: every constraint of a (possibly forward-referenced) field
//! - model: model validation
//!
//! `Tag::Custom` is the extension point for tags outside this set.

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Serialize;

use crate::layer::{Node, TypeFlag, ViewLayer};
use crate::sequence::Sequence;
use crate::text::Text;

use super::field::Field;
use super::model::Model;
use super::result::ConstraintResult;

/// Late-bound shared reference, set at most once.
///
/// The module loader hands out unbound handles for forward references and
/// binds them when the target is defined.
pub struct Handle<T> {
    slot: Arc<OnceLock<Arc<T>>>,
}

impl<T> Handle<T> {
    pub fn unbound() -> Self {
        Self {
            slot: Arc::new(OnceLock::new()),
        }
    }

    pub fn bound(target: Arc<T>) -> Self {
        let handle = Self::unbound();
        handle.bind(target);
        handle
    }

    /// Binds the target. Returns false if the handle was already bound.
    pub fn bind(&self, target: Arc<T>) -> bool {
        self.slot.set(target).is_ok()
    }

    pub fn get(&self) -> Option<&Arc<T>> {
        self.slot.get()
    }

    pub fn is_bound(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Targets may refer back to this handle; never descend.
        if self.is_bound() {
            f.write_str("Handle(bound)")
        } else {
            f.write_str("Handle(unbound)")
        }
    }
}

/// User-defined tag.
///
/// Custom tags see a `Node` copy of the layer under test.
pub trait CustomTag: Send + Sync {
    /// Returns the failure reason, or `None` when `layer` passes.
    fn check(&self, layer: &Node) -> Option<String>;
}

/// Identifier of a tag, independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagId {
    Type,
    Range,
    Regex,
    Any,
    All,
    List,
    Tuple,
    Map,
    Literal,
    Field,
    Model,
    Custom,
}

impl TagId {
    /// Tag name as written in module descriptions.
    pub fn name(&self) -> &'static str {
        match self {
            TagId::Type => "type",
            TagId::Range => "range",
            TagId::Regex => "regex",
            TagId::Any => "any",
            TagId::All => "all",
            TagId::List => "list",
            TagId::Tuple => "tuple",
            TagId::Map => "map",
            TagId::Literal => "literal",
            TagId::Field => "field",
            TagId::Model => "model",
            TagId::Custom => "custom",
        }
    }
}

/// Scalar compared by the literal tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl Literal {
    fn matches<'a, L: ViewLayer<'a>>(&self, layer: L) -> bool {
        match self {
            Literal::Null => layer.is_null(),
            Literal::Bool(value) => layer.is_bool() && layer.get_bool() == *value,
            Literal::Int(value) => layer.is_int() && layer.get_int() == *value,
            Literal::Double(value) => layer.is_double() && layer.get_double() == *value,
            Literal::String(value) => layer.is_string() && layer.get_str() == value,
        }
    }
}

/// Properties shared by every tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintProps {
    pub name: Text<'static>,
    /// Replaces the default failure reason when not empty
    pub message: Text<'static>,
    /// Stops evaluation of later siblings when this constraint fails
    pub fatal: bool,
}

impl ConstraintProps {
    pub fn named(name: &'static str) -> Self {
        Self {
            name: Text::borrowed(name),
            ..Self::default()
        }
    }
}

/// Tag payloads.
#[derive(Clone)]
pub enum Tag {
    Type(TypeFlag),
    /// Inclusive bounds
    Range {
        min: f64,
        max: f64,
    },
    Regex(Regex),
    Any(Sequence<Constraint>),
    All {
        constraints: Sequence<Constraint>,
        hide: bool,
        ignore_details: bool,
    },
    List {
        of: Option<Constraint>,
        ignore_details: bool,
    },
    Tuple {
        items: Sequence<Constraint>,
        strict: bool,
        ignore_details: bool,
    },
    Map {
        key: Option<Constraint>,
        value: Option<Constraint>,
        ignore_details: bool,
    },
    Literal(Literal),
    Field {
        field: Handle<Field>,
        hide: bool,
        ignore_details: bool,
    },
    Model(Handle<Model>),
    Custom(Arc<dyn CustomTag>),
}

impl Tag {
    pub fn id(&self) -> TagId {
        match self {
            Tag::Type(_) => TagId::Type,
            Tag::Range { .. } => TagId::Range,
            Tag::Regex(_) => TagId::Regex,
            Tag::Any(_) => TagId::Any,
            Tag::All { .. } => TagId::All,
            Tag::List { .. } => TagId::List,
            Tag::Tuple { .. } => TagId::Tuple,
            Tag::Map { .. } => TagId::Map,
            Tag::Literal(_) => TagId::Literal,
            Tag::Field { .. } => TagId::Field,
            Tag::Model(_) => TagId::Model,
            Tag::Custom(_) => TagId::Custom,
        }
    }
}

#[derive(Clone)]
struct Inner {
    props: ConstraintProps,
    tag: Tag,
}

/// A validation predicate.
#[derive(Clone)]
pub struct Constraint {
    inner: Arc<Inner>,
}

impl Constraint {
    pub fn new(tag: Tag, props: ConstraintProps) -> Self {
        Self {
            inner: Arc::new(Inner { props, tag }),
        }
    }

    /// Passes iff the layer holds `flag`. Fatal by default.
    pub fn type_of(flag: TypeFlag) -> Self {
        let mut props = ConstraintProps::named("type_constraint");
        props.fatal = true;
        Self::new(Tag::Type(flag), props)
    }

    /// Inclusive range on string length, list size or numeric value.
    pub fn range(min: f64, max: f64) -> Self {
        Self::new(
            Tag::Range { min, max },
            ConstraintProps::named("range_constraint"),
        )
    }

    pub fn regex(pattern: Regex) -> Self {
        Self::new(Tag::Regex(pattern), ConstraintProps::named("regex_constraint"))
    }

    /// Compiles `pattern` anchored at both ends.
    pub fn regex_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::regex(Regex::new(&format!("^(?:{})$", pattern))?))
    }

    pub fn any(constraints: impl IntoIterator<Item = Constraint>) -> Self {
        Self::new(
            Tag::Any(constraints.into_iter().collect()),
            ConstraintProps::named("any_constraint"),
        )
    }

    pub fn all(constraints: impl IntoIterator<Item = Constraint>, hide: bool, ignore_details: bool) -> Self {
        Self::new(
            Tag::All {
                constraints: constraints.into_iter().collect(),
                hide,
                ignore_details,
            },
            ConstraintProps::named("all_constraint"),
        )
    }

    pub fn list(of: Option<Constraint>, ignore_details: bool) -> Self {
        Self::new(
            Tag::List { of, ignore_details },
            ConstraintProps::named("list_constraint"),
        )
    }

    pub fn tuple(items: impl IntoIterator<Item = Constraint>, strict: bool, ignore_details: bool) -> Self {
        Self::new(
            Tag::Tuple {
                items: items.into_iter().collect(),
                strict,
                ignore_details,
            },
            ConstraintProps::named("tuple_constraint"),
        )
    }

    pub fn map(key: Option<Constraint>, value: Option<Constraint>, ignore_details: bool) -> Self {
        Self::new(
            Tag::Map {
                key,
                value,
                ignore_details,
            },
            ConstraintProps::named("map_constraint"),
        )
    }

    pub fn literal(value: Literal) -> Self {
        Self::new(
            Tag::Literal(value),
            ConstraintProps::named("literal_constraint"),
        )
    }

    /// Runs every constraint of the referenced field. Unless named
    /// explicitly, the constraint takes the field's name.
    pub fn field(field: Handle<Field>, hide: bool, ignore_details: bool) -> Self {
        Self::new(
            Tag::Field {
                field,
                hide,
                ignore_details,
            },
            ConstraintProps::default(),
        )
    }

    /// Validates against a model. Named after the model and always fatal.
    pub fn model(name: &str, model: Handle<Model>) -> Self {
        Self::new(
            Tag::Model(model),
            ConstraintProps {
                name: Text::owned(name.to_owned()),
                message: Text::no_text(),
                fatal: true,
            },
        )
    }

    pub fn custom(name: &str, tag: Arc<dyn CustomTag>) -> Self {
        Self::new(
            Tag::Custom(tag),
            ConstraintProps {
                name: Text::owned(name.to_owned()),
                ..ConstraintProps::default()
            },
        )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner).props.name = Text::owned(name.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner).props.message = Text::owned(message.into());
        self
    }

    pub fn with_fatal(mut self, fatal: bool) -> Self {
        Arc::make_mut(&mut self.inner).props.fatal = fatal;
        self
    }

    pub fn tag(&self) -> &Tag {
        &self.inner.tag
    }

    pub fn tag_id(&self) -> TagId {
        self.inner.tag.id()
    }

    pub fn props(&self) -> &ConstraintProps {
        &self.inner.props
    }

    pub fn is_fatal(&self) -> bool {
        self.inner.props.fatal
    }

    /// Effective name: the explicit name, or for field constraints the
    /// referenced field's name once bound.
    pub fn name(&self) -> &str {
        let name = self.inner.props.name.as_str();
        if !name.is_empty() {
            return name;
        }
        match &self.inner.tag {
            Tag::Field { field, .. } => field.get().map_or("", |field| field.name()),
            _ => name,
        }
    }

    /// True when both handles share the same payload.
    pub fn ptr_eq(&self, other: &Constraint) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn reason(&self, default: &'static str) -> Text<'static> {
        let message = &self.inner.props.message;
        if message.is_empty() {
            Text::borrowed(default)
        } else {
            message.clone()
        }
    }

    fn leaf(&self, default_reason: &'static str) -> ConstraintResult {
        ConstraintResult::leaf_failure(Text::owned(self.name().to_owned()), self.reason(default_reason))
    }

    fn composite(&self, default_reason: &'static str, details: Sequence<ConstraintResult>) -> ConstraintResult {
        ConstraintResult::failure(
            Text::owned(self.name().to_owned()),
            self.reason(default_reason),
            details,
        )
    }

    /// Tests `layer` and reports every failure.
    pub fn test<'a, L: ViewLayer<'a>>(&self, layer: L) -> ConstraintResult {
        match &self.inner.tag {
            Tag::Type(flag) => self.test_type(*flag, layer),
            Tag::Range { min, max } => match range_failure(*min, *max, layer) {
                Some(reason) => self.leaf(reason),
                None => ConstraintResult::ok(),
            },
            Tag::Regex(pattern) => {
                if !layer.is_string() || pattern.is_match(layer.get_str()) {
                    ConstraintResult::ok()
                } else {
                    self.leaf("invalid value.")
                }
            }
            Tag::Any(constraints) => {
                if constraints.iter().any(|constraint| constraint.quick_test(layer)) {
                    ConstraintResult::ok()
                } else {
                    self.leaf("None of the constraints passed.")
                }
            }
            Tag::All {
                constraints,
                hide,
                ignore_details,
            } => self.test_all(constraints, *hide, *ignore_details, layer),
            Tag::List { of, ignore_details } => self.test_list(of.as_ref(), *ignore_details, layer),
            Tag::Tuple {
                items,
                strict,
                ignore_details,
            } => self.test_tuple(items, *strict, *ignore_details, layer),
            Tag::Map {
                key,
                value,
                ignore_details,
            } => self.test_map(key.as_ref(), value.as_ref(), *ignore_details, layer),
            Tag::Literal(literal) => {
                if literal.matches(layer) {
                    ConstraintResult::ok()
                } else {
                    self.leaf("invalid literal value.")
                }
            }
            Tag::Field {
                field,
                hide,
                ignore_details,
            } => self.test_field(field, *hide, *ignore_details, layer),
            Tag::Model(model) => match model.get() {
                Some(model) => model.validate(layer),
                None => self.leaf("Unresolved model reference."),
            },
            Tag::Custom(custom) => match custom.check(&Node::from_layer(layer)) {
                Some(reason) => {
                    let reason = if self.inner.props.message.is_empty() {
                        Text::owned(reason)
                    } else {
                        self.inner.props.message.clone()
                    };
                    ConstraintResult::leaf_failure(Text::owned(self.name().to_owned()), reason)
                }
                None => ConstraintResult::ok(),
            },
        }
    }

    /// Tests `layer` without building failure details.
    pub fn quick_test<'a, L: ViewLayer<'a>>(&self, layer: L) -> bool {
        match &self.inner.tag {
            Tag::Type(flag) => layer.type_flag() == *flag,
            Tag::Range { min, max } => range_failure(*min, *max, layer).is_none(),
            Tag::Regex(pattern) => !layer.is_string() || pattern.is_match(layer.get_str()),
            Tag::Any(constraints) => constraints.iter().any(|constraint| constraint.quick_test(layer)),
            Tag::All { constraints, .. } => quick_test_all(constraints, layer),
            Tag::List { of, .. } => {
                layer.is_list()
                    && of.as_ref().map_or(true, |of| {
                        layer.iter_list().all(|item| of.quick_test(item))
                    })
            }
            Tag::Tuple { items, strict, .. } => {
                if !layer.is_list() {
                    return false;
                }
                let len = layer.list_len();
                if len < items.len() || (*strict && len > items.len()) {
                    return false;
                }
                items
                    .iter()
                    .zip(layer.iter_list())
                    .all(|(constraint, item)| constraint.quick_test(item))
            }
            Tag::Map { key, value, .. } => {
                layer.is_object()
                    && layer.iter_members().all(|(name, item)| {
                        key.as_ref()
                            .map_or(true, |key| key.quick_test(&Node::String(name.to_string())))
                            && value.as_ref().map_or(true, |value| value.quick_test(item))
                    })
            }
            Tag::Literal(literal) => literal.matches(layer),
            Tag::Field { field, .. } => field.get().is_some_and(|field| field.quick_test(layer)),
            Tag::Model(model) => model.get().is_some_and(|model| model.quick_test(layer)),
            Tag::Custom(custom) => custom.check(&Node::from_layer(layer)).is_none(),
        }
    }

    fn test_type<'a, L: ViewLayer<'a>>(&self, flag: TypeFlag, layer: L) -> ConstraintResult {
        if layer.type_flag() == flag {
            return ConstraintResult::ok();
        }
        self.leaf(match flag {
            TypeFlag::Null => "Expected null.",
            TypeFlag::Boolean => "Expected boolean.",
            TypeFlag::Integer => "Expected integer.",
            TypeFlag::Double => "Expected double.",
            TypeFlag::String => "Expected string.",
            TypeFlag::List => "Expected list.",
            TypeFlag::Object => "Expected object.",
        })
    }

    fn test_all<'a, L: ViewLayer<'a>>(
        &self,
        constraints: &Sequence<Constraint>,
        hide: bool,
        ignore_details: bool,
        layer: L,
    ) -> ConstraintResult {
        if hide {
            return first_failure(constraints, layer).unwrap_or_else(ConstraintResult::ok);
        }
        if ignore_details {
            return if quick_test_all(constraints, layer) {
                ConstraintResult::ok()
            } else {
                self.leaf("")
            };
        }
        let mut failures = Sequence::no_sequence();
        test_constraints(constraints, layer, &mut failures);
        if failures.is_empty() {
            ConstraintResult::ok()
        } else {
            self.composite("", failures)
        }
    }

    fn test_list<'a, L: ViewLayer<'a>>(
        &self,
        of: Option<&Constraint>,
        ignore_details: bool,
        layer: L,
    ) -> ConstraintResult {
        if !layer.is_list() {
            return self.leaf("Expected a list.");
        }
        let Some(of) = of else {
            return ConstraintResult::ok();
        };
        for (index, item) in layer.iter_list().enumerate() {
            if ignore_details {
                if !of.quick_test(item) {
                    return self.leaf("invalid list.");
                }
                continue;
            }
            let result = of.test(item);
            if !result.is_valid() {
                return self.composite("invalid list.", index_detail(index, result));
            }
        }
        ConstraintResult::ok()
    }

    fn test_tuple<'a, L: ViewLayer<'a>>(
        &self,
        items: &Sequence<Constraint>,
        strict: bool,
        ignore_details: bool,
        layer: L,
    ) -> ConstraintResult {
        if !layer.is_list() {
            return self.leaf("Expected a list.");
        }
        let len = layer.list_len();
        if strict && len > items.len() {
            return self.leaf("Too many values in the tuple.");
        }
        if len < items.len() {
            return self.leaf("Too few values in the tuple.");
        }
        for (index, (constraint, item)) in items.iter().zip(layer.iter_list()).enumerate() {
            if ignore_details {
                if !constraint.quick_test(item) {
                    return self.leaf("invalid tuple.");
                }
                continue;
            }
            let result = constraint.test(item);
            if !result.is_valid() {
                return self.composite("invalid tuple.", index_detail(index, result));
            }
        }
        ConstraintResult::ok()
    }

    fn test_map<'a, L: ViewLayer<'a>>(
        &self,
        key: Option<&Constraint>,
        value: Option<&Constraint>,
        ignore_details: bool,
        layer: L,
    ) -> ConstraintResult {
        if !layer.is_object() {
            return self.leaf("Expected an object.");
        }
        for (name, item) in layer.iter_members() {
            let key_result = match key {
                Some(key) => key.test(&Node::String(name.to_string())),
                None => ConstraintResult::ok(),
            };
            let result = if key_result.is_valid() {
                match value {
                    Some(value) => value.test(item),
                    None => ConstraintResult::ok(),
                }
            } else {
                key_result
            };
            if !result.is_valid() {
                if ignore_details {
                    return self.leaf("invalid map.");
                }
                let detail = ConstraintResult::field_failure(
                    name.into_owned(),
                    Text::no_text(),
                    [result].into_iter().collect(),
                );
                return self.composite("invalid map.", [detail].into_iter().collect());
            }
        }
        ConstraintResult::ok()
    }

    fn test_field<'a, L: ViewLayer<'a>>(
        &self,
        handle: &Handle<Field>,
        hide: bool,
        ignore_details: bool,
        layer: L,
    ) -> ConstraintResult {
        let Some(field) = handle.get() else {
            return self.leaf("Unresolved field reference.");
        };
        if hide {
            return first_failure(field.constraints(), layer).unwrap_or_else(ConstraintResult::ok);
        }
        let reason = || match field.message() {
            Some(message) if self.inner.props.message.is_empty() => Text::owned(message.to_owned()),
            _ => self.reason(""),
        };
        let name = || Text::owned(self.name().to_owned());
        if ignore_details || field.ignore_details() {
            if field.quick_test(layer) {
                return ConstraintResult::ok();
            }
            return ConstraintResult::leaf_failure(name(), reason());
        }
        let failures = field.validate(layer);
        if failures.is_empty() {
            ConstraintResult::ok()
        } else {
            ConstraintResult::failure(name(), reason(), failures)
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("tag", &self.tag_id())
            .field("name", &self.name())
            .field("fatal", &self.is_fatal())
            .finish()
    }
}

fn index_detail(index: usize, result: ConstraintResult) -> Sequence<ConstraintResult> {
    let detail = ConstraintResult::field_failure(
        Text::owned(index.to_string()),
        Text::no_text(),
        [result].into_iter().collect(),
    );
    [detail].into_iter().collect()
}

fn range_failure<'a, L: ViewLayer<'a>>(min: f64, max: f64, layer: L) -> Option<&'static str> {
    let within = |value: f64| value >= min && value <= max;
    match layer.type_flag() {
        TypeFlag::String => (!within(layer.get_str().len() as f64)).then_some("invalid string length."),
        TypeFlag::List => (!within(layer.list_len() as f64)).then_some("invalid list size."),
        TypeFlag::Integer => (!within(layer.get_int() as f64)).then_some("invalid integer value."),
        TypeFlag::Double => (!within(layer.get_double())).then_some("invalid double value."),
        _ => None,
    }
}

/// Runs `constraints` in order, pushing each failure. Stops after the first
/// failing fatal constraint.
pub fn test_constraints<'a, L: ViewLayer<'a>>(
    constraints: &[Constraint],
    layer: L,
    failures: &mut Sequence<ConstraintResult>,
) {
    for constraint in constraints {
        let result = constraint.test(layer);
        if !result.is_valid() {
            failures.push_back(result);
            if constraint.is_fatal() {
                break;
            }
        }
    }
}

/// Result of the first failing constraint, if any.
pub fn first_failure<'a, L: ViewLayer<'a>>(constraints: &[Constraint], layer: L) -> Option<ConstraintResult> {
    constraints
        .iter()
        .map(|constraint| constraint.test(layer))
        .find(|result| !result.is_valid())
}

/// True when every constraint passes.
pub fn quick_test_all<'a, L: ViewLayer<'a>>(constraints: &[Constraint], layer: L) -> bool {
    constraints.iter().all(|constraint| constraint.quick_test(layer))
}

//! Module description parser
//!
//! Reads the `fields` section, then the `models` section, of any layer
//! into a `Module`. Names may be used before they are defined:
//! - a field inheriting from a missing field is held back until its
//!   parent arrives, then registered with the parent's constraints first
//! - an alias of a missing field is registered when the target arrives
//! - a model member of a missing type is filled in when the type arrives
//! - a `field` constraint on a missing field gets an unbound handle that
//!   is bound when the field arrives
//!
//! Every model also registers a field of the same name holding a single
//! `model` constraint, so models can be used as member types. Anything
//! still waiting when parsing ends is an `UndefinedObject` error.

use std::collections::{BTreeMap, BTreeSet};
use std::mem;
use std::sync::Arc;

use tracing::{debug, info};

use crate::layer::{TypeFlag, ViewLayer};

use super::constraints::{Constraint, Handle, Literal};
use super::errors::{ModuleError, ModuleResult};
use super::field::Field;
use super::model::Model;
use super::module::Module;

const META_KEY: &str = ".meta";
const FIELD_SHORTCUTS: [&str; 3] = ["label", "description", "message"];

/// Model member waiting for a field.
#[derive(Debug)]
struct MemberSlot {
    model: usize,
    key: String,
    token: u64,
}

/// Consumers of a field that is not registered yet.
#[derive(Debug, Default)]
struct Dependents {
    /// Pending fields inheriting from it
    fields: Vec<usize>,
    members: Vec<MemberSlot>,
    aliases: Vec<String>,
    handles: Vec<Handle<Field>>,
}

/// Field held back until its parent is registered.
#[derive(Debug)]
struct PendingField {
    field: Option<Field>,
    /// `None` for inline member definitions
    name: Option<String>,
    members: Vec<MemberSlot>,
}

#[derive(Debug, Clone)]
enum Source {
    Named(String),
    Pending(usize),
}

#[derive(Debug, Clone)]
enum Slot {
    Ready(Arc<Field>, bool),
    Waiting {
        source: Source,
        token: u64,
        required: bool,
    },
}

#[derive(Debug)]
struct ModelBuilder {
    model: Model,
    handle: Handle<Model>,
    slots: BTreeMap<String, Slot>,
}

/// Result of parsing a field description that may not be complete yet.
enum Parsed {
    Ready(Arc<Field>),
    Waiting(Source),
}

pub struct ModuleParser<'m> {
    module: &'m mut Module,
    dependents: BTreeMap<String, Dependents>,
    pending: Vec<PendingField>,
    /// Named fields and aliases that are defined but not yet registered
    pending_names: BTreeSet<String>,
    models: Vec<ModelBuilder>,
    model_index: BTreeMap<String, usize>,
    next_token: u64,
}

impl<'m> ModuleParser<'m> {
    pub fn new(module: &'m mut Module) -> Self {
        Self {
            module,
            dependents: BTreeMap::new(),
            pending: Vec::new(),
            pending_names: BTreeSet::new(),
            models: Vec::new(),
            model_index: BTreeMap::new(),
            next_token: 0,
        }
    }

    /// Parses a module description into the module.
    pub fn parse<'a, L: ViewLayer<'a>>(mut self, layer: L) -> ModuleResult<()> {
        if !layer.is_object() {
            return Err(ModuleError::invalid_root());
        }

        if let Some(fields) = layer.find_member("fields") {
            expect_object("fields", fields)?;
            for (name, value) in fields.iter_members() {
                self.parse_named_field(&name, value)?;
            }
        }

        if let Some(models) = layer.find_member("models") {
            expect_object("models", models)?;
            for (name, value) in models.iter_members() {
                self.parse_model(&name, value)?;
            }
        }

        self.finish()
    }

    fn parse_named_field<'a, L: ViewLayer<'a>>(&mut self, name: &str, layer: L) -> ModuleResult<()> {
        self.check_free(name)?;

        if layer.is_string() {
            let (target, _) = split_optional(layer.get_str());
            return match self.find_field(target) {
                Some(field) => self.add_field(name, field),
                None => {
                    self.dependents
                        .entry(target.to_owned())
                        .or_default()
                        .aliases
                        .push(name.to_owned());
                    self.pending_names.insert(name.to_owned());
                    Ok(())
                }
            };
        }

        expect_object(name, layer)?;
        let (field, parent) = self.build_field(name, name, layer)?;
        match parent {
            None => self.add_field(name, Arc::new(field)),
            Some(parent) => {
                self.hold_back(field, Some(name.to_owned()), parent);
                self.pending_names.insert(name.to_owned());
                Ok(())
            }
        }
    }

    /// Builds a field from its object form. Returns the name of the parent
    /// field when that parent is not registered yet.
    fn build_field<'a, L: ViewLayer<'a>>(
        &mut self,
        owner: &str,
        name: &str,
        layer: L,
    ) -> ModuleResult<(Field, Option<String>)> {
        let mut field = Field::new(name);

        if let Some(annotations) = layer.find_member("annotations") {
            expect_object(owner, annotations)?;
            for (key, value) in annotations.iter_members() {
                field.set_annotation(key.as_str(), expect_str(owner, &key, value)?);
            }
        }
        for key in FIELD_SHORTCUTS {
            if let Some(value) = member_str(owner, layer, key)? {
                field.set_annotation(key, value);
            }
        }

        if let Some(constraints) = layer.find_member("constraints") {
            expect_list(owner, constraints)?;
            for item in constraints.iter_list() {
                let constraint = self.parse_constraint(owner, item)?;
                field.add_constraint(constraint);
            }
        }

        if let Some(ignore_details) = member_bool(owner, layer, "ignore_details")? {
            field.set_ignore_details(ignore_details);
        }

        let mut parent = None;
        if let Some(base) = member_str(owner, layer, "type")? {
            match self.find_field(base) {
                Some(base) => field.inherit_constraints_from(&base),
                None => parent = Some(base.to_owned()),
            }
        }
        Ok((field, parent))
    }

    fn hold_back(&mut self, field: Field, name: Option<String>, parent: String) -> usize {
        let id = self.pending.len();
        self.pending.push(PendingField {
            field: Some(field),
            name,
            members: Vec::new(),
        });
        self.dependents.entry(parent).or_default().fields.push(id);
        id
    }

    fn parse_model<'a, L: ViewLayer<'a>>(&mut self, name: &str, layer: L) -> ModuleResult<()> {
        if self.module.has_model(name) || self.model_index.contains_key(name) {
            return Err(ModuleError::redefinition(name));
        }
        expect_object(name, layer)?;

        let id = self.models.len();
        self.models.push(ModelBuilder {
            model: Model::new(name),
            handle: Handle::unbound(),
            slots: BTreeMap::new(),
        });
        self.model_index.insert(name.to_owned(), id);

        if let Some(meta) = layer.find_member(META_KEY) {
            expect_object(name, meta)?;
            self.parse_model_meta(id, name, meta)?;
        }

        for (key, value) in layer.iter_members() {
            if key.starts_with(META_KEY) {
                continue;
            }
            self.parse_member(id, name, &key, value)?;
        }

        let handle = self.models[id].handle.clone();
        let mut field = Field::new(name);
        field.add_constraint(Constraint::model(name, handle));
        self.add_field(name, Arc::new(field))?;

        debug!(
            model = %name,
            members = self.models[id].slots.len(),
            "parsed model"
        );
        Ok(())
    }

    fn parse_model_meta<'a, L: ViewLayer<'a>>(&mut self, id: usize, name: &str, meta: L) -> ModuleResult<()> {
        if let Some(description) = member_str(name, meta, "description")? {
            self.models[id].model.set_annotation("description", description);
        }
        if let Some(annotations) = meta.find_member("annotations") {
            expect_object(name, annotations)?;
            for (key, value) in annotations.iter_members() {
                let value = expect_str(name, &key, value)?;
                self.models[id].model.set_annotation(key.as_str(), value);
            }
        }
        if let Some(strict) = member_bool(name, meta, "strict")? {
            self.models[id].model.set_strict(strict);
        }

        let excluded: BTreeSet<&str> = string_list(name, meta, "exclude_fields")?.into_iter().collect();
        for parent in string_list(name, meta, "inherit")? {
            self.inherit(id, name, parent, &excluded)?;
        }
        Ok(())
    }

    fn inherit(&mut self, id: usize, name: &str, parent: &str, excluded: &BTreeSet<&str>) -> ModuleResult<()> {
        let inherited: Vec<(String, Slot)> = if let Some(&parent_id) = self.model_index.get(parent) {
            self.models[parent_id]
                .slots
                .iter()
                .map(|(key, slot)| (key.clone(), slot.clone()))
                .collect()
        } else if let Some(model) = self.module.get_model(parent) {
            model
                .fields()
                .map(|(key, descriptor)| {
                    let slot = Slot::Ready(descriptor.field.clone(), descriptor.required);
                    (key.to_owned(), slot)
                })
                .collect()
        } else {
            return Err(ModuleError::invalid_definition(
                name,
                format!("inherits from unknown model '{}'", parent),
            ));
        };

        for (key, slot) in inherited {
            if excluded.contains(key.as_str()) {
                continue;
            }
            match slot {
                Slot::Ready(field, required) => self.set_ready(id, key, field, required),
                Slot::Waiting { source, required, .. } => self.set_waiting(id, key, source, required),
            }
        }
        Ok(())
    }

    fn parse_member<'a, L: ViewLayer<'a>>(&mut self, id: usize, owner: &str, key: &str, layer: L) -> ModuleResult<()> {
        let (parsed, optional) = if layer.is_string() {
            let (target, optional) = split_optional(layer.get_str());
            let parsed = match self.find_field(target) {
                Some(field) => Parsed::Ready(field),
                None => Parsed::Waiting(Source::Named(target.to_owned())),
            };
            (parsed, optional)
        } else if layer.is_object() {
            let optional = member_bool(owner, layer, "optional")?.unwrap_or(false);
            let (field, parent) = self.build_field(owner, "", layer)?;
            let parsed = match parent {
                None => Parsed::Ready(Arc::new(field)),
                Some(parent) => Parsed::Waiting(Source::Pending(self.hold_back(field, None, parent))),
            };
            (parsed, optional)
        } else {
            return Err(ModuleError::invalid_definition(
                owner,
                format!("member '{}' must be a string or an object", key),
            ));
        };

        match parsed {
            Parsed::Ready(field) => self.set_ready(id, key.to_owned(), field, !optional),
            Parsed::Waiting(source) => self.set_waiting(id, key.to_owned(), source, !optional),
        }
        Ok(())
    }

    fn set_ready(&mut self, id: usize, key: String, field: Arc<Field>, required: bool) {
        self.models[id].slots.insert(key, Slot::Ready(field, required));
    }

    fn set_waiting(&mut self, id: usize, key: String, source: Source, required: bool) {
        let token = self.next_token;
        self.next_token += 1;

        let member = MemberSlot {
            model: id,
            key: key.clone(),
            token,
        };
        match &source {
            Source::Named(name) => self.dependents.entry(name.clone()).or_default().members.push(member),
            Source::Pending(pending) => self.pending[*pending].members.push(member),
        }
        self.models[id].slots.insert(
            key,
            Slot::Waiting {
                source,
                token,
                required,
            },
        );
    }

    /// Fills a member slot unless it was overridden since it started waiting.
    fn fill(&mut self, member: MemberSlot, field: &Arc<Field>) {
        let slots = &mut self.models[member.model].slots;
        let required = match slots.get(&member.key) {
            Some(Slot::Waiting { token, required, .. }) if *token == member.token => *required,
            _ => return,
        };
        slots.insert(member.key, Slot::Ready(Arc::clone(field), required));
    }

    fn find_field(&self, name: &str) -> Option<Arc<Field>> {
        self.module.get_field(name).cloned()
    }

    fn check_free(&self, name: &str) -> ModuleResult<()> {
        if self.module.has_field(name) || self.pending_names.contains(name) {
            return Err(ModuleError::redefinition(name));
        }
        Ok(())
    }

    /// Registers a complete field and releases everything waiting on it.
    fn add_field(&mut self, name: &str, field: Arc<Field>) -> ModuleResult<()> {
        self.check_free(name)?;
        self.module.add_field(name, Arc::clone(&field))?;
        debug!(field = %name, constraints = field.constraints().len(), "registered field");

        let Some(dependents) = self.dependents.remove(name) else {
            return Ok(());
        };
        for handle in dependents.handles {
            handle.bind(Arc::clone(&field));
        }
        for member in dependents.members {
            self.fill(member, &field);
        }
        for pending in dependents.fields {
            self.complete(pending, &field)?;
        }
        for alias in dependents.aliases {
            self.pending_names.remove(&alias);
            self.add_field(&alias, Arc::clone(&field))?;
        }
        Ok(())
    }

    fn complete(&mut self, id: usize, parent: &Field) -> ModuleResult<()> {
        let pending = &mut self.pending[id];
        let Some(mut field) = pending.field.take() else {
            return Ok(());
        };
        let name = pending.name.take();
        let members = mem::take(&mut pending.members);

        field.inherit_constraints_from(parent);
        let field = Arc::new(field);
        for member in members {
            self.fill(member, &field);
        }
        match name {
            Some(name) => {
                self.pending_names.remove(&name);
                self.add_field(&name, field)
            }
            None => Ok(()),
        }
    }

    fn field_constraint(&mut self, name: &str, hide: bool, ignore_details: bool) -> Constraint {
        let handle = match self.find_field(name) {
            Some(field) => Handle::bound(field),
            None => {
                let handle = Handle::unbound();
                self.dependents
                    .entry(name.to_owned())
                    .or_default()
                    .handles
                    .push(handle.clone());
                handle
            }
        };
        Constraint::field(handle, hide, ignore_details)
    }

    fn parse_constraint<'a, L: ViewLayer<'a>>(&mut self, owner: &str, layer: L) -> ModuleResult<Constraint> {
        if layer.is_string() {
            return Ok(self.field_constraint(layer.get_str(), false, false));
        }
        if !layer.is_object() {
            return Err(ModuleError::invalid_definition(
                owner,
                "a constraint must be a string or an object",
            ));
        }

        let tag = require(owner, "type", member_str(owner, layer, "type")?)?;
        let ignore_details = member_bool(owner, layer, "ignore_details")?.unwrap_or(false);
        let constraint = match tag {
            "type" => {
                let flag = require(owner, "flag", member_str(owner, layer, "flag")?)?;
                let flag = TypeFlag::from_name(flag).ok_or_else(|| {
                    ModuleError::invalid_definition(owner, format!("unknown type flag '{}'", flag))
                })?;
                Constraint::type_of(flag)
            }
            "regex" => {
                let pattern = require(owner, "pattern", member_str(owner, layer, "pattern")?)?;
                Constraint::regex_pattern(pattern).map_err(|err| ModuleError::invalid_definition(owner, err))?
            }
            "range" => Constraint::range(
                member_number(owner, layer, "min")?.unwrap_or(0.0),
                member_number(owner, layer, "max")?.unwrap_or(f64::INFINITY),
            ),
            "any" => Constraint::any(self.parse_constraints(owner, layer, "of")?),
            "all" => Constraint::all(
                self.parse_constraints(owner, layer, "of")?,
                member_bool(owner, layer, "hide")?.unwrap_or(true),
                ignore_details,
            ),
            "list" => Constraint::list(self.parse_inner(owner, layer, "of")?, ignore_details),
            "tuple" => Constraint::tuple(
                self.parse_constraints(owner, layer, "items")?,
                member_bool(owner, layer, "strict")?.unwrap_or(true),
                ignore_details,
            ),
            "map" => Constraint::map(
                self.parse_inner(owner, layer, "key")?,
                self.parse_inner(owner, layer, "value")?,
                ignore_details,
            ),
            "literal" => Constraint::literal(parse_literal(owner, layer.find_member("value"))?),
            "field" => {
                let name = require(owner, "field", member_str(owner, layer, "field")?)?;
                let hide = member_bool(owner, layer, "hide")?.unwrap_or(false);
                self.field_constraint(name, hide, ignore_details)
            }
            other => {
                return Err(ModuleError::invalid_definition(
                    owner,
                    format!("unknown constraint type '{}'", other),
                ))
            }
        };

        let mut constraint = constraint;
        if let Some(name) = member_str(owner, layer, "name")? {
            constraint = constraint.with_name(name);
        }
        if let Some(message) = member_str(owner, layer, "message")? {
            constraint = constraint.with_message(message);
        }
        if let Some(fatal) = member_bool(owner, layer, "fatal")? {
            constraint = constraint.with_fatal(fatal);
        }
        Ok(constraint)
    }

    fn parse_inner<'a, L: ViewLayer<'a>>(&mut self, owner: &str, layer: L, key: &str) -> ModuleResult<Option<Constraint>> {
        match layer.find_member(key) {
            Some(value) => Ok(Some(self.parse_constraint(owner, value)?)),
            None => Ok(None),
        }
    }

    fn parse_constraints<'a, L: ViewLayer<'a>>(&mut self, owner: &str, layer: L, key: &str) -> ModuleResult<Vec<Constraint>> {
        let Some(items) = layer.find_member(key) else {
            return Ok(Vec::new());
        };
        expect_list(owner, items)?;
        items
            .iter_list()
            .map(|item| self.parse_constraint(owner, item))
            .collect()
    }

    fn finish(self) -> ModuleResult<()> {
        if !self.dependents.is_empty() {
            // Prefer a name that nobody defines over one that is merely
            // waiting on it.
            let missing = self
                .dependents
                .keys()
                .find(|name| !self.pending_names.contains(*name))
                .or_else(|| self.dependents.keys().next())
                .cloned()
                .unwrap_or_default();
            return Err(ModuleError::undefined_object(missing));
        }

        let model_count = self.models.len();
        for builder in self.models {
            let ModelBuilder {
                mut model,
                handle,
                slots,
            } = builder;
            for (key, slot) in slots {
                match slot {
                    Slot::Ready(field, required) => model.add_field(key, field, required),
                    Slot::Waiting { .. } => return Err(ModuleError::undefined_object(key)),
                }
            }
            let model = Arc::new(model);
            handle.bind(Arc::clone(&model));
            self.module.add_model(model)?;
        }

        info!(
            fields = self.module.fields().count(),
            models = self.module.models().count(),
            parsed_models = model_count,
            "module parsed"
        );
        Ok(())
    }
}

/// Splits a trailing `?` optional marker off a field reference.
fn split_optional(reference: &str) -> (&str, bool) {
    match reference.strip_suffix('?') {
        Some(target) => (target, true),
        None => (reference, false),
    }
}

fn parse_literal<'a, L: ViewLayer<'a>>(owner: &str, value: Option<L>) -> ModuleResult<Literal> {
    let Some(value) = value else {
        return Ok(Literal::Null);
    };
    Ok(match value.type_flag() {
        TypeFlag::Null => Literal::Null,
        TypeFlag::Boolean => Literal::Bool(value.get_bool()),
        TypeFlag::Integer => Literal::Int(value.get_int()),
        TypeFlag::Double => Literal::Double(value.get_double()),
        TypeFlag::String => Literal::String(value.get_string()),
        TypeFlag::List | TypeFlag::Object => {
            return Err(ModuleError::invalid_definition(owner, "a literal must be a scalar"))
        }
    })
}

fn require<T>(owner: &str, key: &str, value: Option<T>) -> ModuleResult<T> {
    value.ok_or_else(|| ModuleError::invalid_definition(owner, format!("missing '{}'", key)))
}

fn expect_object<'a, L: ViewLayer<'a>>(owner: &str, layer: L) -> ModuleResult<()> {
    if layer.is_object() {
        Ok(())
    } else {
        Err(ModuleError::invalid_definition(owner, "expected an object"))
    }
}

fn expect_list<'a, L: ViewLayer<'a>>(owner: &str, layer: L) -> ModuleResult<()> {
    if layer.is_list() {
        Ok(())
    } else {
        Err(ModuleError::invalid_definition(owner, "expected a list"))
    }
}

fn expect_str<'a, L: ViewLayer<'a>>(owner: &str, key: &str, layer: L) -> ModuleResult<&'a str> {
    if layer.is_string() {
        Ok(layer.get_str())
    } else {
        Err(ModuleError::invalid_definition(
            owner,
            format!("'{}' must be a string", key),
        ))
    }
}

fn member_str<'a, L: ViewLayer<'a>>(owner: &str, layer: L, key: &str) -> ModuleResult<Option<&'a str>> {
    layer
        .find_member(key)
        .map(|value| expect_str(owner, key, value))
        .transpose()
}

fn member_bool<'a, L: ViewLayer<'a>>(owner: &str, layer: L, key: &str) -> ModuleResult<Option<bool>> {
    match layer.find_member(key) {
        None => Ok(None),
        Some(value) if value.is_bool() => Ok(Some(value.get_bool())),
        Some(_) => Err(ModuleError::invalid_definition(
            owner,
            format!("'{}' must be a boolean", key),
        )),
    }
}

fn member_number<'a, L: ViewLayer<'a>>(owner: &str, layer: L, key: &str) -> ModuleResult<Option<f64>> {
    match layer.find_member(key) {
        None => Ok(None),
        Some(value) if value.is_int() => Ok(Some(value.get_int() as f64)),
        Some(value) if value.is_double() => Ok(Some(value.get_double())),
        Some(_) => Err(ModuleError::invalid_definition(
            owner,
            format!("'{}' must be a number", key),
        )),
    }
}

/// A single string or a list of strings.
fn string_list<'a, L: ViewLayer<'a>>(owner: &str, layer: L, key: &str) -> ModuleResult<Vec<&'a str>> {
    let Some(value) = layer.find_member(key) else {
        return Ok(Vec::new());
    };
    if value.is_string() {
        return Ok(vec![value.get_str()]);
    }
    expect_list(owner, value)?;
    value
        .iter_list()
        .map(|item| expect_str(owner, key, item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::constraints::TagId;
    use crate::schema::errors::ModuleErrorCode;
    use serde_json::json;

    fn load(description: serde_json::Value) -> ModuleResult<Module> {
        Module::load(&description)
    }

    #[test]
    fn test_rejects_non_object_root() {
        let err = load(json!([1, 2])).unwrap_err();
        assert_eq!(err.code(), ModuleErrorCode::InvalidModule);
        assert!(err.name().is_none());
    }

    #[test]
    fn test_field_with_constraints_and_annotations() {
        let module = load(json!({
            "fields": {
                "Name": {
                    "constraints": [
                        {"type": "type", "flag": "string"},
                        {"type": "range", "min": 1, "max": 8, "message": "too long"}
                    ],
                    "label": "Name",
                    "annotations": {"ui": "text"}
                }
            }
        }))
        .unwrap();

        let field = module.get_field("Name").unwrap();
        assert_eq!(field.constraints().len(), 2);
        assert_eq!(field.annotation("label"), Some("Name"));
        assert_eq!(field.annotation("ui"), Some("text"));
        assert!(field.quick_test(&json!("Peyman")));
        assert_eq!(field.validate(&json!("Peymaneh!"))[0].reason, "too long");
    }

    #[test]
    fn test_inherits_from_registered_field() {
        let module = load(json!({
            "fields": {
                "Short": {"type": "string", "constraints": [{"type": "range", "max": 3}]}
            }
        }))
        .unwrap();
        let ids: Vec<TagId> = module
            .get_field("Short")
            .unwrap()
            .constraints()
            .iter()
            .map(|c| c.tag_id())
            .collect();
        assert_eq!(ids, vec![TagId::Type, TagId::Range]);
    }

    #[test]
    fn test_forward_alias_shares_field() {
        let module = load(json!({
            "fields": {
                "A": "B",
                "B": {"constraints": [{"type": "regex", "pattern": "\\d+"}]}
            }
        }))
        .unwrap();
        let a = module.get_field("A").unwrap();
        let b = module.get_field("B").unwrap();
        assert!(Arc::ptr_eq(a, b));
    }

    #[test]
    fn test_forward_inheritance_chain() {
        let module = load(json!({
            "fields": {
                "C": {"type": "B", "constraints": [{"type": "range", "max": 4}]},
                "B": {"type": "A", "constraints": [{"type": "regex", "pattern": "[a-z]*"}]},
                "A": {"constraints": [{"type": "type", "flag": "string"}]}
            }
        }))
        .unwrap();
        let ids: Vec<TagId> = module
            .get_field("C")
            .unwrap()
            .constraints()
            .iter()
            .map(|c| c.tag_id())
            .collect();
        assert_eq!(ids, vec![TagId::Type, TagId::Regex, TagId::Range]);
    }

    #[test]
    fn test_forward_field_constraint_is_bound() {
        let module = load(json!({
            "fields": {
                "Ids": {"constraints": [{"type": "list", "of": "Id"}]},
                "Id": {"constraints": [{"type": "type", "flag": "integer"}]}
            }
        }))
        .unwrap();
        let ids = module.get_field("Ids").unwrap();
        assert!(ids.quick_test(&json!([1, 2])));
        assert!(!ids.quick_test(&json!([1, "x"])));
    }

    #[test]
    fn test_undefined_reference() {
        let err = load(json!({
            "fields": {
                "A": {"type": "B"},
                "C": "A"
            }
        }))
        .unwrap_err();
        assert_eq!(err.code(), ModuleErrorCode::UndefinedObject);
        assert_eq!(err.name(), Some("B"));
    }

    #[test]
    fn test_field_redefinition() {
        let err = load(json!({"fields": {"string": {}}})).unwrap_err();
        assert_eq!(err.code(), ModuleErrorCode::Redefinition);

        let err = load(json!({
            "fields": {"User": {}},
            "models": {"User": {"id": "integer"}}
        }))
        .unwrap_err();
        assert_eq!(err.code(), ModuleErrorCode::Redefinition);
        assert_eq!(err.name(), Some("User"));
    }

    #[test]
    fn test_invalid_definitions() {
        let unknown = load(json!({"fields": {"A": {"constraints": [{"type": "magic"}]}}})).unwrap_err();
        assert_eq!(unknown.code(), ModuleErrorCode::InvalidModule);
        assert_eq!(unknown.name(), Some("A"));

        let regex = load(json!({"fields": {"A": {"constraints": [{"type": "regex", "pattern": "("}]}}}))
            .unwrap_err();
        assert_eq!(regex.code(), ModuleErrorCode::InvalidModule);

        let inherit = load(json!({"models": {"A": {".meta": {"inherit": "Nope"}}}})).unwrap_err();
        assert_eq!(inherit.code(), ModuleErrorCode::InvalidModule);
    }

    #[test]
    fn test_model_members_and_meta() {
        let module = load(json!({
            "models": {
                "User": {
                    ".meta": {"description": "a user", "strict": true},
                    "id": "integer",
                    "nick": "string?",
                    "age": {"type": "integer", "optional": true}
                }
            }
        }))
        .unwrap();

        let user = module.get_model("User").unwrap();
        assert_eq!(user.annotation("description"), Some("a user"));
        assert!(user.is_strict());
        assert!(user.get_field("id").unwrap().required);
        assert!(!user.get_field("nick").unwrap().required);
        assert!(!user.get_field("age").unwrap().required);
        assert_eq!(user.fields().count(), 3);

        let field = module.get_field("User").unwrap();
        assert_eq!(field.constraints()[0].tag_id(), TagId::Model);
        assert!(field.quick_test(&json!({"id": 1})));
    }

    #[test]
    fn test_model_used_before_definition() {
        let module = load(json!({
            "models": {
                "Order": {"owner": "Customer", "id": "integer"},
                "Customer": {"name": "string", "referrer": "Customer?"}
            }
        }))
        .unwrap();

        let doc = json!({"id": 1, "owner": {"name": "a", "referrer": {"name": "b"}}});
        assert!(module.validate("Order", &doc).unwrap().is_valid());

        let bad = json!({"id": 1, "owner": {"name": "a", "referrer": {"name": 2}}});
        let result = module.validate("Order", &bad).unwrap();
        assert!(!result.is_valid());
        assert_eq!(result.details[0].name, "owner");
    }

    #[test]
    fn test_inheritance_with_exclusion_and_override() {
        let module = load(json!({
            "models": {
                "Base": {"a": "integer", "b": "string", "c": "string"},
                "Child": {
                    ".meta": {"inherit": ["Base"], "exclude_fields": ["b"]},
                    "c": "integer?",
                    "d": "bool"
                }
            }
        }))
        .unwrap();
        let child = module.get_model("Child").unwrap();
        let keys: Vec<&str> = child.fields().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["a", "c", "d"]);
        assert!(!child.get_field("c").unwrap().required);
        assert_eq!(child.get_field("c").unwrap().field.name(), "IntegerField");
    }

    #[test]
    fn test_inherited_waiting_member_is_filled() {
        let module = load(json!({
            "models": {
                "Base": {"tag": "Tag"},
                "Child": {".meta": {"inherit": "Base"}},
                "Tag": {"label": "string"}
            }
        }))
        .unwrap();
        let child = module.get_model("Child").unwrap();
        assert_eq!(child.get_field("tag").unwrap().field.name(), "Tag");
    }

    #[test]
    fn test_constraint_props() {
        let module = load(json!({
            "fields": {
                "Port": {
                    "constraints": [
                        {"type": "type", "flag": "integer", "fatal": false, "name": "port_type"},
                        {"type": "range", "min": 1, "max": 65535.0},
                        {"type": "literal", "value": 8080, "name": "default_port"}
                    ]
                }
            }
        }))
        .unwrap();
        let port = module.get_field("Port").unwrap();
        assert!(!port.constraints()[0].is_fatal());
        assert_eq!(port.constraints()[0].name(), "port_type");
        assert!(port.quick_test(&json!(8080)));

        let failures = port.validate(&json!("x"));
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].name, "port_type");
        assert_eq!(failures[1].name, "default_port");
    }

    #[test]
    fn test_any_constraint_form() {
        let module = load(json!({
            "fields": {
                "Flag": {"constraints": [{"type": "any", "of": [
                    {"type": "type", "flag": "bool"},
                    {"type": "literal", "value": "yes"}
                ]}]}
            }
        }))
        .unwrap();
        let flag = module.get_field("Flag").unwrap();
        assert!(flag.quick_test(&json!(true)));
        assert!(flag.quick_test(&json!("yes")));

        let failures = flag.validate(&json!("no"));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "any_constraint");
        assert_eq!(failures[0].reason, "None of the constraints passed.");
        assert!(failures[0].details.is_empty());
    }

    #[test]
    fn test_all_constraint_form() {
        let module = load(json!({
            "fields": {
                "Code": {"constraints": [
                    {"type": "all", "of": [
                        {"type": "type", "flag": "string"},
                        {"type": "regex", "pattern": "[A-Z]+", "message": "upper case only"}
                    ]},
                    {"type": "all", "hide": false, "name": "code_length", "of": [
                        {"type": "range", "min": 2, "max": 3}
                    ]}
                ]}
            }
        }))
        .unwrap();
        let code = module.get_field("Code").unwrap();
        assert!(code.quick_test(&json!("AB")));

        let failures = code.validate(&json!("abcd"));
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].name, "regex_constraint");
        assert_eq!(failures[0].reason, "upper case only");
        assert_eq!(failures[1].name, "code_length");
        assert_eq!(failures[1].details.len(), 1);
        assert_eq!(failures[1].details[0].name, "range_constraint");
        assert_eq!(failures[1].details[0].reason, "invalid string length.");
    }

    #[test]
    fn test_list_constraint_ignore_details() {
        let module = load(json!({
            "fields": {
                "Ids": {"constraints": [{"type": "list", "of": "integer", "ignore_details": true}]}
            }
        }))
        .unwrap();
        let ids = module.get_field("Ids").unwrap();
        assert!(ids.quick_test(&json!([1, 2])));

        let failures = ids.validate(&json!([1, "x"]));
        assert_eq!(failures[0].name, "list_constraint");
        assert_eq!(failures[0].reason, "invalid list.");
        assert!(failures[0].details.is_empty());
    }

    #[test]
    fn test_tuple_constraint_form() {
        let module = load(json!({
            "fields": {
                "Pair": {"constraints": [{"type": "tuple", "items": ["string", "integer"]}]},
                "Head": {"constraints": [{"type": "tuple", "items": ["string"], "strict": false}]},
                "QuietPair": {"constraints": [
                    {"type": "tuple", "items": ["string", "integer"], "ignore_details": true}
                ]}
            }
        }))
        .unwrap();

        let pair = module.get_field("Pair").unwrap();
        assert!(pair.quick_test(&json!(["a", 1])));
        assert_eq!(pair.validate(&json!(["a", 1, 2]))[0].reason, "Too many values in the tuple.");
        let failures = pair.validate(&json!(["a", "b"]));
        assert_eq!(failures[0].name, "tuple_constraint");
        assert_eq!(failures[0].reason, "invalid tuple.");
        let index = &failures[0].details[0];
        assert!(index.is_field());
        assert_eq!(index.name, "1");
        assert_eq!(index.details[0].name, "IntegerField");

        let head = module.get_field("Head").unwrap();
        assert!(head.quick_test(&json!(["a", 1, 2])));
        assert_eq!(head.validate(&json!([]))[0].reason, "Too few values in the tuple.");

        let quiet = module.get_field("QuietPair").unwrap();
        let failures = quiet.validate(&json!(["a", "b"]));
        assert_eq!(failures[0].reason, "invalid tuple.");
        assert!(failures[0].details.is_empty());
    }

    #[test]
    fn test_map_constraint_form() {
        let module = load(json!({
            "fields": {
                "Scores": {"constraints": [{"type": "map",
                    "key": {"type": "regex", "pattern": "[a-z]+"},
                    "value": "integer"
                }]},
                "QuietScores": {"constraints": [{"type": "map",
                    "value": "integer",
                    "ignore_details": true
                }]}
            }
        }))
        .unwrap();

        let scores = module.get_field("Scores").unwrap();
        assert!(scores.quick_test(&json!({"ok": 1})));
        assert_eq!(scores.validate(&json!([1]))[0].reason, "Expected an object.");

        let bad_key = scores.validate(&json!({"Bad": 1}));
        assert_eq!(bad_key[0].name, "map_constraint");
        assert_eq!(bad_key[0].reason, "invalid map.");
        assert_eq!(bad_key[0].details[0].name, "Bad");
        assert!(bad_key[0].details[0].is_field());
        assert_eq!(bad_key[0].details[0].details[0].name, "regex_constraint");

        let bad_value = scores.validate(&json!({"ok": "x"}));
        assert_eq!(bad_value[0].details[0].name, "ok");
        assert_eq!(bad_value[0].details[0].details[0].name, "IntegerField");

        let quiet = module.get_field("QuietScores").unwrap();
        let failures = quiet.validate(&json!({"ok": "x"}));
        assert_eq!(failures[0].name, "map_constraint");
        assert_eq!(failures[0].reason, "invalid map.");
        assert!(failures[0].details.is_empty());
    }

    #[test]
    fn test_field_constraint_object_form() {
        let module = load(json!({
            "fields": {
                "Hidden": {"constraints": [{"type": "field", "field": "Switch", "hide": true}]},
                "Shown": {"constraints": [{"type": "field", "field": "Switch"}]},
                "Quiet": {"constraints": [
                    {"type": "field", "field": "Switch", "ignore_details": true, "message": "must be on"}
                ]},
                "Switch": {"constraints": [{"type": "literal", "value": "on"}]}
            }
        }))
        .unwrap();

        for name in ["Hidden", "Shown", "Quiet"] {
            assert!(module.get_field(name).unwrap().quick_test(&json!("on")));
        }

        let hidden = module.get_field("Hidden").unwrap().validate(&json!("off"));
        assert_eq!(hidden[0].name, "literal_constraint");
        assert_eq!(hidden[0].reason, "invalid literal value.");

        let shown = module.get_field("Shown").unwrap().validate(&json!("off"));
        assert_eq!(shown[0].name, "Switch");
        assert_eq!(shown[0].details[0].name, "literal_constraint");

        let quiet = module.get_field("Quiet").unwrap().validate(&json!("off"));
        assert_eq!(quiet[0].name, "Switch");
        assert_eq!(quiet[0].reason, "must be on");
        assert!(quiet[0].details.is_empty());
    }

    #[test]
    fn test_literal_constraint_values() {
        let module = load(json!({
            "fields": {
                "Mode": {"constraints": [{"type": "any", "of": [
                    {"type": "literal", "value": "auto"},
                    {"type": "literal", "value": false},
                    {"type": "literal"}
                ]}]}
            }
        }))
        .unwrap();
        let mode = module.get_field("Mode").unwrap();
        for ok in [json!("auto"), json!(false), json!(null)] {
            assert!(mode.quick_test(&ok));
        }
        for bad in [json!("manual"), json!(true), json!(0)] {
            assert!(!mode.quick_test(&bad));
        }

        let err = load(json!({
            "fields": {"Bad": {"constraints": [{"type": "literal", "value": [1]}]}}
        }))
        .unwrap_err();
        assert_eq!(err.code(), ModuleErrorCode::InvalidModule);
    }

    #[test]
    fn test_quiet_model_member() {
        let module = load(json!({
            "models": {
                "Account": {
                    "pin": {
                        "type": "string",
                        "ignore_details": true,
                        "message": "nope",
                        "constraints": [{"type": "regex", "pattern": "\\d{4}"}]
                    }
                }
            }
        }))
        .unwrap();

        assert!(module.validate("Account", &json!({"pin": "1234"})).unwrap().is_valid());

        let result = module.validate("Account", &json!({"pin": "12"})).unwrap();
        assert_eq!(result.details.len(), 1);
        let pin = &result.details[0];
        assert!(pin.is_field());
        assert_eq!(pin.name, "pin");
        assert_eq!(pin.reason, "nope");
        assert!(pin.details.is_empty());
    }

    #[test]
    fn test_split_optional() {
        assert_eq!(split_optional("string?"), ("string", true));
        assert_eq!(split_optional("string"), ("string", false));
    }
}

//! Module: registry of named fields and models
//!
//! A fresh module already holds the seven built-in type fields, so module
//! descriptions can refer to `string`, `integer`, `double`, `list`,
//! `object`, `bool` and `null` without defining them.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::layer::{TypeFlag, ViewLayer};

use super::constraints::Constraint;
use super::errors::{ModuleError, ModuleResult};
use super::field::Field;
use super::model::Model;
use super::parser::ModuleParser;
use super::result::ConstraintResult;

const BUILTIN_FIELDS: [(&str, &str, TypeFlag); 7] = [
    ("string", "StringField", TypeFlag::String),
    ("integer", "IntegerField", TypeFlag::Integer),
    ("double", "DoubleField", TypeFlag::Double),
    ("list", "ListField", TypeFlag::List),
    ("object", "ObjectField", TypeFlag::Object),
    ("bool", "BooleanField", TypeFlag::Boolean),
    ("null", "NullField", TypeFlag::Null),
];

#[derive(Debug, Clone)]
pub struct Module {
    fields: BTreeMap<String, Arc<Field>>,
    models: BTreeMap<String, Arc<Model>>,
}

impl Module {
    /// Creates a module holding only the built-in fields.
    pub fn new() -> Self {
        let fields = BUILTIN_FIELDS
            .iter()
            .map(|(key, name, flag)| {
                let mut field = Field::new(*name);
                field.add_constraint(Constraint::type_of(*flag));
                (key.to_string(), Arc::new(field))
            })
            .collect();
        Self {
            fields,
            models: BTreeMap::new(),
        }
    }

    /// Loads a module description into a fresh module.
    pub fn load<'a, L: ViewLayer<'a>>(layer: L) -> ModuleResult<Self> {
        let mut module = Self::new();
        module.extend(layer)?;
        Ok(module)
    }

    /// Loads a module description on top of what is already registered.
    ///
    /// On error the module may hold a part of the description.
    pub fn extend<'a, L: ViewLayer<'a>>(&mut self, layer: L) -> ModuleResult<()> {
        ModuleParser::new(self).parse(layer)
    }

    /// Registers `field` under `name`. Names are unique per module.
    pub fn add_field(&mut self, name: impl Into<String>, field: Arc<Field>) -> ModuleResult<()> {
        let name = name.into();
        if self.fields.contains_key(&name) {
            return Err(ModuleError::redefinition(name));
        }
        self.fields.insert(name, field);
        Ok(())
    }

    /// Registers `model` under its own name.
    pub fn add_model(&mut self, model: Arc<Model>) -> ModuleResult<()> {
        if self.models.contains_key(model.name()) {
            return Err(ModuleError::redefinition(model.name()));
        }
        self.models.insert(model.name().to_owned(), model);
        Ok(())
    }

    pub fn get_field(&self, name: &str) -> Option<&Arc<Field>> {
        self.fields.get(name)
    }

    pub fn get_model(&self, name: &str) -> Option<&Arc<Model>> {
        self.models.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered fields in name order, built-ins included.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Arc<Field>)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Registered models in name order.
    pub fn models(&self) -> impl Iterator<Item = (&str, &Arc<Model>)> {
        self.models.iter().map(|(name, model)| (name.as_str(), model))
    }

    /// Validates `layer` against the model `model`, or `None` if no such
    /// model is registered.
    pub fn validate<'a, L: ViewLayer<'a>>(&self, model: &str, layer: L) -> Option<ConstraintResult> {
        self.models.get(model).map(|model| model.validate(layer))
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::errors::ModuleErrorCode;
    use serde_json::json;

    #[test]
    fn test_builtin_fields() {
        let module = Module::new();
        assert_eq!(module.fields().count(), 7);
        assert_eq!(module.models().count(), 0);

        let string = module.get_field("string").unwrap();
        assert_eq!(string.name(), "StringField");
        assert_eq!(string.constraints().len(), 1);
        assert!(string.quick_test(&json!("x")));
        assert!(!string.quick_test(&json!(1)));

        assert_eq!(module.get_field("bool").unwrap().name(), "BooleanField");
        assert!(module.get_field("null").unwrap().quick_test(&json!(null)));
    }

    #[test]
    fn test_field_redefinition() {
        let mut module = Module::new();
        module.add_field("Name", Arc::new(Field::new("Name"))).unwrap();
        let err = module
            .add_field("Name", Arc::new(Field::new("Name")))
            .unwrap_err();
        assert_eq!(err.code(), ModuleErrorCode::Redefinition);
        assert_eq!(err.name(), Some("Name"));

        assert!(module.add_field("string", Arc::new(Field::anonymous())).is_err());
    }

    #[test]
    fn test_model_redefinition() {
        let mut module = Module::new();
        module.add_model(Arc::new(Model::new("User"))).unwrap();
        let err = module.add_model(Arc::new(Model::new("User"))).unwrap_err();
        assert_eq!(err.code(), ModuleErrorCode::Redefinition);
    }

    #[test]
    fn test_validate_by_model_name() {
        let mut module = Module::new();
        let mut model = Model::new("Point");
        model.add_field("x", module.get_field("integer").unwrap().clone(), true);
        module.add_model(Arc::new(model)).unwrap();

        assert!(module.validate("Point", &json!({"x": 1})).unwrap().is_valid());
        assert!(!module.validate("Point", &json!({})).unwrap().is_valid());
        assert!(module.validate("Missing", &json!({})).is_none());
    }
}

//! Models: named sets of member fields validated against objects
//!
//! Validation order:
//! 1. the input must be an object
//! 2. every present member is tested against its field
//! 3. every required member must be present
//! 4. in strict mode, every present member must be declared

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::layer::ViewLayer;
use crate::sequence::Sequence;
use crate::text::Text;

use super::field::Field;
use super::result::ConstraintResult;

const INVALID_MODEL: &str = "This model is invalid!";
const MISSING_REQUIRED: &str = "missing required field!";
const UNDECLARED: &str = "undeclared field!";

/// A member slot of a model.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub field: Arc<Field>,
    pub required: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    name: String,
    field_map: BTreeMap<String, FieldDescriptor>,
    annotations: BTreeMap<String, String>,
    strict: bool,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares or replaces the member `key`.
    pub fn add_field(&mut self, key: impl Into<String>, field: Arc<Field>, required: bool) {
        self.field_map
            .insert(key.into(), FieldDescriptor { field, required });
    }

    pub fn remove_field(&mut self, key: &str) -> Option<FieldDescriptor> {
        self.field_map.remove(key)
    }

    pub fn get_field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.field_map.get(key)
    }

    /// Members in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.field_map
            .iter()
            .map(|(key, descriptor)| (key.as_str(), descriptor))
    }

    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    pub fn set_annotation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Validates `layer` and reports every failing member.
    pub fn validate<'a, L: ViewLayer<'a>>(&self, layer: L) -> ConstraintResult {
        if !layer.is_object() {
            let detail = ConstraintResult::leaf_failure("type", "Expected object.");
            return self.invalid([detail].into_iter().collect());
        }

        let mut failures = Sequence::no_sequence();
        for (key, value) in layer.iter_members() {
            let Some(descriptor) = self.field_map.get(key.as_str()) else {
                continue;
            };
            if let Some(failure) = member_failure(key, &descriptor.field, value) {
                failures.push_back(failure);
            }
        }

        for (key, descriptor) in &self.field_map {
            if descriptor.required && layer.find_member(key).is_none() {
                failures.push_back(ConstraintResult::field_failure(
                    Text::owned(key.clone()),
                    MISSING_REQUIRED,
                    Sequence::no_sequence(),
                ));
            }
        }

        if self.strict {
            for (key, _) in layer.iter_members() {
                if !self.field_map.contains_key(key.as_str()) {
                    failures.push_back(ConstraintResult::field_failure(
                        key.into_owned(),
                        UNDECLARED,
                        Sequence::no_sequence(),
                    ));
                }
            }
        }

        if failures.is_empty() {
            ConstraintResult::ok()
        } else {
            self.invalid(failures)
        }
    }

    pub fn quick_test<'a, L: ViewLayer<'a>>(&self, layer: L) -> bool {
        if !layer.is_object() {
            return false;
        }
        let members_pass = layer.iter_members().all(|(key, value)| {
            match self.field_map.get(key.as_str()) {
                Some(descriptor) => descriptor.field.quick_test(value),
                None => !self.strict,
            }
        });
        members_pass
            && self
                .field_map
                .iter()
                .filter(|(_, descriptor)| descriptor.required)
                .all(|(key, _)| layer.find_member(key).is_some())
    }

    fn invalid(&self, details: Sequence<ConstraintResult>) -> ConstraintResult {
        ConstraintResult::failure(Text::owned(self.name.clone()), INVALID_MODEL, details)
    }
}

fn member_failure<'a, L: ViewLayer<'a>>(key: Text<'a>, field: &Field, value: L) -> Option<ConstraintResult> {
    let reason = || Text::owned(field.message().unwrap_or_default().to_owned());
    if field.ignore_details() {
        if field.quick_test(value) {
            return None;
        }
        return Some(ConstraintResult::field_failure(
            key.into_owned(),
            reason(),
            Sequence::no_sequence(),
        ));
    }
    let details = field.validate(value);
    if details.is_empty() {
        return None;
    }
    Some(ConstraintResult::field_failure(key.into_owned(), reason(), details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::TypeFlag;
    use crate::schema::constraints::Constraint;
    use serde_json::json;

    fn typed(flag: TypeFlag) -> Arc<Field> {
        let mut field = Field::new(flag.type_name());
        field.add_constraint(Constraint::type_of(flag));
        Arc::new(field)
    }

    fn user() -> Model {
        let mut model = Model::new("User");
        model.add_field("id", typed(TypeFlag::Integer), true);
        model.add_field("name", typed(TypeFlag::String), false);
        model
    }

    #[test]
    fn test_valid_object() {
        let model = user();
        assert!(model.validate(&json!({"id": 1, "name": "a"})).is_valid());
        assert!(model.validate(&json!({"id": 1, "extra": true})).is_valid());
        assert!(model.quick_test(&json!({"id": 1})));
    }

    #[test]
    fn test_rejects_non_object() {
        let result = user().validate(&json!([1]));
        assert_eq!(result.name, "User");
        assert_eq!(result.reason, "This model is invalid!");
        assert_eq!(result.details[0].name, "type");
        assert_eq!(result.details[0].reason, "Expected object.");
        assert!(!user().quick_test(&json!("x")));
    }

    #[test]
    fn test_reports_member_and_missing_failures() {
        let result = user().validate(&json!({"name": 5}));
        assert_eq!(result.details.len(), 2);

        let name = &result.details[0];
        assert!(name.field);
        assert_eq!(name.name, "name");
        assert_eq!(name.details[0].reason, "Expected string.");

        let id = &result.details[1];
        assert_eq!(id.name, "id");
        assert_eq!(id.reason, "missing required field!");
    }

    #[test]
    fn test_strict_rejects_undeclared() {
        let mut model = user();
        model.set_strict(true);
        let result = model.validate(&json!({"id": 1, "extra": true}));
        assert_eq!(result.details[0].name, "extra");
        assert_eq!(result.details[0].reason, "undeclared field!");
        assert!(!model.quick_test(&json!({"id": 1, "extra": true})));
    }

    #[test]
    fn test_ignore_details_member_is_leaf() {
        let mut field = Field::new("Flag");
        field.add_constraint(Constraint::type_of(TypeFlag::Boolean));
        field.set_ignore_details(true);
        field.set_annotation("message", "must be a flag");

        let mut model = Model::new("Settings");
        model.add_field("enabled", Arc::new(field), false);

        let result = model.validate(&json!({"enabled": "yes"}));
        let member = &result.details[0];
        assert_eq!(member.reason, "must be a flag");
        assert!(member.details.is_empty());
    }
}

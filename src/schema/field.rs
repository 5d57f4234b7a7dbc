//! Named, ordered list of constraints with string annotations

use std::collections::BTreeMap;

use crate::layer::ViewLayer;
use crate::sequence::Sequence;

use super::constraints::{quick_test_all, test_constraints, Constraint};
use super::result::ConstraintResult;

/// Annotation read as the failure reason of a field.
pub const MESSAGE_ANNOTATION: &str = "message";

#[derive(Debug, Clone, Default)]
pub struct Field {
    name: String,
    constraints: Sequence<Constraint>,
    annotations: BTreeMap<String, String>,
    ignore_details: bool,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Field with no name, as created for inline member definitions.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn constraints(&self) -> &Sequence<Constraint> {
        &self.constraints
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push_back(constraint);
    }

    /// Prepends `other`'s constraints, keeping their order.
    pub fn inherit_constraints_from(&mut self, other: &Field) {
        self.constraints
            .push_front_range(other.constraints.iter().cloned());
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

    /// The `message` annotation, if set.
    pub fn message(&self) -> Option<&str> {
        self.annotation(MESSAGE_ANNOTATION)
    }

    pub fn ignore_details(&self) -> bool {
        self.ignore_details
    }

    pub fn set_ignore_details(&mut self, ignore_details: bool) {
        self.ignore_details = ignore_details;
    }

    /// Runs every constraint in order and returns the failures. Evaluation
    /// stops after the first failing fatal constraint.
    pub fn validate<'a, L: ViewLayer<'a>>(&self, layer: L) -> Sequence<ConstraintResult> {
        let mut failures = Sequence::no_sequence();
        test_constraints(&self.constraints, layer, &mut failures);
        failures
    }

    pub fn quick_test<'a, L: ViewLayer<'a>>(&self, layer: L) -> bool {
        quick_test_all(&self.constraints, layer)
    }
}

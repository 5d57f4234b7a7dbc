//! Structured validation outcome
//!
//! A passing result carries nothing. A failing result names the constraint
//! (or, when `field` is set, the member key or list index) that failed, a
//! reason, and the child failures of composite constraints.

use std::fmt;

use serde::Serialize;

use crate::sequence::Sequence;
use crate::text::Text;

/// Outcome of testing a constraint, field or model against a layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintResult {
    #[serde(skip_serializing_if = "Sequence::is_empty")]
    pub details: Sequence<ConstraintResult>,
    pub name: Text<'static>,
    pub reason: Text<'static>,
    pub valid: bool,
    /// `name` is a member key or element index rather than a constraint name
    pub field: bool,
}

impl Default for ConstraintResult {
    fn default() -> Self {
        Self::ok()
    }
}

impl ConstraintResult {
    /// The passing result.
    pub fn ok() -> Self {
        Self {
            details: Sequence::no_sequence(),
            name: Text::default(),
            reason: Text::default(),
            valid: true,
            field: false,
        }
    }

    /// A failure with no child details.
    pub fn leaf_failure(name: impl Into<Text<'static>>, reason: impl Into<Text<'static>>) -> Self {
        Self {
            details: Sequence::no_sequence(),
            name: name.into(),
            reason: reason.into(),
            valid: false,
            field: false,
        }
    }

    /// A composite failure wrapping child failures.
    pub fn failure(
        name: impl Into<Text<'static>>,
        reason: impl Into<Text<'static>>,
        details: Sequence<ConstraintResult>,
    ) -> Self {
        Self {
            details,
            name: name.into(),
            reason: reason.into(),
            valid: false,
            field: false,
        }
    }

    /// A failure attributed to a member key or element index.
    pub fn field_failure(
        name: impl Into<Text<'static>>,
        reason: impl Into<Text<'static>>,
        details: Sequence<ConstraintResult>,
    ) -> Self {
        Self {
            details,
            name: name.into(),
            reason: reason.into(),
            valid: false,
            field: true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_field(&self) -> bool {
        self.field
    }

    /// Depth-first search for a failure with the given name.
    pub fn find(&self, name: &str) -> Option<&ConstraintResult> {
        if !self.valid && self.name == name {
            return Some(self);
        }
        self.details.iter().find_map(|detail| detail.find(name))
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        let label = if self.field { "Field" } else { "Constraint" };
        writeln!(f, "{}{}: {}", indent, label, self.name)?;
        if !self.reason.is_empty() {
            writeln!(f, "{}Reason: {}", indent, self.reason)?;
        }
        for detail in &self.details {
            detail.write_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ConstraintResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            return writeln!(f, "OK");
        }
        self.write_tree(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> ConstraintResult {
        let inner = ConstraintResult::leaf_failure("type_constraint", "Expected integer.");
        let member = ConstraintResult::field_failure("id", "", [inner].into_iter().collect());
        ConstraintResult::failure("User", "This model is invalid!", [member].into_iter().collect())
    }

    #[test]
    fn test_ok_is_empty() {
        let result = ConstraintResult::ok();
        assert!(result.is_valid());
        assert!(result.details.is_empty());
        assert!(result.name.is_empty());
        assert!(result.reason.is_empty());
    }

    #[test]
    fn test_default_is_passing() {
        let result = ConstraintResult::default();
        assert!(result.is_valid());
        assert_eq!(result, ConstraintResult::ok());
    }

    #[test]
    fn test_display_renders_tree() {
        let rendered = nested().to_string();
        let expected = "Constraint: User\n\
                        Reason: This model is invalid!\n  \
                        Field: id\n    \
                        Constraint: type_constraint\n    \
                        Reason: Expected integer.\n";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_serializes_without_empty_details() {
        let value = serde_json::to_value(nested()).unwrap();
        assert_eq!(value["name"], "User");
        assert_eq!(value["details"][0]["field"], true);
        assert!(value["details"][0]["details"][0].get("details").is_none());
    }

    #[test]
    fn test_find_descends() {
        let result = nested();
        let found = result.find("type_constraint").unwrap();
        assert_eq!(found.reason, "Expected integer.");
        assert!(result.find("range_constraint").is_none());
    }
}

//! Closed enumerations: choice literals and subcommands.
//!
//! Entries are reference counted so that a bound value points at the very
//! entry that matched; [`choice_index`] and [`subcommand_index`] recover the
//! position of a bound entry by pointer identity.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tree::SchemaId;

/// One allowed literal of a [`ChoiceSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// The literal the user types.
    pub value: String,
    /// Help text for the literal.
    #[serde(default)]
    pub description: String,
}

/// Ordered set of allowed literals.
///
/// Cloning a set is cheap and keeps entry identity, so the caller can hold a
/// clone for [`choice_index`] lookups after parsing.
///
/// # Examples
///
/// ```
/// use argwright_core::{ChoiceSet, choice_index};
///
/// let algorithms = ChoiceSet::new()
///     .with_choice("LIFO", "last-in first-out")
///     .with_choice("FIFO", "first-in first-out")
///     .case_insensitive();
///
/// let picked = algorithms.find("fifo").unwrap();
/// assert_eq!(picked.value, "FIFO");
/// assert_eq!(choice_index(&algorithms, &picked), Some(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChoiceSet {
    items: Vec<Arc<Choice>>,
    case_insensitive: bool,
    hide_details: bool,
}

impl ChoiceSet {
    /// Creates an empty, case-sensitive set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a literal.
    pub fn with_choice(mut self, value: &str, description: &str) -> Self {
        self.items.push(Arc::new(Choice {
            value: value.to_string(),
            description: description.to_string(),
        }));
        self
    }

    /// Matches literals regardless of ASCII case.
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Omits per-literal descriptions from usage output.
    pub fn hide_details(mut self) -> Self {
        self.hide_details = true;
        self
    }

    /// Returns `true` if matching ignores ASCII case.
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Returns `true` if usage output lists literals without descriptions.
    pub fn details_hidden(&self) -> bool {
        self.hide_details
    }

    /// All entries in declaration order.
    pub fn items(&self) -> &[Arc<Choice>] {
        &self.items
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Finds the entry matching `literal` under the configured case rule.
    pub fn find(&self, literal: &str) -> Option<Arc<Choice>> {
        self.items
            .iter()
            .find(|c| self.literals_equal(&c.value, literal))
            .cloned()
    }

    pub(crate) fn literals_equal(&self, a: &str, b: &str) -> bool {
        if self.case_insensitive {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }
}

/// One nested command of a [`SubcommandSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subcommand {
    /// Name matched against the token.
    pub name: String,
    /// Help text for the subcommand.
    pub description: String,
    /// Schema that parses the remaining tokens.
    pub schema: SchemaId,
}

/// Ordered set of subcommands.
///
/// # Examples
///
/// ```
/// use argwright_core::{CommandTree, Schema, SubcommandSet, subcommand_index};
///
/// let mut tree = CommandTree::new();
/// let init = tree.insert(Schema::new()).unwrap();
/// let set = SubcommandSet::new().with_subcommand("init", "create a repository", init);
///
/// let entry = set.find("init").unwrap();
/// assert_eq!(entry.schema, init);
/// assert_eq!(subcommand_index(&set, &entry), Some(0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SubcommandSet {
    items: Vec<Arc<Subcommand>>,
}

impl SubcommandSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a subcommand parsed by `schema`.
    pub fn with_subcommand(mut self, name: &str, description: &str, schema: SchemaId) -> Self {
        self.items.push(Arc::new(Subcommand {
            name: name.to_string(),
            description: description.to_string(),
            schema,
        }));
        self
    }

    /// All entries in declaration order.
    pub fn items(&self) -> &[Arc<Subcommand>] {
        &self.items
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Finds the entry whose name equals `name` exactly.
    pub fn find(&self, name: &str) -> Option<Arc<Subcommand>> {
        self.items.iter().find(|s| s.name == name).cloned()
    }
}

/// Position of `entry` in `set`, by pointer identity.
pub fn choice_index(set: &ChoiceSet, entry: &Arc<Choice>) -> Option<usize> {
    set.items.iter().position(|c| Arc::ptr_eq(c, entry))
}

/// Position of `entry` in `set`, by pointer identity.
pub fn subcommand_index(set: &SubcommandSet, entry: &Arc<Subcommand>) -> Option<usize> {
    set.items.iter().position(|s| Arc::ptr_eq(s, entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats() -> ChoiceSet {
        ChoiceSet::new()
            .with_choice("JSON", "json output")
            .with_choice("YAML", "yaml output")
    }

    #[test]
    fn test_case_sensitive_by_default() {
        let set = formats();
        assert!(set.find("json").is_none());
        assert_eq!(set.find("YAML").unwrap().value, "YAML");
    }

    #[test]
    fn test_case_insensitive_match() {
        let set = formats().case_insensitive();
        assert_eq!(set.find("yaml").unwrap().value, "YAML");
    }

    #[test]
    fn test_index_uses_identity_not_equality() {
        let set = formats();
        let copy = Arc::new(Choice {
            value: "JSON".to_string(),
            description: "json output".to_string(),
        });
        assert_eq!(choice_index(&set, &copy), None);

        let entry = set.find("JSON").unwrap();
        assert_eq!(choice_index(&set, &entry), Some(0));
        assert_eq!(choice_index(&set.clone(), &entry), Some(0));
    }

    #[test]
    fn test_subcommand_index() {
        let set = SubcommandSet::new()
            .with_subcommand("copy", "", SchemaId::from_index(0))
            .with_subcommand("delete", "", SchemaId::from_index(1));
        let delete = set.find("delete").unwrap();
        assert_eq!(subcommand_index(&set, &delete), Some(1));
        assert!(set.find("Delete").is_none());
    }
}

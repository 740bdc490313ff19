//! Declarative registry of backed-up tables
//!
//! Each table is declared with the fields every record must carry. Changing
//! what gets backed up is a settings change, not a code change.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{VaultError, VaultResult};

/// One backed-up table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    /// Fields every record must have; checked when inspecting a backup
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<String>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required_fields: Vec::new(),
        }
    }

    pub fn with_required(mut self, fields: &[&str]) -> Self {
        self.required_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Required fields absent from `record` (all of them if it isn't an object)
    pub fn missing_fields<'a>(&'a self, record: &Value) -> Vec<&'a str> {
        let object = record.as_object();
        self.required_fields
            .iter()
            .filter(|field| object.map_or(true, |o| !o.contains_key(field.as_str())))
            .map(String::as_str)
            .collect()
    }
}

/// Ordered set of table specs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRegistry {
    specs: Vec<TableSpec>,
}

impl TableRegistry {
    /// Build a registry, rejecting empty, duplicate or unsafe table names
    pub fn new(specs: Vec<TableSpec>) -> VaultResult<Self> {
        if specs.is_empty() {
            return Err(VaultError::Config("at least one table must be configured".into()));
        }

        let mut seen = HashSet::new();
        for spec in &specs {
            if !is_valid_table_name(&spec.name) {
                return Err(VaultError::Config(format!(
                    "invalid table name '{}': use lowercase letters, digits and underscores",
                    spec.name
                )));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(VaultError::Config(format!("duplicate table '{}'", spec.name)));
            }
        }

        Ok(Self { specs })
    }

    /// The tables of the retail back office
    pub fn retail_default() -> Self {
        Self {
            specs: vec![
                TableSpec::new("customers").with_required(&["id", "email"]),
                TableSpec::new("orders").with_required(&["id", "customer_id"]),
                TableSpec::new("loyalty_members").with_required(&["id", "customer_id"]),
                TableSpec::new("reward_redemptions").with_required(&["id", "member_id"]),
                TableSpec::new("campaigns").with_required(&["id", "name"]),
                TableSpec::new("newsletter_subscribers").with_required(&["email"]),
                TableSpec::new("store_locations").with_required(&["id", "name"]),
                TableSpec::new("gift_cards").with_required(&["code"]),
            ],
        }
    }

    /// Table names in registry order
    pub fn names(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&TableSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn into_specs(self) -> Vec<TableSpec> {
        self.specs
    }
}

fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_retail_default_is_valid() {
        let registry = TableRegistry::retail_default();
        let rebuilt = TableRegistry::new(registry.clone().into_specs()).unwrap();
        assert_eq!(rebuilt, registry);
        assert_eq!(registry.names()[0], "customers");
    }

    #[test]
    fn test_duplicate_rejected() {
        let result = TableRegistry::new(vec![TableSpec::new("orders"), TableSpec::new("orders")]);
        assert!(matches!(result, Err(VaultError::Config(msg)) if msg.contains("duplicate")));
    }

    #[test]
    fn test_path_like_name_rejected() {
        assert!(TableRegistry::new(vec![TableSpec::new("../etc")]).is_err());
        assert!(TableRegistry::new(vec![TableSpec::new("Customers")]).is_err());
        assert!(TableRegistry::new(vec![]).is_err());
    }

    #[test]
    fn test_missing_fields() {
        let spec = TableSpec::new("customers").with_required(&["id", "email"]);

        assert!(spec.missing_fields(&json!({"id": 1, "email": "a@b.c"})).is_empty());
        assert_eq!(spec.missing_fields(&json!({"id": 1})), vec!["email"]);
        assert_eq!(spec.missing_fields(&json!("scalar")), vec!["id", "email"]);
    }

    #[test]
    fn test_spec_serde_omits_empty_required() {
        let json = serde_json::to_string(&TableSpec::new("orders")).unwrap();
        assert_eq!(json, r#"{"name":"orders"}"#);

        let spec: TableSpec = serde_json::from_str(r#"{"name":"orders"}"#).unwrap();
        assert!(spec.required_fields.is_empty());
    }
}

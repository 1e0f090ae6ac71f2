use std::collections::HashSet;

use chmask_contracts::{ColumnMask, MaskSpec};

mod builtin;

/// Immutable, insertion-ordered table -> mask rule lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskSpecRegistry {
    specs: Vec<MaskSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryError {
    message: String,
}

impl RegistryError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RegistryError {}

impl MaskSpecRegistry {
    pub fn new(specs: Vec<MaskSpec>) -> Result<Self, RegistryError> {
        if specs.is_empty() {
            return Err(RegistryError::new(
                "mask spec registry must contain at least one table",
            ));
        }

        let mut tables = HashSet::with_capacity(specs.len());
        for spec in &specs {
            validate_spec(spec)?;
            if !tables.insert(spec.table_name.as_str()) {
                return Err(RegistryError::new(format!(
                    "mask spec registry has duplicate table `{}`",
                    spec.table_name
                )));
            }
        }

        Ok(Self { specs })
    }

    /// Rules for the production analytics tables.
    pub fn builtin() -> Self {
        let specs = builtin::BUILTIN_TABLES
            .iter()
            .map(|table| MaskSpec {
                table_name: table.table_name.to_string(),
                date_field: table.date_field,
                columns: table
                    .columns
                    .iter()
                    .map(|(column, value)| ColumnMask::new(*column, *value))
                    .collect(),
            })
            .collect();

        Self { specs }
    }

    pub fn from_json(raw: &str) -> Result<Self, RegistryError> {
        let specs = serde_json::from_str::<Vec<MaskSpec>>(raw).map_err(|err| {
            RegistryError::new(format!("mask spec must be a valid JSON table array: {}", err))
        })?;
        Self::new(specs)
    }

    /// Restricts the registry to `tables`, keeping registry order.
    pub fn select(&self, tables: &[String]) -> Result<Self, RegistryError> {
        if tables.is_empty() {
            return Ok(self.clone());
        }

        for table in tables {
            if self.get(table).is_none() {
                return Err(RegistryError::new(format!(
                    "unknown table `{}` in table selection",
                    table
                )));
            }
        }

        let specs = self
            .specs
            .iter()
            .filter(|spec| tables.iter().any(|t| t == &spec.table_name))
            .cloned()
            .collect();

        Ok(Self { specs })
    }

    pub fn get(&self, table_name: &str) -> Option<&MaskSpec> {
        self.specs.iter().find(|spec| spec.table_name == table_name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MaskSpec> {
        self.specs.iter()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.table_name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl<'a> IntoIterator for &'a MaskSpecRegistry {
    type Item = &'a MaskSpec;
    type IntoIter = std::slice::Iter<'a, MaskSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn validate_spec(spec: &MaskSpec) -> Result<(), RegistryError> {
    if !is_identifier(&spec.table_name) {
        return Err(RegistryError::new(format!(
            "table name `{}` must be a non-empty identifier",
            spec.table_name
        )));
    }

    if spec.columns.is_empty() {
        return Err(RegistryError::new(format!(
            "table `{}` must mask at least one column",
            spec.table_name
        )));
    }

    let mut columns = HashSet::with_capacity(spec.columns.len());
    for mask in &spec.columns {
        if !is_identifier(&mask.column) {
            return Err(RegistryError::new(format!(
                "table `{}` has invalid column name `{}`",
                spec.table_name, mask.column
            )));
        }
        if mask.value.trim().is_empty() {
            return Err(RegistryError::new(format!(
                "table `{}` column `{}` requires a non-empty replacement literal",
                spec.table_name, mask.column
            )));
        }
        if !columns.insert(mask.column.as_str()) {
            return Err(RegistryError::new(format!(
                "table `{}` masks column `{}` more than once",
                spec.table_name, mask.column
            )));
        }
    }

    Ok(())
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

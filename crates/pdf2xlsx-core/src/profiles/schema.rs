use crate::error::Pdf2XlsxError;
use crate::model::Field;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A profile record as written in the configuration file.
///
/// Mapping keys are template column headers, values are LineItem
/// attribute names. Key order is kept and becomes the write order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Target sheet; the template's first sheet when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_existing: Option<bool>,
    /// 1-based header row; detected from the mapping keys when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_row: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<Map<String, Value>>,
}

/// One template column and the attribute written into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub column: String,
    pub field: Field,
}

/// A validated, read-only supplier profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierProfile {
    pub sheet_name: Option<String>,
    pub clear_existing: bool,
    pub header_row: Option<u32>,
    pub mapping: Vec<ColumnMapping>,
}

impl SupplierProfile {
    /// The canonical attribute set, each written to a column of the same name.
    pub fn default_profile() -> Self {
        SupplierProfile {
            sheet_name: None,
            clear_existing: false,
            header_row: None,
            mapping: default_mapping(),
        }
    }

    /// Validate a configuration record for `supplier`.
    pub fn from_def(supplier: &str, def: &ProfileDef) -> Result<Self, Pdf2XlsxError> {
        let invalid = |reason: String| Pdf2XlsxError::InvalidProfile {
            supplier: supplier.to_string(),
            reason,
        };

        if let Some(ref sheet) = def.sheet_name {
            if sheet.trim().is_empty() {
                return Err(invalid("sheet_name must not be empty".into()));
            }
        }

        if def.header_row == Some(0) {
            return Err(invalid("header_row is 1-based and must be at least 1".into()));
        }

        let mapping = match def.mapping {
            None => default_mapping(),
            Some(ref map) => {
                if map.is_empty() {
                    return Err(invalid("mapping must not be empty".into()));
                }
                let mut mapping = Vec::with_capacity(map.len());
                for (column, target) in map {
                    if column.trim().is_empty() {
                        return Err(invalid("mapping contains an empty column header".into()));
                    }
                    let name = target.as_str().ok_or_else(|| {
                        invalid(format!(
                            "mapping for column '{column}' must be an attribute name, got {target}"
                        ))
                    })?;
                    let field = name
                        .parse::<Field>()
                        .map_err(|e| invalid(format!("column '{column}': {e}")))?;
                    mapping.push(ColumnMapping {
                        column: column.clone(),
                        field,
                    });
                }
                mapping
            }
        };

        Ok(SupplierProfile {
            sheet_name: def.sheet_name.clone(),
            clear_existing: def.clear_existing.unwrap_or(false),
            header_row: def.header_row,
            mapping,
        })
    }

    /// Parse and validate a single profile record given as JSON, e.g. a
    /// per-run override from the command line.
    pub fn from_options_json(supplier: &str, json: &str) -> Result<Self, Pdf2XlsxError> {
        let def: ProfileDef =
            serde_json::from_str(json).map_err(|e| Pdf2XlsxError::InvalidProfile {
                supplier: supplier.to_string(),
                reason: e.to_string(),
            })?;
        Self::from_def(supplier, &def)
    }

    /// The configuration-file form of this profile.
    pub fn to_def(&self) -> ProfileDef {
        let mapping = self
            .mapping
            .iter()
            .map(|m| (m.column.clone(), Value::String(m.field.name().to_string())))
            .collect();
        ProfileDef {
            description: None,
            sheet_name: self.sheet_name.clone(),
            clear_existing: Some(self.clear_existing),
            header_row: self.header_row,
            mapping: Some(mapping),
        }
    }
}

fn default_mapping() -> Vec<ColumnMapping> {
    Field::ALL
        .iter()
        .map(|&field| ColumnMapping {
            column: field.name().to_string(),
            field,
        })
        .collect()
}

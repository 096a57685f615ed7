use serde::Serialize;

use crate::table_catalog::RowType;

/// Identifies a table within the catalog during planning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableHandle {
    /// e.g. `["analytics", "page_views"]`
    qualified_name: Vec<String>,
    row_type: RowType,
}

impl TableHandle {
    pub fn new(qualified_name: Vec<String>, row_type: RowType) -> Self {
        TableHandle {
            qualified_name,
            row_type,
        }
    }

    pub fn qualified_name(&self) -> &[String] {
        &self.qualified_name
    }

    /// Unqualified table name
    pub fn name(&self) -> &str {
        self.qualified_name
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn row_type(&self) -> &RowType {
        &self.row_type
    }
}

//! Relational row types for time-series tables
//!
//! Row types are not built eagerly. A table stores a [`RowTypeProducer`] and
//! the host planner resolves it against its own [`TypeFactory`] once per
//! planning session.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column name → scalar type, iterated in name order
pub type FieldMap = BTreeMap<String, ScalarType>;

/// Deferred row type: resolved against a planner-supplied type factory
pub type RowTypeProducer =
    Arc<dyn Fn(&dyn TypeFactory) -> Result<RowType, TypeFactoryError> + Send + Sync>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeFactoryError {
    #[error("type {scalar_type} of field `{field}` is not supported")]
    UnsupportedType {
        field: String,
        scalar_type: ScalarType,
    },
    #[error("duplicate field `{field}` in row type")]
    DuplicateField { field: String },
}

/// Relational scalar type vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Double,
    Decimal,
    Char,
    Varchar,
    Date,
    Timestamp,
    Binary,
    Other,
}

impl ScalarType {
    pub fn sql_name(&self) -> &'static str {
        match self {
            ScalarType::Boolean => "BOOLEAN",
            ScalarType::TinyInt => "TINYINT",
            ScalarType::SmallInt => "SMALLINT",
            ScalarType::Integer => "INTEGER",
            ScalarType::BigInt => "BIGINT",
            ScalarType::Float => "FLOAT",
            ScalarType::Double => "DOUBLE",
            ScalarType::Decimal => "DECIMAL",
            ScalarType::Char => "CHAR",
            ScalarType::Varchar => "VARCHAR",
            ScalarType::Date => "DATE",
            ScalarType::Timestamp => "TIMESTAMP",
            ScalarType::Binary => "BINARY",
            ScalarType::Other => "OTHER",
        }
    }

    /// True for types that can hold an additive measure
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ScalarType::TinyInt
                | ScalarType::SmallInt
                | ScalarType::Integer
                | ScalarType::BigInt
                | ScalarType::Float
                | ScalarType::Double
                | ScalarType::Decimal
        )
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// A single named field of a row type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelField {
    pub name: String,
    pub index: usize,
    pub scalar_type: ScalarType,
    pub nullable: bool,
}

/// An ordered record type
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowType {
    fields: Vec<RelField>,
}

impl RowType {
    pub fn fields(&self) -> &[RelField] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&RelField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordType(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", field.scalar_type, field.name)?;
            if !field.nullable {
                write!(f, " NOT NULL")?;
            }
        }
        write!(f, ")")
    }
}

/// Planner-side factory for relational types.
///
/// Implemented by the host planner; [`SqlTypeFactory`] is the stock
/// implementation used by the CLI and tests.
pub trait TypeFactory: Send + Sync {
    fn create_field(
        &self,
        name: &str,
        scalar_type: ScalarType,
        nullable: bool,
    ) -> Result<(String, ScalarType, bool), TypeFactoryError>;

    /// Assemble a row type from fields in order, rejecting duplicate names
    fn create_row(
        &self,
        fields: Vec<(String, ScalarType, bool)>,
    ) -> Result<RowType, TypeFactoryError> {
        let mut seen = HashSet::new();
        let mut rel_fields = Vec::with_capacity(fields.len());
        for (index, (name, scalar_type, nullable)) in fields.into_iter().enumerate() {
            if !seen.insert(name.clone()) {
                return Err(TypeFactoryError::DuplicateField { field: name });
            }
            rel_fields.push(RelField {
                name,
                index,
                scalar_type,
                nullable,
            });
        }
        Ok(RowType { fields: rel_fields })
    }
}

/// Default type factory: accepts every scalar type except those explicitly
/// marked unsupported.
#[derive(Debug, Clone, Default)]
pub struct SqlTypeFactory {
    unsupported: HashSet<ScalarType>,
}

impl SqlTypeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unsupported(types: impl IntoIterator<Item = ScalarType>) -> Self {
        SqlTypeFactory {
            unsupported: types.into_iter().collect(),
        }
    }
}

impl TypeFactory for SqlTypeFactory {
    fn create_field(
        &self,
        name: &str,
        scalar_type: ScalarType,
        nullable: bool,
    ) -> Result<(String, ScalarType, bool), TypeFactoryError> {
        if self.unsupported.contains(&scalar_type) {
            return Err(TypeFactoryError::UnsupportedType {
                field: name.to_string(),
                scalar_type,
            });
        }
        Ok((name.to_string(), scalar_type, nullable))
    }
}

/// Build a row-type producer from a column map.
///
/// Every field is nullable: the remote store does not guarantee that any
/// column is populated. Field order follows the map's iteration order.
pub fn map_row_type(fields: FieldMap) -> RowTypeProducer {
    Arc::new(move |factory: &dyn TypeFactory| -> Result<RowType, TypeFactoryError> {
        let fields = fields
            .iter()
            .map(|(name, scalar_type)| factory.create_field(name, *scalar_type, true))
            .collect::<Result<Vec<_>, _>>()?;
        factory.create_row(fields)
    })
}

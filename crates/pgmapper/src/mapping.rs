//! Mapping schema handed to the adapter by the data mapper.

use crate::value::{Record, Value};

/// Pairs an object-side field with a data-side column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    /// Field name on the row object.
    pub object_field: String,
    /// Column name in the table.
    pub data_field: String,
}

impl FieldMapping {
    pub fn new(object_field: impl Into<String>, data_field: impl Into<String>) -> Self {
        Self {
            object_field: object_field.into(),
            data_field: data_field.into(),
        }
    }

    /// A mapping whose object field and column share a name.
    pub fn same(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            object_field: name.clone(),
            data_field: name,
        }
    }
}

/// A CRUD operation as configured in the mapper.
///
/// `statement` is a `{name}` template for fetch/update/delete and the bare table
/// name for insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operation {
    pub statement: String,
    /// Columns written by an insert, in column order.
    pub properties: Vec<FieldMapping>,
    /// Columns produced by the database (`RETURNING`), written back after insert.
    pub generated: Vec<FieldMapping>,
    /// Whether a fetch may legitimately return zero rows.
    pub multi: bool,
}

impl Operation {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            ..Self::default()
        }
    }

    /// Add a written column.
    pub fn property(mut self, mapping: FieldMapping) -> Self {
        self.properties.push(mapping);
        self
    }

    /// Replace all written columns.
    pub fn properties(mut self, mappings: impl IntoIterator<Item = FieldMapping>) -> Self {
        self.properties = mappings.into_iter().collect();
        self
    }

    /// Add a generated column.
    pub fn generated(mut self, mapping: FieldMapping) -> Self {
        self.generated.push(mapping);
        self
    }

    /// Allow zero-row fetch results.
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }
}

/// A custom statement or stored procedure call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    pub statement: String,
}

impl Action {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
        }
    }
}

/// Identifies the rows a delete removes.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteKey {
    /// A bare identifier, bound as the `{id}` parameter.
    Id(Value),
    /// A full parameter set (composite keys, extra predicates).
    Params(Record),
}

impl DeleteKey {
    /// The parameter set used to bind the delete template.
    pub fn to_params(&self) -> Record {
        match self {
            DeleteKey::Id(id) => Record::new().with("id", id.clone()),
            DeleteKey::Params(params) => params.clone(),
        }
    }
}

impl From<Record> for DeleteKey {
    fn from(params: Record) -> Self {
        DeleteKey::Params(params)
    }
}

impl From<Value> for DeleteKey {
    fn from(id: Value) -> Self {
        DeleteKey::Id(id)
    }
}

impl From<i64> for DeleteKey {
    fn from(id: i64) -> Self {
        DeleteKey::Id(Value::Int(id))
    }
}

impl From<i32> for DeleteKey {
    fn from(id: i32) -> Self {
        DeleteKey::Id(Value::from(id))
    }
}

impl From<&str> for DeleteKey {
    fn from(id: &str) -> Self {
        DeleteKey::Id(Value::from(id))
    }
}

impl From<uuid::Uuid> for DeleteKey {
    fn from(id: uuid::Uuid) -> Self {
        DeleteKey::Id(Value::Uuid(id))
    }
}

//! On-disk schema derivation for record shapes.
//!
//! This module provides the mapping contract between a statically-typed
//! record and the dynamically-described field list a columnar artifact
//! carries. A record type implements [`Tabular`] to declare exactly which
//! of its fields persist, under which names, and with which physical
//! types; everything the implementation does not list is transient and is
//! silently excluded from persistence.
//!
//! Derivation is deterministic: [`Tabular::schema`] is a function of the
//! shape alone, so two derivations always produce the same ordered field
//! list. Downstream column layout depends on that.
//!
//! # Example
//!
//! ```rust
//! use rowboat::error::FrameError;
//! use rowboat::schema::{Cell, Field, PhysicalType, Row, Schema, Tabular};
//!
//! struct Reading {
//!     sensor: String,
//!     value: Option<i32>,
//! }
//!
//! impl Tabular for Reading {
//!     fn schema() -> Schema {
//!         Schema::new(vec![
//!             Field::new("sensor", PhysicalType::Utf8),
//!             Field::new("value", PhysicalType::Int32).nullable(),
//!         ])
//!     }
//!
//!     fn row(&self) -> Vec<Cell> {
//!         vec![
//!             Cell::Utf8(self.sensor.clone()),
//!             self.value.map(Cell::Int32).unwrap_or(Cell::Null),
//!         ]
//!     }
//!
//!     fn from_row(mut row: Row<'_>) -> Result<Self, FrameError> {
//!         Ok(Reading {
//!             sensor: row.take_utf8("sensor")?,
//!             value: row.take_opt_i32("value")?,
//!         })
//!     }
//! }
//! ```

use crate::error::FrameError;

// ═══════════════════════════════════════════════════════════════════════
// Physical description
// ═══════════════════════════════════════════════════════════════════════

/// Physical types a persisted field can map to.
///
/// Dates are carried as days since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalType {
    Int32,
    Int64,
    Float32,
    Boolean,
    Utf8,
    Date32,
}

impl PhysicalType {
    /// Stable name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            PhysicalType::Int32 => "Int32",
            PhysicalType::Int64 => "Int64",
            PhysicalType::Float32 => "Float32",
            PhysicalType::Boolean => "Boolean",
            PhysicalType::Utf8 => "Utf8",
            PhysicalType::Date32 => "Date32",
        }
    }
}

/// Optional per-field encoding hint for the columnar codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Dictionary-encode the column (useful for low-cardinality strings).
    Dictionary,
}

/// One entry of a [`Schema`]: name, physical type, nullability, and an
/// optional encoding hint.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: PhysicalType,
    pub nullable: bool,
    pub encoding: Option<Encoding>,
}

impl Field {
    /// Create a required (non-nullable) field with no encoding hint.
    pub fn new(name: impl Into<String>, kind: PhysicalType) -> Self {
        Field {
            name: name.into(),
            kind,
            nullable: false,
            encoding: None,
        }
    }

    /// Mark the field nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Attach an encoding hint.
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }
}

/// Ordered field list derived from a record shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Schema { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Cell values and the row cursor
// ═══════════════════════════════════════════════════════════════════════

/// A single cell value in transit between a record and a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Boolean(bool),
    Utf8(String),
    /// Days since the Unix epoch.
    Date32(i32),
    Null,
}

impl Cell {
    /// Stable name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Cell::Int32(_) => "Int32",
            Cell::Int64(_) => "Int64",
            Cell::Float32(_) => "Float32",
            Cell::Boolean(_) => "Boolean",
            Cell::Utf8(_) => "Utf8",
            Cell::Date32(_) => "Date32",
            Cell::Null => "Null",
        }
    }
}

/// Cursor over one decoded row, used by [`Tabular::from_row`] to pull
/// cells out by field name.
///
/// Cells arrive in schema order; `take_*` consumes a cell (replacing it
/// with [`Cell::Null`]), so each field should be taken exactly once.
pub struct Row<'a> {
    fields: &'a [Field],
    cells: Vec<Cell>,
}

macro_rules! take_impl {
    ($take:ident, $take_opt:ident, $variant:ident, $ty:ty, $expected:literal) => {
        /// Take the named required cell.
        pub fn $take(&mut self, name: &str) -> Result<$ty, FrameError> {
            match self.take(name)? {
                Cell::$variant(v) => Ok(v),
                other => Err(FrameError::CellType {
                    field: name.to_string(),
                    expected: $expected,
                    found: other.kind().to_string(),
                }),
            }
        }

        /// Take the named cell, mapping null to `None`.
        pub fn $take_opt(&mut self, name: &str) -> Result<Option<$ty>, FrameError> {
            match self.take(name)? {
                Cell::Null => Ok(None),
                Cell::$variant(v) => Ok(Some(v)),
                other => Err(FrameError::CellType {
                    field: name.to_string(),
                    expected: $expected,
                    found: other.kind().to_string(),
                }),
            }
        }
    };
}

impl<'a> Row<'a> {
    pub fn new(schema: &'a Schema, cells: Vec<Cell>) -> Row<'a> {
        Row {
            fields: schema.fields(),
            cells,
        }
    }

    fn take(&mut self, name: &str) -> Result<Cell, FrameError> {
        let idx = self
            .fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| FrameError::UnknownField {
                field: name.to_string(),
            })?;
        Ok(std::mem::replace(&mut self.cells[idx], Cell::Null))
    }

    take_impl!(take_i32, take_opt_i32, Int32, i32, "Int32");
    take_impl!(take_i64, take_opt_i64, Int64, i64, "Int64");
    take_impl!(take_f32, take_opt_f32, Float32, f32, "Float32");
    take_impl!(take_bool, take_opt_bool, Boolean, bool, "Boolean");
    take_impl!(take_utf8, take_opt_utf8, Utf8, String, "Utf8");
    take_impl!(take_date32, take_opt_date32, Date32, i32, "Date32");
}

// ═══════════════════════════════════════════════════════════════════════
// The mapping contract
// ═══════════════════════════════════════════════════════════════════════

/// The field-mapping contract a record shape implements to be persisted
/// by the columnar codec.
///
/// Implementations must keep the three methods aligned: [`row`](Tabular::row)
/// produces cells in [`schema`](Tabular::schema) order, and
/// [`from_row`](Tabular::from_row) reconstructs the record from a cursor
/// over cells in that same order. Struct fields the implementation does
/// not list are transient: they never reach an artifact and come back at
/// their default after a round-trip.
pub trait Tabular: Sized {
    /// Derive the on-disk field list for this shape.
    ///
    /// Must be deterministic: the same shape always yields the same
    /// ordered fields.
    fn schema() -> Schema;

    /// Project this record onto its persisted cells, in schema order.
    fn row(&self) -> Vec<Cell>;

    /// Rebuild a record from one decoded row.
    fn from_row(row: Row<'_>) -> Result<Self, FrameError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Schema {
        Schema::new(vec![
            Field::new("name", PhysicalType::Utf8).with_encoding(Encoding::Dictionary),
            Field::new("age", PhysicalType::Int32),
            Field::new("score", PhysicalType::Float32).nullable(),
        ])
    }

    #[test]
    fn test_schema_derivation_is_deterministic() {
        let a = sample_schema();
        let b = sample_schema();
        assert_eq!(a, b);
        let names: Vec<&str> = a.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "age", "score"]);
    }

    #[test]
    fn test_row_takes_by_name_in_any_order() {
        let schema = sample_schema();
        let mut row = Row::new(
            &schema,
            vec![
                Cell::Utf8("ada".to_string()),
                Cell::Int32(36),
                Cell::Float32(9.5),
            ],
        );
        assert_eq!(row.take_i32("age").unwrap(), 36);
        assert_eq!(row.take_utf8("name").unwrap(), "ada");
        assert_eq!(row.take_opt_f32("score").unwrap(), Some(9.5));
    }

    #[test]
    fn test_row_null_maps_to_none_for_nullable() {
        let schema = sample_schema();
        let mut row = Row::new(
            &schema,
            vec![Cell::Utf8("ada".to_string()), Cell::Int32(36), Cell::Null],
        );
        assert_eq!(row.take_opt_f32("score").unwrap(), None);
    }

    #[test]
    fn test_row_kind_mismatch_names_field() {
        let schema = sample_schema();
        let mut row = Row::new(&schema, vec![Cell::Int32(1), Cell::Int32(2), Cell::Null]);
        let err = row.take_utf8("name").unwrap_err();
        match err {
            FrameError::CellType {
                field, expected, ..
            } => {
                assert_eq!(field, "name");
                assert_eq!(expected, "Utf8");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_row_unknown_field() {
        let schema = sample_schema();
        let mut row = Row::new(&schema, vec![Cell::Null, Cell::Null, Cell::Null]);
        assert!(matches!(
            row.take_i32("missing"),
            Err(FrameError::UnknownField { .. })
        ));
    }
}

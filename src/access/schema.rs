//! Schema descriptors describing the rows of a table.

use crate::access::value::Type;
use crate::error::{DbError, DbResult};
use crate::storage::PAGE_SIZE;
use std::fmt;

/// Widest row a heap page can hold: one slot plus its bitmap bit.
pub const MAX_ROW_SIZE: usize = PAGE_SIZE - 1;

/// One column of a schema: its type and an optional name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaField {
    pub field_type: Type,
    pub name: Option<String>,
}

impl SchemaField {
    pub fn new(field_type: Type, name: impl Into<String>) -> Self {
        Self {
            field_type,
            name: Some(name.into()),
        }
    }

    pub fn unnamed(field_type: Type) -> Self {
        Self {
            field_type,
            name: None,
        }
    }
}

/// Ordered, fixed-width description of a table's rows.
///
/// Equality and hashing are structural over both types and names, so two
/// schemas that differ only in field names are not equal. Every row of a
/// table shares one `Arc<Schema>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    /// Create a schema from its fields. At least one field is required and
    /// a row must fit in a page.
    pub fn new(fields: Vec<SchemaField>) -> DbResult<Self> {
        if fields.is_empty() {
            return Err(DbError::InvalidSchema(
                "a schema needs at least one field".to_string(),
            ));
        }
        let schema = Self { fields };
        schema.check_fits_page()?;
        Ok(schema)
    }

    /// Fails with `InvalidSchema` if a row is wider than `MAX_ROW_SIZE`.
    /// Merged schemas are not checked until they are stored.
    pub fn check_fits_page(&self) -> DbResult<()> {
        let size = self.byte_size();
        if size > MAX_ROW_SIZE {
            return Err(DbError::InvalidSchema(format!(
                "rows of {} bytes do not fit in a {}-byte page",
                size, PAGE_SIZE
            )));
        }
        Ok(())
    }

    /// Create a schema from parallel type and name lists
    pub fn with_names(types: &[Type], names: &[&str]) -> DbResult<Self> {
        if types.len() != names.len() {
            return Err(DbError::InvalidSchema(format!(
                "{} types but {} names",
                types.len(),
                names.len()
            )));
        }
        Self::new(
            types
                .iter()
                .zip(names)
                .map(|(ty, name)| SchemaField::new(*ty, *name))
                .collect(),
        )
    }

    /// Create a schema whose fields have no names
    pub fn unnamed(types: &[Type]) -> DbResult<Self> {
        Self::new(types.iter().copied().map(SchemaField::unnamed).collect())
    }

    /// Concatenate two schemas: all fields of `a` followed by all fields of `b`
    pub fn merge(a: &Schema, b: &Schema) -> Schema {
        let mut fields = Vec::with_capacity(a.num_fields() + b.num_fields());
        fields.extend(a.fields.iter().cloned());
        fields.extend(b.fields.iter().cloned());
        Schema { fields }
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Name of field `i`, `None` if the field is unnamed
    pub fn field_name(&self, i: usize) -> DbResult<Option<&str>> {
        self.field(i).map(|f| f.name.as_deref())
    }

    pub fn field_type(&self, i: usize) -> DbResult<Type> {
        self.field(i).map(|f| f.field_type)
    }

    pub fn field(&self, i: usize) -> DbResult<&SchemaField> {
        self.fields.get(i).ok_or(DbError::OutOfRange {
            index: i,
            len: self.fields.len(),
        })
    }

    /// Index of the first field named exactly `name`
    pub fn index_of(&self, name: &str) -> DbResult<usize> {
        if name.is_empty() {
            return Err(DbError::not_found("empty field name"));
        }
        self.fields
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
            .ok_or_else(|| DbError::not_found(format!("field '{}'", name)))
    }

    /// Size in bytes of one row with this schema, saturating at `usize::MAX`
    pub fn byte_size(&self) -> usize {
        self.fields
            .iter()
            .fold(0usize, |size, f| size.saturating_add(f.field_type.width()))
    }

    pub fn fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.iter()
    }

    pub fn types(&self) -> impl Iterator<Item = Type> + '_ {
        self.fields.iter().map(|f| f.field_type)
    }

    /// Copy of this schema with every field name prefixed by `alias.`
    pub fn with_alias(&self, alias: &str) -> Schema {
        let fields = self
            .fields
            .iter()
            .map(|f| {
                let name = f.name.as_deref().unwrap_or("null");
                SchemaField::new(f.field_type, format!("{}.{}", alias, name))
            })
            .collect();
        Schema { fields }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{} {}",
                field.name.as_deref().unwrap_or("null"),
                field.field_type
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(schema: &Schema) -> u64 {
        let mut hasher = DefaultHasher::new();
        schema.hash(&mut hasher);
        hasher.finish()
    }

    fn people() -> Schema {
        Schema::with_names(&[Type::Int, Type::Text(10)], &["id", "name"]).unwrap()
    }

    #[test]
    fn test_field_access() -> DbResult<()> {
        let schema = people();
        assert_eq!(schema.num_fields(), 2);
        assert_eq!(schema.field_name(0)?, Some("id"));
        assert_eq!(schema.field_type(1)?, Type::Text(10));
        Ok(())
    }

    #[test]
    fn test_out_of_range() {
        let schema = people();
        assert!(matches!(
            schema.field_type(2),
            Err(DbError::OutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(
            schema.field_name(99),
            Err(DbError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert!(matches!(
            Schema::new(vec![]),
            Err(DbError::InvalidSchema(_))
        ));
        assert!(Schema::with_names(&[Type::Int], &["a", "b"]).is_err());
    }

    #[test]
    fn test_rows_wider_than_a_page_rejected() -> DbResult<()> {
        let half = Type::Text(MAX_ROW_SIZE / 2);
        assert!(matches!(
            Schema::unnamed(&[half, half]),
            Err(DbError::InvalidSchema(_))
        ));
        assert!(matches!(
            Schema::unnamed(&[Type::Text(usize::MAX), Type::Int]),
            Err(DbError::InvalidSchema(_))
        ));

        // merge only concatenates; storing the result is what fails
        let wide = Schema::unnamed(&[half])?;
        let merged = Schema::merge(&wide, &wide);
        assert!(merged.check_fits_page().is_err());
        Ok(())
    }

    #[test]
    fn test_index_of() -> DbResult<()> {
        let schema = Schema::with_names(
            &[Type::Int, Type::Int, Type::Int],
            &["a", "b", "a"],
        )?;
        assert_eq!(schema.index_of("a")?, 0);
        assert_eq!(schema.index_of("b")?, 1);
        assert!(matches!(schema.index_of("c"), Err(DbError::NotFound(_))));
        assert!(matches!(schema.index_of(""), Err(DbError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_index_of_skips_unnamed_fields() -> DbResult<()> {
        let schema = Schema::unnamed(&[Type::Int, Type::Int])?;
        assert!(schema.index_of("null").is_err());
        Ok(())
    }

    #[test]
    fn test_byte_size() {
        assert_eq!(people().byte_size(), 4 + 14);
    }

    #[test]
    fn test_merge() -> DbResult<()> {
        let a = people();
        let b = Schema::with_names(&[Type::Int], &["age"])?;
        let merged = Schema::merge(&a, &b);

        assert_eq!(merged.num_fields(), a.num_fields() + b.num_fields());
        for i in 0..a.num_fields() {
            assert_eq!(merged.field(i)?, a.field(i)?);
        }
        assert_eq!(merged.field(2)?, b.field(0)?);
        assert_eq!(merged.byte_size(), a.byte_size() + b.byte_size());
        Ok(())
    }

    #[test]
    fn test_structural_equality() -> DbResult<()> {
        let a = people();
        let b = people();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let renamed = Schema::with_names(&[Type::Int, Type::Text(10)], &["id", "label"])?;
        assert_ne!(a, renamed);

        let retyped = Schema::with_names(&[Type::Int, Type::Text(11)], &["id", "name"])?;
        assert_ne!(a, retyped);
        Ok(())
    }

    #[test]
    fn test_with_alias() -> DbResult<()> {
        let aliased = people().with_alias("t");
        assert_eq!(aliased.field_name(0)?, Some("t.id"));
        assert_eq!(aliased.field_name(1)?, Some("t.name"));
        assert_eq!(aliased.field_type(1)?, Type::Text(10));

        let unnamed = Schema::unnamed(&[Type::Int])?.with_alias("u");
        assert_eq!(unnamed.field_name(0)?, Some("u.null"));
        Ok(())
    }

    #[test]
    fn test_display() {
        assert_eq!(people().to_string(), "id INT, name TEXT(10)");
    }
}

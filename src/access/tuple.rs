use crate::access::schema::Schema;
use crate::access::value::Field;
use crate::error::{DbError, DbResult};
use crate::storage::page::HeapPageId;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Location of a tuple on disk: the page it lives on and its slot there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: HeapPageId,
    pub slot: u16,
}

impl RecordId {
    pub fn new(page_id: HeapPageId, slot: u16) -> Self {
        Self { page_id, slot }
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        // First compare by page, then by slot
        match self.page_id.cmp(&other.page_id) {
            Ordering::Equal => self.slot.cmp(&other.slot),
            other => other,
        }
    }
}

/// A row of field values bound to a schema
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    schema: Arc<Schema>,
    fields: Vec<Option<Field>>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Create a tuple with every field unset
    pub fn new(schema: Arc<Schema>) -> Self {
        let fields = vec![None; schema.num_fields()];
        Self {
            schema,
            fields,
            record_id: None,
        }
    }

    /// Create a tuple with all fields set
    pub fn from_fields(schema: Arc<Schema>, values: Vec<Field>) -> DbResult<Self> {
        if values.len() != schema.num_fields() {
            return Err(DbError::SchemaMismatch(format!(
                "expected {} values, got {}",
                schema.num_fields(),
                values.len()
            )));
        }
        let mut tuple = Tuple::new(schema);
        for (i, value) in values.into_iter().enumerate() {
            tuple.set_field(i, value)?;
        }
        Ok(tuple)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Value of field `i`, `None` if it has not been set
    pub fn field(&self, i: usize) -> DbResult<Option<&Field>> {
        self.fields
            .get(i)
            .map(Option::as_ref)
            .ok_or(DbError::OutOfRange {
                index: i,
                len: self.fields.len(),
            })
    }

    /// Set field `i`. Text longer than the field's width is truncated here,
    /// so the value held in memory is the one that will be stored.
    pub fn set_field(&mut self, i: usize, value: Field) -> DbResult<()> {
        let field_type = self.schema.field_type(i)?;
        if !value.is_compatible_with(field_type) {
            return Err(DbError::SchemaMismatch(format!(
                "value {:?} cannot be stored in field {} of type {}",
                value, i, field_type
            )));
        }
        self.fields[i] = Some(value.fit_to(field_type));
        Ok(())
    }

    pub fn fields(&self) -> impl Iterator<Item = Option<&Field>> {
        self.fields.iter().map(Option::as_ref)
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    /// Associate a location with this tuple. Nothing checks that the tuple
    /// really lives there.
    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }
}

impl fmt::Display for Tuple {
    /// Tab-separated values with a trailing newline; unset fields print `null`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            match field {
                Some(value) => write!(f, "{}", value)?,
                None => write!(f, "null")?,
            }
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::value::Type;
    use crate::catalog::TableId;

    fn people() -> Arc<Schema> {
        Arc::new(Schema::with_names(&[Type::Int, Type::Text(10)], &["id", "name"]).unwrap())
    }

    #[test]
    fn test_record_id_equality() {
        let pid = HeapPageId::new(TableId(1), 2);
        let rid1 = RecordId::new(pid, 3);
        let rid2 = RecordId::new(pid, 3);
        let rid3 = RecordId::new(pid, 4);
        let rid4 = RecordId::new(HeapPageId::new(TableId(2), 2), 3);

        assert_eq!(rid1, rid2);
        assert_ne!(rid1, rid3);
        assert_ne!(rid1, rid4);
    }

    #[test]
    fn test_record_id_ordering() {
        let table = TableId(1);
        let rid1 = RecordId::new(HeapPageId::new(table, 1), 5);
        let rid2 = RecordId::new(HeapPageId::new(table, 1), 10);
        let rid3 = RecordId::new(HeapPageId::new(table, 2), 3);

        assert!(rid1 < rid2); // Same page, different slot
        assert!(rid2 < rid3); // Different page
    }

    #[test]
    fn test_new_tuple_is_unset() -> DbResult<()> {
        let tuple = Tuple::new(people());
        assert_eq!(tuple.field(0)?, None);
        assert_eq!(tuple.field(1)?, None);
        assert_eq!(tuple.record_id(), None);
        assert_eq!(tuple.to_string(), "null\tnull\n");
        Ok(())
    }

    #[test]
    fn test_set_and_render() -> DbResult<()> {
        let mut tuple = Tuple::new(people());
        tuple.set_field(0, Field::Int(42))?;
        tuple.set_field(1, Field::from("abc"))?;

        assert_eq!(tuple.field(0)?, Some(&Field::Int(42)));
        assert_eq!(tuple.to_string(), "42\tabc\n");
        Ok(())
    }

    #[test]
    fn test_partial_render() -> DbResult<()> {
        let mut tuple = Tuple::new(people());
        tuple.set_field(1, Field::from("x"))?;
        assert_eq!(tuple.to_string(), "null\tx\n");
        Ok(())
    }

    #[test]
    fn test_field_bounds() {
        let mut tuple = Tuple::new(people());
        assert!(matches!(tuple.field(2), Err(DbError::OutOfRange { .. })));
        assert!(matches!(
            tuple.set_field(5, Field::Int(1)),
            Err(DbError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_type_checked_set() {
        let mut tuple = Tuple::new(people());
        assert!(matches!(
            tuple.set_field(0, Field::from("not a number")),
            Err(DbError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_over_long_text_truncated_on_set() -> DbResult<()> {
        let mut tuple = Tuple::new(people());
        tuple.set_field(1, Field::from("abcdefghijklmnop"))?;
        assert_eq!(tuple.field(1)?, Some(&Field::from("abcdefghij")));
        assert_eq!(tuple.to_string(), "null\tabcdefghij\n");
        Ok(())
    }

    #[test]
    fn test_from_fields() -> DbResult<()> {
        let tuple = Tuple::from_fields(people(), vec![Field::Int(1), Field::from("a")])?;
        assert_eq!(tuple.to_string(), "1\ta\n");

        assert!(Tuple::from_fields(people(), vec![Field::Int(1)]).is_err());
        Ok(())
    }

    #[test]
    fn test_record_id_is_bare_association() {
        let mut tuple = Tuple::new(people());
        let rid = RecordId::new(HeapPageId::new(TableId(9), 0), 1);
        tuple.set_record_id(Some(rid));
        assert_eq!(tuple.record_id(), Some(rid));

        tuple.set_record_id(None);
        assert_eq!(tuple.record_id(), None);
    }
}

//! Fixed-slot heap page codec.
//!
//! A heap page for a schema whose rows are `s` bytes wide holds
//! `floor(PAGE_SIZE * 8 / (s * 8 + 1))` slots: each row costs `s` bytes plus
//! one occupancy bit. Layout:
//!
//! ```text
//! +----------------------+------------+------------+-----+---------+
//! | occupancy bitmap     | slot 0     | slot 1     | ... | padding |
//! | ceil(slots / 8) B    | s bytes    | s bytes    |     | zeros   |
//! +----------------------+------------+------------+-----+---------+
//! ```
//!
//! Slot `i` is bit `i % 8` (least significant first) of bitmap byte `i / 8`.
//! A page of all zeros is a valid empty page.

use crate::access::schema::Schema;
use crate::access::tuple::{RecordId, Tuple};
use crate::error::{DbError, DbResult};
use crate::storage::page::{HeapPageId, Page};
use crate::storage::PAGE_SIZE;
use crate::transaction::TransactionId;
use std::io::Cursor;
use std::sync::Arc;

pub struct HeapPage {
    pid: HeapPageId,
    schema: Arc<Schema>,
    slots: Vec<Option<Tuple>>,
    dirtied_by: Option<TransactionId>,
}

impl HeapPage {
    /// Number of rows of `schema` that fit on one page, zero if a row is
    /// wider than a page
    pub fn slots_per_page(schema: &Schema) -> usize {
        let bits_per_slot = schema.byte_size().saturating_mul(8).saturating_add(1);
        (PAGE_SIZE * 8) / bits_per_slot
    }

    /// Bytes used by the occupancy bitmap for `num_slots` slots
    pub fn header_size(num_slots: usize) -> usize {
        num_slots.div_ceil(8)
    }

    /// Bytes of a freshly allocated, empty page
    pub fn empty_page_data() -> Vec<u8> {
        vec![0u8; PAGE_SIZE]
    }

    pub fn empty(pid: HeapPageId, schema: Arc<Schema>) -> Self {
        let num_slots = Self::slots_per_page(&schema);
        Self {
            pid,
            schema,
            slots: vec![None; num_slots],
            dirtied_by: None,
        }
    }

    /// Decode a page read from disk
    pub fn from_bytes(pid: HeapPageId, schema: Arc<Schema>, data: &[u8]) -> DbResult<Self> {
        if data.len() != PAGE_SIZE {
            return Err(DbError::Corrupt(format!(
                "page must be {} bytes, got {}",
                PAGE_SIZE,
                data.len()
            )));
        }

        let num_slots = Self::slots_per_page(&schema);
        let header_size = Self::header_size(num_slots);
        let row_size = schema.byte_size();
        let (header, body) = data.split_at(header_size);

        let mut slots = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            if !bit_is_set(header, slot) {
                slots.push(None);
                continue;
            }

            let start = slot * row_size;
            let mut cursor = Cursor::new(&body[start..start + row_size]);
            let mut tuple = Tuple::new(schema.clone());
            for (i, field_type) in schema.types().enumerate() {
                tuple.set_field(i, field_type.parse(&mut cursor)?)?;
            }
            tuple.set_record_id(Some(RecordId::new(pid, slot as u16)));
            slots.push(Some(tuple));
        }

        Ok(Self {
            pid,
            schema,
            slots,
            dirtied_by: None,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn num_empty_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        matches!(self.slots.get(slot), Some(Some(_)))
    }

    /// Place `tuple` in the lowest free slot and stamp its record id
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> DbResult<RecordId> {
        if **tuple.schema() != *self.schema {
            return Err(DbError::SchemaMismatch(format!(
                "row has schema ({}) but page holds ({})",
                tuple.schema(),
                self.schema
            )));
        }
        if let Some(i) = tuple.fields().position(|f| f.is_none()) {
            return Err(DbError::SchemaMismatch(format!("field {} is unset", i)));
        }

        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(DbError::PageFull)?;

        let record_id = RecordId::new(self.pid, slot as u16);
        tuple.set_record_id(Some(record_id));
        self.slots[slot] = Some(tuple);
        Ok(record_id)
    }

    /// Free the slot `tuple` occupies on this page
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> DbResult<()> {
        let record_id = tuple
            .record_id()
            .ok_or_else(|| DbError::not_found("tuple has no record id"))?;
        if record_id.page_id != self.pid {
            return Err(DbError::not_found(format!(
                "tuple {:?} is not on page {:?}",
                record_id, self.pid
            )));
        }

        match self.slots.get_mut(record_id.slot as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                Ok(())
            }
            _ => Err(DbError::not_found(format!(
                "slot {} of page {:?} is empty",
                record_id.slot, self.pid
            ))),
        }
    }

    /// Resident tuples in slot order
    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.slots.iter().flatten()
    }
}

impl Page for HeapPage {
    type Id = HeapPageId;

    fn id(&self) -> HeapPageId {
        self.pid
    }

    fn page_data(&self) -> DbResult<Vec<u8>> {
        let num_slots = self.slots.len();
        let header_size = Self::header_size(num_slots);
        let row_size = self.schema.byte_size();
        let mut data = Self::empty_page_data();

        for (slot, tuple) in self.slots.iter().enumerate() {
            let Some(tuple) = tuple else { continue };

            data[slot / 8] |= 1 << (slot % 8);

            let start = header_size + slot * row_size;
            let mut out = &mut data[start..start + row_size];
            for (i, field) in tuple.fields().enumerate() {
                let field = field
                    .ok_or_else(|| DbError::SchemaMismatch(format!("field {} is unset", i)))?;
                field.serialize(self.schema.field_type(i)?, &mut out)?;
            }
        }

        Ok(data)
    }

    fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    fn mark_dirty(&mut self, dirty: bool, tid: TransactionId) {
        self.dirtied_by = if dirty { Some(tid) } else { None };
    }
}

fn bit_is_set(header: &[u8], slot: usize) -> bool {
    (header[slot / 8] >> (slot % 8)) & 1 == 1
}

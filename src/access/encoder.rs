//! Bulk conversion of delimited text into a heap file.

use crate::access::schema::Schema;
use crate::access::tuple::Tuple;
use crate::catalog::TableId;
use crate::error::{DbError, DbResult};
use crate::storage::disk::PageManager;
use crate::storage::page::{HeapPage, HeapPageId, Page};
use log::info;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// Read `separator`-delimited rows from `input` and pack them, in input
/// order, into a new heap file at `output`. Blank lines are skipped.
///
/// Returns the number of pages written.
pub fn convert(input: &Path, output: &Path, schema: &Schema, separator: char) -> DbResult<u32> {
    schema.check_fits_page()?;
    let reader = BufReader::new(File::open(input)?);
    let schema = Arc::new(schema.clone());
    let mut page_manager = PageManager::create(output)?;

    // Only the page number matters on disk
    let page_id = |n: u32| HeapPageId::new(TableId(0), n);
    let mut page_number = 0;
    let mut page = HeapPage::empty(page_id(page_number), Arc::clone(&schema));
    let mut pending = false;
    let mut rows = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let tuple = parse_row(&line, &schema, separator)
            .map_err(|e| DbError::SchemaMismatch(format!("line {}: {}", line_no + 1, e)))?;

        if page.num_empty_slots() == 0 {
            page_manager.write_page(page_number, &page.page_data()?)?;
            page_number += 1;
            page = HeapPage::empty(page_id(page_number), Arc::clone(&schema));
        }
        page.insert_tuple(tuple)?;
        pending = true;
        rows += 1;
    }

    if pending {
        page_manager.write_page(page_number, &page.page_data()?)?;
        page_number += 1;
    }

    info!(
        "Converted {} rows from {} into {} pages at {}",
        rows,
        input.display(),
        page_number,
        output.display()
    );
    Ok(page_number)
}

fn parse_row(line: &str, schema: &Arc<Schema>, separator: char) -> DbResult<Tuple> {
    let values: Vec<&str> = line.split(separator).collect();
    if values.len() != schema.num_fields() {
        return Err(DbError::SchemaMismatch(format!(
            "expected {} fields, found {}",
            schema.num_fields(),
            values.len()
        )));
    }

    let fields = schema
        .types()
        .zip(values)
        .map(|(ty, raw)| ty.parse_str(raw))
        .collect::<DbResult<Vec<_>>>()?;
    Tuple::from_fields(Arc::clone(schema), fields)
}

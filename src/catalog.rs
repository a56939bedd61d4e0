//! Registry of the tables known to the process.
//!
//! Every table is a heap file bound to a schema. The registry hands out
//! table ids sequentially and keys them on the file's canonical path, so the
//! same file keeps its id for the life of the process.

pub mod table_info;

pub use table_info::{TableId, TableInfo};

use crate::access::heap::HeapFile;
use crate::access::schema::{Schema, SchemaField};
use crate::access::value::Type;
use crate::error::{DbError, DbResult};
use log::{debug, info};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Default)]
struct CatalogState {
    tables: HashMap<TableId, TableInfo>,
    names: HashMap<String, TableId>,
    paths: HashMap<PathBuf, TableId>,
    next_id: u32,
}

#[derive(Default)]
pub struct Catalog {
    state: RwLock<CatalogState>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the heap file at `path` (created empty if absent) under
    /// `name`. Re-adding a path keeps its id; re-using a name drops the table
    /// that previously held it.
    pub fn add_table(&self, path: &Path, name: &str, schema: Schema) -> DbResult<TableId> {
        self.add_table_with_key(path, name, schema, None)
    }

    fn add_table_with_key(
        &self,
        path: &Path,
        name: &str,
        schema: Schema,
        primary_key: Option<String>,
    ) -> DbResult<TableId> {
        let canonical = canonical_path(path)?;
        let mut state = self.state.write();

        let existing = state.paths.get(&canonical).copied();
        let table_id = match existing {
            Some(id) => id,
            None => {
                state.next_id += 1;
                let id = TableId(state.next_id);
                state.paths.insert(canonical.clone(), id);
                id
            }
        };

        let schema = Arc::new(schema);
        let file = HeapFile::open(&canonical, Arc::clone(&schema), table_id)?;

        if let Some(previous) = state.names.insert(name.to_string(), table_id) {
            if previous != table_id {
                state.tables.remove(&previous);
                debug!("Table name '{}' rebound from {} to {}", name, previous, table_id);
            }
        }
        let old_name = state
            .tables
            .get(&table_id)
            .map(|old| old.table_name.clone())
            .filter(|old_name| old_name != name);
        if let Some(old_name) = old_name {
            if state.names.get(&old_name) == Some(&table_id) {
                state.names.remove(&old_name);
            }
        }

        info!(
            "Registered table '{}' ({}) at {} with schema ({})",
            name,
            table_id,
            canonical.display(),
            schema
        );
        state.tables.insert(
            table_id,
            TableInfo {
                table_id,
                table_name: name.to_string(),
                schema,
                primary_key,
                file,
            },
        );

        Ok(table_id)
    }

    pub fn table_id(&self, name: &str) -> DbResult<TableId> {
        self.state
            .read()
            .names
            .get(name)
            .copied()
            .ok_or_else(|| DbError::not_found(format!("table '{}'", name)))
    }

    pub fn table_info(&self, table_id: TableId) -> DbResult<TableInfo> {
        self.state
            .read()
            .tables
            .get(&table_id)
            .cloned()
            .ok_or_else(|| DbError::not_found(format!("table {}", table_id)))
    }

    pub fn table_name(&self, table_id: TableId) -> DbResult<String> {
        Ok(self.table_info(table_id)?.table_name)
    }

    pub fn schema(&self, table_id: TableId) -> DbResult<Arc<Schema>> {
        Ok(self.table_info(table_id)?.schema)
    }

    pub fn file(&self, table_id: TableId) -> DbResult<HeapFile> {
        Ok(self.table_info(table_id)?.file)
    }

    pub fn primary_key(&self, table_id: TableId) -> DbResult<Option<String>> {
        Ok(self.table_info(table_id)?.primary_key)
    }

    /// Ids of all registered tables, ascending
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<_> = self.state.read().tables.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Forget every table. Ids already handed out are not reused.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.tables.clear();
        state.names.clear();
    }

    /// Register every table described in the text catalog at `path`.
    ///
    /// One table per line: `name (field type, field type pk, ...)`, where
    /// type is `int`, `string` or `text(n)`. The data file for `name` is
    /// `name.dat` in the catalog's directory.
    pub fn load_schema(&self, path: &Path) -> DbResult<Vec<TableId>> {
        let text = std::fs::read_to_string(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let mut ids = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (name, schema, primary_key) = parse_table_line(line).map_err(|e| match e {
                DbError::InvalidSchema(msg) => {
                    DbError::InvalidSchema(format!("line {}: {}", line_no + 1, msg))
                }
                other => other,
            })?;
            let data_path = base.join(format!("{}.dat", name));
            ids.push(self.add_table_with_key(&data_path, &name, schema, primary_key)?);
        }

        Ok(ids)
    }
}

/// Parse `name (field type [pk], ...)`
fn parse_table_line(line: &str) -> DbResult<(String, Schema, Option<String>)> {
    let open = line
        .find('(')
        .ok_or_else(|| DbError::InvalidSchema(format!("missing '(' in '{}'", line)))?;
    let close = line
        .rfind(')')
        .filter(|close| *close > open)
        .ok_or_else(|| DbError::InvalidSchema(format!("missing ')' in '{}'", line)))?;

    let name = line[..open].trim();
    if name.is_empty() {
        return Err(DbError::InvalidSchema("missing table name".to_string()));
    }

    let mut fields = Vec::new();
    let mut primary_key = None;
    for column in line[open + 1..close].split(',') {
        let parts: Vec<&str> = column.split_whitespace().collect();
        let (field_name, type_name) = match parts.as_slice() {
            [field_name, type_name] => (*field_name, *type_name),
            [field_name, type_name, marker] if marker.eq_ignore_ascii_case("pk") => {
                primary_key = Some(field_name.to_string());
                (*field_name, *type_name)
            }
            _ => {
                return Err(DbError::InvalidSchema(format!(
                    "bad field declaration '{}'",
                    column.trim()
                )))
            }
        };
        let field_type: Type = type_name.parse()?;
        fields.push(SchemaField::new(field_type, field_name));
    }

    Ok((name.to_string(), Schema::new(fields)?, primary_key))
}

/// Canonical form of `path`, which need not exist yet
fn canonical_path(path: &Path) -> DbResult<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| DbError::not_found(format!("file name in {}", path.display())))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok(parent.canonicalize()?.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::file::DbFile;
    use anyhow::Result;
    use tempfile::tempdir;

    fn schema() -> Schema {
        Schema::with_names(&[Type::Int, Type::Text(10)], &["id", "name"]).unwrap()
    }

    #[test]
    fn test_add_table_assigns_sequential_ids() -> Result<()> {
        let dir = tempdir()?;
        let catalog = Catalog::new();

        let a = catalog.add_table(&dir.path().join("a.dat"), "a", schema())?;
        let b = catalog.add_table(&dir.path().join("b.dat"), "b", schema())?;
        assert_eq!(a, TableId(1));
        assert_eq!(b, TableId(2));
        assert_eq!(catalog.table_ids(), vec![a, b]);

        assert_eq!(catalog.table_id("b")?, b);
        assert_eq!(catalog.table_name(a)?, "a");
        assert_eq!(*catalog.schema(a)?, schema());
        assert_eq!(catalog.file(a)?.id(), a);
        assert!(dir.path().join("a.dat").exists());
        Ok(())
    }

    #[test]
    fn test_same_path_keeps_id() -> Result<()> {
        let dir = tempdir()?;
        let catalog = Catalog::new();

        let first = catalog.add_table(&dir.path().join("t.dat"), "t", schema())?;
        // Same file through a different spelling of the path
        let again = dir.path().join(".").join("t.dat");
        let second = catalog.add_table(&again, "renamed", schema())?;

        assert_eq!(first, second);
        assert_eq!(catalog.table_name(first)?, "renamed");
        assert!(matches!(catalog.table_id("t"), Err(DbError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_name_rebinds_to_new_table() -> Result<()> {
        let dir = tempdir()?;
        let catalog = Catalog::new();

        let old = catalog.add_table(&dir.path().join("old.dat"), "t", schema())?;
        let new = catalog.add_table(&dir.path().join("new.dat"), "t", schema())?;

        assert_ne!(old, new);
        assert_eq!(catalog.table_id("t")?, new);
        assert!(matches!(catalog.file(old), Err(DbError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_unknown_table() {
        let catalog = Catalog::new();
        assert!(matches!(catalog.table_id("nope"), Err(DbError::NotFound(_))));
        assert!(matches!(catalog.schema(TableId(7)), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_clear() -> Result<()> {
        let dir = tempdir()?;
        let catalog = Catalog::new();
        catalog.add_table(&dir.path().join("a.dat"), "a", schema())?;

        catalog.clear();
        assert!(catalog.table_ids().is_empty());

        let next = catalog.add_table(&dir.path().join("b.dat"), "b", schema())?;
        assert_eq!(next, TableId(2));
        Ok(())
    }

    #[test]
    fn test_load_schema() -> Result<()> {
        let dir = tempdir()?;
        let catalog_path = dir.path().join("catalog.txt");
        std::fs::write(
            &catalog_path,
            "users (id int pk, name string)\n\nnotes (author int, body text(40))\n",
        )?;

        let catalog = Catalog::new();
        let ids = catalog.load_schema(&catalog_path)?;
        assert_eq!(ids.len(), 2);

        let users = catalog.table_id("users")?;
        let schema = catalog.schema(users)?;
        assert_eq!(schema.to_string(), "id INT, name TEXT(128)");
        assert_eq!(catalog.primary_key(users)?, Some("id".to_string()));
        assert!(dir.path().join("users.dat").exists());

        let notes = catalog.table_id("notes")?;
        assert_eq!(catalog.schema(notes)?.field_type(1)?, Type::Text(40));
        assert_eq!(catalog.primary_key(notes)?, None);
        Ok(())
    }

    #[test]
    fn test_load_schema_rejects_malformed_lines() -> Result<()> {
        let dir = tempdir()?;
        let catalog = Catalog::new();

        for bad in [
            "t id int",
            "(id int)",
            "t (id)",
            "t (id float)",
            "t (id int extra)",
            "t (a text(18446744073709551615))",
            "t (a text(3000), b text(3000))",
        ] {
            let path = dir.path().join("bad.txt");
            std::fs::write(&path, bad)?;
            let result = catalog.load_schema(&path);
            assert!(
                matches!(result, Err(DbError::InvalidSchema(_))),
                "accepted '{}'",
                bad
            );
        }
        Ok(())
    }
}

//! Catalog database access: the read query, batched deletes, and the
//! transactional reference rewrites used by duplicate cleanup

use log::{debug, info};
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

use crate::error::{ReconcileError, Result};

/// Base name of the media-gallery table
pub const GALLERY_TABLE: &str = "catalog_product_entity_media_gallery";

/// Base name of the generic attribute-value table
pub const ATTRIBUTE_TABLE: &str = "catalog_product_entity_varchar";

/// Ceiling on bind parameters per statement. Relational backends cap the
/// placeholder count per statement; 5000 stays comfortably under it.
pub const MAX_BIND_PARAMS: usize = 5000;

/// Mappings per rewrite batch. Each mapping consumes three placeholders:
/// a CASE arm pair plus an IN-list member.
pub const REWRITE_BATCH: usize = MAX_BIND_PARAMS / 3;

/// Handle to the catalog database.
pub struct CatalogDb {
    conn: Connection,
    prefix: String,
}

/// Outcome of a batched mutation that may stop early: the accumulated
/// affected-row total, how many statements were issued, and the error that
/// aborted the remaining batches, if any.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub rows_affected: u64,
    pub batches_issued: u32,
    pub error: Option<ReconcileError>,
}

impl CatalogDb {
    /// Open the catalog database file.
    pub fn open(path: &Path, prefix: impl Into<String>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            prefix: prefix.into(),
        })
    }

    /// Open an in-memory catalog with the external schema created (for
    /// testing).
    pub fn open_memory(prefix: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn,
            prefix: prefix.into(),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Create the externally-owned catalog tables. Only in-memory catalogs
    /// need this; a real catalog already has them.
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS {gallery} (
                value_id INTEGER PRIMARY KEY AUTOINCREMENT,
                value TEXT
            );
            CREATE TABLE IF NOT EXISTS {attribute} (
                value_id INTEGER PRIMARY KEY AUTOINCREMENT,
                value TEXT
            );
            ",
            gallery = self.table(GALLERY_TABLE),
            attribute = self.table(ATTRIBUTE_TABLE),
        ))?;
        Ok(())
    }

    /// Raw connection access, mainly for seeding test fixtures.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Apply the configured prefix to a base table name.
    fn table(&self, base: &str) -> String {
        format!("{}{}", self.prefix, base)
    }

    /// Read every referenced path from the media-gallery table. Rows whose
    /// value does not decode as a string are skipped, not fatal. No
    /// ordering guarantee.
    pub fn referenced_paths(&self) -> Result<Vec<String>> {
        let sql = format!("SELECT value FROM {}", self.table(GALLERY_TABLE));
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut paths = Vec::new();
        let mut skipped = 0u64;
        for row in rows {
            match row {
                Ok(value) => paths.push(value),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!("skipped {} undecodable gallery rows", skipped);
        }
        Ok(paths)
    }

    /// Read every value from the attribute-value table. No ordering
    /// guarantee.
    pub fn attribute_paths(&self) -> Result<Vec<String>> {
        let sql = format!("SELECT value FROM {}", self.table(ATTRIBUTE_TABLE));
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut values = Vec::new();
        for row in rows {
            if let Ok(value) = row {
                values.push(value);
            }
        }
        Ok(values)
    }

    /// Delete every gallery row whose value matches one of `paths`,
    /// partitioned into statements of at most `MAX_BIND_PARAMS`
    /// placeholders. A failed batch aborts the remaining batches; the
    /// outcome keeps the total accumulated so far.
    pub fn delete_gallery_rows(&mut self, paths: &[String]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        if paths.is_empty() {
            return outcome;
        }

        let table = self.table(GALLERY_TABLE);
        for chunk in paths.chunks(MAX_BIND_PARAMS) {
            let placeholders: String = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!("DELETE FROM {} WHERE value IN ({})", table, placeholders);

            match self
                .conn
                .execute(&sql, params_from_iter(chunk.iter().map(String::as_str)))
            {
                Ok(affected) => {
                    outcome.batches_issued += 1;
                    outcome.rows_affected += affected as u64;
                    info!(
                        "orphan batch of {} values removed {} rows",
                        chunk.len(),
                        affected
                    );
                }
                Err(err) => {
                    outcome.error = Some(err.into());
                    break;
                }
            }
        }
        outcome
    }

    /// Rewrite one batch of duplicate references: every row in the
    /// attribute-value table and the media-gallery table whose value equals
    /// a duplicate's path is pointed at the original's path instead.
    ///
    /// Both updates run inside a single transaction and each table takes
    /// one multi-way CASE statement, so a batch costs two round trips and
    /// commits both tables or neither. Callers chunk `mappings` to at most
    /// `REWRITE_BATCH` entries.
    ///
    /// Returns (attribute rows, gallery rows) affected.
    pub fn rewrite_references(&mut self, mappings: &[(String, String)]) -> Result<(u64, u64)> {
        if mappings.is_empty() {
            return Ok((0, 0));
        }
        debug_assert!(mappings.len() <= REWRITE_BATCH);

        let case_arms: String = mappings
            .iter()
            .map(|_| "WHEN ? THEN ?")
            .collect::<Vec<_>>()
            .join(" ");
        let in_list: String = mappings.iter().map(|_| "?").collect::<Vec<_>>().join(",");

        // CASE pairs (duplicate -> original), then the IN members.
        let mut params: Vec<&str> = Vec::with_capacity(mappings.len() * 3);
        for (duplicate, original) in mappings {
            params.push(duplicate);
            params.push(original);
        }
        for (duplicate, _) in mappings {
            params.push(duplicate);
        }

        let sql_for = |table: String| {
            format!(
                "UPDATE {} SET value = CASE value {} END WHERE value IN ({})",
                table, case_arms, in_list
            )
        };
        let attribute_sql = sql_for(self.table(ATTRIBUTE_TABLE));
        let gallery_sql = sql_for(self.table(GALLERY_TABLE));

        let tx = self.conn.transaction()?;
        let attribute_rows =
            tx.execute(&attribute_sql, params_from_iter(params.iter().copied()))? as u64;
        let gallery_rows =
            tx.execute(&gallery_sql, params_from_iter(params.iter().copied()))? as u64;
        tx.commit()?;

        Ok((attribute_rows, gallery_rows))
    }
}

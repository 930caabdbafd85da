//! Schema snapshot read once per evaluation.
//!
//! Rules consult the catalog for tables, columns, keys and row counts rather
//! than re-querying `sqlite_master` on their own.

use rusqlite::Connection;

use super::error::{QualityError, QualityResult};

/// One column as reported by `pragma_table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    /// 1-based position within the primary key, 0 when not part of it.
    pub pk_position: u32,
}

/// One (possibly composite) foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub id: i64,
    pub referenced_table: String,
    pub from_columns: Vec<String>,
    /// `None` where the declaration omitted the target column, meaning the
    /// referenced table's primary key.
    pub to_columns: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub foreign_keys: Vec<ForeignKey>,
    pub row_count: u64,
}

impl TableInfo {
    /// Primary key columns in key order.
    pub fn primary_key(&self) -> Vec<&ColumnInfo> {
        let mut pk: Vec<&ColumnInfo> = self.columns.iter().filter(|c| c.pk_position > 0).collect();
        pk.sort_by_key(|c| c.pk_position);
        pk
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// User tables of one database, ordered by name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    pub tables: Vec<TableInfo>,
}

impl Catalog {
    pub fn load(conn: &Connection) -> QualityResult<Self> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let columns = load_columns(conn, &name)?;
            let foreign_keys = load_foreign_keys(conn, &name)?;
            let row_count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", quote_ident(&name)),
                [],
                |row| row.get(0),
            )?;
            tables.push(TableInfo {
                name,
                columns,
                foreign_keys,
                row_count: row_count.max(0) as u64,
            });
        }
        Ok(Self { tables })
    }

    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Like [`Catalog::table`], but a missing table is an error.
    pub fn require(&self, name: &str) -> QualityResult<&TableInfo> {
        self.table(name)
            .ok_or_else(|| QualityError::MissingTable(name.to_string()))
    }

    /// Target columns of `fk`, resolving omitted targets to the referenced
    /// table's primary key.
    pub fn resolve_targets(&self, fk: &ForeignKey) -> QualityResult<Vec<String>> {
        if fk.to_columns.iter().all(Option::is_some) {
            return Ok(fk.to_columns.iter().flatten().cloned().collect());
        }
        let referenced = self.require(&fk.referenced_table)?;
        let pk: Vec<String> = referenced
            .primary_key()
            .into_iter()
            .map(|c| c.name.clone())
            .collect();
        if pk.len() != fk.from_columns.len() {
            return Err(QualityError::InvalidSchema(format!(
                "{} has no primary key matching {} referencing columns",
                fk.referenced_table,
                fk.from_columns.len()
            )));
        }
        Ok(fk
            .to_columns
            .iter()
            .zip(pk)
            .map(|(explicit, implied)| explicit.clone().unwrap_or(implied))
            .collect())
    }
}

fn load_columns(conn: &Connection, table: &str) -> QualityResult<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(
        "SELECT name, COALESCE(type, ''), \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(ColumnInfo {
                name: row.get(0)?,
                declared_type: row.get(1)?,
                not_null: row.get::<_, i64>(2)? != 0,
                pk_position: row.get::<_, i64>(3)?.max(0) as u32,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn load_foreign_keys(conn: &Connection, table: &str) -> QualityResult<Vec<ForeignKey>> {
    let mut stmt = conn.prepare(
        "SELECT id, \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
    )?;
    let rows = stmt
        .query_map([table], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut keys: Vec<ForeignKey> = Vec::new();
    for (id, referenced_table, from, to) in rows {
        match keys.last_mut() {
            Some(fk) if fk.id == id => {
                fk.from_columns.push(from);
                fk.to_columns.push(to);
            }
            _ => keys.push(ForeignKey {
                id,
                referenced_table,
                from_columns: vec![from],
                to_columns: vec![to],
            }),
        }
    }
    Ok(keys)
}

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL);
             CREATE TABLE orders (
                 id INTEGER PRIMARY KEY,
                 user_id INTEGER REFERENCES users,
                 total REAL
             );
             CREATE TABLE line_items (
                 order_id INTEGER,
                 line_no INTEGER,
                 sku TEXT,
                 PRIMARY KEY (order_id, line_no),
                 FOREIGN KEY (order_id) REFERENCES orders(id)
             );
             INSERT INTO users VALUES (1, 'a@example.com'), (2, 'b@example.com');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_tables_sorted_by_name() {
        let catalog = Catalog::load(&sample()).unwrap();
        let names: Vec<&str> = catalog.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["line_items", "orders", "users"]);
    }

    #[test]
    fn test_row_counts_and_columns() {
        let catalog = Catalog::load(&sample()).unwrap();
        let users = catalog.table("users").unwrap();
        assert_eq!(users.row_count, 2);
        assert!(users.column("EMAIL").unwrap().not_null);
        assert_eq!(users.primary_key()[0].name, "id");
    }

    #[test]
    fn test_composite_primary_key_order() {
        let catalog = Catalog::load(&sample()).unwrap();
        let pk: Vec<&str> = catalog
            .table("line_items")
            .unwrap()
            .primary_key()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(pk, vec!["order_id", "line_no"]);
    }

    #[test]
    fn test_omitted_fk_target_resolves_to_primary_key() {
        let catalog = Catalog::load(&sample()).unwrap();
        let orders = catalog.table("orders").unwrap();
        let fk = &orders.foreign_keys[0];
        assert_eq!(fk.referenced_table, "users");
        assert_eq!(fk.to_columns, vec![None]);
        assert_eq!(catalog.resolve_targets(fk).unwrap(), vec!["id".to_string()]);
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }
}

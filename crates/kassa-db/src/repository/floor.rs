//! # Floor Repository
//!
//! Departments and tables. A table's status is never stored; it is read
//! together with the open check that references it.

use kassa_core::{Department, TableStatus, TableView};
use sqlx::{FromRow, SqlitePool};

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct FloorRepository {
    pool: SqlitePool,
}

/// Table joined with its open check, if any.
#[derive(Debug, FromRow)]
struct TableRow {
    id: String,
    department_id: String,
    name: String,
    reserved: bool,
    open_check_id: Option<String>,
}

impl From<TableRow> for TableView {
    fn from(row: TableRow) -> Self {
        TableView {
            status: TableStatus::derive(row.open_check_id.is_some(), row.reserved),
            id: row.id,
            department_id: row.department_id,
            name: row.name,
            open_check_id: row.open_check_id,
        }
    }
}

impl FloorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FloorRepository { pool }
    }

    pub async fn departments(&self) -> DbResult<Vec<Department>> {
        let departments = sqlx::query_as::<_, Department>("SELECT id, name FROM departments ORDER BY sort_order, name")
            .fetch_all(&self.pool)
            .await?;
        Ok(departments)
    }

    /// Tables with derived status, optionally of one department.
    pub async fn tables(&self, department_id: Option<&str>) -> DbResult<Vec<TableView>> {
        let rows = sqlx::query_as::<_, TableRow>(
            r#"
            SELECT t.id, t.department_id, t.name, t.reserved, c.id AS open_check_id
            FROM tables t
            LEFT JOIN checks c ON c.table_id = t.id AND c.status = 'open'
            WHERE ?1 IS NULL OR t.department_id = ?1
            ORDER BY t.sort_order, t.name
            "#,
        )
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TableView::from).collect())
    }

    pub async fn upsert_department(&self, id: &str, name: &str, sort_order: i64) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO departments (id, name, sort_order) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name, sort_order = excluded.sort_order
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(sort_order)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_table(
        &self,
        id: &str,
        department_id: &str,
        name: &str,
        reserved: bool,
        sort_order: i64,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tables (id, department_id, name, reserved, sort_order) VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                department_id = excluded.department_id,
                name = excluded.name,
                reserved = excluded.reserved,
                sort_order = excluded.sort_order
            "#,
        )
        .bind(id)
        .bind(department_id)
        .bind(name)
        .bind(reserved)
        .bind(sort_order)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

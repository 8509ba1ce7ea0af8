use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::{AppError, AppResult, require_non_empty};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub name: String,
    pub num_of_copies: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookInput {
    pub name: String,
    pub num_of_copies: i64,
}

/// One row of the ledger. Created by a lend, mutated exactly once by the
/// return that closes it; `actual_return_time` is NULL while the book is out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowRecord {
    pub id: i64,
    pub book_id: i64,
    pub borrower_id: i64,
    pub lend_time: NaiveDate,
    pub expected_return_time: NaiveDate,
    pub actual_return_time: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LendRequest {
    pub book_id: i64,
    pub borrower_id: i64,
    pub lend_time: NaiveDate,
    pub expected_return_time: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReturnRequest {
    // Present on the wire for compatibility; the increment always uses the
    // book_id stored on the ledger row.
    pub book_id: i64,
    pub actual_return_time: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(flatten)]
    pub record: BorrowRecord,
    pub borrower_name: String,
    pub book_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookHistoryEntry {
    #[serde(flatten)]
    pub record: BorrowRecord,
    pub borrower_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreturnedEntry {
    #[serde(flatten)]
    pub record: BorrowRecord,
    pub book_name: String,
    pub borrower_name: String,
    pub borrower_avatar_url: Option<String>,
    pub status: super::report::BorrowStatus,
}

/// Lend eligibility of one student for a given book. `disabled` is set while
/// the student already holds an open record for that book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentOption {
    pub id: i64,
    pub name: String,
    pub disabled: bool,
}

fn parse_date(s: &str) -> AppResult<NaiveDate> {
    s.parse()
        .map_err(|e| AppError::Persistence(anyhow::anyhow!("invalid date {s:?} in ledger: {e}")))
}

fn row_to_record(row: &libsql::Row) -> AppResult<BorrowRecord> {
    let lend: String = row.get(3)?;
    let expected: String = row.get(4)?;
    let actual: Option<String> = row.get(5)?;

    Ok(BorrowRecord {
        id: row.get(0)?,
        book_id: row.get(1)?,
        borrower_id: row.get(2)?,
        lend_time: parse_date(&lend)?,
        expected_return_time: parse_date(&expected)?,
        actual_return_time: actual.as_deref().map(parse_date).transpose()?,
    })
}

const RECORD_COLUMNS: &str = r#"
    borrow_records.id,
    borrow_records.book_id,
    borrow_records.borrower_id,
    borrow_records.lend_time,
    borrow_records.expected_return_time,
    borrow_records.actual_return_time"#;

pub struct Library<'a> {
    db: &'a Database,
}

impl<'a> Library<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        let query = "SELECT id, name, num_of_copies FROM books ORDER BY id";
        let mut rows = self.db.connection().query(query, ()).await?;
        let mut books = Vec::new();

        while let Some(row) = rows.next().await? {
            books.push(Book {
                id: row.get(0)?,
                name: row.get(1)?,
                num_of_copies: row.get(2)?,
            });
        }

        Ok(books)
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Option<Book>> {
        let query = "SELECT id, name, num_of_copies FROM books WHERE id = ?";
        let mut rows = self.db.connection().query(query, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Book {
                id: row.get(0)?,
                name: row.get(1)?,
                num_of_copies: row.get(2)?,
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn create_book(&self, input: BookInput) -> AppResult<Book> {
        require_non_empty(&input.name, "name")?;
        if input.num_of_copies < 0 {
            return Err(AppError::Validation(
                "num_of_copies must not be negative".to_string(),
            ));
        }

        let query = r#"
            INSERT INTO books (name, num_of_copies)
            VALUES (?, ?)
            RETURNING id, name, num_of_copies
        "#;
        let mut rows = self
            .db
            .connection()
            .query(query, libsql::params![input.name, input.num_of_copies])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Book {
                id: row.get(0)?,
                name: row.get(1)?,
                num_of_copies: row.get(2)?,
            })
        } else {
            Err(AppError::Persistence(anyhow::anyhow!(
                "failed to create book"
            )))
        }
    }

    pub async fn update_book(&self, id: i64, input: BookInput) -> AppResult<()> {
        require_non_empty(&input.name, "name")?;
        if input.num_of_copies < 0 {
            return Err(AppError::Validation(
                "num_of_copies must not be negative".to_string(),
            ));
        }

        let query = r#"
            UPDATE books
            SET name = ?, num_of_copies = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ?
        "#;
        let affected = self
            .db
            .connection()
            .execute(query, libsql::params![input.name, input.num_of_copies, id])
            .await?;

        if affected == 0 {
            return Err(AppError::NotFound(format!("Book id={id} not found")));
        }
        Ok(())
    }

    pub async fn delete_book(&self, id: i64) -> AppResult<()> {
        let affected = self
            .db
            .connection()
            .execute("DELETE FROM books WHERE id = ?", libsql::params![id])
            .await?;

        if affected == 0 {
            return Err(AppError::NotFound(format!("Book id={id} not found")));
        }
        Ok(())
    }

    /// Lends a book to a student: inserts the open ledger row and decrements
    /// the available-copies count in a single transaction. Rejects when the
    /// book or student is unknown, when no copies are available, or when the
    /// student already holds an open record for this book.
    pub async fn lend(&self, req: LendRequest) -> AppResult<()> {
        if req.expected_return_time < req.lend_time {
            return Err(AppError::Validation(
                "expected_return_time precedes lend_time".to_string(),
            ));
        }

        let _guard = self.db.tx_lock().lock().await;
        let conn = self.db.connection();

        conn.execute("BEGIN TRANSACTION", ()).await?;
        let result = self.lend_internal(&req).await;

        match result {
            Ok(()) => {
                conn.execute("COMMIT", ()).await?;
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    async fn lend_internal(&self, req: &LendRequest) -> AppResult<()> {
        let conn = self.db.connection();

        let book = self
            .get_book(req.book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book id={} not found", req.book_id)))?;

        let mut rows = conn
            .query(
                "SELECT 1 FROM students WHERE id = ?",
                libsql::params![req.borrower_id],
            )
            .await?;
        if rows.next().await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Student id={} not found",
                req.borrower_id
            )));
        }

        if book.num_of_copies <= 0 {
            return Err(AppError::Conflict(format!(
                "No copies of book id={} available",
                req.book_id
            )));
        }

        let mut rows = conn
            .query(
                r#"
                SELECT 1 FROM borrow_records
                WHERE book_id = ? AND borrower_id = ? AND actual_return_time IS NULL
                "#,
                libsql::params![req.book_id, req.borrower_id],
            )
            .await?;
        if rows.next().await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Student id={} already holds an open record for book id={}",
                req.borrower_id, req.book_id
            )));
        }

        conn.execute(
            r#"
            INSERT INTO borrow_records (book_id, borrower_id, lend_time, expected_return_time, actual_return_time)
            VALUES (?, ?, ?, ?, NULL)
            "#,
            libsql::params![
                req.book_id,
                req.borrower_id,
                req.lend_time.to_string(),
                req.expected_return_time.to_string()
            ],
        )
        .await?;

        // The count check is repeated in SQL so a racing lend can never drive
        // num_of_copies below zero.
        let affected = conn
            .execute(
                r#"
                UPDATE books
                SET num_of_copies = num_of_copies - 1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                WHERE id = ? AND num_of_copies > 0
                "#,
                libsql::params![req.book_id],
            )
            .await?;
        if affected == 0 {
            return Err(AppError::Conflict(format!(
                "No copies of book id={} available",
                req.book_id
            )));
        }

        Ok(())
    }

    /// Closes an open ledger row and restores the book's available-copies
    /// count in a single transaction. A record that is already closed is a
    /// conflict, not a silent success.
    pub async fn return_book(&self, record_id: i64, req: ReturnRequest) -> AppResult<()> {
        let _guard = self.db.tx_lock().lock().await;
        let conn = self.db.connection();

        conn.execute("BEGIN TRANSACTION", ()).await?;
        let result = self.return_internal(record_id, &req).await;

        match result {
            Ok(()) => {
                conn.execute("COMMIT", ()).await?;
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    async fn return_internal(&self, record_id: i64, req: &ReturnRequest) -> AppResult<()> {
        let conn = self.db.connection();

        let mut rows = conn
            .query(
                "SELECT book_id, actual_return_time FROM borrow_records WHERE id = ?",
                libsql::params![record_id],
            )
            .await?;
        let row = rows.next().await?.ok_or_else(|| {
            AppError::NotFound(format!("BorrowRecord id={record_id} not found"))
        })?;

        let book_id: i64 = row.get(0)?;
        let already_closed: Option<String> = row.get(1)?;
        if already_closed.is_some() {
            return Err(AppError::Conflict(format!(
                "BorrowRecord id={record_id} is already returned"
            )));
        }

        let affected = conn
            .execute(
                r#"
                UPDATE borrow_records
                SET actual_return_time = ?
                WHERE id = ? AND actual_return_time IS NULL
                "#,
                libsql::params![req.actual_return_time.to_string(), record_id],
            )
            .await?;
        if affected == 0 {
            return Err(AppError::Conflict(format!(
                "BorrowRecord id={record_id} is already returned"
            )));
        }

        conn.execute(
            r#"
            UPDATE books
            SET num_of_copies = num_of_copies + 1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ?
            "#,
            libsql::params![book_id],
        )
        .await?;

        Ok(())
    }

    /// Every student, flagged disabled while they hold an open record for
    /// this book. The lend path re-checks server-side; this list only feeds
    /// the lend dialog.
    pub async fn student_options(&self, book_id: i64) -> AppResult<Vec<StudentOption>> {
        let query = r#"
            SELECT
                id,
                name,
                CASE WHEN id IN (
                    SELECT borrower_id FROM borrow_records
                    WHERE actual_return_time IS NULL AND book_id = ?
                ) THEN 1 ELSE 0 END AS disabled
            FROM students
            ORDER BY id
        "#;

        let mut rows = self
            .db
            .connection()
            .query(query, libsql::params![book_id])
            .await?;
        let mut options = Vec::new();

        while let Some(row) = rows.next().await? {
            options.push(StudentOption {
                id: row.get(0)?,
                name: row.get(1)?,
                disabled: row.get::<i64>(2)? != 0,
            });
        }

        Ok(options)
    }

    /// Open records joined with book/student names, each flagged unreturned
    /// or overdue as of `today`.
    pub async fn unreturned(&self, today: NaiveDate) -> AppResult<Vec<UnreturnedEntry>> {
        let query = format!(
            r#"
            SELECT {RECORD_COLUMNS},
                books.name AS book_name,
                students.name AS borrower_name,
                students.avatar_url AS borrower_avatar_url
            FROM borrow_records
            JOIN books ON books.id = borrow_records.book_id
            JOIN students ON students.id = borrow_records.borrower_id
            WHERE borrow_records.actual_return_time IS NULL
            ORDER BY borrow_records.id
            "#
        );

        let mut rows = self.db.connection().query(&query, ()).await?;
        let mut entries = Vec::new();

        while let Some(row) = rows.next().await? {
            let record = row_to_record(&row)?;
            let status = super::report::borrow_status(
                record.expected_return_time,
                record.actual_return_time,
                today,
            );
            entries.push(UnreturnedEntry {
                record,
                book_name: row.get(6)?,
                borrower_name: row.get(7)?,
                borrower_avatar_url: row.get(8)?,
                status,
            });
        }

        Ok(entries)
    }

    pub async fn history_by_book(&self, book_id: i64) -> AppResult<Vec<BookHistoryEntry>> {
        let query = format!(
            r#"
            SELECT {RECORD_COLUMNS},
                students.name AS borrower_name
            FROM borrow_records
            JOIN students ON students.id = borrow_records.borrower_id
            WHERE borrow_records.book_id = ?
            ORDER BY borrow_records.id
            "#
        );

        let mut rows = self
            .db
            .connection()
            .query(&query, libsql::params![book_id])
            .await?;
        let mut entries = Vec::new();

        while let Some(row) = rows.next().await? {
            entries.push(BookHistoryEntry {
                record: row_to_record(&row)?,
                borrower_name: row.get(6)?,
            });
        }

        Ok(entries)
    }

    pub async fn all_records(&self) -> AppResult<Vec<LedgerEntry>> {
        let query = format!(
            r#"
            SELECT {RECORD_COLUMNS},
                students.name AS borrower_name,
                books.name AS book_name
            FROM borrow_records
            JOIN students ON students.id = borrow_records.borrower_id
            JOIN books ON books.id = borrow_records.book_id
            ORDER BY borrow_records.id
            "#
        );

        let mut rows = self.db.connection().query(&query, ()).await?;
        let mut entries = Vec::new();

        while let Some(row) = rows.next().await? {
            entries.push(LedgerEntry {
                record: row_to_record(&row)?,
                borrower_name: row.get(6)?,
                book_name: row.get(7)?,
            });
        }

        Ok(entries)
    }
}

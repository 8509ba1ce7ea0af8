//! Read-only projections over the ledger: per-record borrow status and the
//! book × student report matrix.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Book, BorrowRecord};
use crate::roster::Student;

/// Status of one borrow as of `today`. Comparison is by calendar date only;
/// returning on the expected day is still on time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Current,
    Unreturned,
    Overdue,
}

pub fn borrow_status(
    expected_return_time: NaiveDate,
    actual_return_time: Option<NaiveDate>,
    today: NaiveDate,
) -> BorrowStatus {
    match actual_return_time {
        Some(actual) if actual > expected_return_time => BorrowStatus::Overdue,
        Some(_) => BorrowStatus::Current,
        None if today > expected_return_time => BorrowStatus::Overdue,
        None => BorrowStatus::Unreturned,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportRecord {
    pub lend_time: NaiveDate,
    pub expected_return_time: NaiveDate,
    pub actual_return_time: Option<NaiveDate>,
    pub status: BorrowStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportCell {
    pub borrower_name: String,
    pub records: Vec<ReportRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub book_id: i64,
    pub book_name: String,
    pub records_by_borrower: BTreeMap<i64, ReportCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportStudent {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BorrowReport {
    pub students: Vec<ReportStudent>,
    pub rows: Vec<ReportRow>,
}

/// Builds the book × student matrix in a single pass over the ledger.
///
/// Records are bucketed by the `(book_id, borrower_id)` pair, so identifier
/// spaces may be sparse and either input list may be empty without allocating
/// anything proportional to the largest id.
pub fn build_report(
    books: &[Book],
    students: &[Student],
    records: &[BorrowRecord],
    today: NaiveDate,
) -> BorrowReport {
    let mut buckets: HashMap<(i64, i64), Vec<ReportRecord>> = HashMap::new();
    for record in records {
        buckets
            .entry((record.book_id, record.borrower_id))
            .or_default()
            .push(ReportRecord {
                lend_time: record.lend_time,
                expected_return_time: record.expected_return_time,
                actual_return_time: record.actual_return_time,
                status: borrow_status(
                    record.expected_return_time,
                    record.actual_return_time,
                    today,
                ),
            });
    }

    let mut rows = Vec::with_capacity(books.len());
    for book in books {
        let mut records_by_borrower = BTreeMap::new();
        for student in students {
            records_by_borrower.insert(
                student.id,
                ReportCell {
                    borrower_name: student.name.clone(),
                    records: buckets
                        .remove(&(book.id, student.id))
                        .unwrap_or_default(),
                },
            );
        }
        rows.push(ReportRow {
            book_id: book.id,
            book_name: book.name.clone(),
            records_by_borrower,
        });
    }

    BorrowReport {
        students: students
            .iter()
            .map(|s| ReportStudent {
                id: s.id,
                name: s.name.clone(),
            })
            .collect(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn closed_late_is_overdue() {
        let status = borrow_status(date("2024-01-10"), Some(date("2024-01-12")), date("2024-02-01"));
        assert_eq!(status, BorrowStatus::Overdue);
    }

    #[test]
    fn closed_on_expected_day_is_current() {
        let status = borrow_status(date("2024-01-10"), Some(date("2024-01-10")), date("2024-02-01"));
        assert_eq!(status, BorrowStatus::Current);
    }

    #[test]
    fn open_past_expected_day_is_overdue() {
        let status = borrow_status(date("2024-01-10"), None, date("2024-01-11"));
        assert_eq!(status, BorrowStatus::Overdue);
    }

    #[test]
    fn open_on_expected_day_is_unreturned() {
        let status = borrow_status(date("2024-01-10"), None, date("2024-01-10"));
        assert_eq!(status, BorrowStatus::Unreturned);
    }

    fn book(id: i64, name: &str) -> Book {
        Book {
            id,
            name: name.to_string(),
            num_of_copies: 1,
        }
    }

    fn student(id: i64, name: &str) -> Student {
        Student {
            id,
            name: name.to_string(),
            age: 9,
            class_id: 1,
            avatar_url: None,
        }
    }

    fn record(id: i64, book_id: i64, borrower_id: i64) -> BorrowRecord {
        BorrowRecord {
            id,
            book_id,
            borrower_id,
            lend_time: date("2024-01-01"),
            expected_return_time: date("2024-01-15"),
            actual_return_time: None,
        }
    }

    #[test]
    fn report_places_records_under_sparse_id_pairs() {
        let books = vec![book(1, "Momo"), book(9, "The Little Prince")];
        let students = vec![student(2, "Mei"), student(100, "Ren")];
        let records = vec![record(1, 9, 100)];

        let report = build_report(&books, &students, &records, date("2024-01-02"));

        assert_eq!(report.rows.len(), 2);
        let sparse_row = report.rows.iter().find(|r| r.book_id == 9).unwrap();
        assert_eq!(sparse_row.records_by_borrower[&100].records.len(), 1);
        assert_eq!(sparse_row.records_by_borrower[&100].borrower_name, "Ren");

        // Every other cell exists and is empty.
        assert!(sparse_row.records_by_borrower[&2].records.is_empty());
        let dense_row = report.rows.iter().find(|r| r.book_id == 1).unwrap();
        assert!(dense_row.records_by_borrower[&2].records.is_empty());
        assert!(dense_row.records_by_borrower[&100].records.is_empty());
    }

    #[test]
    fn report_handles_empty_inputs() {
        let report = build_report(&[], &[], &[record(1, 1, 1)], date("2024-01-02"));
        assert!(report.rows.is_empty());
        assert!(report.students.is_empty());

        let report = build_report(
            &[book(1, "Momo")],
            &[student(1, "Mei")],
            &[],
            date("2024-01-02"),
        );
        assert_eq!(report.rows.len(), 1);
        assert!(report.rows[0].records_by_borrower[&1].records.is_empty());
    }

    #[test]
    fn report_groups_multiple_records_in_one_cell() {
        let books = vec![book(1, "Momo")];
        let students = vec![student(2, "Mei")];
        let mut second = record(2, 1, 2);
        second.actual_return_time = Some(date("2024-01-20"));
        let records = vec![record(1, 1, 2), second];

        let report = build_report(&books, &students, &records, date("2024-01-02"));
        let cell = &report.rows[0].records_by_borrower[&2];
        assert_eq!(cell.records.len(), 2);
        assert_eq!(cell.records[0].status, BorrowStatus::Unreturned);
        assert_eq!(cell.records[1].status, BorrowStatus::Overdue);
    }
}

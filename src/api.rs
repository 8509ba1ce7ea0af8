use serde::Serialize;

use crate::library::{Book, UnreturnedEntry};
use crate::roster::{Class, StudentWithClass};

/// Mutation acknowledgement. `status: 1` means the write went through; error
/// bodies carry `status: 0` (see `error.rs`).
#[derive(Debug, Serialize)]
pub struct Ack {
    pub status: i32,
    pub msg: String,
}

impl Ack {
    pub fn new(msg: impl Into<String>) -> Self {
        Ack {
            status: 1,
            msg: msg.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Msg {
    pub msg: String,
}

impl Msg {
    pub fn new(msg: impl Into<String>) -> Self {
        Msg { msg: msg.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub msg: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UploadAck {
    pub status: i32,
    pub msg: String,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct BooksResponse {
    pub books: Vec<Book>,
}

#[derive(Debug, Serialize)]
pub struct ClassesResponse {
    pub classes: Vec<Class>,
}

#[derive(Debug, Serialize)]
pub struct StudentsResponse {
    pub students: Vec<StudentWithClass>,
}

#[derive(Debug, Serialize)]
pub struct BorrowRecordsResponse<T> {
    pub borrow_records: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct UnreturnedResponse {
    pub unreturned_books: Vec<UnreturnedEntry>,
}

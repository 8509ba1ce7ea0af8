use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::{AppError, AppResult, require_non_empty};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassInput {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub class_id: i64,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudentInput {
    pub name: String,
    pub age: i64,
    pub class_id: i64,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentWithClass {
    #[serde(flatten)]
    pub student: Student,
    pub class_name: String,
}

fn row_to_student(row: &libsql::Row) -> AppResult<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        class_id: row.get(3)?,
        avatar_url: row.get(4)?,
    })
}

pub struct Roster<'a> {
    db: &'a Database,
}

impl<'a> Roster<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn list_classes(&self) -> AppResult<Vec<Class>> {
        let query = "SELECT id, name FROM classes ORDER BY id";
        let mut rows = self.db.connection().query(query, ()).await?;
        let mut classes = Vec::new();

        while let Some(row) = rows.next().await? {
            classes.push(Class {
                id: row.get(0)?,
                name: row.get(1)?,
            });
        }

        Ok(classes)
    }

    pub async fn create_class(&self, input: ClassInput) -> AppResult<Class> {
        require_non_empty(&input.name, "name")?;

        let query = "INSERT INTO classes (name) VALUES (?) RETURNING id, name";
        let mut rows = self
            .db
            .connection()
            .query(query, libsql::params![input.name])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Class {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        } else {
            Err(AppError::Persistence(anyhow::anyhow!(
                "failed to create class"
            )))
        }
    }

    pub async fn update_class(&self, id: i64, input: ClassInput) -> AppResult<()> {
        require_non_empty(&input.name, "name")?;

        let query = r#"
            UPDATE classes
            SET name = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ?
        "#;
        let affected = self
            .db
            .connection()
            .execute(query, libsql::params![input.name, id])
            .await?;

        if affected == 0 {
            return Err(AppError::NotFound(format!("Class id={id} not found")));
        }
        Ok(())
    }

    /// Deletes a class and every student in it, in one transaction. Returns
    /// the avatar URLs of the removed students so the caller can clean up
    /// their files; file removal is not part of the unit of work.
    pub async fn delete_class(&self, id: i64) -> AppResult<Vec<String>> {
        let _guard = self.db.tx_lock().lock().await;
        let conn = self.db.connection();

        conn.execute("BEGIN TRANSACTION", ()).await?;
        let result = self.delete_class_internal(id).await;

        match result {
            Ok(avatar_urls) => {
                conn.execute("COMMIT", ()).await?;
                Ok(avatar_urls)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    async fn delete_class_internal(&self, id: i64) -> AppResult<Vec<String>> {
        let conn = self.db.connection();

        let mut rows = conn
            .query("SELECT 1 FROM classes WHERE id = ?", libsql::params![id])
            .await?;
        if rows.next().await?.is_none() {
            return Err(AppError::NotFound(format!("Class id={id} not found")));
        }

        let mut avatar_urls = Vec::new();
        let mut rows = conn
            .query(
                "SELECT avatar_url FROM students WHERE class_id = ?",
                libsql::params![id],
            )
            .await?;
        while let Some(row) = rows.next().await? {
            if let Some(url) = row.get::<Option<String>>(0)? {
                avatar_urls.push(url);
            }
        }

        conn.execute(
            "DELETE FROM students WHERE class_id = ?",
            libsql::params![id],
        )
        .await?;
        conn.execute("DELETE FROM classes WHERE id = ?", libsql::params![id])
            .await?;

        Ok(avatar_urls)
    }

    pub async fn list_students(&self) -> AppResult<Vec<StudentWithClass>> {
        let query = r#"
            SELECT
                students.id,
                students.name,
                students.age,
                students.class_id,
                students.avatar_url,
                classes.name AS class_name
            FROM students
            JOIN classes ON classes.id = students.class_id
            ORDER BY students.id
        "#;

        let mut rows = self.db.connection().query(query, ()).await?;
        let mut students = Vec::new();

        while let Some(row) = rows.next().await? {
            students.push(StudentWithClass {
                student: row_to_student(&row)?,
                class_name: row.get(5)?,
            });
        }

        Ok(students)
    }

    pub async fn get_student(&self, id: i64) -> AppResult<Option<Student>> {
        let query = "SELECT id, name, age, class_id, avatar_url FROM students WHERE id = ?";
        let mut rows = self.db.connection().query(query, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(row_to_student(&row)?))
        } else {
            Ok(None)
        }
    }

    async fn class_exists(&self, id: i64) -> AppResult<bool> {
        let mut rows = self
            .db
            .connection()
            .query("SELECT 1 FROM classes WHERE id = ?", libsql::params![id])
            .await?;
        Ok(rows.next().await?.is_some())
    }

    pub async fn create_student(&self, input: StudentInput) -> AppResult<Student> {
        require_non_empty(&input.name, "name")?;
        if input.age <= 0 {
            return Err(AppError::Validation("age must be positive".to_string()));
        }
        if !self.class_exists(input.class_id).await? {
            return Err(AppError::NotFound(format!(
                "Class id={} not found",
                input.class_id
            )));
        }

        let query = r#"
            INSERT INTO students (name, age, class_id, avatar_url)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, age, class_id, avatar_url
        "#;
        let mut rows = self
            .db
            .connection()
            .query(
                query,
                libsql::params![input.name, input.age, input.class_id, input.avatar_url],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(row_to_student(&row)?)
        } else {
            Err(AppError::Persistence(anyhow::anyhow!(
                "failed to create student"
            )))
        }
    }

    pub async fn update_student(&self, id: i64, input: StudentInput) -> AppResult<()> {
        require_non_empty(&input.name, "name")?;
        if input.age <= 0 {
            return Err(AppError::Validation("age must be positive".to_string()));
        }
        if !self.class_exists(input.class_id).await? {
            return Err(AppError::NotFound(format!(
                "Class id={} not found",
                input.class_id
            )));
        }

        let query = r#"
            UPDATE students
            SET name = ?, age = ?, class_id = ?, avatar_url = ?,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ?
        "#;
        let affected = self
            .db
            .connection()
            .execute(
                query,
                libsql::params![input.name, input.age, input.class_id, input.avatar_url, id],
            )
            .await?;

        if affected == 0 {
            return Err(AppError::NotFound(format!("Student id={id} not found")));
        }
        Ok(())
    }

    /// Deletes one student, returning their avatar URL (if any) for
    /// best-effort file cleanup by the caller.
    pub async fn delete_student(&self, id: i64) -> AppResult<Option<String>> {
        let student = self
            .get_student(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student id={id} not found")))?;

        self.db
            .connection()
            .execute("DELETE FROM students WHERE id = ?", libsql::params![id])
            .await?;

        Ok(student.avatar_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn class_input(name: &str) -> ClassInput {
        ClassInput {
            name: name.to_string(),
        }
    }

    fn student_input(name: &str, class_id: i64, avatar_url: Option<&str>) -> StudentInput {
        StudentInput {
            name: name.to_string(),
            age: 9,
            class_id,
            avatar_url: avatar_url.map(|s| s.to_string()),
        }
    }

    #[tokio::test]
    async fn class_crud_round_trip() {
        let db = test_db().await;
        let roster = Roster::new(&db);

        let class = roster.create_class(class_input("3-A")).await.unwrap();
        assert_eq!(roster.list_classes().await.unwrap().len(), 1);

        roster
            .update_class(class.id, class_input("3-B"))
            .await
            .unwrap();
        assert_eq!(roster.list_classes().await.unwrap()[0].name, "3-B");

        let err = roster
            .update_class(999, class_input("4-A"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_names_are_rejected() {
        let db = test_db().await;
        let roster = Roster::new(&db);

        let err = roster.create_class(class_input("  ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let class = roster.create_class(class_input("3-A")).await.unwrap();
        let err = roster
            .create_student(student_input("", class.id, None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn student_creation_requires_existing_class() {
        let db = test_db().await;
        let roster = Roster::new(&db);

        let err = roster
            .create_student(student_input("Mei", 42, None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn students_list_joins_class_name() {
        let db = test_db().await;
        let roster = Roster::new(&db);

        let class = roster.create_class(class_input("3-A")).await.unwrap();
        roster
            .create_student(student_input("Mei", class.id, None))
            .await
            .unwrap();

        let students = roster.list_students().await.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].class_name, "3-A");
        assert_eq!(students[0].student.name, "Mei");
    }

    #[tokio::test]
    async fn class_deletion_cascades_to_students() {
        let db = test_db().await;
        let roster = Roster::new(&db);

        let doomed = roster.create_class(class_input("3-A")).await.unwrap();
        let kept = roster.create_class(class_input("3-B")).await.unwrap();
        roster
            .create_student(student_input(
                "Mei",
                doomed.id,
                Some("/uploads/avatar-1.png"),
            ))
            .await
            .unwrap();
        roster
            .create_student(student_input("Ren", doomed.id, None))
            .await
            .unwrap();
        roster
            .create_student(student_input("Aoi", kept.id, None))
            .await
            .unwrap();

        let avatar_urls = roster.delete_class(doomed.id).await.unwrap();
        assert_eq!(avatar_urls, vec!["/uploads/avatar-1.png".to_string()]);

        let students = roster.list_students().await.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].student.name, "Aoi");
        assert_eq!(roster.list_classes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_missing_class_is_not_found() {
        let db = test_db().await;
        let err = Roster::new(&db).delete_class(7).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn student_deletion_returns_avatar_url() {
        let db = test_db().await;
        let roster = Roster::new(&db);

        let class = roster.create_class(class_input("3-A")).await.unwrap();
        let student = roster
            .create_student(student_input(
                "Mei",
                class.id,
                Some("/uploads/avatar-2.png"),
            ))
            .await
            .unwrap();

        let avatar = roster.delete_student(student.id).await.unwrap();
        assert_eq!(avatar.as_deref(), Some("/uploads/avatar-2.png"));
        assert!(roster.get_student(student.id).await.unwrap().is_none());

        let err = roster.delete_student(student.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

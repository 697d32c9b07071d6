use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;

/// A row of the `books` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    /// Primary key
    pub isbn: String,
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    pub pages: i32,
    pub publisher: String,
    pub title: String,
    pub year: i32,
}

/// Full replacement of every mutable field of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookChanges {
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    pub pages: i32,
    pub publisher: String,
    pub title: String,
    pub year: i32,
}

#[derive(Debug, Error)]
pub enum BookError {
    #[error("There is no book with an isbn '{isbn}")]
    NotFound { isbn: String },

    #[error("A book with isbn '{isbn}' already exists")]
    Conflict { isbn: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl BookError {
    fn not_found(isbn: &str) -> Self {
        Self::NotFound {
            isbn: isbn.to_string(),
        }
    }
}

/// Persistence for books; every method is a single statement.
#[derive(Debug, Clone)]
pub struct BookModel {
    pool: SqlitePool,
}

impl BookModel {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, book: &Book) -> Result<Book, BookError> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (isbn, amazon_url, author, language, pages, publisher, title, year)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING isbn, amazon_url, author, language, pages, publisher, title, year
            "#,
        )
        .bind(&book.isbn)
        .bind(&book.amazon_url)
        .bind(&book.author)
        .bind(&book.language)
        .bind(book.pages)
        .bind(&book.publisher)
        .bind(&book.title)
        .bind(book.year)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => BookError::Conflict {
                isbn: book.isbn.clone(),
            },
            other => BookError::Database(other),
        })?;

        tracing::debug!(isbn = %created.isbn, "book created");
        Ok(created)
    }

    /// All books ordered by title, ties broken by isbn.
    pub async fn list_all(&self) -> Result<Vec<Book>, BookError> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT isbn, amazon_url, author, language, pages, publisher, title, year
            FROM books
            ORDER BY title, isbn
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    pub async fn get_by_isbn(&self, isbn: &str) -> Result<Book, BookError> {
        sqlx::query_as::<_, Book>(
            r#"
            SELECT isbn, amazon_url, author, language, pages, publisher, title, year
            FROM books
            WHERE isbn = ?
            "#,
        )
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BookError::not_found(isbn))
    }

    pub async fn update(&self, isbn: &str, changes: &BookChanges) -> Result<Book, BookError> {
        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET amazon_url = ?, author = ?, language = ?, pages = ?,
                publisher = ?, title = ?, year = ?
            WHERE isbn = ?
            RETURNING isbn, amazon_url, author, language, pages, publisher, title, year
            "#,
        )
        .bind(&changes.amazon_url)
        .bind(&changes.author)
        .bind(&changes.language)
        .bind(changes.pages)
        .bind(&changes.publisher)
        .bind(&changes.title)
        .bind(changes.year)
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BookError::not_found(isbn))?;

        tracing::debug!(isbn = %updated.isbn, "book updated");
        Ok(updated)
    }

    pub async fn remove(&self, isbn: &str) -> Result<(), BookError> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = ?")
            .bind(isbn)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BookError::not_found(isbn));
        }

        tracing::debug!(%isbn, "book deleted");
        Ok(())
    }
}

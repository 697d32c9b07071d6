use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use bookshelf_http::AppError;

use super::models::{Book, BookChanges, BookError, BookModel};
use super::schema::{self, Mode};

#[derive(Debug, Serialize)]
pub struct BooksBody {
    pub books: Vec<Book>,
}

#[derive(Debug, Serialize)]
pub struct BookBody {
    pub book: Book,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::NotFound { .. } => AppError::not_found(err.to_string()),
            BookError::Conflict { .. } => AppError::conflict(err.to_string()),
            BookError::Database(db_err) => AppError::Internal(db_err.into()),
        }
    }
}

pub fn router(books: BookModel) -> Router {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/", get(list_books).post(create_book))
        .route(
            "/books/{isbn}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(books)
}

/// Validate a raw JSON body against the book rules, then decode it.
fn decode<T: DeserializeOwned>(
    payload: Result<Json<Value>, JsonRejection>,
    mode: Mode,
) -> Result<T, AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    schema::validate(&payload, mode)?;
    serde_json::from_value(payload).map_err(|err| AppError::bad_request(err.to_string()))
}

async fn list_books(State(books): State<BookModel>) -> Result<Json<BooksBody>, AppError> {
    let books = books.list_all().await?;
    Ok(Json(BooksBody { books }))
}

async fn get_book(
    State(books): State<BookModel>,
    Path(isbn): Path<String>,
) -> Result<Json<BookBody>, AppError> {
    let book = books.get_by_isbn(&isbn).await?;
    Ok(Json(BookBody { book }))
}

async fn create_book(
    State(books): State<BookModel>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<BookBody>), AppError> {
    let new_book: Book = decode(payload, Mode::Create)?;
    let book = books.create(&new_book).await?;

    tracing::info!(isbn = %book.isbn, "book created");
    Ok((StatusCode::CREATED, Json(BookBody { book })))
}

async fn update_book(
    State(books): State<BookModel>,
    Path(isbn): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BookBody>, AppError> {
    let changes: BookChanges = decode(payload, Mode::Update)?;
    let book = books.update(&isbn, &changes).await?;

    tracing::info!(isbn = %book.isbn, "book updated");
    Ok(Json(BookBody { book }))
}

async fn delete_book(
    State(books): State<BookModel>,
    Path(isbn): Path<String>,
) -> Result<Json<MessageBody>, AppError> {
    books.remove(&isbn).await?;

    tracing::info!(%isbn, "book deleted");
    Ok(Json(MessageBody {
        message: "Book deleted",
    }))
}

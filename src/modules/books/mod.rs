pub mod models;
pub mod routes;
pub mod schema;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use sqlx::SqlitePool;

use bookshelf_kernel::{InitCtx, Migration, Module};

use models::BookModel;

pub const BOOKS_MIGRATION: &str = r#"
    CREATE TABLE IF NOT EXISTS books (
        isbn       TEXT PRIMARY KEY,
        amazon_url TEXT NOT NULL,
        author     TEXT NOT NULL,
        language   TEXT NOT NULL,
        pages      INTEGER NOT NULL,
        publisher  TEXT NOT NULL,
        title      TEXT NOT NULL,
        year       INTEGER NOT NULL
    );
"#;

/// The books catalogue: CRUD over the `books` table
pub struct BooksModule {
    books: BookModel,
}

impl BooksModule {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            books: BookModel::new(pool),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.books.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let book_ref = json!({ "$ref": "#/components/schemas/Book" });
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let isbn_param = json!({
            "name": "isbn",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        });
        let book_request = json!({
            "required": true,
            "content": { "application/json": { "schema": book_ref } }
        });
        let book_response = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": {
                            "type": "object",
                            "properties": { "book": book_ref },
                            "required": ["book"]
                        }
                    }
                }
            })
        };

        Some(json!({
            "paths": {
                "/books/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Every book, ordered by title",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "books": { "type": "array", "items": book_ref }
                                            },
                                            "required": ["books"]
                                        }
                                    }
                                }
                            },
                            "500": error("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": book_request,
                        "responses": {
                            "201": book_response("Created book"),
                            "400": error("Invalid payload"),
                            "409": error("A book with this isbn already exists")
                        }
                    }
                },
                "/books/{isbn}": {
                    "parameters": [isbn_param],
                    "get": {
                        "summary": "Get a book by isbn",
                        "tags": ["Books"],
                        "responses": {
                            "200": book_response("The book"),
                            "404": error("No book with this isbn")
                        }
                    },
                    "put": {
                        "summary": "Replace every field of a book",
                        "tags": ["Books"],
                        "requestBody": book_request,
                        "responses": {
                            "200": book_response("Updated book"),
                            "400": error("Invalid payload"),
                            "404": error("No book with this isbn")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Book deleted",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": { "message": { "type": "string" } }
                                        }
                                    }
                                }
                            },
                            "404": error("No book with this isbn")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "isbn": { "type": "string", "description": "Primary key" },
                            "amazon_url": { "type": "string" },
                            "author": { "type": "string" },
                            "language": { "type": "string" },
                            "pages": { "type": "integer", "format": "int32" },
                            "publisher": { "type": "string" },
                            "title": { "type": "string" },
                            "year": { "type": "integer", "format": "int32" }
                        },
                        "required": [
                            "isbn", "amazon_url", "author", "language",
                            "pages", "publisher", "title", "year"
                        ]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_create_books",
            up: BOOKS_MIGRATION,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(pool: SqlitePool) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(pool))
}

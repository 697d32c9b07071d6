use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bookshelf::modules::books::models::{Book, BookModel};
use bookshelf_kernel::settings::Settings;

struct TestApp {
    router: Router,
    books: BookModel,
}

/// Fresh in-memory database per test, seeded with one book.
async fn setup() -> TestApp {
    let settings = Settings::for_tests();
    let pool = bookshelf_db::connect(&settings).await.unwrap();
    let registry = bookshelf::bootstrap(&settings, &pool).await.unwrap();
    let router = bookshelf_http::build_router(&registry, &settings);

    let books = BookModel::new(pool);
    books.create(&power_up()).await.unwrap();

    TestApp { router, books }
}

fn power_up() -> Book {
    serde_json::from_value(power_up_json()).unwrap()
}

fn power_up_json() -> Value {
    json!({
        "isbn": "0691161518",
        "amazon_url": "http://a.co/eobPtX2",
        "author": "Matthew Lane",
        "language": "english",
        "pages": 264,
        "publisher": "Princeton University Press",
        "title": "Power-Up: Unlocking the Hidden Mathematics in Video Games",
        "year": 2017
    })
}

fn power_down_json() -> Value {
    json!({
        "isbn": "0691261518",
        "amazon_url": "http://a.co/eobPtX2",
        "author": "Matthew Lanes",
        "language": "english",
        "pages": 264,
        "publisher": "Princeton University Press",
        "title": "Power-Down: Unlocking the Hidden Mathematics in Video Games",
        "year": 2017
    })
}

fn without(mut body: Value, field: &str) -> Value {
    body.as_object_mut().unwrap().remove(field);
    body
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, String) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    send_request(router, request).await
}

async fn send_request(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Checks the `{"error":{"message","status"},"message"}` error shape.
fn assert_error_envelope(text: &str, status: StatusCode) -> String {
    let json = parse(text);
    let message = json["message"].as_str().expect("top-level message").to_string();
    assert_eq!(json["error"]["status"], status.as_u16());
    assert_eq!(json["error"]["message"], message.as_str());
    message
}

fn parse(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn can_get_list_of_books() {
    let app = setup().await;

    let (status, text) = send(&app.router, Method::GET, "/books/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&text)["books"], json!([power_up_json()]));
}

#[tokio::test]
async fn list_route_works_without_trailing_slash() {
    let app = setup().await;

    let (status, text) = send(&app.router, Method::GET, "/books", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&text)["books"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn can_get_specific_book_by_isbn() {
    let app = setup().await;

    let (status, text) = send(&app.router, Method::GET, "/books/0691161518", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&text)["book"], power_up_json());
}

#[tokio::test]
async fn cant_get_book_with_wrong_isbn() {
    let app = setup().await;

    let (status, text) = send(
        &app.router,
        Method::GET,
        "/books/0691161347438743874518",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        text,
        r#"{"error":{"message":"There is no book with an isbn '0691161347438743874518","status":404},"message":"There is no book with an isbn '0691161347438743874518"}"#
    );
}

#[tokio::test]
async fn can_post_book() {
    let app = setup().await;

    let (status, text) = send(&app.router, Method::POST, "/books/", Some(power_down_json())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(parse(&text)["book"], power_down_json());

    let (status, text) = send(&app.router, Method::GET, "/books/0691261518", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&text)["book"], power_down_json());
}

#[tokio::test]
async fn cant_post_book_with_wrong_json() {
    let app = setup().await;

    let body = without(power_down_json(), "amazon_url");
    let (status, text) = send(&app.router, Method::POST, "/books/", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("amazon_url"));

    let (_, text) = send(&app.router, Method::GET, "/books/", None).await;
    assert_eq!(parse(&text)["books"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn post_lists_every_invalid_field() {
    let app = setup().await;

    let mut body = without(power_down_json(), "amazon_url");
    body["pages"] = json!("two hundred");
    let (status, text) = send(&app.router, Method::POST, "/books/", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json = parse(&text);
    assert_eq!(json["error"]["status"], 400);
    assert_eq!(
        json["error"]["details"],
        json!(["\"amazon_url\" is required", "\"pages\" must be an integer"])
    );
    assert!(json["message"].as_str().unwrap().contains("pages"));
}

#[tokio::test]
async fn cant_post_duplicate_isbn() {
    let app = setup().await;

    let (status, text) = send(&app.router, Method::POST, "/books/", Some(power_up_json())).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(parse(&text)["error"]["status"], 409);
    assert!(text.contains("0691161518"));
}

#[tokio::test]
async fn cant_post_malformed_json() {
    let app = setup().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/books/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"isbn\": "))
        .unwrap();
    let (status, text) = send_request(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&text, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cant_post_without_json_content_type() {
    let app = setup().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/books/")
        .body(Body::from(power_down_json().to_string()))
        .unwrap();
    let (status, text) = send_request(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = assert_error_envelope(&text, StatusCode::BAD_REQUEST);
    assert!(message.contains("Content-Type"));

    let (status, _) = send(&app.router, Method::GET, "/books/0691261518", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn can_update_book() {
    let app = setup().await;

    let mut body = power_up_json();
    body["author"] = json!("Matthew Lanesing");
    body["title"] = json!("Power-Down: Unlocking the Hidden Mathematics in Video Games");

    let (status, text) = send(&app.router, Method::PUT, "/books/0691161518", Some(body.clone())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&text)["book"], body);

    let stored = app.books.get_by_isbn("0691161518").await.unwrap();
    assert_eq!(stored.author, "Matthew Lanesing");
}

#[tokio::test]
async fn update_is_idempotent() {
    let app = setup().await;

    let mut body = power_up_json();
    body["author"] = json!("Matthew Lanesing");

    let (_, first) = send(&app.router, Method::PUT, "/books/0691161518", Some(body.clone())).await;
    let (status, second) = send(&app.router, Method::PUT, "/books/0691161518", Some(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&first), parse(&second));
}

#[tokio::test]
async fn cant_put_book_with_wrong_json() {
    let app = setup().await;

    let body = without(power_down_json(), "amazon_url");
    let (status, text) = send(&app.router, Method::PUT, "/books/0691161518", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("amazon_url"));
    assert_eq!(app.books.get_by_isbn("0691161518").await.unwrap(), power_up());
}

#[tokio::test]
async fn cant_put_book_with_non_existing_isbn() {
    let app = setup().await;

    let (status, text) = send(&app.router, Method::PUT, "/books/123", Some(power_up_json())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(text.contains("There is no book with an isbn '123"));
}

#[tokio::test]
async fn put_uses_the_path_isbn() {
    let app = setup().await;

    let body = without(power_up_json(), "isbn");
    let (status, text) = send(&app.router, Method::PUT, "/books/0691161518", Some(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&text)["book"]["isbn"], "0691161518");
}

#[tokio::test]
async fn can_delete_book() {
    let app = setup().await;

    let (status, text) = send(&app.router, Method::DELETE, "/books/0691161518", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&text), json!({ "message": "Book deleted" }));

    let (status, _) = send(&app.router, Method::GET, "/books/0691161518", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cant_delete_book_with_non_existing_isbn() {
    let app = setup().await;

    let (status, text) = send(&app.router, Method::DELETE, "/books/0691161518298293", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(text.contains("There is no book with an isbn "));
}

#[tokio::test]
async fn openapi_document_describes_books() {
    let app = setup().await;

    let (status, text) = send(&app.router, Method::GET, "/docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    let document = parse(&text);
    assert!(document["paths"]["/books/{isbn}"]["put"].is_object());
    assert!(document["components"]["schemas"]["Book"].is_object());
}

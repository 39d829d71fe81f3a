use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
}

#[derive(Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub year: Option<u16>,
}

#[derive(Deserialize)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<u16>,
}

/// What `/echo` saw of a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// Lower-cased names; the last value wins for repeated headers.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Book>>>;

type ApiError = (StatusCode, Json<Value>);

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/{id}",
            get(get_book).put(replace_book).patch(update_book).delete(delete_book),
        )
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/status/{code}", any(status))
        .route("/text", get(text))
        .route("/bytes/{len}", get(bytes))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn not_found(id: Uuid) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "book not found", "id": id})),
    )
}

async fn list_books(State(db): State<Db>) -> Json<Vec<Book>> {
    let books = db.read().await;
    let mut books: Vec<Book> = books.values().cloned().collect();
    books.sort_by(|a, b| a.title.cmp(&b.title));
    Json(books)
}

async fn create_book(State(db): State<Db>, Json(input): Json<NewBook>) -> (StatusCode, Json<Book>) {
    let book = Book {
        id: Uuid::new_v4(),
        title: input.title,
        author: input.author,
        year: input.year,
    };
    log::debug!("created book {}", book.id);
    db.write().await.insert(book.id, book.clone());
    (StatusCode::CREATED, Json(book))
}

async fn get_book(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Book>, ApiError> {
    let books = db.read().await;
    books.get(&id).cloned().map(Json).ok_or_else(|| not_found(id))
}

async fn replace_book(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<NewBook>,
) -> Result<Json<Book>, ApiError> {
    let mut books = db.write().await;
    let book = books.get_mut(&id).ok_or_else(|| not_found(id))?;
    book.title = input.title;
    book.author = input.author;
    book.year = input.year;
    Ok(Json(book.clone()))
}

async fn update_book(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<BookPatch>,
) -> Result<Json<Book>, ApiError> {
    let mut books = db.write().await;
    let book = books.get_mut(&id).ok_or_else(|| not_found(id))?;
    if let Some(title) = input.title {
        book.title = title;
    }
    if let Some(author) = input.author {
        book.author = author;
    }
    if input.year.is_some() {
        book.year = input.year;
    }
    Ok(Json(book.clone()))
}

async fn delete_book(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    let mut books = db.write().await;
    books
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| not_found(id))
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    log::debug!("echo {method} {uri}");
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((
        status,
        Json(json!({"status": code, "reason": status.canonical_reason()})),
    ))
}

async fn text() -> &'static str {
    "Hello world!"
}

/// `len` bytes of `x`, for exercising large bodies.
async fn bytes(Path(len): Path<usize>) -> Vec<u8> {
    vec![b'x'; len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_serializes_to_json() {
        let book = Book {
            id: Uuid::nil(),
            title: "Emma".to_string(),
            author: "Jane Austen".to_string(),
            year: None,
        };
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["title"], "Emma");
        assert!(json.get("year").is_none());
    }

    #[test]
    fn new_book_year_is_optional() {
        let input: NewBook = serde_json::from_str(r#"{"title":"Emma","author":"Jane Austen"}"#).unwrap();
        assert_eq!(input.title, "Emma");
        assert!(input.year.is_none());
    }

    #[test]
    fn new_book_requires_author() {
        let result: Result<NewBook, _> = serde_json::from_str(r#"{"title":"Emma"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn book_patch_fields_are_optional() {
        let input: BookPatch = serde_json::from_str(r#"{"year":1815}"#).unwrap();
        assert!(input.title.is_none());
        assert!(input.author.is_none());
        assert_eq!(input.year, Some(1815));
    }
}

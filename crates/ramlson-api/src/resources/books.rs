//! # Books
//!
//! An in-memory book collection served under `/books`:
//!
//! | Method | Path                       | Permission | Result                       |
//! |--------|----------------------------|------------|------------------------------|
//! | POST   | `/books`                   | `create`   | the stored book              |
//! | GET    | `/books`                   | `view`     | a page of books              |
//! | GET    | `/books/{bookId}`          | `view`     | one book, or 404             |
//! | PUT    | `/books/{bookId}`          | `update`   | `{"success": true}`          |
//! | DELETE | `/books/{bookId}`          | `delete`   | 204                          |
//! | GET    | `/books/some/other/things` | none       | `{"thing_type": ...}`        |

use std::cmp::Ordering;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use parking_lot::RwLock;
use ramlson_core::Payload;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::dispatch::ApiCall;
use crate::error::AppError;
use crate::registry::{api_method, api_service, ApiService};
use crate::state::AppState;

/// A book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
}

impl Book {
    /// Build a book from an object with `title`, `author` and an optional
    /// `isbn`. Any `id` in `data` is ignored in favour of `id`.
    ///
    /// # Errors
    ///
    /// `AppError::Validation` if `data` is not an object or a field is
    /// missing or not a string.
    pub fn from_dict(id: i64, data: &Value) -> Result<Self, AppError> {
        let object = data
            .as_object()
            .ok_or_else(|| AppError::Validation("a book must be a JSON object".to_string()))?;
        let text = |field: &str| -> Result<Option<String>, AppError> {
            match object.get(field) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(AppError::Validation(format!("'{field}' must be a string"))),
            }
        };
        let required = |field: &str| -> Result<String, AppError> {
            text(field)?.ok_or_else(|| AppError::Validation(format!("'{field}' is required")))
        };
        Ok(Self {
            id,
            title: required("title")?,
            author: required("author")?,
            isbn: text("isbn")?,
        })
    }

    fn to_value(&self) -> Result<Value, AppError> {
        serde_json::to_value(self).map_err(|e| AppError::Internal(e.to_string()))
    }
}

/// Book ids as the API accepts them: an integer, or a string holding one.
pub fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Thread-safe book store that keeps insertion order.
///
/// Replacing a book keeps its position. The lock is never held across an
/// `.await`, so it is `parking_lot` rather than `tokio::sync`.
#[derive(Debug, Clone, Default)]
pub struct BookRepository {
    books: Arc<RwLock<Vec<Book>>>,
}

impl BookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository holding the two stock books, 123 and 456.
    pub fn seeded() -> Self {
        let repo = Self::new();
        repo.insert(Book {
            id: 123,
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            isbn: Some("98765".to_string()),
        });
        repo.insert(Book {
            id: 456,
            title: "Hyperion Cantos".to_string(),
            author: "Dan Simmons".to_string(),
            isbn: Some("56789".to_string()),
        });
        repo
    }

    pub fn get(&self, id: i64) -> Option<Book> {
        self.books.read().iter().find(|b| b.id == id).cloned()
    }

    /// All books in insertion order.
    pub fn list(&self) -> Vec<Book> {
        self.books.read().clone()
    }

    /// Store `book`, returning the one it replaced.
    pub fn insert(&self, book: Book) -> Option<Book> {
        let mut books = self.books.write();
        match books.iter_mut().find(|b| b.id == book.id) {
            Some(slot) => Some(std::mem::replace(slot, book)),
            None => {
                books.push(book);
                None
            }
        }
    }

    /// Merge the fields of `changes` into book `id`. The id itself never
    /// changes. Returns the updated book, `Ok(None)` if there is no such book.
    ///
    /// # Errors
    ///
    /// `AppError::Validation` if the merged record is not a valid book; the
    /// stored book is left untouched.
    pub fn update(&self, id: i64, changes: &Map<String, Value>) -> Result<Option<Book>, AppError> {
        let mut books = self.books.write();
        let Some(slot) = books.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        let mut merged = slot.to_value()?;
        if let Value::Object(fields) = &mut merged {
            for (key, value) in changes {
                fields.insert(key.clone(), value.clone());
            }
        }
        let updated = Book::from_dict(id, &merged)?;
        *slot = updated.clone();
        Ok(Some(updated))
    }

    pub fn remove(&self, id: i64) -> Option<Book> {
        let mut books = self.books.write();
        let at = books.iter().position(|b| b.id == id)?;
        Some(books.remove(at))
    }

    pub fn len(&self) -> usize {
        self.books.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Listing ─────────────────────────────────────────────────────────

/// Book field to sort a listing by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Id,
    Title,
    Author,
    Isbn,
}

/// Paging and ordering of `GET /books`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub sort_by: SortBy,
    pub sort_reversed: bool,
    pub offset: usize,
    pub limit: usize,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            sort_by: SortBy::Id,
            sort_reversed: false,
            offset: 0,
            limit: 10,
        }
    }
}

impl ListParams {
    /// Read the listing parameters from a call's query string.
    ///
    /// # Errors
    ///
    /// `AppError::BadRequest` naming the first parameter that does not parse.
    pub fn from_call(call: &ApiCall) -> Result<Self, AppError> {
        let mut params = Self::default();
        if let Some(raw) = call.query("sort_by") {
            params.sort_by = match raw {
                "id" => SortBy::Id,
                "title" => SortBy::Title,
                "author" => SortBy::Author,
                "isbn" => SortBy::Isbn,
                other => return Err(bad_param("sort_by", other)),
            };
        }
        if let Some(raw) = call.query("sort_reversed") {
            params.sort_reversed = match raw.to_ascii_lowercase().as_str() {
                "" | "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => return Err(bad_param("sort_reversed", raw)),
            };
        }
        if let Some(raw) = call.query("offset") {
            params.offset = raw.parse().map_err(|_| bad_param("offset", raw))?;
        }
        if let Some(raw) = call.query("limit") {
            params.limit = raw.parse().map_err(|_| bad_param("limit", raw))?;
        }
        Ok(params)
    }

    /// Sort and page `books`.
    pub fn apply(&self, mut books: Vec<Book>) -> Vec<Book> {
        books.sort_by(|a, b| {
            let order = self.compare(a, b);
            if self.sort_reversed {
                order.reverse()
            } else {
                order
            }
        });
        books.into_iter().skip(self.offset).take(self.limit).collect()
    }

    fn compare(&self, a: &Book, b: &Book) -> Ordering {
        match self.sort_by {
            SortBy::Id => a.id.cmp(&b.id),
            SortBy::Title => a.title.cmp(&b.title),
            SortBy::Author => a.author.cmp(&b.author),
            SortBy::Isbn => a.isbn.cmp(&b.isbn),
        }
    }
}

fn bad_param(name: &str, value: &str) -> AppError {
    AppError::BadRequest(format!("invalid value for '{name}': {value:?}"))
}

// ── Handlers ────────────────────────────────────────────────────────

fn not_found(raw_id: &str) -> AppError {
    AppError::NotFound(format!("Book with id {raw_id} could not be found."))
}

fn book_id(call: &ApiCall) -> Result<(i64, &str), AppError> {
    let raw = call.param("bookId")?;
    let id = raw.trim().parse().map_err(|_| not_found(raw))?;
    Ok((id, raw))
}

fn create_record(state: &AppState, call: &mut ApiCall) -> Result<Payload, AppError> {
    let body = call.body()?;
    let id = body
        .get("id")
        .and_then(parse_id)
        .ok_or_else(|| AppError::Validation("'id' must be an integer".to_string()))?;
    let book = Book::from_dict(id, body)?;
    let value = book.to_value()?;
    if state.books.insert(book).is_some() {
        tracing::info!(id, "replaced book");
    } else {
        tracing::info!(id, "created book");
    }
    Ok(value.into())
}

fn get_all(state: &AppState, call: &mut ApiCall) -> Result<Payload, AppError> {
    let params = ListParams::from_call(call)?;
    let books = params.apply(state.books.list());
    Payload::from_serialize(&books).map_err(|e| AppError::Internal(e.to_string()))
}

fn get_one(state: &AppState, call: &mut ApiCall) -> Result<Payload, AppError> {
    let (id, raw) = book_id(call)?;
    let book = state.books.get(id).ok_or_else(|| not_found(raw))?;
    Ok(book.to_value()?.into())
}

fn update(state: &AppState, call: &mut ApiCall) -> Result<Payload, AppError> {
    let (id, raw) = book_id(call)?;
    let changes = call
        .body()?
        .as_object()
        .ok_or_else(|| AppError::Validation("a book update must be a JSON object".to_string()))?;
    state.books.update(id, changes)?.ok_or_else(|| not_found(raw))?;
    Ok(json!({"success": true}).into())
}

fn delete(state: &AppState, call: &mut ApiCall) -> Result<Payload, AppError> {
    let (id, raw) = book_id(call)?;
    state.books.remove(id).ok_or_else(|| not_found(raw))?;
    Ok(Payload::default())
}

fn things(_: &AppState, call: &mut ApiCall) -> Result<Payload, AppError> {
    Ok(json!({"thing_type": call.query("thing_type")}).into())
}

/// The book services.
pub fn services() -> Vec<ApiService> {
    vec![
        api_service("/books")
            .method(
                api_method(Method::POST)
                    .permission("create")
                    .request_schema("book")
                    .response_schema("book")
                    .handler(create_record),
            )
            .method(api_method(Method::GET).permission("view").handler(get_all)),
        api_service("/books/{bookId}")
            .method(
                api_method(Method::GET)
                    .permission("view")
                    .response_schema("book")
                    .handler(get_one),
            )
            .method(
                api_method(Method::PUT)
                    .permission("update")
                    .returns(StatusCode::OK)
                    .handler(update),
            )
            .method(
                api_method(Method::DELETE)
                    .permission("delete")
                    .returns(StatusCode::NO_CONTENT)
                    .handler(delete),
            ),
        api_service("/books/some/other/things").method(api_method(Method::GET).handler(things)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramlson_core::RequestContext;
    use std::collections::HashMap;

    fn call(query: &[(&str, &str)]) -> ApiCall {
        ApiCall {
            params: HashMap::new(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: None,
            context: RequestContext::new("GET", "/books"),
        }
    }

    fn book(id: i64, title: &str, author: &str) -> Book {
        Book {
            id,
            title: title.to_string(),
            author: author.to_string(),
            isbn: None,
        }
    }

    #[test]
    fn seeded_holds_stock_books_in_order() {
        let repo = BookRepository::seeded();
        let ids: Vec<_> = repo.list().iter().map(|b| b.id).collect();
        assert_eq!(ids, [123, 456]);
        assert_eq!(repo.get(123).unwrap().title, "Dune");
        assert_eq!(repo.get(456).unwrap().isbn.as_deref(), Some("56789"));
    }

    #[test]
    fn insert_keeps_position_on_replace() {
        let repo = BookRepository::seeded();
        repo.insert(book(1, "First", "A"));
        let old = repo.insert(book(123, "Dune Messiah", "Frank Herbert")).unwrap();
        assert_eq!(old.title, "Dune");
        let titles: Vec<_> = repo.list().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, ["Dune Messiah", "Hyperion Cantos", "First"]);
    }

    #[test]
    fn update_merges_fields_and_keeps_id() {
        let repo = BookRepository::seeded();
        let changes = json!({"title": "Dune (1965)", "id": 999});
        let updated = repo
            .update(123, changes.as_object().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, 123);
        assert_eq!(updated.title, "Dune (1965)");
        assert_eq!(updated.author, "Frank Herbert");
        assert!(repo.get(999).is_none());
    }

    #[test]
    fn invalid_update_leaves_book_alone() {
        let repo = BookRepository::seeded();
        let changes = json!({"title": 5});
        assert!(repo.update(123, changes.as_object().unwrap()).is_err());
        assert_eq!(repo.get(123).unwrap().title, "Dune");
        assert!(repo.update(7, &Map::new()).unwrap().is_none());
    }

    #[test]
    fn remove_and_len() {
        let repo = BookRepository::seeded();
        assert_eq!(repo.remove(123).unwrap().id, 123);
        assert!(repo.remove(123).is_none());
        assert_eq!(repo.len(), 1);
        assert!(!repo.is_empty());
    }

    #[test]
    fn from_dict_requires_title_and_author() {
        let b = Book::from_dict(1, &json!({"title": "T", "author": "A"})).unwrap();
        assert_eq!(b.isbn, None);
        assert!(Book::from_dict(1, &json!({"title": "T"})).is_err());
        assert!(Book::from_dict(1, &json!(["T", "A"])).is_err());
    }

    #[test]
    fn ids_parse_from_numbers_and_strings() {
        assert_eq!(parse_id(&json!(5)), Some(5));
        assert_eq!(parse_id(&json!("42")), Some(42));
        assert_eq!(parse_id(&json!("x")), None);
        assert_eq!(parse_id(&json!(1.5)), None);
    }

    #[test]
    fn list_params_defaults() {
        assert_eq!(ListParams::from_call(&call(&[])).unwrap(), ListParams::default());
    }

    #[test]
    fn list_params_sort_and_page() {
        let params = ListParams::from_call(&call(&[
            ("sort_by", "title"),
            ("sort_reversed", "true"),
            ("limit", "2"),
            ("offset", "1"),
        ]))
        .unwrap();
        let books = vec![book(1, "A", "x"), book(2, "C", "y"), book(3, "B", "z"), book(4, "D", "w")];
        let titles: Vec<_> = params.apply(books).into_iter().map(|b| b.title).collect();
        assert_eq!(titles, ["C", "B"]);
    }

    #[test]
    fn list_params_reject_garbage() {
        assert!(ListParams::from_call(&call(&[("sort_by", "pages")])).is_err());
        assert!(ListParams::from_call(&call(&[("limit", "-1")])).is_err());
        assert!(ListParams::from_call(&call(&[("sort_reversed", "maybe")])).is_err());
    }

    #[test]
    fn services_declare_expected_routes() {
        let paths: Vec<_> = services().iter().map(|s| s.path().to_string()).collect();
        assert_eq!(paths, ["/books", "/books/{bookId}", "/books/some/other/things"]);
    }
}

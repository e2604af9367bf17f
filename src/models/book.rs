//! Book model and related types

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{author::Author, genre::Genre};

/// Stored book; authors and genres are kept by id
#[derive(Debug, Clone)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub author_ids: Vec<i64>,
    pub genre_ids: Vec<i64>,
}

/// Book with its authors and genres resolved
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub authors: Vec<Author>,
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[serde(default)]
    pub author_ids: Vec<i64>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatchBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,
    pub author_ids: Option<Vec<i64>>,
    pub genre_ids: Option<Vec<i64>>,
}

/// Book filters; the first one set wins, in field order
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
pub struct BookQuery {
    pub title: Option<String>,
    /// Substring of any author name
    pub author: Option<String>,
    /// Substring of any genre name
    pub genre: Option<String>,
}

/// Descriptive details of a book, one per book; `id` is the book's id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookInfo {
    pub id: i64,
    pub number_of_pages: Option<i32>,
    pub language: Option<String>,
    pub publication_year: Option<i32>,
    pub description: Option<String>,
    pub isbn: Option<String>,
}

impl BookInfo {
    pub fn empty(book_id: i64) -> Self {
        Self {
            id: book_id,
            ..Default::default()
        }
    }

    pub fn apply(&mut self, patch: PatchBookInfo) {
        if patch.number_of_pages.is_some() {
            self.number_of_pages = patch.number_of_pages;
        }
        if patch.language.is_some() {
            self.language = patch.language;
        }
        if patch.publication_year.is_some() {
            self.publication_year = patch.publication_year;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if patch.isbn.is_some() {
            self.isbn = patch.isbn;
        }
    }
}

/// Partial update of a book's details; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatchBookInfo {
    #[validate(range(min = 1, message = "Number of pages must be positive"))]
    pub number_of_pages: Option<i32>,
    #[validate(length(min = 1, max = 50, message = "Language must be 1 to 50 characters"))]
    pub language: Option<String>,
    pub publication_year: Option<i32>,
    #[validate(length(max = 2000, message = "Description is limited to 2000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 10, max = 17, message = "ISBN must be 10 to 17 characters"))]
    pub isbn: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_info_patch_keeps_absent_fields() {
        let mut info = BookInfo::empty(3);
        info.apply(PatchBookInfo {
            number_of_pages: Some(412),
            language: Some("English".to_string()),
            ..Default::default()
        });
        info.apply(PatchBookInfo {
            isbn: Some("978-0441013593".to_string()),
            ..Default::default()
        });

        assert_eq!(info.id, 3);
        assert_eq!(info.number_of_pages, Some(412));
        assert_eq!(info.language.as_deref(), Some("English"));
        assert_eq!(info.isbn.as_deref(), Some("978-0441013593"));
        assert!(info.description.is_none());

        let body = serde_json::to_value(&info).unwrap();
        assert_eq!(body["numberOfPages"], 412);
        assert_eq!(body["publicationYear"], serde_json::Value::Null);
    }

    #[test]
    fn test_book_info_validation() {
        let patch = PatchBookInfo {
            number_of_pages: Some(0),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
        assert!(PatchBookInfo::default().validate().is_ok());
    }
}

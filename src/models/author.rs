//! Author model and related types

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl Author {
    pub fn new(id: i64, input: AuthorInput) -> Self {
        Self {
            id,
            name: input.name,
            description: input.description,
        }
    }
}

/// Body of author create and update requests
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AuthorInput {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
pub struct AuthorQuery {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
}

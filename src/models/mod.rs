//! Data models for the library server

pub mod author;
pub mod book;
pub mod entry;
pub mod genre;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::Book;
pub use entry::Entry;
pub use genre::Genre;
pub use user::User;

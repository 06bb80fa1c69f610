//! Commands operating on the environments of a project.
pub mod delete;
pub mod list;

pub use delete::Delete;
pub use list::List;

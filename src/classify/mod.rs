//! Extension classification module
//!
//! Decides which category and extension folder a file belongs to.
//!
//! # Submodules
//!
//! - `categories` - Category configuration loading and extension lookup
//! - `sniff` - File name splitting and content-type sniffing

pub mod categories;
pub mod sniff;

pub use categories::{
    CategoryConflict, CategoryMap, CategoryProvider, FileCategoryProvider, InlineCategoryProvider,
    DEFAULT_CATEGORY,
};
pub use sniff::{resolve_extension, split_file_name};

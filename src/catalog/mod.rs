pub mod json_file;
mod template;

pub use template::CatalogStore;

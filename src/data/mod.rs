pub mod bar;
pub mod loader;

pub use bar::{validate_series, Bar, ValidationError};
pub use loader::load_csv;

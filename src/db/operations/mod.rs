pub mod progress;
pub mod relations;
pub mod user;
pub mod words;

pub mod app;
pub mod authz;
pub mod bootstrap;
pub mod catalog;
pub mod db;
pub mod errors;
pub mod jwt;
pub mod models;
pub mod ops;
pub mod routes;
pub mod utils;

// Re-export commonly used items for tests
pub use app::create_app;

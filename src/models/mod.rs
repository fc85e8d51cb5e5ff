pub mod connections;
pub mod dump;
pub mod schema;

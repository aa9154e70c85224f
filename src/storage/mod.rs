pub mod migrations;
pub mod schema;

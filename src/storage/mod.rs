pub mod btree;
pub mod env;
pub mod heap_file;
pub mod index;
pub mod relation;
pub mod schema;

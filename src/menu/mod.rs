pub mod models;
pub mod reorder;
pub mod tree;

pub mod reader;
pub mod row;

pub mod decimal;
pub mod query;

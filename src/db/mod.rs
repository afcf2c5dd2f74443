pub mod bookingdb;
pub mod cache;
pub mod db;
pub mod memory;
pub mod query_timeout;
pub mod store;

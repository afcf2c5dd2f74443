pub mod aggregator;
pub mod comparison_service;
pub mod error;
pub mod filter;
pub mod import_service;
pub mod location_service;
pub mod planner_service;
pub mod search_service;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Property {
    pub id: i64,
    pub external_id: i64, // id assigned by the scraped source, never generated here
    pub accommodation_type: String,
    pub city_id: i64,
    pub neighborhood_id: i64,

    // Specifications
    pub rooms: Option<i32>,
    pub beds: Option<i32>,
    pub bathrooms: Option<i32>,
}

/// Property fields as they arrive from an import, before an id is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProperty {
    pub external_id: i64,
    pub accommodation_type: String,
    pub city_id: i64,
    pub neighborhood_id: i64,
    pub rooms: Option<i32>,
    pub beds: Option<i32>,
    pub bathrooms: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Review {
    pub id: i64,
    pub property_id: i64,
    pub rating: Option<BigDecimal>, // 0.0 - 10.0, one decimal place
    pub review_count: Option<i32>,
}

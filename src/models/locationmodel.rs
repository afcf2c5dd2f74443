use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub state: String, // two-letter state code
}

impl City {
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.name, self.state)
    }
}

/// A neighborhood belongs to exactly one city for its whole lifetime;
/// no store operation rewrites `city_id`.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Neighborhood {
    pub id: i64,
    pub city_id: i64,
    pub name: String,
}

/// A search location: a whole city, or one neighborhood inside it.
///
/// When a neighborhood is given it takes precedence over the city for
/// filtering; the city id is kept for the same-city comparison rules.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub city_id: i64,
    pub neighborhood_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    City,
    Neighborhood,
}

impl Location {
    pub fn city(city_id: i64) -> Self {
        Self { city_id, neighborhood_id: None }
    }

    pub fn neighborhood(city_id: i64, neighborhood_id: i64) -> Self {
        Self { city_id, neighborhood_id: Some(neighborhood_id) }
    }

    pub fn kind(&self) -> LocationKind {
        match self.neighborhood_id {
            Some(_) => LocationKind::Neighborhood,
            None => LocationKind::City,
        }
    }

    /// The id of the most specific place this location names.
    pub fn target_id(&self) -> i64 {
        self.neighborhood_id.unwrap_or(self.city_id)
    }
}

// db/bookingdb.rs
use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};

use super::{
    db::DBClient,
    query_timeout::QueryTimeout,
    store::{BookingOrder, BookingStore, ImportSink},
};
use crate::{
    dtos::importdtos::ImportRow,
    models::{
        bookingmodel::{BookingRecord, Listing},
        locationmodel::{City, Neighborhood},
        propertymodel::Review,
    },
    service::{error::ServiceError, filter::BookingFilter},
};

const BOOKING_FROM: &str = r#"
    FROM bookings b
    JOIN properties p ON p.id = b.property_id
    JOIN cities c ON c.id = p.city_id
    JOIN neighborhoods n ON n.id = p.neighborhood_id
    WHERE TRUE"#;

const BOOKING_COLUMNS: &str = r#"
    SELECT DISTINCT
        b.id AS booking_id, p.id AS property_id, p.external_id, p.accommodation_type,
        c.id AS city_id, c.name AS city_name, c.state AS city_state,
        n.id AS neighborhood_id, n.name AS neighborhood_name,
        p.rooms, p.beds, p.bathrooms,
        b.check_in, b.check_out,
        b.total_price::float8 AS total_price,
        b.price_per_night::float8 AS price_per_night,
        b.guests, b.link"#;

impl DBClient {
    fn filtered<'a>(select: &str, filter: &BookingFilter) -> QueryBuilder<'a, Postgres> {
        let mut qb = QueryBuilder::new(select);
        qb.push(BOOKING_FROM);
        filter.push_where(&mut qb);
        qb
    }
}

#[async_trait]
impl BookingStore for DBClient {
    async fn list_cities(&self) -> Result<Vec<City>, ServiceError> {
        QueryTimeout::execute_with_timeout(
            sqlx::query_as::<_, City>(r#"SELECT id, name, state FROM cities ORDER BY name"#)
                .fetch_all(&self.pool),
            QueryTimeout::LOOKUP_TIMEOUT,
        )
        .await
    }

    async fn list_neighborhoods(&self, city_id: i64) -> Result<Vec<Neighborhood>, ServiceError> {
        QueryTimeout::execute_with_timeout(
            sqlx::query_as::<_, Neighborhood>(
                r#"SELECT id, city_id, name FROM neighborhoods WHERE city_id = $1 ORDER BY name"#,
            )
            .bind(city_id)
            .fetch_all(&self.pool),
            QueryTimeout::LOOKUP_TIMEOUT,
        )
        .await
    }

    async fn find_city(&self, city_id: i64) -> Result<Option<City>, ServiceError> {
        QueryTimeout::execute_with_timeout(
            sqlx::query_as::<_, City>(r#"SELECT id, name, state FROM cities WHERE id = $1"#)
                .bind(city_id)
                .fetch_optional(&self.pool),
            QueryTimeout::LOOKUP_TIMEOUT,
        )
        .await
    }

    async fn find_neighborhood(
        &self,
        neighborhood_id: i64,
    ) -> Result<Option<Neighborhood>, ServiceError> {
        QueryTimeout::execute_with_timeout(
            sqlx::query_as::<_, Neighborhood>(
                r#"SELECT id, city_id, name FROM neighborhoods WHERE id = $1"#,
            )
            .bind(neighborhood_id)
            .fetch_optional(&self.pool),
            QueryTimeout::LOOKUP_TIMEOUT,
        )
        .await
    }

    async fn cities_with_bookings_from(&self, from: NaiveDate) -> Result<Vec<City>, ServiceError> {
        QueryTimeout::execute_with_timeout(
            sqlx::query_as::<_, City>(
                r#"
                SELECT c.id, c.name, c.state
                FROM cities c
                WHERE EXISTS (
                    SELECT 1 FROM properties p
                    JOIN bookings b ON b.property_id = p.id
                    WHERE p.city_id = c.id AND b.check_in >= $1
                )
                ORDER BY c.name
                "#,
            )
            .bind(from)
            .fetch_all(&self.pool),
            QueryTimeout::DEFAULT_TIMEOUT,
        )
        .await
    }

    async fn neighborhoods_with_bookings_from(
        &self,
        city_id: i64,
        from: NaiveDate,
    ) -> Result<Vec<Neighborhood>, ServiceError> {
        QueryTimeout::execute_with_timeout(
            sqlx::query_as::<_, Neighborhood>(
                r#"
                SELECT n.id, n.city_id, n.name
                FROM neighborhoods n
                WHERE n.city_id = $1 AND EXISTS (
                    SELECT 1 FROM properties p
                    JOIN bookings b ON b.property_id = p.id
                    WHERE p.neighborhood_id = n.id AND b.check_in >= $2
                )
                ORDER BY n.name
                "#,
            )
            .bind(city_id)
            .bind(from)
            .fetch_all(&self.pool),
            QueryTimeout::DEFAULT_TIMEOUT,
        )
        .await
    }

    async fn fetch_bookings(
        &self,
        filter: &BookingFilter,
        order: BookingOrder,
        limit: Option<i64>,
    ) -> Result<Vec<BookingRecord>, ServiceError> {
        if filter.is_none() {
            return Ok(Vec::new());
        }

        let mut qb = Self::filtered(BOOKING_COLUMNS, filter);
        match order {
            BookingOrder::CheckIn => qb.push(" ORDER BY check_in ASC, booking_id ASC"),
            BookingOrder::PricePerNight => {
                qb.push(" ORDER BY price_per_night ASC NULLS LAST, booking_id ASC")
            }
        };
        if let Some(limit) = limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        tracing::debug!("fetch_bookings: {}", qb.sql());
        let query = qb.build_query_as::<BookingRecord>();
        QueryTimeout::execute_with_timeout(
            query.fetch_all(&self.pool),
            QueryTimeout::AGGREGATION_TIMEOUT,
        )
        .await
    }

    async fn fetch_listings(&self, booking_ids: &[i64]) -> Result<Vec<Listing>, ServiceError> {
        if booking_ids.is_empty() {
            return Ok(vec![]);
        }

        QueryTimeout::execute_with_timeout(
            sqlx::query_as::<_, Listing>(
                r#"SELECT id, booking_id, title, link FROM listings
                   WHERE booking_id = ANY($1)
                   ORDER BY booking_id, id"#,
            )
            .bind(booking_ids)
            .fetch_all(&self.pool),
            QueryTimeout::DEFAULT_TIMEOUT,
        )
        .await
    }

    async fn fetch_reviews(&self, property_ids: &[i64]) -> Result<Vec<Review>, ServiceError> {
        if property_ids.is_empty() {
            return Ok(vec![]);
        }

        QueryTimeout::execute_with_timeout(
            sqlx::query_as::<_, Review>(
                r#"SELECT id, property_id, rating, review_count FROM reviews
                   WHERE property_id = ANY($1)
                   ORDER BY rating DESC NULLS LAST, id"#,
            )
            .bind(property_ids)
            .fetch_all(&self.pool),
            QueryTimeout::DEFAULT_TIMEOUT,
        )
        .await
    }

    async fn distinct_check_ins(
        &self,
        filter: &BookingFilter,
    ) -> Result<Vec<NaiveDate>, ServiceError> {
        if filter.is_none() {
            return Ok(vec![]);
        }
        let mut qb = Self::filtered("SELECT DISTINCT b.check_in", filter);
        qb.push(" ORDER BY b.check_in");
        let query = qb.build_query_scalar::<NaiveDate>();
        QueryTimeout::execute_with_timeout(
            query.fetch_all(&self.pool),
            QueryTimeout::DEFAULT_TIMEOUT,
        )
        .await
    }

    async fn distinct_guests(&self, filter: &BookingFilter) -> Result<Vec<i32>, ServiceError> {
        if filter.is_none() {
            return Ok(vec![]);
        }
        let mut qb = Self::filtered("SELECT DISTINCT b.guests", filter);
        qb.push(" ORDER BY b.guests");
        let query = qb.build_query_scalar::<i32>();
        QueryTimeout::execute_with_timeout(
            query.fetch_all(&self.pool),
            QueryTimeout::DEFAULT_TIMEOUT,
        )
        .await
    }

    async fn distinct_nights(&self, filter: &BookingFilter) -> Result<Vec<i64>, ServiceError> {
        if filter.is_none() {
            return Ok(vec![]);
        }
        let mut qb = Self::filtered(
            "SELECT DISTINCT (b.check_out - b.check_in)::int8 AS nights",
            filter,
        );
        qb.push(" AND b.check_out IS NOT NULL AND b.check_out > b.check_in ORDER BY nights");
        let query = qb.build_query_scalar::<i64>();
        QueryTimeout::execute_with_timeout(
            query.fetch_all(&self.pool),
            QueryTimeout::DEFAULT_TIMEOUT,
        )
        .await
    }
}

/// One upsert row per property in a batch. The location comes from the
/// first row; later rows refresh the type and any specs they carry.
#[derive(Debug, Clone, PartialEq)]
struct PropertyUpsert {
    external_id: i64,
    accommodation_type: String,
    city: String,
    neighborhood: String,
    rooms: Option<i32>,
    beds: Option<i32>,
    bathrooms: Option<i32>,
}

/// Distinct city names with the first non-empty state seen for each.
fn distinct_cities(rows: &[ImportRow]) -> Vec<(String, String)> {
    let mut cities: Vec<(String, String)> = Vec::new();
    for row in rows {
        match cities.iter_mut().find(|(name, _)| *name == row.city) {
            Some((_, state)) if state.is_empty() => *state = row.state.clone(),
            Some(_) => {}
            None => cities.push((row.city.clone(), row.state.clone())),
        }
    }
    cities
}

fn distinct_properties(rows: &[ImportRow]) -> Vec<PropertyUpsert> {
    let mut order: Vec<i64> = Vec::new();
    let mut by_id: HashMap<i64, PropertyUpsert> = HashMap::new();
    for row in rows {
        match by_id.get_mut(&row.external_id) {
            Some(property) => {
                property.accommodation_type = row.accommodation_type.clone();
                property.rooms = row.rooms.or(property.rooms);
                property.beds = row.beds.or(property.beds);
                property.bathrooms = row.bathrooms.or(property.bathrooms);
            }
            None => {
                order.push(row.external_id);
                by_id.insert(
                    row.external_id,
                    PropertyUpsert {
                        external_id: row.external_id,
                        accommodation_type: row.accommodation_type.clone(),
                        city: row.city.clone(),
                        neighborhood: row.neighborhood.clone(),
                        rooms: row.rooms,
                        beds: row.beds,
                        bathrooms: row.bathrooms,
                    },
                );
            }
        }
    }
    order.into_iter().filter_map(|id| by_id.remove(&id)).collect()
}

fn resolved<K, Q>(ids: &HashMap<K, i64>, key: &Q, what: &str) -> Result<i64, ServiceError>
where
    K: std::borrow::Borrow<Q> + std::hash::Hash + Eq,
    Q: std::hash::Hash + Eq + std::fmt::Debug + ?Sized,
{
    ids.get(key)
        .copied()
        .ok_or_else(|| ServiceError::DataIntegrity(format!("{} {:?} was not upserted", what, key)))
}

#[async_trait]
impl ImportSink for DBClient {
    /// One transaction and a fixed number of statements per batch.
    async fn import_batch(&self, rows: &[ImportRow]) -> Result<u64, ServiceError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("INSERT INTO cities (name, state) ");
        qb.push_values(distinct_cities(rows), |mut b, (name, state)| {
            b.push_bind(name).push_bind(state);
        });
        qb.push(
            r#" ON CONFLICT (name) DO UPDATE
                SET state = CASE WHEN cities.state = '' THEN EXCLUDED.state ELSE cities.state END
                RETURNING id, name"#,
        );
        let city_ids: HashMap<String, i64> = qb
            .build_query_as::<(i64, String)>()
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|(id, name)| (name, id))
            .collect();

        let mut neighborhood_keys: Vec<(i64, String)> = Vec::new();
        for row in rows {
            let key = (resolved(&city_ids, row.city.as_str(), "city")?, row.neighborhood.clone());
            if !neighborhood_keys.contains(&key) {
                neighborhood_keys.push(key);
            }
        }
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO neighborhoods (city_id, name) ");
        qb.push_values(neighborhood_keys, |mut b, (city_id, name)| {
            b.push_bind(city_id).push_bind(name);
        });
        qb.push(
            " ON CONFLICT (city_id, name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id, city_id, name",
        );
        let neighborhood_ids: HashMap<(i64, String), i64> = qb
            .build_query_as::<(i64, i64, String)>()
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|(id, city_id, name)| ((city_id, name), id))
            .collect();

        let mut properties = Vec::new();
        for property in distinct_properties(rows) {
            let city_id = resolved(&city_ids, property.city.as_str(), "city")?;
            let neighborhood_id = resolved(
                &neighborhood_ids,
                &(city_id, property.neighborhood.clone()),
                "neighborhood",
            )?;
            properties.push((property, city_id, neighborhood_id));
        }
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO properties \
             (external_id, accommodation_type, city_id, neighborhood_id, rooms, beds, bathrooms) ",
        );
        qb.push_values(properties, |mut b, (property, city_id, neighborhood_id)| {
            b.push_bind(property.external_id)
                .push_bind(property.accommodation_type)
                .push_bind(city_id)
                .push_bind(neighborhood_id)
                .push_bind(property.rooms)
                .push_bind(property.beds)
                .push_bind(property.bathrooms);
        });
        qb.push(
            r#" ON CONFLICT (external_id) DO UPDATE SET
                accommodation_type = EXCLUDED.accommodation_type,
                rooms = COALESCE(EXCLUDED.rooms, properties.rooms),
                beds = COALESCE(EXCLUDED.beds, properties.beds),
                bathrooms = COALESCE(EXCLUDED.bathrooms, properties.bathrooms)
                RETURNING id, external_id"#,
        );
        let property_ids: HashMap<i64, i64> = qb
            .build_query_as::<(i64, i64)>()
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|(id, external_id)| (external_id, id))
            .collect();

        // Ids are drawn up front so listings can point at their bookings
        // without relying on RETURNING order.
        let booking_ids: Vec<i64> = sqlx::query_scalar(
            r#"SELECT nextval(pg_get_serial_sequence('bookings', 'id'))
               FROM generate_series(1, $1::int8)"#,
        )
        .bind(rows.len() as i64)
        .fetch_all(&mut *tx)
        .await?;

        let mut bookings = Vec::with_capacity(rows.len());
        for (row, booking_id) in rows.iter().zip(booking_ids) {
            let property_id = resolved(&property_ids, &row.external_id, "property")?;
            bookings.push((booking_id, property_id, row));
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO bookings \
             (id, property_id, check_in, check_out, total_price, price_per_night, guests, link) ",
        );
        qb.push_values(&bookings, |mut b, (booking_id, property_id, row)| {
            b.push_bind(*booking_id)
                .push_bind(*property_id)
                .push_bind(row.check_in)
                .push_bind(row.check_out)
                .push_bind(row.total_price.clone())
                .push_bind(row.price_per_night.clone())
                .push_bind(row.guests)
                .push_bind(row.link.clone());
        });
        qb.build().execute(&mut *tx).await?;

        let listings: Vec<(i64, String, String)> = bookings
            .iter()
            .filter(|(_, _, row)| row.title.is_some() || !row.link.is_empty())
            .map(|(booking_id, _, row)| {
                (*booking_id, row.title.clone().unwrap_or_default(), row.link.clone())
            })
            .collect();
        if !listings.is_empty() {
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO listings (booking_id, title, link) ");
            qb.push_values(listings, |mut b, (booking_id, title, link)| {
                b.push_bind(booking_id).push_bind(title).push_bind(link);
            });
            qb.build().execute(&mut *tx).await?;
        }

        // First rating per property, and only for properties without a review yet.
        let mut reviews: Vec<(i64, Option<BigDecimal>, Option<i32>)> = Vec::new();
        for (_, property_id, row) in &bookings {
            if row.rating.is_some() && !reviews.iter().any(|(id, _, _)| id == property_id) {
                reviews.push((*property_id, row.rating.clone(), row.review_count));
            }
        }
        if !reviews.is_empty() {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO reviews (property_id, rating, review_count) \
                 SELECT v.property_id, v.rating, v.review_count FROM (",
            );
            qb.push_values(reviews, |mut b, (property_id, rating, review_count)| {
                b.push_bind(property_id).push_bind(rating).push_bind(review_count);
            });
            qb.push(
                r#") AS v(property_id, rating, review_count)
                WHERE NOT EXISTS (SELECT 1 FROM reviews r WHERE r.property_id = v.property_id)"#,
            );
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        tracing::debug!("import batch committed: {} bookings", rows.len());
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(external_id: i64, city: &str, state: &str, rooms: Option<i32>) -> ImportRow {
        ImportRow {
            line: 2,
            external_id,
            title: None,
            accommodation_type: "Casa".into(),
            city: city.into(),
            state: state.into(),
            neighborhood: "Centro".into(),
            check_in: NaiveDate::from_ymd_opt(2030, 1, 10).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2030, 1, 13).unwrap(),
            guests: 2,
            total_price: None,
            price_per_night: None,
            rooms,
            beds: None,
            bathrooms: None,
            rating: None,
            review_count: None,
            link: String::new(),
        }
    }

    #[test]
    fn cities_are_upserted_once_per_batch() {
        let rows = vec![
            row(1, "Gramado", "", None),
            row(2, "Canela", "RS", None),
            row(3, "Gramado", "RS", None),
        ];
        assert_eq!(
            distinct_cities(&rows),
            vec![
                ("Gramado".to_string(), "RS".to_string()),
                ("Canela".to_string(), "RS".to_string())
            ]
        );
    }

    #[test]
    fn repeated_properties_collapse_to_their_latest_specs() {
        let mut moved = row(1, "Canela", "RS", None);
        moved.accommodation_type = "Loft".into();
        let rows = vec![row(1, "Gramado", "RS", Some(2)), row(2, "Gramado", "RS", None), moved];

        let properties = distinct_properties(&rows);
        assert_eq!(properties.len(), 2);
        assert_eq!(properties[0].external_id, 1);
        // Location is fixed by the first row, specs survive a row without them.
        assert_eq!(properties[0].city, "Gramado");
        assert_eq!(properties[0].accommodation_type, "Loft");
        assert_eq!(properties[0].rooms, Some(2));
    }
}

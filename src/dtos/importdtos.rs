use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    service::error::ServiceError,
    utils::decimal::{clean_decimal, clean_integer},
};

pub const IMPORT_DATE_FORMAT: &str = "%d/%m/%Y";

/// One CSV line as scraped. Every cell is optional text; the scraper's
/// Portuguese headers are accepted next to the English ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawImportRow {
    #[serde(alias = "ID Imóvel", alias = "id_imovel")]
    pub property_id: Option<String>,
    #[serde(alias = "Título")]
    pub title: Option<String>,
    #[serde(alias = "Tipo de Acomodação")]
    pub accommodation_type: Option<String>,
    #[serde(alias = "Cidade")]
    pub city: Option<String>,
    #[serde(alias = "Estado", alias = "UF")]
    pub state: Option<String>,
    #[serde(alias = "Bairro")]
    pub neighborhood: Option<String>,
    /// "Neighborhood, City" fallback when the split columns are missing.
    #[serde(alias = "Localização")]
    pub location: Option<String>,
    #[serde(alias = "Data de Check-in")]
    pub check_in: Option<String>,
    #[serde(alias = "Data de Check-out")]
    pub check_out: Option<String>,
    #[serde(alias = "Número de Hóspedes")]
    pub guests: Option<String>,
    #[serde(alias = "Preço total")]
    pub total_price: Option<String>,
    #[serde(alias = "Preço por noite")]
    pub price_per_night: Option<String>,
    #[serde(alias = "Quartos")]
    pub rooms: Option<String>,
    #[serde(alias = "Camas")]
    pub beds: Option<String>,
    #[serde(alias = "Banheiros")]
    pub bathrooms: Option<String>,
    #[serde(alias = "Avaliação")]
    pub rating: Option<String>,
    #[serde(alias = "Quantidade de Avaliações")]
    pub review_count: Option<String>,
    #[serde(alias = "Link")]
    pub link: Option<String>,
}

/// A row that passed the required checks, with every optional field parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportRow {
    pub line: usize,
    pub external_id: i64,
    pub title: Option<String>,
    pub accommodation_type: String,
    pub city: String,
    pub state: String,
    pub neighborhood: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub total_price: Option<BigDecimal>,
    pub price_per_night: Option<BigDecimal>,
    pub rooms: Option<i32>,
    pub beds: Option<i32>,
    pub bathrooms: Option<i32>,
    pub rating: Option<BigDecimal>,
    pub review_count: Option<i32>,
    pub link: String,
}

fn text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn date(value: &Option<String>) -> Option<NaiveDate> {
    let raw = text(value)?;
    NaiveDate::parse_from_str(&raw, IMPORT_DATE_FORMAT).ok()
}

fn non_negative(value: Option<i32>) -> Option<i32> {
    value.filter(|v| *v >= 0)
}

impl RawImportRow {
    /// Validate the required cells and best-effort parse the rest.
    /// `line` is the 1-based data row number used in warnings.
    pub fn clean(&self, line: usize) -> Result<ImportRow, ServiceError> {
        let reject = |reason: &str| ServiceError::ImportRow {
            line,
            reason: reason.to_string(),
        };

        let external_id = text(&self.property_id)
            .filter(|id| id.chars().all(|c| c.is_ascii_digit()))
            .and_then(|id| id.parse::<i64>().ok())
            .ok_or_else(|| reject("missing or invalid property id"))?;

        let (check_in, check_out) = match (date(&self.check_in), date(&self.check_out)) {
            (Some(check_in), Some(check_out)) => (check_in, check_out),
            _ => return Err(reject("invalid check-in/check-out date")),
        };

        let (neighborhood, city) = match (text(&self.neighborhood), text(&self.city)) {
            (Some(neighborhood), Some(city)) => (neighborhood, city),
            _ => split_location(&self.location)
                .ok_or_else(|| reject("missing city or neighborhood"))?,
        };

        let total_price = self.total_price.as_deref().and_then(clean_decimal);
        let nights = (check_out - check_in).num_days();
        let price_per_night = self
            .price_per_night
            .as_deref()
            .and_then(clean_decimal)
            .or_else(|| match &total_price {
                Some(total) if nights > 0 => Some((total / BigDecimal::from(nights)).round(2)),
                _ => None,
            });

        let rating = self
            .rating
            .as_deref()
            .and_then(clean_decimal)
            .filter(|r| *r >= BigDecimal::from(0) && *r <= BigDecimal::from(10));

        Ok(ImportRow {
            line,
            external_id,
            title: text(&self.title),
            accommodation_type: text(&self.accommodation_type).unwrap_or_default(),
            city,
            state: text(&self.state).unwrap_or_default(),
            neighborhood,
            check_in,
            check_out,
            guests: self
                .guests
                .as_deref()
                .and_then(clean_integer)
                .filter(|g| *g > 0)
                .unwrap_or(1),
            total_price,
            price_per_night,
            rooms: non_negative(self.rooms.as_deref().and_then(clean_integer)),
            beds: non_negative(self.beds.as_deref().and_then(clean_integer)),
            bathrooms: non_negative(self.bathrooms.as_deref().and_then(clean_integer)),
            rating,
            review_count: non_negative(self.review_count.as_deref().and_then(clean_integer)),
            link: text(&self.link).unwrap_or_default(),
        })
    }
}

fn split_location(location: &Option<String>) -> Option<(String, String)> {
    let raw = text(location)?;
    let (neighborhood, city) = raw.split_once(',')?;
    let (neighborhood, city) = (neighborhood.trim(), city.trim());
    if neighborhood.is_empty() || city.is_empty() {
        return None;
    }
    Some((neighborhood.to_string(), city.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn raw() -> RawImportRow {
        RawImportRow {
            property_id: Some("12345".into()),
            title: Some("Casa na Lagoa".into()),
            accommodation_type: Some("Casa inteira".into()),
            city: Some("Florianópolis".into()),
            state: Some("SC".into()),
            neighborhood: Some("Lagoa da Conceição".into()),
            check_in: Some("10/01/2030".into()),
            check_out: Some("13/01/2030".into()),
            guests: Some("4 hóspedes".into()),
            total_price: Some("R$ 1.234,56".into()),
            rooms: Some("2".into()),
            rating: Some("4,9".into()),
            link: Some("https://example.com/rooms/12345".into()),
            ..RawImportRow::default()
        }
    }

    #[test]
    fn clean_row_parses_scraped_values() {
        let row = raw().clean(1).unwrap();
        assert_eq!(row.external_id, 12345);
        assert_eq!(row.guests, 4);
        assert_eq!(row.total_price, BigDecimal::from_str("1234.56").ok());
        assert_eq!(row.price_per_night, BigDecimal::from_str("411.52").ok());
        assert_eq!(row.rating, BigDecimal::from_str("4.9").ok());
        assert_eq!(row.rooms, Some(2));
        assert_eq!(row.beds, None);
    }

    #[test]
    fn malformed_dates_reject_the_row() {
        let row = RawImportRow { check_in: Some("2030-01-10".into()), ..raw() };
        assert!(matches!(row.clean(3), Err(ServiceError::ImportRow { line: 3, .. })));
    }

    #[test]
    fn non_numeric_ids_reject_the_row() {
        for id in [None, Some("".to_string()), Some("12a".to_string())] {
            let row = RawImportRow { property_id: id, ..raw() };
            assert!(row.clean(1).is_err());
        }
    }

    #[test]
    fn location_column_fills_missing_city_and_neighborhood() {
        let row = RawImportRow {
            city: None,
            neighborhood: None,
            location: Some("Centro, Gramado".into()),
            ..raw()
        };
        let row = row.clean(1).unwrap();
        assert_eq!((row.neighborhood.as_str(), row.city.as_str()), ("Centro", "Gramado"));
    }

    #[test]
    fn unparseable_optionals_default_to_none() {
        let row = RawImportRow {
            guests: Some("muitos".into()),
            total_price: Some("consultar".into()),
            rating: Some("Novo".into()),
            ..raw()
        };
        let row = row.clean(1).unwrap();
        assert_eq!(row.guests, 1);
        assert_eq!(row.total_price, None);
        assert_eq!(row.price_per_night, None);
        assert_eq!(row.rating, None);
    }
}

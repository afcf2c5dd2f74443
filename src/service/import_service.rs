use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::Serialize;

use crate::{
    db::store::ImportSink,
    dtos::importdtos::{ImportRow, RawImportRow},
    service::error::ServiceError,
};

pub const IMPORT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub rows: usize,
    pub inserted: u64,
    pub skipped: usize,
    /// One line per skipped row.
    pub errors: Vec<String>,
}

/// Parse every CSV record into a clean row. Bad rows are logged and
/// recorded in the report, never fatal.
pub fn parse_rows<R: Read>(reader: R, report: &mut ImportReport) -> Vec<ImportRow> {
    let mut csv = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, record) in csv.deserialize::<RawImportRow>().enumerate() {
        // header is line 1
        let line = index + 2;
        report.rows += 1;

        let cleaned = record
            .map_err(|e| ServiceError::ImportRow { line, reason: e.to_string() })
            .and_then(|raw| raw.clean(line));

        match cleaned {
            Ok(row) => rows.push(row),
            Err(e) => {
                tracing::warn!("{}", e);
                report.skipped += 1;
                report.errors.push(e.to_string());
            }
        }
    }
    rows
}

/// Load a scraped bookings CSV. Without a sink the file is only validated.
pub async fn import_csv(
    path: impl AsRef<Path>,
    sink: Option<&dyn ImportSink>,
) -> Result<ImportReport, ServiceError> {
    let path = path.as_ref();
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ServiceError::Other(format!("cannot open {}: {}", path.display(), e)))?
        .into_std()
        .await;
    import_from_reader(file, sink).await
}

/// Parsing runs on the blocking pool; batches are then written in order.
pub async fn import_from_reader<R: Read + Send + 'static>(
    reader: R,
    sink: Option<&dyn ImportSink>,
) -> Result<ImportReport, ServiceError> {
    let (rows, mut report) = tokio::task::spawn_blocking(move || {
        let mut report = ImportReport::default();
        let rows = parse_rows(reader, &mut report);
        (rows, report)
    })
    .await
    .map_err(|e| ServiceError::Other(format!("CSV parser task failed: {}", e)))?;

    match sink {
        Some(sink) => write_batches(&rows, sink, IMPORT_BATCH_SIZE, &mut report).await?,
        None => tracing::info!("no database configured; {} rows validated only", rows.len()),
    }

    tracing::info!(
        "Import finished: {} rows read, {} inserted, {} skipped",
        report.rows,
        report.inserted,
        report.skipped
    );
    Ok(report)
}

/// Each batch is atomic. A failed batch stops the import; the error carries
/// how many rows the earlier batches committed.
async fn write_batches(
    rows: &[ImportRow],
    sink: &dyn ImportSink,
    batch_size: usize,
    report: &mut ImportReport,
) -> Result<(), ServiceError> {
    for (n, batch) in rows.chunks(batch_size).enumerate() {
        match sink.import_batch(batch).await {
            Ok(written) => {
                report.inserted += written;
                tracing::debug!("import batch {} written ({} rows)", n + 1, batch.len());
            }
            Err(e) => {
                tracing::error!(
                    "import batch {} failed after {} committed rows: {}",
                    n + 1,
                    report.inserted,
                    e
                );
                return Err(ServiceError::ImportInterrupted {
                    inserted: report.inserted,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::store::BookingStore;

    const CSV: &str = "\
ID Imóvel,Título,Tipo de Acomodação,Cidade,Estado,Bairro,Data de Check-in,Data de Check-out,Número de Hóspedes,Preço total,Quartos,Camas,Banheiros,Avaliação,Quantidade de Avaliações,Link
123,Casa na Lagoa,Casa inteira,Florianópolis,SC,Lagoa,10/01/2030,13/01/2030,4 hóspedes,\"R$ 1.200,00\",2,3,1,\"4,9\",37,https://example.com/rooms/123
123,Casa na Lagoa,Casa inteira,Florianópolis,SC,Lagoa,2030-01-20,23/01/2030,4,\"R$ 900,00\",2,3,1,,,https://example.com/rooms/123
abc,Quarto,Quarto inteiro,Gramado,RS,Centro,10/01/2030,12/01/2030,2,\"R$ 400,00\",1,1,1,,,
456,,Loft,Gramado,RS,Centro,10/01/2030,12/01/2030,,\"R$ 400,00\",1,1,1,,,
";

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let mut report = ImportReport::default();
        let rows = parse_rows(CSV.as_bytes(), &mut report);

        assert_eq!(report.rows, 4);
        assert_eq!(rows.len(), 2);
        assert_eq!(report.skipped, 2);
        assert!(report.errors[0].contains("row 3"));
        assert!(report.errors[1].contains("row 4"));

        let first = &rows[0];
        assert_eq!(first.external_id, 123);
        assert_eq!(first.guests, 4);
        assert_eq!(first.price_per_night, BigDecimal::from_str("400").ok());

        // Missing guests default to one.
        assert_eq!(rows[1].guests, 1);
        assert_eq!(rows[1].title, None);
    }

    #[tokio::test]
    async fn rows_land_in_the_store() {
        let store = MemoryStore::new();
        let report = import_from_reader(CSV.as_bytes(), Some(&store)).await.unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(store.booking_count().await, 2);

        let cities = store.list_cities().await.unwrap();
        let names: Vec<&str> = cities.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Florianópolis", "Gramado"]);
    }

    #[tokio::test]
    async fn failing_batch_reports_committed_rows() {
        // The second stay checks out before it checks in.
        let csv = "\
ID Imóvel,Cidade,Estado,Bairro,Data de Check-in,Data de Check-out
1,Canela,RS,Centro,10/01/2030,13/01/2030
2,Canela,RS,Centro,10/01/2030,08/01/2030
3,Canela,RS,Centro,10/01/2030,12/01/2030
";
        let mut report = ImportReport::default();
        let rows = parse_rows(csv.as_bytes(), &mut report);
        assert_eq!(rows.len(), 3);

        let store = MemoryStore::new();
        let result = write_batches(&rows, &store, 1, &mut report).await;
        assert!(matches!(
            result,
            Err(ServiceError::ImportInterrupted { inserted: 1, .. })
        ));
        assert_eq!(report.inserted, 1);
        assert_eq!(store.booking_count().await, 1);
    }

    #[tokio::test]
    async fn csv_files_are_read_from_disk() {
        let path = std::env::temp_dir().join(format!("stay-import-{}.csv", std::process::id()));
        std::fs::write(&path, CSV).unwrap();
        let report = import_csv(&path, None).await;
        std::fs::remove_file(&path).unwrap();

        let report = report.unwrap();
        assert_eq!(report.rows, 4);
        assert_eq!(report.skipped, 2);

        let missing = import_csv(std::env::temp_dir().join("stay-import-missing.csv"), None).await;
        assert!(matches!(missing, Err(ServiceError::Other(_))));
    }

    #[tokio::test]
    async fn without_a_sink_nothing_is_written() {
        let report = import_from_reader(CSV.as_bytes(), None).await.unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.skipped, 2);
    }
}

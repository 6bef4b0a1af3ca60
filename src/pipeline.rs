//! End-to-end conversion: index build followed by the batched write

use crate::config::ConversionConfig;
use crate::dataset::GridDataset;
use crate::error::Result;
use crate::index::{build_indexes, GeoIndexer, H3Indexer, LevelOutcome};
use crate::output::{write_batched_with_progress, BatchProgress, Destination, WriteSummary};
use tracing::info;

/// What a conversion produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    /// Per-level outcome of the index build
    pub levels: Vec<LevelOutcome>,
    /// Outcome of the write
    pub summary: WriteSummary,
}

/// Convert `dataset` as described by `config`, indexing with H3
pub async fn convert(dataset: GridDataset, config: &ConversionConfig) -> Result<ConversionReport> {
    convert_with(dataset, config, &H3Indexer::new(), |_| {}).await
}

/// Convert with a caller-supplied indexer and progress callback
///
/// Configuration and the destination string are checked before any index
/// is computed; nothing is written if the index build fails. `dataset` is
/// moved through the index build, so only one copy of the grid is resident.
pub async fn convert_with<F>(
    dataset: GridDataset,
    config: &ConversionConfig,
    indexer: &dyn GeoIndexer,
    on_batch: F,
) -> Result<ConversionReport>
where
    F: FnMut(&BatchProgress),
{
    config.validate()?;
    let destination = Destination::parse(&config.destination)?;

    let build = build_indexes(dataset, &config.index, indexer)?;
    let computed: Vec<&str> = build.computed().collect();
    info!("Computed {} index fields: {:?}", computed.len(), computed);

    let options = config.write_options();
    let summary = write_batched_with_progress(&build.dataset, &destination, &options, on_batch).await?;

    info!(
        "Wrote {} rows in {} batches to {}",
        summary.rows, summary.batches, summary.destination
    );

    Ok(ConversionReport {
        levels: build.levels,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexFormat, IndexOptions};
    use arrow::array::{Array, StringArray, UInt64Array};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use pretty_assertions::assert_eq;

    fn grid() -> GridDataset {
        GridDataset::new()
            .with_coord("time", vec![0i64, 1, 2])
            .unwrap()
            .with_coord("lat", vec![45.0, 45.25])
            .unwrap()
            .with_coord("lon", vec![359.5, 359.75])
            .unwrap()
            .with_var(
                "t2m",
                ["time", "lat", "lon"],
                ndarray::ArrayD::<f32>::zeros(ndarray::IxDyn(&[3, 2, 2])),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_convert_local() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        let config = ConversionConfig::new(path.to_string_lossy())
            .with_index(IndexOptions::new([0, 2]));

        let report = convert(grid(), &config).await.unwrap();

        assert_eq!(report.levels.len(), 2);
        assert!(report.levels.iter().all(|l| l.computed));
        assert_eq!(report.summary.rows, 12);
        assert_eq!(report.summary.batches, 1);

        let file = std::fs::File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file).unwrap().build().unwrap();
        let batches: Vec<_> = reader.collect::<std::result::Result<_, _>>().unwrap();
        let schema = batches[0].schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["time", "lat", "lon", "t2m", "h3_00", "h3_02"]);

        let ids = batches[0]
            .column_by_name("h3_02")
            .unwrap()
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(ids.len(), 12);
        assert!(ids.values().iter().all(|id| *id != 0));
    }

    #[tokio::test]
    async fn test_convert_str_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("str.parquet");
        let config = ConversionConfig::new(path.to_string_lossy())
            .with_index(IndexOptions::new([1]).with_format(IndexFormat::Str));

        convert(grid(), &config).await.unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file).unwrap().build().unwrap();
        let batch = reader.next().unwrap().unwrap();
        let tokens = batch
            .column_by_name("h3_01")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert!(tokens
            .iter()
            .flatten()
            .all(|t| t.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())));
    }

    #[tokio::test]
    async fn test_convert_invalid_config_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.parquet");
        let config = ConversionConfig::new(path.to_string_lossy())
            .with_index(IndexOptions::new([16]));

        assert!(convert(grid(), &config).await.unwrap_err().is_config());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_convert_missing_axis_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.parquet");
        let config = ConversionConfig::new(path.to_string_lossy())
            .with_index(IndexOptions::new([0]).with_axes("longitude", "latitude"));

        assert!(convert(grid(), &config).await.unwrap_err().is_shape());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_convert_progress() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ConversionConfig::new(dir.path().join("p.parquet").to_string_lossy());
        config.output.batch_size = 2;

        let mut counters = Vec::new();
        convert_with(grid(), &config, &H3Indexer::new(), |p| counters.push(p.batch))
            .await
            .unwrap();
        assert_eq!(counters, vec![1, 2]);
    }
}

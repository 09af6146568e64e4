//! Columnar export (Arrow/Parquet)
//!
//! Schema:
//!
//! | column          | type    | nullable | content                        |
//! |-----------------|---------|----------|--------------------------------|
//! | `benchmark`     | Utf8    | no       |                                |
//! | `configuration` | Utf8    | no       |                                |
//! | `metric`        | Utf8    | no       |                                |
//! | `value`         | Float64 | yes      | null when unavailable          |
//! | `unavailable`   | Utf8    | yes      | reason code, null when present |

use super::{AggregatedDataset, DatasetRow};
use crate::{Error, MetricValue, Result, Unavailable};
use arrow::array::{Array, Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use std::path::Path;
use std::sync::Arc;

/// Arrow schema of an exported dataset.
#[must_use]
pub fn schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("benchmark", DataType::Utf8, false),
        Field::new("configuration", DataType::Utf8, false),
        Field::new("metric", DataType::Utf8, false),
        Field::new("value", DataType::Float64, true),
        Field::new("unavailable", DataType::Utf8, true),
    ]))
}

impl AggregatedDataset {
    /// Convert to a single Arrow record batch.
    ///
    /// # Errors
    ///
    /// Returns error if Arrow rejects the columns.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let benchmark = StringArray::from_iter_values(self.rows.iter().map(|r| r.benchmark.as_str()));
        let configuration =
            StringArray::from_iter_values(self.rows.iter().map(|r| r.configuration.as_str()));
        let metric = StringArray::from_iter_values(self.rows.iter().map(|r| r.metric.as_str()));
        let value: Float64Array = self.rows.iter().map(|r| r.value.value()).collect();
        let unavailable: StringArray = self
            .rows
            .iter()
            .map(|r| r.value.unavailable().map(Unavailable::code))
            .collect();

        Ok(RecordBatch::try_new(
            schema(),
            vec![
                Arc::new(benchmark),
                Arc::new(configuration),
                Arc::new(metric),
                Arc::new(value),
                Arc::new(unavailable),
            ],
        )?)
    }

    /// Rebuild a dataset from record batches with the export schema.
    ///
    /// # Errors
    ///
    /// Returns error if a column is missing, has the wrong type, or a row
    /// has neither a value nor a known reason code.
    pub fn from_record_batches(batches: &[RecordBatch]) -> Result<Self> {
        let mut rows = Vec::new();
        for batch in batches {
            let benchmark = string_column(batch, "benchmark")?;
            let configuration = string_column(batch, "configuration")?;
            let metric = string_column(batch, "metric")?;
            let unavailable = string_column(batch, "unavailable")?;
            let value = batch
                .column_by_name("value")
                .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
                .ok_or_else(|| Error::StorageError("missing Float64 column 'value'".to_string()))?;

            for i in 0..batch.num_rows() {
                let cell = if value.is_valid(i) {
                    MetricValue::Value(value.value(i))
                } else {
                    let code = if unavailable.is_valid(i) { unavailable.value(i) } else { "" };
                    let reason = Unavailable::from_code(code).ok_or_else(|| {
                        Error::StorageError(format!("row {i}: unknown unavailable reason '{code}'"))
                    })?;
                    MetricValue::Unavailable(reason)
                };

                rows.push(DatasetRow {
                    benchmark: benchmark.value(i).to_string(),
                    configuration: configuration.value(i).to_string(),
                    metric: metric.value(i).to_string(),
                    value: cell,
                });
            }
        }
        Ok(Self::from_rows(rows))
    }

    /// Write the dataset to a Parquet file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written.
    pub fn write_parquet<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use parquet::arrow::ArrowWriter;
        use std::fs::File;

        let batch = self.to_record_batch()?;
        let file = File::create(path.as_ref()).map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet file: {e}"))
        })?;

        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;

        tracing::debug!(path = %path.as_ref().display(), rows = self.len(), "wrote dataset");
        Ok(())
    }

    /// Load a dataset previously written with [`write_parquet`](Self::write_parquet).
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or does not have the export schema.
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
        use std::fs::File;

        let file = File::open(path.as_ref()).map_err(|e| {
            Error::StorageError(format!("Failed to open Parquet file: {e}"))
        })?;

        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut batches = Vec::new();
        for batch in reader {
            batches.push(batch?);
        }

        Self::from_record_batches(&batches)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::StorageError(format!("missing Utf8 column '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> AggregatedDataset {
        AggregatedDataset::from_rows(vec![
            DatasetRow {
                benchmark: "mcf".to_string(),
                configuration: "o3".to_string(),
                metric: "cpu_ipc".to_string(),
                value: MetricValue::Value(1.0),
            },
            DatasetRow {
                benchmark: "mcf".to_string(),
                configuration: "o3".to_string(),
                metric: "gpu_ipc".to_string(),
                value: MetricValue::Unavailable(Unavailable::NoMatches),
            },
        ])
    }

    #[test]
    fn test_record_batch_layout() {
        let batch = dataset().to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema(), schema());

        let value = batch.column(3).as_any().downcast_ref::<Float64Array>().unwrap();
        assert!(value.is_valid(0));
        assert!(value.is_null(1));

        let reason = batch.column(4).as_any().downcast_ref::<StringArray>().unwrap();
        assert!(reason.is_null(0));
        assert_eq!(reason.value(1), "no_matches");
    }

    #[test]
    fn test_record_batch_rebuild() {
        let ds = dataset();
        let batch = ds.to_record_batch().unwrap();
        let rebuilt = AggregatedDataset::from_record_batches(&[batch]).unwrap();
        assert_eq!(rebuilt, ds);
    }
}

//! Parquet table IO
//!
//! Dates are written as Date32. On read, date columns may be Date32, Date64,
//! Timestamp or ISO-8601 strings; rows with a null key are dropped.

use super::types::{tables, DataError};
use crate::cost::{DailyBar, NetReturn, PermnoAdvVol, PermnoWeight, PortfolioReturn};
use crate::quantile::DailyIc;
use crate::returns::{DailyReturn, ForwardReturn, SignalObservation};
use arrow::array::{Array, ArrayRef, Date32Array, Float64Array, Int64Array};
use arrow::compute::{cast, cast_with_options, CastOptions};
use arrow::datatypes::{DataType, Date32Type, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Column names accepted for the date of a row
const DATE_COLUMNS: &[&str] = &["date", "signal_date"];
/// Column names accepted for the signal date of a row
const SIGNAL_DATE_COLUMNS: &[&str] = &["signal_date", "date"];

fn date_field(name: &str) -> Field {
    Field::new(name, DataType::Date32, false)
}

fn f64_field(name: &str, nullable: bool) -> Field {
    Field::new(name, DataType::Float64, nullable)
}

fn i64_field(name: &str) -> Field {
    Field::new(name, DataType::Int64, false)
}

fn date_array(dates: impl Iterator<Item = NaiveDate>) -> ArrayRef {
    Arc::new(Date32Array::from(
        dates.map(Date32Type::from_naive_date).collect::<Vec<_>>(),
    ))
}

fn f64_array(values: impl Iterator<Item = f64>) -> ArrayRef {
    Arc::new(Float64Array::from(values.collect::<Vec<_>>()))
}

fn opt_f64_array(values: impl Iterator<Item = Option<f64>>) -> ArrayRef {
    Arc::new(Float64Array::from(values.collect::<Vec<_>>()))
}

fn i64_array(values: impl Iterator<Item = i64>) -> ArrayRef {
    Arc::new(Int64Array::from(values.collect::<Vec<_>>()))
}

/// Writes analytics tables as `<output_dir>/<table>.parquet`
pub struct ParquetWriter {
    output_dir: PathBuf,
}

impl ParquetWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Ensure output directory exists
    pub fn ensure_dir(&self) -> Result<(), DataError> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Path of a table file
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!("{}.parquet", table))
    }

    fn write_table(
        &self,
        table: &str,
        fields: Vec<Field>,
        columns: Vec<ArrayRef>,
    ) -> Result<PathBuf, DataError> {
        self.ensure_dir()?;
        let path = self.table_path(table);
        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema.clone(), columns)?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let file = File::create(&path)?;
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        tracing::debug!(path = ?path, rows = batch.num_rows(), "Wrote table to Parquet");
        Ok(path)
    }

    pub fn write_signals(&self, rows: &[SignalObservation]) -> Result<PathBuf, DataError> {
        self.write_table(
            tables::DAILY_SIGNALS,
            vec![
                date_field("signal_date"),
                i64_field("permno"),
                f64_field("signal_value", false),
            ],
            vec![
                date_array(rows.iter().map(|r| r.signal_date)),
                i64_array(rows.iter().map(|r| r.permno)),
                f64_array(rows.iter().map(|r| r.signal_value)),
            ],
        )
    }

    pub fn write_forward_returns(&self, rows: &[ForwardReturn]) -> Result<PathBuf, DataError> {
        self.write_table(
            tables::FORWARD_RETURNS,
            vec![
                date_field("signal_date"),
                i64_field("permno"),
                f64_field("forward_return", false),
            ],
            vec![
                date_array(rows.iter().map(|r| r.signal_date)),
                i64_array(rows.iter().map(|r| r.permno)),
                f64_array(rows.iter().map(|r| r.forward_return)),
            ],
        )
    }

    pub fn write_daily_returns(&self, rows: &[DailyReturn]) -> Result<PathBuf, DataError> {
        self.write_table(
            tables::DAILY_RETURNS,
            vec![date_field("date"), i64_field("permno"), f64_field("ret", false)],
            vec![
                date_array(rows.iter().map(|r| r.date)),
                i64_array(rows.iter().map(|r| r.permno)),
                f64_array(rows.iter().map(|r| r.ret)),
            ],
        )
    }

    pub fn write_weights(&self, rows: &[PermnoWeight]) -> Result<PathBuf, DataError> {
        self.write_table(
            tables::DAILY_WEIGHTS,
            vec![date_field("date"), i64_field("permno"), f64_field("weight", false)],
            vec![
                date_array(rows.iter().map(|r| r.date)),
                i64_array(rows.iter().map(|r| r.entity)),
                f64_array(rows.iter().map(|r| r.weight)),
            ],
        )
    }

    pub fn write_daily_bars(&self, rows: &[DailyBar]) -> Result<PathBuf, DataError> {
        self.write_table(
            tables::DAILY_BARS,
            vec![
                date_field("date"),
                i64_field("permno"),
                f64_field("price", true),
                f64_field("volume", true),
                f64_field("ret", true),
            ],
            vec![
                date_array(rows.iter().map(|r| r.date)),
                i64_array(rows.iter().map(|r| r.permno)),
                opt_f64_array(rows.iter().map(|r| r.price)),
                opt_f64_array(rows.iter().map(|r| r.volume)),
                opt_f64_array(rows.iter().map(|r| r.ret)),
            ],
        )
    }

    pub fn write_adv_volatility(&self, rows: &[PermnoAdvVol]) -> Result<PathBuf, DataError> {
        self.write_table(
            tables::ADV_VOLATILITY,
            vec![
                date_field("date"),
                i64_field("permno"),
                f64_field("adv_usd", true),
                f64_field("volatility", true),
            ],
            vec![
                date_array(rows.iter().map(|r| r.date)),
                i64_array(rows.iter().map(|r| r.entity)),
                opt_f64_array(rows.iter().map(|r| r.adv_usd)),
                opt_f64_array(rows.iter().map(|r| r.volatility)),
            ],
        )
    }

    pub fn write_portfolio_returns(&self, rows: &[PortfolioReturn]) -> Result<PathBuf, DataError> {
        self.write_table(
            tables::DAILY_PORTFOLIO_RETURNS,
            vec![date_field("date"), f64_field("gross_return", false)],
            vec![
                date_array(rows.iter().map(|r| r.date)),
                f64_array(rows.iter().map(|r| r.gross_return)),
            ],
        )
    }

    pub fn write_net_returns(&self, rows: &[NetReturn]) -> Result<PathBuf, DataError> {
        self.write_table(
            tables::NET_PORTFOLIO_RETURNS,
            vec![
                date_field("date"),
                f64_field("gross_return", false),
                f64_field("cost_drag", false),
                f64_field("net_return", false),
            ],
            vec![
                date_array(rows.iter().map(|r| r.date)),
                f64_array(rows.iter().map(|r| r.gross_return)),
                f64_array(rows.iter().map(|r| r.cost_drag)),
                f64_array(rows.iter().map(|r| r.net_return)),
            ],
        )
    }

    pub fn write_daily_ic(&self, rows: &[DailyIc]) -> Result<PathBuf, DataError> {
        self.write_table(
            tables::DAILY_IC,
            vec![date_field("date"), f64_field("rank_ic", false), i64_field("n_obs")],
            vec![
                date_array(rows.iter().map(|r| r.date)),
                f64_array(rows.iter().map(|r| r.rank_ic)),
                i64_array(rows.iter().map(|r| r.n_obs as i64)),
            ],
        )
    }
}

/// Find the first of `candidates` present in the batch
fn column<'a>(batch: &'a RecordBatch, candidates: &[&str]) -> Result<(&'a str, &'a ArrayRef), DataError> {
    let schema = batch.schema_ref();
    for name in candidates {
        if let Ok(idx) = schema.index_of(name) {
            return Ok((schema.field(idx).name().as_str(), batch.column(idx)));
        }
    }
    Err(DataError::MissingColumn {
        column: candidates.first().copied().unwrap_or_default().to_string(),
        candidates: candidates.join(", "),
    })
}

/// Date column values; nulls map to `None`
fn date_values(batch: &RecordBatch, candidates: &[&str]) -> Result<Vec<Option<NaiveDate>>, DataError> {
    let (name, array) = column(batch, candidates)?;
    let coercion_error = |reason: String| DataError::DateCoercion {
        column: name.to_string(),
        data_type: array.data_type().to_string(),
        reason,
    };
    match array.data_type() {
        DataType::Date32
        | DataType::Date64
        | DataType::Timestamp(_, _)
        | DataType::Utf8
        | DataType::LargeUtf8 => {}
        other => return Err(coercion_error(format!("unsupported type {}", other))),
    }

    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    let dates = cast_with_options(array, &DataType::Date32, &options)
        .map_err(|e| coercion_error(e.to_string()))?;
    let dates = dates
        .as_any()
        .downcast_ref::<Date32Array>()
        .ok_or_else(|| coercion_error("cast did not produce Date32".to_string()))?;

    Ok((0..dates.len())
        .map(|i| {
            if dates.is_null(i) {
                None
            } else {
                dates.value_as_date(i)
            }
        })
        .collect())
}

fn is_numeric(data_type: &DataType) -> bool {
    data_type.is_integer() || data_type.is_floating()
}

/// Numeric column as f64; nulls map to `None`
fn f64_values(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>, DataError> {
    let (name, array) = column(batch, &[name])?;
    if !is_numeric(array.data_type()) {
        return Err(DataError::ColumnType {
            column: name.to_string(),
            data_type: array.data_type().to_string(),
            expected: "numeric",
        });
    }
    let values = cast(array, &DataType::Float64)?;
    let values = values
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| DataError::ColumnType {
            column: name.to_string(),
            data_type: array.data_type().to_string(),
            expected: "Float64",
        })?;
    Ok(values.iter().collect())
}

/// Integer column as i64; nulls map to `None`
fn i64_values(batch: &RecordBatch, name: &str) -> Result<Vec<Option<i64>>, DataError> {
    let (name, array) = column(batch, &[name])?;
    if !array.data_type().is_integer() {
        return Err(DataError::ColumnType {
            column: name.to_string(),
            data_type: array.data_type().to_string(),
            expected: "integer",
        });
    }
    let values = cast(array, &DataType::Int64)?;
    let values = values
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| DataError::ColumnType {
            column: name.to_string(),
            data_type: array.data_type().to_string(),
            expected: "Int64",
        })?;
    Ok(values.iter().collect())
}

/// Reader for analytics tables
pub struct ParquetReader {
    path: PathBuf,
}

impl ParquetReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn batches(&self) -> Result<Vec<RecordBatch>, DataError> {
        let file = File::open(&self.path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let batches = reader.collect::<Result<Vec<_>, _>>()?;
        Ok(batches)
    }

    /// Map each row with a non-null `(date, permno)` key; other rows are dropped
    fn read_keyed<T>(
        &self,
        date_columns: &[&str],
        value_columns: &[&str],
        build: impl Fn(NaiveDate, i64, &[Option<f64>]) -> T,
    ) -> Result<Vec<T>, DataError> {
        let mut rows = Vec::new();
        let mut dropped = 0usize;
        for batch in self.batches()? {
            let dates = date_values(&batch, date_columns)?;
            let permnos = i64_values(&batch, "permno")?;
            let values = value_columns
                .iter()
                .map(|c| f64_values(&batch, c))
                .collect::<Result<Vec<_>, _>>()?;

            let mut row_values = vec![None; value_columns.len()];
            for i in 0..batch.num_rows() {
                let (Some(date), Some(permno)) = (dates[i], permnos[i]) else {
                    dropped += 1;
                    continue;
                };
                for (slot, column) in row_values.iter_mut().zip(&values) {
                    *slot = column[i];
                }
                rows.push(build(date, permno, &row_values));
            }
        }
        if dropped > 0 {
            tracing::debug!(path = ?self.path, dropped, "Dropped rows with null keys");
        }
        Ok(rows)
    }

    /// Map each row with a non-null date; other rows are dropped
    fn read_dated<T>(
        &self,
        value_columns: &[&str],
        build: impl Fn(NaiveDate, &[Option<f64>]) -> T,
    ) -> Result<Vec<T>, DataError> {
        let mut rows = Vec::new();
        for batch in self.batches()? {
            let dates = date_values(&batch, DATE_COLUMNS)?;
            let values = value_columns
                .iter()
                .map(|c| f64_values(&batch, c))
                .collect::<Result<Vec<_>, _>>()?;

            let mut row_values = vec![None; value_columns.len()];
            for (i, date) in dates.into_iter().enumerate() {
                let Some(date) = date else { continue };
                for (slot, column) in row_values.iter_mut().zip(&values) {
                    *slot = column[i];
                }
                rows.push(build(date, &row_values));
            }
        }
        Ok(rows)
    }

    pub fn read_signals(&self) -> Result<Vec<SignalObservation>, DataError> {
        self.read_keyed(SIGNAL_DATE_COLUMNS, &["signal_value"], |date, permno, v| {
            SignalObservation {
                signal_date: date,
                permno,
                signal_value: v[0].unwrap_or(f64::NAN),
            }
        })
    }

    pub fn read_forward_returns(&self) -> Result<Vec<ForwardReturn>, DataError> {
        self.read_keyed(SIGNAL_DATE_COLUMNS, &["forward_return"], |date, permno, v| {
            ForwardReturn {
                signal_date: date,
                permno,
                forward_return: v[0].unwrap_or(f64::NAN),
            }
        })
    }

    pub fn read_daily_returns(&self) -> Result<Vec<DailyReturn>, DataError> {
        self.read_keyed(DATE_COLUMNS, &["ret"], |date, permno, v| DailyReturn {
            permno,
            date,
            ret: v[0].unwrap_or(f64::NAN),
        })
    }

    pub fn read_weights(&self) -> Result<Vec<PermnoWeight>, DataError> {
        self.read_keyed(DATE_COLUMNS, &["weight"], |date, permno, v| PermnoWeight {
            date,
            entity: permno,
            weight: v[0].unwrap_or(f64::NAN),
        })
    }

    pub fn read_daily_bars(&self) -> Result<Vec<DailyBar>, DataError> {
        self.read_keyed(DATE_COLUMNS, &["price", "volume", "ret"], |date, permno, v| {
            DailyBar {
                permno,
                date,
                price: v[0],
                volume: v[1],
                ret: v[2],
            }
        })
    }

    pub fn read_adv_volatility(&self) -> Result<Vec<PermnoAdvVol>, DataError> {
        self.read_keyed(DATE_COLUMNS, &["adv_usd", "volatility"], |date, permno, v| {
            PermnoAdvVol {
                entity: permno,
                date,
                adv_usd: v[0],
                volatility: v[1],
            }
        })
    }

    pub fn read_portfolio_returns(&self) -> Result<Vec<PortfolioReturn>, DataError> {
        self.read_dated(&["gross_return"], |date, v| PortfolioReturn {
            date,
            gross_return: v[0].unwrap_or(f64::NAN),
        })
    }

    pub fn read_net_returns(&self) -> Result<Vec<NetReturn>, DataError> {
        self.read_dated(&["gross_return", "cost_drag", "net_return"], |date, v| NetReturn {
            date,
            gross_return: v[0].unwrap_or(f64::NAN),
            cost_drag: v[1].unwrap_or(0.0),
            net_return: v[2].unwrap_or(f64::NAN),
        })
    }

    pub fn read_daily_ic(&self) -> Result<Vec<DailyIc>, DataError> {
        self.read_dated(&["rank_ic", "n_obs"], |date, v| DailyIc {
            date,
            rank_ic: v[0].unwrap_or(f64::NAN),
            n_obs: v[1].map_or(0, |n| n as usize),
        })
    }
}

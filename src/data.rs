use crate::error::{ExplorerError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Metadata lines between the header row and the first patient row.
pub const METADATA_ROWS: usize = 4;

/// Cell texts read as missing, besides empty cells. Same set pandas treats as NaN.
pub const MISSING_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// An immutable snapshot of the clinical table, shared by every section.
#[derive(Clone)]
pub struct LoadedTable {
    pub path: PathBuf,
    pub df: DataFrame,
    pub rows_read: usize,
    pub rows_dropped: usize,
}

pub fn load_clinical_table<P: AsRef<Path>>(
    file_path: P,
    infer_schema_length: usize,
) -> Result<LoadedTable> {
    let path = file_path.as_ref().to_path_buf();
    tracing::info!(path = %path.display(), "loading clinical table");

    let raw = CsvReader::new(File::open(&path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_skip_rows_after_header(METADATA_ROWS)
                .with_infer_schema_length(Some(infer_schema_length))
                .map_parse_options(|opts| {
                    opts.with_separator(b'\t')
                        .with_null_values(Some(NullValues::AllColumns(
                            MISSING_MARKERS.iter().map(|m| (*m).into()).collect(),
                        )))
                }),
        )
        .finish()?;

    let rows_read = raw.height();
    let df = drop_incomplete_rows(&raw)?;
    let rows_dropped = rows_read - df.height();

    tracing::info!(
        rows = df.height(),
        columns = df.width(),
        dropped = rows_dropped,
        "clinical table ready"
    );

    if df.height() == 0 {
        return Err(ExplorerError::EmptyTable);
    }

    Ok(LoadedTable {
        path,
        df,
        rows_read,
        rows_dropped,
    })
}

/// Removes every row holding a missing value in any column.
pub fn drop_incomplete_rows(df: &DataFrame) -> Result<DataFrame> {
    Ok(df.drop_nulls::<String>(None)?)
}

pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric(c.dtype()))
        .map(|c| c.name().to_string())
        .collect()
}

fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| ExplorerError::MissingColumn(name.to_string()))
}

pub fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let s = series(df, name)?;
    if !is_numeric(s.dtype()) {
        return Err(ExplorerError::NonNumeric(name.to_string()));
    }
    let cast = s.cast(&DataType::Float64)?;
    cast.f64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| ExplorerError::NonNumeric(name.to_string())))
        .collect()
}

/// Any column rendered as category labels, one per row.
pub fn column_as_labels(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let s = series(df, name)?;
    let cast = s.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

/// Distinct values in order of first appearance.
pub fn unique_in_order(values: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .iter()
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect()
}

pub fn cell_text(df: &DataFrame, column: &str, row: usize) -> String {
    match df.column(column).and_then(|c| c.get(row)) {
        Ok(AnyValue::String(s)) => s.to_string(),
        Ok(AnyValue::StringOwned(s)) => s.to_string(),
        Ok(AnyValue::Null) => "—".to_string(),
        Ok(v) => v.to_string(),
        Err(_) => "—".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "Age at Diagnosis" => &[Some(45.0), None, Some(61.5)],
            "Cellularity" => &[Some("High"), Some("Low"), None],
            "Cohort" => &[Some(1i64), Some(2), Some(1)],
        )
        .unwrap()
    }

    #[test]
    fn drops_rows_with_any_missing_cell() {
        let df = drop_incomplete_rows(&sample()).unwrap();
        assert_eq!(df.height(), 1);
        for col in df.get_columns() {
            assert_eq!(col.null_count(), 0);
        }
    }

    #[test]
    fn numeric_columns_and_values() {
        let df = drop_incomplete_rows(&sample()).unwrap();
        assert_eq!(
            numeric_column_names(&df),
            vec!["Age at Diagnosis".to_string(), "Cohort".to_string()]
        );
        assert_eq!(column_as_f64(&df, "Cohort").unwrap(), vec![1.0]);
        assert_eq!(column_as_labels(&df, "Cellularity").unwrap(), vec!["High"]);
    }

    #[test]
    fn non_numeric_and_missing_columns_fail() {
        let df = sample();
        assert!(matches!(
            column_as_f64(&df, "Cellularity"),
            Err(ExplorerError::NonNumeric(_))
        ));
        assert!(matches!(
            column_as_f64(&df, "Sex"),
            Err(ExplorerError::MissingColumn(_))
        ));
    }

    #[test]
    fn loader_treats_common_markers_as_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut text = String::from("#Patient Identifier\tAge at Diagnosis\tCellularity\n");
        for _ in 0..METADATA_ROWS {
            text.push_str("#meta\t#meta\t#meta\n");
        }
        text.push_str("MB-0001\t45.1\tHigh\n");
        text.push_str("MB-0002\tN/A\tLow\n");
        text.push_str("MB-0003\t61.0\tnull\n");
        text.push_str("MB-0004\t#N/A\tModerate\n");
        text.push_str("MB-0005\t70.2\tLow\n");
        std::io::Write::write_all(&mut file, text.as_bytes()).unwrap();

        let table = load_clinical_table(file.path(), 100).unwrap();
        assert_eq!(table.rows_read, 5);
        assert_eq!(table.rows_dropped, 3);
        assert_eq!(column_as_f64(&table.df, "Age at Diagnosis").unwrap(), vec![45.1, 70.2]);
    }

    #[test]
    fn unique_keeps_first_appearance() {
        let labels: Vec<String> = ["LumA", "Basal", "LumA", "Her2", "Basal"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(unique_in_order(&labels), vec!["LumA", "Basal", "Her2"]);
    }
}

//! # 表格读取
//!
//! 将电子表格（xls/xlsx/xlsm/xlsb/ods）或 CSV 文件读成 `Table`。
//! 第一行作为表头，其余各行按位置转换为 JSON 值：
//!
//! - 空单元格与错误单元格为 `null`；
//! - 整数值的浮点数转为整数，其余浮点数保持原样；
//! - Excel 日期时间转为 Unix 纪元毫秒数；
//! - 空表头命名为 `Unnamed: {列号}`（仅含空白的表头保持原样），重复表头依次加上 `.1`、`.2` 后缀。

use std::{collections::HashSet, path::Path};

use calamine::{Data, Reader, open_workbook_auto};
use serde_json::{Number, Value};

use crate::types::{CleanError, Table, TableFormat};

/// Excel 序列日期 25569 对应 1970-01-01。
const EXCEL_UNIX_EPOCH_DAYS: f64 = 25569.0;
const MS_PER_DAY: f64 = 86_400_000.0;

/// 读取一个表格文件，格式由扩展名决定。
///
/// # 参数
///
/// * `path` - 输入文件路径。
/// * `sheet` - 电子表格的工作表名，`None` 表示第一个工作表；对 CSV 无效。
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table, CleanError> {
    let format = TableFormat::from_path(path)?;
    log::debug!("以 {format} 格式读取 {path:?}");
    if format.is_spreadsheet() {
        read_spreadsheet(path, sheet)
    } else {
        read_csv(path)
    }
}

fn read_spreadsheet(path: &Path, sheet: Option<&str>) -> Result<Table, CleanError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names();

    let sheet_name = match sheet {
        Some(name) if sheet_names.iter().any(|s| s == name) => name.to_string(),
        Some(name) => {
            return Err(CleanError::SheetNotFound {
                sheet: name.to_string(),
                path: path.to_path_buf(),
            });
        }
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| CleanError::EmptyWorkbook(path.to_path_buf()))?,
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let Some(header) = rows.next() else {
        log::warn!("工作表 '{sheet_name}' 为空");
        return Ok(Table::default());
    };
    let mut table = Table::new(normalize_headers(header.iter().map(header_text)));

    for row in rows {
        table.push_row(row.iter().map(spreadsheet_cell_to_value).collect());
    }

    log::debug!(
        "工作表 '{sheet_name}' 共 {} 列 {} 行",
        table.columns.len(),
        table.rows.len()
    );
    Ok(table)
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.is_finite() => format!("{f:.0}"),
        other => other.to_string(),
    }
}

/// 将一个电子表格单元格转换为 JSON 值。
pub(crate) fn spreadsheet_cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => float_to_value(*f),
        Data::DateTime(dt) => {
            let days = if dt.is_duration() {
                dt.as_f64()
            } else {
                dt.as_f64() - EXCEL_UNIX_EPOCH_DAYS
            };
            float_to_value((days * MS_PER_DAY).round())
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_value(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

//=============================================================================
// CSV
//=============================================================================

/// CSV 列的推断类型。整列所有非空字段都能解析时才采用数值或布尔类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CsvColumnKind {
    Int,
    Float,
    Bool,
    Text,
}

fn read_csv(path: &Path) -> Result<Table, CleanError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = normalize_headers(reader.headers()?.iter().map(ToString::to_string));
    let width = headers.len();

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        raw_rows.push(record.iter().take(width).map(ToString::to_string).collect());
    }

    let kinds: Vec<CsvColumnKind> = (0..width)
        .map(|col| infer_csv_kind(raw_rows.iter().filter_map(|row| row.get(col))))
        .collect();

    let mut table = Table::new(headers);
    for raw in raw_rows {
        let row = raw
            .iter()
            .zip(&kinds)
            .map(|(field, kind)| csv_field_to_value(field, *kind))
            .collect();
        table.push_row(row);
    }

    log::debug!("CSV 文件共 {} 列 {} 行", table.columns.len(), table.rows.len());
    Ok(table)
}

fn parse_bool(field: &str) -> Option<bool> {
    match field {
        "True" | "TRUE" | "true" => Some(true),
        "False" | "FALSE" | "false" => Some(false),
        _ => None,
    }
}

fn infer_csv_kind<'a>(fields: impl Iterator<Item = &'a String>) -> CsvColumnKind {
    let mut kind: Option<CsvColumnKind> = None;
    for field in fields.filter(|f| !f.is_empty()) {
        let field_kind = if field.parse::<i64>().is_ok() {
            CsvColumnKind::Int
        } else if field.parse::<f64>().is_ok_and(f64::is_finite) {
            CsvColumnKind::Float
        } else if parse_bool(field).is_some() {
            CsvColumnKind::Bool
        } else {
            return CsvColumnKind::Text;
        };

        kind = Some(match (kind, field_kind) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(CsvColumnKind::Int | CsvColumnKind::Float), CsvColumnKind::Int | CsvColumnKind::Float) => {
                CsvColumnKind::Float
            }
            _ => return CsvColumnKind::Text,
        });
    }
    kind.unwrap_or(CsvColumnKind::Text)
}

fn csv_field_to_value(field: &str, kind: CsvColumnKind) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    match kind {
        CsvColumnKind::Int => field
            .parse::<i64>()
            .map_or_else(|_| Value::String(field.to_string()), Value::from),
        CsvColumnKind::Float => field
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or_else(|| Value::String(field.to_string()), Value::Number),
        CsvColumnKind::Bool => parse_bool(field).map_or(Value::Null, Value::Bool),
        CsvColumnKind::Text => Value::String(field.to_string()),
    }
}

//=============================================================================
// 表头
//=============================================================================

/// 规范化表头：空表头命名为 `Unnamed: {列号}`，重复的表头加上递增后缀。
pub(crate) fn normalize_headers(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::new();

    for (index, name) in raw.into_iter().enumerate() {
        let name = if name.is_empty() {
            format!("Unnamed: {index}")
        } else {
            name
        };

        let unique = if seen.contains(&name) {
            (1..)
                .map(|n| format!("{name}.{n}"))
                .find(|candidate| !seen.contains(candidate))
                .unwrap_or_default()
        } else {
            name
        };

        seen.insert(unique.clone());
        headers.push(unique);
    }

    headers
}

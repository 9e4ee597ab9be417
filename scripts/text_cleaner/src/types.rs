//! 定义了文本清洗批处理中使用的核心数据类型。

use std::{
    fmt, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Serialize, Serializer, ser::SerializeMap, ser::SerializeSeq};
use serde_json::Value;
use strum_macros::{Display, EnumString};
use thiserror::Error;

//=============================================================================
// 1. 错误枚举
//=============================================================================

/// 定义读取表格、清洗文本和写出结果过程中可能发生的各种错误。
#[derive(Error, Debug)]
pub enum CleanError {
    /// 文件读写等IO错误。
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),
    /// 电子表格解析错误，通常来自 `calamine` 库。
    #[error("读取电子表格失败: {0}")]
    Spreadsheet(#[from] calamine::Error),
    /// CSV 解析错误。
    #[error("读取 CSV 失败: {0}")]
    Csv(#[from] csv::Error),
    /// 读取压缩包（例如 `wordnet.zip`）失败。
    #[error("读取压缩包失败: {0}")]
    Archive(#[from] zip::result::ZipError),
    /// JSON 序列化错误。
    #[error("JSON 序列化失败: {0}")]
    Json(#[from] serde_json::Error),
    /// 工作簿中没有任何工作表。
    #[error("工作簿 {0:?} 中没有任何工作表")]
    EmptyWorkbook(PathBuf),
    /// 指定的工作表不存在。
    #[error("工作簿 {path:?} 中不存在工作表 '{sheet}'")]
    SheetNotFound { sheet: String, path: PathBuf },
    /// 无法根据扩展名识别的输入格式。
    #[error("不支持的输入格式: {0:?}")]
    UnsupportedFormat(PathBuf),
    /// 表格中缺少需要清洗的列。
    #[error("文件 {path:?} 中缺少列 '{column}'")]
    MissingColumn { column: String, path: PathBuf },
    /// 停用词表或词形还原词典的内容无效。
    #[error("无效的词典数据: {0}")]
    InvalidLexicon(String),
    /// 无法解析的批处理任务描述。
    #[error("无效的任务描述: {0}")]
    InvalidJob(String),
}

//=============================================================================
// 2. 输入格式
//=============================================================================

/// 枚举：表示支持的表格输入格式，按文件扩展名识别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum TableFormat {
    /// 旧版 Excel 二进制格式。
    Xls,
    /// Office Open XML 工作簿。
    Xlsx,
    /// 启用宏的 Office Open XML 工作簿。
    Xlsm,
    /// Excel 二进制工作簿。
    Xlsb,
    /// `OpenDocument` 电子表格。
    Ods,
    /// 逗号分隔值文本。
    Csv,
}

impl TableFormat {
    /// 根据路径的扩展名推断表格格式。
    pub fn from_path(path: &Path) -> Result<Self, CleanError> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse::<Self>().ok())
            .ok_or_else(|| CleanError::UnsupportedFormat(path.to_path_buf()))
    }

    /// 是否由电子表格读取器处理。
    pub const fn is_spreadsheet(self) -> bool {
        !matches!(self, Self::Csv)
    }
}

//=============================================================================
// 3. 表格
//=============================================================================

/// 读入内存的一张表：表头加按位置排列的单元格。
///
/// 每一行的长度都与 `columns` 相同，缺失的单元格以 `Value::Null` 补齐。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// 列名，保持文件中的顺序。
    pub columns: Vec<String>,
    /// 数据行。
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// 追加一行，长度不足时补 `Null`，多余的单元格会被丢弃。
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// 对指定列的每个单元格应用 `f`，并用返回的字符串替换原值。
    ///
    /// # 返回
    ///
    /// * `Some(n)` - 列存在，`n` 为处理的行数。
    /// * `None` - 列不存在。
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> Option<usize>
    where
        F: FnMut(&Value) -> String,
    {
        let index = self.column_index(name)?;
        for row in &mut self.rows {
            let cleaned = f(&row[index]);
            row[index] = Value::String(cleaned);
        }
        Some(self.rows.len())
    }

    /// 返回一个按行序列化的视图，每行是以列名为键的对象。
    pub const fn records(&self) -> Records<'_> {
        Records(self)
    }
}

/// `Table` 的面向行的序列化形式：`[{"列名": 值, ...}, ...]`。
pub struct Records<'a>(&'a Table);

struct RecordRow<'a> {
    columns: &'a [String],
    cells: &'a [Value],
}

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let table = self.0;
        let mut seq = serializer.serialize_seq(Some(table.rows.len()))?;
        for cells in &table.rows {
            seq.serialize_element(&RecordRow {
                columns: &table.columns,
                cells,
            })?;
        }
        seq.end()
    }
}

impl Serialize for RecordRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(self.cells) {
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}

//=============================================================================
// 4. 批处理配置
//=============================================================================

/// 一个批处理任务：一个输入表格对应一个输出 JSON 文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl BatchJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// 将模板中的 `{i}` 替换为序号，生成一个任务。
    pub fn from_templates(input_template: &str, output_template: &str, index: u32) -> Self {
        let index = index.to_string();
        Self::new(
            input_template.replace("{i}", &index),
            output_template.replace("{i}", &index),
        )
    }
}

impl FromStr for BatchJob {
    type Err = CleanError;

    /// 解析 `输入=输出` 形式的任务描述。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((input, output)) if !input.trim().is_empty() && !output.trim().is_empty() => {
                Ok(Self::new(input.trim(), output.trim()))
            }
            _ => Err(CleanError::InvalidJob(format!(
                "'{s}' 不是 `输入=输出` 的形式"
            ))),
        }
    }
}

impl fmt::Display for BatchJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.input.display(), self.output.display())
    }
}

/// 默认的输入文件名模板。
pub const DEFAULT_INPUT_TEMPLATE: &str = "dataset-{i}.xls";
/// 默认的输出文件名模板。
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "cleaned-dataset{i}.json";
/// 默认需要清洗的列。
pub const DEFAULT_COLUMNS: [&str; 2] = ["Abstract", "Article Title"];

/// 一次批处理运行的全部配置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// 按顺序处理的任务列表。
    pub jobs: Vec<BatchJob>,
    /// 需要清洗的列名。
    pub columns: Vec<String>,
    /// 读取的工作表名，`None` 表示第一个工作表。
    pub sheet: Option<String>,
    /// 是否在多个文件之间并行处理。
    pub parallel: bool,
}

impl Default for BatchOptions {
    /// `dataset-1.xls` 到 `dataset-5.xls`，清洗 `Abstract` 与 `Article Title` 两列。
    fn default() -> Self {
        Self {
            jobs: (1..=5)
                .map(|i| BatchJob::from_templates(DEFAULT_INPUT_TEMPLATE, DEFAULT_OUTPUT_TEMPLATE, i))
                .collect(),
            columns: DEFAULT_COLUMNS.iter().map(ToString::to_string).collect(),
            sheet: None,
            parallel: false,
        }
    }
}

/// 批处理结束后的统计信息。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// 成功写出的文件数。
    pub files_written: usize,
    /// 所有文件中处理过的数据行总数。
    pub rows_processed: usize,
}

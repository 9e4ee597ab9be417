//! 批处理驱动：逐个读取表格，清洗指定列，写出 JSON。
//!
//! 任何一个文件读取失败或缺少指定列都会立即终止整个批处理，
//! 已经写出的文件保留在磁盘上，不做回滚。

use std::path::Path;

use rayon::prelude::*;

use crate::normalizer::TextNormalizer;
use crate::table_reader::read_table;
use crate::table_writer::write_records_json;
use crate::types::{BatchJob, BatchOptions, BatchSummary, CleanError, Table};

/// 按配置执行全部任务。
///
/// 默认按任务顺序串行处理；`options.parallel` 为真时在 rayon 线程池中并行处理，
/// 此时进度输出可能交错，遇到的第一个错误会被返回。
pub fn run_batch(
    options: &BatchOptions,
    normalizer: &TextNormalizer<'_>,
) -> Result<BatchSummary, CleanError> {
    let run_job = |job: &BatchJob| {
        process_job(job, &options.columns, options.sheet.as_deref(), normalizer)
    };

    let row_counts: Vec<usize> = if options.parallel {
        log::info!("并行处理 {} 个文件", options.jobs.len());
        options.jobs.par_iter().map(run_job).collect::<Result<_, _>>()?
    } else {
        options.jobs.iter().map(run_job).collect::<Result<_, _>>()?
    };

    let summary = BatchSummary {
        files_written: row_counts.len(),
        rows_processed: row_counts.iter().sum(),
    };
    log::info!(
        "批处理完成，共写出 {} 个文件，处理 {} 行",
        summary.files_written,
        summary.rows_processed
    );
    Ok(summary)
}

/// 处理单个任务，返回处理的行数。
pub fn process_job(
    job: &BatchJob,
    columns: &[String],
    sheet: Option<&str>,
    normalizer: &TextNormalizer<'_>,
) -> Result<usize, CleanError> {
    println!("Processing {} ...", job.input.display());

    let mut table = read_table(&job.input, sheet)?;
    log::info!(
        "已读取 {:?}: {} 列 {} 行",
        job.input,
        table.columns.len(),
        table.rows.len()
    );

    clean_columns(&mut table, columns, normalizer, &job.input)?;
    write_records_json(&table, &job.output)?;

    println!("Cleaned data saved to {}\n", job.output.display());
    Ok(table.rows.len())
}

/// 依次清洗每个指定列。某一列不存在时返回 `MissingColumn`。
pub fn clean_columns(
    table: &mut Table,
    columns: &[String],
    normalizer: &TextNormalizer<'_>,
    source: &Path,
) -> Result<(), CleanError> {
    for column in columns {
        table
            .map_column(column, |value| normalizer.clean_value(value))
            .ok_or_else(|| CleanError::MissingColumn {
                column: column.clone(),
                path: source.to_path_buf(),
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::{Stopwords, WordNetLemmatizer};
    use serde_json::json;

    fn fixture_lemmatizer() -> WordNetLemmatizer {
        WordNetLemmatizer::parse("test\nmodel\nai\n", "").unwrap()
    }

    fn default_columns() -> Vec<String> {
        vec!["Abstract".to_string(), "Article Title".to_string()]
    }

    #[test]
    fn test_clean_columns_replaces_only_target_columns() {
        let stopwords = Stopwords::english();
        let lemmatizer = fixture_lemmatizer();
        let normalizer = TextNormalizer::new(&stopwords, &lemmatizer);

        let mut table = Table::new(vec![
            "Authors".to_string(),
            "Article Title".to_string(),
            "Abstract".to_string(),
        ]);
        table.push_row(vec![
            json!("Smith, J."),
            json!("AI Models"),
            json!("This is a Test."),
        ]);
        table.push_row(vec![json!("Doe, A."), json!(12345), serde_json::Value::Null]);

        clean_columns(&mut table, &default_columns(), &normalizer, Path::new("t.csv")).unwrap();

        assert_eq!(
            table.rows[0],
            vec![json!("Smith, J."), json!("ai model"), json!("test")]
        );
        assert_eq!(table.rows[1], vec![json!("Doe, A."), json!(""), json!("")]);
    }

    #[test]
    fn test_clean_columns_missing_column() {
        let stopwords = Stopwords::english();
        let lemmatizer = fixture_lemmatizer();
        let normalizer = TextNormalizer::new(&stopwords, &lemmatizer);

        let mut table = Table::new(vec!["Abstract".to_string(), "Title".to_string()]);
        table.push_row(vec![json!("text"), json!("title")]);

        let result = clean_columns(
            &mut table,
            &default_columns(),
            &normalizer,
            Path::new("dataset-3.xls"),
        );
        match result {
            Err(CleanError::MissingColumn { column, path }) => {
                assert_eq!(column, "Article Title");
                assert_eq!(path, Path::new("dataset-3.xls"));
            }
            other => panic!("期望 MissingColumn，实际为 {other:?}"),
        }
    }

    #[test]
    fn test_process_job_writes_records() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("dataset-1.csv");
        let output = dir.path().join("cleaned-dataset1.json");
        std::fs::write(
            &input,
            "Article Title,Abstract,Year\nAI Models,This is a Test.,2021\n",
        )
        .unwrap();

        let stopwords = Stopwords::english();
        let lemmatizer = fixture_lemmatizer();
        let normalizer = TextNormalizer::new(&stopwords, &lemmatizer);

        let rows = process_job(
            &BatchJob::new(&input, &output),
            &default_columns(),
            None,
            &normalizer,
        )
        .unwrap();
        assert_eq!(rows, 1);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(
            written,
            json!([{"Article Title": "ai model", "Abstract": "test", "Year": 2021}])
        );
    }

    #[test]
    fn test_process_job_missing_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("cleaned.json");

        let stopwords = Stopwords::english();
        let lemmatizer = fixture_lemmatizer();
        let normalizer = TextNormalizer::new(&stopwords, &lemmatizer);

        let result = process_job(
            &BatchJob::new(dir.path().join("missing.csv"), &output),
            &default_columns(),
            None,
            &normalizer,
        );
        assert!(result.is_err());
        assert!(!output.exists());
    }
}

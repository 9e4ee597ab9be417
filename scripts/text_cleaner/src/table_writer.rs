use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::types::{CleanError, Table};

/// 将表格以面向行的 JSON 数组写入文件，每行是一个以列名为键的对象。
pub fn write_records_json(table: &Table, path: &Path) -> Result<(), CleanError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &table.records())?;
    writer.flush()?;
    Ok(())
}

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;

/// `--out` 未指定時は `runs/selfplay/<timestamp>-selfplay.jsonl`
pub fn resolve_output_path(out: Option<&Path>, timestamp: &DateTime<Local>) -> PathBuf {
    if let Some(path) = out {
        return path.to_path_buf();
    }
    let dir = PathBuf::from("runs/selfplay");
    let name = format!("{}-selfplay.jsonl", timestamp.format("%Y%m%d-%H%M%S"));
    dir.join(name)
}

pub fn default_summary_path(jsonl: &Path) -> PathBuf {
    let parent = jsonl.parent().unwrap_or_else(|| Path::new("."));
    let stem = jsonl.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    parent.join(format!("{stem}.summary.jsonl"))
}

/// 1行1レコードの JSONL 書き出し
pub struct JsonlWriter {
    writer: BufWriter<File>,
    flush_each_record: bool,
}

impl JsonlWriter {
    /// 親ディレクトリを作成してからファイルを開く。
    pub fn create(path: &Path, flush_each_record: bool) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let file =
            File::create(path).with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
            flush_each_record,
        })
    }

    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        if self.flush_each_record {
            self.writer.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

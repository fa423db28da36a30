//! Structured outcome records appended as JSON lines

pub mod outcomes;
pub mod rejections;

pub use outcomes::*;
pub use rejections::*;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// `<output_dir>/<kind>/<kind>_<YYYY-MM-DD>.jsonl`
pub fn daily_file(output_dir: &str, kind: &str) -> PathBuf {
    Path::new(output_dir)
        .join(kind)
        .join(format!("{}_{}.jsonl", kind, Utc::now().format("%Y-%m-%d")))
}

fn append_json_line<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", serde_json::to_string(record)?)?;
    Ok(())
}

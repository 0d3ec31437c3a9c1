use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result, bail};

use super::game::SelfplayGame;

/// 開始局面群をファイル / 単一局面文字列 / 既定局面 からロードする。
///
/// 戻り値の2つ目は JSONL のメタ行に残す局面記述。
pub fn load_start_positions<S: SelfplayGame>(
    file: Option<&Path>,
    position: Option<&str>,
) -> Result<(Vec<S>, Vec<String>)> {
    match (file, position) {
        (Some(_), Some(_)) => {
            bail!("--startpos-file and --position cannot be used together");
        }
        (Some(path), None) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let reader = BufReader::new(file);
            let mut positions = Vec::new();
            let mut descriptions = Vec::new();
            for (idx, line) in reader.lines().enumerate() {
                let line = line?;
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                let state = S::parse_start(Some(trimmed)).with_context(|| {
                    format!("invalid {} position on line {}: {}", S::NAME, idx + 1, trimmed)
                })?;
                positions.push(state);
                descriptions.push(trimmed.to_string());
            }
            if positions.is_empty() {
                bail!("no usable positions found in {}", path.display());
            }
            Ok((positions, descriptions))
        }
        (None, Some(text)) => {
            let state = S::parse_start(Some(text))?;
            Ok((vec![state], vec![text.to_string()]))
        }
        (None, None) => Ok((vec![S::parse_start(None)?], vec!["default".to_string()])),
    }
}

/// `game_index` 局目の開始局面（順番に巡回）
pub fn pick_start<S>(positions: &[S], game_index: usize) -> Result<&S> {
    if positions.is_empty() {
        bail!("no start positions available");
    }
    Ok(&positions[game_index % positions.len()])
}

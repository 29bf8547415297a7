// Loads word vectors from a Numberbatch style text file:
//
// 516782 300            <- optional header: count and dimension
// /c/en/lake 0.01 -0.2 ...
// river 0.03 0.11 ...
//
// keys lose the /c/en/ prefix and are lowercased; the first vector of a word wins

use crate::game::embedding::EmbeddingStore;
use crate::game::GameError;
use anyhow::Result;
use std::fmt::Display;
use std::path::Path;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

const CONCEPT_PREFIX: &str = "/c/en/";
const PROGRESS_EVERY: usize = 10_000;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub existing: usize,
    pub malformed: usize,
}

impl Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "inserted: {}, existing: {}, malformed: {}",
            self.inserted, self.existing, self.malformed
        )
    }
}

fn is_header(line: &str) -> bool {
    let parts = line.split_whitespace().collect::<Vec<_>>();
    parts.len() == 2 && parts.iter().all(|p| p.parse::<usize>().is_ok())
}

pub fn parse_line(line: &str) -> Option<(String, Vec<f32>)> {
    let mut parts = line.split_whitespace();
    let key = parts.next()?;
    let word = key.strip_prefix(CONCEPT_PREFIX).unwrap_or(key).to_lowercase();
    let vector = parts
        .map(|p| p.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    if vector.is_empty() {
        return None;
    }
    Some((word, vector))
}

pub async fn import_file(path: &Path, store: &EmbeddingStore) -> Result<ImportSummary> {
    let start = Instant::now();
    let mut lines = BufReader::new(File::open(path).await?).lines();
    let mut summary = ImportSummary::default();
    let mut line_no = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line_no == 1 && is_header(line) {
            info!("header detected, skip: {}", line);
            continue;
        }

        let Some((word, vector)) = parse_line(line) else {
            warn!("skip malformed line {}", line_no);
            summary.malformed += 1;
            continue;
        };
        match store.insert(&word, &vector).await {
            Ok(true) => summary.inserted += 1,
            Ok(false) => summary.existing += 1,
            Err(e @ (GameError::DimensionMismatch { .. } | GameError::DegenerateVector(_))) => {
                warn!("skip line {}: {}", line_no, e);
                summary.malformed += 1;
            }
            Err(e) => return Err(e.into()),
        }

        let seen = summary.inserted + summary.existing;
        if seen > 0 && seen % PROGRESS_EVERY == 0 {
            info!("import {}: {} rows so far", path.display(), seen);
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        "import {} spends {}s, {}",
        path.display(),
        elapsed,
        summary
    );
    Ok(summary)
}

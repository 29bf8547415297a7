use super::embedding::EmbeddingStore;
use super::error::GameError;
use super::storage::RankedWord;
use super::{cosine_similarity, PHRASE_SEPARATOR};
use rand::Rng;
use std::path::Path;
use tokio::fs;

pub const MAX_TARGET_ATTEMPTS: usize = 1000;

/// One word per line, trimmed and lowercased. Blank lines are dropped.
pub fn parse_candidates(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|word| !word.is_empty())
        .collect()
}

pub async fn load_candidates(path: &Path) -> Result<Vec<String>, GameError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("candidate list {} does not exist", path.display());
            return Err(GameError::NoCandidates);
        }
        Err(e) => return Err(e.into()),
    };
    let candidates = parse_candidates(&content);
    if candidates.is_empty() {
        return Err(GameError::NoCandidates);
    }
    Ok(candidates)
}

/// Draws candidates uniformly until one has an embedding.
pub async fn select_target<R: Rng + Send>(
    candidates: &[String],
    embeddings: &EmbeddingStore,
    rng: &mut R,
) -> Result<String, GameError> {
    if candidates.is_empty() {
        return Err(GameError::NoCandidates);
    }
    for attempt in 0..MAX_TARGET_ATTEMPTS {
        let candidate = &candidates[rng.gen_range(0..candidates.len())];
        if embeddings.vector(candidate).await?.is_some() {
            debug!("draw {}: {} accepted", attempt, candidate);
            return Ok(candidate.clone());
        }
        debug!("draw {}: {} has no embedding", attempt, candidate);
    }
    Err(GameError::NoValidTarget {
        attempts: MAX_TARGET_ATTEMPTS,
    })
}

/// Scores every single word against the target, most similar first, keeping `top_n`.
///
/// The sort is stable, so equal similarities keep retrieval order. The target
/// itself and multi-token phrases never appear.
pub fn rank_against(
    target: &str,
    target_vector: &[f32],
    words: Vec<(String, Vec<f32>)>,
    top_n: usize,
) -> Vec<RankedWord> {
    let target = target.to_lowercase();
    let mut ranking = words
        .into_iter()
        .filter(|(word, _)| !word.contains(PHRASE_SEPARATOR))
        .map(|(word, vector)| (word.to_lowercase(), vector))
        .filter(|(word, _)| *word != target)
        .map(|(word, vector)| RankedWord {
            similarity: cosine_similarity(target_vector, &vector),
            word,
        })
        .collect::<Vec<_>>();

    ranking.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    ranking.truncate(top_n);
    ranking
}

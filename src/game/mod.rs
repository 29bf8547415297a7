pub mod daily;
pub mod embedding;
pub mod error;
pub mod ranking;
pub mod score;
pub mod storage;

pub use daily::{DailyOutcome, Game, GameSettings};
pub use error::GameError;

/// Marks multi-token phrases in the embedding store, e.g. `ice_cream`.
pub const PHRASE_SEPARATOR: char = '_';

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn magnitude(a: &[f32]) -> f32 {
    a.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Zero vectors yield NaN; the embedding store refuses them on insert.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "embedding dimensions must match");
    let dot = dot_product(a, b);
    let mag_a = magnitude(a);
    let mag_b = magnitude(b);

    dot / (mag_a * mag_b)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::embedding::EmbeddingStore;
    use super::storage::{DailyArtifact, DailyCounter, RankedWord, Storage};
    use super::{Game, GameSettings};
    use tempfile::TempDir;

    pub const LAKE_WORLD: [(&str, [f32; 3]); 3] = [
        ("lake", [1.0, 0.2, 0.0]),
        ("ocean", [0.1, 0.3, 1.0]),
        ("river", [0.9, 0.4, 0.1]),
    ];

    /// A game over a fresh sled directory seeded with `words` and `candidates`.
    pub async fn game_with(words: &[(&str, [f32; 3])], candidates: &[&str]) -> (Game, TempDir) {
        game_with_top_n(words, candidates, 1000).await
    }

    pub async fn game_with_top_n(
        words: &[(&str, [f32; 3])],
        candidates: &[&str],
        top_n: usize,
    ) -> (Game, TempDir) {
        let dir = TempDir::new().unwrap();
        let candidate_path = dir.path().join("candidate_words.txt");
        std::fs::write(&candidate_path, candidates.join("\n")).unwrap();

        let storage = Storage::new(dir.path().join("storage").to_str().unwrap()).unwrap();
        let embeddings = EmbeddingStore::new(storage.clone());
        for (word, vector) in words {
            embeddings.insert(word, vector).await.unwrap();
        }

        let settings = GameSettings {
            candidates: candidate_path,
            top_n,
        };
        (Game::new(storage, settings), dir)
    }

    /// Day 1 whose target "ghost" has no embedding; "river" is ranked first.
    pub async fn game_with_orphan_target() -> (Game, TempDir) {
        let (game, dir) = game_with(&LAKE_WORLD, &["lake"]).await;
        let counter = DailyCounter {
            date: "2024-01-01".to_string(),
            count: 1,
        };
        game.storage().save_counter(&counter).await.unwrap();
        let artifact = DailyArtifact {
            day: 1,
            target: "ghost".to_string(),
            ranking: vec![RankedWord {
                word: "river".to_string(),
                similarity: 0.5,
            }],
        };
        game.storage().store_artifact(&artifact).await.unwrap();
        (game, dir)
    }
}

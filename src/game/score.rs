use super::cosine_similarity;
use super::daily::Game;
use super::error::GameError;

/// `rank` 0 means the guess is the target; 1..=N is a ranking position.
/// `closeness` is only set when the guess falls outside the ranking.
#[derive(Clone, Debug, PartialEq)]
pub struct Score {
    pub rank: Option<usize>,
    pub closeness: Option<f32>,
}

impl Score {
    pub fn exact() -> Self {
        Score {
            rank: Some(0),
            closeness: Some(1.0),
        }
    }
}

impl Game {
    pub async fn score(&self, guess: &str) -> Result<Score, GameError> {
        let today = self.current_day().await?;

        let guess = guess.trim().to_lowercase();
        if guess.is_empty() {
            return Err(GameError::EmptyGuess);
        }

        let artifact = &today.artifact;
        if guess == artifact.target {
            debug!("exact match on day {}", artifact.day);
            return Ok(Score::exact());
        }

        if let Some(position) = artifact
            .ranking
            .iter()
            .position(|ranked| ranked.word.to_lowercase() == guess)
        {
            debug!("{} found in ranking at {}", guess, position + 1);
            return Ok(Score {
                rank: Some(position + 1),
                closeness: None,
            });
        }

        let guess_vector = self
            .embeddings
            .vector(&guess)
            .await?
            .ok_or_else(|| GameError::UnknownWord(guess.clone()))?;
        let target_vector = today
            .target_vector
            .as_deref()
            .ok_or_else(|| GameError::TargetEmbeddingMissing(artifact.target.clone()))?;

        let closeness = cosine_similarity(target_vector, &guess_vector);
        debug!("{} outside ranking, closeness {}", guess, closeness);
        Ok(Score {
            rank: None,
            closeness: Some(closeness),
        })
    }
}

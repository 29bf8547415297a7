use super::error::GameError;
use super::storage::Storage;
use super::PHRASE_SEPARATOR;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Word vectors keyed by exact lowercase word.
#[derive(Clone)]
pub struct EmbeddingStore {
    storage: Storage,
    semaphore: Arc<Semaphore>,
}

impl EmbeddingStore {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    pub async fn vector(&self, word: &str) -> Result<Option<Vec<f32>>, GameError> {
        match self.storage.embedding_index(&word.to_lowercase()).await? {
            Some(index) => {
                let (_, vector) = self.storage.load_embedding(index).await?;
                Ok(Some(vector))
            }
            None => Ok(None),
        }
    }

    /// Every record whose word is a single token, in insertion order.
    pub async fn single_words(&self) -> Result<Vec<(String, Vec<f32>)>, GameError> {
        let count = self.storage.embedding_count().await?;
        let mut words = Vec::with_capacity(count);
        for i in 0..count {
            let (word, vector) = self.storage.load_embedding(i).await?;
            if word.contains(PHRASE_SEPARATOR) {
                continue;
            }
            words.push((word, vector));
        }
        debug!("load {} single words out of {}", words.len(), count);
        Ok(words)
    }

    /// Inserts `word` unless it is already known. Returns whether a record was written.
    pub async fn insert(&self, word: &str, vector: &[f32]) -> Result<bool, GameError> {
        let word = word.trim().to_lowercase();
        if vector.iter().all(|x| *x == 0.0) {
            return Err(GameError::DegenerateVector(word));
        }

        let permit = self.semaphore.acquire().await;
        if self.storage.embedding_index(&word).await?.is_some() {
            return Ok(false);
        }
        if let Some(expected) = self.storage.embedding_dim().await? {
            if expected != vector.len() {
                return Err(GameError::DimensionMismatch {
                    word,
                    expected,
                    found: vector.len(),
                });
            }
        }
        let index = self.storage.embedding_count().await?;
        self.storage.store_embedding(index, &word, vector).await?;
        drop(permit);

        Ok(true)
    }

    pub async fn len(&self) -> Result<usize, GameError> {
        self.storage.embedding_count().await
    }
}

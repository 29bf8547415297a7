use super::embedding::EmbeddingStore;
use super::error::GameError;
use super::ranking::{load_candidates, rank_against, select_target};
use super::storage::{DailyArtifact, DailyCounter, Storage};
use chrono::NaiveDate;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{RwLock, Semaphore};

#[derive(Clone, Debug)]
pub struct GameSettings {
    pub candidates: PathBuf,
    pub top_n: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DailyOutcome {
    /// First request of the day built a fresh artifact.
    Built(DailyArtifact),
    /// Artifacts for `day` were already present.
    Existing { day: u64 },
}

impl DailyOutcome {
    pub fn day(&self) -> u64 {
        match self {
            DailyOutcome::Built(artifact) => artifact.day,
            DailyOutcome::Existing { day } => *day,
        }
    }
}

pub(crate) struct CachedDay {
    pub artifact: DailyArtifact,
    pub target_vector: Option<Vec<f32>>,
}

#[derive(Clone)]
pub struct Game {
    settings: GameSettings,
    storage: Storage,
    pub embeddings: EmbeddingStore,
    today: Arc<RwLock<Option<Arc<CachedDay>>>>,
    semaphore: Arc<Semaphore>,
}

impl Game {
    pub fn new(storage: Storage, settings: GameSettings) -> Self {
        Self {
            settings,
            embeddings: EmbeddingStore::new(storage.clone()),
            storage,
            today: Arc::new(RwLock::new(None)),
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Builds the artifact for `today` unless it already exists.
    ///
    /// Counter advance and artifact creation run under one permit, so racing
    /// first-of-day requests build at most once.
    pub async fn daily_word<R: Rng + Send>(
        &self,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<DailyOutcome, GameError> {
        let permit = self.semaphore.acquire().await;

        let day = self.advance_counter(today).await?.count;
        if self.storage.artifact_exists(day).await? {
            debug!("day {} already generated", day);
            return Ok(DailyOutcome::Existing { day });
        }

        let start = Instant::now();
        let candidates = load_candidates(&self.settings.candidates).await?;
        let target = select_target(&candidates, &self.embeddings, rng).await?;
        info!("daily target word for day {}: {}", day, target);

        let target_vector = self
            .embeddings
            .vector(&target)
            .await?
            .ok_or_else(|| GameError::TargetEmbeddingMissing(target.clone()))?;
        let words = self.embeddings.single_words().await?;
        let ranking = rank_against(&target, &target_vector, words, self.settings.top_n);

        let artifact = DailyArtifact {
            day,
            target,
            ranking,
        };
        self.storage.store_artifact(&artifact).await?;
        drop(permit);

        let elapsed = start.elapsed().as_secs_f64();
        info!(
            "build day {} from {} candidates spends {}s",
            day,
            candidates.len(),
            elapsed
        );
        self.cache(artifact.clone(), Some(target_vector)).await;

        Ok(DailyOutcome::Built(artifact))
    }

    async fn advance_counter(&self, today: NaiveDate) -> Result<DailyCounter, GameError> {
        let mut counter = match self.storage.load_counter().await? {
            Some(counter) => counter,
            None => {
                let counter = DailyCounter::default();
                self.storage.save_counter(&counter).await?;
                counter
            }
        };

        let today = today.format("%Y-%m-%d").to_string();
        if counter.date != today {
            counter.count += 1;
            counter.date = today;
            self.storage.save_counter(&counter).await?;
            info!("advance to day {} on {}", counter.count, counter.date);
        }
        Ok(counter)
    }

    /// The artifact the counter currently points at. Never writes to storage.
    pub(crate) async fn current_day(&self) -> Result<Arc<CachedDay>, GameError> {
        let counter = self
            .storage
            .load_counter()
            .await?
            .ok_or(GameError::NoDailyTarget)?;

        let cached = self
            .today
            .read()
            .await
            .as_ref()
            .filter(|cached| cached.artifact.day == counter.count)
            .cloned();
        if let Some(cached) = cached {
            if cached.target_vector.is_some() {
                return Ok(cached);
            }
            // the target may have been imported since the day was cached
            return match self.embeddings.vector(&cached.artifact.target).await? {
                Some(vector) => Ok(self.cache(cached.artifact.clone(), Some(vector)).await),
                None => Ok(cached),
            };
        }

        let artifact = self
            .storage
            .load_artifact(counter.count)
            .await?
            .ok_or(GameError::NoDailyTarget)?;
        let target_vector = self.embeddings.vector(&artifact.target).await?;
        if target_vector.is_none() {
            warn!(
                "day {} target {} has no embedding",
                artifact.day, artifact.target
            );
        }
        Ok(self.cache(artifact, target_vector).await)
    }

    async fn cache(
        &self,
        artifact: DailyArtifact,
        target_vector: Option<Vec<f32>>,
    ) -> Arc<CachedDay> {
        let cached = Arc::new(CachedDay {
            artifact,
            target_vector,
        });
        let mut write = self.today.write().await;
        *write = Some(Arc::clone(&cached));
        cached
    }
}

#[cfg(test)]
impl Game {
    /// A second handle over the same storage with an empty cache.
    pub(crate) fn reopened(&self) -> Self {
        Game::new(self.storage.clone(), self.settings.clone())
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::testing::{game_with, game_with_top_n, LAKE_WORLD};
    use rand::rngs::mock::StepRng;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn first_build_starts_at_day_one() {
        let (game, _dir) = game_with(&LAKE_WORLD, &["lake", "river", "ocean"]).await;

        let outcome = game
            .daily_word(date("2024-01-01"), &mut StepRng::new(0, 0))
            .await
            .unwrap();
        let DailyOutcome::Built(artifact) = outcome else {
            panic!("expected a fresh build");
        };
        assert_eq!(artifact.day, 1);
        assert_eq!(artifact.target, "lake");

        let order = artifact
            .ranking
            .iter()
            .map(|r| r.word.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["river", "ocean"]);
        assert_eq!(
            game.storage.load_counter().await.unwrap(),
            Some(DailyCounter {
                date: "2024-01-01".to_string(),
                count: 1
            })
        );
    }

    #[tokio::test]
    async fn same_day_repeat_reuses_artifact() {
        let (game, _dir) = game_with(&LAKE_WORLD, &["lake", "river", "ocean"]).await;
        let today = date("2024-01-01");

        let first = game.daily_word(today, &mut StepRng::new(0, 0)).await.unwrap();
        let built = game.storage.load_artifact(1).await.unwrap();

        // this draw would pick "river" if a rebuild happened
        let second = game
            .daily_word(today, &mut StepRng::new(1 << 63, 0))
            .await
            .unwrap();
        assert!(matches!(first, DailyOutcome::Built(_)));
        assert_eq!(second, DailyOutcome::Existing { day: 1 });
        assert_eq!(game.storage.load_artifact(1).await.unwrap(), built);
    }

    #[tokio::test]
    async fn rollover_advances_once() {
        let (game, _dir) = game_with(&LAKE_WORLD, &["lake", "river", "ocean"]).await;
        game.storage
            .save_counter(&DailyCounter {
                date: "2024-01-01".to_string(),
                count: 5,
            })
            .await
            .unwrap();

        let next = date("2024-01-02");
        let first = game.daily_word(next, &mut StepRng::new(0, 0)).await.unwrap();
        let second = game.daily_word(next, &mut StepRng::new(0, 0)).await.unwrap();

        assert!(matches!(first, DailyOutcome::Built(ref a) if a.day == 6));
        assert_eq!(second, DailyOutcome::Existing { day: 6 });
        assert_eq!(game.storage.load_counter().await.unwrap().unwrap().count, 6);
        assert!(!game.storage.artifact_exists(5).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_first_requests_build_once() {
        let (game, _dir) = game_with(&LAKE_WORLD, &["lake", "river", "ocean"]).await;
        let today = date("2024-03-10");

        let mut rng_a = StepRng::new(0, 0);
        let mut rng_b = StepRng::new(0, 0);
        let (a, b) = tokio::join!(
            game.daily_word(today, &mut rng_a),
            game.daily_word(today, &mut rng_b),
        );
        let outcomes = [a.unwrap(), b.unwrap()];
        let built = outcomes
            .iter()
            .filter(|o| matches!(o, DailyOutcome::Built(_)))
            .count();
        assert_eq!(built, 1);
        assert!(outcomes.iter().all(|o| o.day() == 1));
    }

    #[tokio::test]
    async fn failed_build_persists_nothing() {
        let (game, _dir) = game_with(&LAKE_WORLD, &["ghost"]).await;

        let result = game
            .daily_word(date("2024-01-01"), &mut StepRng::new(0, 0))
            .await;
        assert!(matches!(result, Err(GameError::NoValidTarget { .. })));
        assert!(!game.storage.artifact_exists(1).await.unwrap());
        assert!(matches!(
            game.current_day().await,
            Err(GameError::NoDailyTarget)
        ));
    }

    #[tokio::test]
    async fn empty_candidate_list_fails() {
        let (game, _dir) = game_with(&LAKE_WORLD, &[]).await;
        let result = game
            .daily_word(date("2024-01-01"), &mut StepRng::new(0, 0))
            .await;
        assert!(matches!(result, Err(GameError::NoCandidates)));
    }

    #[tokio::test]
    async fn ranking_respects_top_n() {
        let (game, _dir) = game_with_top_n(&LAKE_WORLD, &["lake"], 1).await;

        let outcome = game
            .daily_word(date("2024-01-01"), &mut StepRng::new(0, 0))
            .await
            .unwrap();
        let DailyOutcome::Built(artifact) = outcome else {
            panic!("expected a fresh build");
        };
        assert_eq!(artifact.ranking.len(), 1);
        assert_eq!(artifact.ranking[0].word, "river");
    }
}

// storage protocol:
// daily/count -> {"date": "YYYY-MM-DD", "count": n}, overwritten in place
// daily/[n].txt -> target word of day n
// daily/top1000_[n].json -> ranking of day n: [{"word": w, "similarity": s}]
// embedding/count -> count of embeddings
// embedding/dim -> dimension shared by every vector
// embedding/[i]/word -> i word
// embedding/[i]/vector -> i vector
// word/[word] -> index i of word, with % and / escaped as %25 and %2F
//
// day n is visible once daily/[n].txt exists, so the ranking is written first.
// writes should be mutually exclusive, but one write and some reads are allowed to be concurrent

use super::error::GameError;
use byteorder::{ByteOrder, LittleEndian};
use opendal::services::Sled;
use opendal::{ErrorKind, Operator};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounter {
    pub date: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedWord {
    pub word: String,
    pub similarity: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DailyArtifact {
    pub day: u64,
    pub target: String,
    pub ranking: Vec<RankedWord>,
}

pub fn target_file(day: u64) -> String {
    format!("{}.txt", day)
}

pub fn ranking_file(day: u64) -> String {
    format!("top1000_{}.json", day)
}

const COUNTER_KEY: &str = "daily/count";
const EMBEDDING_COUNT_KEY: &str = "embedding/count";
const EMBEDDING_DIM_KEY: &str = "embedding/dim";

#[derive(Clone)]
pub struct Storage {
    pub operator: Operator,
}

impl Storage {
    pub fn new(datadir: &str) -> Result<Self, GameError> {
        let mut builder = Sled::default();
        builder.datadir(datadir);

        Ok(Storage {
            operator: Operator::new(builder)?.finish(),
        })
    }

    async fn read_optional(&self, path: &str) -> Result<Option<Vec<u8>>, GameError> {
        match self.operator.read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn load_counter(&self) -> Result<Option<DailyCounter>, GameError> {
        match self.read_optional(COUNTER_KEY).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn save_counter(&self, counter: &DailyCounter) -> Result<(), GameError> {
        self.operator
            .write(COUNTER_KEY, serde_json::to_vec(counter)?)
            .await?;
        debug!("store counter: {:?}", counter);
        Ok(())
    }

    pub async fn artifact_exists(&self, day: u64) -> Result<bool, GameError> {
        let target = self.read_optional(&daily_key(&target_file(day))).await?;
        let ranking = self.read_optional(&daily_key(&ranking_file(day))).await?;
        Ok(target.is_some() && ranking.is_some())
    }

    pub async fn load_artifact(&self, day: u64) -> Result<Option<DailyArtifact>, GameError> {
        let Some(target) = self.read_optional(&daily_key(&target_file(day))).await? else {
            return Ok(None);
        };
        let Some(ranking) = self.read_optional(&daily_key(&ranking_file(day))).await? else {
            return Ok(None);
        };

        Ok(Some(DailyArtifact {
            day,
            target: string_decode(&target).trim().to_lowercase(),
            ranking: serde_json::from_slice(&ranking)?,
        }))
    }

    pub async fn store_artifact(&self, artifact: &DailyArtifact) -> Result<(), GameError> {
        self.operator
            .write(
                &daily_key(&ranking_file(artifact.day)),
                serde_json::to_vec(&artifact.ranking)?,
            )
            .await?;
        self.operator
            .write(&daily_key(&target_file(artifact.day)), artifact.target.clone())
            .await?;
        debug!(
            "store artifact: day: {}, ranking len: {}",
            artifact.day,
            artifact.ranking.len()
        );
        Ok(())
    }

    pub async fn embedding_count(&self) -> Result<usize, GameError> {
        match self.read_optional(EMBEDDING_COUNT_KEY).await? {
            Some(bytes) => usize_decode(EMBEDDING_COUNT_KEY, &bytes),
            None => Ok(0),
        }
    }

    pub async fn embedding_dim(&self) -> Result<Option<usize>, GameError> {
        match self.read_optional(EMBEDDING_DIM_KEY).await? {
            Some(bytes) => Ok(Some(usize_decode(EMBEDDING_DIM_KEY, &bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn embedding_index(&self, word: &str) -> Result<Option<usize>, GameError> {
        let key = word_key(word);
        match self.read_optional(&key).await? {
            Some(bytes) => Ok(Some(usize_decode(&key, &bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn load_embedding(&self, index: usize) -> Result<(String, Vec<f32>), GameError> {
        let prefix = "embedding/".to_string() + &index.to_string();
        let word = string_decode(&self.operator.read(&(prefix.clone() + "/word")).await?);
        let vector = bytes_to_float(&self.operator.read(&(prefix + "/vector")).await?);
        Ok((word, vector))
    }

    /// Appends one embedding record at `index`; the count is bumped last so a
    /// scan never sees a half written record.
    pub async fn store_embedding(
        &self,
        index: usize,
        word: &str,
        vector: &[f32],
    ) -> Result<(), GameError> {
        let prefix = "embedding/".to_string() + &index.to_string();
        if index == 0 {
            self.operator
                .write(EMBEDDING_DIM_KEY, vector.len().to_be_bytes().to_vec())
                .await?;
        }
        self.operator
            .write(&(prefix.clone() + "/vector"), float_to_bytes(vector))
            .await?;
        self.operator
            .write(&(prefix + "/word"), word.to_string())
            .await?;
        self.operator
            .write(&word_key(word), index.to_be_bytes().to_vec())
            .await?;
        self.operator
            .write(EMBEDDING_COUNT_KEY, (index + 1).to_be_bytes().to_vec())
            .await?;
        debug!("store embedding: i: {}, word: {}", index, word);
        Ok(())
    }
}

fn daily_key(file: &str) -> String {
    "daily/".to_string() + file
}

/// opendal normalizes slashes in paths, so they must not reach the key raw.
fn word_key(word: &str) -> String {
    "word/".to_string() + &word.replace('%', "%25").replace('/', "%2F")
}

fn usize_decode(key: &str, data: &[u8]) -> Result<usize, GameError> {
    let bytes = data
        .try_into()
        .map_err(|_| GameError::Corrupted(key.to_string()))?;
    Ok(usize::from_be_bytes(bytes))
}

fn string_decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_string()
}

fn float_to_bytes(float_vec: &[f32]) -> Vec<u8> {
    let mut byte_vec = vec![0u8; float_vec.len() * 4];
    LittleEndian::write_f32_into(float_vec, &mut byte_vec);
    byte_vec
}

fn bytes_to_float(byte_vec: &[u8]) -> Vec<f32> {
    let mut float_vec = vec![0f32; byte_vec.len() / 4];
    LittleEndian::read_f32_into(&byte_vec[..float_vec.len() * 4], &mut float_vec);
    float_vec
}

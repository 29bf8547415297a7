use crate::game::storage::{ranking_file, target_file};
use crate::game::{DailyOutcome, Game, GameError};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Deserialize, Serialize)]
pub struct RankRequest {
    pub guess: Option<String>,
}

#[derive(Debug, Serialize)]
struct RankResponse {
    guess: String,
    rank: Option<usize>,
    closeness: Option<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DailyWordResponse {
    message: &'static str,
    day: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_word: Option<String>,
    target_file: String,
    ranking_file: String,
}

impl From<DailyOutcome> for DailyWordResponse {
    fn from(outcome: DailyOutcome) -> Self {
        let day = outcome.day();
        let (message, target_word) = match outcome {
            DailyOutcome::Built(artifact) => {
                ("Daily word generated successfully", Some(artifact.target))
            }
            DailyOutcome::Existing { .. } => ("Daily word already generated", None),
        };
        DailyWordResponse {
            message,
            day,
            target_word,
            target_file: target_file(day),
            ranking_file: ranking_file(day),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn routes(game: Game) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let game_for_rank = game.clone();

    let daily_word_route = warp::path("daily-word")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::any().map(move || game.clone()))
        .and_then(handle_daily_word);

    let rank_route = warp::path("rank")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(warp::any().map(move || game_for_rank.clone()))
        .and_then(handle_rank);

    daily_word_route.or(rank_route)
}

fn error_reply(e: &GameError) -> warp::reply::WithStatus<warp::reply::Json> {
    let body = ErrorResponse {
        error: e.public_message(),
    };
    warp::reply::with_status(warp::reply::json(&body), e.status())
}

async fn handle_daily_word(game: Game) -> Result<impl Reply, Infallible> {
    let today = Utc::now().date_naive();
    let mut rng = StdRng::from_entropy();

    match game.daily_word(today, &mut rng).await {
        Ok(outcome) => {
            info!("get daily-word request return day: {}", outcome.day());
            let body = DailyWordResponse::from(outcome);
            Ok(warp::reply::with_status(
                warp::reply::json(&body),
                StatusCode::OK,
            ))
        }
        Err(e) => {
            error!("daily-word on {} failed: {}", today, e);
            Ok(error_reply(&e))
        }
    }
}

async fn handle_rank(request: RankRequest, game: Game) -> Result<impl Reply, Infallible> {
    let guess = request.guess.unwrap_or_default();

    match game.score(&guess).await {
        Ok(score) => {
            info!(
                "get rank request: {:?} return rank: {:?}, closeness: {:?}",
                guess, score.rank, score.closeness
            );
            let body = RankResponse {
                guess,
                rank: score.rank,
                closeness: score.closeness,
            };
            Ok(warp::reply::with_status(
                warp::reply::json(&body),
                StatusCode::OK,
            ))
        }
        Err(e) => {
            if e.status().is_server_error() {
                error!("rank {:?} failed: {}", guess, e);
            } else {
                info!("rank {:?} rejected: {}", guess, e);
            }
            Ok(error_reply(&e))
        }
    }
}

mod api;
mod game;
mod import;

use chrono::Utc;
use dotenv::dotenv;
use env_logger::Builder;
use game::storage::{ranking_file, target_file, Storage};
use game::{DailyOutcome, Game, GameSettings};
use lazy_static::lazy_static;
use log::LevelFilter;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::error::Error;
use std::path::{Path, PathBuf};

#[macro_use]
extern crate log;

lazy_static! {
    static ref PORT: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);
    static ref STORAGE_DIR: String =
        std::env::var("STORAGE_DIR").unwrap_or_else(|_| "./storage".to_string());
    static ref CANDIDATE_WORDS: PathBuf = std::env::var("CANDIDATE_WORDS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./candidate_words.txt"));
    static ref TOP_N: usize = std::env::var("TOP_N")
        .ok()
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(1000);
}

const USAGE: &str = "usage: dailyword [serve | build | import <path>]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // read .env
    dotenv().ok();

    // init logger
    let log_level = std::env::var("RUST_LOG").unwrap_or_default();

    if log_level == "debug" {
        Builder::new()
            .filter(None, LevelFilter::Off)
            .filter(Some("dailyword::game"), LevelFilter::Debug)
            .filter(Some("dailyword"), LevelFilter::Debug)
            .init();
    } else if log_level == "info" {
        Builder::new()
            .filter(None, LevelFilter::Off)
            .filter(Some("dailyword::game"), LevelFilter::Info)
            .filter(Some("dailyword"), LevelFilter::Info)
            .init();
    } else {
        env_logger::init();
    }

    let storage = Storage::new(&STORAGE_DIR)?;
    let game = Game::new(
        storage,
        GameSettings {
            candidates: CANDIDATE_WORDS.clone(),
            top_n: *TOP_N,
        },
    );
    info!(
        "storage opened at {}, {} embeddings",
        *STORAGE_DIR,
        game.embeddings.len().await?
    );

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    match args.first().map(String::as_str) {
        None | Some("serve") => serve(game).await,
        Some("build") => build(game).await?,
        Some("import") => {
            let path = args.get(1).ok_or(USAGE)?;
            let summary = import::import_file(Path::new(path), &game.embeddings).await?;
            info!("import {} succeed, {}", path, summary);
        }
        Some(other) => return Err(format!("unknown command: {}\n{}", other, USAGE).into()),
    }

    Ok(())
}

async fn serve(game: Game) {
    let routes = api::routes(game);

    info!("server running at port: {}", *PORT);
    warp::serve(routes).run(([0, 0, 0, 0], *PORT)).await;
}

async fn build(game: Game) -> Result<(), Box<dyn Error>> {
    let today = Utc::now().date_naive();
    let mut rng = StdRng::from_entropy();
    match game.daily_word(today, &mut rng).await? {
        DailyOutcome::Built(artifact) => info!(
            "day {} built: target: {}, {} ranked, saved as {} and {}",
            artifact.day,
            artifact.target,
            artifact.ranking.len(),
            target_file(artifact.day),
            ranking_file(artifact.day)
        ),
        DailyOutcome::Existing { day } => info!("day {} already generated for {}", day, today),
    }
    Ok(())
}

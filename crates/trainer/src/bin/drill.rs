//! Terminal front-end for the opening blunder drills.
//!
//! Usage: cargo run --bin drill -- [--file puzzles.json] [--opening NAME] [--deep] [--list]
//!
//! Without `--file` puzzles come from the trainer API (`TRAINER_API_URL`,
//! `TRAINER_API_TOKEN`). Moves are typed as UCI (`e2e4`, `e7e8q`).

use std::env;

use chess_core::board::{move_squares, parse_square};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use trainer::{Catalog, DrillDriver, DrillView, FileCatalog, HttpCatalog, TrainerConfig};

struct Args {
    file: Option<String>,
    opening: Option<String>,
    deep: bool,
    list: bool,
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        file: None,
        opening: None,
        deep: false,
        list: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--file" => {
                parsed.file = args.get(i + 1).cloned();
                i += 2;
            }
            "--opening" => {
                parsed.opening = args.get(i + 1).cloned();
                i += 2;
            }
            "--deep" => {
                parsed.deep = true;
                i += 1;
            }
            "--list" => {
                parsed.list = true;
                i += 1;
            }
            "-h" | "--help" => {
                eprintln!(
                    "Usage: {} [--file PATH] [--opening NAME] [--deep] [--list]",
                    args[0]
                );
                std::process::exit(0);
            }
            _ => i += 1,
        }
    }
    parsed
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();
    let config = TrainerConfig::from_env()?;

    match &args.file {
        Some(path) => run(FileCatalog::load(path)?, config, &args).await,
        None => run(HttpCatalog::new(&config)?, config, &args).await,
    }
}

async fn run<C: Catalog + 'static>(
    catalog: C,
    config: TrainerConfig,
    args: &Args,
) -> anyhow::Result<()> {
    let groups = catalog.list_groups().await?;
    if args.list {
        for group in &groups {
            println!(
                "{:<40} {:>4}/{:<4} {}",
                group.name,
                group.completed_count,
                group.total_count,
                group.eco_codes.join(",")
            );
        }
        return Ok(());
    }

    let opening = match &args.opening {
        Some(name) => name.clone(),
        None => match groups.first() {
            Some(group) => group.name.clone(),
            None => anyhow::bail!("catalog has no puzzles"),
        },
    };

    let driver = DrillDriver::new(catalog, config);
    if driver.open_group(&opening).await?.is_none() {
        println!("Every puzzle in {opening} is already solved.");
        return Ok(());
    }
    if args.deep {
        driver.switch_to_deep_mode().await;
    }

    let mut views = driver.subscribe();
    if let Some(view) = driver.view() {
        print_view(&view);
    }
    let printer = tokio::spawn(async move {
        let mut last_status = None;
        while views.changed().await.is_ok() {
            let Some(view) = views.borrow_and_update().clone() else {
                continue;
            };
            let key = (view.puzzle_id.clone(), view.status.clone(), view.fen.clone());
            if last_status.as_ref() != Some(&key) {
                print_view(&view);
                last_status = Some(key);
            }
        }
    });

    println!("Commands: <uci move>, select <square>, hint, retry, deep, next, show, quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (None, _) => continue,
            (Some("quit" | "q" | "exit"), _) => break,
            (Some("hint"), _) => match driver.request_hint().await {
                Some(square) => println!("Hint: look at {square}"),
                None => println!("No hint right now."),
            },
            (Some("retry"), _) => driver.retry().await,
            (Some("start"), _) => driver.start().await,
            (Some("deep"), _) => driver.switch_to_deep_mode().await,
            (Some("next"), _) => {
                if driver.next_puzzle().await?.is_none() {
                    println!("No more unsolved puzzles in {opening}.");
                }
            }
            (Some("show"), _) => {
                if let Some(view) = driver.view() {
                    println!("{}", serde_json::to_string_pretty(&view)?);
                }
            }
            (Some("select"), Some(square)) => match parse_square(square) {
                Ok(square) => {
                    driver.select_square(square).await;
                }
                Err(e) => println!("{e}"),
            },
            (Some(mv), _) => match move_squares(mv) {
                Some((from, to)) => match driver.piece_at(from).await {
                    Some(piece) => {
                        driver.attempt_move(from, to, piece).await;
                    }
                    None => println!("No piece on {from}."),
                },
                None => println!("Unknown command: {mv}"),
            },
        }
    }

    printer.abort();
    Ok(())
}

fn print_view(view: &DrillView) {
    println!();
    println!("== {} [{:?}] ==", view.title, view.phase);
    print!("{}", render_board(&view.fen, view.orientation == "black"));
    if !view.movetext.is_empty() {
        println!("{}", view.movetext);
    }
    println!(
        "{} {}/{} lines",
        view.status.title, view.variations_completed, view.total_required
    );
    if !view.status.body.is_empty() {
        println!("{}", view.status.body);
    }
}

/// ASCII diagram of a FEN's piece placement.
fn render_board(fen: &str, flipped: bool) -> String {
    let placement = fen.split_whitespace().next().unwrap_or("");
    let mut rows: Vec<String> = placement
        .split('/')
        .map(|rank| {
            rank.chars()
                .flat_map(|c| match c.to_digit(10) {
                    Some(n) => vec!['.'; n as usize],
                    None => vec![c],
                })
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    let mut files = "a b c d e f g h".to_string();
    if flipped {
        rows.reverse();
        rows = rows
            .into_iter()
            .map(|row| row.chars().rev().collect())
            .collect();
        files = files.chars().rev().collect();
    }

    let mut out = String::new();
    for (i, row) in rows.iter().enumerate() {
        let rank = if flipped { i + 1 } else { 8 - i };
        out.push_str(&format!("{rank}  {row}\n"));
    }
    out.push_str(&format!("   {files}\n"));
    out
}

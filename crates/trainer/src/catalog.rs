//! Where puzzles come from: the trainer HTTP API or a generator output file.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::path::Path;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::TrainerConfig;
use crate::error::TrainerError;
use crate::puzzle::{PuzzleGroup, PuzzleRecord, PuzzleSet};

/// Backend catalog of drill puzzles.
pub trait Catalog: Send + Sync {
    fn list_groups(&self) -> impl Future<Output = Result<Vec<PuzzleGroup>, TrainerError>> + Send;

    fn get_puzzles(
        &self,
        group: &str,
    ) -> impl Future<Output = Result<PuzzleSet, TrainerError>> + Send;

    fn mark_complete(
        &self,
        puzzle_id: &str,
    ) -> impl Future<Output = Result<(), TrainerError>> + Send;
}

// ---- HTTP ----

pub struct HttpCatalog {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct MarkCompleteBody<'a> {
    puzzle_id: &'a str,
}

impl HttpCatalog {
    pub fn new(config: &TrainerConfig) -> Result<Self, TrainerError> {
        let client = Client::builder()
            .user_agent("AlpineChess-Trainer/1.0")
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, TrainerError> {
        let resp = builder.send().await?;
        match resp.status() {
            status if status.is_success() => Ok(resp),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TrainerError::Catalog(
                format!("HTTP {}: check TRAINER_API_TOKEN", resp.status()),
            )),
            status => Err(TrainerError::Catalog(format!("HTTP {status}"))),
        }
    }
}

impl Catalog for HttpCatalog {
    async fn list_groups(&self) -> Result<Vec<PuzzleGroup>, TrainerError> {
        let resp = self
            .send(self.request(Method::GET, "/api/trainer/openings"))
            .await?;
        let groups: Vec<PuzzleGroup> = resp.json().await?;
        debug!(count = groups.len(), "Fetched trainer openings");
        Ok(groups)
    }

    async fn get_puzzles(&self, group: &str) -> Result<PuzzleSet, TrainerError> {
        let builder = self
            .request(Method::GET, "/api/trainer/puzzles")
            .query(&[("opening", group)]);
        let set: PuzzleSet = self.send(builder).await?.json().await?;
        debug!(
            opening = group,
            puzzles = set.puzzles.len(),
            completed = set.completed_ids.len(),
            "Fetched trainer puzzles"
        );
        Ok(set)
    }

    async fn mark_complete(&self, puzzle_id: &str) -> Result<(), TrainerError> {
        let builder = self
            .request(Method::POST, "/api/trainer/progress")
            .json(&MarkCompleteBody { puzzle_id });
        self.send(builder).await?;
        Ok(())
    }
}

// ---- File ----

/// Offline catalog over a generator output file. Completion marks live in
/// memory only.
pub struct FileCatalog {
    records: Vec<PuzzleRecord>,
    completed: Mutex<HashSet<String>>,
}

impl FileCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrainerError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let records: Vec<PuzzleRecord> = serde_json::from_str(&text)?;
        info!(
            path = %path.as_ref().display(),
            puzzles = records.len(),
            "Loaded puzzle file"
        );
        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<PuzzleRecord>) -> Self {
        Self {
            records,
            completed: Mutex::new(HashSet::new()),
        }
    }

    fn group_name(record: &PuzzleRecord) -> &str {
        record.opening_name.as_deref().unwrap_or(&record.eco)
    }
}

impl Catalog for FileCatalog {
    async fn list_groups(&self) -> Result<Vec<PuzzleGroup>, TrainerError> {
        let completed = self.completed.lock().await;
        let mut groups: BTreeMap<&str, PuzzleGroup> = BTreeMap::new();
        for record in &self.records {
            let group = groups
                .entry(Self::group_name(record))
                .or_insert_with(|| PuzzleGroup {
                    name: Self::group_name(record).to_string(),
                    eco_codes: Vec::new(),
                    total_count: 0,
                    completed_count: 0,
                    sample_position: record.pre_mistake_fen.clone(),
                });
            group.total_count += 1;
            if completed.contains(&record.id) {
                group.completed_count += 1;
            }
            if !record.eco.is_empty() && !group.eco_codes.contains(&record.eco) {
                group.eco_codes.push(record.eco.clone());
            }
            if record.pre_mistake_fen < group.sample_position {
                group.sample_position = record.pre_mistake_fen.clone();
            }
        }

        Ok(groups
            .into_values()
            .map(|mut group| {
                group.eco_codes.sort();
                group
            })
            .collect())
    }

    async fn get_puzzles(&self, group: &str) -> Result<PuzzleSet, TrainerError> {
        let completed = self.completed.lock().await;
        let mut puzzles: Vec<PuzzleRecord> = self
            .records
            .iter()
            .filter(|r| Self::group_name(r) == group)
            .cloned()
            .collect();
        if puzzles.is_empty() {
            return Err(TrainerError::Catalog(format!("no puzzles for opening {group:?}")));
        }
        puzzles.sort_by(|a, b| b.games.cmp(&a.games));

        let completed_ids = puzzles
            .iter()
            .filter(|p| completed.contains(&p.id))
            .map(|p| p.id.clone())
            .collect();
        Ok(PuzzleSet {
            puzzles,
            completed_ids,
        })
    }

    async fn mark_complete(&self, puzzle_id: &str) -> Result<(), TrainerError> {
        if !self.records.iter().any(|r| r.id == puzzle_id) {
            return Err(TrainerError::PuzzleNotFound(puzzle_id.to_string()));
        }
        self.completed.lock().await.insert(puzzle_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, eco: &str, name: Option<&str>, games: i64, fen: &str) -> PuzzleRecord {
        serde_json::from_value(json!({
            "id": id,
            "eco": eco,
            "opening_name": name,
            "mistake_san": "f6",
            "mistake_uci": "f7f6",
            "pre_mistake_fen": fen,
            "solver_color": "w",
            "games": games,
            "tree": {"type": "cutoff"}
        }))
        .unwrap()
    }

    fn catalog() -> FileCatalog {
        FileCatalog::from_records(vec![
            record("a", "C40", Some("Damiano Defense"), 10, "fen-b"),
            record("b", "C40", Some("Damiano Defense"), 50, "fen-a"),
            record("c", "C41", Some("Damiano Defense"), 5, "fen-c"),
            record("d", "B01", None, 7, "fen-d"),
        ])
    }

    #[tokio::test]
    async fn test_file_catalog_groups() {
        let catalog = catalog();
        let groups = catalog.list_groups().await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "B01");
        let damiano = &groups[1];
        assert_eq!(damiano.name, "Damiano Defense");
        assert_eq!(damiano.eco_codes, vec!["C40", "C41"]);
        assert_eq!(damiano.total_count, 3);
        assert_eq!(damiano.sample_position, "fen-a");
    }

    #[tokio::test]
    async fn test_file_catalog_puzzles_by_popularity() {
        let catalog = catalog();
        let set = catalog.get_puzzles("Damiano Defense").await.unwrap();
        let ids: Vec<&str> = set.puzzles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(set.completed_ids.is_empty());
        assert!(catalog.get_puzzles("Sicilian").await.is_err());
    }

    #[tokio::test]
    async fn test_file_catalog_completion() {
        let catalog = catalog();
        catalog.mark_complete("a").await.unwrap();
        assert!(matches!(
            catalog.mark_complete("zzz").await,
            Err(TrainerError::PuzzleNotFound(_))
        ));

        let set = catalog.get_puzzles("Damiano Defense").await.unwrap();
        assert_eq!(set.completed_ids, vec!["a"]);
        assert_eq!(set.next_unsolved(None).map(|p| p.id.as_str()), Some("b"));
        assert_eq!(set.next_unsolved(Some("b")).map(|p| p.id.as_str()), Some("c"));

        let groups = catalog.list_groups().await.unwrap();
        assert_eq!(groups[1].completed_count, 1);
    }
}

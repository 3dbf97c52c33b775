//! Runs drill sessions on tokio: turns scheduled steps into timers, reports
//! completions to the catalog and publishes a [`DrillView`] after every change.

use std::sync::Arc;

use shakmaty::{Piece, Square};
use tokio::sync::{watch, Mutex};
use tokio::task::AbortHandle;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::config::TrainerConfig;
use crate::error::TrainerError;
use crate::puzzle::{Puzzle, PuzzleSet};
use crate::session::DrillSession;
use crate::view::DrillView;

struct Shared {
    session: Option<DrillSession>,
    timers: Vec<AbortHandle>,
    group: Option<String>,
    set: PuzzleSet,
}

struct Inner<C> {
    state: Mutex<Shared>,
    catalog: C,
    config: TrainerConfig,
    views: watch::Sender<Option<DrillView>>,
}

/// Owns the active session. Cheap to clone; clones drive the same session.
pub struct DrillDriver<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for DrillDriver<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Catalog + 'static> DrillDriver<C> {
    pub fn new(catalog: C, config: TrainerConfig) -> Self {
        let (views, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(Shared {
                    session: None,
                    timers: Vec::new(),
                    group: None,
                    set: PuzzleSet::default(),
                }),
                catalog,
                config,
                views,
            }),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.inner.catalog
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<DrillView>> {
        self.inner.views.subscribe()
    }

    pub fn view(&self) -> Option<DrillView> {
        self.inner.views.borrow().clone()
    }

    /// Replace the active session with a fresh one for `puzzle` and start it.
    /// Timers of the previous session are cancelled.
    pub async fn load(&self, puzzle: Puzzle) {
        let mut shared = self.inner.state.lock().await;
        for timer in shared.timers.drain(..) {
            timer.abort();
        }

        let timings = self.inner.config.timings.clone();
        let puzzle = Arc::new(puzzle);
        let mut session = match self.inner.config.seed {
            Some(seed) => DrillSession::with_seed(puzzle, timings, seed),
            None => DrillSession::new(puzzle, timings),
        };
        info!(puzzle_id = %session.puzzle().id, session = session.id(), "Loaded puzzle");
        session.start();
        shared.session = Some(session);
        dispatch(&self.inner, &mut shared);
    }

    /// Fetch a group's puzzles and load the first one not yet completed.
    /// Returns the loaded puzzle id, or `None` when the group is finished.
    pub async fn open_group(&self, group: &str) -> Result<Option<String>, TrainerError> {
        let set = self.inner.catalog.get_puzzles(group).await?;
        {
            let mut shared = self.inner.state.lock().await;
            shared.group = Some(group.to_string());
            shared.set = set;
        }
        self.advance(None).await
    }

    /// Load the next unsolved puzzle of the open group after the current one.
    pub async fn next_puzzle(&self) -> Result<Option<String>, TrainerError> {
        let current = {
            let shared = self.inner.state.lock().await;
            shared.session.as_ref().map(|s| s.puzzle().id.clone())
        };
        self.advance(current.as_deref()).await
    }

    async fn advance(&self, after: Option<&str>) -> Result<Option<String>, TrainerError> {
        let record = {
            let shared = self.inner.state.lock().await;
            shared.set.next_unsolved(after).cloned()
        };
        let Some(record) = record else {
            info!("No unsolved puzzles left in group");
            return Ok(None);
        };
        let puzzle = Puzzle::from_record(&record)?;
        let id = puzzle.id.clone();
        self.load(puzzle).await;
        Ok(Some(id))
    }

    pub async fn start(&self) {
        self.with_session(|s| s.start()).await;
    }

    pub async fn retry(&self) {
        self.with_session(|s| s.retry()).await;
    }

    pub async fn switch_to_deep_mode(&self) {
        self.with_session(|s| s.switch_to_deep_mode()).await;
    }

    /// Renderer callback for a dragged move.
    pub async fn attempt_move(&self, from: Square, to: Square, piece: Piece) -> bool {
        self.with_session(|s| s.attempt_move(from, to, piece))
            .await
            .unwrap_or(false)
    }

    /// Renderer callback for a square click.
    pub async fn select_square(&self, square: Square) -> bool {
        self.with_session(|s| s.select_square(square))
            .await
            .unwrap_or(false)
    }

    pub async fn request_hint(&self) -> Option<Square> {
        self.with_session(|s| s.request_hint()).await.flatten()
    }

    pub async fn piece_at(&self, square: Square) -> Option<Piece> {
        let shared = self.inner.state.lock().await;
        shared.session.as_ref().and_then(|s| s.piece_at(square))
    }

    async fn with_session<R>(&self, f: impl FnOnce(&mut DrillSession) -> R) -> Option<R> {
        let mut shared = self.inner.state.lock().await;
        let out = shared.session.as_mut().map(f);
        dispatch(&self.inner, &mut shared);
        out
    }
}

/// Drain the session's queued steps and completion, then publish a snapshot.
fn dispatch<C: Catalog + 'static>(inner: &Arc<Inner<C>>, shared: &mut Shared) {
    let Some(session) = shared.session.as_mut() else {
        inner.views.send_replace(None);
        return;
    };
    let scheduled = session.take_scheduled();
    let completed = session.take_completed();

    for step in scheduled {
        let task_inner = Arc::clone(inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(step.delay).await;
            let mut shared = task_inner.state.lock().await;
            if let Some(session) = shared.session.as_mut() {
                session.fire(step.ticket, step.step);
            }
            dispatch(&task_inner, &mut shared);
        });
        shared.timers.push(handle.abort_handle());
    }
    shared.timers.retain(|timer| !timer.is_finished());

    if let Some(puzzle_id) = completed {
        if !shared.set.completed_ids.contains(&puzzle_id) {
            shared.set.completed_ids.push(puzzle_id.clone());
        }
        let task_inner = Arc::clone(inner);
        tokio::spawn(async move {
            match task_inner.catalog.mark_complete(&puzzle_id).await {
                Ok(()) => info!(puzzle_id = %puzzle_id, "Marked puzzle complete"),
                Err(e) => warn!(puzzle_id = %puzzle_id, error = %e, "Failed to mark puzzle complete"),
            }
        });
    }

    let view = shared.session.as_ref().map(DrillSession::view);
    inner.views.send_replace(view);
}

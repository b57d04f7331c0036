use std::marker::PhantomData;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use super::connection::{ConnectionManager, ConnectionOptions, ConnectionState};
use super::decoder::{decode_frame, frame_excerpt};
use super::keyed::{Applied, KeyedList};
use super::reducer::{FeedReducer, reduce};

const LOG_EXCERPT_CHARS: usize = 120;

/// What a dashboard should show for the current connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardStatus {
    SignedOut,
    Loading,
    Live,
    ConnectionLost,
}

impl From<ConnectionState> for DashboardStatus {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Uninstantiated => Self::SignedOut,
            ConnectionState::Connecting => Self::Loading,
            ConnectionState::Open => Self::Live,
            ConnectionState::Closing | ConnectionState::Closed => Self::ConnectionLost,
        }
    }
}

/// Immutable view of a feed, published after every change.
#[derive(Debug, Clone)]
pub struct FeedSnapshot<T> {
    pub entities: KeyedList<T>,
    pub connection: ConnectionState,
    /// Frames decoded and applied since the feed started.
    pub applied: u64,
    /// Frames dropped because they failed to decode.
    pub dropped: u64,
}

impl<T> Default for FeedSnapshot<T> {
    fn default() -> Self {
        Self {
            entities: KeyedList::default(),
            connection: ConnectionState::Uninstantiated,
            applied: 0,
            dropped: 0,
        }
    }
}

impl<T> FeedSnapshot<T> {
    pub fn status(&self) -> DashboardStatus {
        self.connection.into()
    }
}

/// Applies raw frames to a feed's list, one at a time.
pub struct FeedSynchronizer<R: FeedReducer> {
    entities: KeyedList<R::Entity>,
    applied: u64,
    dropped: u64,
    _reducer: PhantomData<R>,
}

impl<R: FeedReducer> Default for FeedSynchronizer<R> {
    fn default() -> Self {
        Self {
            entities: KeyedList::default(),
            applied: 0,
            dropped: 0,
            _reducer: PhantomData,
        }
    }
}

impl<R: FeedReducer> FeedSynchronizer<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entities(&self) -> &KeyedList<R::Entity> {
        &self.entities
    }

    /// Decode and apply one frame. Malformed frames are logged and dropped;
    /// returns whether the frame was applied.
    pub fn handle_frame(&mut self, text: &str) -> bool {
        let event = match decode_frame::<R::Event>(R::NAME, text) {
            Ok(event) => event,
            Err(e) => {
                self.dropped += 1;
                warn!(
                    feed = R::NAME,
                    error = %e,
                    frame = %frame_excerpt(text, LOG_EXCERPT_CHARS),
                    "Dropping malformed frame"
                );
                return false;
            }
        };

        let kind = R::event_kind(&event);
        let id = R::event_id(&event).map(str::to_string);
        let (next, applied) = reduce::<R>(&self.entities, event);
        match applied {
            Applied::Missing => {
                debug!(feed = R::NAME, event = kind, id = ?id, "Event for unknown id ignored")
            }
            Applied::Replaced { len } => {
                debug!(feed = R::NAME, event = kind, len, "Snapshot applied")
            }
            other => {
                debug!(feed = R::NAME, event = kind, id = ?id, applied = ?other, "Event applied")
            }
        }
        self.entities = next;
        self.applied += 1;
        true
    }

    pub fn snapshot(&self, connection: ConnectionState) -> FeedSnapshot<R::Entity> {
        FeedSnapshot {
            entities: self.entities.clone(),
            connection,
            applied: self.applied,
            dropped: self.dropped,
        }
    }
}

/// Running feed: connection manager plus synchronizer.
pub struct FeedHandle<T> {
    snapshots: watch::Receiver<FeedSnapshot<T>>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl<T: Clone> FeedHandle<T> {
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot<T>> {
        self.snapshots.clone()
    }

    pub fn current(&self) -> FeedSnapshot<T> {
        self.snapshots.borrow().clone()
    }

    /// Close the socket and wait for both tasks to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Feed task ended abnormally");
            }
        }
    }
}

/// Start a live feed following `url_rx`.
///
/// Cancelling `cancel` (or calling [`FeedHandle::shutdown`]) tears the
/// socket down; the last snapshot stays readable.
pub fn spawn_feed<R: FeedReducer>(
    url_rx: watch::Receiver<Option<Url>>,
    options: ConnectionOptions,
    cancel: CancellationToken,
) -> FeedHandle<R::Entity> {
    let conn = ConnectionManager::spawn(R::NAME, url_rx, options, cancel.child_token());
    let (snapshot_tx, snapshot_rx) = watch::channel(FeedSnapshot::default());
    let sync_task = tokio::spawn(run_synchronizer::<R>(conn.state, conn.frames, snapshot_tx));

    FeedHandle {
        snapshots: snapshot_rx,
        cancel,
        tasks: vec![conn.task, sync_task],
    }
}

async fn run_synchronizer<R: FeedReducer>(
    mut state_rx: watch::Receiver<ConnectionState>,
    mut frames: mpsc::Receiver<String>,
    snapshot_tx: watch::Sender<FeedSnapshot<R::Entity>>,
) {
    let mut sync = FeedSynchronizer::<R>::new();
    let mut connection = *state_rx.borrow_and_update();
    snapshot_tx.send_replace(sync.snapshot(connection));

    loop {
        tokio::select! {
            biased;
            Ok(()) = state_rx.changed() => {
                connection = *state_rx.borrow_and_update();
            }
            frame = frames.recv() => match frame {
                Some(text) => {
                    sync.handle_frame(&text);
                }
                None => break,
            }
        }
        snapshot_tx.send_replace(sync.snapshot(connection));
    }

    connection = *state_rx.borrow();
    snapshot_tx.send_replace(sync.snapshot(connection));
    debug!(
        feed = R::NAME,
        applied = sync.applied,
        dropped = sync.dropped,
        "Synchronizer stopped"
    );
}

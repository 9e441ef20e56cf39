//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the todo engine operations to Dart via FRB.
//! - Validate titles at the UI boundary before calling the engine.
//! - Collect acknowledgement outcomes so the UI can display their messages.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Local mutation and persistence finish before a call returns; the
//!   acknowledgement message arrives later through the inbox.
//! - Inbox entries keep dispatch order among completed acknowledgements.
//! - The inbox holds at most `INBOX_CAPACITY` entries; overflow evicts the
//!   oldest completed entry first, then the oldest pending one.

use log::warn;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use todo_core::config::DEFAULT_DB_FILE_NAME;
use todo_core::{
    core_version as core_version_inner, format_timestamp, init_logging as init_logging_inner,
    ping as ping_inner, validate_title, AckResponse, AckResult, Change, Item,
    ItemCollectionEngine, ItemId, PendingAck, Receipt, SqliteKvStore, SystemClock, TodoConfig,
};

const ACK_POLL_INTERVAL: Duration = Duration::from_millis(10);
const INBOX_CAPACITY: usize = 128;

static SESSION: Mutex<Option<TodoSession>> = Mutex::new(None);

struct TodoSession {
    config: TodoConfig,
    engine: ItemCollectionEngine<SqliteKvStore>,
    inbox: Vec<PendingAck>,
}

impl TodoSession {
    fn open(config: TodoConfig) -> Result<Self, String> {
        let store = config.open_store().map_err(|err| err.to_string())?;
        let engine =
            ItemCollectionEngine::open(store, config.ack_client(), std::sync::Arc::new(SystemClock));
        Ok(Self {
            config,
            engine,
            inbox: Vec::new(),
        })
    }

    fn track(&mut self, receipt: Receipt) -> TodoActionResponse {
        match receipt {
            Receipt::Rejected(err) => TodoActionResponse::failure(err.to_string()),
            Receipt::Dispatched {
                change,
                persisted,
                item_id,
                ack,
            } => {
                self.enqueue(ack);
                TodoActionResponse {
                    ok: true,
                    item_id: Some(item_id.to_string()),
                    changed: change == Change::Changed,
                    persisted,
                    message: String::new(),
                }
            }
        }
    }

    fn enqueue(&mut self, ack: PendingAck) {
        if self.inbox.len() >= INBOX_CAPACITY {
            let index = self
                .inbox
                .iter_mut()
                .position(|pending| pending.is_done())
                .unwrap_or(0);
            let evicted = self.inbox.remove(index);
            warn!(
                "event=ack_inbox module=ffi status=evicted method={} capacity={}",
                evicted.method(),
                INBOX_CAPACITY
            );
        }
        self.inbox.push(ack);
    }

    /// Removes completed acknowledgements, leaving pending ones queued.
    fn take_completed(&mut self) -> Vec<TodoAckNotice> {
        let mut notices = Vec::new();
        let mut still_pending = Vec::with_capacity(self.inbox.len());
        for mut pending in self.inbox.drain(..) {
            if pending.is_done() {
                let method = pending.method().to_string();
                notices.push(TodoAckNotice::from_outcome(method, pending.wait()));
            } else {
                still_pending.push(pending);
            }
        }
        self.inbox = still_pending;
        notices
    }
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One item as shown by the list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoItemView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub completed: bool,
    /// RFC 3339 with milliseconds.
    pub created_at: String,
    /// RFC 3339 with milliseconds.
    pub updated_at: String,
}

impl From<&Item> for TodoItemView {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.to_string(),
            title: item.title.clone(),
            content: item.content.clone(),
            completed: item.completed,
            created_at: format_timestamp(&item.created_at),
            updated_at: format_timestamp(&item.updated_at),
        }
    }
}

/// List envelope, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoListResponse {
    pub ok: bool,
    pub items: Vec<TodoItemView>,
    /// Count of items not yet completed.
    pub remaining: u32,
    pub message: String,
}

/// Result envelope for create/toggle/update/delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoActionResponse {
    /// False when input was rejected or the store could not be opened.
    pub ok: bool,
    /// Created or targeted item id.
    pub item_id: Option<String>,
    /// False when the id matched nothing.
    pub changed: bool,
    /// Whether the change reached durable storage.
    pub persisted: bool,
    /// Failure reason; empty on success.
    pub message: String,
}

impl TodoActionResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            item_id: None,
            changed: false,
            persisted: false,
            message: message.into(),
        }
    }
}

/// One finished acknowledgement, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoAckNotice {
    /// HTTP method that was acknowledged.
    pub method: String,
    /// HTTP status when a response arrived.
    pub status: Option<u16>,
    /// Whether the endpoint answered with a 2xx status.
    pub ok: bool,
    /// Endpoint message verbatim, or the delivery error text.
    pub message: String,
}

impl TodoAckNotice {
    fn from_outcome(method: String, outcome: AckResult<AckResponse>) -> Self {
        match outcome {
            Ok(response) => Self {
                method,
                status: Some(response.status),
                ok: response.is_success(),
                message: response.message,
            },
            Err(err) => Self {
                method,
                status: None,
                ok: false,
                message: err.to_string(),
            },
        }
    }
}

/// Points the engine at a database file and acknowledgement endpoint.
///
/// Input semantics:
/// - `db_path`: absolute path of the SQLite file (created when missing).
/// - `ack_url`: remote endpoint URL; `None` or blank uses the in-process
///   endpoint.
///
/// # FFI contract
/// - Reuses the active session when the configuration is unchanged.
/// - Otherwise hydrates a new session; pending acknowledgements of the
///   previous session are dropped.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_todo_store(db_path: String, ack_url: Option<String>) -> String {
    let config = TodoConfig::new(db_path.trim()).with_ack_url(ack_url.as_deref());
    let mut session = lock_session();
    if session.as_ref().is_some_and(|active| active.config == config) {
        return String::new();
    }
    match TodoSession::open(config) {
        Ok(opened) => {
            *session = Some(opened);
            String::new()
        }
        Err(err) => err,
    }
}

/// Lists all items, newest first.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_list() -> TodoListResponse {
    match with_session(|session| {
        let items = session
            .engine
            .items()
            .iter()
            .map(TodoItemView::from)
            .collect::<Vec<_>>();
        let remaining = u32::try_from(session.engine.remaining_count()).unwrap_or(u32::MAX);
        (items, remaining)
    }) {
        Ok((items, remaining)) => TodoListResponse {
            ok: true,
            items,
            remaining,
            message: String::new(),
        },
        Err(err) => TodoListResponse {
            ok: false,
            items: Vec::new(),
            remaining: 0,
            message: format!("todo_list failed: {err}"),
        },
    }
}

/// Adds a new item at the top of the list.
///
/// # FFI contract
/// - Blank titles return `ok=false` and dispatch no acknowledgement.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_create(title: String, content: String) -> TodoActionResponse {
    if let Err(err) = validate_title(&title) {
        return TodoActionResponse::failure(err.to_string());
    }
    act("todo_create", |session| {
        let receipt = session.engine.create(&title, &content);
        session.track(receipt)
    })
}

/// Flips the completion flag of one item.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_toggle(id: String) -> TodoActionResponse {
    with_item_id("todo_toggle", id, |session, id| {
        let receipt = session.engine.toggle(&id);
        session.track(receipt)
    })
}

/// Replaces title and content of one item.
///
/// # FFI contract
/// - Blank titles return `ok=false`; the item stays as it was.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_update(id: String, title: String, content: String) -> TodoActionResponse {
    if let Err(err) = validate_title(&title) {
        return TodoActionResponse::failure(err.to_string());
    }
    with_item_id("todo_update", id, |session, id| {
        let receipt = session.engine.update(&id, &title, &content);
        session.track(receipt)
    })
}

/// Removes one item.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_delete(id: String) -> TodoActionResponse {
    with_item_id("todo_delete", id, |session, id| {
        let receipt = session.engine.delete(&id);
        session.track(receipt)
    })
}

/// Returns acknowledgements that have completed since the last call.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Returns an empty list when no session is open; never opens one.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_take_acknowledgements() -> Vec<TodoAckNotice> {
    drain_inbox().map_or_else(Vec::new, |(notices, _)| notices)
}

/// Waits up to `timeout_ms` for in-flight acknowledgements, then returns
/// every completed one.
///
/// # FFI contract
/// - Blocking; call from a background isolate.
/// - The session lock is released between polls.
/// - Returns immediately with an empty list when no session is open.
pub fn todo_await_acknowledgements(timeout_ms: u32) -> Vec<TodoAckNotice> {
    let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
    let mut notices = Vec::new();
    loop {
        let Some((mut batch, pending)) = drain_inbox() else {
            return notices;
        };
        notices.append(&mut batch);
        if pending == 0 || Instant::now() >= deadline {
            return notices;
        }
        thread::sleep(ACK_POLL_INTERVAL);
    }
}

fn act(
    operation: &str,
    f: impl FnOnce(&mut TodoSession) -> TodoActionResponse,
) -> TodoActionResponse {
    match with_session(f) {
        Ok(response) => response,
        Err(err) => TodoActionResponse::failure(format!("{operation} failed: {err}")),
    }
}

/// Ids are passed through verbatim; unknown or blank ids simply match
/// nothing and still dispatch their acknowledgement.
fn with_item_id(
    operation: &str,
    id: String,
    f: impl FnOnce(&mut TodoSession, ItemId) -> TodoActionResponse,
) -> TodoActionResponse {
    let id = ItemId::lookup(id);
    act(operation, |session| f(session, id))
}

/// Takes completed notices and reports how many remain pending.
fn drain_inbox() -> Option<(Vec<TodoAckNotice>, usize)> {
    let mut session = lock_session();
    let active = session.as_mut()?;
    let notices = active.take_completed();
    Some((notices, active.inbox.len()))
}

/// Runs `f` on the active session, opening the default one on first use.
fn with_session<T>(f: impl FnOnce(&mut TodoSession) -> T) -> Result<T, String> {
    let mut session = lock_session();
    if session.is_none() {
        *session = Some(TodoSession::open(TodoConfig::new(default_db_path()))?);
    }
    match session.as_mut() {
        Some(active) => Ok(f(active)),
        None => Err("todo session unavailable".to_string()),
    }
}

fn lock_session() -> MutexGuard<'static, Option<TodoSession>> {
    SESSION
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn default_db_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::{
        configure_todo_store, core_version, init_logging, lock_session, ping,
        todo_await_acknowledgements, todo_create, todo_delete, todo_list,
        todo_take_acknowledgements, todo_toggle, todo_update, TodoSession, INBOX_CAPACITY,
    };
    use std::sync::Mutex;
    use todo_core::ack::endpoint::{CREATED_MESSAGE, DELETED_MESSAGE, UPDATED_MESSAGE};
    use todo_core::TodoConfig;

    /// Serializes tests that share the process-wide session.
    static SESSION_TESTS: Mutex<()> = Mutex::new(());

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn configure_rejects_relative_db_path() {
        let error = configure_todo_store("todo.sqlite3".to_string(), None);
        assert!(error.contains("absolute"), "{error}");
    }

    #[test]
    fn blank_titles_are_rejected_at_the_boundary() {
        let created = todo_create("   ".to_string(), "content".to_string());
        assert!(!created.ok);
        assert!(created.item_id.is_none());

        let updated = todo_update("any".to_string(), "".to_string(), "x".to_string());
        assert!(!updated.ok);
    }

    #[test]
    fn acknowledgement_calls_do_not_open_a_session() {
        let _guard = SESSION_TESTS.lock().unwrap_or_else(|p| p.into_inner());
        *lock_session() = None;

        assert!(todo_take_acknowledgements().is_empty());
        assert!(todo_await_acknowledgements(50).is_empty());
        assert!(lock_session().is_none());
    }

    #[test]
    fn inbox_never_exceeds_capacity() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut session =
            TodoSession::open(TodoConfig::new(dir.path().join("inbox.sqlite3"))).expect("open");

        for index in 0..INBOX_CAPACITY + 8 {
            let receipt = session.engine.create(&format!("item {index}"), "");
            assert!(session.track(receipt).ok);
            assert!(session.inbox.len() <= INBOX_CAPACITY);
        }
        assert_eq!(session.inbox.len(), INBOX_CAPACITY);
        assert_eq!(session.engine.items().len(), INBOX_CAPACITY + 8);
    }

    #[test]
    fn full_flow_persists_and_reports_acknowledgements() {
        let _guard = SESSION_TESTS.lock().unwrap_or_else(|p| p.into_inner());
        let dir = tempfile::tempdir().expect("temp dir");
        let db_path = dir.path().join("flow.sqlite3");
        let configured = configure_todo_store(db_path.to_string_lossy().to_string(), None);
        assert!(configured.is_empty(), "{configured}");
        todo_await_acknowledgements(5_000);

        let first = todo_create("A".to_string(), String::new());
        let second = todo_create("Buy milk".to_string(), "2%".to_string());
        assert!(first.ok && second.ok, "{} {}", first.message, second.message);
        let id = second.item_id.clone().expect("created id");

        let listed = todo_list();
        let titles: Vec<_> = listed.items.iter().map(|item| item.title.as_str()).collect();
        assert_eq!(titles, vec!["Buy milk", "A"]);
        assert_eq!(listed.remaining, 2);

        let toggled = todo_toggle(id.clone());
        assert!(toggled.changed && toggled.persisted);
        assert_eq!(todo_list().remaining, 1);

        let updated = todo_update(id.clone(), "Buy oat milk".to_string(), "2%".to_string());
        assert!(updated.changed);

        let missing = todo_delete("missing-id".to_string());
        assert!(missing.ok);
        assert!(!missing.changed);

        let blank = todo_toggle("   ".to_string());
        assert!(blank.ok, "{}", blank.message);
        assert!(!blank.changed);

        let deleted = todo_delete(id);
        assert!(deleted.changed);

        let notices = todo_await_acknowledgements(5_000);
        // Workers may finish out of order across polls.
        let mut messages: Vec<_> = notices.iter().map(|notice| notice.message.as_str()).collect();
        messages.sort_unstable();
        let mut expected = vec![
            CREATED_MESSAGE,
            CREATED_MESSAGE,
            UPDATED_MESSAGE,
            UPDATED_MESSAGE,
            UPDATED_MESSAGE,
            DELETED_MESSAGE,
            DELETED_MESSAGE,
        ];
        expected.sort_unstable();
        assert_eq!(messages, expected);
        assert!(notices.iter().all(|notice| notice.ok));
        assert!(todo_take_acknowledgements().is_empty());

        // Reconfiguring to another file and back rehydrates from disk.
        let other = dir.path().join("other.sqlite3");
        assert!(configure_todo_store(other.to_string_lossy().to_string(), None).is_empty());
        assert!(todo_list().items.is_empty());
        assert!(configure_todo_store(db_path.to_string_lossy().to_string(), None).is_empty());
        let reloaded = todo_list();
        assert_eq!(reloaded.items.len(), 1);
        assert_eq!(reloaded.items[0].title, "A");
    }
}

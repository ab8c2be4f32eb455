use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracechain_types::{Actor, ActorId, BatchId, Block, BlockId, Event, EventId};
use tracing::{debug, error, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::memory::{StateLock, StoreState};
use crate::traits::{ActorDirectory, BlockStore, EventStore};

/// File name of the journal inside a data directory.
pub const JOURNAL_FILE_NAME: &str = "ledger.jsonl";

/// One line of the journal.
///
/// On-disk format: one compact JSON object per line, tagged by `record`:
/// ```text
/// {"record":"event","id":"…","batchId":"B1","type":"BATCH_CREATED",…}
/// {"record":"block","id":"…","index":0,"prevHash":"GENESIS",…,"eventIds":["…"]}
/// {"record":"actor","id":"…","name":"Green Farm"}
/// ```
///
/// A `block` record also commits the events it lists, so a block and its
/// event annotations become durable in a single write.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum JournalRecord {
    Event(Event),
    Block(Block),
    Actor(Actor),
}

/// Durability options for [`JournalStore`].
#[derive(Clone, Debug)]
pub struct JournalOptions {
    /// `fsync` after every record (safest, highest latency).
    pub sync_every_write: bool,
}

impl Default for JournalOptions {
    fn default() -> Self {
        Self {
            sync_every_write: true,
        }
    }
}

/// Ledger store backed by an append-only JSON-lines journal.
///
/// Every mutation is validated against the in-memory index, written and
/// flushed to the journal, and only then made visible. On open the journal is
/// replayed front-to-back without validation, so a journal edited by hand
/// loads as-is and any tampering is left for the chain verifier to find.
///
/// Recovery: an undecodable final line with no trailing newline is a torn
/// write from a crash; it is logged and truncated away. A decodable final
/// line missing only its newline is kept and terminated. Any other
/// undecodable line is reported as [`StoreError::CorruptJournal`]. A failed
/// append truncates the file back to where the record started.
pub struct JournalStore {
    path: PathBuf,
    options: JournalOptions,
    state: RwLock<StoreState>,
    /// Serializes appends; always acquired after the state write lock.
    writer: Mutex<File>,
}

impl StateLock for JournalStore {
    fn state(&self) -> &RwLock<StoreState> {
        &self.state
    }
}

impl JournalStore {
    /// Open (or create) `ledger.jsonl` inside `data_dir`.
    pub fn open_dir(data_dir: &Path, options: JournalOptions) -> StoreResult<Self> {
        Self::open(&data_dir.join(JOURNAL_FILE_NAME), options)
    }

    /// Open (or create) the journal at `path` and replay it.
    pub fn open(path: &Path, options: JournalOptions) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let replayed = replay(path, &file)?;
        let file_len = file.metadata()?.len();
        if replayed.valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len = replayed.valid_len,
                file_len,
                "truncating torn journal tail"
            );
            file.set_len(replayed.valid_len)?;
        }
        if replayed.unterminated {
            // The next record must not be glued onto the last one.
            warn!(path = %path.display(), "terminating final journal record");
            write_line(&mut file, b"\n", true)?;
        }

        info!(path = %path.display(), records = replayed.records, "journal opened");
        Ok(Self {
            path: path.to_path_buf(),
            options,
            state: RwLock::new(replayed.state),
            writer: Mutex::new(file),
        })
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: &JournalRecord) -> StoreResult<()> {
        let mut line =
            serde_json::to_vec(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        line.push(b'\n');

        let mut file = self.writer.lock().map_err(|_| StoreError::LockPoisoned)?;
        let start = file.metadata()?.len();
        if let Err(e) = write_line(&mut file, &line, self.options.sync_every_write) {
            warn!(path = %self.path.display(), error = %e, "journal append failed, rolling back");
            if let Err(rollback) = file.set_len(start) {
                error!(
                    path = %self.path.display(),
                    error = %rollback,
                    "could not roll back partial journal record"
                );
            }
            return Err(e.into());
        }

        debug!(len = line.len(), "journal append");
        Ok(())
    }
}

fn write_line(file: &mut File, line: &[u8], sync: bool) -> std::io::Result<()> {
    file.write_all(line)?;
    file.flush()?;
    if sync {
        file.sync_data()?;
    }
    Ok(())
}

/// Outcome of replaying a journal file.
struct Replayed {
    state: StoreState,
    records: usize,
    /// Byte length of the decodable prefix.
    valid_len: u64,
    /// The last decoded record is missing its trailing newline.
    unterminated: bool,
}

/// Replay the journal into fresh state.
fn replay(path: &Path, file: &File) -> StoreResult<Replayed> {
    let mut state = StoreState::default();
    let mut reader = BufReader::new(file.try_clone()?);
    let mut records = 0usize;
    let mut valid_len = 0u64;
    let mut line_no = 0usize;
    let mut unterminated = false;
    let mut pending_error: Option<(usize, String)> = None;
    let mut buf = String::new();

    loop {
        buf.clear();
        let read = reader.read_line(&mut buf)?;
        if read == 0 {
            break;
        }
        line_no += 1;

        let trimmed = buf.trim();
        if trimmed.is_empty() {
            valid_len += read as u64;
            continue;
        }

        match serde_json::from_str::<JournalRecord>(trimmed) {
            Ok(record) => {
                apply(&mut state, record);
                records += 1;
                valid_len += read as u64;
                unterminated = !buf.ends_with('\n');
            }
            // Only an unterminated final line can be a torn write.
            Err(e) if !buf.ends_with('\n') => pending_error = Some((line_no, e.to_string())),
            Err(e) => {
                return Err(StoreError::CorruptJournal {
                    path: path.to_path_buf(),
                    line: line_no,
                    reason: e.to_string(),
                })
            }
        }
    }

    if let Some((line, reason)) = pending_error {
        warn!(path = %path.display(), line, %reason, "ignoring torn journal record");
    }

    Ok(Replayed {
        state,
        records,
        valid_len,
        unterminated,
    })
}

fn apply(state: &mut StoreState, record: JournalRecord) {
    match record {
        JournalRecord::Event(event) => state.apply_insert_event(event),
        JournalRecord::Block(block) => state.apply_commit_block(block),
        JournalRecord::Actor(actor) => state.apply_register_actor(actor),
    }
}

impl EventStore for JournalStore {
    fn insert_event(&self, event: &Event) -> StoreResult<()> {
        let mut state = self.write_state()?;
        state.check_insert_event(event)?;
        self.append(&JournalRecord::Event(event.clone()))?;
        state.apply_insert_event(event.clone());
        Ok(())
    }

    fn get_event(&self, id: &EventId) -> StoreResult<Option<Event>> {
        Ok(self.read_state()?.get_events(&[*id]).pop().flatten())
    }

    fn get_events(&self, ids: &[EventId]) -> StoreResult<Vec<Option<Event>>> {
        Ok(self.read_state()?.get_events(ids))
    }

    fn events_for_batch(&self, batch: &BatchId) -> StoreResult<Vec<Event>> {
        Ok(self.read_state()?.events_for_batch(batch))
    }
}

impl BlockStore for JournalStore {
    fn tip(&self) -> StoreResult<Option<Block>> {
        Ok(self.read_state()?.tip().cloned())
    }

    fn commit_block(&self, block: &Block) -> StoreResult<()> {
        let mut state = self.write_state()?;
        state.check_commit_block(block)?;
        self.append(&JournalRecord::Block(block.clone()))?;
        state.apply_commit_block(block.clone());
        Ok(())
    }

    fn blocks(&self) -> StoreResult<Vec<Block>> {
        Ok(self.read_state()?.sorted_blocks())
    }

    fn get_block(&self, id: &BlockId) -> StoreResult<Option<Block>> {
        Ok(self.read_state()?.get_block(id))
    }

    fn block_count(&self) -> StoreResult<u64> {
        Ok(self.read_state()?.block_count())
    }
}

impl ActorDirectory for JournalStore {
    fn register_actor(&self, actor: &Actor) -> StoreResult<()> {
        let mut state = self.write_state()?;
        self.append(&JournalRecord::Actor(actor.clone()))?;
        state.apply_register_actor(actor.clone());
        Ok(())
    }

    fn get_actor(&self, id: &ActorId) -> StoreResult<Option<Actor>> {
        Ok(self.read_state()?.get_actor(id))
    }
}

impl std::fmt::Debug for JournalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalStore")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish()
    }
}

//! Database management.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sled::{Config as SledConfig, Db};

use crate::config::Config;
use crate::error::{ShutdownError, ShutdownResult};
use switchyard_core::models::{BestPossibleStateOutput, Message};
use switchyard_core::stages::MessageStore;

pub type Tree = sled::Tree;

/// The default path to use for data storage.
pub const DEFAULT_DATA_PATH: &str = "/usr/local/switchyard/data";
/// The DB tree used for transition messages.
const TREE_MESSAGES: &str = "messages";
/// The DB tree used for controller metadata.
const TREE_METADATA: &str = "metadata";
/// The metadata key under which the last published best possible state is stored.
const KEY_BEST_POSSIBLE_STATE: &[u8] = b"best_possible_state";

/// The default path to use for data storage.
pub fn default_data_path() -> String {
    DEFAULT_DATA_PATH.to_string()
}

/// An abstraction over the Switchyard database.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    /// The underlying DB handle.
    db: Db,
}

impl Database {
    /// Open the database for usage.
    pub async fn new(config: Arc<Config>) -> Result<Self> {
        // Determine the database path, and ensure it exists.
        let dbpath = PathBuf::from(&config.storage_data_path).join(config.cluster_name.as_str());
        tokio::fs::create_dir_all(&dbpath)
            .await
            .context("error creating dir for switchyard database")?;

        Self::spawn_blocking(move || -> Result<Self> {
            let db = SledConfig::new().path(dbpath).open()?;
            let inner = Arc::new(DatabaseInner { db });
            Ok(Self { inner })
        })
        .await?
    }

    /// Spawn a blocking database-related function, returning a ShutdownError if anything goes
    /// wrong related to spawning & joining.
    #[tracing::instrument(level = "trace", skip(f), err)]
    pub async fn spawn_blocking<F, R>(f: F) -> ShutdownResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|err| ShutdownError::from(anyhow::Error::from(err)))
    }

    /// Get a handle to the transition messages tree.
    pub async fn get_messages_tree(&self) -> ShutdownResult<MessageTree> {
        let (db, name) = (self.inner.db.clone(), TREE_MESSAGES);
        let tree = Self::spawn_blocking(move || -> Result<Tree> { db.open_tree(name).context("error opening messages tree") })
            .await
            .and_then(|res| res.map_err(ShutdownError::from))?;
        Ok(MessageTree { tree })
    }

    /// Get a handle to the controller metadata tree.
    pub async fn get_metadata_tree(&self) -> ShutdownResult<Tree> {
        let (db, name) = (self.inner.db.clone(), TREE_METADATA);
        Self::spawn_blocking(move || -> Result<Tree> { db.open_tree(name).context("error opening metadata tree") })
            .await
            .and_then(|res| res.map_err(ShutdownError::from))
    }
}

/// Record the given best possible state as the last one published.
pub fn put_best_possible_state(tree: &Tree, output: &BestPossibleStateOutput) -> Result<()> {
    let bytes = serde_json::to_vec(output).context("error encoding best possible state")?;
    tree.insert(KEY_BEST_POSSIBLE_STATE, bytes).context("error recording best possible state")?;
    Ok(())
}

/// Fetch the last published best possible state, if any.
pub fn get_best_possible_state(tree: &Tree) -> Result<Option<BestPossibleStateOutput>> {
    tree.get(KEY_BEST_POSSIBLE_STATE)
        .context("error fetching best possible state")?
        .map(|bytes| serde_json::from_slice(&bytes).context("error decoding best possible state"))
        .transpose()
}

/// The tree holding transition messages.
///
/// Messages are keyed as `{target}/{resource}/{partition}`, so that all messages bound for a
/// worker share a prefix and each partition holds at most one pending message per worker.
#[derive(Clone)]
pub struct MessageTree {
    tree: Tree,
}

impl MessageTree {
    /// All messages currently held for the given worker.
    pub fn messages_for(&self, worker: &str) -> Result<Vec<Message>> {
        let prefix = format!("{}/", worker);
        self.tree.scan_prefix(prefix.as_bytes()).map(decode_message).collect()
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.tree.flush().context("error flushing database state")?;
        Ok(())
    }
}

fn message_key(message: &Message) -> String {
    format!("{}/{}/{}", message.tgt_name, message.resource, message.partition)
}

fn decode_message(kv_res: sled::Result<(sled::IVec, sled::IVec)>) -> Result<Message> {
    let (_key, val) = kv_res.context("error returned during key/value iteration from database")?;
    serde_json::from_slice(&val).context("error decoding message from storage")
}

impl MessageStore for MessageTree {
    fn pending(&self) -> Result<Vec<Message>> {
        self.tree.iter().map(decode_message).collect()
    }

    fn put(&self, message: &Message) -> Result<bool> {
        let key = message_key(message);
        let current = self.tree.get(key.as_bytes()).context("error fetching pending message")?;
        if let Some(bytes) = current.as_ref() {
            let pending: Message = serde_json::from_slice(bytes).context("error decoding message from storage")?;
            if pending.is_same_transition(message) {
                return Ok(false);
            }
        }
        let val = serde_json::to_vec(message).context("error encoding message")?;
        let res = self
            .tree
            .compare_and_swap(key.as_bytes(), current, Some(val))
            .context("error writing message to storage")?;
        Ok(res.is_ok())
    }

    fn remove(&self, message: &Message) -> Result<bool> {
        let key = message_key(message);
        let current = match self.tree.get(key.as_bytes()).context("error fetching pending message")? {
            Some(current) => current,
            None => return Ok(false),
        };
        let pending: Message = serde_json::from_slice(&current).context("error decoding message from storage")?;
        if pending.id != message.id {
            return Ok(false);
        }
        let res = self
            .tree
            .compare_and_swap(key.as_bytes(), Some(current), None::<&[u8]>)
            .context("error removing message from storage")?;
        Ok(res.is_ok())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn message_put_skips_identical_pending_transition() -> Result<()> {
        let (config, _tmpdir) = Config::new_test()?;
        let db = Database::new(config).await?;
        let tree = db.get_messages_tree().await?;
        let (m0, m1) = (
            Message::new("a", "db", "db_0", "OFFLINE", "SLAVE", "MasterSlave"),
            Message::new("b", "db", "db_0", "OFFLINE", "MASTER", "MasterSlave"),
        );
        let m0_again = Message::new("a", "db", "db_0", "OFFLINE", "SLAVE", "MasterSlave");

        assert!(tree.put(&m0)?, "expected first write of m0 to be new");
        assert!(!tree.put(&m0_again)?, "expected the repeated transition to be a no-op while pending");
        assert!(tree.put(&m1)?, "expected first write of m1 to be new");
        tree.flush()?;

        let for_a = tree.messages_for("a")?;
        assert_eq!(for_a, vec![m0], "unexpected messages for worker a");
        let for_b = tree.messages_for("b")?;
        assert_eq!(for_b, vec![m1], "unexpected messages for worker b");
        assert_eq!(tree.pending()?.len(), 2, "expected 2 pending messages");
        Ok(())
    }

    #[tokio::test]
    async fn message_put_replaces_other_transition_for_partition() -> Result<()> {
        let (config, _tmpdir) = Config::new_test()?;
        let db = Database::new(config).await?;
        let tree = db.get_messages_tree().await?;
        let stale = Message::new("a", "db", "db_0", "OFFLINE", "SLAVE", "MasterSlave");
        let next = Message::new("a", "db", "db_0", "SLAVE", "MASTER", "MasterSlave");

        assert!(tree.put(&stale)?, "expected first write to be new");
        assert!(tree.put(&next)?, "expected a different transition to replace the pending one");

        assert_eq!(tree.messages_for("a")?, vec![next]);
        Ok(())
    }

    #[tokio::test]
    async fn removed_message_can_be_sent_again() -> Result<()> {
        let (config, _tmpdir) = Config::new_test()?;
        let db = Database::new(config).await?;
        let tree = db.get_messages_tree().await?;
        let first = Message::new("a", "db", "db_0", "OFFLINE", "SLAVE", "MasterSlave");
        let again = Message::new("a", "db", "db_0", "OFFLINE", "SLAVE", "MasterSlave");

        assert!(tree.put(&first)?, "expected first write to be new");
        assert!(!tree.remove(&again)?, "expected removal of a message which was never written to be a no-op");
        assert!(tree.remove(&first)?, "expected the pending message to be removed");
        assert!(!tree.remove(&first)?, "expected a second removal to be a no-op");
        assert!(tree.put(&again)?, "expected the transition to be written again once acknowledged");

        assert_eq!(tree.messages_for("a")?, vec![again]);
        Ok(())
    }

    #[tokio::test]
    async fn best_possible_state_round_trips() -> Result<()> {
        let (config, _tmpdir) = Config::new_test()?;
        let db = Database::new(config).await?;
        let tree = db.get_metadata_tree().await?;
        assert!(get_best_possible_state(&tree)?.is_none(), "expected no best possible state in a pristine database");

        let mut output = BestPossibleStateOutput::default();
        output.set_state("db", "db_0", vec![("a".to_string(), "MASTER".to_string())].into_iter().collect());
        put_best_possible_state(&tree, &output)?;

        assert_eq!(get_best_possible_state(&tree)?, Some(output));
        Ok(())
    }
}

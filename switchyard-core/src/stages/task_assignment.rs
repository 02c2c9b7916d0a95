use crate::error::{Error, Result};
use crate::models::Message;
use crate::stages::{ClusterEvent, Stage};

/// A store into which transition messages are written for delivery to their target worker.
///
/// A store holds at most one pending message per worker, resource & partition. Workers
/// acknowledge a message by removing it.
pub trait MessageStore {
    /// All messages currently pending delivery.
    fn pending(&self) -> anyhow::Result<Vec<Message>>;

    /// Write the given message, replacing any other message pending for the same worker,
    /// resource & partition.
    ///
    /// If the pending message already instructs the same transition, nothing is written. Returns
    /// `true` if the message was newly written.
    fn put(&self, message: &Message) -> anyhow::Result<bool>;

    /// Remove the given message if it is still pending. Returns `true` if it was removed.
    fn remove(&self, message: &Message) -> anyhow::Result<bool>;
}

impl<S: MessageStore + ?Sized> MessageStore for &S {
    fn pending(&self) -> anyhow::Result<Vec<Message>> {
        (**self).pending()
    }

    fn put(&self, message: &Message) -> anyhow::Result<bool> {
        (**self).put(message)
    }

    fn remove(&self, message: &Message) -> anyhow::Result<bool> {
        (**self).remove(message)
    }
}

/// A stage writing all generated messages to a message store.
#[derive(Debug)]
pub struct TaskAssignmentStage<S> {
    store: S,
}

impl<S: MessageStore> TaskAssignmentStage<S> {
    /// Create a new instance.
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: MessageStore> Stage for TaskAssignmentStage<S> {
    fn name(&self) -> &'static str {
        "task_assignment"
    }

    #[tracing::instrument(level = "debug", skip(self, event), fields(event = %event.name))]
    fn process(&self, event: &mut ClusterEvent) -> Result<()> {
        let messages = event.messages.as_ref().ok_or(Error::MissingAttributes("MESSAGES"))?;

        // Pending messages which this pass no longer calls for are either complete or obsolete.
        let mut retired = 0;
        for pending in self.store.pending().map_err(Error::Store)? {
            if messages.iter().any(|message| message.is_same_transition(&pending)) {
                continue;
            }
            if self.store.remove(&pending).map_err(Error::Store)? {
                retired += 1;
                tracing::debug!(
                    tgt = %pending.tgt_name,
                    partition = %pending.partition,
                    to = %pending.to_state,
                    "retiring pending transition message",
                );
            }
        }

        let mut sent = 0;
        for message in messages {
            let is_new = self.store.put(message).map_err(Error::Store)?;
            if is_new {
                sent += 1;
                tracing::info!(
                    tgt = %message.tgt_name,
                    partition = %message.partition,
                    from = %message.from_state,
                    to = %message.to_state,
                    "sending transition message",
                );
            }
        }
        tracing::debug!(sent, retired, total = messages.len(), "transition messages written");
        Ok(())
    }
}

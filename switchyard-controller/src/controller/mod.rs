//! Cluster controller.
//!
//! The controller periodically re-reads the cluster snapshot, runs a full pass of the core
//! stages over it on a blocking thread, and publishes the results: transition messages are
//! written to the message tree and the best possible state is recorded in the metadata tree.
//!
//! Passes may complete out of order. Each pass is tagged with a generation number, and a pass
//! older than the last published generation is discarded.


use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::StreamExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream, ReceiverStream};

use crate::config::Config;
use crate::database::{self, Database, MessageTree, Tree};
use crate::error::ShutdownError;
use switchyard_core::models::ClusterSnapshot;
use switchyard_core::stages::{BestPossibleStateStage, ClusterEvent, MessageGenerationStage, ResourceComputationStage, Stage, TaskAssignmentStage};

/// A message bound for the cluster controller.
pub enum ClusterCtlMsg {
    /// A pass has finished computing.
    PassComputed { generation: u64, res: Result<ClusterEvent> },
}

/// A controller driving the cluster towards its best possible state.
pub struct ClusterCtl {
    /// The application's runtime config.
    config: Arc<Config>,
    /// The application's database system.
    _db: Database,
    /// The database tree holding transition messages.
    messages: MessageTree,
    /// The database tree holding controller metadata.
    metadata: Tree,

    /// A channel of inbound controller messages.
    events_tx: mpsc::Sender<ClusterCtlMsg>,
    /// A channel of inbound controller messages.
    events_rx: ReceiverStream<ClusterCtlMsg>,
    /// The interval at which passes are triggered.
    interval: IntervalStream,

    /// The generation of the most recently started pass.
    generation: u64,
    /// The generation of the most recently published pass.
    published_generation: u64,

    /// A channel used for triggering graceful shutdown.
    shutdown_tx: broadcast::Sender<()>,
    /// A channel used for triggering graceful shutdown.
    shutdown_rx: BroadcastStream<()>,
}

impl ClusterCtl {
    /// Create a new instance.
    pub async fn new(config: Arc<Config>, db: Database, shutdown_tx: broadcast::Sender<()>) -> Result<Self> {
        let messages = db.get_messages_tree().await?;
        let metadata = db.get_metadata_tree().await?;
        let (events_tx, events_rx) = mpsc::channel(100);
        let mut interval = tokio::time::interval(Duration::from_secs(config.recompute_interval_seconds));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        Ok(Self {
            config,
            _db: db,
            messages,
            metadata,
            events_tx,
            events_rx: ReceiverStream::new(events_rx),
            interval: IntervalStream::new(interval),
            generation: 0,
            published_generation: 0,
            shutdown_rx: BroadcastStream::new(shutdown_tx.subscribe()),
            shutdown_tx,
        })
    }

    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) -> Result<()> {
        tracing::debug!(cluster = %self.config.cluster_name, "cluster controller has started");

        loop {
            tokio::select! {
                Some(_) = self.interval.next() => self.handle_tick().await,
                Some(msg) = self.events_rx.next() => self.handle_msg(msg).await,
                _ = self.shutdown_rx.next() => break,
            }
        }

        tracing::debug!(
            cluster = %self.config.cluster_name,
            published_generation = self.published_generation,
            "cluster controller has shutdown"
        );
        Ok(())
    }

    async fn handle_msg(&mut self, msg: ClusterCtlMsg) {
        match msg {
            ClusterCtlMsg::PassComputed { generation, res } => self.handle_pass_computed(generation, res).await,
        }
    }

    /// Load the current snapshot and start a new pass over it.
    #[tracing::instrument(level = "trace", skip(self))]
    async fn handle_tick(&mut self) {
        let snapshot = match load_snapshot(&self.config.snapshot_path).await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                tracing::error!(error = ?err, path = %self.config.snapshot_path, "error loading cluster snapshot");
                return;
            }
        };

        self.generation += 1;
        let (generation, events_tx) = (self.generation, self.events_tx.clone());
        tokio::spawn(async move {
            let name = format!("pass-{}", generation);
            let res = Database::spawn_blocking(move || compute_pass(name, snapshot))
                .await
                .map_err(anyhow::Error::from)
                .and_then(|res| res);
            let _res = events_tx.send(ClusterCtlMsg::PassComputed { generation, res }).await;
        });
    }

    /// Handle a completed pass, publishing it unless a newer pass has already been published.
    #[tracing::instrument(level = "debug", skip(self, res))]
    async fn handle_pass_computed(&mut self, generation: u64, res: Result<ClusterEvent>) {
        if generation <= self.published_generation {
            tracing::debug!(published_generation = self.published_generation, "discarding superseded pass");
            return;
        }
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                self.handle_error(err, "error computing controller pass");
                return;
            }
        };
        for err in event.resource_errors.iter() {
            tracing::error!(error = %err, "resource excluded from controller pass");
        }

        match self.publish(event).await {
            Ok(()) => self.published_generation = generation,
            Err(err) => self.handle_error(err, "error publishing controller pass"),
        }
    }

    /// Write the messages of the given pass and record its best possible state.
    async fn publish(&self, mut event: ClusterEvent) -> Result<()> {
        let (messages, metadata) = (self.messages.clone(), self.metadata.clone());
        Database::spawn_blocking(move || -> Result<()> {
            TaskAssignmentStage::new(&messages).process(&mut event)?;
            messages.flush()?;
            if let Some(output) = event.best_possible_state.as_ref() {
                database::put_best_possible_state(&metadata, output)?;
                metadata.flush().context("error flushing database state")?;
            }
            Ok(())
        })
        .await??;
        Ok(())
    }

    fn handle_error(&self, err: anyhow::Error, msg: &'static str) {
        tracing::error!(error = ?err, "{}", msg);
        if err.downcast_ref::<ShutdownError>().is_some() {
            let _ = self.shutdown_tx.send(());
        }
    }
}

/// Load the cluster snapshot at the given path.
async fn load_snapshot(path: &str) -> Result<ClusterSnapshot> {
    let text = tokio::fs::read_to_string(path).await.context("error reading cluster snapshot")?;
    ClusterSnapshot::from_yaml(&text).context("error decoding cluster snapshot")
}

/// Compute a pass over the given snapshot, stopping short of task assignment.
fn compute_pass(name: String, snapshot: Arc<ClusterSnapshot>) -> Result<ClusterEvent> {
    let mut event = ClusterEvent::new(name, snapshot);
    let stages: [&dyn Stage; 3] = [&ResourceComputationStage, &BestPossibleStateStage, &MessageGenerationStage];
    for stage in stages {
        stage.process(&mut event).with_context(|| format!("error in {} stage", stage.name()))?;
    }
    Ok(event)
}

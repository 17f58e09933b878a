//! Group Actor
//!
//! Driver calls hold the instrument lock one command at a time, so two tasks
//! setting overlapping groups directly can interleave their member commands.
//! This module gives a group a single owner: a blocking task that receives
//! commands through a channel and runs each one to completion before
//! starting the next.
//!
//! # Example
//!
//! ```rust,ignore
//! use atten_rack::actor::spawn_group_actor;
//!
//! let (handle, join) = spawn_group_actor(group, 32);
//!
//! handle.set(20.0).await?;
//! assert!(handle.is_synchronized().await?);
//!
//! handle.shutdown().await;
//! let group = join.await?;
//! ```

use atten_core::{AttenError, Group, GroupSetError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::RackError;

/// Commands sent to a group actor
#[derive(Debug)]
pub enum GroupActorCommand {
    /// Set every member to `value`
    Set {
        /// Nominal attenuation in dB
        value: f64,
        /// Channel for the outcome
        response: oneshot::Sender<Result<(), GroupSetError>>,
    },

    /// Read the cached group value
    Get {
        /// Channel for the value
        response: oneshot::Sender<f64>,
    },

    /// Compare hardware against the cached value
    IsSynchronized {
        /// Channel for the outcome
        response: oneshot::Sender<Result<bool, AttenError>>,
    },

    /// Re-command the cached value
    Synchronize {
        /// Channel for the outcome
        response: oneshot::Sender<Result<(), GroupSetError>>,
    },

    /// Stop the actor and hand the group back through the join handle
    Shutdown,
}

/// Cloneable handle for talking to a group actor
#[derive(Debug, Clone)]
pub struct GroupActorHandle {
    name: String,
    cmd_tx: mpsc::Sender<GroupActorCommand>,
}

impl GroupActorHandle {
    /// Name of the group owned by the actor
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> GroupActorCommand,
    ) -> Result<T, RackError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RackError::ActorClosed)?;
        rx.await.map_err(|_| RackError::ActorClosed)
    }

    /// Set every member of the group to `value`
    pub async fn set(&self, value: impl Into<f64>) -> Result<(), RackError> {
        let value = value.into();
        self.request(|response| GroupActorCommand::Set { value, response })
            .await??;
        Ok(())
    }

    /// Cached group value
    pub async fn get(&self) -> Result<f64, RackError> {
        self.request(|response| GroupActorCommand::Get { response })
            .await
    }

    /// Whether every member reads back the cached value
    pub async fn is_synchronized(&self) -> Result<bool, RackError> {
        Ok(self
            .request(|response| GroupActorCommand::IsSynchronized { response })
            .await??)
    }

    /// Re-command the cached value to every member
    pub async fn synchronize(&self) -> Result<(), RackError> {
        self.request(|response| GroupActorCommand::Synchronize { response })
            .await??;
        Ok(())
    }

    /// Ask the actor to stop after the commands already queued
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(GroupActorCommand::Shutdown).await;
    }
}

/// Move `group` into a dedicated actor
///
/// Driver calls block, so the actor runs on the blocking thread pool. The
/// join handle resolves to the group once the actor stops, either through
/// [`GroupActorHandle::shutdown`] or when every handle has been dropped.
/// Must be called from within a tokio runtime.
pub fn spawn_group_actor(group: Group, buffer: usize) -> (GroupActorHandle, JoinHandle<Group>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(buffer.max(1));
    let handle = GroupActorHandle {
        name: group.name().to_string(),
        cmd_tx,
    };
    let join = tokio::task::spawn_blocking(move || run_group_actor(group, cmd_rx));
    (handle, join)
}

fn run_group_actor(mut group: Group, mut cmd_rx: mpsc::Receiver<GroupActorCommand>) -> Group {
    info!("Group actor {:?} started ({} members)", group.name(), group.len());

    while let Some(cmd) = cmd_rx.blocking_recv() {
        match cmd {
            GroupActorCommand::Set { value, response } => {
                debug!("Group actor {:?}: set {} dB", group.name(), value);
                let _ = response.send(group.set_attenuation(value));
            }

            GroupActorCommand::Get { response } => {
                let _ = response.send(group.get_attenuation());
            }

            GroupActorCommand::IsSynchronized { response } => {
                let _ = response.send(group.is_synchronized());
            }

            GroupActorCommand::Synchronize { response } => {
                debug!("Group actor {:?}: synchronize", group.name());
                let _ = response.send(group.synchronize());
            }

            GroupActorCommand::Shutdown => break,
        }
    }

    info!("Group actor {:?} stopped", group.name());
    group
}

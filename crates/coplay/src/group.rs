//! `Group` builder: wires the layers together.

use coplay_protocol::GroupContext;
use coplay_roster::{PlayerMessageHandler, RosterConfig, RosterHandle};
use coplay_session::{SessionConfig, SessionCoordinator};
use coplay_transport::GroupSession;

use crate::{CoplayError, PlayerManager};

/// Builder for a [`Group`].
///
/// # Example
///
/// ```rust,no_run
/// use coplay::prelude::*;
///
/// # async fn demo() -> Result<(), CoplayError> {
/// let hub = MemoryHub::new();
/// let group: Group<MemorySession> = GroupBuilder::new().build();
///
/// group.configure(hub.create_session()).await?;
/// group.players().update_local_player("Ada").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct GroupBuilder {
    session_config: SessionConfig,
    roster_config: RosterConfig,
    context: Option<GroupContext>,
}

impl GroupBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the roster configuration.
    pub fn roster_config(mut self, config: RosterConfig) -> Self {
        self.roster_config = config;
        self
    }

    /// Uses an existing context instead of a fresh one with only the
    /// built-in message types, e.g. one with extra types already
    /// registered.
    pub fn context(mut self, context: GroupContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Spawns the roster actor and builds the group.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build<S: GroupSession>(self) -> Group<S> {
        let context = self.context.unwrap_or_default();
        let roster = RosterHandle::spawn(self.roster_config);
        context
            .handlers()
            .register(PlayerMessageHandler::new(roster.clone()));

        let coordinator =
            SessionCoordinator::with_roster(context.clone(), roster.clone(), self.session_config);

        Group {
            context,
            roster,
            coordinator,
        }
    }
}

/// A coordinator, its roster and the shared registries, built together.
///
/// Cheap to clone; clones share the same session and roster.
pub struct Group<S: GroupSession> {
    context: GroupContext,
    roster: RosterHandle,
    coordinator: SessionCoordinator<S>,
}

impl<S: GroupSession> Clone for Group<S> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            roster: self.roster.clone(),
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<S: GroupSession> Group<S> {
    /// Replaces the current session with `session` and joins it.
    pub async fn configure(&self, session: S) -> Result<(), CoplayError> {
        self.coordinator.configure(session).await?;
        Ok(())
    }

    /// Leaves the current session, if any, and clears the roster.
    pub async fn cleanup(&self) {
        self.coordinator.cleanup().await;
    }

    /// The session coordinator, for sending custom messages.
    pub fn coordinator(&self) -> &SessionCoordinator<S> {
        &self.coordinator
    }

    /// The roster this group keeps in sync.
    pub fn roster(&self) -> &RosterHandle {
        &self.roster
    }

    /// Type and handler registries. Register handlers here.
    pub fn context(&self) -> &GroupContext {
        &self.context
    }

    /// Local player operations for this group.
    pub fn players(&self) -> PlayerManager<S> {
        PlayerManager::new(self.coordinator.clone(), self.roster.clone())
    }
}

impl<S: GroupSession> std::fmt::Debug for Group<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("coordinator", &self.coordinator)
            .field("roster", &self.roster)
            .finish()
    }
}

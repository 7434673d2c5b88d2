//! Type-erased handler registry.
//!
//! Handlers are written against one concrete message type
//! ([`MessageHandler::Message`]) but stored side by side in one map keyed
//! by that type's [`TypeId`]. Each stored entry is a closure that takes a
//! `Box<dyn AnyMessage>`, downcasts it back to the concrete type and calls
//! the handler, so dispatch never needs a `match` over every known type.
//!
//! ## Rules
//!
//! - At most one handler per message type. Registering again replaces
//!   the previous handler.
//! - Dispatching a message with no handler is a silent no-op.
//! - Nothing is deduplicated: the same `message_id` delivered twice is
//!   handled twice.

use std::any::TypeId;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use coplay_transport::ParticipantId;
use dashmap::DashMap;
use futures_util::future::BoxFuture;

use crate::message::{AnyMessage, GroupMessage};

/// Handles one message type.
///
/// ```rust
/// use coplay_protocol::{MessageHandler, messages::GameStartMessage};
/// use coplay_transport::ParticipantId;
///
/// struct StartGame;
///
/// impl MessageHandler for StartGame {
///     type Message = GameStartMessage;
///
///     async fn handle(&self, message: GameStartMessage, sender: ParticipantId) {
///         println!("{sender} started a {} game", message.game_mode);
///     }
/// }
/// ```
pub trait MessageHandler: Send + Sync + 'static {
    /// The message type this handler accepts.
    type Message: GroupMessage;

    /// Called once per dispatched message of type [`Self::Message`].
    fn handle(
        &self,
        message: Self::Message,
        sender: ParticipantId,
    ) -> impl Future<Output = ()> + Send;
}

/// Adapts an async closure into a [`MessageHandler`].
struct FnHandler<M, F> {
    f: F,
    _message: PhantomData<fn(M)>,
}

impl<M, F, Fut> MessageHandler for FnHandler<M, F>
where
    M: GroupMessage,
    F: Fn(M, ParticipantId) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    type Message = M;

    fn handle(&self, message: M, sender: ParticipantId) -> impl Future<Output = ()> + Send {
        (self.f)(message, sender)
    }
}

type ErasedHandler =
    Arc<dyn Fn(Box<dyn AnyMessage>, ParticipantId) -> BoxFuture<'static, ()> + Send + Sync>;

struct Registered {
    type_name: &'static str,
    call: ErasedHandler,
}

/// Routes decoded messages to the one handler registered for their type.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<TypeId, Registered>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `H::Message`, replacing any previous one.
    pub fn register<H: MessageHandler>(&self, handler: H) {
        let handler = Arc::new(handler);
        let type_name = std::any::type_name::<H::Message>();

        let call: ErasedHandler = Arc::new(
            move |message: Box<dyn AnyMessage>, sender: ParticipantId| -> BoxFuture<'static, ()> {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    match message.downcast::<H::Message>() {
                        Some(typed) => handler.handle(*typed, sender).await,
                        None => tracing::warn!(
                            expected = type_name,
                            "handler received a message of another type"
                        ),
                    }
                })
            },
        );

        let replaced = self
            .handlers
            .insert(TypeId::of::<H::Message>(), Registered { type_name, call })
            .is_some();
        tracing::debug!(message_type = type_name, replaced, "registered message handler");
    }

    /// Registers an async closure as the handler for `M`.
    ///
    /// ```rust
    /// use coplay_protocol::{HandlerRegistry, messages::EntityStateMessage};
    ///
    /// let handlers = HandlerRegistry::new();
    /// handlers.on(|state: EntityStateMessage, _sender| async move {
    ///     println!("{} active={}", state.entity_id, state.is_active);
    /// });
    /// ```
    pub fn on<M, F, Fut>(&self, f: F)
    where
        M: GroupMessage,
        F: Fn(M, ParticipantId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register(FnHandler {
            f,
            _message: PhantomData,
        });
    }

    /// Removes the handler for `M`. Returns `true` if there was one.
    pub fn unregister<M: GroupMessage>(&self) -> bool {
        self.handlers.remove(&TypeId::of::<M>()).is_some()
    }

    /// Returns `true` if a handler is registered for `M`.
    pub fn contains<M: GroupMessage>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<M>())
    }

    /// Number of message types with a handler.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invokes the handler registered for the runtime type of `message`.
    ///
    /// Returns once the handler's future completes. With no handler for
    /// that type this returns immediately and does nothing.
    pub async fn dispatch(&self, message: Box<dyn AnyMessage>, sender: ParticipantId) {
        let type_id = message.as_any().type_id();

        // Clone the closure out so the map shard isn't locked while the
        // handler runs (a handler may register other handlers).
        let call = self.handlers.get(&type_id).map(|entry| {
            tracing::trace!(message_type = entry.type_name, %sender, "dispatching message");
            Arc::clone(&entry.call)
        });

        match call {
            Some(call) => call(message, sender).await,
            None => tracing::trace!(
                message_type = message.type_name(),
                %sender,
                "no handler registered, message ignored"
            ),
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.handlers.iter().map(|e| e.type_name).collect();
        f.debug_struct("HandlerRegistry").field("handlers", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{EntityStateMessage, GameStartMessage, Player};
    use std::sync::Mutex;

    /// Records every message it sees, tagged with its own label.
    struct Recorder {
        label: &'static str,
        seen: Arc<Mutex<Vec<(&'static str, String, ParticipantId)>>>,
    }

    impl MessageHandler for Recorder {
        type Message = Player;

        async fn handle(&self, message: Player, sender: ParticipantId) {
            self.seen.lock().unwrap().push((self.label, message.name, sender));
        }
    }

    #[tokio::test]
    async fn test_dispatch_calls_registered_handler_with_sender() {
        let handlers = HandlerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        handlers.register(Recorder {
            label: "a",
            seen: Arc::clone(&seen),
        });

        handlers
            .dispatch(Box::new(Player::new("Ada", ParticipantId::new(1))), ParticipantId::new(7))
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![("a", "Ada".to_string(), ParticipantId::new(7))]);
    }

    #[tokio::test]
    async fn test_register_twice_last_handler_wins() {
        let handlers = HandlerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        handlers.register(Recorder {
            label: "first",
            seen: Arc::clone(&seen),
        });
        handlers.register(Recorder {
            label: "second",
            seen: Arc::clone(&seen),
        });

        handlers
            .dispatch(Box::new(Player::new("Ada", ParticipantId::new(1))), ParticipantId::new(1))
            .await;

        let labels: Vec<_> = seen.lock().unwrap().iter().map(|(l, _, _)| *l).collect();
        assert_eq!(labels, vec!["second"]);
        assert_eq!(handlers.len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_without_handler_is_noop() {
        let handlers = HandlerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        handlers.register(Recorder {
            label: "player",
            seen: Arc::clone(&seen),
        });

        handlers
            .dispatch(Box::new(GameStartMessage::new("default")), ParticipantId::new(1))
            .await;

        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_on_registers_closure_handler() {
        let handlers = HandlerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        handlers.on(move |state: EntityStateMessage, _sender| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(state.entity_id);
            }
        });

        handlers
            .dispatch(
                Box::new(EntityStateMessage::new("cube", true, "Cube")),
                ParticipantId::new(3),
            )
            .await;

        assert_eq!(*seen.lock().unwrap(), vec!["cube".to_string()]);
        assert!(handlers.contains::<EntityStateMessage>());
    }

    #[tokio::test]
    async fn test_duplicate_message_id_is_handled_twice() {
        let handlers = HandlerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        handlers.register(Recorder {
            label: "p",
            seen: Arc::clone(&seen),
        });
        let player = Player::new("Ada", ParticipantId::new(1));

        handlers.dispatch(Box::new(player.clone()), ParticipantId::new(1)).await;
        handlers.dispatch(Box::new(player), ParticipantId::new(1)).await;

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_unregister_removes_handler() {
        let handlers = HandlerRegistry::new();
        handlers.on(|_: Player, _| async {});

        assert!(handlers.unregister::<Player>());
        assert!(!handlers.contains::<Player>());
        assert!(!handlers.unregister::<Player>());
    }
}

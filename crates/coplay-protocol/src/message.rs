//! The typed message capability and its type-erased form.
//!
//! Application code works with concrete structs that implement
//! [`GroupMessage`]. Once a message has been decoded from the wire, the
//! receiver no longer knows its concrete type at compile time, so it is
//! carried around as a `Box<dyn AnyMessage>` until the
//! [`HandlerRegistry`](crate::HandlerRegistry) recovers the concrete type
//! by downcasting.
//!
//! ```text
//! Player ──(impl GroupMessage)──► Box<dyn AnyMessage> ──downcast──► Player
//! ```

use std::any::Any;
use std::fmt;

use serde::{Serialize, de::DeserializeOwned};

/// A payload that can travel inside an [`Envelope`](crate::Envelope).
///
/// Every message carries two header-like fields:
///
/// - `window_id`: which logical surface the message is about. May be
///   empty.
/// - `message_id`: unique per message, generated at construction (see
///   [`new_message_id`]). Carried for collaborators that want
///   deduplication; nothing in Coplay suppresses duplicates by it.
///
/// Implementing this trait is all a downstream crate needs to do to add a
/// new message variant; after that it only has to be registered with a
/// [`TypeRegistry`](crate::TypeRegistry).
pub trait GroupMessage:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    /// The logical surface this message pertains to.
    fn window_id(&self) -> &str;

    /// The unique id of this message instance.
    fn message_id(&self) -> &str;
}

/// Generates a fresh message id (a random v4 UUID in hyphenated form).
///
/// Used as the serde default for `message_id`, so payloads from peers that
/// omit it still get one.
pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// AnyMessage
// ---------------------------------------------------------------------------

/// Object-safe view of a [`GroupMessage`].
///
/// `GroupMessage` itself can't be a trait object (it requires `Sized`
/// through `Clone` and `DeserializeOwned`), so decoded messages are boxed
/// as `dyn AnyMessage` instead. There is a blanket implementation for
/// every `GroupMessage`; you never implement this by hand.
pub trait AnyMessage: Any + Send + Sync + fmt::Debug {
    /// The concrete Rust type name, for logs.
    fn type_name(&self) -> &'static str;

    /// Borrows the message as `&dyn Any` for runtime type checks.
    fn as_any(&self) -> &dyn Any;

    /// Converts the box into `Box<dyn Any>` so it can be downcast by value.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;

    #[doc(hidden)]
    fn erased_window_id(&self) -> &str;

    #[doc(hidden)]
    fn erased_message_id(&self) -> &str;
}

impl<T: GroupMessage> AnyMessage for T {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }

    fn erased_window_id(&self) -> &str {
        GroupMessage::window_id(self)
    }

    fn erased_message_id(&self) -> &str {
        GroupMessage::message_id(self)
    }
}

impl dyn AnyMessage {
    /// See [`GroupMessage::window_id`].
    pub fn window_id(&self) -> &str {
        self.erased_window_id()
    }

    /// See [`GroupMessage::message_id`].
    pub fn message_id(&self) -> &str {
        self.erased_message_id()
    }

    /// Returns `true` if the boxed message is an `M`.
    pub fn is<M: GroupMessage>(&self) -> bool {
        self.as_any().is::<M>()
    }

    /// Borrows the message as an `M`, if that's what it is.
    pub fn downcast_ref<M: GroupMessage>(&self) -> Option<&M> {
        self.as_any().downcast_ref::<M>()
    }

    /// Takes the message out of the box as an `M`, or `None` if it is
    /// some other type.
    pub fn downcast<M: GroupMessage>(self: Box<Self>) -> Option<Box<M>> {
        self.into_any().downcast::<M>().ok()
    }
}

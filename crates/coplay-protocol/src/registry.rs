//! The type registry: stable string identifiers ↔ message types.
//!
//! The registry is what makes the envelope open-ended. Encoding asks it
//! "which identifier does this Rust type go by?"; decoding asks "which
//! type does this identifier name, and how do I build one from bytes?".
//! Adding a message variant is one [`TypeRegistry::register`] call.
//!
//! ## Concurrency
//!
//! Both directions live behind one `RwLock`, so an insert is atomic with
//! respect to lookups: a reader sees either the old entry or the new one,
//! never half of it. Registrations normally happen once at startup; after
//! that the lock is only ever taken for reading.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::codec::JsonCodec;
use crate::message::{AnyMessage, GroupMessage};
use crate::{Codec, ProtocolError, messages};

/// Builds a boxed message of one concrete type from body bytes.
type DecodeFn<C> = fn(&C, &[u8]) -> Result<Box<dyn AnyMessage>, ProtocolError>;

fn decode_as<C: Codec, M: GroupMessage>(
    codec: &C,
    data: &[u8],
) -> Result<Box<dyn AnyMessage>, ProtocolError> {
    let message: M = codec.decode(data)?;
    Ok(Box::new(message))
}

struct Entry<C> {
    type_id: TypeId,
    type_name: &'static str,
    decode: DecodeFn<C>,
    // Registration order; the newest surviving alias wins the encode slot.
    seq: u64,
}

// Manual impls: deriving would wrongly require `C: Copy`.
impl<C> Clone for Entry<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Entry<C> {}

struct Tables<C> {
    by_identifier: HashMap<String, Entry<C>>,
    by_type: HashMap<TypeId, String>,
    next_seq: u64,
}

impl<C> Tables<C> {
    /// The most recently registered identifier still decoding to `type_id`.
    fn newest_alias(&self, type_id: TypeId) -> Option<String> {
        self.by_identifier
            .iter()
            .filter(|(_, entry)| entry.type_id == type_id)
            .max_by_key(|(_, entry)| entry.seq)
            .map(|(identifier, _)| identifier.clone())
    }
}

/// Public description of one registered identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDescriptor {
    /// The wire identifier.
    pub identifier: String,
    /// Runtime identity of the Rust type behind it.
    pub type_id: TypeId,
    /// The Rust type name, for diagnostics.
    pub type_name: &'static str,
}

/// Bidirectional map between message types and wire identifiers.
///
/// Generic over the [`Codec`] used for payload bodies; JSON by default.
///
/// ```rust
/// use coplay_protocol::{TypeRegistry, messages::Player};
///
/// let registry = TypeRegistry::new();
/// assert_eq!(registry.identifier_for::<Player>().as_deref(), Some("playerMessage"));
/// ```
pub struct TypeRegistry<C: Codec = JsonCodec> {
    codec: C,
    tables: RwLock<Tables<C>>,
}

impl TypeRegistry<JsonCodec> {
    /// Creates a JSON registry pre-populated with the built-in messages.
    pub fn new() -> Self {
        Self::with_codec(JsonCodec)
    }
}

impl Default for TypeRegistry<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> TypeRegistry<C> {
    /// Creates a registry over `codec`, pre-populated with the built-in
    /// messages.
    pub fn with_codec(codec: C) -> Self {
        let registry = Self::empty(codec);
        messages::register_builtins(&registry);
        registry
    }

    /// Creates a registry that knows no identifiers at all.
    pub fn empty(codec: C) -> Self {
        Self {
            codec,
            tables: RwLock::new(Tables {
                by_identifier: HashMap::new(),
                by_type: HashMap::new(),
                next_seq: 0,
            }),
        }
    }

    /// The codec payload bodies are written with.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Registers `M` under `identifier`.
    ///
    /// Never fails. Re-registering an identifier replaces the type behind
    /// it; registering a type under a second identifier makes the new one
    /// its encoding identifier and keeps the old one as a decode alias.
    /// If another type takes over a type's encoding identifier, the type
    /// falls back to its newest remaining alias.
    pub fn register<M: GroupMessage>(&self, identifier: impl Into<String>) {
        let identifier = identifier.into();
        let type_id = TypeId::of::<M>();
        let type_name = std::any::type_name::<M>();
        let mut tables = self.write();
        let entry = Entry {
            type_id,
            type_name,
            decode: decode_as::<C, M>,
            seq: tables.next_seq,
        };
        tables.next_seq += 1;

        if let Some(displaced) = tables.by_identifier.insert(identifier.clone(), entry) {
            if displaced.type_id != type_id {
                if tables.by_type.get(&displaced.type_id) == Some(&identifier) {
                    match tables.newest_alias(displaced.type_id) {
                        Some(alias) => {
                            tables.by_type.insert(displaced.type_id, alias);
                        }
                        None => {
                            tables.by_type.remove(&displaced.type_id);
                        }
                    }
                }
                tracing::debug!(
                    %identifier,
                    replaced = displaced.type_name,
                    by = type_name,
                    "message type identifier shadowed"
                );
            }
        }
        tables.by_type.insert(type_id, identifier.clone());
        drop(tables);

        tracing::debug!(%identifier, type_name, "registered message type");
    }

    /// The identifier `M` encodes under, if registered.
    pub fn identifier_for<M: GroupMessage>(&self) -> Option<String> {
        self.read().by_type.get(&TypeId::of::<M>()).cloned()
    }

    /// The identifier of a message's runtime type, if registered.
    pub fn identifier_of(&self, message: &dyn AnyMessage) -> Option<String> {
        self.read().by_type.get(&message.as_any().type_id()).cloned()
    }

    /// Forward lookup: what `identifier` decodes into.
    pub fn type_for(&self, identifier: &str) -> Option<MessageDescriptor> {
        self.read()
            .by_identifier
            .get(identifier)
            .map(|entry| MessageDescriptor {
                identifier: identifier.to_owned(),
                type_id: entry.type_id,
                type_name: entry.type_name,
            })
    }

    /// Returns `true` if `identifier` is registered.
    pub fn contains(&self, identifier: &str) -> bool {
        self.read().by_identifier.contains_key(identifier)
    }

    /// Number of registered identifiers (aliases included).
    pub fn len(&self) -> usize {
        self.read().by_identifier.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializes a payload body with this registry's codec.
    ///
    /// # Errors
    /// [`ProtocolError::UnregisteredType`] if `M` has no identifier,
    /// [`ProtocolError::Encode`] if serialization fails.
    pub(crate) fn encode_body<M: GroupMessage>(
        &self,
        message: &M,
    ) -> Result<(String, Vec<u8>), ProtocolError> {
        let identifier = self
            .identifier_for::<M>()
            .ok_or(ProtocolError::UnregisteredType(std::any::type_name::<M>()))?;
        let body = self.codec.encode(message)?;
        Ok((identifier, body))
    }

    /// Deserializes a payload body as the type behind `identifier`.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownMessageType`] if the identifier isn't
    /// registered, [`ProtocolError::MalformedPayload`] if the body doesn't
    /// fit the type.
    pub(crate) fn decode_body(
        &self,
        identifier: &str,
        body: &[u8],
    ) -> Result<Box<dyn AnyMessage>, ProtocolError> {
        // Copy the entry out so the lock isn't held while decoding.
        let entry = self
            .read()
            .by_identifier
            .get(identifier)
            .copied()
            .ok_or_else(|| ProtocolError::UnknownMessageType(identifier.to_owned()))?;

        (entry.decode)(&self.codec, body).map_err(|err| ProtocolError::MalformedPayload {
            identifier: identifier.to_owned(),
            reason: match err {
                ProtocolError::Decode(inner) => inner.to_string(),
                other => other.to_string(),
            },
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables<C>> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables<C>> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Codec> std::fmt::Debug for TypeRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.read();
        let mut identifiers: Vec<&String> = tables.by_identifier.keys().collect();
        identifiers.sort();
        f.debug_struct("TypeRegistry")
            .field("identifiers", &identifiers)
            .finish()
    }
}

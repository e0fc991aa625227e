//! Error types for map adapters.
//!
//! Every failing operation of a [`MapAdapter`](crate::MapAdapter) reports a
//! [`MapError`]. When the failure happens inside a Lua call, the error is
//! raised into Lua as an external `mlua` error, and can be recovered on the
//! Rust side with [`MapError::from_lua_error`].

use thiserror::Error;

/// Represents errors raised by map adapters, their views and sequences.
///
/// Membership tests never fail: a key of the wrong type is simply not
/// contained. Keys of the wrong type passed to `get`, `set` or `delete`
/// from Lua are rejected by the argument conversion instead, as an
/// [`mlua::Error::FromLuaConversionError`].
///
/// # Examples
///
/// ```rust
/// use mapbind::MapError;
///
/// let error = MapError::KeyNotFound { key: "\"a\"".to_string() };
/// assert_eq!(error.to_string(), "KeyError: \"a\"");
/// assert!(error.is_key_not_found());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// The key is absent from the map.
    #[error("KeyError: {key}")]
    KeyNotFound {
        /// Debug rendering of the missing key.
        key: String,
    },

    /// The value type of the map has no write strategy.
    #[error("{class} does not support item assignment")]
    ReadOnly {
        /// The class name the map was bound under.
        class: String,
    },

    /// The map is held by a conflicting borrow, typically a live
    /// [`ValueRef`](crate::ValueRef) guard.
    #[error("{class} is already borrowed by another operation")]
    Busy {
        /// The class name the map was bound under.
        class: String,
    },
}

impl MapError {
    /// Returns `true` if this is the key-error signal.
    pub const fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }

    /// Finds the `MapError` carried by an error that crossed the Lua boundary.
    ///
    /// Callback and context wrappers added by `mlua` are unwrapped until the
    /// external error is reached.
    pub fn from_lua_error(error: &mlua::Error) -> Option<&Self> {
        match error {
            mlua::Error::ExternalError(cause) => cause.downcast_ref::<Self>(),
            mlua::Error::CallbackError { cause, .. } | mlua::Error::WithContext { cause, .. } => {
                Self::from_lua_error(cause)
            }
            _ => None,
        }
    }
}

impl From<MapError> for mlua::Error {
    fn from(error: MapError) -> Self {
        Self::external(error)
    }
}

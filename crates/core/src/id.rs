//! Strongly-typed identifiers used across the bus.

use serde::{Deserialize, Serialize};

/// Identifier of a server (inbox) registered on a bus.
///
/// Unique within one registry while registered. `ServerId::MAIN` is reserved.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(u32);

/// Application-defined event type tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(u32);

macro_rules! impl_u32_newtype {
    ($t:ty) => {
        impl $t {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn get(&self) -> u32 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }

        impl From<u32> for $t {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl From<$t> for u32 {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_u32_newtype!(ServerId);
impl_u32_newtype!(EventType);

impl ServerId {
    /// The main server: landing zone for asynchronously sent events.
    pub const MAIN: ServerId = ServerId(0);

    pub const fn is_main(&self) -> bool {
        self.0 == Self::MAIN.0
    }
}

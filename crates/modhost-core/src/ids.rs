//! Identifier newtypes.
//!
//! Every identifier that crosses the host boundary is a validated newtype so
//! that operation tables and capability maps are keyed by well-formed values.
//! Constructors validate; `from_static` skips validation for tests and
//! compile-time constants.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IdError, IdResult};

/// Implements the shared accessor, formatting and serde plumbing for a
/// validated string identifier.
macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            /// Create an identifier without validation (for tests and constants).
            #[must_use]
            pub fn from_static(id: &str) -> Self {
                Self(id.to_string())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Check whether a string is valid without constructing the identifier.
            #[must_use]
            pub fn is_valid_id(id: &str) -> bool {
                Self::validate(id).is_ok()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Stable, human-readable module identifier.
///
/// Module IDs look like `"allowlist-mint"` or `"royalty-v2"`: lowercase
/// alphanumerics and hyphens, never starting or ending with a hyphen.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ModuleId(String);

impl ModuleId {
    /// Create a new `ModuleId`, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an [`IdError`] if the ID is empty or malformed.
    pub fn new(id: impl Into<String>) -> IdResult<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    fn validate(id: &str) -> IdResult<()> {
        validate_token("module id", id, |c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
        })
    }
}

string_id!(ModuleId);

/// Abstract capability a module may require or provide.
///
/// Capabilities use dotted names such as `"token.erc721"` or `"mint:signed"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CapabilityId(String);

impl CapabilityId {
    /// Create a new `CapabilityId`, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an [`IdError`] if the ID is empty or malformed.
    pub fn new(id: impl Into<String>) -> IdResult<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    fn validate(id: &str) -> IdResult<()> {
        validate_token("capability id", id, is_dotted_char)
    }
}

string_id!(CapabilityId);

/// Identifier of a delegated operation (callback or fallback).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OperationId(String);

impl OperationId {
    /// Create a new `OperationId`, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an [`IdError`] if the ID is empty or malformed.
    pub fn new(id: impl Into<String>) -> IdResult<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    fn validate(id: &str) -> IdResult<()> {
        validate_token("operation id", id, is_dotted_char)
    }
}

string_id!(OperationId);

/// A permission (role) that a caller must hold, resolved by the
/// access-control collaborator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Permission(String);

impl Permission {
    /// Create a new `Permission`, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an [`IdError`] if the name is empty or malformed.
    pub fn new(name: impl Into<String>) -> IdResult<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> IdResult<()> {
        validate_token("permission", name, is_dotted_char)
    }
}

string_id!(Permission);

/// Identity of an external caller.
///
/// Principal IDs are opaque to the host; they only need to be non-empty and
/// free of whitespace so they log cleanly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Create a new `PrincipalId`, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an [`IdError`] if the ID is empty or contains whitespace.
    pub fn new(id: impl Into<String>) -> IdResult<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    fn validate(id: &str) -> IdResult<()> {
        if id.is_empty() {
            return Err(IdError::Empty { kind: "principal id" });
        }
        if let Some(found) = id.chars().find(|c| c.is_whitespace() || c.is_control()) {
            return Err(IdError::InvalidCharacter {
                kind: "principal id",
                found,
                value: id.to_string(),
            });
        }
        Ok(())
    }
}

string_id!(PrincipalId);

/// Stable handle of a module's indirection point.
///
/// Slots are assigned from a per-host monotonic counter and never reused, so
/// state bound to a slot outlives implementation swaps and uninstalls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(u64);

impl SlotId {
    /// Wrap a raw slot index.
    #[must_use]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// The raw slot index.
    #[must_use]
    pub const fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

fn is_dotted_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.' | ':')
}

fn validate_token(kind: &'static str, value: &str, allowed: impl Fn(char) -> bool) -> IdResult<()> {
    if value.is_empty() {
        return Err(IdError::Empty { kind });
    }
    if let Some(found) = value.chars().find(|c| !allowed(*c)) {
        return Err(IdError::InvalidCharacter {
            kind,
            found,
            value: value.to_string(),
        });
    }
    let is_separator = |c: char| matches!(c, '-' | '.' | ':');
    if value.starts_with(is_separator) || value.ends_with(is_separator) {
        return Err(IdError::DanglingSeparator {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

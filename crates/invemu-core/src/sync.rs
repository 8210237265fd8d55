//! Progression sync from an authoritative snapshot
//!
//! The level is copied as a single byte. Experience keeps whatever width the
//! source uses; a 16-bit value is never promoted and a 32-bit value never
//! truncated.

use crate::document::{Document, Record, EXPERIENCE, LEVEL};
use crate::error::SyncError;
use crate::index::{find_by_slug, position_by_slug, PROFILE_SLUG};
use invemu_value::{Navigate, PathError, Value, ValueKind};
use std::fmt::{self, Display, Formatter};
use tracing::{debug, info};

/// Experience with its stored width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Experience {
    /// 16-bit encoding
    Narrow(u16),
    /// 32-bit encoding
    Wide(u32),
}

impl Experience {
    /// Detect the width of a stored experience value
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int16(n) => Some(Self::Narrow(*n)),
            Value::Int32(n) => Some(Self::Wide(*n)),
            _ => None,
        }
    }

    /// Value in the same width
    #[must_use]
    pub fn to_value(self) -> Value {
        match self {
            Self::Narrow(n) => Value::Int16(n),
            Self::Wide(n) => Value::Int32(n),
        }
    }

    /// Numeric amount regardless of width
    #[inline]
    #[must_use]
    pub fn amount(self) -> u32 {
        match self {
            Self::Narrow(n) => u32::from(n),
            Self::Wide(n) => n,
        }
    }
}

impl Display for Experience {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Narrow(n) => write!(f, "{n} (16-bit)"),
            Self::Wide(n) => write!(f, "{n} (32-bit)"),
        }
    }
}

/// Result of a progression write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Profile updated to these values
    Synced {
        /// New level
        level: u8,
        /// New experience, width preserved
        experience: Experience,
    },
    /// A profile record was absent; nothing changed
    ProfileMissing,
}

impl SyncOutcome {
    /// Check if the working document changed
    #[inline]
    #[must_use]
    pub fn changed(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }
}

fn read_level(profile: &Record) -> Result<u8, SyncError> {
    match profile.resolve(&LEVEL)? {
        Value::Int8(level) => Ok(*level),
        other => Err(PathError::TypeMismatch {
            path: LEVEL.to_string(),
            expected: ValueKind::Int8,
            found: other.kind(),
        }
        .into()),
    }
}

fn write_progression(
    profile: &mut Record,
    level: u8,
    experience: Experience,
) -> Result<(), SyncError> {
    // Both targets must exist before either is written
    profile.resolve(&EXPERIENCE)?;
    profile.resolve(&LEVEL)?;
    profile.assign(&EXPERIENCE, experience.to_value())?;
    profile.assign(&LEVEL, Value::Int8(level))?;
    Ok(())
}

/// Copy level and experience from `source`'s profile into `target`'s
///
/// # Errors
/// - `SyncError::UnrecognizedNumericEncoding` if the source experience is
///   neither 16-bit nor 32-bit
/// - `SyncError::Profile` if either profile lacks the level or experience
///   fields
///
/// `target` is unchanged on error.
pub fn sync_progression(target: &mut Document, source: &Document) -> Result<SyncOutcome, SyncError> {
    let Some(source_profile) = find_by_slug(source, PROFILE_SLUG) else {
        debug!("source has no profile, progression not synced");
        return Ok(SyncOutcome::ProfileMissing);
    };
    let Some(position) = position_by_slug(target, PROFILE_SLUG) else {
        debug!("working inventory has no profile, progression not synced");
        return Ok(SyncOutcome::ProfileMissing);
    };

    let stored = source_profile.resolve(&EXPERIENCE)?;
    let experience =
        Experience::from_value(stored).ok_or(SyncError::UnrecognizedNumericEncoding {
            found: stored.kind(),
        })?;
    let level = read_level(source_profile)?;

    let Some(profile) = target.record_mut(position) else {
        return Ok(SyncOutcome::ProfileMissing);
    };
    write_progression(profile, level, experience)?;
    info!(level, %experience, "progression synced");
    Ok(SyncOutcome::Synced { level, experience })
}

/// Reset the working profile to level 0 with 16-bit experience 0
///
/// # Errors
/// `SyncError::Profile` if the profile lacks the level or experience fields
pub fn reset_progression(doc: &mut Document) -> Result<SyncOutcome, SyncError> {
    let Some(position) = position_by_slug(doc, PROFILE_SLUG) else {
        debug!("working inventory has no profile, nothing to reset");
        return Ok(SyncOutcome::ProfileMissing);
    };
    let Some(profile) = doc.record_mut(position) else {
        return Ok(SyncOutcome::ProfileMissing);
    };
    let experience = Experience::Narrow(0);
    write_progression(profile, 0, experience)?;
    info!("progression reset");
    Ok(SyncOutcome::Synced {
        level: 0,
        experience,
    })
}

//! Value paths for typed navigation
//!
//! Provides [`ValuePath`] for addressing nested elements of a [`Value`]
//! tree. Resolution stops at the first failing segment and reports a
//! typed miss or mismatch instead of faulting.

use crate::value::{Mapping, Value, ValueKind};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// One step of a [`ValuePath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Mapping key
    Key(String),
    /// Sequence position
    Index(usize),
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Path within a value tree
///
/// # Examples
/// - `data.slots.slots` → mapping keys
/// - `items.0.uniqueId` → first sequence element, then a key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ValuePath(Vec<Segment>);

impl ValuePath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// Create path from mapping keys only
    #[must_use]
    pub fn keys(keys: &[&str]) -> Self {
        Self(keys.iter().map(|k| Segment::Key((*k).to_string())).collect())
    }

    /// Empty path (root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// Append a key, returning new path
    #[must_use]
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(Segment::Key(key.into()));
        new
    }

    /// Append a sequence position, returning new path
    #[must_use]
    pub fn index(&self, position: usize) -> Self {
        let mut new = self.clone();
        new.0.push(Segment::Index(position));
        new
    }

    /// Concatenate another path onto this one
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut new = self.clone();
        new.0.extend(other.0.iter().cloned());
        new
    }

    /// Leading `n` segments rendered for diagnostics
    fn prefix_string(&self, n: usize) -> String {
        Self(self.0[..n.min(self.0.len())].to_vec()).to_string()
    }

    fn missing(&self, depth: usize) -> PathError {
        PathError::Missing {
            path: self.prefix_string(depth + 1),
            segment: self.0[depth].to_string(),
        }
    }

    fn mismatch(&self, depth: usize, expected: ValueKind, found: ValueKind) -> PathError {
        PathError::TypeMismatch {
            path: self.prefix_string(depth),
            expected,
            found,
        }
    }
}

impl Display for ValuePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

impl FromStr for ValuePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<Segment> = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment)
                } else if seg.bytes().all(|b| b.is_ascii_digit()) {
                    seg.parse()
                        .map(Segment::Index)
                        .map_err(|_| PathError::InvalidSegment(seg.to_string()))
                } else {
                    Ok(Segment::Key(seg.to_string()))
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl From<Vec<Segment>> for ValuePath {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

/// Errors related to value paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Unparsable segment
    #[error("invalid segment: {0}")]
    InvalidSegment(String),

    /// Nothing stored under a segment
    #[error("nothing at '{path}' (segment '{segment}' missing)")]
    Missing { path: String, segment: String },

    /// Value present but of the wrong kind
    #[error("type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: ValueKind,
        found: ValueKind,
    },
}

impl PathError {
    /// Check if the error is a plain lookup miss
    #[inline]
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}

/// Typed path resolution over value trees
///
/// Implemented for [`Value`] and for a bare [`Mapping`] (a record), so
/// engines can navigate either without re-wrapping.
pub trait Navigate {
    /// Resolve a path to a borrowed value
    ///
    /// # Errors
    /// - `PathError::Missing` if a key or position is absent
    /// - `PathError::TypeMismatch` if an intermediate value is not a container
    ///   of the kind the segment requires
    fn resolve(&self, path: &ValuePath) -> Result<&Value, PathError>;

    /// Resolve a path to a mutably borrowed value
    ///
    /// # Errors
    /// Same as [`Navigate::resolve`]
    fn resolve_mut(&mut self, path: &ValuePath) -> Result<&mut Value, PathError>;

    /// Store a value at a path, returning what it replaced
    ///
    /// The parent must already resolve. A trailing key is inserted when
    /// absent; a trailing index must already exist.
    ///
    /// # Errors
    /// Resolution errors for the parent, `PathError::Missing` for an
    /// out-of-range index, `PathError::EmptySegment` for the root path
    fn assign(&mut self, path: &ValuePath, value: Value) -> Result<Option<Value>, PathError>;

    /// Resolve a path that must end in text
    ///
    /// # Errors
    /// Resolution errors, or `PathError::TypeMismatch` for a non-text leaf
    fn resolve_str(&self, path: &ValuePath) -> Result<&str, PathError> {
        let found = self.resolve(path)?;
        found.as_str().ok_or_else(|| leaf_mismatch(path, ValueKind::Text, found))
    }

    /// Resolve a path that must end in a mapping
    ///
    /// # Errors
    /// Resolution errors, or `PathError::TypeMismatch` for a non-mapping leaf
    fn resolve_mapping(&self, path: &ValuePath) -> Result<&Mapping, PathError> {
        let found = self.resolve(path)?;
        found
            .as_mapping()
            .ok_or_else(|| leaf_mismatch(path, ValueKind::Mapping, found))
    }

    /// Resolve a path that must end in a mapping, mutably
    ///
    /// # Errors
    /// Resolution errors, or `PathError::TypeMismatch` for a non-mapping leaf
    fn resolve_mapping_mut(&mut self, path: &ValuePath) -> Result<&mut Mapping, PathError> {
        let found = self.resolve_mut(path)?;
        let kind = found.kind();
        found.as_mapping_mut().ok_or_else(|| PathError::TypeMismatch {
            path: path.to_string(),
            expected: ValueKind::Mapping,
            found: kind,
        })
    }

    /// Resolve a path that must end in a sequence
    ///
    /// # Errors
    /// Resolution errors, or `PathError::TypeMismatch` for a non-sequence leaf
    fn resolve_sequence(&self, path: &ValuePath) -> Result<&[Value], PathError> {
        let found = self.resolve(path)?;
        found
            .as_sequence()
            .ok_or_else(|| leaf_mismatch(path, ValueKind::Sequence, found))
    }
}

fn leaf_mismatch(path: &ValuePath, expected: ValueKind, found: &Value) -> PathError {
    PathError::TypeMismatch {
        path: path.to_string(),
        expected,
        found: found.kind(),
    }
}

fn walk<'a>(mut current: &'a Value, path: &ValuePath, from: usize) -> Result<&'a Value, PathError> {
    for (depth, segment) in path.segments().iter().enumerate().skip(from) {
        current = match (segment, current) {
            (Segment::Key(k), Value::Mapping(m)) => m.get(k).ok_or_else(|| path.missing(depth))?,
            (Segment::Index(i), Value::Sequence(items)) => {
                items.get(*i).ok_or_else(|| path.missing(depth))?
            }
            (Segment::Key(_), other) => {
                return Err(path.mismatch(depth, ValueKind::Mapping, other.kind()))
            }
            (Segment::Index(_), other) => {
                return Err(path.mismatch(depth, ValueKind::Sequence, other.kind()))
            }
        };
    }
    Ok(current)
}

fn walk_mut<'a>(
    mut current: &'a mut Value,
    path: &ValuePath,
    from: usize,
) -> Result<&'a mut Value, PathError> {
    for (depth, segment) in path.segments().iter().enumerate().skip(from) {
        current = match (segment, current) {
            (Segment::Key(k), Value::Mapping(m)) => match m.get_mut(k) {
                Some(v) => v,
                None => return Err(path.missing(depth)),
            },
            (Segment::Index(i), Value::Sequence(items)) => match items.get_mut(*i) {
                Some(v) => v,
                None => return Err(path.missing(depth)),
            },
            (Segment::Key(_), other) => {
                return Err(path.mismatch(depth, ValueKind::Mapping, other.kind()))
            }
            (Segment::Index(_), other) => {
                return Err(path.mismatch(depth, ValueKind::Sequence, other.kind()))
            }
        };
    }
    Ok(current)
}

/// Store `value` under the final segment of `path` inside `container`.
fn store_last(
    container: &mut Value,
    path: &ValuePath,
    value: Value,
) -> Result<Option<Value>, PathError> {
    let depth = path.len() - 1;
    match (&path.segments()[depth], container) {
        (Segment::Key(k), Value::Mapping(m)) => Ok(m.insert(k.clone(), value)),
        (Segment::Index(i), Value::Sequence(items)) => match items.get_mut(*i) {
            Some(slot) => Ok(Some(std::mem::replace(slot, value))),
            None => Err(path.missing(depth)),
        },
        (Segment::Key(_), other) => Err(path.mismatch(depth, ValueKind::Mapping, other.kind())),
        (Segment::Index(_), other) => Err(path.mismatch(depth, ValueKind::Sequence, other.kind())),
    }
}

impl Navigate for Value {
    fn resolve(&self, path: &ValuePath) -> Result<&Value, PathError> {
        walk(self, path, 0)
    }

    fn resolve_mut(&mut self, path: &ValuePath) -> Result<&mut Value, PathError> {
        walk_mut(self, path, 0)
    }

    fn assign(&mut self, path: &ValuePath, value: Value) -> Result<Option<Value>, PathError> {
        let parent = path.parent().ok_or(PathError::EmptySegment)?;
        store_last(self.resolve_mut(&parent)?, path, value)
    }
}

impl Navigate for Mapping {
    fn resolve(&self, path: &ValuePath) -> Result<&Value, PathError> {
        match path.segments().first() {
            Some(Segment::Key(k)) => walk(self.get(k).ok_or_else(|| path.missing(0))?, path, 1),
            Some(Segment::Index(_)) => Err(path.mismatch(0, ValueKind::Sequence, ValueKind::Mapping)),
            None => Err(PathError::EmptySegment),
        }
    }

    fn resolve_mut(&mut self, path: &ValuePath) -> Result<&mut Value, PathError> {
        match path.segments().first() {
            Some(Segment::Key(k)) => match self.get_mut(k) {
                Some(v) => walk_mut(v, path, 1),
                None => Err(path.missing(0)),
            },
            Some(Segment::Index(_)) => Err(path.mismatch(0, ValueKind::Sequence, ValueKind::Mapping)),
            None => Err(PathError::EmptySegment),
        }
    }

    fn assign(&mut self, path: &ValuePath, value: Value) -> Result<Option<Value>, PathError> {
        match path.segments() {
            [] => Err(PathError::EmptySegment),
            [Segment::Key(k)] => Ok(self.insert(k.clone(), value)),
            [Segment::Index(_)] => Err(path.mismatch(0, ValueKind::Sequence, ValueKind::Mapping)),
            _ => {
                let parent = path.parent().ok_or(PathError::EmptySegment)?;
                store_last(self.resolve_mut(&parent)?, path, value)
            }
        }
    }
}

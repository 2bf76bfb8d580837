use crate::common::{INDEX_SEGMENT_CLOSE, INDEX_SEGMENT_OPEN, PATH_SEPARATOR};
use crate::errors::{ErrorKind, TelemetraError, TelemetraResult};
use itertools::Itertools;
use smallvec::SmallVec;
use std::fmt::Display;

type SegmentVec = SmallVec<[PathSegment; 4]>;

/// One step of a [`Field`] path.
///
/// A segment is either a map key or an array position. Array positions are
/// written `[k]` with a 1-based `k` on the wire and held 0-based here.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// A map key
    Name(String),
    /// A 0-based array position
    Index(usize),
}

impl PathSegment {
    /// Decodes a single segment, recognising the `[k]` array index form.
    ///
    /// `[0]`, a non numeric index and an empty segment are rejected with
    /// [`ErrorKind::FieldPathError`].
    pub fn decode(segment: &str) -> TelemetraResult<PathSegment> {
        if segment.is_empty() {
            log::error!("Empty segment in field path");
            return Err(TelemetraError::new(
                "Field path segments cannot be empty",
                ErrorKind::FieldPathError,
            ));
        }

        let inner = segment
            .strip_prefix(INDEX_SEGMENT_OPEN)
            .and_then(|s| s.strip_suffix(INDEX_SEGMENT_CLOSE));

        match inner {
            Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                match digits.parse::<usize>() {
                    Ok(position) if position >= 1 => Ok(PathSegment::Index(position - 1)),
                    _ => {
                        log::error!("Invalid array index segment {}", segment);
                        Err(TelemetraError::new(
                            &format!("Invalid array index segment '{}', indexes are 1-based", segment),
                            ErrorKind::FieldPathError,
                        ))
                    }
                }
            }
            _ => Ok(PathSegment::Name(segment.to_string())),
        }
    }

    /// Encodes this segment in its wire form.
    pub fn encode(&self) -> String {
        match self {
            PathSegment::Name(name) => name.clone(),
            PathSegment::Index(index) => {
                format!("{}{}{}", INDEX_SEGMENT_OPEN, index + 1, INDEX_SEGMENT_CLOSE)
            }
        }
    }

    /// Returns the key if this is a name segment.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            PathSegment::Name(name) => Some(name),
            PathSegment::Index(_) => None,
        }
    }
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// A path into a (possibly nested, possibly array containing) record.
///
/// A field is an ordered, non-empty sequence of [`PathSegment`]s. On the wire
/// the segments are joined with `->`, so `"value->readings->[2]"` addresses
/// the second element of `readings` inside `value`. Fields are immutable
/// values with structural equality and hashing.
///
/// A name segment that itself contains `->` cannot survive encoding; the
/// joined form splits it into two segments.
///
/// # Example
///
/// ```rust
/// use telemetra::common::{Field, PathSegment};
///
/// let field = Field::parse("value->readings->[2]").unwrap();
/// assert_eq!(field.len(), 3);
/// assert_eq!(field.segments()[2], PathSegment::Index(1));
/// assert_eq!(field.encoded_path(), "value->readings->[2]");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Field {
    segments: SegmentVec,
}

impl Field {
    /// Parses an encoded `->` separated path.
    pub fn parse(path: &str) -> TelemetraResult<Field> {
        let segments = path
            .split(PATH_SEPARATOR)
            .map(PathSegment::decode)
            .collect::<TelemetraResult<SegmentVec>>()?;
        Ok(Field { segments })
    }

    /// Builds a field from already decoded segments.
    pub fn from_segments(segments: Vec<PathSegment>) -> TelemetraResult<Field> {
        if segments.is_empty() {
            log::error!("Field path cannot be empty");
            return Err(TelemetraError::new(
                "Field path cannot be empty",
                ErrorKind::FieldPathError,
            ));
        }
        Ok(Field {
            segments: SegmentVec::from_vec(segments),
        })
    }

    /// Builds a single segment field from a plain name without parsing it.
    pub fn name(name: &str) -> TelemetraResult<Field> {
        if name.is_empty() {
            log::error!("Field name cannot be empty");
            return Err(TelemetraError::new(
                "Field name cannot be empty",
                ErrorKind::FieldPathError,
            ));
        }
        Ok(Field {
            segments: SmallVec::from_elem(PathSegment::Name(name.to_string()), 1),
        })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the first segment of the path.
    #[inline]
    pub fn head(&self) -> &PathSegment {
        &self.segments[0]
    }

    /// Returns the path without its first `skip` segments, if any remain.
    pub fn suffix(&self, skip: usize) -> Option<Field> {
        if skip >= self.segments.len() {
            return None;
        }
        Some(Field {
            segments: self.segments[skip..].iter().cloned().collect(),
        })
    }

    /// Returns the wire form of this path, segments joined by `->`.
    pub fn encoded_path(&self) -> String {
        self.segments.iter().map(PathSegment::encode).join(PATH_SEPARATOR)
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encoded_path())
    }
}

impl TryFrom<&str> for Field {
    type Error = TelemetraError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Field::parse(path)
    }
}

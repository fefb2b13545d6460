use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PositionError {
    #[error("positions start at 1")]
    Zero,

    #[error("position {position} is outside 1..={total}")]
    OutOfRange { position: u32, total: usize },
}

/// 1-based slot in an attempt's presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position(NonZeroU32);

impl Position {
    pub const FIRST: Position = Position(NonZeroU32::MIN);

    /// # Errors
    ///
    /// Returns `PositionError::Zero` for `0`.
    pub fn new(value: u32) -> Result<Self, PositionError> {
        NonZeroU32::new(value).map(Self).ok_or(PositionError::Zero)
    }

    /// Position for a 0-based index.
    ///
    /// # Errors
    ///
    /// Returns `PositionError::OutOfRange` if the index does not fit.
    pub fn from_index(index: usize) -> Result<Self, PositionError> {
        u32::try_from(index)
            .ok()
            .and_then(|i| i.checked_add(1))
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or(PositionError::OutOfRange {
                position: u32::MAX,
                total: index,
            })
    }

    /// Checks `self` is within an attempt of `total` questions.
    ///
    /// # Errors
    ///
    /// Returns `PositionError::OutOfRange` when past the end.
    pub fn within(self, total: usize) -> Result<Self, PositionError> {
        if self.index() < total {
            Ok(self)
        } else {
            Err(PositionError::OutOfRange {
                position: self.get(),
                total,
            })
        }
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// 0-based index into the selection.
    #[must_use]
    pub fn index(self) -> usize {
        // u32 always fits in usize on supported targets.
        usize::try_from(self.0.get() - 1).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn previous(self) -> Option<Self> {
        NonZeroU32::new(self.0.get() - 1).map(Self)
    }

    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Positions `1..=total`.
    pub fn range(total: usize) -> impl Iterator<Item = Position> {
        (0..total).filter_map(|i| Self::from_index(i).ok())
    }

    /// Key used in persisted answer maps (`q1`, `q2`, ...).
    #[must_use]
    pub fn key(self) -> String {
        format!("q{}", self.0)
    }

    fn parse_key(key: &str) -> Option<Self> {
        let digits = key.strip_prefix('q').unwrap_or(key);
        digits.parse::<u32>().ok().and_then(|v| Self::new(v).ok())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.get())
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u32::deserialize(deserializer)?;
        Position::new(raw).map_err(de::Error::custom)
    }
}

/// Recorded answers keyed by position, not by question id.
///
/// Values are the exact option text chosen. A missing key or a blank value
/// both mean "unanswered".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnswersByPosition(BTreeMap<Position, String>);

impl AnswersByPosition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer at `position`, or `""` when unanswered.
    #[must_use]
    pub fn get(&self, position: Position) -> &str {
        self.0.get(&position).map_or("", String::as_str)
    }

    /// Returns true if `position` holds a non-blank answer.
    #[must_use]
    pub fn is_answered(&self, position: Position) -> bool {
        !self.get(position).trim().is_empty()
    }

    /// Overwrite the answer at `position`.
    pub fn set(&mut self, position: Position, answer: impl Into<String>) {
        self.0.insert(position, answer.into());
    }

    /// Number of positions holding a non-blank answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.0.values().filter(|v| !v.trim().is_empty()).count()
    }

    /// Lowest position in `1..=total` without a non-blank answer.
    #[must_use]
    pub fn first_unanswered(&self, total: usize) -> Option<Position> {
        Position::range(total).find(|p| !self.is_answered(*p))
    }

    /// Dense copy covering exactly `1..=total`.
    ///
    /// Absent and whitespace-only values become `""`; positions past `total`
    /// are dropped.
    #[must_use]
    pub fn normalized(&self, total: usize) -> Self {
        Self(
            Position::range(total)
                .map(|p| {
                    let value = self.get(p);
                    let value = if value.trim().is_empty() { "" } else { value };
                    (p, value.to_owned())
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &str)> {
        self.0.iter().map(|(p, v)| (*p, v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Position, String)> for AnswersByPosition {
    fn from_iter<I: IntoIterator<Item = (Position, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for AnswersByPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (position, value) in &self.0 {
            map.serialize_entry(&position.key(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AnswersByPosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AnswersVisitor;

        impl<'de> Visitor<'de> for AnswersVisitor {
            type Value = AnswersByPosition;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of q<position> to answer text")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = BTreeMap::new();
                while let Some((key, value)) = access.next_entry::<String, Option<String>>()? {
                    // One stray key must not lose the rest of the attempt.
                    let Some(position) = Position::parse_key(&key) else {
                        warn!(%key, "skipping answer with invalid position key");
                        continue;
                    };
                    out.insert(position, value.unwrap_or_default());
                }
                Ok(AnswersByPosition(out))
            }
        }

        deserializer.deserialize_map(AnswersVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(v: u32) -> Position {
        Position::new(v).unwrap()
    }

    #[test]
    fn zero_is_not_a_position() {
        assert_eq!(Position::new(0), Err(PositionError::Zero));
        assert_eq!(Position::FIRST.get(), 1);
        assert_eq!(pos(1).previous(), None);
    }

    #[test]
    fn within_checks_upper_bound() {
        assert!(pos(3).within(3).is_ok());
        assert_eq!(
            pos(4).within(3),
            Err(PositionError::OutOfRange {
                position: 4,
                total: 3
            })
        );
    }

    #[test]
    fn serializes_with_q_keys() {
        let mut answers = AnswersByPosition::new();
        answers.set(pos(2), "B");
        answers.set(pos(1), "A");
        let json = serde_json::to_string(&answers).unwrap();
        assert_eq!(json, r#"{"q1":"A","q2":"B"}"#);
    }

    #[test]
    fn deserializes_q_and_numeric_keys_and_nulls() {
        let answers: AnswersByPosition =
            serde_json::from_str(r#"{"q1":"A","2":"B","q3":null}"#).unwrap();
        assert_eq!(answers.get(pos(1)), "A");
        assert_eq!(answers.get(pos(2)), "B");
        assert_eq!(answers.get(pos(3)), "");
        assert!(!answers.is_answered(pos(3)));
    }

    #[test]
    fn bad_keys_are_skipped_without_losing_the_rest() {
        let answers: AnswersByPosition =
            serde_json::from_str(r#"{"q0":"A","q1":"B","zz":"C"}"#).unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers.get(pos(1)), "B");
        assert!(serde_json::from_str::<AnswersByPosition>(r#"["A"]"#).is_err());
    }

    #[test]
    fn normalized_fills_blanks_and_drops_overflow() {
        let mut answers = AnswersByPosition::new();
        answers.set(pos(1), "A");
        answers.set(pos(2), "   ");
        answers.set(pos(9), "Z");
        let dense = answers.normalized(3);
        assert_eq!(dense.len(), 3);
        assert_eq!(dense.get(pos(2)), "");
        assert_eq!(dense.get(pos(3)), "");
        assert_eq!(dense.get(pos(9)), "");
        assert_eq!(dense.answered_count(), 1);
    }

    #[test]
    fn first_unanswered_skips_answered_prefix() {
        let mut answers = AnswersByPosition::new();
        answers.set(pos(1), "A");
        answers.set(pos(3), "C");
        assert_eq!(answers.first_unanswered(3), Some(pos(2)));
        answers.set(pos(2), "B");
        assert_eq!(answers.first_unanswered(3), None);
    }
}

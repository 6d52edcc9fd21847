//! Bidirectional mapping between spoilage labels and class ids.
//!
//! Ids follow the lexical (byte-wise) order of the distinct labels seen at
//! fit time, so refitting on the same data always yields the same ids:
//!
//! ```
//! use spoilage::preprocess::LabelCodec;
//!
//! let codec = LabelCodec::fit(["Fresh", "Completely Spoiled", "Fresh", "Partially Spoiled"]).unwrap();
//! assert_eq!(codec.classes(), &["Completely Spoiled", "Fresh", "Partially Spoiled"]);
//! assert_eq!(codec.encode("Fresh").unwrap().index(), 1);
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::ClassId;

/// Codec misuse or invalid codec state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("cannot fit a label codec on zero labels")]
    Empty,

    #[error("unknown label {0:?}: not seen during training")]
    UnknownLabel(String),

    #[error("unknown class id {id}: codec has {n_classes} classes")]
    UnknownClassId { id: u32, n_classes: usize },

    #[error("codec classes must be unique and sorted, got {0:?}")]
    NotCanonical(Vec<String>),
}

/// Fitted label ↔ [`ClassId`] mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCodec {
    classes: Vec<String>,
}

impl LabelCodec {
    /// Assign ids to the distinct labels in sorted order.
    pub fn fit<I, S>(labels: I) -> Result<Self, CodecError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = labels
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .collect();
        if distinct.is_empty() {
            return Err(CodecError::Empty);
        }
        Ok(Self {
            classes: distinct.into_iter().collect(),
        })
    }

    /// Rebuild from an explicit class list, which must already be canonical.
    pub fn from_classes(classes: Vec<String>) -> Result<Self, CodecError> {
        let codec = Self { classes };
        codec.validate()?;
        Ok(codec)
    }

    /// Check that classes are non-empty, unique and sorted.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.classes.is_empty() {
            return Err(CodecError::Empty);
        }
        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CodecError::NotCanonical(self.classes.clone()));
        }
        Ok(())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn encode(&self, label: &str) -> Result<ClassId, CodecError> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map(|i| ClassId::new(i as u32))
            .map_err(|_| CodecError::UnknownLabel(label.to_string()))
    }

    pub fn decode(&self, id: ClassId) -> Result<&str, CodecError> {
        self.classes
            .get(id.index())
            .map(String::as_str)
            .ok_or(CodecError::UnknownClassId {
                id: id.get(),
                n_classes: self.classes.len(),
            })
    }

    /// Encode a sequence; the first unknown label fails the whole batch.
    pub fn encode_all<I, S>(&self, labels: I) -> Result<Vec<ClassId>, CodecError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        labels.into_iter().map(|l| self.encode(l.as_ref())).collect()
    }

    /// Decode a sequence; the first unknown id fails the whole batch.
    pub fn decode_all(&self, ids: &[ClassId]) -> Result<Vec<String>, CodecError> {
        ids.iter()
            .map(|&id| self.decode(id).map(str::to_string))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn codec() -> LabelCodec {
        LabelCodec::fit(["Partially Spoiled", "Fresh", "Completely Spoiled", "Fresh"]).unwrap()
    }

    #[test]
    fn ids_follow_sorted_order() {
        let c = codec();
        assert_eq!(c.n_classes(), 3);
        assert_eq!(c.encode("Completely Spoiled").unwrap(), ClassId::new(0));
        assert_eq!(c.encode("Fresh").unwrap(), ClassId::new(1));
        assert_eq!(c.encode("Partially Spoiled").unwrap(), ClassId::new(2));
    }

    #[test]
    fn fit_is_order_independent() {
        let a = LabelCodec::fit(["b", "a", "c"]).unwrap();
        let b = LabelCodec::fit(["c", "c", "b", "a"]).unwrap();
        assert_eq!(a, b);
    }

    #[rstest]
    #[case("Completely Spoiled")]
    #[case("Fresh")]
    #[case("Partially Spoiled")]
    fn round_trip(#[case] label: &str) {
        let c = codec();
        assert_eq!(c.decode(c.encode(label).unwrap()).unwrap(), label);
    }

    #[rstest]
    #[case("fresh")]
    #[case("")]
    #[case("Spoiled")]
    fn unknown_label(#[case] label: &str) {
        assert_eq!(
            codec().encode(label),
            Err(CodecError::UnknownLabel(label.to_string()))
        );
    }

    #[test]
    fn unknown_class_id() {
        assert_eq!(
            codec().decode(ClassId::new(3)),
            Err(CodecError::UnknownClassId { id: 3, n_classes: 3 })
        );
    }

    #[test]
    fn batch_helpers() {
        let c = codec();
        let ids = c.encode_all(["Fresh", "Completely Spoiled"]).unwrap();
        assert_eq!(c.decode_all(&ids).unwrap(), vec!["Fresh", "Completely Spoiled"]);
        assert!(c.encode_all(["Fresh", "Rotten"]).is_err());
    }

    #[test]
    fn empty_and_non_canonical() {
        assert_eq!(LabelCodec::fit(Vec::<String>::new()), Err(CodecError::Empty));
        assert!(matches!(
            LabelCodec::from_classes(vec!["b".into(), "a".into()]),
            Err(CodecError::NotCanonical(_))
        ));
        assert!(LabelCodec::from_classes(vec!["a".into(), "b".into()]).is_ok());
    }
}

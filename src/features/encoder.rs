//! One-hot endpoint encoding with a persisted vocabulary

use crate::error::{ApiwatchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// One-hot encoder over endpoint names.
///
/// The vocabulary is the ordered set of endpoints seen during `fit`, in order
/// of first appearance. It is serialized with the model artifacts so later
/// batches encode against the same column set instead of re-deriving it.
///
/// Unseen endpoints map to an all-zero row by default (with a warning);
/// `strict(true)` makes them a [`ApiwatchError::SchemaMismatch`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointEncoder {
    vocabulary: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    strict: bool,
    is_fitted: bool,
}

impl Default for EndpointEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointEncoder {
    /// Create an unfitted encoder.
    pub fn new() -> Self {
        Self {
            vocabulary: Vec::new(),
            index: HashMap::new(),
            strict: false,
            is_fitted: false,
        }
    }

    /// Error on unseen endpoints instead of encoding them as all zeros.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Learn the vocabulary from a batch of endpoint names.
    pub fn fit<'a, I>(&mut self, endpoints: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.vocabulary.clear();
        self.index.clear();
        for endpoint in endpoints {
            if !self.index.contains_key(endpoint) {
                self.index.insert(endpoint.to_string(), self.vocabulary.len());
                self.vocabulary.push(endpoint.to_string());
            }
        }
        self.is_fitted = true;
        self
    }

    /// Rebuild the lookup index after deserialization.
    pub fn rebuild_index(&mut self) {
        self.index = self
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, e)| (e.clone(), i))
            .collect();
    }

    /// Number of one-hot columns.
    pub fn width(&self) -> usize {
        self.vocabulary.len()
    }

    /// Ordered vocabulary of endpoint names.
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Column names, `endpoint_<name>` per vocabulary entry.
    pub fn column_names(&self) -> Vec<String> {
        self.vocabulary
            .iter()
            .map(|e| format!("endpoint_{e}"))
            .collect()
    }

    /// Position of an endpoint in the vocabulary, if fitted.
    ///
    /// `Ok(None)` means the endpoint is unseen and the lenient policy applies.
    pub fn encode(&self, endpoint: &str) -> Result<Option<usize>> {
        if !self.is_fitted {
            return Err(ApiwatchError::ModelNotFitted);
        }
        match self.index.get(endpoint) {
            Some(&i) => Ok(Some(i)),
            None if self.strict => Err(ApiwatchError::SchemaMismatch(format!(
                "endpoint '{endpoint}' not in fitted vocabulary"
            ))),
            None => {
                warn!(endpoint, "unseen endpoint, encoding as all-zero");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_keeps_first_appearance_order() {
        let mut encoder = EndpointEncoder::new();
        encoder.fit(["/search", "/login", "/search", "/order"]);

        assert_eq!(encoder.vocabulary(), &["/search", "/login", "/order"]);
        assert_eq!(encoder.width(), 3);
        assert_eq!(encoder.encode("/login").unwrap(), Some(1));
    }

    #[test]
    fn test_unseen_endpoint_lenient() {
        let mut encoder = EndpointEncoder::new();
        encoder.fit(["/login"]);
        assert_eq!(encoder.encode("/unknown").unwrap(), None);
    }

    #[test]
    fn test_unseen_endpoint_strict() {
        let mut encoder = EndpointEncoder::new().strict(true);
        encoder.fit(["/login"]);
        assert!(matches!(
            encoder.encode("/unknown"),
            Err(ApiwatchError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_unfitted_encoder_errors() {
        let encoder = EndpointEncoder::new();
        assert!(matches!(
            encoder.encode("/login"),
            Err(ApiwatchError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_serde_round_trip_rebuilds_index() {
        let mut encoder = EndpointEncoder::new();
        encoder.fit(["/a", "/b"]);

        let json = serde_json::to_string(&encoder).unwrap();
        let mut back: EndpointEncoder = serde_json::from_str(&json).unwrap();
        back.rebuild_index();

        assert_eq!(back.encode("/b").unwrap(), Some(1));
    }
}

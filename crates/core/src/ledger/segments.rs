//! Segment-composed account identifiers.
//!
//! An account is identified by the ordered, hyphen-joined concatenation of
//! its segment values (e.g. `10-705-1105`). Each position has a fixed
//! length and an approved value list; composition validates against both.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// The literal hyphen-joined account identifier.
///
/// Kept as the joined string for layout compatibility with everything that
/// persists account references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountCode(String);

impl AccountCode {
    /// Wraps an already validated identifier. Prefer
    /// [`SegmentSchema::compose`] for new codes.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One fixed-length positional component of an account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDefinition {
    /// 1-based position within the identifier.
    pub position: usize,
    /// Exact character length every value at this position must have.
    pub length: usize,
    /// Human name (e.g. "natural account").
    pub name: String,
}

/// Approved values per position plus the position definitions.
///
/// Built once at startup; value activation flips are the only runtime
/// mutation, guarded by the posting service.
#[derive(Debug, Clone)]
pub struct SegmentSchema {
    definitions: Vec<SegmentDefinition>,
    /// Per position: value -> active flag.
    values: Vec<BTreeMap<String, bool>>,
    /// Reject the same value appearing at more than one position.
    forbid_value_reuse: bool,
}

impl SegmentSchema {
    /// Creates a schema from ordered definitions.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidSegmentCombination`] if positions are
    /// not contiguous from 1 or a length is zero.
    pub fn new(definitions: Vec<SegmentDefinition>) -> Result<Self, LedgerError> {
        for (index, definition) in definitions.iter().enumerate() {
            if definition.position != index + 1 {
                return Err(LedgerError::InvalidSegmentCombination {
                    position: definition.position,
                    reason: format!("expected position {}", index + 1),
                });
            }
            if definition.length == 0 {
                return Err(LedgerError::InvalidSegmentCombination {
                    position: definition.position,
                    reason: "length must be at least 1".to_string(),
                });
            }
        }
        let values = vec![BTreeMap::new(); definitions.len()];
        Ok(Self {
            definitions,
            values,
            forbid_value_reuse: true,
        })
    }

    /// Allows the same value at multiple positions.
    #[must_use]
    pub fn allow_value_reuse(mut self) -> Self {
        self.forbid_value_reuse = false;
        self
    }

    /// The position definitions, in order.
    #[must_use]
    pub fn definitions(&self) -> &[SegmentDefinition] {
        &self.definitions
    }

    /// Approves a value for a position (active by default).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidSegmentCombination`] if the position is
    /// unknown or the value's length does not match the definition.
    pub fn add_value(&mut self, position: usize, value: &str) -> Result<(), LedgerError> {
        let definition = self.definition_at(position)?;
        if value.chars().count() != definition.length {
            return Err(LedgerError::InvalidSegmentCombination {
                position,
                reason: format!("must be {} characters", definition.length),
            });
        }
        self.values[position - 1].insert(value.to_string(), true);
        Ok(())
    }

    /// Deactivates an approved value. Existing accounts keep referencing
    /// it; new compositions reject it.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidSegmentCombination`] if the position or
    /// value is unknown.
    pub fn deactivate_value(&mut self, position: usize, value: &str) -> Result<(), LedgerError> {
        self.set_value_active(position, value, false)
    }

    /// Re-activates a previously deactivated value.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidSegmentCombination`] if the position or
    /// value is unknown.
    pub fn activate_value(&mut self, position: usize, value: &str) -> Result<(), LedgerError> {
        self.set_value_active(position, value, true)
    }

    /// Validates an ordered value list and returns the composed identifier.
    ///
    /// The error names the first offending position.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidSegmentCombination`] naming the first
    /// position whose value is missing, mis-sized, undefined, inactive, or
    /// a forbidden duplicate.
    pub fn compose(&self, values: &[&str]) -> Result<AccountCode, LedgerError> {
        if values.len() != self.definitions.len() {
            return Err(LedgerError::InvalidSegmentCombination {
                position: values.len().min(self.definitions.len()) + 1,
                reason: format!(
                    "expected {} segment values, got {}",
                    self.definitions.len(),
                    values.len()
                ),
            });
        }

        for (definition, value) in self.definitions.iter().zip(values) {
            self.check_value(definition, value)?;
        }

        if self.forbid_value_reuse {
            for (index, value) in values.iter().enumerate() {
                if values[..index].contains(value) {
                    return Err(LedgerError::InvalidSegmentCombination {
                        position: index + 1,
                        reason: format!("value {value} already used at an earlier position"),
                    });
                }
            }
        }

        Ok(AccountCode(values.join("-")))
    }

    /// Splits an identifier back into its segment values, validating each
    /// against the schema.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidSegmentCombination`] if the identifier
    /// does not match the schema.
    pub fn parse(&self, code: &AccountCode) -> Result<Vec<String>, LedgerError> {
        let parts: Vec<&str> = code.as_str().split('-').collect();
        if parts.len() != self.definitions.len() {
            return Err(LedgerError::InvalidSegmentCombination {
                position: parts.len().min(self.definitions.len()) + 1,
                reason: format!(
                    "expected {} segments, got {}",
                    self.definitions.len(),
                    parts.len()
                ),
            });
        }
        for (definition, part) in self.definitions.iter().zip(&parts) {
            if part.chars().count() != definition.length {
                return Err(LedgerError::InvalidSegmentCombination {
                    position: definition.position,
                    reason: format!("must be {} characters", definition.length),
                });
            }
        }
        Ok(parts.into_iter().map(str::to_string).collect())
    }

    fn check_value(&self, definition: &SegmentDefinition, value: &str) -> Result<(), LedgerError> {
        if value.chars().count() != definition.length {
            return Err(LedgerError::InvalidSegmentCombination {
                position: definition.position,
                reason: format!("must be {} characters", definition.length),
            });
        }
        match self.values[definition.position - 1].get(value) {
            None => Err(LedgerError::InvalidSegmentCombination {
                position: definition.position,
                reason: format!("value {value} is not an approved {}", definition.name),
            }),
            Some(false) => Err(LedgerError::InvalidSegmentCombination {
                position: definition.position,
                reason: format!("value {value} is inactive"),
            }),
            Some(true) => Ok(()),
        }
    }

    fn set_value_active(
        &mut self,
        position: usize,
        value: &str,
        active: bool,
    ) -> Result<(), LedgerError> {
        let _ = self.definition_at(position)?;
        match self.values[position - 1].get_mut(value) {
            Some(flag) => {
                *flag = active;
                Ok(())
            }
            None => Err(LedgerError::InvalidSegmentCombination {
                position,
                reason: format!("value {value} is not defined"),
            }),
        }
    }

    fn definition_at(&self, position: usize) -> Result<&SegmentDefinition, LedgerError> {
        self.definitions
            .get(position.wrapping_sub(1))
            .ok_or_else(|| LedgerError::InvalidSegmentCombination {
                position,
                reason: format!("schema has {} positions", self.definitions.len()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(super) fn schema() -> SegmentSchema {
        let mut schema = SegmentSchema::new(vec![
            SegmentDefinition {
                position: 1,
                length: 2,
                name: "company".to_string(),
            },
            SegmentDefinition {
                position: 2,
                length: 3,
                name: "department".to_string(),
            },
            SegmentDefinition {
                position: 3,
                length: 4,
                name: "natural account".to_string(),
            },
        ])
        .unwrap();
        schema.add_value(1, "10").unwrap();
        schema.add_value(2, "705").unwrap();
        schema.add_value(3, "1105").unwrap();
        schema
    }

    #[test]
    fn test_compose_joins_in_position_order() {
        let schema = schema();
        let code = schema.compose(&["10", "705", "1105"]).unwrap();
        assert_eq!(code.as_str(), "10-705-1105");
    }

    #[test]
    fn test_compose_parse_round_trip() {
        let schema = schema();
        let code = schema.compose(&["10", "705", "1105"]).unwrap();
        assert_eq!(schema.parse(&code).unwrap(), vec!["10", "705", "1105"]);
    }

    #[test]
    fn test_wrong_length_names_position() {
        let schema = schema();
        let err = schema.compose(&["10", "70", "1105"]).unwrap_err();
        match err {
            LedgerError::InvalidSegmentCombination { position, reason } => {
                assert_eq!(position, 2);
                assert_eq!(reason, "must be 3 characters");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wrong_count_rejected() {
        let schema = schema();
        assert!(matches!(
            schema.compose(&["10", "705"]),
            Err(LedgerError::InvalidSegmentCombination { .. })
        ));
        assert!(matches!(
            schema.compose(&["10", "705", "1105", "99"]),
            Err(LedgerError::InvalidSegmentCombination { .. })
        ));
    }

    #[test]
    fn test_undefined_value_rejected() {
        let schema = schema();
        let err = schema.compose(&["10", "999", "1105"]).unwrap_err();
        match err {
            LedgerError::InvalidSegmentCombination { position, .. } => assert_eq!(position, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inactive_value_rejected() {
        let mut schema = schema();
        schema.deactivate_value(3, "1105").unwrap();
        let err = schema.compose(&["10", "705", "1105"]).unwrap_err();
        match err {
            LedgerError::InvalidSegmentCombination { position, reason } => {
                assert_eq!(position, 3);
                assert!(reason.contains("inactive"));
            }
            other => panic!("unexpected error: {other}"),
        }

        schema.activate_value(3, "1105").unwrap();
        assert!(schema.compose(&["10", "705", "1105"]).is_ok());
    }

    #[test]
    fn test_value_reuse_forbidden_by_default() {
        let mut schema = SegmentSchema::new(vec![
            SegmentDefinition {
                position: 1,
                length: 2,
                name: "company".to_string(),
            },
            SegmentDefinition {
                position: 2,
                length: 2,
                name: "branch".to_string(),
            },
        ])
        .unwrap();
        schema.add_value(1, "10").unwrap();
        schema.add_value(2, "10").unwrap();

        let err = schema.compose(&["10", "10"]).unwrap_err();
        match err {
            LedgerError::InvalidSegmentCombination { position, .. } => assert_eq!(position, 2),
            other => panic!("unexpected error: {other}"),
        }

        let relaxed = schema.allow_value_reuse();
        assert_eq!(relaxed.compose(&["10", "10"]).unwrap().as_str(), "10-10");
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let mut schema = schema();
        // Two characters, three bytes.
        schema.add_value(1, "Å1").unwrap();
        schema.add_value(2, "705").unwrap();
        let code = schema.compose(&["Å1", "705", "1105"]).unwrap();
        assert_eq!(schema.parse(&code).unwrap(), vec!["Å1", "705", "1105"]);

        // One character, two bytes: wrong length for position 1.
        assert!(matches!(
            schema.add_value(1, "É"),
            Err(LedgerError::InvalidSegmentCombination { position: 1, .. })
        ));
    }

    #[test]
    fn test_add_value_validates_length() {
        let mut schema = schema();
        assert!(matches!(
            schema.add_value(1, "100"),
            Err(LedgerError::InvalidSegmentCombination { position: 1, .. })
        ));
    }

    #[test]
    fn test_non_contiguous_positions_rejected() {
        let result = SegmentSchema::new(vec![SegmentDefinition {
            position: 2,
            length: 2,
            name: "company".to_string(),
        }]);
        assert!(matches!(
            result,
            Err(LedgerError::InvalidSegmentCombination { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_code() {
        let schema = schema();
        assert!(schema.parse(&AccountCode::new("10-705")).is_err());
        assert!(schema.parse(&AccountCode::new("1-705-1105")).is_err());
    }
}

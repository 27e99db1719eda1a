//! Label decoder for categorical classifier targets

use super::LabelDecoder;
use crate::error::ArtifactError;
use serde::{Deserialize, Serialize};

/// Original labels, indexed by encoded class id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoderModel {
    pub classes: Vec<String>,
}

impl LabelEncoderModel {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.classes.is_empty() {
            return Err(ArtifactError::Invalid("label encoder has no classes".to_string()));
        }
        Ok(())
    }
}

impl LabelDecoder for LabelEncoderModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn inverse_transform(&self, code: i64) -> Result<String, ArtifactError> {
        usize::try_from(code)
            .ok()
            .and_then(|i| self.classes.get(i))
            .cloned()
            .ok_or(ArtifactError::UnknownLabel(code))
    }
}

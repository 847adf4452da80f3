use serde::{Deserialize, Serialize};

use crate::types::ModelDescriptor;

/// Response of the catalog endpoint.
///
/// The catalog has been served both wrapped in an object and as a bare array;
/// both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelCatalog {
    /// `{"models": [...]}`
    Wrapped {
        /// The advertised models.
        models: Vec<ModelDescriptor>,
    },

    /// `[...]`
    Bare(Vec<ModelDescriptor>),
}

impl ModelCatalog {
    /// Consume the catalog and return its models in catalog order.
    pub fn into_models(self) -> Vec<ModelDescriptor> {
        match self {
            ModelCatalog::Wrapped { models } => models,
            ModelCatalog::Bare(models) => models,
        }
    }
}

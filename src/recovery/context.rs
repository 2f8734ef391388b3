//! Data handed between the two phases of one logical operation.
//!
//! Pre/post hooks around user creation need to share arbitrary request
//! properties and a temporary claim (e.g. `verifyEmail` or `askPassword`)
//! that must not reach the user store in the first phase. The context is
//! created per operation and passed by reference to both phases.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Property {
    pub key: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Claim {
    pub uri: String,
    pub value: String,
}

#[derive(Clone, Debug, Default)]
pub struct OperationContext {
    properties: Vec<Property>,
    temporary_claim: Option<Claim>,
}

impl OperationContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_properties(properties: Vec<Property>) -> Self {
        Self {
            properties,
            temporary_claim: None,
        }
    }

    /// Properties set for this operation; empty when none were set.
    #[must_use]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn set_properties(&mut self, properties: Vec<Property>) {
        self.properties = properties;
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|property| property.key == key)
            .map(|property| property.value.as_str())
    }

    pub fn clear_properties(&mut self) {
        self.properties.clear();
    }

    pub fn set_temporary_claim(&mut self, claim: Claim) {
        self.temporary_claim = Some(claim);
    }

    #[must_use]
    pub fn temporary_claim(&self) -> Option<&Claim> {
        self.temporary_claim.as_ref()
    }

    /// Remove and return the temporary claim, so the post phase consumes it once.
    pub fn take_temporary_claim(&mut self) -> Option<Claim> {
        self.temporary_claim.take()
    }
}

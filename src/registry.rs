//! Concrete collection registry.
//!
//! Maps each collection contract to the concrete container used to
//! materialize a destination declared as that contract. The table is fixed
//! once an engine is built; configuration may override or extend the
//! standard entries before that point.

use std::collections::HashMap;

use record_types::{Container, Contract, TypeDesc, TypeRef};
use serde::{Deserialize, Serialize};

use crate::error::MapError;

/// One contract -> container entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub contract: Contract,
    pub container: Container,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcreteCollectionRegistry {
    entries: HashMap<Contract, Container>,
}

impl Default for ConcreteCollectionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ConcreteCollectionRegistry {
    /// The standard table: mutable contracts are backed by growable
    /// containers, read-only contracts by the read-only wrapper
    pub fn standard() -> Self {
        let entries = HashMap::from([
            (Contract::Sequence, Container::List),
            (Contract::List, Container::List),
            (Contract::ReadOnlyList, Container::ReadOnly),
            (Contract::ReadOnlyCollection, Container::ReadOnly),
            (Contract::Collection, Container::Collection),
        ]);
        Self { entries }
    }

    /// A registry with no entries
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with_entry(mut self, contract: Contract, container: Container) -> Self {
        self.entries.insert(contract, container);
        self
    }

    pub fn apply(mut self, overrides: &[RegistryEntry]) -> Self {
        for entry in overrides {
            self.entries.insert(entry.contract, entry.container);
        }
        self
    }

    pub fn container_for(&self, contract: Contract) -> Option<Container> {
        self.entries.get(&contract).copied()
    }

    /// Concrete container type for `contract` over `element`
    pub fn resolve(&self, contract: Contract, element: &TypeRef) -> Result<TypeRef, MapError> {
        let container = self.container_for(contract).ok_or_else(|| {
            MapError::Configuration(format!(
                "no concrete container registered for dyn {}<>",
                contract.as_str()
            ))
        })?;
        Ok(TypeDesc::container(container, element.clone()))
    }
}

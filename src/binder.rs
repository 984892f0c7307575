//! Member binding: which column each destination member reads from.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use record_types::{MemberDesc, TypeRef};
use tracing::trace;

/// Resolves and caches the column name bound to each (type, member) pair.
///
/// An explicit column override on the member wins; otherwise the member's
/// own name is used verbatim. Matching against stream columns is exact and
/// case-sensitive.
///
/// Bindings are keyed by type name, so a later descriptor reusing a name
/// inherits the overrides cached for the first one.
#[derive(Debug, Default)]
pub struct MemberBinder {
    bindings: RwLock<HashMap<String, HashMap<String, Arc<str>>>>,
}

impl MemberBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve_column_name(&self, ty: &TypeRef, member: &MemberDesc) -> Arc<str> {
        if let Some(name) = self
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(ty.name())
            .and_then(|members| members.get(member.name()))
        {
            return name.clone();
        }

        let column: Arc<str> = Arc::from(member.column_override().unwrap_or(member.name()));
        trace!(
            destination = %ty,
            member = member.name(),
            column = &*column,
            "bound member to column"
        );

        let mut bindings = self
            .bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        bindings
            .entry(ty.name().to_string())
            .or_default()
            .entry(member.name().to_string())
            .or_insert(column)
            .clone()
    }

    /// Number of types with at least one cached binding
    pub fn bound_types(&self) -> usize {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

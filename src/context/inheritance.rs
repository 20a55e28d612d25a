// Copyright 2025 Cowboy AI, LLC.

//! Context inheritance resolution
//!
//! Types without their own configuration still receive mixins through their
//! generic definition, their interfaces and their base type.
//!
//! ```mermaid
//! graph TD
//!     Q[query type] -->|exact lookup| E{configured?}
//!     E -->|yes| R[returned as-is]
//!     E -->|no| G[generic definition]
//!     E -->|no| I[interfaces not implemented by the base]
//!     E -->|no| B[base type]
//!     G --> U[union by identity]
//!     I --> U
//!     B --> U
//!     U --> D[derived context or none]
//! ```

use indexmap::IndexSet;
use tracing::debug;

use super::class_context::ClassContext;
use crate::errors::ConfigurationResult;
use crate::types::{TypeId, TypeIntrospector};

/// Synthesizes contexts for types that are not directly configured
#[derive(Clone, Copy)]
pub struct ContextInheritanceResolver<'a> {
    types: &'a dyn TypeIntrospector,
}

impl<'a> ContextInheritanceResolver<'a> {
    /// Create a resolver over a type graph
    pub fn new(types: &'a dyn TypeIntrospector) -> Self {
        Self { types }
    }

    /// Context of `ty`: the exact match if there is one, otherwise the union
    /// of every parent context, tagged as derived
    ///
    /// Both callbacks return `Ok(None)` when no configuration applies.
    pub fn resolve<E, R>(
        &self,
        ty: TypeId,
        exact: E,
        recursive: R,
    ) -> ConfigurationResult<Option<ClassContext>>
    where
        E: Fn(TypeId) -> ConfigurationResult<Option<ClassContext>>,
        R: Fn(TypeId) -> ConfigurationResult<Option<ClassContext>>,
    {
        if let Some(context) = exact(ty)? {
            return Ok(Some(context));
        }

        let parents = self.parent_contexts(ty, recursive)?;
        let mut contributors = parents.into_iter();
        let Some(first) = contributors.next() else {
            return Ok(None);
        };
        let merged = contributors.fold(first, |merged, context| merged.union(&context));

        debug!(
            "Derived context for {} with {} mixin(s)",
            self.types.full_name(ty),
            merged.mixins().len()
        );
        Ok(Some(merged.derived_for(ty)))
    }

    /// Contexts contributed by the generic definition, the interfaces and the
    /// base type of `ty`, in that order
    ///
    /// Interfaces also implemented by the base type are left to the base
    /// type's own resolution.
    pub fn parent_contexts<R>(&self, ty: TypeId, recursive: R) -> ConfigurationResult<Vec<ClassContext>>
    where
        R: Fn(TypeId) -> ConfigurationResult<Option<ClassContext>>,
    {
        let mut sources: IndexSet<TypeId> = IndexSet::new();

        if self.types.is_constructed_generic(ty) {
            if let Some(definition) = self.types.generic_type_definition(ty) {
                sources.insert(definition);
            }
        }

        let base = self.types.base_type(ty);
        let inherited_interfaces: Vec<TypeId> = base
            .map(|base| self.types.interfaces(base))
            .unwrap_or_default();
        sources.extend(
            self.types
                .interfaces(ty)
                .into_iter()
                .filter(|iface| !inherited_interfaces.contains(iface)),
        );

        if let Some(base) = base {
            sources.insert(base);
        }
        sources.shift_remove(&ty);

        let mut contexts = Vec::new();
        for source in sources {
            if let Some(context) = recursive(source)? {
                contexts.push(context);
            }
        }
        Ok(contexts)
    }
}

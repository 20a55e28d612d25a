// Copyright 2025 Cowboy AI, LLC.

//! Build-once memoization of composition plans

use dashmap::DashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use super::{DefinitionBuilder, TargetClassDefinition};
use crate::context::ClassContext;
use crate::errors::ConfigurationResult;
use crate::types::TypeId;

type CachedBuild = Arc<OnceLock<ConfigurationResult<Arc<TargetClassDefinition>>>>;

/// Memoizing cache around a [`DefinitionBuilder`]
///
/// Concurrent requests for one `(type, context)` key trigger a single build;
/// the other callers block until it finishes. Failures are cached as well,
/// since the same input always fails the same way. Different keys build
/// independently.
pub struct DefinitionCache<'a> {
    builder: DefinitionBuilder<'a>,
    entries: DashMap<(TypeId, ClassContext), CachedBuild>,
}

impl<'a> DefinitionCache<'a> {
    /// Cache around a builder
    pub fn new(builder: DefinitionBuilder<'a>) -> Self {
        Self {
            builder,
            entries: DashMap::new(),
        }
    }

    /// The wrapped builder
    pub fn builder(&self) -> &DefinitionBuilder<'a> {
        &self.builder
    }

    /// Plan for `context`, building it on first request
    pub fn get_or_build(
        &self,
        context: &ClassContext,
    ) -> ConfigurationResult<Arc<TargetClassDefinition>> {
        let key = (context.ty(), context.clone());
        // The shard lock is released before building
        let cell = self
            .entries
            .entry(key)
            .or_insert_with(|| Arc::new(OnceLock::new()))
            .value()
            .clone();

        cell.get_or_init(|| {
            debug!(
                "Building definition for {}",
                self.builder.types().full_name(context.ty())
            );
            self.builder.build(context).map(Arc::new)
        })
        .clone()
    }

    /// Number of cached keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every cached plan
    pub fn clear(&self) {
        self.entries.clear();
    }
}

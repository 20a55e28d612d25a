// Copyright 2025 Cowboy AI, LLC.

//! Override resolution
//!
//! Matches each override-marked member to the single member it overrides.
//! Candidates share kind, name and signature with the overrider and occupy
//! an overridable slot; a marker restricted to a mixin type only considers
//! candidates owned by entities ascribable to that type.

use std::cell::OnceCell;
use std::collections::HashMap;
use tracing::debug;

use crate::annotations::OverrideMarker;
use crate::definitions::{MemberDefId, MemberDefinition};
use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::types::{Ascription, TypeIntrospector};

/// Resolves overriders against one set of candidate base members
pub struct OverrideResolver<'a> {
    types: &'a dyn TypeIntrospector,
    candidates: Vec<&'a MemberDefinition>,
    by_name: OnceCell<HashMap<&'a str, Vec<&'a MemberDefinition>>>,
}

impl<'a> OverrideResolver<'a> {
    /// Create a resolver over the candidate base members
    pub fn new(
        types: &'a dyn TypeIntrospector,
        candidates: impl IntoIterator<Item = &'a MemberDefinition>,
    ) -> Self {
        Self {
            types,
            candidates: candidates.into_iter().collect(),
            by_name: OnceCell::new(),
        }
    }

    fn candidates_named(&self, name: &str) -> &[&'a MemberDefinition] {
        let by_name = self.by_name.get_or_init(|| {
            let mut by_name: HashMap<&'a str, Vec<&'a MemberDefinition>> = HashMap::new();
            for &candidate in &self.candidates {
                by_name.entry(candidate.name()).or_default().push(candidate);
            }
            by_name
        });
        by_name.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// The single member `overrider` overrides
    pub fn resolve(&self, overrider: &MemberDefinition) -> ConfigurationResult<MemberDefId> {
        let restriction = match overrider.override_marker() {
            Some(OverrideMarker::Mixin(restriction)) => restriction,
            _ => None,
        };

        let matches: Vec<&MemberDefinition> = self
            .candidates_named(overrider.name())
            .iter()
            .copied()
            .filter(|candidate| {
                candidate.id() != overrider.id()
                    && candidate.info().has_same_shape(overrider.info())
                    && candidate.info().slot.is_overridable()
            })
            .filter(|candidate| {
                restriction.map_or(true, |ascribee| {
                    Ascription::of(self.types, candidate.entity_type(), ascribee).is_related()
                })
            })
            .collect();

        match matches.as_slice() {
            [] => Err(ConfigurationError::OverrideTargetNotFound {
                overrider: overrider.full_name().to_string(),
            }),
            [base] => {
                debug!("{} overrides {}", overrider.full_name(), base.full_name());
                Ok(base.id())
            }
            candidates => Err(ConfigurationError::AmbiguousOverride {
                overrider: overrider.full_name().to_string(),
                candidates: candidates
                    .iter()
                    .map(|candidate| candidate.full_name().to_string())
                    .collect(),
            }),
        }
    }

    /// Lazily pair every marked overrider with its base member
    ///
    /// Members without an override marker are skipped.
    pub fn analyze<'s, 'm, I>(
        &'s self,
        overriders: I,
    ) -> impl Iterator<Item = ConfigurationResult<(MemberDefId, MemberDefId)>> + use<'s, 'a, 'm, I>
    where
        'm: 's,
        I: IntoIterator<Item = &'m MemberDefinition>,
        I::IntoIter: 's,
    {
        overriders
            .into_iter()
            .filter(|overrider| overrider.override_marker().is_some())
            .map(move |overrider| {
                self.resolve(overrider)
                    .map(|base| (overrider.id(), base))
            })
    }
}

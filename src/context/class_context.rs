// Copyright 2025 Cowboy AI, LLC.

//! Per-type composition configuration
//!
//! A [`ClassContext`] is an immutable value object: the mixins configured for
//! one target type together with the interfaces the composed type must fully
//! expose. New contexts are produced by construction and by
//! [`ClassContext::inherit_from`], never by mutation.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use tracing::debug;

use super::mixin_entry::{MixinEntry, MixinEntryCollection};
use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::types::{generic_normalized, Ascription, TypeId, TypeIntrospector};

/// Where a context came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContextOrigin {
    /// Produced by a configuration source for exactly this type
    #[default]
    Configured,
    /// Synthesized from the contexts of base types, interfaces or generic definitions
    Derived,
}

/// Mixins and complete interfaces configured for one type
///
/// Invariants: `complete_interfaces` holds interfaces only, and `mixins` has
/// at most one entry per mixin type. The origin tag does not take part in
/// equality or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassContext {
    ty: TypeId,
    mixins: MixinEntryCollection,
    complete_interfaces: IndexSet<TypeId>,
    #[serde(default)]
    origin: ContextOrigin,
}

impl ClassContext {
    /// Context without mixins or complete interfaces
    pub fn empty(ty: TypeId) -> Self {
        Self {
            ty,
            mixins: MixinEntryCollection::new(),
            complete_interfaces: IndexSet::new(),
            origin: ContextOrigin::Configured,
        }
    }

    /// Create a context, validating its invariants
    pub fn try_new(
        types: &dyn TypeIntrospector,
        ty: TypeId,
        mixins: impl IntoIterator<Item = MixinEntry>,
        complete_interfaces: impl IntoIterator<Item = TypeId>,
    ) -> ConfigurationResult<Self> {
        let mut context = Self::empty(ty);
        for entry in mixins {
            context.push_mixin(types, entry)?;
        }
        for interface in complete_interfaces {
            context.push_complete_interface(types, interface)?;
        }
        Ok(context)
    }

    /// Copy of this context with one more mixin
    pub fn with_mixin(
        &self,
        types: &dyn TypeIntrospector,
        entry: MixinEntry,
    ) -> ConfigurationResult<Self> {
        let mut context = self.clone();
        context.push_mixin(types, entry)?;
        Ok(context)
    }

    /// Copy of this context with one more complete interface
    pub fn with_complete_interface(
        &self,
        types: &dyn TypeIntrospector,
        interface: TypeId,
    ) -> ConfigurationResult<Self> {
        let mut context = self.clone();
        context.push_complete_interface(types, interface)?;
        Ok(context)
    }

    fn push_mixin(&mut self, types: &dyn TypeIntrospector, entry: MixinEntry) -> ConfigurationResult<()> {
        let mixin = entry.mixin_type();
        if !self.mixins.add(entry) {
            return Err(ConfigurationError::DuplicateMixin {
                target: types.full_name(self.ty).to_string(),
                mixin: types.full_name(mixin).to_string(),
            });
        }
        Ok(())
    }

    fn push_complete_interface(
        &mut self,
        types: &dyn TypeIntrospector,
        interface: TypeId,
    ) -> ConfigurationResult<()> {
        if !types.is_interface(interface) {
            return Err(ConfigurationError::InvalidCompleteInterface {
                target: types.full_name(self.ty).to_string(),
                interface: types.full_name(interface).to_string(),
            });
        }
        self.complete_interfaces.insert(interface);
        Ok(())
    }

    /// The configured type
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// Configured mixins
    pub fn mixins(&self) -> &MixinEntryCollection {
        &self.mixins
    }

    /// Interfaces the composed type must fully expose
    pub fn complete_interfaces(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.complete_interfaces.iter().copied()
    }

    /// Whether `interface` is a complete interface of this context
    pub fn has_complete_interface(&self, interface: TypeId) -> bool {
        self.complete_interfaces.contains(&interface)
    }

    /// Where the context came from
    pub fn origin(&self) -> ContextOrigin {
        self.origin
    }

    /// Whether the context was synthesized rather than configured
    pub fn is_derived(&self) -> bool {
        self.origin == ContextOrigin::Derived
    }

    /// Whether the context configures neither mixins nor complete interfaces
    pub fn is_empty(&self) -> bool {
        self.mixins.is_empty() && self.complete_interfaces.is_empty()
    }

    /// Context for the same type, adding whatever `base` configures that this
    /// context does not already cover
    ///
    /// Own configuration always wins: a base mixin is skipped when an own
    /// entry is the same as or more specific than it. When the base mixin is
    /// more specific than an own entry, the merge fails, since inheriting it
    /// would replace the explicit, less specific choice.
    pub fn inherit_from(
        &self,
        base: &ClassContext,
        types: &dyn TypeIntrospector,
    ) -> ConfigurationResult<ClassContext> {
        let mut mixins = self.mixins.clone();

        for inherited in base.mixins.iter() {
            if self.mixins.contains_override_for_mixin(inherited.mixin_type(), types) {
                continue;
            }

            let overridden = self.mixins.iter().find(|own| {
                Ascription::of(
                    types,
                    inherited.mixin_type(),
                    generic_normalized(types, own.mixin_type()),
                )
                .is_related()
            });
            if let Some(configured) = overridden {
                return Err(ConfigurationError::InheritanceConflict {
                    target: types.full_name(self.ty).to_string(),
                    inherited: types.full_name(inherited.mixin_type()).to_string(),
                    base: types.full_name(base.ty).to_string(),
                    configured: types.full_name(configured.mixin_type()).to_string(),
                });
            }

            mixins.add(inherited.clone());
        }

        let mut complete_interfaces = self.complete_interfaces.clone();
        complete_interfaces.extend(base.complete_interfaces.iter().copied());

        debug!(
            "{} inherits {} mixin(s) from {}",
            types.full_name(self.ty),
            mixins.len() - self.mixins.len(),
            types.full_name(base.ty)
        );

        Ok(ClassContext {
            ty: self.ty,
            mixins,
            complete_interfaces,
            origin: self.origin,
        })
    }

    /// Inherit from several base contexts in order
    pub fn inherit_from_all<'a>(
        &self,
        bases: impl IntoIterator<Item = &'a ClassContext>,
        types: &dyn TypeIntrospector,
    ) -> ConfigurationResult<ClassContext> {
        bases
            .into_iter()
            .try_fold(self.clone(), |context, base| context.inherit_from(base, types))
    }

    /// Plain set union by type identity, keeping this context's type and origin
    pub fn union(&self, other: &ClassContext) -> ClassContext {
        let mut complete_interfaces = self.complete_interfaces.clone();
        complete_interfaces.extend(other.complete_interfaces.iter().copied());
        ClassContext {
            ty: self.ty,
            mixins: self.mixins.union(&other.mixins),
            complete_interfaces,
            origin: self.origin,
        }
    }

    /// The same configuration, re-targeted at `ty` and tagged as derived
    pub fn derived_for(self, ty: TypeId) -> ClassContext {
        ClassContext {
            ty,
            origin: ContextOrigin::Derived,
            ..self
        }
    }
}

impl PartialEq for ClassContext {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
            && self.mixins == other.mixins
            && self.complete_interfaces == other.complete_interfaces
    }
}

impl Eq for ClassContext {}

impl Hash for ClassContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.hash(state);
        self.mixins.hash(state);
        let mut interfaces: Vec<_> = self.complete_interfaces.iter().collect();
        interfaces.sort();
        interfaces.hash(state);
    }
}

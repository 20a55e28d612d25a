// Copyright 2025 Cowboy AI, LLC.

//! Registry of configured class contexts

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::class_context::ClassContext;
use super::inheritance::ContextInheritanceResolver;
use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::types::{TypeId, TypeIntrospector};

/// Raw contexts produced by configuration sources, keyed by configured type
///
/// The registry answers the effective context of any type: a configured
/// type's own context inheriting from its parents, or a derived context for
/// types that are only configured through their parents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixinConfiguration {
    contexts: IndexMap<TypeId, ClassContext>,
}

impl MixinConfiguration {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the context of one type
    ///
    /// A second context for an already configured type is merged into the
    /// first by identity; mixins configured twice are rejected.
    pub fn add(
        &mut self,
        types: &dyn TypeIntrospector,
        context: ClassContext,
    ) -> ConfigurationResult<()> {
        let ty = context.ty();
        let merged = match self.contexts.get(&ty) {
            Some(existing) => {
                if let Some(duplicate) = context
                    .mixins()
                    .mixin_types()
                    .find(|&mixin| existing.mixins().contains(mixin))
                {
                    return Err(ConfigurationError::DuplicateMixin {
                        target: types.full_name(ty).to_string(),
                        mixin: types.full_name(duplicate).to_string(),
                    });
                }
                existing.union(&context)
            }
            None => context,
        };
        self.contexts.insert(ty, merged);
        Ok(())
    }

    /// Builder form of [`MixinConfiguration::add`]
    pub fn with_context(
        mut self,
        types: &dyn TypeIntrospector,
        context: ClassContext,
    ) -> ConfigurationResult<Self> {
        self.add(types, context)?;
        Ok(self)
    }

    /// Context configured for exactly this type, without inheritance
    pub fn configured_context(&self, ty: TypeId) -> Option<&ClassContext> {
        self.contexts.get(&ty)
    }

    /// Configured contexts in registration order
    pub fn contexts(&self) -> impl Iterator<Item = &ClassContext> + '_ {
        self.contexts.values()
    }

    /// Number of configured types
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Whether no type is configured
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Effective context of `ty`, or `None` when nothing applies to it
    pub fn class_context(
        &self,
        types: &dyn TypeIntrospector,
        ty: TypeId,
    ) -> ConfigurationResult<Option<ClassContext>> {
        let resolver = ContextInheritanceResolver::new(types);
        resolver.resolve(
            ty,
            |t| self.inherited_context(types, t),
            |t| self.class_context(types, t),
        )
    }

    /// Effective context of `ty`, falling back to an empty context
    pub fn class_context_or_empty(
        &self,
        types: &dyn TypeIntrospector,
        ty: TypeId,
    ) -> ConfigurationResult<ClassContext> {
        Ok(self
            .class_context(types, ty)?
            .unwrap_or_else(|| ClassContext::empty(ty)))
    }

    /// Own context of `ty` combined with everything it inherits
    fn inherited_context(
        &self,
        types: &dyn TypeIntrospector,
        ty: TypeId,
    ) -> ConfigurationResult<Option<ClassContext>> {
        let Some(own) = self.contexts.get(&ty) else {
            return Ok(None);
        };

        let resolver = ContextInheritanceResolver::new(types);
        let parents = resolver.parent_contexts(ty, |t| self.class_context(types, t))?;

        // Each parent is checked against the own configuration alone
        let context = parents.iter().try_fold(own.clone(), |context, parent| {
            own.inherit_from(parent, types)
                .map(|inherited| context.union(&inherited))
        })?;

        debug!(
            "Effective context for {} has {} mixin(s) from {} parent(s)",
            types.full_name(ty),
            context.mixins().len(),
            parents.len()
        );
        Ok(Some(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MixinEntry;
    use crate::types::{TypeDecl, TypeUniverse};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_merges_contexts_for_one_type() {
        let mut types = TypeUniverse::new();
        let target = types.declare(TypeDecl::class("app::Order"));
        let m1 = types.declare(TypeDecl::class("app::M1"));
        let m2 = types.declare(TypeDecl::class("app::M2"));

        let mut configuration = MixinConfiguration::new();
        configuration
            .add(&types, ClassContext::try_new(&types, target, [MixinEntry::used(m1)], []).unwrap())
            .unwrap();
        configuration
            .add(&types, ClassContext::try_new(&types, target, [MixinEntry::used(m2)], []).unwrap())
            .unwrap();
        assert_eq!(configuration.len(), 1);
        assert_eq!(
            configuration.configured_context(target).map(|c| c.mixins().len()),
            Some(2)
        );

        let duplicate = configuration.add(
            &types,
            ClassContext::try_new(&types, target, [MixinEntry::extending(m1)], []).unwrap(),
        );
        assert!(matches!(
            duplicate,
            Err(ConfigurationError::DuplicateMixin { .. })
        ));
    }

    #[test]
    fn test_configured_type_inherits_from_its_base() {
        let mut types = TypeUniverse::new();
        let base = types.declare(TypeDecl::class("app::Entity"));
        let target = types.declare(TypeDecl::class("app::Order").extends(base));
        let base_mixin = types.declare(TypeDecl::class("app::AuditMixin"));
        let own_mixin = types.declare(TypeDecl::class("app::CacheMixin"));

        let configuration = MixinConfiguration::new()
            .with_context(
                &types,
                ClassContext::try_new(&types, base, [MixinEntry::used(base_mixin)], []).unwrap(),
            )
            .unwrap()
            .with_context(
                &types,
                ClassContext::try_new(&types, target, [MixinEntry::used(own_mixin)], []).unwrap(),
            )
            .unwrap();

        let context = configuration.class_context(&types, target).unwrap().unwrap();
        assert!(!context.is_derived());
        assert_eq!(
            context.mixins().mixin_types().collect::<Vec<_>>(),
            vec![own_mixin, base_mixin]
        );
    }

    #[test]
    fn test_unconfigured_type_gets_derived_context() {
        let mut types = TypeUniverse::new();
        let base = types.declare(TypeDecl::class("app::Entity"));
        let middle = types.declare(TypeDecl::class("app::Document").extends(base));
        let target = types.declare(TypeDecl::class("app::Invoice").extends(middle));
        let mixin = types.declare(TypeDecl::class("app::AuditMixin"));

        let configuration = MixinConfiguration::new()
            .with_context(
                &types,
                ClassContext::try_new(&types, base, [MixinEntry::used(mixin)], []).unwrap(),
            )
            .unwrap();

        let context = configuration.class_context(&types, target).unwrap().unwrap();
        assert!(context.is_derived());
        assert_eq!(context.ty(), target);
        assert!(context.mixins().contains(mixin));

        let unrelated = types.declare(TypeDecl::class("app::Unrelated"));
        assert_eq!(configuration.class_context(&types, unrelated).unwrap(), None);
        assert!(configuration
            .class_context_or_empty(&types, unrelated)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_conflicting_inheritance_is_reported() {
        let mut types = TypeUniverse::new();
        let base = types.declare(TypeDecl::class("app::Entity"));
        let target = types.declare(TypeDecl::class("app::Order").extends(base));
        let general = types.declare(TypeDecl::class("app::AuditMixin"));
        let specific = types.declare(TypeDecl::class("app::DetailedAuditMixin").extends(general));

        let configuration = MixinConfiguration::new()
            .with_context(
                &types,
                ClassContext::try_new(&types, base, [MixinEntry::used(specific)], []).unwrap(),
            )
            .unwrap()
            .with_context(
                &types,
                ClassContext::try_new(&types, target, [MixinEntry::used(general)], []).unwrap(),
            )
            .unwrap();

        let err = configuration.class_context(&types, target).unwrap_err();
        assert!(err.is_inheritance_error());
    }
}

//! Class context inheritance across base types, interfaces and generics

use cim_mixin::{
    ClassContext, ConfigurationError, DefinitionBuilder, MixinConfiguration, MixinEntry, TypeDecl,
    TypeId, TypeUniverse,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

struct Scenario {
    types: TypeUniverse,
    base: TypeId,
    target: TypeId,
    int: TypeId,
    decimal: TypeId,
}

fn scenario() -> Scenario {
    let mut types = TypeUniverse::new();
    let int = types.declare(TypeDecl::class("system::Int32"));
    let decimal = types.declare(TypeDecl::class("system::Decimal"));
    let base = types.declare(TypeDecl::class("app::BaseType"));
    let target = types.declare(TypeDecl::class("app::TargetType").extends(base));
    Scenario {
        types,
        base,
        target,
        int,
        decimal,
    }
}

#[test]
fn test_unconfigured_target_inherits_single_mixin() {
    let mut s = scenario();
    let mixin = s.types.declare(TypeDecl::class("app::X"));
    let base_context = ClassContext::try_new(
        &s.types,
        s.base,
        [MixinEntry::used(mixin).with_dependency(s.int)],
        [],
    )
    .unwrap();

    let inherited = ClassContext::empty(s.target)
        .inherit_from(&base_context, &s.types)
        .unwrap();
    assert_eq!(inherited.ty(), s.target);
    assert_eq!(inherited.mixins().len(), 1);
    let entry = inherited.mixins().get(mixin).unwrap();
    assert_eq!(entry.explicit_dependencies().collect::<Vec<_>>(), vec![s.int]);

    let definition = DefinitionBuilder::new(&s.types).build(&inherited).unwrap();
    assert_eq!(definition.mixin_count(), 1);
    let only = definition.mixins().next().unwrap();
    assert_eq!(only.mixin_type(), mixin);
    assert_eq!(only.index(), 0);
}

#[test]
fn test_configuration_derives_context_for_unconfigured_subclass() {
    let mut s = scenario();
    let mixin = s.types.declare(TypeDecl::class("app::X"));
    let configuration = MixinConfiguration::new()
        .with_context(
            &s.types,
            ClassContext::try_new(
                &s.types,
                s.base,
                [MixinEntry::used(mixin).with_dependency(s.int)],
                [],
            )
            .unwrap(),
        )
        .unwrap();

    let context = configuration
        .class_context(&s.types, s.target)
        .unwrap()
        .unwrap();
    assert!(context.is_derived());
    assert_eq!(context.ty(), s.target);
    assert_eq!(context.mixins().mixin_types().collect::<Vec<_>>(), vec![mixin]);

    let unrelated = s.types.declare(TypeDecl::class("app::Unrelated"));
    assert_eq!(configuration.class_context(&s.types, unrelated).unwrap(), None);
    assert!(configuration
        .class_context_or_empty(&s.types, unrelated)
        .unwrap()
        .is_empty());
}

#[test]
fn test_specialized_mixin_suppresses_inherited_open_generic() {
    let mut s = scenario();
    let base_def = s.types.declare(TypeDecl::class("app::BaseMixin<>").generic_definition(1));
    let derived_def = s.types.declare(
        TypeDecl::class("app::DerivedMixin<>")
            .generic_definition(1)
            .extends(base_def),
    );
    let base_object = s.types.declare(
        TypeDecl::class("app::BaseMixin<object>").specialization_of(base_def, [TypeId::ROOT]),
    );
    let derived_object = s.types.declare(
        TypeDecl::class("app::DerivedMixin<object>")
            .specialization_of(derived_def, [TypeId::ROOT])
            .extends(base_object),
    );

    let configuration = MixinConfiguration::new()
        .with_context(
            &s.types,
            ClassContext::try_new(
                &s.types,
                s.base,
                [MixinEntry::used(base_def).with_dependency(s.int)],
                [],
            )
            .unwrap(),
        )
        .unwrap()
        .with_context(
            &s.types,
            ClassContext::try_new(
                &s.types,
                s.target,
                [MixinEntry::used(derived_object).with_dependency(s.decimal)],
                [],
            )
            .unwrap(),
        )
        .unwrap();

    let context = configuration
        .class_context(&s.types, s.target)
        .unwrap()
        .unwrap();
    assert!(!context.is_derived());
    assert_eq!(
        context.mixins().mixin_types().collect::<Vec<_>>(),
        vec![derived_object]
    );
    let entry = context.mixins().get(derived_object).unwrap();
    assert_eq!(entry.explicit_dependencies().collect::<Vec<_>>(), vec![s.decimal]);
}

#[test]
fn test_more_specific_inherited_mixin_conflicts() {
    let mut s = scenario();
    let general = s.types.declare(TypeDecl::class("app::Logging"));
    let specific = s.types.declare(TypeDecl::class("app::FileLogging").extends(general));
    let base_context =
        ClassContext::try_new(&s.types, s.base, [MixinEntry::used(specific)], []).unwrap();
    let own = ClassContext::try_new(&s.types, s.target, [MixinEntry::used(general)], []).unwrap();

    let err = own.inherit_from(&base_context, &s.types).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::InheritanceConflict {
            target: "app::TargetType".to_string(),
            inherited: "app::FileLogging".to_string(),
            base: "app::BaseType".to_string(),
            configured: "app::Logging".to_string(),
        }
    );
    assert!(err.is_inheritance_error());
}

#[test]
fn test_generic_definition_context_applies_to_specializations() {
    let mut types = TypeUniverse::new();
    let repo_def = types.declare(TypeDecl::class("app::Repository<>").generic_definition(1));
    let order = types.declare(TypeDecl::class("app::Order"));
    let order_repo = types
        .declare(TypeDecl::class("app::Repository<Order>").specialization_of(repo_def, [order]));
    let caching = types.declare(TypeDecl::class("app::CachingMixin"));

    let configuration = MixinConfiguration::new()
        .with_context(
            &types,
            ClassContext::try_new(&types, repo_def, [MixinEntry::used(caching)], []).unwrap(),
        )
        .unwrap();

    let context = configuration
        .class_context(&types, order_repo)
        .unwrap()
        .unwrap();
    assert_eq!(context.ty(), order_repo);
    assert!(context.mixins().contains(caching));
}

#[test]
fn test_interface_contexts_are_inherited() {
    let mut types = TypeUniverse::new();
    let auditable = types.declare(TypeDecl::interface("app::IAuditable"));
    let target = types.declare(TypeDecl::class("app::Order").implements(auditable));
    let audit = types.declare(TypeDecl::class("app::AuditMixin"));

    let configuration = MixinConfiguration::new()
        .with_context(
            &types,
            ClassContext::try_new(&types, auditable, [MixinEntry::used(audit)], []).unwrap(),
        )
        .unwrap();

    let context = configuration.class_context(&types, target).unwrap().unwrap();
    assert_eq!(context.mixins().mixin_types().collect::<Vec<_>>(), vec![audit]);
}

const MIXIN_COUNT: usize = 8;

fn mixin_universe() -> (TypeUniverse, TypeId, TypeId, TypeId, Vec<TypeId>) {
    let Scenario {
        mut types,
        base,
        target,
        int,
        ..
    } = scenario();
    let mixins = (0..MIXIN_COUNT)
        .map(|i| types.declare(TypeDecl::class(format!("app::Mixin{i}"))))
        .collect();
    (types, base, target, int, mixins)
}

proptest! {
    #[test]
    fn inheriting_twice_from_one_base_is_a_no_op(
        own in proptest::collection::btree_set(0..MIXIN_COUNT, 0..MIXIN_COUNT),
        inherited in proptest::collection::btree_set(0..MIXIN_COUNT, 0..MIXIN_COUNT),
    ) {
        let (types, base, target, _, mixins) = mixin_universe();
        let own = ClassContext::try_new(
            &types,
            target,
            own.iter().map(|&i| MixinEntry::used(mixins[i])),
            [],
        ).unwrap();
        let base_context = ClassContext::try_new(
            &types,
            base,
            inherited.iter().map(|&i| MixinEntry::extending(mixins[i])),
            [],
        ).unwrap();

        let once = own.inherit_from(&base_context, &types).unwrap();
        let twice = once.inherit_from(&base_context, &types).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn own_entries_win_over_inherited_ones(
        own in proptest::collection::btree_set(0..MIXIN_COUNT, 1..MIXIN_COUNT),
        inherited in proptest::collection::btree_set(0..MIXIN_COUNT, 0..MIXIN_COUNT),
    ) {
        let (types, base, target, int, mixins) = mixin_universe();
        let own_context = ClassContext::try_new(
            &types,
            target,
            own.iter().map(|&i| MixinEntry::used(mixins[i])),
            [],
        ).unwrap();
        let base_context = ClassContext::try_new(
            &types,
            base,
            inherited.iter().map(|&i| MixinEntry::extending(mixins[i]).with_dependency(int)),
            [],
        ).unwrap();

        let merged = own_context.inherit_from(&base_context, &types).unwrap();
        for &i in &own {
            let entry = merged.mixins().get(mixins[i]).unwrap();
            prop_assert_eq!(entry, own_context.mixins().get(mixins[i]).unwrap());
        }
        let expected: std::collections::BTreeSet<usize> = own.union(&inherited).copied().collect();
        prop_assert_eq!(merged.mixins().len(), expected.len());
    }
}

/// Mixin types related through derivation and shared generic definitions
fn related_mixin_universe() -> (TypeUniverse, TypeId, TypeId, TypeId, Vec<TypeId>) {
    let Scenario {
        mut types,
        base,
        target,
        int,
        ..
    } = scenario();
    let x = types.declare(TypeDecl::class("app::X"));
    let y = types.declare(TypeDecl::class("app::Y"));
    let logging = types.declare(TypeDecl::class("app::Logging"));
    let file_logging = types.declare(TypeDecl::class("app::FileLogging").extends(logging));
    let console_logging = types.declare(TypeDecl::class("app::ConsoleLogging").extends(logging));
    let def = types.declare(TypeDecl::class("app::G<>").generic_definition(1));
    let gx = types.declare(TypeDecl::class("app::G<X>").specialization_of(def, [x]));
    let gy = types.declare(TypeDecl::class("app::G<Y>").specialization_of(def, [y]));
    let special = types.declare(TypeDecl::class("app::Special").extends(gx));
    let plain = types.declare(TypeDecl::class("app::Plain"));
    let mixins = vec![
        logging,
        file_logging,
        console_logging,
        def,
        gx,
        gy,
        special,
        plain,
    ];
    (types, base, target, int, mixins)
}

proptest! {
    #[test]
    fn inheriting_related_mixins_twice_is_a_no_op(
        own in proptest::collection::btree_set(0..MIXIN_COUNT, 0..MIXIN_COUNT),
        inherited in proptest::collection::btree_set(0..MIXIN_COUNT, 0..MIXIN_COUNT),
    ) {
        let (types, base, target, _, mixins) = related_mixin_universe();
        let own = ClassContext::try_new(
            &types,
            target,
            own.iter().map(|&i| MixinEntry::used(mixins[i])),
            [],
        ).unwrap();
        let base_context = ClassContext::try_new(
            &types,
            base,
            inherited.iter().map(|&i| MixinEntry::extending(mixins[i])),
            [],
        ).unwrap();

        match own.inherit_from(&base_context, &types) {
            Ok(once) => {
                let twice = once.inherit_from(&base_context, &types).unwrap();
                prop_assert_eq!(once, twice);
            }
            Err(err) => prop_assert!(err.is_inheritance_error(), "{}", err),
        }
    }

    #[test]
    fn own_related_entries_win_over_inherited_ones(
        own in proptest::collection::btree_set(0..MIXIN_COUNT, 1..MIXIN_COUNT),
        inherited in proptest::collection::btree_set(0..MIXIN_COUNT, 0..MIXIN_COUNT),
    ) {
        let (types, base, target, int, mixins) = related_mixin_universe();
        let own_context = ClassContext::try_new(
            &types,
            target,
            own.iter().map(|&i| MixinEntry::used(mixins[i])),
            [],
        ).unwrap();
        let base_context = ClassContext::try_new(
            &types,
            base,
            inherited.iter().map(|&i| MixinEntry::extending(mixins[i]).with_dependency(int)),
            [],
        ).unwrap();

        let Ok(merged) = own_context.inherit_from(&base_context, &types) else {
            return Ok(());
        };
        for &i in &own {
            let entry = merged.mixins().get(mixins[i]).unwrap();
            prop_assert_eq!(entry, own_context.mixins().get(mixins[i]).unwrap());
        }
        for &i in &inherited {
            let ty = mixins[i];
            if own_context.mixins().contains_override_for_mixin(ty, &types) {
                prop_assert_eq!(merged.mixins().contains(ty), own_context.mixins().contains(ty));
            } else {
                prop_assert_eq!(merged.mixins().get(ty), base_context.mixins().get(ty));
            }
        }
        for ty in merged.mixins().mixin_types() {
            if !own_context.mixins().contains(ty) {
                prop_assert!(!own_context.mixins().contains_override_for_mixin(ty, &types));
            }
        }
    }
}

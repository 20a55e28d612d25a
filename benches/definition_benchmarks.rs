use cim_mixin::{
    Annotation, AnnotationSource, ClassContext, DefinitionBuilder, DefinitionCache,
    DependencyKind, MemberDecl, MixinDependencySorter, MixinEntry, TypeDecl, TypeId, TypeUniverse,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Target with a chain of mixins, each requiring the next through an interface
fn chain(length: usize) -> (TypeUniverse, ClassContext) {
    let mut types = TypeUniverse::new();
    let target = types.declare(TypeDecl::class("bench::Target"));
    types.add_member(target, MemberDecl::method("Execute"));

    let interfaces: Vec<TypeId> = (0..length)
        .map(|i| types.declare(TypeDecl::interface(format!("bench::IStage{i}"))))
        .collect();

    let mut entries = Vec::with_capacity(length);
    for i in 0..length {
        let mixin = types.declare(
            TypeDecl::class(format!("bench::Stage{i}")).implements(interfaces[i]),
        );
        let execute = types.add_member(mixin, MemberDecl::method(format!("Execute{i}")));
        types.annotate(
            AnnotationSource::Member(execute),
            Annotation::custom(interfaces[i]),
        );
        if let Some(&next) = interfaces.get(i + 1) {
            types.annotate(
                AnnotationSource::Type(mixin),
                Annotation::requires(DependencyKind::NextCall, next),
            );
        }
        entries.push(MixinEntry::used(mixin));
    }
    // Declared in reverse so the sorter has work to do
    entries.reverse();

    let context = ClassContext::try_new(&types, target, entries, []).expect("valid context");
    (types, context)
}

fn benchmark_build_definition(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_definition");

    for length in [4, 16, 64].iter() {
        let (types, context) = chain(*length);
        group.bench_with_input(BenchmarkId::from_parameter(length), &context, |b, context| {
            let builder = DefinitionBuilder::new(&types);
            b.iter(|| builder.build(black_box(context)).expect("definition builds"));
        });
    }

    group.finish();
}

fn benchmark_order_mixins(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_mixins");

    for length in [16, 64, 256].iter() {
        let (types, context) = chain(*length);
        let mixins: Vec<MixinEntry> = context.mixins().iter().cloned().collect();
        group.bench_with_input(BenchmarkId::from_parameter(length), &mixins, |b, mixins| {
            let sorter = MixinDependencySorter::new(&types);
            b.iter(|| {
                sorter
                    .order(context.ty(), black_box(mixins.iter().collect::<Vec<_>>()))
                    .expect("acyclic chain")
            });
        });
    }

    group.finish();
}

fn benchmark_cached_lookup(c: &mut Criterion) {
    let (types, context) = chain(16);
    let cache = DefinitionCache::new(DefinitionBuilder::new(&types));
    cache.get_or_build(&context).expect("definition builds");

    c.bench_function("cached_lookup", |b| {
        b.iter(|| cache.get_or_build(black_box(&context)).expect("cached definition"));
    });
}

criterion_group!(
    benches,
    benchmark_build_definition,
    benchmark_order_mixins,
    benchmark_cached_lookup
);
criterion_main!(benches);

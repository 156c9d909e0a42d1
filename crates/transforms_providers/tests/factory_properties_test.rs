//! Behaviour shared by every built-in factory family.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;
use transforms_core::{
    FieldType, NamedCollectionBundle, RecordCollection, RecordSchema, RecordSchemaBuilder,
    TransformError, TransformFactory, TransformRegistry, assemble,
};
use transforms_providers::{
    ExternalTransformFactory, FlattenFactory, PassthroughFactory, SelectFactory,
    SqlTransformFactory,
};

fn events_schema() -> RecordSchema {
    RecordSchemaBuilder::new()
        .field("user_id", FieldType::String)
        .field("clicks", FieldType::Int64)
        .nullable_field("referrer", FieldType::String)
        .build()
        .unwrap()
}

fn totals_schema() -> RecordSchema {
    RecordSchemaBuilder::new()
        .field("user_id", FieldType::String)
        .field("total", FieldType::Int64)
        .build()
        .unwrap()
}

fn sources() -> NamedCollectionBundle {
    NamedCollectionBundle::of("web", RecordCollection::new("source/web", events_schema()))
        .unwrap()
        .and("mobile", RecordCollection::new("source/mobile", events_schema()))
        .unwrap()
}

fn all_families() -> Vec<(&'static str, Arc<dyn TransformFactory>)> {
    vec![
        (
            "rename",
            Arc::new(PassthroughFactory::new("rename").map("web", "desktop")),
        ),
        (
            "all_events",
            Arc::new(FlattenFactory::new("all_events", ["web", "mobile"], "events")),
        ),
        (
            "clicks",
            Arc::new(SelectFactory::new(
                "clicks",
                "events",
                "clicks",
                ["user_id", "clicks"],
            )),
        ),
        (
            "totals",
            Arc::new(SqlTransformFactory::new(
                "totals",
                "SELECT user_id, SUM(clicks) AS total FROM clicks GROUP BY user_id",
                ["clicks"],
                "totals",
                totals_schema(),
            )),
        ),
        (
            "publish",
            Arc::new(
                ExternalTransformFactory::new("publish", "beam:transform:kafka_write:v1")
                    .input("totals")
                    .output("receipts", totals_schema())
                    .expansion_service("localhost:8097"),
            ),
        ),
    ]
}

#[test]
fn test_every_family_builds_the_same_description_twice() {
    for (name, factory) in all_families() {
        let first = factory.build().unwrap();
        let second = factory.build().unwrap();
        assert_eq!(first, second, "factory '{}' is not idempotent", name);
        assert_eq!(first.name(), name);
    }
}

#[test]
fn test_built_in_pipeline_assembles() {
    let mut transforms = Vec::new();
    for (_, factory) in all_families() {
        transforms.push(factory.build().unwrap());
    }

    let assembly = assemble(sources(), &transforms).unwrap();

    assert_eq!(
        assembly.bundle.tags().collect::<Vec<_>>(),
        vec![
            "clicks", "desktop", "events", "mobile", "receipts", "totals", "web"
        ]
    );

    let clicks = assembly.bundle.get("clicks").unwrap();
    assert_eq!(
        clicks.schema().field_names().collect::<Vec<_>>(),
        vec!["user_id", "clicks"]
    );
    assert_eq!(clicks.id().as_str(), "clicks/clicks");

    let totals = assembly.bundle.get("totals").unwrap();
    assert_eq!(totals.schema().as_ref(), &totals_schema());
}

#[test]
fn test_misconfigured_factories_fail_before_assembly() {
    let broken: Vec<Arc<dyn TransformFactory>> = vec![
        Arc::new(PassthroughFactory::new("empty")),
        Arc::new(FlattenFactory::new("none", Vec::<String>::new(), "out")),
        Arc::new(SelectFactory::new("nothing", "in", "out", Vec::<String>::new())),
        Arc::new(SqlTransformFactory::new(
            "typo",
            "SELEC user_id FROM clicks",
            ["clicks"],
            "out",
            totals_schema(),
        )),
        Arc::new(ExternalTransformFactory::new("bad_urn", "kafka_write")),
    ];

    for factory in broken {
        let err = factory.build().unwrap_err();
        assert!(
            matches!(err, TransformError::Configuration { .. }),
            "unexpected error: {}",
            err
        );
    }
}

#[test]
fn test_concurrent_builds_through_registry() {
    let mut registry = TransformRegistry::new();
    for (name, factory) in all_families() {
        registry.register_shared(name, factory).unwrap();
    }
    let registry = Arc::new(registry);
    let expected = registry.build_all().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                (0..50)
                    .map(|_| registry.build_all())
                    .collect::<Result<Vec<_>, _>>()
            })
        })
        .collect();

    for handle in handles {
        let rounds = handle.join().unwrap().unwrap();
        assert_eq!(rounds.len(), 50);
        for round in rounds {
            assert_eq!(round, expected);
        }
    }
}

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use tracing::info;
use transforms_core::{DeclaredTags, FieldType, RecordSchema, RecordSchemaBuilder};
use transforms_parser::{PipelineDocument, TransformEntry};
use transforms_providers::{FactoryConfig, SelectFactory, SqlTransformFactory};

use crate::output;

pub fn execute(output_path: Option<&str>, name: &str) -> Result<()> {
    info!("Initializing pipeline: {}", name);

    let document = starter_pipeline(name)?;
    let yaml =
        serde_yaml_ng::to_string(&document).context("Failed to serialize pipeline to YAML")?;

    if let Some(path) = output_path {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path))?;
        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write to file: {}", path))?;
        output::print_success(&format!("Pipeline written to: {}", path));
    } else {
        println!("{}", yaml);
    }

    Ok(())
}

fn starter_pipeline(name: &str) -> Result<PipelineDocument> {
    let events = RecordSchemaBuilder::new()
        .field("user_id", FieldType::String)
        .field("clicks", FieldType::Int64)
        .nullable_field("referrer", FieldType::String)
        .build()?;
    let totals: RecordSchema = RecordSchemaBuilder::new()
        .field("user_id", FieldType::String)
        .field("total", FieldType::Int64)
        .build()?;

    let transforms = vec![
        TransformEntry {
            name: "clicks".to_string(),
            description: Some("Keep the fields needed downstream".to_string()),
            declare: Some(DeclaredTags::new(["events"], ["clicks"])),
            config: FactoryConfig::Select(SelectFactory::new(
                "clicks",
                "events",
                "clicks",
                ["user_id", "clicks"],
            )),
        },
        TransformEntry {
            name: "totals".to_string(),
            description: Some("Total clicks per user".to_string()),
            declare: None,
            config: FactoryConfig::Sql(SqlTransformFactory::new(
                "totals",
                "SELECT user_id, SUM(clicks) AS total FROM clicks GROUP BY user_id",
                ["clicks"],
                "totals",
                totals,
            )),
        },
    ];

    Ok(PipelineDocument {
        version: "1.0.0".to_string(),
        name: name.to_string(),
        description: Some(format!("Starter pipeline {}", name)),
        sources: BTreeMap::from([("events".to_string(), events)]),
        transforms,
    })
}

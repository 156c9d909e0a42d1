use clap::ValueEnum;
use colored::*;
use serde_json::json;
use transforms_core::{Assembly, Transform};

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn print_check_report(
    pipeline: &str,
    transforms: &[Transform],
    assembly: Option<&Assembly>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json_check(pipeline, transforms, assembly),
        OutputFormat::Text => {
            print_text_check(pipeline, transforms, assembly);
            Ok(())
        }
    }
}

fn print_text_check(pipeline: &str, transforms: &[Transform], assembly: Option<&Assembly>) {
    println!("\n{}", "═".repeat(60));
    println!("{}", format!("  PIPELINE CHECK: {}", pipeline).bold());
    println!("{}", "═".repeat(60));

    println!("\n{}", "Transforms:".bold());
    for (i, transform) in transforms.iter().enumerate() {
        println!(
            "  {}. {} {}",
            i + 1,
            transform.name().bold(),
            format!("[{}]", transform.urn()).dimmed()
        );
        println!(
            "     {} -> {}",
            join_tags(transform.input_tags()),
            join_tags(transform.output_tags())
        );
    }

    match assembly {
        Some(assembly) => {
            println!("\n{}", "Collections:".bold());
            for (tag, collection) in assembly.bundle.iter() {
                println!(
                    "  {:<16} {} {}",
                    tag,
                    collection.schema(),
                    format!("({})", collection.id()).dimmed()
                );
            }
        }
        None => println!(
            "\n{}",
            "No sources declared; pipeline was not assembled".yellow()
        ),
    }

    println!("\n{}", "Summary:".bold());
    println!("  Transforms:  {}", transforms.len());
    if let Some(assembly) = assembly {
        println!("  Collections: {}", assembly.bundle.len());
    }
    println!("{}", "═".repeat(60));
}

fn print_json_check(
    pipeline: &str,
    transforms: &[Transform],
    assembly: Option<&Assembly>,
) -> anyhow::Result<()> {
    let output = json!({
        "pipeline": pipeline,
        "valid": true,
        "transforms": transforms.iter().map(|t| json!({
            "name": t.name(),
            "urn": t.urn(),
            "inputs": t.input_tags().collect::<Vec<_>>(),
            "outputs": t.output_tags().collect::<Vec<_>>(),
        })).collect::<Vec<_>>(),
        "assembly": assembly,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn print_transforms(transforms: &[Transform], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(transforms)?);
        }
        OutputFormat::Text => {
            for transform in transforms {
                print_transform(transform, 0);
            }
        }
    }
    Ok(())
}

fn print_transform(transform: &Transform, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("\n{}{}", indent, transform.name().bold());
    println!("{}  URN:     {}", indent, transform.urn());
    println!("{}  Inputs:  {}", indent, join_tags(transform.input_tags()));
    println!("{}  Outputs:", indent);
    for (tag, derivation) in transform.outputs() {
        println!("{}    {:<14} {}", indent, tag, derivation);
    }
    if !transform.payload().is_null() {
        println!("{}  Payload: {}", indent, transform.payload());
    }
    for stage in transform.stages() {
        print_transform(stage, depth + 2);
    }
}

fn join_tags<'a>(tags: impl Iterator<Item = &'a str>) -> String {
    let tags: Vec<&str> = tags.collect();
    if tags.is_empty() {
        "(none)".to_string()
    } else {
        tags.join(", ")
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

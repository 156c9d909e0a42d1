use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;
use transforms_parser::parse_file;

use crate::output::{self, OutputFormat};

pub fn execute(pipeline_path: &str, format: OutputFormat) -> Result<()> {
    info!("Checking pipeline: {}", pipeline_path);

    let path = Path::new(pipeline_path);
    let document = parse_file(path)
        .with_context(|| format!("Failed to parse pipeline file: {}", pipeline_path))?;

    if format == OutputFormat::Text {
        output::print_info(&format!(
            "Pipeline loaded: {} v{} ({} transforms)",
            document.name,
            document.version,
            document.transforms.len()
        ));
    }

    let transforms = document
        .build_transforms()
        .with_context(|| format!("Failed to build transforms of {}", pipeline_path))?;

    let assembly = if document.sources.is_empty() {
        None
    } else {
        let assembly = transforms_core::assemble(document.source_bundle()?, &transforms)
            .with_context(|| format!("Failed to assemble pipeline {}", pipeline_path))?;
        Some(assembly)
    };

    if format == OutputFormat::Text {
        output::print_success("Pipeline is valid");
    }
    output::print_check_report(&document.name, &transforms, assembly.as_ref(), format)
}

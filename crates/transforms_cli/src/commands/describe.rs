use anyhow::{Context, Result, anyhow};
use std::path::Path;
use tracing::info;
use transforms_parser::parse_file;

use crate::output::{self, OutputFormat};

pub fn execute(pipeline_path: &str, only: Option<&str>, format: OutputFormat) -> Result<()> {
    info!("Describing pipeline: {}", pipeline_path);

    let path = Path::new(pipeline_path);
    let document = parse_file(path)
        .with_context(|| format!("Failed to parse pipeline file: {}", pipeline_path))?;

    let registry = document.registry()?;
    let transforms = match only {
        Some(name) => {
            if !registry.contains(name) {
                return Err(anyhow!(
                    "No transform named '{}' in {}",
                    name,
                    pipeline_path
                ));
            }
            vec![registry.build(name)?]
        }
        None => document
            .build_transforms()
            .with_context(|| format!("Failed to build transforms of {}", pipeline_path))?,
    };

    output::print_transforms(&transforms, format)
}

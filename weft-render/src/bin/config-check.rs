use std::env;
use std::fs;
use std::process;

use weft_render::{ConfigurationReader, RenderError, TypeRegistry};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: weft-config-check <renderers.xml|schemas.xml>...");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  weft-config-check renderers.xml");
        eprintln!("  weft-config-check renderers.xml schemas.xml");
        process::exit(1);
    }

    // Every type referenced by the configuration must be declared; for a
    // standalone check we accept any type and only verify structure.
    let types = TypeRegistry::permissive();

    let mut exit_code = 0;
    for file_path in &args[1..] {
        match check_file(&types, file_path) {
            Ok(problems) if problems.is_empty() => {
                println!("✓ {} is valid", file_path);
            }
            Ok(problems) => {
                eprintln!("✗ {} has {} skipped declaration(s):", file_path, problems.len());
                for problem in problems {
                    eprintln!("  {}", problem);
                }
                exit_code = 1;
            }
            Err(e) => {
                eprintln!("✗ {} could not be read:", file_path);
                eprintln!("  {}", e);
                exit_code = 1;
            }
        }
    }

    process::exit(exit_code);
}

fn check_file(types: &TypeRegistry, path: &str) -> Result<Vec<String>, RenderError> {
    let content = fs::read_to_string(path)
        .map_err(|e| RenderError::Configuration(format!("failed to read file: {}", e)))?;

    let document = roxmltree::Document::parse(&content)?;
    let root = document.root_element().tag_name().name().to_string();

    let mut reader = ConfigurationReader::new(types);
    let mut kit = weft_render::RenderKit::new();
    match root.as_str() {
        "renderers" => reader.read_renderers(&mut kit, &content)?,
        "schemas" => reader.read_schemas(&mut kit, &content)?,
        other => {
            return Err(RenderError::Configuration(format!(
                "unknown configuration root element '{}', expected 'renderers' or 'schemas'",
                other
            )))
        }
    }
    Ok(reader.problems().to_vec())
}

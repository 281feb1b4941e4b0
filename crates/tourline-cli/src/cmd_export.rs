use crate::{open_engine, select_tour};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tourline_engine::TourReader;

pub fn run_export(roots: &[PathBuf], selector: &str, output: Option<PathBuf>) -> Result<()> {
    let engine = open_engine(roots);
    let tour = select_tour(&engine, selector)?;
    let document = engine
        .export_document(&tour.snapshot())
        .with_context(|| format!("Failed to export {:?}", tour.title()))?;

    match output {
        Some(path) => {
            std::fs::write(&path, document)
                .with_context(|| format!("Failed to write {:?}", path))?;
            eprintln!("Exported {} to {}", tour.title(), path.display());
        }
        None => println!("{}", document),
    }
    Ok(())
}

pub fn run_validate(input: &Path) -> Result<()> {
    let tour = TourReader::read_tour(input)?;
    let missing = tour
        .steps
        .iter()
        .enumerate()
        .filter(|(_, s)| s.location().is_none() && s.contents.is_none())
        .map(|(i, _)| format!("#{}", i + 1))
        .collect::<Vec<_>>();

    if !missing.is_empty() {
        anyhow::bail!(
            "{} is a tour, but steps {} have no file, uri, or contents",
            input.display(),
            missing.join(", ")
        );
    }

    println!(
        "Valid: {} ({} steps)",
        tour.title,
        tour.steps.len()
    );
    Ok(())
}

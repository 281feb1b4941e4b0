use crate::open_engine;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Create the tour file for a new recording under the first root.
///
/// The recording session itself lives only as long as this process; the
/// created file is what later `tour step add` calls append to.
pub fn run(roots: &[PathBuf], title: &str, git_ref: Option<&str>) -> Result<()> {
    let mut engine = open_engine(roots);
    let root = engine
        .roots()
        .first()
        .cloned()
        .context("No workspace root given")?;

    engine
        .start_recording(&root, title, git_ref)
        .with_context(|| format!("Failed to start recording {:?}", title))?;

    let session = engine.active().context("Recording did not start")?;
    println!("{}", session.tour().id());
    eprintln!(
        "Recording {:?}. Add steps with `tour step add {:?} --file <path> --description <text>`.",
        title, title
    );
    Ok(())
}

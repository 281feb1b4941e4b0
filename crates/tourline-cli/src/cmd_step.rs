use crate::{open_engine, select_tour, step_index};
use anyhow::{Context, Result, bail};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use tourline::v1::{Position, Selection, Step};
use tourline_engine::{SaveOutcome, StartOptions, TourEngine, TourHandle};

#[derive(Subcommand, Debug)]
pub enum StepOp {
    /// Insert a step (after the last one unless --after is given)
    Add {
        /// Tour title or file path
        tour: String,

        /// File the step points at, relative to the workspace root
        #[arg(long)]
        file: PathBuf,

        /// Line number (1-based)
        #[arg(long)]
        line: Option<u32>,

        /// Step text (markdown)
        #[arg(long)]
        description: String,

        /// Step title
        #[arg(long)]
        title: Option<String>,

        /// Insert after this step number (1-based)
        #[arg(long)]
        after: Option<usize>,
    },
    /// Rewrite a step's text and, optionally, its selection
    Edit {
        /// Tour title or file path
        tour: String,

        /// Step number (1-based)
        step: usize,

        /// New step text
        #[arg(long)]
        description: String,

        /// Selection as START-END, each LINE:CHARACTER (1-based)
        #[arg(long)]
        selection: Option<String>,
    },
    /// Move a step up or down
    Move {
        /// Tour title or file path
        tour: String,

        /// Step number (1-based)
        step: usize,

        /// Places to move; negative moves toward the start
        #[arg(long, allow_hyphen_values = true)]
        by: isize,
    },
    /// Remove a step
    Remove {
        /// Tour title or file path
        tour: String,

        /// Step number (1-based)
        step: usize,
    },
}

pub fn run(roots: &[PathBuf], op: StepOp) -> Result<()> {
    let mut engine = open_engine(roots);
    match op {
        StepOp::Add {
            tour,
            file,
            line,
            description,
            title,
            after,
        } => {
            let tour = select_tour(&engine, &tour)?;
            let mut step = Step::new(description).with_file(relative_file(&engine, &tour, &file));
            step.line = line;
            step.title = title;
            let number = run_add(&mut engine, &tour, step, after)?;
            println!("Added step #{} to {}", number, tour.title());
        }
        StepOp::Edit {
            tour,
            step,
            description,
            selection,
        } => {
            let tour = select_tour(&engine, &tour)?;
            let index = step_index(&tour, step)?;
            let selection = selection.as_deref().map(parse_selection).transpose()?;
            let token = engine.start(&tour, StartOptions::default().at_step(index))?;
            match engine.save_step(token, &description, selection)? {
                SaveOutcome::Saved {
                    selection_recorded: false,
                } if selection.is_some() => {
                    eprintln!("Selection matches the previous step's and was not recorded");
                }
                _ => {}
            }
            println!("Updated step #{} of {}", step, tour.title());
        }
        StepOp::Move { tour, step, by } => {
            let tour = select_tour(&engine, &tour)?;
            let index = step_index(&tour, step)?;
            engine
                .move_step(&tour, index, by)
                .with_context(|| format!("Can't move step #{} by {}", step, by))?;
            println!("Moved step #{} to #{}", step, index as isize + by + 1);
        }
        StepOp::Remove { tour, step } => {
            let tour = select_tour(&engine, &tour)?;
            let index = step_index(&tour, step)?;
            let removed = engine.delete_step(&tour, index)?;
            println!(
                "Removed step #{} ({}) from {}",
                step,
                removed.location().unwrap_or("no location"),
                tour.title()
            );
        }
    }
    Ok(())
}

/// Insert `step` after step number `after` (default: the last step) and
/// return its 1-based number.
fn run_add(
    engine: &mut TourEngine,
    tour: &TourHandle,
    step: Step,
    after: Option<usize>,
) -> Result<usize> {
    let len = tour.step_count();
    let options = match after.unwrap_or(len) {
        0 if len == 0 => StartOptions::default(),
        0 => bail!("--after must be between 1 and {}", len),
        n => StartOptions::default().at_step(step_index(tour, n)?),
    };
    engine.start(tour, options.in_edit_mode())?;
    let index = engine.insert_step(step)?;
    Ok(index + 1)
}

/// Path of `file` relative to the tour's workspace root when it lies under
/// it; otherwise as given.
fn relative_file(engine: &TourEngine, tour: &TourHandle, file: &Path) -> String {
    let absolute = std::fs::canonicalize(file).ok();
    let relative = engine
        .root_for_tour(tour)
        .zip(absolute)
        .and_then(|(root, abs)| abs.strip_prefix(&root).ok().map(Path::to_path_buf));
    relative
        .as_deref()
        .unwrap_or(file)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Parse `L:C-L:C` (1-based) into a selection.
fn parse_selection(s: &str) -> Result<Selection> {
    let (start, end) = s
        .split_once('-')
        .with_context(|| format!("Selection {:?} should look like 3:1-5:10", s))?;
    Ok(Selection::new(parse_position(start)?, parse_position(end)?))
}

fn parse_position(s: &str) -> Result<Position> {
    let (line, character) = s
        .split_once(':')
        .with_context(|| format!("Position {:?} should look like LINE:CHARACTER", s))?;
    Ok(Position::new(
        line.trim().parse().context("Invalid line")?,
        character.trim().parse().context("Invalid character")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tourline_engine::TourReader;

    fn workspace(steps: &str) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".tours")).unwrap();
        let path = temp.path().join(".tours/t.tour");
        fs::write(&path, format!(r#"{{"title":"T","steps":[{}]}}"#, steps)).unwrap();
        (temp, path)
    }

    fn descriptions(path: &Path) -> Vec<String> {
        TourReader::read_tour(path)
            .unwrap()
            .steps
            .into_iter()
            .map(|s| s.description)
            .collect()
    }

    const THREE: &str = r#"{"file":"a.rs","description":"a"},{"file":"b.rs","description":"b"},{"file":"c.rs","description":"c"}"#;

    #[test]
    fn test_parse_selection() {
        assert_eq!(
            parse_selection("3:1-5:10").unwrap(),
            Selection::new(Position::new(3, 1), Position::new(5, 10))
        );
        assert!(parse_selection("3:1").is_err());
        assert!(parse_selection("x:1-2:2").is_err());
    }

    #[test]
    fn test_add_appends_by_default() {
        let (temp, path) = workspace(THREE);
        let roots = [temp.path().to_path_buf()];
        run(
            &roots,
            StepOp::Add {
                tour: "T".into(),
                file: "d.rs".into(),
                line: Some(4),
                description: "d".into(),
                title: None,
                after: None,
            },
        )
        .unwrap();
        assert_eq!(descriptions(&path), vec!["a", "b", "c", "d"]);
        let tour = TourReader::read_tour(&path).unwrap();
        assert_eq!(tour.steps[3].file.as_deref(), Some("d.rs"));
        assert_eq!(tour.steps[3].line, Some(4));
    }

    #[test]
    fn test_add_after() {
        let (temp, path) = workspace(THREE);
        let roots = [temp.path().to_path_buf()];
        run(
            &roots,
            StepOp::Add {
                tour: "T".into(),
                file: temp.path().join("src/x.rs"),
                line: None,
                description: "x".into(),
                title: Some("X".into()),
                after: Some(1),
            },
        )
        .unwrap();
        assert_eq!(descriptions(&path), vec!["a", "x", "b", "c"]);
    }

    #[test]
    fn test_add_to_empty_tour() {
        let (temp, path) = workspace("");
        let roots = [temp.path().to_path_buf()];
        run(
            &roots,
            StepOp::Add {
                tour: "T".into(),
                file: "a.rs".into(),
                line: None,
                description: "first".into(),
                title: None,
                after: None,
            },
        )
        .unwrap();
        assert_eq!(descriptions(&path), vec!["first"]);
    }

    #[test]
    fn test_relative_file() {
        let (temp, _) = workspace("");
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/x.rs"), "").unwrap();
        let engine = open_engine(&[temp.path().to_path_buf()]);
        let tour = select_tour(&engine, "T").unwrap();

        assert_eq!(
            relative_file(&engine, &tour, &temp.path().join("src/x.rs")),
            "src/x.rs"
        );
        assert_eq!(
            relative_file(&engine, &tour, Path::new("not/here.rs")),
            "not/here.rs"
        );
    }

    #[test]
    fn test_move_and_remove() {
        let (temp, path) = workspace(THREE);
        let roots = [temp.path().to_path_buf()];
        run(
            &roots,
            StepOp::Move {
                tour: "T".into(),
                step: 1,
                by: 2,
            },
        )
        .unwrap();
        assert_eq!(descriptions(&path), vec!["b", "c", "a"]);

        run(
            &roots,
            StepOp::Remove {
                tour: "T".into(),
                step: 2,
            },
        )
        .unwrap();
        assert_eq!(descriptions(&path), vec!["b", "a"]);

        assert!(
            run(
                &roots,
                StepOp::Move {
                    tour: "T".into(),
                    step: 1,
                    by: -1,
                },
            )
            .is_err()
        );
        assert_eq!(descriptions(&path), vec!["b", "a"]);
    }

    #[test]
    fn test_edit_with_selection() {
        let (temp, path) = workspace(THREE);
        let roots = [temp.path().to_path_buf()];
        run(
            &roots,
            StepOp::Edit {
                tour: "T".into(),
                step: 2,
                description: "better".into(),
                selection: Some("1:1-2:5".into()),
            },
        )
        .unwrap();

        let tour = TourReader::read_tour(&path).unwrap();
        assert_eq!(tour.steps[1].description, "better");
        assert_eq!(
            tour.steps[1].selection,
            Some(Selection::new(Position::new(1, 1), Position::new(2, 5)))
        );
    }
}

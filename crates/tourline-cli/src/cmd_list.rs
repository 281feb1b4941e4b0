use crate::{open_engine, select_tour, step_index, to_json};
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use tourline_engine::{TourEngine, TourHandle, TreeNode};

#[derive(Serialize)]
struct TourSummary {
    id: String,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    git_ref: Option<String>,
    steps: usize,
}

impl TourSummary {
    fn of(tour: &TourHandle) -> Self {
        let t = tour.read();
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            description: t.description.clone(),
            git_ref: t.pinned_ref().map(str::to_string),
            steps: t.steps.len(),
        }
    }
}

pub fn run_list(roots: &[PathBuf], json: bool, pretty: bool) -> Result<()> {
    let engine = open_engine(roots);
    if json {
        let tours: Vec<TourSummary> = engine.tours().iter().map(TourSummary::of).collect();
        println!("{}", to_json(&tours, pretty)?);
        return Ok(());
    }

    print!("{}", render_list(&engine));
    Ok(())
}

fn render_list(engine: &TourEngine) -> String {
    if !engine.has_tours() {
        return "No tours found. Record one with `tour record <title>`.\n".to_string();
    }
    let mut out = String::new();
    for node in engine.tree_roots() {
        if let TreeNode::Tour { tour, .. } = &node {
            let pin = tour
                .read()
                .pinned_ref()
                .map(|r| format!(" @ {}", r))
                .unwrap_or_default();
            out.push_str(&format!(
                "{:<32} {:>9}{}  {}\n",
                node.label(),
                node.description().unwrap_or_default(),
                pin,
                tour.id()
            ));
        }
    }
    out
}

pub fn run_show(roots: &[PathBuf], selector: &str, json: bool, pretty: bool) -> Result<()> {
    let engine = open_engine(roots);
    let tour = select_tour(&engine, selector)?;
    if json {
        let t = tour.snapshot();
        println!("{}", to_json(&t, pretty)?);
        return Ok(());
    }

    print!("{}", render_tour(&engine, &tour));
    Ok(())
}

fn render_tour(engine: &TourEngine, tour: &TourHandle) -> String {
    let mut out = format!("{}\n", tour.title());
    if let Some(description) = &tour.read().description {
        out.push_str(&format!("{}\n", description));
    }
    let node = TreeNode::Tour {
        tour: tour.clone(),
        active: false,
        recording: false,
    };
    for child in engine.tree_children(&node) {
        let location = match &child {
            TreeNode::Step { tour, index } => tour
                .step(*index)
                .and_then(|s| s.location().map(|l| format!("  ({})", l)))
                .unwrap_or_default(),
            _ => String::new(),
        };
        out.push_str(&format!("  {}{}\n", child.label(), location));
    }
    out
}

pub fn run_resolve(roots: &[PathBuf], selector: &str, number: usize, content: bool) -> Result<()> {
    let engine = open_engine(roots);
    let tour = select_tour(&engine, selector)?;
    let index = step_index(&tour, number)?;
    let address = engine.resolve_step(&tour, index)?;

    if content {
        print!("{}", engine.read_content(&address)?);
    } else {
        println!("{}", address);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn workspace() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".tours")).unwrap();
        fs::write(
            temp.path().join(".tours/b.tour"),
            r##"{"title":"Basics","ref":"v1","steps":[
                {"file":"src/main.rs","line":3,"description":"Entry"},
                {"file":"src/lib.rs","description":"# Library\nDetails"}
            ]}"##,
        )
        .unwrap();
        fs::write(
            temp.path().join(".tour"),
            r#"{"title":"architecture","description":"Big picture","steps":[]}"#,
        )
        .unwrap();
        temp
    }

    #[test]
    fn test_render_list() {
        let temp = workspace();
        let engine = open_engine(&[temp.path().to_path_buf()]);
        let out = render_list(&engine);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("architecture"));
        assert!(lines[0].contains("0 steps"));
        assert!(lines[1].starts_with("Basics"));
        assert!(lines[1].contains("2 steps @ v1"));
    }

    #[test]
    fn test_render_empty_list() {
        let temp = TempDir::new().unwrap();
        let engine = open_engine(&[temp.path().to_path_buf()]);
        assert!(render_list(&engine).starts_with("No tours found"));
    }

    #[test]
    fn test_render_tour() {
        let temp = workspace();
        let engine = open_engine(&[temp.path().to_path_buf()]);
        let tour = select_tour(&engine, "Basics").unwrap();
        let out = render_tour(&engine, &tour);
        assert_eq!(
            out,
            "Basics\n  #1 - src/main.rs  (src/main.rs)\n  #2 - Library  (src/lib.rs)\n"
        );

        let empty = select_tour(&engine, "architecture").unwrap();
        assert_eq!(
            render_tour(&engine, &empty),
            "architecture\nBig picture\n  No steps recorded yet\n"
        );
    }

    #[test]
    fn test_summary() {
        let temp = workspace();
        let engine = open_engine(&[temp.path().to_path_buf()]);
        let summary = TourSummary::of(&select_tour(&engine, "Basics").unwrap());
        assert_eq!(summary.steps, 2);
        assert_eq!(summary.git_ref.as_deref(), Some("v1"));
    }
}

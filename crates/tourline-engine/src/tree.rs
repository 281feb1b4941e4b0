//! Read-only projections for tree and status surfaces.

use crate::TourEngine;
use crate::store::{ActiveSession, TourHandle};
use tourline::v1::Tour;

const CONTEXT_PREFIX: &str = "tourline";

/// One row in a tour tree.
#[derive(Debug, Clone)]
pub enum TreeNode {
    Tour {
        tour: TourHandle,
        active: bool,
        recording: bool,
    },
    Step {
        tour: TourHandle,
        index: usize,
    },
    /// Shown alone when there is nothing to list.
    RecordPrompt,
    /// Sole child of a tour without steps.
    NoSteps,
}

impl TreeNode {
    pub fn label(&self) -> String {
        match self {
            TreeNode::Tour { tour, .. } => tour.title(),
            TreeNode::Step { tour, index } => step_label(&tour.read(), *index),
            TreeNode::RecordPrompt => "Record new tour...".to_string(),
            TreeNode::NoSteps => "No steps recorded yet".to_string(),
        }
    }

    /// Secondary text shown next to the label.
    pub fn description(&self) -> Option<String> {
        match self {
            TreeNode::Tour { tour, .. } => Some(format!("{} steps", tour.step_count())),
            _ => None,
        }
    }

    pub fn tooltip(&self) -> Option<String> {
        match self {
            TreeNode::Tour { tour, .. } => tour.read().description.clone(),
            _ => None,
        }
    }

    /// Dotted flags menus key off, e.g. `tourline.tour.recording.active`.
    pub fn context_value(&self) -> Option<String> {
        match self {
            TreeNode::Tour {
                active, recording, ..
            } => {
                let mut value = format!("{}.tour", CONTEXT_PREFIX);
                if *recording {
                    value.push_str(".recording");
                }
                if *active {
                    value.push_str(".active");
                }
                Some(value)
            }
            TreeNode::Step { tour, index } => {
                let mut value = format!("{}.tourStep", CONTEXT_PREFIX);
                if *index > 0 {
                    value.push_str(".hasPrevious");
                }
                if index + 1 < tour.step_count() {
                    value.push_str(".hasNext");
                }
                Some(value)
            }
            TreeNode::RecordPrompt | TreeNode::NoSteps => None,
        }
    }

    /// A tour being recorded starts expanded.
    pub fn is_expanded(&self) -> bool {
        matches!(self, TreeNode::Tour { recording: true, .. })
    }
}

/// `#N - ` followed by the step's title, the first markdown heading of its
/// description, its uri, or its file.
pub fn step_label(tour: &Tour, index: usize) -> String {
    let Some(step) = tour.steps.get(index) else {
        return format!("#{}", index + 1);
    };

    let label = if let Some(title) = &step.title {
        title.clone()
    } else if let Some(heading) = markdown_heading(&step.description) {
        heading.to_string()
    } else {
        step.uri
            .as_deref()
            .or(step.file.as_deref())
            .unwrap_or_default()
            .to_string()
    };
    format!("#{} - {}", index + 1, label)
}

fn markdown_heading(description: &str) -> Option<&str> {
    let line = description.trim().lines().next()?;
    let rest = line.trim_start_matches('#');
    if rest.len() == line.len() || !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

/// `Tour: #2 of 5 (Title)`, prefixed with `Recording ` while recording.
pub fn status_text(session: &ActiveSession) -> String {
    let prefix = if session.is_recording() { "Recording " } else { "" };
    format!(
        "{}Tour: #{} of {} ({})",
        prefix,
        session.step_number() + 1,
        session.tour().step_count(),
        session.tour().title()
    )
}

impl TourEngine {
    /// Top-level rows: every tour, with the active tour first if it isn't
    /// part of the discovered set. With nothing to show, a record prompt.
    pub fn tree_roots(&self) -> Vec<TreeNode> {
        if !self.has_tours() && self.active.is_none() {
            return vec![TreeNode::RecordPrompt];
        }

        let mut nodes: Vec<TreeNode> = self.tours().iter().map(|t| self.tour_node(t)).collect();
        if let Some(active) = &self.active {
            let id = active.tour.id();
            if self.find_tour(&id).is_none() {
                nodes.insert(0, self.tour_node(&active.tour));
            }
        }
        nodes
    }

    pub fn tree_children(&self, node: &TreeNode) -> Vec<TreeNode> {
        match node {
            TreeNode::Tour { tour, .. } if tour.step_count() == 0 => vec![TreeNode::NoSteps],
            TreeNode::Tour { tour, .. } => (0..tour.step_count())
                .map(|index| TreeNode::Step {
                    tour: tour.clone(),
                    index,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn tree_parent(&self, node: &TreeNode) -> Option<TreeNode> {
        match node {
            TreeNode::Step { tour, .. } => Some(self.tour_node(tour)),
            _ => None,
        }
    }

    /// Status text for the active session, if any.
    pub fn status_line(&self) -> Option<String> {
        self.active.as_ref().map(status_text)
    }

    fn tour_node(&self, tour: &TourHandle) -> TreeNode {
        let active = self
            .active
            .as_ref()
            .is_some_and(|a| a.tour.id() == tour.id());
        TreeNode::Tour {
            tour: tour.clone(),
            active,
            recording: active && self.is_recording(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StartOptions;
    use std::fs;
    use tempfile::TempDir;
    use tourline::v1::Step;

    fn tour() -> Tour {
        Tour::new("Intro")
            .with_description("Start here")
            .with_step(Step::new("plain").with_file("src/main.rs"))
            .with_step(Step::new("  ## Setup\nmore text").with_file("a.rs"))
            .with_step(Step::new("x").with_title("Titled"))
            .with_step(Step::new("y").with_uri("https://example.com/z.rs"))
    }

    #[test]
    fn test_step_labels() {
        let t = tour();
        assert_eq!(step_label(&t, 0), "#1 - src/main.rs");
        assert_eq!(step_label(&t, 1), "#2 - Setup");
        assert_eq!(step_label(&t, 2), "#3 - Titled");
        assert_eq!(step_label(&t, 3), "#4 - https://example.com/z.rs");
    }

    #[test]
    fn test_hashtag_is_not_a_heading() {
        let t = Tour::new("T")
            .with_step(Step::new("#hashtag notes").with_file("a.rs"))
            .with_step(Step::new("## Build\nmore").with_file("b.rs"))
            .with_step(Step::new("#").with_file("c.rs"));
        assert_eq!(step_label(&t, 0), "#1 - a.rs");
        assert_eq!(step_label(&t, 1), "#2 - Build");
        assert_eq!(step_label(&t, 2), "#3 - c.rs");
    }

    #[test]
    fn test_step_context_values() {
        let handle = TourHandle::new(tour());
        let first = TreeNode::Step {
            tour: handle.clone(),
            index: 0,
        };
        let middle = TreeNode::Step {
            tour: handle.clone(),
            index: 1,
        };
        let last = TreeNode::Step {
            tour: handle,
            index: 3,
        };
        assert_eq!(first.context_value().unwrap(), "tourline.tourStep.hasNext");
        assert_eq!(
            middle.context_value().unwrap(),
            "tourline.tourStep.hasPrevious.hasNext"
        );
        assert_eq!(last.context_value().unwrap(), "tourline.tourStep.hasPrevious");
    }

    #[test]
    fn test_empty_tree_prompts_recording() {
        let engine = TourEngine::new(Vec::new());
        let roots = engine.tree_roots();
        assert_eq!(roots.len(), 1);
        assert!(matches!(roots[0], TreeNode::RecordPrompt));
        assert_eq!(roots[0].label(), "Record new tour...");
        assert!(engine.status_line().is_none());
    }

    #[test]
    fn test_tree_for_recording_session() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".tours")).unwrap();
        fs::write(
            temp.path().join(".tours/a.tour"),
            tour().to_json().unwrap(),
        )
        .unwrap();

        let mut engine = TourEngine::new(vec![temp.path().to_path_buf()]);
        engine.discover();
        engine.start_recording(temp.path(), "New", None).unwrap();

        let roots = engine.tree_roots();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].label(), "New");
        assert!(roots[0].is_expanded());
        assert_eq!(
            roots[0].context_value().unwrap(),
            "tourline.tour.recording.active"
        );
        assert_eq!(roots[1].context_value().unwrap(), "tourline.tour");
        assert_eq!(roots[1].description().unwrap(), "4 steps");
        assert_eq!(roots[1].tooltip().as_deref(), Some("Start here"));

        let children = engine.tree_children(&roots[0]);
        assert_eq!(children.len(), 1);
        assert!(matches!(children[0], TreeNode::NoSteps));

        assert_eq!(engine.status_line().unwrap(), "Recording Tour: #0 of 0 (New)");
    }

    #[test]
    fn test_tree_children_and_parent() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".tours")).unwrap();
        fs::write(
            temp.path().join(".tours/a.tour"),
            tour().to_json().unwrap(),
        )
        .unwrap();

        let mut engine = TourEngine::new(vec![temp.path().to_path_buf()]);
        engine.discover();
        let handle = engine.tours()[0].clone();
        engine
            .start(&handle, StartOptions::default().at_step(1))
            .unwrap();

        let roots = engine.tree_roots();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].context_value().unwrap(), "tourline.tour.active");

        let children = engine.tree_children(&roots[0]);
        assert_eq!(children.len(), 4);
        assert_eq!(children[1].label(), "#2 - Setup");
        assert!(engine.tree_children(&children[1]).is_empty());

        let parent = engine.tree_parent(&children[1]).unwrap();
        assert_eq!(parent.label(), "Intro");
        assert!(engine.tree_parent(&parent).is_none());

        assert_eq!(engine.status_line().unwrap(), "Tour: #2 of 4 (Intro)");
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ref value meaning "not pinned to any version".
pub const NO_PIN_REF: &str = "HEAD";

// ============================================================================
// Tour
// ============================================================================

/// An ordered walk through a codebase.
///
/// `id` is never read from or written to the document: it is stamped by
/// whoever loaded the tour (normally the path it was read from) and is
/// unique among loaded tours.
///
/// # JSON shape
///
/// ```json
/// {
///   "title": "Getting started",
///   "description": "Where the request loop lives",
///   "ref": "v1.2.0",
///   "steps": [
///     { "file": "src/main.rs", "line": 12, "description": "Entry point" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    #[serde(skip)]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Branch, tag, or commit the steps are pinned against.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    pub steps: Vec<Step>,
    /// Fields this crate doesn't model, carried through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tour {
    /// Create an empty tour with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// The pinned ref, ignoring the no-pin sentinel.
    pub fn pinned_ref(&self) -> Option<&str> {
        self.git_ref.as_deref().filter(|r| *r != NO_PIN_REF)
    }

    /// Parse a tour document. The returned tour has an empty `id`; any `id`
    /// carried by the document itself is discarded.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut tour: Tour = serde_json::from_str(json)?;
        tour.extra.remove("id");
        Ok(tour)
    }

    /// Serialize to JSON (without `id`).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON (without `id`).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Copy every durable field of `other` into `self`, keeping `self.id`.
    ///
    /// Used to update a tour in place when something else holds a handle to it.
    pub fn assign_from(&mut self, other: &Tour) {
        self.title.clone_from(&other.title);
        self.description.clone_from(&other.description);
        self.git_ref.clone_from(&other.git_ref);
        self.steps.clone_from(&other.steps);
        self.extra.clone_from(&other.extra);
    }
}

// ============================================================================
// Step
// ============================================================================

/// One stop in a tour.
///
/// A step conventionally targets either a workspace-relative `file` or an
/// absolute `uri`. When `contents` is present it is the authoritative text
/// for the step (an exported snapshot or an unsaved edit).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// 1-based line number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Step {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn with_contents(mut self, contents: impl Into<String>) -> Self {
        self.contents = Some(contents.into());
        self
    }

    /// The location this step points at: `uri` if set, otherwise `file`.
    pub fn location(&self) -> Option<&str> {
        self.uri.as_deref().or(self.file.as_deref())
    }
}

// ============================================================================
// Selection
// ============================================================================

/// A 1-based line/character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A 1-based range, kept 1-based so the document stays hand-editable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub start: Position,
    pub end: Position,
}

impl Selection {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Convert a 0-based editor range into the 1-based document form.
    pub fn from_zero_based(start: (u32, u32), end: (u32, u32)) -> Self {
        Self {
            start: Position::new(start.0 + 1, start.1 + 1),
            end: Position::new(end.0 + 1, end.1 + 1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

use std::fmt;
use std::path::PathBuf;

/// Scheme used for step content that exists only inside a tour document.
pub const EMBEDDED_SCHEME: &str = "tourline";

/// Where the bytes for a step come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentAddress {
    /// Literal text carried by the step itself.
    Embedded { address: String, contents: String },
    /// A file in the live worktree.
    File(PathBuf),
    /// An absolute address taken verbatim from the step.
    Uri(String),
    /// A file as it exists at a version-control ref.
    Historical(HistoricalAddress),
}

impl ContentAddress {
    /// Build the embedded address for a step.
    ///
    /// Derived only from the step's `file`, so a step maps to the same
    /// address across discovery passes.
    pub fn embedded(file: Option<&str>, contents: impl Into<String>) -> Self {
        ContentAddress::Embedded {
            address: embedded_address(file),
            contents: contents.into(),
        }
    }

    /// Classify an address string: `file://` URIs and scheme-less strings
    /// become [`ContentAddress::File`], anything else stays a URI.
    pub fn from_address(address: &str) -> Self {
        if let Some(path) = address.strip_prefix("file://") {
            return ContentAddress::File(PathBuf::from(path));
        }
        match split_scheme(address) {
            (Some(_), _) => ContentAddress::Uri(address.to_string()),
            (None, path) => ContentAddress::File(PathBuf::from(path)),
        }
    }

    pub fn is_historical(&self) -> bool {
        matches!(self, ContentAddress::Historical(_))
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentAddress::Embedded { address, .. } => write!(f, "{}", address),
            ContentAddress::File(path) => write!(f, "file://{}", path.display()),
            ContentAddress::Uri(uri) => write!(f, "{}", uri),
            ContentAddress::Historical(h) => write!(f, "{}", h),
        }
    }
}

/// A worktree path pinned to a ref.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoricalAddress {
    pub path: PathBuf,
    pub git_ref: String,
}

impl HistoricalAddress {
    pub fn new(path: impl Into<PathBuf>, git_ref: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            git_ref: git_ref.into(),
        }
    }
}

impl fmt::Display for HistoricalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "git:{}?ref={}", self.path.display(), self.git_ref)
    }
}

/// `tourline://current/<file>`
pub fn embedded_address(file: Option<&str>) -> String {
    format!("{}://current/{}", EMBEDDED_SCHEME, file.unwrap_or_default())
}

/// Join a workspace-relative `file` onto `root`.
///
/// When `file` climbs out of the root (starts with `..`), only the path
/// component of `root` is normalized; a `scheme://authority` prefix is left
/// as-is.
///
/// ```
/// use tourline::v1::join_relative;
///
/// assert_eq!(join_relative("/work/app", "src/lib.rs"), "/work/app/src/lib.rs");
/// assert_eq!(join_relative("/work/app", "../shared/a.rs"), "/work/shared/a.rs");
/// assert_eq!(
///     join_relative("remote://host/work/app", "../b.rs"),
///     "remote://host/work/b.rs",
/// );
/// ```
pub fn join_relative(root: &str, file: &str) -> String {
    let joined = format!("{}/{}", root.trim_end_matches('/'), file);
    if !file.starts_with("..") {
        return joined;
    }

    match split_scheme(&joined) {
        (Some(prefix), path) => format!("{}{}", prefix, normalize_segments(path)),
        (None, path) => normalize_segments(path),
    }
}

/// Split `scheme://authority/path` into (`scheme://authority`, `/path`).
fn split_scheme(address: &str) -> (Option<&str>, &str) {
    let Some(idx) = address.find("://") else {
        return (None, address);
    };
    let scheme = &address[..idx];
    if scheme.is_empty()
        || !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        return (None, address);
    }
    let after = idx + 3;
    match address[after..].find('/') {
        Some(slash) => {
            let (prefix, path) = address.split_at(after + slash);
            (Some(prefix), path)
        }
        None => (Some(address), ""),
    }
}

/// Lexically resolve `.` and `..` segments.
fn normalize_segments(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let body = parts.join("/");
    if absolute {
        format!("/{}", body)
    } else {
        body
    }
}

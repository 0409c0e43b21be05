use serde::Deserialize;

/// A pull request as listed by Bitbucket.
/// Immutable once fetched; lives for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// Bitbucket PR id (e.g., 42)
    pub id: u64,
    /// PR title, which carries the ticket identifier
    pub title: String,
    /// The PR's own link (`links.self.href`)
    pub url: String,
}

/// One page of the Bitbucket pull request listing.
#[derive(Debug, Deserialize)]
pub(crate) struct PullRequestPage {
    #[serde(default)]
    pub values: Vec<PullRequestRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PullRequestRecord {
    id: u64,
    title: String,
    links: Links,
}

#[derive(Debug, Deserialize)]
struct Links {
    #[serde(rename = "self")]
    self_link: Href,
}

#[derive(Debug, Deserialize)]
struct Href {
    href: String,
}

impl From<PullRequestRecord> for PullRequest {
    fn from(record: PullRequestRecord) -> Self {
        PullRequest {
            id: record.id,
            title: record.title,
            url: record.links.self_link.href,
        }
    }
}

/// A single file within the PR diff.
#[derive(Debug, Clone)]
pub struct DiffFile {
    /// File path (e.g., "app/code/Vendor/Module/Model/Order.php")
    pub path: String,
    /// Whether this is a new file
    pub is_new: bool,
    /// Whether this file was deleted
    pub is_deleted: bool,
    /// Hunks (contiguous changed regions)
    pub hunks: Vec<Hunk>,
}

/// A contiguous region of changes within a file.
#[derive(Debug, Clone)]
pub struct Hunk {
    /// Raw lines of the hunk (prefixed with +, -, or space)
    pub lines: Vec<String>,
}

impl Hunk {
    pub fn added(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| l.strip_prefix('+'))
    }

    pub fn removed(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| l.strip_prefix('-'))
    }
}

use serde::{Deserialize, Serialize};

/// Non-fatal conditions resolved locally during mapping or a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Best match for a source column scored below the confidence floor.
    MappingAmbiguity,
    /// Value outside a non-extensible vocabulary.
    VocabularyViolation,
    /// Character value longer than the declared maximum; truncated.
    LengthOverflow,
    /// Source sequence values collided; regenerated.
    SequenceCollision,
}

/// An issue observed while building one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildIssue {
    pub kind: IssueKind,
    pub variable: Option<String>,
    pub count: usize,
    pub message: String,
}

impl BuildIssue {
    pub fn new(kind: IssueKind, variable: Option<&str>, count: usize, message: String) -> Self {
        Self {
            kind,
            variable: variable.map(str::to_string),
            count,
            message,
        }
    }
}

/// Issues collected for a single domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueLog {
    #[serde(rename = "domain")]
    pub domain_code: String,
    pub issues: Vec<BuildIssue>,
}

impl IssueLog {
    pub fn new(domain_code: impl Into<String>) -> Self {
        Self {
            domain_code: domain_code.into(),
            issues: Vec::new(),
        }
    }

    pub fn push(&mut self, issue: BuildIssue) {
        self.issues.push(issue);
    }

    pub fn count_of(&self, kind: IssueKind) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.kind == kind)
            .map(|issue| issue.count)
            .sum()
    }

    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &BuildIssue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

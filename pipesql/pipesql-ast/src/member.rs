use serde::{Deserialize, Serialize};

/// Path of named member accesses from the root of a result shape.
///
/// Used as the key of an algebra node's projection mapping. The root of the
/// shape is the empty path.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectionMember {
    members: Vec<String>,
}

impl ProjectionMember {
    pub fn root() -> Self {
        ProjectionMember::default()
    }

    pub fn from_path<S: ToString, I: IntoIterator<Item = S>>(path: I) -> Self {
        ProjectionMember {
            members: path.into_iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Returns a new path with `member` appended. The receiver is unchanged.
    pub fn append<S: ToString>(&self, member: S) -> Self {
        let mut members = self.members.clone();
        members.push(member.to_string());
        ProjectionMember { members }
    }

    /// Returns `prefix` followed by this path.
    pub fn prepend(&self, prefix: &ProjectionMember) -> Self {
        let members = prefix.members.iter().chain(&self.members).cloned().collect();
        ProjectionMember { members }
    }

    pub fn is_root(&self) -> bool {
        self.members.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.members.last().map(String::as_str)
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }
}

impl std::fmt::Debug for ProjectionMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::fmt::Display for ProjectionMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.members.join("."))
    }
}

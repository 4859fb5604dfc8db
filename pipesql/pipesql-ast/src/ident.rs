use serde::{Deserialize, Serialize};

/// A qualified name of a function or member, such as `string.starts_with`.
///
/// The leading parts name the owning type (or function namespace), the last
/// part names the operation.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Serialize, Deserialize)]
pub struct Ident {
    pub path: Vec<String>,
    pub name: String,
}

impl Ident {
    pub fn from_name<S: ToString>(name: S) -> Self {
        Ident {
            path: Vec::new(),
            name: name.to_string(),
        }
    }

    /// Creates an ident out of an owner and a name.
    pub fn new<O: ToString, N: ToString>(owner: O, name: N) -> Self {
        Ident {
            path: vec![owner.to_string()],
            name: name.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.path.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The owning namespace, if there is one.
    pub fn owner(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.path.iter().chain(std::iter::once(&self.name))
    }

    /// Matches against `owner.name`, ignoring any deeper prefix.
    pub fn is(&self, owner: &str, name: &str) -> bool {
        self.owner() == Some(owner) && self.name == name
    }

    pub fn starts_with_part(&self, prefix: &str) -> bool {
        self.iter().next().is_some_and(|p| p == prefix)
    }
}

impl std::fmt::Debug for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(&self.path)
            .entry(&self.name)
            .finish()
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for part in &self.path {
            write!(f, "{part}.")?;
        }
        f.write_str(&self.name)
    }
}

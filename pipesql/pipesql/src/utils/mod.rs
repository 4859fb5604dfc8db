use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// Matches identifiers that can be written without quotes in any supported
/// dialect.
pub(crate) fn valid_ident() -> &'static Regex {
    static VALID_IDENT: OnceLock<Regex> = OnceLock::new();
    VALID_IDENT.get_or_init(|| {
        // An ident starting with `A-Za-z_` and containing other characters `A-Za-z0-9_`
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap()
    })
}

/// Hands out names that are unique within one scope, suffixing a counter to
/// names that were already taken (`Name`, `Name0`, `Name1`, ...).
#[derive(Debug, Clone, Default)]
pub struct NameGenerator {
    taken: HashSet<String>,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gen(&mut self, preferred: &str) -> String {
        if self.taken.insert(preferred.to_string()) {
            return preferred.to_string();
        }
        let mut id = 0;
        loop {
            let candidate = format!("{preferred}{id}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            id += 1;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_valid_ident() {
        assert!(valid_ident().is_match("Person"));
        assert!(valid_ident().is_match("_first_name2"));
        assert!(!valid_ident().is_match(""));
        assert!(!valid_ident().is_match("Order Details"));
        assert!(!valid_ident().is_match("2fa"));
    }

    #[test]
    fn test_name_generator() {
        let mut names = NameGenerator::new();
        assert_eq!(names.gen("Name"), "Name");
        assert_eq!(names.gen("Name"), "Name0");
        assert_eq!(names.gen("Name"), "Name1");
        assert_eq!(names.gen("Id"), "Id");
    }
}

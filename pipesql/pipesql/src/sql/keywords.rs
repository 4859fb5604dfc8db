use std::collections::HashSet;
use std::sync::OnceLock;

/// Words that can't be used as bare identifiers in at least one of the
/// supported dialects.
const RESERVED: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "CHECK",
    "COLUMN", "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "CURRENT_USER", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE",
    "END", "ESCAPE", "EXCEPT", "EXISTS", "FALSE", "FETCH", "FOR", "FOREIGN", "FROM", "FULL",
    "GRANT", "GROUP", "HAVING", "IN", "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS",
    "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER",
    "OVER", "PERCENT", "PRIMARY", "REFERENCES", "RIGHT", "ROWS", "SELECT", "SET", "TABLE", "THEN",
    "TO", "TOP", "TRUE", "UNION", "UNIQUE", "UPDATE", "USER", "USING", "VALUES", "VIEW", "WHEN",
    "WHERE", "WITH",
];

pub(super) fn is_keyword(ident: &str) -> bool {
    static KEYWORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    KEYWORDS
        .get_or_init(|| RESERVED.iter().copied().collect())
        .contains(ident.to_ascii_uppercase().as_str())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn case_insensitive() {
        assert!(is_keyword("order"));
        assert!(is_keyword("Select"));
        assert!(!is_keyword("Person"));
    }
}

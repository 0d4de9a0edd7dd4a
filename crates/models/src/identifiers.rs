use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// IDENTIFIER_RE matches names which are usable as variables in a
    /// generated script: ASCII letters, digits and underscores, not
    /// starting with a digit.
    pub static ref IDENTIFIER_RE: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap();
}

// Entity names become Python identifiers in emitted programs, so the
// reserved words of the script surface are excluded as well.
const RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name) && !RESERVED.contains(&name)
}

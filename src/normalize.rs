//! Canonical form of program output used for grading comparisons.
//!
//! Line endings are unified, every whitespace run (newlines included) collapses to
//! a single space, and the ends are trimmed. Outputs that differ only in layout
//! therefore compare equal, e.g. `"1\n2"` and `"1 2"`.

/// Normalize captured or expected output. `None` becomes the empty string.
pub fn normalize_output(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    unified.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Command reference printed by `help`.

const COMMANDS: [(&str, &str); 9] = [
    ("/TEXT", "search by name (typing pauses are debounced)"),
    ("/", "clear the search and go back to browsing"),
    ("more, n", "load the next page"),
    ("show N", "scroll so row N is first (loads more near the end)"),
    ("reload, r", "refresh the current list or search"),
    ("detail ID", "look up one character by id"),
    ("open N", "open row N's wiki page in the browser"),
    ("help, ?", "show this list"),
    ("quit, q", "exit"),
];

pub(crate) fn help_lines() -> Vec<String> {
    let key_width = COMMANDS.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    COMMANDS
        .iter()
        .map(|(keys, what)| format!("  {keys:<key_width$}  {what}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_is_aligned() {
        let lines = help_lines();
        assert_eq!(lines.len(), COMMANDS.len());
        // Widest key is 9 columns, so descriptions start at column 13
        for (line, (_, what)) in lines.iter().zip(COMMANDS) {
            assert_eq!(line.find(what), Some(13), "{line}");
        }
    }
}

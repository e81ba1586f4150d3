//! Interactive endpoint selection

use colored::*;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Map raw input to a zero-based index.
///
/// Blank input picks the first entry. Anything outside `1..=count` also
/// picks the first entry and comes back with a warning for the user.
pub fn parse_selection(input: &str, count: usize) -> (usize, Option<String>) {
    let input = input.trim();
    if input.is_empty() {
        return (0, None);
    }

    match input.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => (n - 1, None),
        _ => (0, Some(format!("Invalid selection '{}', fallback to 1.", input))),
    }
}

/// `Select endpoint [1-N, Enter=1]: `
pub fn prompt_text(count: usize) -> String {
    format!("Select endpoint [1-{}, Enter=1]: ", count)
}

/// Source of the user's answer to the endpoint prompt
pub trait SelectionInput: Send + Sync {
    /// Show the prompt for `count` choices and return the raw answer
    fn read_selection(&self, count: usize) -> io::Result<String>;
}

/// Prompt on stderr, read one line from stdin
pub struct StdinSelection {
    use_color: bool,
}

impl StdinSelection {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }
}

impl SelectionInput for StdinSelection {
    fn read_selection(&self, count: usize) -> io::Result<String> {
        let marker = if self.use_color {
            "[?]".cyan().bold().to_string()
        } else {
            "[?]".to_string()
        };

        let mut stderr = io::stderr();
        write!(stderr, "  {} {}", marker, prompt_text(count))?;
        stderr.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }
}

/// Line editor prompt from `dialoguer`
#[cfg(feature = "interactive")]
pub struct DialoguerSelection;

#[cfg(feature = "interactive")]
impl SelectionInput for DialoguerSelection {
    fn read_selection(&self, count: usize) -> io::Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(prompt_text(count).trim_end_matches([' ', ':']))
            .allow_empty(true)
            .interact_text()
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

/// Canned answer, for scripted runs and tests
pub struct FixedSelection(pub String);

impl SelectionInput for FixedSelection {
    fn read_selection(&self, _count: usize) -> io::Result<String> {
        Ok(self.0.clone())
    }
}

/// Prompt implementation for this build
pub fn default_input(use_color: bool) -> Arc<dyn SelectionInput> {
    #[cfg(feature = "interactive")]
    {
        let _ = use_color;
        Arc::new(DialoguerSelection)
    }
    #[cfg(not(feature = "interactive"))]
    {
        Arc::new(StdinSelection::new(use_color))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_selects_first() {
        assert_eq!(parse_selection("", 3), (0, None));
        assert_eq!(parse_selection("  \n", 3), (0, None));
    }

    #[test]
    fn test_valid_selection() {
        assert_eq!(parse_selection("1", 3), (0, None));
        assert_eq!(parse_selection("3\n", 3), (2, None));
    }

    #[test]
    fn test_invalid_selection_warns_and_falls_back() {
        for bad in ["0", "4", "abc", "-1", "1.5"] {
            let (index, warning) = parse_selection(bad, 3);
            assert_eq!(index, 0, "input {:?}", bad);
            assert_eq!(warning.unwrap(), format!("Invalid selection '{}', fallback to 1.", bad));
        }
    }

    #[test]
    fn test_prompt_text() {
        assert_eq!(prompt_text(4), "Select endpoint [1-4, Enter=1]: ");
    }

    #[test]
    fn test_fixed_selection() {
        let input = FixedSelection("2".into());
        assert_eq!(input.read_selection(5).unwrap(), "2");
    }
}

//! The code oracle seam and completion parsing.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

/// Appended to every extracted program so the child prints the return value
/// of `extend_database()`.
pub const ENTRY_POINT: &str = "\n\nif __name__ == '__main__':\n    print(extend_database())\n";

/// External text generator producing candidate programs.
///
/// Implementations own their retry policy and return an empty string once it
/// is exhausted. They never fail.
#[async_trait]
pub trait CodeOracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> String;
}

fn python_block() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)```python(.*?)```").expect("static pattern"))
}

/// Body of the first fenced python block, trimmed. `None` when there is no
/// block or it is blank.
pub fn extract_code_block(completion: &str) -> Option<String> {
    python_block()
        .captures(completion)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|body| !body.is_empty())
}

/// The runnable program for a completion, or an empty string when the
/// completion held no code.
pub fn extract_program(completion: &str) -> String {
    match extract_code_block(completion) {
        Some(body) => format!("{body}{ENTRY_POINT}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_block_wins() {
        let text = "Here:\n```python\nx = 1\n```\nand\n```python\ny = 2\n```";
        assert_eq!(extract_code_block(text).as_deref(), Some("x = 1"));
    }

    #[test]
    fn test_missing_or_blank_block() {
        assert_eq!(extract_code_block("no code here"), None);
        assert_eq!(extract_code_block("```python\n   \n```"), None);
        assert_eq!(extract_code_block("```\nprint(1)\n```"), None);
        assert_eq!(extract_program(""), "");
    }

    #[test]
    fn test_program_gets_entry_point() {
        let program = extract_program("```python\ndef extend_database():\n    return True\n```");
        assert!(program.starts_with("def extend_database():"));
        assert!(program.ends_with("print(extend_database())\n"));
    }
}

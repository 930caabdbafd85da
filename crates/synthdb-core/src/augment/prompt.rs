//! Prompt assembly for initial generation and the two repair paths.

use std::path::Path;

use super::error::AugmentResult;

pub const DEFAULT_INIT_INSTRUCTION: &str = "Write a Python function extend_database() that opens the SQLite \
database at the path in the SQLITE_PATH environment variable, inserts realistic rows into every table \
in the schema below (keeping foreign keys consistent and ids at most MAX_ID), commits, and returns True. \
Reply with a single ```python code block.";

pub const DEFAULT_EXEC_REPAIR_INSTRUCTION: &str = "The previous extend_database() program failed to run. \
Fix the error below and reply with the complete corrected program in a single ```python code block. \
It must print nothing besides returning True.";

pub const DEFAULT_QUALITY_REPAIR_INSTRUCTION: &str = "The previous extend_database() program ran, but the \
populated database failed the quality checks listed below. Fix the data it generates and reply with the \
complete corrected program in a single ```python code block.";

/// Instruction texts for each prompt kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    pub init: String,
    pub exec_repair: String,
    pub quality_repair: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            init: DEFAULT_INIT_INSTRUCTION.to_string(),
            exec_repair: DEFAULT_EXEC_REPAIR_INSTRUCTION.to_string(),
            quality_repair: DEFAULT_QUALITY_REPAIR_INSTRUCTION.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Read any configured template files, falling back to the defaults.
    pub fn load(
        init: Option<&Path>,
        exec_repair: Option<&Path>,
        quality_repair: Option<&Path>,
    ) -> AugmentResult<Self> {
        let read = |path: Option<&Path>, default: &str| -> AugmentResult<String> {
            match path {
                Some(p) => Ok(std::fs::read_to_string(p)?),
                None => Ok(default.to_string()),
            }
        };
        Ok(Self {
            init: read(init, DEFAULT_INIT_INSTRUCTION)?,
            exec_repair: read(exec_repair, DEFAULT_EXEC_REPAIR_INSTRUCTION)?,
            quality_repair: read(quality_repair, DEFAULT_QUALITY_REPAIR_INSTRUCTION)?,
        })
    }

    pub fn initial(&self, schema: &str) -> String {
        format!("{}\n{}", self.init, schema_block(schema))
    }

    pub fn exec_repair(&self, schema: &str, error: &str, code: &str) -> String {
        format!(
            "{}\n{}\n<ERROR>\n{error}\n</ERROR>\n{}",
            self.exec_repair,
            schema_block(schema),
            prev_block(code)
        )
    }

    pub fn quality_repair(&self, schema: &str, report_json: &str, code: &str) -> String {
        format!(
            "{}\n{}\n<ERRORS>\n{report_json}\n</ERRORS>\n{}",
            self.quality_repair,
            schema_block(schema),
            prev_block(code)
        )
    }
}

fn schema_block(schema: &str) -> String {
    format!("<SCHEMA>\n{schema}\n</SCHEMA>")
}

fn prev_block(code: &str) -> String {
    format!("<PREV>\n```python\n{code}\n```\n</PREV>")
}

use anyhow::{Result, ensure};
use tracing::trace;

use super::ParserState;
use super::helpers::{first_word, indent, is_line_comment};

impl<'a> ParserState<'a> {
    /// Top-level loop: dispatch each line on its leading keyword until the
    /// window is exhausted. Lines that start no known item are skipped.
    pub(crate) fn parse_items(&mut self) -> Result<()> {
        while self.cursor < self.end {
            let idx = self.cursor;
            let line = self.line(idx)?;
            let trimmed = line.trim();

            if trimmed.is_empty() || is_line_comment(trimmed) {
                self.cursor += 1;
                continue;
            }
            if trimmed.starts_with("/*") {
                self.cursor = self.skip_block_comment(idx)?;
                continue;
            }

            let col = indent(line);
            match first_word(trimmed) {
                "package" => self.parse_package(idx, col)?,
                "import" => self.parse_import(idx, col)?,
                "global" => self.parse_global(idx, col)?,
                "function" => self.parse_function(idx, col)?,
                "rule" => self.parse_rule(idx, col)?,
                "query" => self.parse_query(idx, col)?,
                "declare" => self.parse_declare(idx, col)?,
                other => {
                    trace!(line = idx, word = other, "skipping unrecognized line");
                    self.cursor += 1;
                }
            }
            ensure!(self.cursor > idx, "parser made no progress at line {}", idx + 1);
        }
        Ok(())
    }
}

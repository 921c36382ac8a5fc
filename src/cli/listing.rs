//! Rendering of workflow records for listing commands
//!
//! A malformed template aborts the whole listing. Any other render failure
//! only affects its own record: it is reported, the listing continues, and
//! the command fails once everything else has been shown.

use anyhow::{bail, Result};
use serde::Serialize;

use super::output::Output;
use crate::domain::{Record, Todo};

pub struct Listing<'o> {
    output: &'o Output,
    template: String,
    by_level: bool,
    strict: bool,
    last_level: Option<usize>,
    failed: usize,
    shown: usize,
}

impl<'o> Listing<'o> {
    pub fn new(output: &'o Output, template: impl Into<String>) -> Self {
        Self {
            output,
            template: template.into(),
            by_level: false,
            strict: false,
            last_level: None,
            failed: 0,
            shown: 0,
        }
    }

    /// Separates levels with a blank line
    pub fn by_level(mut self, by_level: bool) -> Self {
        self.by_level = by_level;
        self
    }

    /// Fails on the first record that cannot be rendered
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn show(&mut self, record: &Record<'_>) -> Result<()> {
        let line = match record.render(&self.template) {
            Ok(line) => line,
            Err(e) if e.is_syntax() => return Err(e.into()),
            Err(e) if self.strict => return Err(e.into()),
            Err(e) => {
                self.output.error(&e.to_string());
                self.failed += 1;
                return Ok(());
            }
        };

        let level = record.todo().level;
        if self.by_level && self.last_level.is_some_and(|last| last != level) {
            println!();
        }
        self.last_level = Some(level);
        println!("{}", line);
        self.shown += 1;
        Ok(())
    }

    /// Number of records printed so far
    pub fn shown(&self) -> usize {
        self.shown
    }

    pub fn finish(self) -> Result<()> {
        if self.failed > 0 {
            bail!("some entries could not be displayed");
        }
        Ok(())
    }
}

/// JSON view of one record with its derived flags
#[derive(Debug, Serialize)]
pub struct StatusView<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub level: usize,
    pub orig_hash: &'a str,
    pub published: bool,
    pub ready: bool,
    pub invalidated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<&'a str>,
    pub deps: &'a [String],
    pub unmet: &'a [String],
}

impl<'a> From<&'a Todo> for StatusView<'a> {
    fn from(todo: &'a Todo) -> Self {
        let published = |value: &'a str| todo.published.then_some(value);
        Self {
            name: &todo.name,
            path: &todo.path,
            level: todo.level,
            orig_hash: todo.orig_hash.as_str(),
            published: todo.published,
            ready: todo.ready,
            invalidated: todo.is_invalidated(),
            version: published(&todo.new_version),
            hash: published(todo.new_hash.as_str()),
            deps: &todo.deps,
            unmet: &todo.unmet_deps,
        }
    }
}

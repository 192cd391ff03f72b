//! Tagged regions inside generated text files.
//!
//! A region is opened by `<<<SAPPER SECTION BEGIN [VERB] NAME>>>` and closed by
//! `<<<SAPPER SECTION END NAME>>>`. The tag may sit anywhere on its line, typically behind a
//! comment marker of the host language. Files written by bricks use these regions as the
//! points where later bricks append, prepend, replace or merge content.
//!
//! Two readers exist: [`read_sections`] is strict and used for template merging, where a
//! malformed tag is a hard error; [`current_section`] classifies one line at a time and
//! never fails, for scanning files of unrelated formats.

use crate::utils::error::{Result, SapperError};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

static TAG_EXP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<<<SAPPER\s+SECTION\s+(BEGIN|END)(?:\s+(APPEND|REPLACE|PREPEND|MERGE))?\s+(\S.*?)\s*>>>")
        .expect("section tag pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Append,
    Prepend,
    Replace,
    Merge,
}

impl Verb {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "APPEND" => Some(Verb::Append),
            "PREPEND" => Some(Verb::Prepend),
            "REPLACE" => Some(Verb::Replace),
            "MERGE" => Some(Verb::Merge),
            _ => None,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verb::Append => "APPEND",
            Verb::Prepend => "PREPEND",
            Verb::Replace => "REPLACE",
            Verb::Merge => "MERGE",
        };
        f.write_str(s)
    }
}

/// One parsed delimiter line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub begin: bool,
    pub verb: Option<Verb>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    /// Only meaningful for sections contributed by an incoming brick.
    pub verb: Option<Verb>,
    /// First line after the begin tag (0-indexed).
    pub line_begin: usize,
    /// Line of the end tag itself.
    pub line_end: usize,
    /// Lines between the tags joined by `\n`, without a trailing newline.
    pub content: String,
}

pub fn read_tag(line: &str) -> Option<Tag> {
    let caps = TAG_EXP.captures(line)?;
    Some(Tag {
        name: caps[3].to_string(),
        begin: &caps[1] == "BEGIN",
        verb: caps.get(2).and_then(|m| Verb::parse(m.as_str())),
    })
}

pub fn read_sections(text: &str) -> Result<Vec<Section>> {
    let mut sections = Vec::new();
    let mut current: Option<(Section, Vec<&str>)> = None;

    for (line_number, line) in text.lines().enumerate() {
        match read_tag(line) {
            Some(tag) if tag.begin => {
                if let Some((open, _)) = &current {
                    return Err(SapperError::NestedBeginTag {
                        name: tag.name,
                        open: open.name.clone(),
                        line: line_number,
                    });
                }
                let section = Section {
                    name: tag.name,
                    verb: tag.verb,
                    line_begin: line_number + 1,
                    line_end: 0,
                    content: String::new(),
                };
                current = Some((section, Vec::new()));
            }
            Some(tag) => {
                let Some((mut section, lines)) = current.take() else {
                    return Err(SapperError::EndTagWithoutBegin {
                        name: tag.name,
                        line: line_number,
                    });
                };
                if tag.name != section.name {
                    return Err(SapperError::EndTagMismatch {
                        name: tag.name,
                        open: section.name,
                        line: line_number,
                    });
                }
                section.line_end = line_number;
                section.content = lines.join("\n");
                sections.push(section);
            }
            None => {
                if let Some((_, lines)) = current.as_mut() {
                    lines.push(line);
                }
            }
        }
    }

    Ok(sections)
}

pub fn index_by_name(sections: Vec<Section>) -> HashMap<String, Section> {
    sections.into_iter().map(|s| (s.name.clone(), s)).collect()
}

/// Returns the name of the section `line` belongs to given the section the previous line
/// belonged to (empty when outside). Begin tags seen while a section is open are ignored,
/// and so are end tags for a different name.
pub fn current_section(line: &str, current: &str) -> String {
    match read_tag(line) {
        Some(tag) if tag.begin && current.is_empty() => tag.name,
        Some(tag) if !tag.begin && tag.name == current => String::new(),
        _ => current.to_string(),
    }
}

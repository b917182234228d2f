// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal PostScript Printer Description reader.
//
// Only the parts the auto-configuration workflow consumes are modelled:
// option groups with their choices and defaults, and the CUPS filter lines
// that name the programs a driver runs.  Everything else is skipped.

use std::path::Path;

use crate::error::{PlugwerkError, Result};

/// Group that receives options declared outside any `*OpenGroup`.
const GENERAL_GROUP: &str = "General";

/// A parsed PPD file.
#[derive(Debug, Clone, Default)]
pub struct PpdFile {
    pub groups: Vec<PpdGroup>,
    pub filters: Vec<PpdFilter>,
}

/// `*OpenGroup` … `*CloseGroup` block.
#[derive(Debug, Clone)]
pub struct PpdGroup {
    pub name: String,
    pub text: String,
    pub options: Vec<PpdOption>,
}

/// `*OpenUI` … `*CloseUI` block.
#[derive(Debug, Clone)]
pub struct PpdOption {
    /// Keyword without the leading `*`, e.g. `PageSize`.
    pub keyword: String,
    pub text: String,
    /// Value of the matching `*Default<keyword>` line.
    pub default_choice: Option<String>,
    pub choices: Vec<PpdChoice>,
}

#[derive(Debug, Clone)]
pub struct PpdChoice {
    pub choice: String,
    pub text: String,
    /// Set by [`PpdFile::mark_defaults`] on the currently selected choice.
    pub marked: bool,
}

/// A `*cupsFilter`, `*cupsFilter2` or `*cupsPreFilter` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpdFilter {
    /// MIME type the filter accepts.
    pub source_type: String,
    /// Program name or absolute path; `-` means no program.
    pub program: String,
}

impl PpdFile {
    /// Read and parse a PPD file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::parse(&String::from_utf8_lossy(&bytes))
    }

    /// Parse PPD text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = Parser::default();
        let mut saw_header = false;

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;

            if parser.in_quoted_value {
                if line.contains('"') {
                    parser.in_quoted_value = false;
                }
                continue;
            }

            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with("*%") || !line.starts_with('*') {
                continue;
            }

            if !saw_header {
                if !line.starts_with("*PPD-Adobe:") {
                    return Err(PlugwerkError::Ppd {
                        line: line_no,
                        detail: "missing *PPD-Adobe header".into(),
                    });
                }
                saw_header = true;
                continue;
            }

            parser.line(line, line_no)?;
        }

        if !saw_header {
            return Err(PlugwerkError::Ppd {
                line: 0,
                detail: "empty file".into(),
            });
        }

        Ok(parser.finish())
    }

    /// Mark each option's default choice, mirroring what the spooler
    /// considers currently selected.
    pub fn mark_defaults(&mut self) {
        for option in self.groups.iter_mut().flat_map(|g| g.options.iter_mut()) {
            let default = option.default_choice.clone();
            for choice in &mut option.choices {
                choice.marked = default.as_deref() == Some(choice.choice.as_str());
            }
        }
    }

    /// First option with `keyword`, searching groups in file order.
    pub fn find_option(&self, keyword: &str) -> Option<&PpdOption> {
        self.groups
            .iter()
            .flat_map(|g| g.options.iter())
            .find(|o| o.keyword == keyword)
    }
}

impl PpdOption {
    /// First unmarked choice whose keyword starts with `prefix`, compared
    /// ASCII case-insensitively.
    pub fn first_unmarked_with_prefix(&self, prefix: &str) -> Option<&PpdChoice> {
        self.choices.iter().find(|c| {
            !c.marked
                && c.choice
                    .get(..prefix.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
    }
}

// ---------------------------------------------------------------------------
// Line parser
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Parser {
    groups: Vec<PpdGroup>,
    filters: Vec<PpdFilter>,
    defaults: Vec<(String, String)>,
    open_group: Option<usize>,
    open_option: Option<(usize, usize)>,
    in_quoted_value: bool,
}

impl Parser {
    fn line(&mut self, line: &str, line_no: usize) -> Result<()> {
        // "*Main option/Translation: value"
        let (head, value) = match line.split_once(':') {
            Some((head, value)) => (head, value.trim()),
            None => (line, ""),
        };
        self.track_quotes(value);

        let head = &head[1..];
        let (main, option) = match head.split_once(char::is_whitespace) {
            Some((main, option)) => (main, option.trim()),
            None => (head, ""),
        };

        match main {
            "OpenGroup" => {
                let (name, text) = split_translation(value);
                self.open_group = Some(self.group_index(name, text));
            }
            "CloseGroup" => self.open_group = None,
            "OpenUI" | "JCLOpenUI" => {
                let (keyword, text) = split_translation(option);
                let keyword = keyword.trim_start_matches('*');
                if keyword.is_empty() {
                    return Err(PlugwerkError::Ppd {
                        line: line_no,
                        detail: "OpenUI without keyword".into(),
                    });
                }
                let group = match self.open_group {
                    Some(g) => g,
                    None => self.group_index(GENERAL_GROUP, GENERAL_GROUP),
                };
                self.groups[group].options.push(PpdOption {
                    keyword: keyword.to_string(),
                    text: text.to_string(),
                    default_choice: None,
                    choices: Vec::new(),
                });
                self.open_option = Some((group, self.groups[group].options.len() - 1));
            }
            "CloseUI" | "JCLCloseUI" => self.open_option = None,
            "cupsFilter" | "cupsPreFilter" => {
                // "source/type cost program"
                let fields: Vec<&str> = unquote(value).split_whitespace().collect();
                if let [source, _cost, program, ..] = fields.as_slice() {
                    self.push_filter(source, program);
                }
            }
            "cupsFilter2" => {
                // "source/type dest/type cost program"
                let fields: Vec<&str> = unquote(value).split_whitespace().collect();
                if let [source, _dest, _cost, program, ..] = fields.as_slice() {
                    self.push_filter(source, program);
                }
            }
            _ if main.starts_with("Default") && option.is_empty() => {
                let keyword = &main["Default".len()..];
                self.defaults
                    .push((keyword.to_string(), unquote(value).to_string()));
            }
            _ => {
                if let Some((g, o)) = self.open_option {
                    let current = &mut self.groups[g].options[o];
                    if current.keyword == main && !option.is_empty() {
                        let (choice, text) = split_translation(option);
                        current.choices.push(PpdChoice {
                            choice: choice.to_string(),
                            text: text.to_string(),
                            marked: false,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// A value that opens a quote without closing it continues on the
    /// following lines.
    fn track_quotes(&mut self, value: &str) {
        if value.starts_with('"') && value.matches('"').count() % 2 == 1 {
            self.in_quoted_value = true;
        }
    }

    fn group_index(&mut self, name: &str, text: &str) -> usize {
        if let Some(i) = self.groups.iter().position(|g| g.name == name) {
            return i;
        }
        self.groups.push(PpdGroup {
            name: name.to_string(),
            text: text.to_string(),
            options: Vec::new(),
        });
        self.groups.len() - 1
    }

    fn push_filter(&mut self, source: &str, program: &str) {
        self.filters.push(PpdFilter {
            source_type: source.to_string(),
            program: program.to_string(),
        });
    }

    fn finish(mut self) -> PpdFile {
        for (keyword, value) in self.defaults {
            if let Some(option) = self
                .groups
                .iter_mut()
                .flat_map(|g| g.options.iter_mut())
                .find(|o| o.keyword == keyword)
            {
                option.default_choice = Some(value);
            }
        }
        PpdFile {
            groups: self.groups,
            filters: self.filters,
        }
    }
}

/// `"name/Translation"` → (`name`, `Translation`); the text defaults to the
/// name.
fn split_translation(value: &str) -> (&str, &str) {
    let value = value.trim();
    match value.split_once('/') {
        Some((name, text)) => (name.trim(), text.trim()),
        None => (value, value),
    }
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"')
}

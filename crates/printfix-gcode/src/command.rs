//! G-Code command record and canonical rendering

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal places kept when rendering parameter values
const RENDER_PRECISION: i32 = 5;

/// What a source line turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// A G, M or T command with parameters
    Command,
    /// Empty or comment-only line
    Blank,
    /// Host directive (`@...`) meant for the print server, not the printer
    HostDirective,
    /// Line that could not be tokenized; forwarded untouched
    Unparsed,
}

/// A single parameter word such as `X10.5`
///
/// Words without a value (`G28 X`) carry `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub letter: char,
    pub value: Option<f64>,
}

/// One instruction of the stream
///
/// Commands keep the text they were parsed from. Until a pass changes one,
/// it renders back exactly as received; after a change it renders in
/// canonical form (`G1 X10 Y5.25 E0.3 F1200`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcodeCommand {
    kind: CommandKind,
    letter: char,
    number: u32,
    parameters: Vec<Word>,
    /// Line number (`N` word) if present
    pub line_number: Option<u32>,
    /// Checksum (`*nn`) if present
    pub checksum: Option<u8>,
    /// Comment text without the leading `;`
    pub comment: Option<String>,
    raw: String,
    modified: bool,
}

impl GcodeCommand {
    /// Create a new command such as `G1` or `M104`
    pub fn new(letter: char, number: u32) -> Self {
        Self {
            kind: CommandKind::Command,
            letter: letter.to_ascii_uppercase(),
            number,
            parameters: Vec::new(),
            line_number: None,
            checksum: None,
            comment: None,
            raw: String::new(),
            modified: true,
        }
    }

    /// Create a command with the given parameter set, builder style
    pub fn with(mut self, letter: char, value: f64) -> Self {
        self.set(letter, value);
        self
    }

    /// Wrap a line that could not be tokenized
    pub fn unparsed(line: impl Into<String>) -> Self {
        Self::passthrough(CommandKind::Unparsed, line.into())
    }

    /// Wrap a host directive line
    pub fn host_directive(line: impl Into<String>) -> Self {
        Self::passthrough(CommandKind::HostDirective, line.into())
    }

    /// Empty or comment-only line
    pub fn blank(line: impl Into<String>, comment: Option<String>) -> Self {
        let mut command = Self::passthrough(CommandKind::Blank, line.into());
        command.comment = comment;
        command
    }

    fn passthrough(kind: CommandKind, raw: String) -> Self {
        Self {
            kind,
            letter: ' ',
            number: 0,
            parameters: Vec::new(),
            line_number: None,
            checksum: None,
            comment: None,
            raw,
            modified: false,
        }
    }

    /// Build a parsed command; used by the tokenizer
    pub(crate) fn parsed(letter: char, number: u32, parameters: Vec<Word>, raw: String) -> Self {
        Self {
            kind: CommandKind::Command,
            letter,
            number,
            parameters,
            line_number: None,
            checksum: None,
            comment: None,
            raw,
            modified: false,
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Command letter (`G`, `M`, `T`)
    pub fn letter(&self) -> Option<char> {
        self.is_command().then_some(self.letter)
    }

    /// Command number
    pub fn number(&self) -> Option<u32> {
        self.is_command().then_some(self.number)
    }

    /// Command code such as `G1`
    pub fn code(&self) -> Option<String> {
        self.is_command()
            .then(|| format!("{}{}", self.letter, self.number))
    }

    pub fn is_command(&self) -> bool {
        self.kind == CommandKind::Command
    }

    pub fn is_blank(&self) -> bool {
        self.kind == CommandKind::Blank
    }

    pub fn is_host_directive(&self) -> bool {
        self.kind == CommandKind::HostDirective
    }

    pub fn is_unparsed(&self) -> bool {
        self.kind == CommandKind::Unparsed
    }

    /// Check for a specific G command
    pub fn is_g(&self, number: u32) -> bool {
        self.is_command() && self.letter == 'G' && self.number == number
    }

    /// Check for a specific M command
    pub fn is_m(&self, number: u32) -> bool {
        self.is_command() && self.letter == 'M' && self.number == number
    }

    /// Linear move (G0 or G1)
    pub fn is_motion(&self) -> bool {
        self.is_g(0) || self.is_g(1)
    }

    /// Arc move (G2 or G3)
    pub fn is_arc(&self) -> bool {
        self.is_g(2) || self.is_g(3)
    }

    /// All parameter words in source order
    pub fn parameters(&self) -> &[Word] {
        &self.parameters
    }

    /// Value of a parameter, if present with a value
    pub fn get(&self, letter: char) -> Option<f64> {
        let letter = letter.to_ascii_uppercase();
        self.parameters
            .iter()
            .find(|word| word.letter == letter)
            .and_then(|word| word.value)
    }

    /// Check if a parameter word is present, with or without a value
    pub fn has(&self, letter: char) -> bool {
        let letter = letter.to_ascii_uppercase();
        self.parameters.iter().any(|word| word.letter == letter)
    }

    /// Set a parameter, replacing an existing word in place or appending
    pub fn set(&mut self, letter: char, value: f64) {
        let letter = letter.to_ascii_uppercase();
        match self.parameters.iter_mut().find(|word| word.letter == letter) {
            Some(word) => word.value = Some(value),
            None => self.parameters.push(Word {
                letter,
                value: Some(value),
            }),
        }
        self.modified = true;
    }

    /// Remove every word with this letter, returning if any was removed
    pub fn remove(&mut self, letter: char) -> bool {
        let letter = letter.to_ascii_uppercase();
        let before = self.parameters.len();
        self.parameters.retain(|word| word.letter != letter);
        let removed = self.parameters.len() != before;
        if removed {
            self.modified = true;
        }
        removed
    }

    /// Check if any of X, Y, Z or E is present
    pub fn has_axis_words(&self) -> bool {
        ['X', 'Y', 'Z', 'E'].iter().any(|axis| self.has(*axis))
    }

    pub fn x(&self) -> Option<f64> {
        self.get('X')
    }

    pub fn y(&self) -> Option<f64> {
        self.get('Y')
    }

    pub fn z(&self) -> Option<f64> {
        self.get('Z')
    }

    pub fn e(&self) -> Option<f64> {
        self.get('E')
    }

    pub fn f(&self) -> Option<f64> {
        self.get('F')
    }

    pub fn s(&self) -> Option<f64> {
        self.get('S')
    }

    pub fn p(&self) -> Option<f64> {
        self.get('P')
    }

    /// Source text this command was parsed from (empty for generated commands)
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Check if a pass has changed this command
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Drop line number, checksum and comment; returns if anything was dropped
    pub fn strip_metadata(&mut self) -> bool {
        let stripped =
            self.line_number.is_some() || self.checksum.is_some() || self.comment.is_some();
        self.line_number = None;
        self.checksum = None;
        self.comment = None;
        if stripped {
            self.modified = true;
        }
        stripped
    }

    /// Render in canonical form regardless of the modified flag
    pub fn to_canonical(&self) -> String {
        match self.kind {
            CommandKind::HostDirective | CommandKind::Unparsed => return self.raw.clone(),
            CommandKind::Blank => {
                return self
                    .comment
                    .as_ref()
                    .map(|comment| format!(";{}", comment))
                    .unwrap_or_default();
            }
            CommandKind::Command => {}
        }

        let mut line = String::new();
        if let Some(number) = self.line_number {
            line.push_str(&format!("N{} ", number));
        }
        line.push_str(&format!("{}{}", self.letter, self.number));
        for word in &self.parameters {
            line.push(' ');
            line.push(word.letter);
            if let Some(value) = word.value {
                line.push_str(&format_number(value));
            }
        }
        if self.checksum.is_some() {
            let checksum = compute_checksum(&line);
            line.push_str(&format!("*{}", checksum));
        }
        if let Some(comment) = &self.comment {
            line.push_str(&format!(" ;{}", comment));
        }
        line
    }
}

impl fmt::Display for GcodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modified {
            write!(f, "{}", self.to_canonical())
        } else {
            write!(f, "{}", self.raw)
        }
    }
}

/// Render a number with at most five decimals and no trailing zeros
pub fn format_number(value: f64) -> String {
    let scale = 10f64.powi(RENDER_PRECISION);
    let rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let text = format!("{:.*}", RENDER_PRECISION as usize, rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// XOR checksum of every byte, as used by the `*nn` suffix
pub fn compute_checksum(text: &str) -> u8 {
    text.bytes().fold(0, |acc, byte| acc ^ byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(5.25), "5.25");
        assert_eq!(format_number(-0.000001), "0");
        assert_eq!(format_number(0.123456789), "0.12346");
        assert_eq!(format_number(-12.5), "-12.5");
    }

    #[test]
    fn test_builder_renders_canonically() {
        let command = GcodeCommand::new('g', 1)
            .with('X', 10.0)
            .with('y', 5.25)
            .with('E', 0.3)
            .with('F', 1200.0);
        assert_eq!(command.to_string(), "G1 X10 Y5.25 E0.3 F1200");
        assert!(command.is_motion());
        assert_eq!(command.code().as_deref(), Some("G1"));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut command = GcodeCommand::new('G', 0).with('X', 1.0).with('Y', 2.0);
        command.set('X', 3.0);
        assert_eq!(command.to_string(), "G0 X3 Y2");
        assert!(command.remove('x'));
        assert!(!command.remove('Z'));
        assert_eq!(command.to_string(), "G0 Y2");
    }

    #[test]
    fn test_passthrough_kinds_render_raw() {
        let unparsed = GcodeCommand::unparsed("G1 X?? garbage");
        assert!(unparsed.is_unparsed());
        assert_eq!(unparsed.to_string(), "G1 X?? garbage");
        assert_eq!(unparsed.code(), None);
        assert!(!unparsed.is_motion());

        let directive = GcodeCommand::host_directive("@pause");
        assert!(directive.is_host_directive());
        assert_eq!(directive.to_canonical(), "@pause");
    }

    #[test]
    fn test_checksum_recomputed() {
        let mut command = GcodeCommand::new('G', 1).with('X', 5.0);
        command.line_number = Some(3);
        command.checksum = Some(0);
        let expected = compute_checksum("N3 G1 X5");
        assert_eq!(command.to_string(), format!("N3 G1 X5*{}", expected));
    }

    #[test]
    fn test_strip_metadata() {
        let mut command = GcodeCommand::new('M', 104).with('S', 200.0);
        command.comment = Some("heat".to_string());
        assert_eq!(command.to_string(), "M104 S200 ;heat");
        assert!(command.strip_metadata());
        assert_eq!(command.to_string(), "M104 S200");
        assert!(!command.strip_metadata());
    }
}

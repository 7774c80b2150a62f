//! G-Code tokenizer and motion state tracking
//!
//! `GcodeParser` turns one source line into a [`GcodeCommand`]. `MotionState`
//! follows positioning modes and the head position through a stream, and
//! `LayerTracker` counts printed layers on top of it. Each pass that needs
//! position context owns its own trackers, since passes see different
//! streams (earlier passes may insert or drop commands).

use printfix_core::{GcodeError, Point3};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::command::{GcodeCommand, Word};

/// Heights closer than this belong to the same layer
const LAYER_EPSILON: f64 = 1e-6;

/// G-Code line tokenizer
#[derive(Debug, Clone, Copy, Default)]
pub struct GcodeParser;

impl GcodeParser {
    /// Create a new G-Code parser
    pub fn new() -> Self {
        Self
    }

    /// Parse one line into a command
    ///
    /// Blank lines, comment-only lines and host directives parse
    /// successfully. Lines whose words cannot be tokenized return
    /// [`GcodeError::InvalidSyntax`].
    pub fn parse_line(&self, line: &str) -> Result<GcodeCommand, GcodeError> {
        let raw = line.trim_end_matches(['\r', '\n']).to_string();
        let trimmed = raw.trim();

        if trimmed.starts_with('@') {
            return Ok(GcodeCommand::host_directive(raw));
        }

        let (code, comment) = split_comment(trimmed);
        let (code, checksum) = split_checksum(code).map_err(|reason| invalid(&raw, reason))?;

        if code.trim().is_empty() {
            return Ok(GcodeCommand::blank(raw, comment));
        }

        let words = tokenize(code).map_err(|reason| invalid(&raw, reason))?;

        let mut line_number = None;
        let mut command: Option<(char, u32)> = None;
        let mut parameters = Vec::new();

        for (index, word) in words.into_iter().enumerate() {
            match word.letter {
                'N' if index == 0 => {
                    line_number = Some(integer_value(&word).ok_or_else(|| {
                        invalid(&raw, "line number must be a non-negative integer")
                    })?);
                }
                'G' | 'M' | 'T' if command.is_none() => {
                    let number = integer_value(&word).ok_or_else(|| {
                        invalid(&raw, "command number must be a non-negative integer")
                    })?;
                    command = Some((word.letter, number));
                }
                'G' | 'M' if command.is_some() => {
                    return Err(invalid(&raw, "more than one command on a line"));
                }
                _ if command.is_none() => {
                    return Err(invalid(&raw, "missing command word"));
                }
                _ => parameters.push(word),
            }
        }

        let (letter, number) = command.ok_or_else(|| invalid(&raw, "missing command word"))?;

        let mut parsed = GcodeCommand::parsed(letter, number, parameters, raw);
        parsed.line_number = line_number;
        parsed.checksum = checksum;
        parsed.comment = comment;
        Ok(parsed)
    }

    /// Parse a line, falling back to an unparsed passthrough command
    pub fn parse_lossy(&self, line: &str) -> GcodeCommand {
        match self.parse_line(line) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("Forwarding unparsable line unmodified: {}", e);
                GcodeCommand::unparsed(line.trim_end_matches(['\r', '\n']))
            }
        }
    }
}

fn invalid(line: &str, reason: &str) -> GcodeError {
    GcodeError::InvalidSyntax {
        line: line.to_string(),
        reason: reason.to_string(),
    }
}

/// Split off a `;` comment and any parenthesized comments
fn split_comment(line: &str) -> (&str, Option<String>) {
    static PAREN_COMMENT: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let paren = PAREN_COMMENT.get_or_init(|| Regex::new(r"\([^)]*\)").expect("invalid regex pattern"));

    let (code, semicolon) = match line.find(';') {
        Some(pos) => (&line[..pos], Some(line[pos + 1..].trim().to_string())),
        None => (line, None),
    };

    if !paren.is_match(code) {
        return (code, semicolon);
    }

    // Parenthesized comments inside the code part are folded into the comment
    let inline: Vec<&str> = paren
        .find_iter(code)
        .map(|m| m.as_str().trim_matches(|c| c == '(' || c == ')').trim())
        .collect();
    let mut comment = inline.join(" ");
    if let Some(text) = semicolon {
        if !comment.is_empty() {
            comment.push(' ');
        }
        comment.push_str(&text);
    }

    let start = paren.find(code).map(|m| m.start()).unwrap_or(code.len());
    let end = paren.find_iter(code).last().map(|m| m.end()).unwrap_or(0);
    // Only leading or trailing parenthesized comments are supported
    if code[end..].trim().is_empty() {
        (&code[..start], Some(comment))
    } else if code[..start].trim().is_empty() {
        (&code[end..], Some(comment))
    } else {
        (code, Some(comment))
    }
}

fn split_checksum(code: &str) -> Result<(&str, Option<u8>), &'static str> {
    match code.find('*') {
        Some(pos) => {
            let checksum = code[pos + 1..]
                .trim()
                .parse::<u8>()
                .map_err(|_| "checksum must be an integer between 0 and 255")?;
            Ok((&code[..pos], Some(checksum)))
        }
        None => Ok((code, None)),
    }
}

fn tokenize(code: &str) -> Result<Vec<Word>, &'static str> {
    static WORD_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let regex = WORD_REGEX.get_or_init(|| {
        Regex::new(r"([A-Za-z])\s*([-+]?(?:\d+\.?\d*|\.\d+))?").expect("invalid regex pattern")
    });

    let mut words = Vec::new();
    let mut last_end = 0;

    for captures in regex.captures_iter(code) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        if !code[last_end..whole.start()].trim().is_empty() {
            return Err("unexpected characters between words");
        }

        let value = match captures.get(2) {
            Some(number) => Some(
                number
                    .as_str()
                    .parse::<f64>()
                    .map_err(|_| "parameter value is not a number")?,
            ),
            None => {
                // A bare letter must stand alone (`G28 X Y`), not start a word like `Hello`
                let next = code[whole.end()..].chars().next();
                if next.is_some_and(|c| !c.is_whitespace()) {
                    return Err("parameter letter without a value");
                }
                None
            }
        };

        let letter = captures
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .map(|c| c.to_ascii_uppercase())
            .ok_or("missing parameter letter")?;

        words.push(Word { letter, value });
        last_end = whole.end();
    }

    if !code[last_end..].trim().is_empty() {
        return Err("unexpected trailing characters");
    }

    Ok(words)
}

fn integer_value(word: &Word) -> Option<u32> {
    let value = word.value?;
    (value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64).then_some(value as u32)
}

/// Head and extruder position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub e: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64, e: f64) -> Self {
        Self { x, y, z, e }
    }

    /// Geometric point (extruder axis dropped)
    pub fn point(&self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }

    /// Linear interpolation toward `other`
    pub fn lerp(&self, other: &Position, t: f64) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
            e: self.e + (other.e - self.e) * t,
        }
    }
}

/// Positioning modes and position, updated command by command
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionState {
    /// G91 relative positioning
    pub relative: bool,
    /// M83 relative extrusion
    pub relative_extrusion: bool,
    pub position: Position,
    /// Last commanded feed rate
    pub feed_rate: Option<f64>,
}

impl MotionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position a G0/G1 would end at, without applying it
    pub fn target(&self, command: &GcodeCommand) -> Position {
        let current = self.position;
        let axis = |value: Option<f64>, base: f64, relative: bool| match value {
            Some(v) if relative => base + v,
            Some(v) => v,
            None => base,
        };
        Position {
            x: axis(command.x(), current.x, self.relative),
            y: axis(command.y(), current.y, self.relative),
            z: axis(command.z(), current.z, self.relative),
            e: axis(command.e(), current.e, self.relative_extrusion),
        }
    }

    /// Apply a command and return the position before and after it
    pub fn apply(&mut self, command: &GcodeCommand) -> (Position, Position) {
        let before = self.position;

        if !command.is_command() {
            return (before, before);
        }

        match (command.letter(), command.number()) {
            (Some('G'), Some(0 | 1)) => {
                self.position = self.target(command);
                if let Some(feed_rate) = command.f() {
                    self.feed_rate = Some(feed_rate);
                }
            }
            (Some('G'), Some(28)) => {
                let all = !['X', 'Y', 'Z'].iter().any(|axis| command.has(*axis));
                if all || command.has('X') {
                    self.position.x = 0.0;
                }
                if all || command.has('Y') {
                    self.position.y = 0.0;
                }
                if all || command.has('Z') {
                    self.position.z = 0.0;
                }
            }
            (Some('G'), Some(90)) => {
                self.relative = false;
                self.relative_extrusion = false;
            }
            (Some('G'), Some(91)) => {
                self.relative = true;
                self.relative_extrusion = true;
            }
            (Some('G'), Some(92)) => {
                if let Some(x) = command.x() {
                    self.position.x = x;
                }
                if let Some(y) = command.y() {
                    self.position.y = y;
                }
                if let Some(z) = command.z() {
                    self.position.z = z;
                }
                if let Some(e) = command.e() {
                    self.position.e = e;
                }
            }
            (Some('M'), Some(82)) => self.relative_extrusion = false,
            (Some('M'), Some(83)) => self.relative_extrusion = true,
            _ => {}
        }

        (before, self.position)
    }
}

/// Counts printed layers from extruding moves
///
/// A new layer starts when material is extruded while travelling in X/Y at
/// a height above the current layer. Layer 0 is everything before the first
/// printed move.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerTracker {
    layer: u32,
    layer_z: Option<f64>,
}

impl LayerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a move; returns the new layer number when one starts
    pub fn observe(&mut self, before: &Position, after: &Position) -> Option<u32> {
        if !is_printing_move(before, after) {
            return None;
        }

        let higher = self
            .layer_z
            .is_none_or(|layer_z| after.z > layer_z + LAYER_EPSILON);
        if higher {
            self.layer += 1;
            self.layer_z = Some(after.z);
            return Some(self.layer);
        }
        None
    }

    pub fn layer(&self) -> u32 {
        self.layer
    }

    /// True until the second layer starts
    pub fn is_first_layer(&self) -> bool {
        self.layer <= 1
    }
}

/// Check if a move extrudes while travelling in X/Y
pub fn is_printing_move(before: &Position, after: &Position) -> bool {
    let travels = (after.x - before.x).abs() > f64::EPSILON || (after.y - before.y).abs() > f64::EPSILON;
    travels && after.e > before.e
}

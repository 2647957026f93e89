//! Text parser for REB sequencer files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;

use super::error::SequenceError;
use super::program::{Interval, SequenceProgram, DEFAULT_TICK_PERIOD_NS, MAX_CYCLE_TICKS};

/// Function used when the caller does not name one.
pub const DEFAULT_FUNCTION: &str = "ReadPixel";

/// Constant that sets the tick period.
const CLOCK_PERIOD_CONSTANT: &str = "clockperiod";

/// Maximum depth of constant-to-constant references.
const MAX_CONSTANT_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Constants,
    Clocks,
    Functions,
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
struct SliceDef {
    line: usize,
    duration: String,
    levels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
struct FunctionDef {
    line: usize,
    name: String,
    clocks: Vec<String>,
    slices: Vec<SliceDef>,
    constants: Vec<(String, u8)>,
}

/// A duration before conversion to ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Duration {
    Nanoseconds(f64),
    Ticks(f64),
}

/// Every definition of a sequencer file, before a readout function is selected.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceFile {
    path: PathBuf,
    constants: BTreeMap<String, (usize, String)>,
    clocks: Vec<(String, u32)>,
    functions: Vec<FunctionDef>,
    tick_period_ns: f64,
}

impl SequenceFile {
    /// Parse sequencer text. `path` is used for error messages only.
    pub fn parse_str(content: &str, path: &Path) -> Result<Self, SequenceError> {
        let malformed = |line: usize, reason: String| SequenceError::Malformed {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let mut section = Section::Preamble;
        let mut constants: BTreeMap<String, (usize, String)> = BTreeMap::new();
        let mut clocks: Vec<(String, u32)> = Vec::new();
        let mut functions: Vec<FunctionDef> = Vec::new();
        let mut in_slices = false;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            if let Some(name) = line.strip_prefix('[') {
                let name = name
                    .strip_suffix(']')
                    .ok_or_else(|| malformed(line_no, format!("unterminated section header '{}'", line)))?;
                section = match name.trim().to_ascii_lowercase().as_str() {
                    "constants" => Section::Constants,
                    "clocks" => Section::Clocks,
                    "functions" => Section::Functions,
                    "pointers" | "subroutines" | "mains" => Section::Ignored,
                    other => return Err(malformed(line_no, format!("unknown section [{}]", other))),
                };
                in_slices = false;
                continue;
            }

            match section {
                Section::Preamble => {
                    return Err(malformed(line_no, "content before the first section".to_string()));
                }
                Section::Ignored => {}
                Section::Constants => {
                    let (name, value) = split_assignment(line)
                        .ok_or_else(|| malformed(line_no, format!("expected 'name = value', got '{}'", line)))?;
                    if constants.insert(name.to_string(), (line_no, value.to_string())).is_some() {
                        return Err(malformed(line_no, format!("duplicate constant '{}'", name)));
                    }
                }
                Section::Clocks => {
                    let (name, value) = split_assignment(line)
                        .ok_or_else(|| malformed(line_no, format!("expected 'name: channel', got '{}'", line)))?;
                    let channel = value
                        .parse::<u32>()
                        .map_err(|_| malformed(line_no, format!("invalid channel '{}' for clock {}", value, name)))?;
                    if clocks.iter().any(|(n, _)| n == name) {
                        return Err(malformed(line_no, format!("duplicate clock '{}'", name)));
                    }
                    clocks.push((name.to_string(), channel));
                }
                Section::Functions => {
                    if let Some((key, rest)) = line.split_once(':') {
                        let key = key.trim();
                        let rest = rest.trim();
                        match key.to_ascii_lowercase().as_str() {
                            "clocks" => {
                                let func = current_function(&mut functions)
                                    .ok_or_else(|| malformed(line_no, "'clocks:' outside a function".to_string()))?;
                                func.clocks = split_list(rest).map(str::to_string).collect();
                                in_slices = false;
                            }
                            "slices" => {
                                current_function(&mut functions)
                                    .ok_or_else(|| malformed(line_no, "'slices:' outside a function".to_string()))?;
                                in_slices = true;
                            }
                            "constants" => {
                                let func = current_function(&mut functions).ok_or_else(|| {
                                    malformed(line_no, "'constants:' outside a function".to_string())
                                })?;
                                for item in split_list(rest) {
                                    let (clock, level) = item.split_once('=').ok_or_else(|| {
                                        malformed(line_no, format!("expected 'CLOCK=level', got '{}'", item))
                                    })?;
                                    let level = parse_level(level.trim())
                                        .ok_or_else(|| malformed(line_no, format!("invalid level '{}'", level.trim())))?;
                                    func.constants.push((clock.trim().to_string(), level));
                                }
                                in_slices = false;
                            }
                            _ if rest.is_empty() && !key.is_empty() => {
                                if functions.iter().any(|f| f.name == key) {
                                    return Err(malformed(line_no, format!("duplicate function '{}'", key)));
                                }
                                functions.push(FunctionDef {
                                    line: line_no,
                                    name: key.to_string(),
                                    clocks: Vec::new(),
                                    slices: Vec::new(),
                                    constants: Vec::new(),
                                });
                                in_slices = false;
                            }
                            _ => {
                                return Err(malformed(line_no, format!("unexpected line '{}'", line)));
                            }
                        }
                        continue;
                    }

                    if !in_slices {
                        return Err(malformed(line_no, format!("slice outside a 'slices:' block: '{}'", line)));
                    }
                    let (duration, levels) = line
                        .split_once('=')
                        .ok_or_else(|| malformed(line_no, format!("expected 'duration = levels', got '{}'", line)))?;
                    let levels = split_list(levels)
                        .map(|v| parse_level(v).ok_or_else(|| malformed(line_no, format!("invalid level '{}'", v))))
                        .collect::<Result<Vec<u8>, _>>()?;
                    if let Some(func) = current_function(&mut functions) {
                        func.slices.push(SliceDef {
                            line: line_no,
                            duration: duration.trim().to_string(),
                            levels,
                        });
                    }
                }
            }
        }

        let mut file = SequenceFile {
            path: path.to_path_buf(),
            constants,
            clocks,
            functions,
            tick_period_ns: DEFAULT_TICK_PERIOD_NS,
        };
        file.tick_period_ns = file.resolve_tick_period()?;
        Ok(file)
    }

    /// Names of the functions defined in the file.
    pub fn function_names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name.as_str()).collect()
    }

    /// Clock lines declared in the `[clocks]` section with their hardware channels.
    pub fn clock_channels(&self) -> &[(String, u32)] {
        &self.clocks
    }

    /// Tick period in nanoseconds.
    pub fn tick_period_ns(&self) -> f64 {
        self.tick_period_ns
    }

    /// Build the program for one function.
    ///
    /// With `None`, selects `ReadPixel` when present, otherwise the only
    /// function of the file.
    pub fn program(&self, function: Option<&str>) -> Result<SequenceProgram, SequenceError> {
        let func = match function {
            Some(name) => self.functions.iter().find(|f| f.name == name).ok_or_else(|| {
                self.malformed(
                    0,
                    format!(
                        "function '{}' not defined (available: {})",
                        name,
                        self.function_names().join(", ")
                    ),
                )
            })?,
            None => match self.functions.iter().find(|f| f.name == DEFAULT_FUNCTION) {
                Some(f) => f,
                None => match self.functions.as_slice() {
                    [only] => only,
                    [] => return Err(self.malformed(0, "no functions defined".to_string())),
                    _ => {
                        return Err(self.malformed(
                            0,
                            format!(
                                "several functions and no {} (available: {}); select one explicitly",
                                DEFAULT_FUNCTION,
                                self.function_names().join(", ")
                            ),
                        ))
                    }
                },
            },
        };
        self.build_program(func)
    }

    fn build_program(&self, func: &FunctionDef) -> Result<SequenceProgram, SequenceError> {
        if func.slices.is_empty() {
            return Err(self.malformed(func.line, format!("function '{}' has no slices", func.name)));
        }
        if func.clocks.is_empty() && func.constants.is_empty() {
            return Err(self.malformed(func.line, format!("function '{}' drives no clocks", func.name)));
        }
        if !self.clocks.is_empty() {
            let undeclared = func
                .clocks
                .iter()
                .chain(func.constants.iter().map(|(c, _)| c))
                .find(|c| !self.clocks.iter().any(|(n, _)| n == *c));
            if let Some(clock) = undeclared {
                return Err(self.malformed(func.line, format!("clock '{}' not declared in [clocks]", clock)));
            }
        }

        let mut clocks = func.clocks.clone();
        for (clock, _) in &func.constants {
            if !clocks.contains(clock) {
                clocks.push(clock.clone());
            }
        }

        let mut intervals = Vec::with_capacity(func.slices.len());
        let mut cycle_ticks = 0u64;
        for (idx, slice) in func.slices.iter().enumerate() {
            if slice.levels.len() != func.clocks.len() {
                return Err(self.malformed(
                    slice.line,
                    format!(
                        "expected {} levels for clocks [{}], got {}",
                        func.clocks.len(),
                        func.clocks.join(", "),
                        slice.levels.len()
                    ),
                ));
            }
            let duration = self
                .resolve_duration(&slice.duration, 0)
                .map_err(|reason| self.malformed(slice.line, reason))?;
            let duration_ticks = self
                .to_ticks(duration)
                .map_err(|reason| self.malformed(slice.line, reason))?;
            cycle_ticks = cycle_ticks
                .checked_add(duration_ticks)
                .filter(|&total| total <= MAX_CYCLE_TICKS)
                .ok_or_else(|| {
                    self.malformed(
                        slice.line,
                        format!("cycle length overflows {} ticks", MAX_CYCLE_TICKS),
                    )
                })?;

            let mut levels: BTreeMap<String, u8> = func
                .clocks
                .iter()
                .cloned()
                .zip(slice.levels.iter().copied())
                .collect();
            for (clock, level) in &func.constants {
                levels.entry(clock.clone()).or_insert(*level);
            }

            let name = if is_identifier(&slice.duration) {
                slice.duration.clone()
            } else {
                format!("{}.{}", func.name, idx)
            };
            intervals.push(Interval {
                name,
                duration_ticks,
                levels,
            });
        }

        let program = SequenceProgram {
            name: func.name.clone(),
            clocks,
            intervals,
            tick_period_ns: self.tick_period_ns,
        };
        if program.total_ticks() == 0 {
            return Err(self.malformed(func.line, format!("function '{}' has zero total duration", func.name)));
        }
        debug!(
            "Parsed sequence function {} from {}: {} intervals, {} ticks per cycle",
            program.name,
            self.path.display(),
            program.len(),
            program.total_ticks()
        );
        Ok(program)
    }

    fn resolve_tick_period(&self) -> Result<f64, SequenceError> {
        let Some((key, (line, _))) = self
            .constants
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(CLOCK_PERIOD_CONSTANT))
        else {
            return Ok(DEFAULT_TICK_PERIOD_NS);
        };
        match self.resolve_duration(key, 0) {
            Ok(Duration::Nanoseconds(ns)) if ns.is_finite() && ns > 0.0 => Ok(ns),
            Ok(_) => Err(self.malformed(*line, "clock period must be a positive time with a unit".to_string())),
            Err(reason) => Err(self.malformed(*line, reason)),
        }
    }

    fn resolve_duration(&self, expr: &str, depth: usize) -> Result<Duration, String> {
        if depth > MAX_CONSTANT_DEPTH {
            return Err(format!("constant reference chain too deep at '{}'", expr));
        }
        let expr = expr.trim();
        if let Some(duration) = parse_literal(expr)? {
            return Ok(duration);
        }
        if is_identifier(expr) {
            let (_, value) = self
                .constants
                .get(expr)
                .ok_or_else(|| format!("unknown constant '{}'", expr))?;
            return self.resolve_duration(value, depth + 1);
        }
        Err(format!("invalid duration '{}'", expr))
    }

    fn to_ticks(&self, duration: Duration) -> Result<u64, String> {
        let ticks = match duration {
            Duration::Nanoseconds(ns) => ns / self.tick_period_ns,
            Duration::Ticks(t) => t,
        };
        if !ticks.is_finite() {
            return Err("duration is not finite".to_string());
        }
        if ticks < 0.0 {
            return Err(format!("negative duration ({} ticks)", ticks));
        }
        if ticks.round() > MAX_CYCLE_TICKS as f64 {
            return Err(format!(
                "duration of {} ticks exceeds the {} tick limit",
                ticks, MAX_CYCLE_TICKS
            ));
        }
        Ok(ticks.round() as u64)
    }

    fn malformed(&self, line: usize, reason: String) -> SequenceError {
        SequenceError::Malformed {
            path: self.path.clone(),
            line,
            reason,
        }
    }
}

/// Parse the sequencer file at `path` and build the program of one function.
///
/// Fails with [`SequenceError::NotFound`] when the path does not exist and
/// [`SequenceError::Malformed`] for structural problems. Parsing has no side
/// effects beyond the read, so repeated calls yield equal programs.
pub fn parse(path: &Path, function: Option<&str>) -> Result<SequenceProgram, SequenceError> {
    parse_file(path)?.program(function)
}

/// Parse every definition of the sequencer file at `path`.
pub fn parse_file(path: &Path) -> Result<SequenceFile, SequenceError> {
    if !path.is_file() {
        return Err(SequenceError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|source| SequenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    SequenceFile::parse_str(&content, path)
}

fn current_function(functions: &mut [FunctionDef]) -> Option<&mut FunctionDef> {
    functions.last_mut()
}

/// Split `name = value` or `name: value`.
fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let pos = line.find(['=', ':'])?;
    let name = line[..pos].trim();
    let value = line[pos + 1..].trim();
    (!name.is_empty() && !value.is_empty()).then_some((name, value))
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_level(value: &str) -> Option<u8> {
    match value {
        "0" => Some(0),
        "1" => Some(1),
        _ => None,
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse `"<number> <unit>"` or a bare tick count. `Ok(None)` when not numeric.
fn parse_literal(expr: &str) -> Result<Option<Duration>, String> {
    if !expr.starts_with(|c: char| c.is_ascii_digit() || c == '.' || c == '-' || c == '+') {
        return Ok(None);
    }
    let split = expr
        .find(char::is_whitespace)
        .or_else(|| expr.find(|c: char| c.is_ascii_alphabetic()))
        .unwrap_or(expr.len());
    let (number, unit) = expr.split_at(split);
    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid number '{}' in duration '{}'", number, expr))?;
    let scale = match unit.trim() {
        "" => return Ok(Some(Duration::Ticks(value))),
        "ns" => 1.0,
        "us" => 1.0e3,
        "ms" => 1.0e6,
        "s" => 1.0e9,
        other => return Err(format!("unknown time unit '{}' in duration '{}'", other, expr)),
    };
    Ok(Some(Duration::Nanoseconds(value * scale)))
}

//! Prometheus text exposition format.
//!
//! Parses the `text/plain; version=0.0.4` format a Substrate node serves on
//! its metrics port into flat samples. `# HELP` / `# TYPE` lines and blank
//! lines are skipped; an optional trailing timestamp is ignored.

use std::collections::HashMap;

/// One scraped sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    /// Labels sorted by name.
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

impl Sample {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Canonical series key: `name{a="1",b="2"}`, or just `name`.
    pub fn key(&self) -> String {
        if self.labels.is_empty() {
            return self.name.clone();
        }
        let labels: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect();
        format!("{}{{{}}}", self.name, labels.join(","))
    }
}

/// Parse a full exposition body.
///
/// Returns the 1-based line number and a description on the first
/// malformed sample line.
pub fn parse_exposition(body: &str) -> Result<Vec<Sample>, String> {
    let mut samples = Vec::new();
    for (idx, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let sample = parse_line(line).map_err(|e| format!("line {}: {e}", idx + 1))?;
        samples.push(sample);
    }
    Ok(samples)
}

/// Flatten samples into the `key → value` map carried by a reading.
pub fn to_map(samples: &[Sample]) -> HashMap<String, f64> {
    samples.iter().map(|s| (s.key(), s.value)).collect()
}

/// First sample named `name` whose labels include every pair in `matchers`.
pub fn find<'a>(
    samples: &'a [Sample],
    name: &str,
    matchers: &[(&str, &str)],
) -> Option<&'a Sample> {
    samples.iter().find(|s| {
        s.name == name
            && matchers
                .iter()
                .all(|(k, v)| s.label(k).is_some_and(|actual| actual == *v))
    })
}

fn parse_line(line: &str) -> Result<Sample, String> {
    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .ok_or_else(|| "missing value".to_string())?;
    let name = &line[..name_end];
    if !is_valid_name(name) {
        return Err(format!("invalid metric name {name:?}"));
    }

    let mut rest = &line[name_end..];
    let mut labels = Vec::new();
    if rest.starts_with('{') {
        let (parsed, remaining) = parse_labels(&rest[1..])?;
        labels = parsed;
        rest = remaining;
    }

    let mut fields = rest.split_whitespace();
    let raw = fields.next().ok_or_else(|| "missing value".to_string())?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("invalid value {raw:?} for {name}"))?;
    // Optional millisecond timestamp.
    if let Some(ts) = fields.next() {
        ts.parse::<i64>()
            .map_err(|_| format!("invalid timestamp {ts:?} for {name}"))?;
    }
    if fields.next().is_some() {
        return Err(format!("trailing data after sample {name}"));
    }

    labels.sort();
    Ok(Sample {
        name: name.to_string(),
        labels,
        value,
    })
}

/// Parse `a="1",b="2"}` and return the labels plus the text after `}`.
fn parse_labels(input: &str) -> Result<(Vec<(String, String)>, &str), String> {
    let mut labels = Vec::new();
    let mut rest = input.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix('}') {
            return Ok((labels, after));
        }
        let eq = rest.find('=').ok_or_else(|| "unterminated label set".to_string())?;
        let key = rest[..eq].trim();
        if !is_valid_name(key) {
            return Err(format!("invalid label name {key:?}"));
        }
        rest = rest[eq + 1..].trim_start();
        let body = rest
            .strip_prefix('"')
            .ok_or_else(|| format!("label {key} value must be quoted"))?;

        let mut value = String::new();
        let mut chars = body.char_indices();
        let mut end = None;
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, other)) => value.push(other),
                    None => break,
                },
                '"' => {
                    end = Some(i);
                    break;
                }
                _ => value.push(c),
            }
        }
        let end = end.ok_or_else(|| format!("unterminated value for label {key}"))?;
        labels.push((key.to_string(), value));

        rest = body[end + 1..].trim_start();
        if let Some(after) = rest.strip_prefix(',') {
            rest = after.trim_start();
        } else if !rest.starts_with('}') {
            return Err("expected ',' or '}' in label set".to_string());
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

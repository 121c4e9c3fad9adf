//! Tool blocks embedded in model output
//!
//! A block is a fenced section whose info string is a tool tag:
//!
//! ````text
//! ```bash
//! ls -la
//! ```
//! ````
//!
//! The opening fence is three backticks, the tag (`[A-Za-z0-9_]+`), an
//! optional `:label`, then a newline. The body runs until a line holding only
//! three backticks. Body lines shaped `key=value` are the block's named
//! parameters.

use regex::Regex;
use std::sync::OnceLock;

fn block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?ms)^```([A-Za-z0-9_]+)(?::[^\n]*)?[ \t]*\n(?:(.*?)\n)?```[ \t]*$")
            .expect("block pattern is valid")
    })
}

/// One tool invocation extracted from a completion
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub tag: String,
    pub body: String,
    params: Vec<(String, String)>,
}

impl Block {
    pub fn new(tag: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        let params = parse_params(&body);
        Self {
            tag: tag.into(),
            body,
            params,
        }
    }

    /// First non-empty value for `name`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.as_str())
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Non-empty, trimmed body lines
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.body.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

fn parse_params(body: &str) -> Vec<(String, String)> {
    body.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Extract blocks whose tag is in `tags`, in order of appearance.
///
/// Fenced sections with any other tag are skipped.
pub fn extract_blocks(text: &str, tags: &[&str]) -> Vec<Block> {
    block_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let tag = caps.get(1)?.as_str();
            if !tags.contains(&tag) {
                return None;
            }
            let body = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            Some(Block::new(tag, body))
        })
        .collect()
}

/// Remove blocks with a tag in `tags`, leaving the surrounding prose
pub fn strip_blocks(text: &str, tags: &[&str]) -> String {
    let stripped = block_regex().replace_all(text, |caps: &regex::Captures| {
        let tag = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        if tags.contains(&tag) {
            String::new()
        } else {
            caps[0].to_string()
        }
    });

    let mut out = String::with_capacity(stripped.len());
    let mut blank_run = 0;
    for line in stripped.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

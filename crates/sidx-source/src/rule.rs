//! Rule-line decoding.
//!
//! A rule line is `action header... (name:value; name; ...)`. Only the parts
//! the sync needs are extracted: action, `sid`, `rev` and `msg`. Everything
//! else in the option list is accepted and ignored.

use std::fmt;

/// A decoded rule line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub action: String,
    /// 0 when the line carries no `sid` option.
    pub sid: u64,
    /// 0 when the line carries no `rev` option.
    pub rev: i32,
    pub msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleParseError {
    /// No `(` opening the option list.
    MissingOptions,
    /// Option list not closed by a final `)`.
    UnterminatedOptions,
    /// A quoted option value runs to the end of the line.
    UnterminatedQuote,
    /// Header has an action but nothing after it.
    InvalidHeader(String),
    /// A numeric option could not be parsed.
    InvalidNumber { option: &'static str, raw: String },
    /// The same numeric option appears twice.
    DuplicateOption(&'static str),
    /// An `alert` rule without a usable `sid`.
    ZeroSid,
}

impl fmt::Display for RuleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleParseError::MissingOptions => write!(f, "rule has no option list"),
            RuleParseError::UnterminatedOptions => write!(f, "option list is not closed"),
            RuleParseError::UnterminatedQuote => write!(f, "unterminated quoted option value"),
            RuleParseError::InvalidHeader(h) => write!(f, "invalid rule header '{h}'"),
            RuleParseError::InvalidNumber { option, raw } => {
                write!(f, "option '{option}' has invalid value '{raw}'")
            }
            RuleParseError::DuplicateOption(o) => write!(f, "option '{o}' given more than once"),
            RuleParseError::ZeroSid => write!(f, "rule has no sid or sid 0"),
        }
    }
}

impl std::error::Error for RuleParseError {}

/// Decode one line of a rule file.
///
/// `Ok(None)` for lines that are not ingested: blank lines, comments (which
/// include commented-out rules) and rules whose action is not `alert`.
pub fn decode_line(line: &str) -> Result<Option<Rule>, RuleParseError> {
    let t = line.trim();
    if t.is_empty() || t.starts_with('#') {
        return Ok(None);
    }

    let rule = parse_rule(t)?;
    if rule.action != "alert" {
        return Ok(None);
    }
    if rule.sid == 0 {
        return Err(RuleParseError::ZeroSid);
    }
    Ok(Some(rule))
}

/// Parse a single, non-comment rule line.
pub fn parse_rule(line: &str) -> Result<Rule, RuleParseError> {
    let open = line.find('(').ok_or(RuleParseError::MissingOptions)?;
    let header = line[..open].trim();
    let body = line[open + 1..].trim_end();
    let body = body
        .strip_suffix(')')
        .ok_or(RuleParseError::UnterminatedOptions)?;

    let mut tokens = header.split_whitespace();
    let action = tokens
        .next()
        .ok_or_else(|| RuleParseError::InvalidHeader(header.to_string()))?;
    if tokens.next().is_none() {
        return Err(RuleParseError::InvalidHeader(header.to_string()));
    }

    let mut rule = Rule {
        action: action.to_string(),
        sid: 0,
        rev: 0,
        msg: None,
    };
    let mut seen_sid = false;
    let mut seen_rev = false;

    for (name, value) in split_options(body)? {
        match name.as_str() {
            "sid" => {
                if seen_sid {
                    return Err(RuleParseError::DuplicateOption("sid"));
                }
                seen_sid = true;
                rule.sid = parse_number("sid", value.as_deref())?;
            }
            "rev" => {
                if seen_rev {
                    return Err(RuleParseError::DuplicateOption("rev"));
                }
                seen_rev = true;
                rule.rev = parse_number("rev", value.as_deref())?;
                if rule.rev < 0 {
                    return Err(RuleParseError::InvalidNumber {
                        option: "rev",
                        raw: rule.rev.to_string(),
                    });
                }
            }
            "msg" => rule.msg = value.map(|v| unquote(&v)),
            _ => {}
        }
    }

    Ok(rule)
}

fn parse_number<T: std::str::FromStr>(
    option: &'static str,
    value: Option<&str>,
) -> Result<T, RuleParseError> {
    let raw = value.unwrap_or("").trim();
    raw.parse::<T>().map_err(|_| RuleParseError::InvalidNumber {
        option,
        raw: raw.to_string(),
    })
}

/// Split `name:value; name; ...` honouring quotes and backslash escapes.
fn split_options(body: &str) -> Result<Vec<(String, Option<String>)>, RuleParseError> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in body.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                current.push(c);
                in_quotes = !in_quotes;
            }
            ';' if !in_quotes => {
                push_option(&mut out, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err(RuleParseError::UnterminatedQuote);
    }
    push_option(&mut out, &current);
    Ok(out)
}

fn push_option(out: &mut Vec<(String, Option<String>)>, raw: &str) {
    let raw = raw.trim();
    if raw.is_empty() {
        return;
    }
    match raw.split_once(':') {
        Some((name, value)) => out.push((name.trim().to_string(), Some(value.trim().to_string()))),
        None => out.push((raw.to_string(), None)),
    }
}

fn unquote(v: &str) -> String {
    let inner = v
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(v);

    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    out
}

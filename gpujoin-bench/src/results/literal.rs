//! Literal sequences: one bracketed list per line, e.g.
//! `['208K', '416K']`, `[0.0123, 0.0456]`, `[212992, 425984]`.
//!
//! Only integers, floats, and quoted strings are accepted; anything else is
//! rejected rather than evaluated.

use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Literal {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(i) => Some(*i as f64),
            Literal::Float(f) => Some(*f),
            Literal::Str(_) => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Literal::Int(i) => u64::try_from(*i).ok(),
            Literal::Float(f) if f.fract() == 0.0 && *f >= 0.0 => Some(*f as u64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn err(&self, msg: &str) -> String {
        format!("{} at column {}", msg, self.pos + 1)
    }

    fn string(&mut self, quote: char) -> Result<String, String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err(self.err("unterminated string")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<Literal, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_'))
        {
            self.bump();
        }
        let tok = &self.src[start..self.pos];
        if tok.is_empty() {
            return Err(self.err("expected a literal"));
        }
        let is_float = tok.contains(['.', 'e', 'E']) || tok.ends_with("inf") || tok.ends_with("nan");
        if is_float {
            tok.parse::<f64>()
                .map(Literal::Float)
                .map_err(|_| format!("bad float '{}'", tok))
        } else {
            tok.replace('_', "")
                .parse::<i64>()
                .map(Literal::Int)
                .map_err(|_| format!("bad integer '{}'", tok))
        }
    }
}

/// Parse one `[...]` or `(...)` sequence. Trailing commas are allowed.
pub fn parse_sequence(line: &str) -> Result<Vec<Literal>, String> {
    let mut cur = Cursor { src: line, pos: 0 };
    cur.skip_ws();
    let close = match cur.bump() {
        Some('[') => ']',
        Some('(') => ')',
        _ => return Err(cur.err("expected '[' or '('")),
    };

    let mut items = Vec::new();
    loop {
        cur.skip_ws();
        match cur.peek() {
            Some(c) if c == close => {
                cur.bump();
                break;
            }
            None => return Err(cur.err("unterminated sequence")),
            Some(q @ ('\'' | '"')) => {
                cur.bump();
                items.push(Literal::Str(cur.string(q)?));
            }
            Some(_) => items.push(cur.number()?),
        }
        cur.skip_ws();
        match cur.peek() {
            Some(',') => {
                cur.bump();
            }
            Some(c) if c == close => {}
            _ => return Err(cur.err("expected ',' or end of sequence")),
        }
    }

    cur.skip_ws();
    if cur.pos != line.len() {
        return Err(cur.err("trailing characters"));
    }
    Ok(items)
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn join<T>(items: &[T], mut f: impl FnMut(&mut String, &T)) -> String {
    let mut out = String::from("[");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        f(&mut out, item);
    }
    out.push(']');
    out
}

pub fn format_strings<S: AsRef<str>>(items: &[S]) -> String {
    join(items, |out, s| out.push_str(&quote(s.as_ref())))
}

/// Floats always carry a decimal point or exponent so they read back as floats.
pub fn format_floats(items: &[f64]) -> String {
    join(items, |out, v| {
        let _ = write!(out, "{:?}", v);
    })
}

pub fn format_ints(items: &[u64]) -> String {
    join(items, |out, v| {
        let _ = write!(out, "{}", v);
    })
}

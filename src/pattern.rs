//! Structural scanning of compiled schema patterns
//!
//! The diagnostic engine cuts a compiled pattern into prefixes that are still
//! valid regexes. This module walks the pattern source with a small state
//! machine (`Normal`, `InClass`, `Escaped`) so that parentheses inside
//! character classes or behind a backslash are never taken for group
//! delimiters.
//!
//! Offsets are byte offsets into the pattern string.

/// Source span of a named capture group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpan {
    pub name: String,
    /// Offset of the opening `(`
    pub start: usize,
    /// Offset just past the closing `)`
    pub end: usize,
    /// Number of enclosing groups
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InClass,
    Escaped { in_class: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Open(Option<String>),
    Close,
    Other,
}

#[derive(Debug)]
struct Step {
    offset: usize,
    end: usize,
    event: Event,
}

struct Scanner<'a> {
    pattern: &'a str,
    pos: usize,
    state: State,
}

impl<'a> Scanner<'a> {
    fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            pos: 0,
            state: State::Normal,
        }
    }

    /// Whether the scanner sits between two complete atoms
    fn at_boundary(&self) -> bool {
        self.state == State::Normal
    }

    fn next_step(&mut self) -> Option<Step> {
        let offset = self.pos;
        let pattern = self.pattern;
        let rest = &pattern[offset..];
        let ch = rest.chars().next()?;
        self.pos += ch.len_utf8();

        let event = match self.state {
            State::Escaped { in_class } => {
                self.state = if in_class { State::InClass } else { State::Normal };
                Event::Other
            }
            State::InClass => {
                match ch {
                    '\\' => self.state = State::Escaped { in_class: true },
                    ']' => self.state = State::Normal,
                    _ => {}
                }
                Event::Other
            }
            State::Normal => match ch {
                '\\' => {
                    self.state = State::Escaped { in_class: false };
                    Event::Other
                }
                '[' => {
                    self.state = State::InClass;
                    Event::Other
                }
                '(' => Event::Open(self.group_name(offset, rest)),
                ')' => Event::Close,
                _ => Event::Other,
            },
        };

        Some(Step {
            offset,
            end: self.pos,
            event,
        })
    }

    /// Consume a `(?P<name>` / `(?<name>` header and return the name
    fn group_name(&mut self, offset: usize, rest: &str) -> Option<String> {
        let header = if rest.starts_with("(?P<") {
            4
        } else if rest.starts_with("(?<") {
            3
        } else {
            return None;
        };
        let close = rest[header..].find('>')?;
        let name = rest[header..header + close].to_string();
        self.pos = offset + header + close + 1;
        Some(name)
    }
}

/// Spans of every named group, in pattern order
pub fn named_group_spans(pattern: &str) -> Vec<GroupSpan> {
    let mut scanner = Scanner::new(pattern);
    let mut stack: Vec<(Option<String>, usize)> = Vec::new();
    let mut spans = Vec::new();

    while let Some(step) = scanner.next_step() {
        match step.event {
            Event::Open(name) => stack.push((name, step.offset)),
            Event::Close => {
                if let Some((Some(name), start)) = stack.pop() {
                    spans.push(GroupSpan {
                        name,
                        start,
                        end: step.end,
                        depth: stack.len(),
                    });
                }
            }
            Event::Other => {}
        }
    }

    spans.sort_by_key(|span| span.start);
    spans
}

/// Longest prefix of `pattern` ending before `index` with every group closed
pub fn balanced_prefix(pattern: &str, index: usize) -> &str {
    let index = index.min(pattern.len());
    let mut scanner = Scanner::new(pattern);
    let mut depth = 0usize;
    let mut last_balanced = 0;

    while let Some(step) = scanner.next_step() {
        if step.end > index {
            break;
        }
        match step.event {
            Event::Open(_) => depth += 1,
            Event::Close => depth = depth.saturating_sub(1),
            Event::Other => {}
        }
        if depth == 0 && scanner.at_boundary() {
            last_balanced = step.end;
        }
    }

    &pattern[..last_balanced]
}

/// Prefix of `pattern` through `end`, extended until every group open at
/// `end` is closed, plus any quantifier applied to the last closed group
pub fn balanced_slice(pattern: &str, end: usize) -> &str {
    let end = end.min(pattern.len());
    let mut scanner = Scanner::new(pattern);
    let mut depth = 0usize;

    while scanner.pos < end {
        let Some(step) = scanner.next_step() else { break };
        match step.event {
            Event::Open(_) => depth += 1,
            Event::Close => depth = depth.saturating_sub(1),
            Event::Other => {}
        }
    }

    while depth > 0 {
        let Some(step) = scanner.next_step() else { break };
        match step.event {
            Event::Open(_) => depth += 1,
            Event::Close => depth -= 1,
            Event::Other => {}
        }
    }

    let mut cut = scanner.pos;
    if scanner.at_boundary() {
        cut += quantifier_len(&pattern[cut..]);
    }
    &pattern[..cut]
}

/// Length of the quantifiers (`?`, `*`, `+`, `{m,n}`, lazy `?`) at the start of `rest`
fn quantifier_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'?' | b'*' | b'+' => i += 1,
            b'{' => match rest[i..].find('}') {
                Some(close) => i += close + 1,
                None => break,
            },
            _ => break,
        }
    }
    i
}

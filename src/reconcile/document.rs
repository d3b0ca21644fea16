use std::fmt;
use std::net::IpAddr;

/// Top-level piece of a speaker config file
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Anything that isn't a top-level neighbor block, kept byte-for-byte
    Raw(String),
    Neighbor(Stanza),
}

/// A top-level `neighbor <address> { ... }` block
///
/// `text` spans from the `neighbor` keyword to the closing brace (inclusive),
/// surrounding whitespace belongs to the neighbouring raw segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stanza {
    pub(super) address: IpAddr,
    pub(super) text: String,
}

impl Stanza {
    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Simple `<name> <value>;` statements directly inside this block
    ///
    /// Nested blocks (E.g. `capability { ... }`) are skipped and quoted values
    /// are returned without their quotes.
    pub fn attributes(&self) -> Vec<(String, String)> {
        let body = match (self.text.find('{'), self.text.rfind('}')) {
            (Some(start), Some(end)) if start < end => &self.text[start + 1..end],
            _ => return vec![],
        };
        let mut attributes = vec![];
        let mut statement = String::new();
        let mut scanner = Scanner::default();
        for c in body.chars() {
            let depth = scanner.depth;
            match scanner.step(c) {
                Token::Open if depth == 0 => statement.clear(),
                Token::Close => {}
                Token::Semicolon if depth == 0 => {
                    if let Some(attribute) = split_statement(&statement) {
                        attributes.push(attribute);
                    }
                    statement.clear();
                }
                Token::Comment => {}
                _ if scanner.depth == 0 && !scanner.in_comment => statement.push(c),
                _ => {}
            }
        }
        attributes
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes()
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

fn split_statement(statement: &str) -> Option<(String, String)> {
    let statement = statement.trim();
    let (name, value) = match statement.split_once(char::is_whitespace) {
        Some((name, value)) => (name, value.trim()),
        None if !statement.is_empty() => (statement, ""),
        None => return None,
    };
    let value = ['"', '\'']
        .iter()
        .find_map(|quote| value.strip_prefix(*quote).and_then(|v| v.strip_suffix(*quote)))
        .map(|v| {
            v.replace("\\\"", "\"")
                .replace("\\'", "'")
                .replace("\\\\", "\\")
        })
        .unwrap_or_else(|| value.to_string());
    Some((name.to_string(), value))
}

#[derive(Debug, PartialEq)]
enum Token {
    Open,
    Close,
    Semicolon,
    Comment,
    Other,
}

/// Tracks brace depth while skipping braces inside quotes and `#` comments
#[derive(Debug, Default)]
struct Scanner {
    depth: usize,
    /// Opening quote character of the string being scanned
    in_quote: Option<char>,
    escaped: bool,
    in_comment: bool,
}

impl Scanner {
    fn step(&mut self, c: char) -> Token {
        if self.in_comment {
            if c == '\n' {
                self.in_comment = false;
            }
            return Token::Comment;
        }
        if let Some(quote) = self.in_quote {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == quote {
                self.in_quote = None;
            }
            return Token::Other;
        }
        match c {
            '#' => {
                self.in_comment = true;
                Token::Comment
            }
            '"' | '\'' => {
                self.in_quote = Some(c);
                Token::Other
            }
            '{' => {
                self.depth += 1;
                Token::Open
            }
            '}' => {
                self.depth = self.depth.saturating_sub(1);
                Token::Close
            }
            ';' => Token::Semicolon,
            _ => Token::Other,
        }
    }
}

/// `neighbor <ip>` and nothing else
fn neighbor_header(header: &str) -> Option<IpAddr> {
    let words: Vec<_> = header.split_whitespace().collect();
    match words.as_slice() {
        ["neighbor", address] => address.parse().ok(),
        _ => None,
    }
}

/// Speaker config as an ordered sequence of neighbor stanzas and opaque text
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    segments: Vec<Segment>,
}

impl Document {
    pub fn parse(text: &str) -> Self {
        // (start, end, address) of each top-level neighbor block
        let mut spans: Vec<(usize, usize, IpAddr)> = vec![];
        let mut scanner = Scanner::default();
        let mut statement_start: Option<usize> = None;
        let mut open: Option<(usize, IpAddr)> = None;

        for (i, c) in text.char_indices() {
            let depth = scanner.depth;
            match scanner.step(c) {
                Token::Open if depth == 0 => {
                    open = statement_start
                        .and_then(|start| neighbor_header(&text[start..i]).map(|a| (start, a)));
                }
                Token::Close if depth == 1 => {
                    if let Some((start, address)) = open.take() {
                        spans.push((start, i + c.len_utf8(), address));
                    }
                    statement_start = None;
                }
                Token::Semicolon if depth == 0 => statement_start = None,
                Token::Other if depth == 0 && statement_start.is_none() && !c.is_whitespace() => {
                    statement_start = Some(i);
                }
                _ => {}
            }
        }

        let mut segments = Vec::with_capacity(spans.len() * 2 + 1);
        let mut cursor = 0;
        for (start, end, address) in spans {
            if start > cursor {
                segments.push(Segment::Raw(text[cursor..start].to_string()));
            }
            segments.push(Segment::Neighbor(Stanza {
                address,
                text: text[start..end].to_string(),
            }));
            cursor = end;
        }
        if cursor < text.len() {
            segments.push(Segment::Raw(text[cursor..].to_string()));
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn stanzas(&self) -> impl Iterator<Item = &Stanza> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Neighbor(stanza) => Some(stanza),
            Segment::Raw(_) => None,
        })
    }

    pub fn get(&self, address: IpAddr) -> Option<&Stanza> {
        self.stanzas().find(|stanza| stanza.address == address)
    }

    fn positions(&self, address: IpAddr) -> Vec<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter_map(|(i, segment)| match segment {
                Segment::Neighbor(stanza) if stanza.address == address => Some(i),
                _ => None,
            })
            .collect()
    }

    /// Replace the stanza for `address` in place, or append it at the end
    ///
    /// Returns true if a stanza for `address` was already present.
    /// Extra stanzas with the same address are dropped.
    pub fn upsert(&mut self, address: IpAddr, text: String) -> bool {
        let positions = self.positions(address);
        match positions.split_first() {
            Some((first, duplicates)) => {
                for i in duplicates.iter().rev() {
                    self.remove_at(*i);
                }
                self.segments[*first] = Segment::Neighbor(Stanza { address, text });
                true
            }
            None => {
                self.append(Stanza { address, text });
                false
            }
        }
    }

    /// Remove every stanza for `address`, returns true if there was one
    pub fn remove(&mut self, address: IpAddr) -> bool {
        let positions = self.positions(address);
        for i in positions.iter().rev() {
            self.remove_at(*i);
        }
        !positions.is_empty()
    }

    fn append(&mut self, stanza: Stanza) {
        let current = self.to_string();
        let mut separator = String::new();
        if !current.is_empty() {
            if !current.ends_with('\n') {
                separator.push('\n');
            }
            if !current.ends_with("\n\n") {
                separator.push('\n');
            }
        }
        self.push_raw(separator);
        self.segments.push(Segment::Neighbor(stanza));
        self.push_raw("\n".to_string());
    }

    fn push_raw(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(Segment::Raw(last)) => last.push_str(&text),
            _ => self.segments.push(Segment::Raw(text)),
        }
    }

    /// Drop a stanza along with the line break that ends it, and the blank line
    /// separating it from the previous content when nothing follows it
    fn remove_at(&mut self, i: usize) {
        self.segments.remove(i);

        let mut next_blank = true;
        if let Some(Segment::Raw(next)) = self.segments.get_mut(i) {
            if let Some(rest) = next
                .strip_prefix("\r\n")
                .or_else(|| next.strip_prefix('\n'))
            {
                *next = rest.to_string();
            }
            next_blank = next.is_empty() || next.starts_with('\n') || next.starts_with("\r\n");
        } else if i < self.segments.len() {
            next_blank = false;
        }

        if i > 0 {
            if let Some(Segment::Raw(prev)) = self.segments.get_mut(i - 1) {
                // Indentation in front of the removed stanza
                let trimmed_len = prev.trim_end_matches(|c: char| c == ' ' || c == '\t').len();
                prev.truncate(trimmed_len);
                if next_blank && prev.ends_with("\n\n") {
                    prev.pop();
                }
            }
        }

        self.merge_raw();
    }

    fn merge_raw(&mut self) {
        let mut merged: Vec<Segment> = Vec::with_capacity(self.segments.len());
        for segment in self.segments.drain(..) {
            match (merged.last_mut(), segment) {
                (_, Segment::Raw(text)) if text.is_empty() => {}
                (Some(Segment::Raw(last)), Segment::Raw(text)) => last.push_str(&text),
                (_, segment) => merged.push(segment),
            }
        }
        self.segments = merged;
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Raw(text) => f.write_str(text)?,
                Segment::Neighbor(stanza) => f.write_str(&stanza.text)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"process api {
    run /usr/bin/bgpctl run;
    encoder text;
}

template {
    neighbor base {
        local-as 65001;
    }
}

neighbor 10.0.0.1 {
    description "core { router }";
    peer-as 65010;
    # closing brace in a comment }
    capability {
        route-refresh disable;
    }
}

neighbor 2001:db8::1 {
    peer-as 65020;
}
"#;

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_segments() {
        let doc = Document::parse(CONFIG);
        let stanzas: Vec<_> = doc.stanzas().map(Stanza::address).collect();
        assert_eq!(stanzas, vec![addr("10.0.0.1"), addr("2001:db8::1")]);
        assert_eq!(doc.segments().len(), 5);
        assert!(matches!(&doc.segments()[0], Segment::Raw(raw) if raw.contains("template")));
        let stanza = doc.get(addr("10.0.0.1")).unwrap();
        assert!(stanza.text().starts_with("neighbor 10.0.0.1 {"));
        assert!(stanza.text().ends_with("    }\n}"));
        assert_eq!(doc.to_string(), CONFIG);
    }

    #[test]
    fn test_parse_single_quoted_braces() {
        let text = "neighbor 10.0.0.1 {\n    description 'a } \"b';\n    peer-as 1;\n}\n";
        let doc = Document::parse(text);
        let stanza = doc.get(addr("10.0.0.1")).unwrap();
        assert_eq!(stanza.text(), text.trim_end());
        assert_eq!(stanza.attribute("description"), Some("a } \"b".to_string()));
        assert_eq!(stanza.attribute("peer-as"), Some("1".to_string()));

        let mut doc = doc;
        doc.upsert(addr("10.0.0.1"), "neighbor 10.0.0.1 {\n}".to_string());
        assert_eq!(doc.to_string(), "neighbor 10.0.0.1 {\n}\n");
    }

    #[test]
    fn test_parse_ignores_nested_and_unbalanced() {
        let doc = Document::parse("group x {\n    neighbor 10.0.0.9 {\n    }\n}\n");
        assert_eq!(doc.stanzas().count(), 0);

        let doc = Document::parse("neighbor 10.0.0.9 {\n    peer-as 1;\n");
        assert_eq!(doc.stanzas().count(), 0);
        assert_eq!(doc.to_string(), "neighbor 10.0.0.9 {\n    peer-as 1;\n");
    }

    #[test]
    fn test_stanza_attributes() {
        let doc = Document::parse(CONFIG);
        let stanza = doc.get(addr("10.0.0.1")).unwrap();
        assert_eq!(
            stanza.attributes(),
            vec![
                ("description".to_string(), "core { router }".to_string()),
                ("peer-as".to_string(), "65010".to_string()),
            ]
        );
        assert_eq!(stanza.attribute("route-refresh"), None);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut doc = Document::parse(CONFIG);
        let existed = doc.upsert(
            addr("10.0.0.1"),
            "neighbor 10.0.0.1 {\n    peer-as 1;\n}".to_string(),
        );
        assert!(existed);
        let stanzas: Vec<_> = doc.stanzas().map(Stanza::address).collect();
        assert_eq!(stanzas, vec![addr("10.0.0.1"), addr("2001:db8::1")]);
        assert!(doc.to_string().starts_with(&CONFIG[..CONFIG.find("neighbor 10").unwrap()]));
    }

    #[test]
    fn test_upsert_collapses_duplicates() {
        let text = "neighbor 10.0.0.1 {\n}\n\nneighbor 10.0.0.2 {\n}\n\nneighbor 10.0.0.1 {\n}\n";
        let mut doc = Document::parse(text);
        assert!(doc.upsert(addr("10.0.0.1"), "neighbor 10.0.0.1 { }".to_string()));
        assert_eq!(
            doc.to_string(),
            "neighbor 10.0.0.1 { }\n\nneighbor 10.0.0.2 {\n}\n"
        );
    }

    #[test]
    fn test_append_and_remove() {
        let mut doc = Document::parse("process api {\n}\n");
        assert!(!doc.upsert(addr("10.0.0.5"), "neighbor 10.0.0.5 {\n}".to_string()));
        assert_eq!(doc.to_string(), "process api {\n}\n\nneighbor 10.0.0.5 {\n}\n");

        let mut doc = Document::parse(&doc.to_string());
        assert!(doc.remove(addr("10.0.0.5")));
        assert_eq!(doc.to_string(), "process api {\n}\n");
        assert!(!doc.remove(addr("10.0.0.5")));
    }

    #[test]
    fn test_remove_between_content() {
        let mut doc = Document::parse(CONFIG);
        assert!(doc.remove(addr("10.0.0.1")));
        let text = doc.to_string();
        assert!(!text.contains("10.0.0.1"));
        assert!(text.contains("}\n\nneighbor 2001:db8::1 {"));
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn test_append_without_trailing_newline() {
        let mut doc = Document::parse("process api {\n}");
        doc.upsert(addr("10.0.0.5"), "neighbor 10.0.0.5 {\n}".to_string());
        assert_eq!(doc.to_string(), "process api {\n}\n\nneighbor 10.0.0.5 {\n}\n");

        let mut doc = Document::default();
        doc.upsert(addr("10.0.0.5"), "neighbor 10.0.0.5 {\n}".to_string());
        assert_eq!(doc.to_string(), "neighbor 10.0.0.5 {\n}\n");
    }
}

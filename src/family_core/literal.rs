//! Literal form of a channel list: `[('FOZ', 'HHZ'), ('WVZ', 'HHN')]`
//!
//! Only the shapes a detection record can hold are supported: a list of
//! two-element tuples (or lists) of quoted strings.

use super::detection::ChannelId;

pub fn render_channels(channels: &[ChannelId]) -> String {
    let items: Vec<String> = channels
        .iter()
        .map(|(sta, cha)| format!("({}, {})", quote(sta), quote(cha)))
        .collect();
    format!("[{}]", items.join(", "))
}

fn quote(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

pub fn parse_channels(text: &str) -> Result<Vec<ChannelId>, String> {
    let mut parser = Parser {
        chars: text.trim().chars().collect(),
        pos: 0,
    };
    let channels = parser.list()?;
    parser.skip_ws();
    if parser.pos != parser.chars.len() {
        return Err(format!("trailing characters at offset {}", parser.pos));
    }
    Ok(channels)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, wanted: char) -> Result<(), String> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == wanted => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(format!("expected '{}' at offset {}, found '{}'", wanted, self.pos, c)),
            None => Err(format!("expected '{}', found end of input", wanted)),
        }
    }

    /// Consume a separating comma if present; returns true when one was eaten
    fn comma(&mut self) -> bool {
        self.skip_ws();
        if self.peek() == Some(',') {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn list(&mut self) -> Result<Vec<ChannelId>, String> {
        self.expect('[')?;
        let mut out = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.pos += 1;
                return Ok(out);
            }
            out.push(self.pair()?);
            if !self.comma() {
                self.expect(']')?;
                return Ok(out);
            }
        }
    }

    fn pair(&mut self) -> Result<ChannelId, String> {
        self.skip_ws();
        let close = match self.peek() {
            Some('(') => ')',
            Some('[') => ']',
            _ => return Err(format!("expected a (station, channel) pair at offset {}", self.pos)),
        };
        self.pos += 1;
        let station = self.string()?;
        if !self.comma() {
            return Err(format!("expected ',' between station and channel at offset {}", self.pos));
        }
        let channel = self.string()?;
        self.comma();
        self.expect(close)?;
        Ok((station, channel))
    }

    fn string(&mut self) -> Result<String, String> {
        self.skip_ws();
        let delim = match self.peek() {
            Some(c @ ('\'' | '"')) => c,
            _ => return Err(format!("expected a quoted string at offset {}", self.pos)),
        };
        self.pos += 1;
        let mut out = String::new();
        loop {
            let c = self.peek().ok_or("unterminated string")?;
            self.pos += 1;
            match c {
                '\\' => {
                    let escaped = self.peek().ok_or("unterminated escape")?;
                    self.pos += 1;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
                c if c == delim => return Ok(out),
                c => out.push(c),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chans(pairs: &[(&str, &str)]) -> Vec<ChannelId> {
        pairs.iter().map(|(s, c)| (s.to_string(), c.to_string())).collect()
    }

    #[test]
    fn test_render_matches_literal_form() {
        let rendered = render_channels(&chans(&[("FOZ", "HHZ"), ("WVZ", "HHN")]));
        assert_eq!(rendered, "[('FOZ', 'HHZ'), ('WVZ', 'HHN')]");
        assert_eq!(render_channels(&[]), "[]");
    }

    #[test]
    fn test_parse_tuples_and_lists() {
        assert_eq!(
            parse_channels("[('FOZ', 'HHZ'), ['WVZ', \"HHN\"]]").unwrap(),
            chans(&[("FOZ", "HHZ"), ("WVZ", "HHN")])
        );
        assert_eq!(parse_channels(" [ ] ").unwrap(), Vec::<ChannelId>::new());
    }

    #[test]
    fn test_quotes_survive() {
        let odd = chans(&[("O'NEIL", "HH\"Z"), ("A\\B", "EHZ")]);
        assert_eq!(parse_channels(&render_channels(&odd)).unwrap(), odd);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_channels("FOZ.HHZ").is_err());
        assert!(parse_channels("[('FOZ')]").is_err());
        assert!(parse_channels("[('FOZ', 'HHZ')").is_err());
        assert!(parse_channels("[('FOZ', 'HHZ')] extra").is_err());
    }
}

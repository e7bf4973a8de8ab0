//! Command grammar parser.
//!
//! ```text
//! command  := KEYWORD (quoted)*
//! KEYWORD  := "FETCH" | "INDICATOR" | "BACKTEST" | "FINISH"
//! quoted   := '"' <any char except '"'>* '"'
//! ```
//!
//! Keywords are case-sensitive. Arguments are positional quoted strings, so a
//! literal `"` inside an argument cannot be expressed: it closes the argument
//! early and the remainder is reported as a parse error.

use crate::domain::action::{Action, ActionKind, DEFAULT_FINISH_MESSAGE};
use crate::domain::error::ParseError;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: String, position: usize) -> ParseError {
        ParseError {
            message,
            position,
            raw: self.input.to_string(),
        }
    }

    fn peek_word(&self) -> String {
        let word: String = self
            .remaining()
            .chars()
            .take_while(|c| !c.is_whitespace() && *c != '"')
            .collect();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        remaining.starts_with(keyword)
            && !remaining[keyword.len()..]
                .chars()
                .next()
                .map(|c| c.is_alphanumeric() || c == '_')
                .unwrap_or(false)
    }

    fn parse_keyword(&mut self) -> Result<ActionKind, ParseError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(self.error("empty command".to_string(), self.pos));
        }
        for kind in ActionKind::ALL {
            if self.peek_keyword(kind.keyword()) {
                self.pos += kind.keyword().len();
                return Ok(kind);
            }
        }
        let found = self.peek_word();
        Err(self.error(
            format!(
                "unknown command '{}', expected one of FETCH, INDICATOR, BACKTEST, FINISH",
                found
            ),
            self.pos,
        ))
    }

    fn parse_quoted(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        match self.advance() {
            Some('"') => {}
            Some(ch) => {
                return Err(self.error(format!("expected '\"', found '{}'", ch), start));
            }
            None => {
                return Err(self.error("expected '\"', found end of input".to_string(), start));
            }
        }
        let body_start = self.pos;
        match self.remaining().find('"') {
            Some(offset) => {
                let body = &self.input[body_start..body_start + offset];
                self.pos = body_start + offset + 1;
                Ok(body.to_string())
            }
            None => Err(self.error("unterminated quoted argument".to_string(), start)),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<(usize, String)>, ParseError> {
        let mut args = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                return Ok(args);
            }
            let position = self.pos;
            let arg = self.parse_quoted()?;
            args.push((position, arg));
        }
    }

    fn parse(&mut self) -> Result<Action, ParseError> {
        let kind = self.parse_keyword()?;
        let keyword_end = self.pos;
        let args = self.parse_arguments()?;

        let max = kind.arity().max(1);
        if args.len() < kind.arity() || args.len() > max {
            let expected = if kind.arity() == max {
                format!("{}", max)
            } else {
                format!("{} or {}", kind.arity(), max)
            };
            return Err(self.error(
                format!(
                    "{} expects {} quoted argument(s), found {} (usage: {})",
                    kind.keyword(),
                    expected,
                    args.len(),
                    kind.usage()
                ),
                keyword_end,
            ));
        }

        let mut args = args.into_iter();
        let mut required = |label: &str| -> Result<String, ParseError> {
            match args.next() {
                Some((position, value)) if value.trim().is_empty() => Err(self.error(
                    format!("{} must not be empty", label),
                    position,
                )),
                Some((_, value)) => Ok(value),
                None => Err(self.error(format!("missing {}", label), keyword_end)),
            }
        };

        match kind {
            ActionKind::Fetch => Ok(Action::Fetch {
                ticker: required("ticker")?,
            }),
            ActionKind::Indicator => {
                let ticker = required("ticker")?;
                let name = required("indicator name")?;
                Ok(Action::Indicator { ticker, name })
            }
            ActionKind::Backtest => {
                let ticker = required("ticker")?;
                let strategy = required("strategy name")?;
                Ok(Action::Backtest { ticker, strategy })
            }
            ActionKind::Finish => {
                let message = args
                    .next()
                    .map(|(_, m)| m)
                    .unwrap_or_else(|| DEFAULT_FINISH_MESSAGE.to_string());
                Ok(Action::Finish { message })
            }
        }
    }
}

/// Parse one command line emitted by the decision oracle.
pub fn parse(input: &str) -> Result<Action, ParseError> {
    Parser::new(input).parse()
}

/// Keyword of a raw command without validating its arguments.
pub fn peek_kind(input: &str) -> Option<ActionKind> {
    let mut parser = Parser::new(input);
    parser.parse_keyword().ok()
}

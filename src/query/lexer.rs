//! Tokenizer for filter expressions.
//!
//! # Token syntax
//!
//! - `field:value` / `value` - word, optional field qualifier
//! - `field:"some phrase"` / `"some phrase"` - phrase (`\"` escapes a quote)
//! - `field:[a TO b]` / `field:{a TO b}` - inclusive / exclusive range
//! - `field:(` / `(` and `)` - grouping
//! - `AND` `&&`, `OR` `||`, `NOT` `!` - boolean operators
//! - `+term` / `-term` - mandatory / prohibited prefix
//!
//! Field names are `[A-Za-z_][A-Za-z0-9_.]*`. A backslash escapes the next
//! character of a word.

use std::fmt;

use thiserror::Error;

/// One lexical token with its character offset in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Word {
        field: Option<String>,
        value: String,
    },
    Phrase {
        field: Option<String>,
        value: String,
    },
    /// Raw range body between the brackets; bounds are validated by the parser.
    Range {
        field: Option<String>,
        body: String,
        inclusive_lower: bool,
        inclusive_upper: bool,
    },
    GroupOpen {
        field: Option<String>,
    },
    GroupClose,
    And,
    Or,
    Not,
    Mandatory,
    Prohibited,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = |field: &Option<String>| match field {
            Some(name) => format!("{name}:"),
            None => String::new(),
        };
        match self {
            Self::Word { field, value } => write!(f, "{}{}", prefix(field), value),
            Self::Phrase { field, value } => write!(f, "{}\"{}\"", prefix(field), value),
            Self::Range {
                field,
                body,
                inclusive_lower,
                inclusive_upper,
            } => write!(
                f,
                "{}{}{}{}",
                prefix(field),
                if *inclusive_lower { '[' } else { '{' },
                body,
                if *inclusive_upper { ']' } else { '}' }
            ),
            Self::GroupOpen { field } => write!(f, "{}(", prefix(field)),
            Self::GroupClose => f.write_str(")"),
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
            Self::Not => f.write_str("NOT"),
            Self::Mandatory => f.write_str("+"),
            Self::Prohibited => f.write_str("-"),
        }
    }
}

/// Tokenizer failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at position {position}")]
pub struct LexicalError {
    pub position: usize,
    pub kind: LexicalErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexicalErrorKind {
    #[error("unterminated quoted phrase")]
    UnterminatedPhrase,
    #[error("unterminated range")]
    UnterminatedRange,
    #[error("dangling escape character")]
    DanglingEscape,
    #[error("missing value after field '{0}'")]
    MissingValue(String),
}

/// Split a filter expression into tokens.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexicalError> {
    Lexer {
        chars: input.chars().collect(),
        pos: 0,
    }
    .run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn run(mut self) -> Result<Vec<Token>, LexicalError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.pos += 1;
                continue;
            }
            let start = self.pos;
            let kind = match ch {
                '(' => {
                    self.pos += 1;
                    TokenKind::GroupOpen { field: None }
                }
                ')' => {
                    self.pos += 1;
                    TokenKind::GroupClose
                }
                '"' => self.phrase(None, start)?,
                '[' | '{' => self.range(None, start)?,
                '+' if self.starts_term(1) => {
                    self.pos += 1;
                    TokenKind::Mandatory
                }
                '-' if self.starts_term(1) => {
                    self.pos += 1;
                    TokenKind::Prohibited
                }
                '!' if self.peek_at(1) != Some('=') => {
                    self.pos += 1;
                    TokenKind::Not
                }
                '&' if self.peek_at(1) == Some('&') => {
                    self.pos += 2;
                    TokenKind::And
                }
                '|' if self.peek_at(1) == Some('|') => {
                    self.pos += 2;
                    TokenKind::Or
                }
                _ => self.word_or_qualified(start)?,
            };
            tokens.push(Token {
                kind,
                position: start,
            });
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Whether the character at `offset` can begin a term or group.
    fn starts_term(&self, offset: usize) -> bool {
        matches!(self.peek_at(offset), Some(c) if !c.is_whitespace() && c != ')')
    }

    /// Field prefix `name:` at the current position, if any. Consumes it.
    fn field_prefix(&mut self) -> Option<String> {
        let first = self.peek()?;
        if !(first.is_ascii_alphabetic() || first == '_') {
            return None;
        }
        let mut end = self.pos + 1;
        while let Some(&c) = self.chars.get(end) {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                end += 1;
            } else {
                break;
            }
        }
        if self.chars.get(end) != Some(&':') {
            return None;
        }
        let name: String = self.chars[self.pos..end].iter().collect();
        self.pos = end + 1;
        Some(name)
    }

    fn word_or_qualified(&mut self, start: usize) -> Result<TokenKind, LexicalError> {
        if let Some(field) = self.field_prefix() {
            return match self.peek() {
                Some('"') => self.phrase(Some(field), start),
                Some('[') | Some('{') => self.range(Some(field), start),
                Some('(') => {
                    self.pos += 1;
                    Ok(TokenKind::GroupOpen { field: Some(field) })
                }
                Some(c) if !c.is_whitespace() && c != ')' => {
                    let value = self.word_value()?;
                    Ok(TokenKind::Word {
                        field: Some(field),
                        value,
                    })
                }
                _ => Err(LexicalError {
                    position: start,
                    kind: LexicalErrorKind::MissingValue(field),
                }),
            };
        }

        let value = self.word_value()?;
        Ok(match value.as_str() {
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "NOT" => TokenKind::Not,
            _ => TokenKind::Word { field: None, value },
        })
    }

    /// Unescaped word characters up to whitespace or a parenthesis.
    fn word_value(&mut self) -> Result<String, LexicalError> {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '(' || c == ')' {
                break;
            }
            if c == '\\' {
                let Some(escaped) = self.peek_at(1) else {
                    return Err(LexicalError {
                        position: self.pos,
                        kind: LexicalErrorKind::DanglingEscape,
                    });
                };
                value.push(escaped);
                self.pos += 2;
                continue;
            }
            value.push(c);
            self.pos += 1;
        }
        Ok(value)
    }

    fn phrase(&mut self, field: Option<String>, start: usize) -> Result<TokenKind, LexicalError> {
        // Skip the opening quote
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(LexicalError {
                        position: start,
                        kind: LexicalErrorKind::UnterminatedPhrase,
                    })
                }
                Some('"') => {
                    self.pos += 1;
                    return Ok(TokenKind::Phrase { field, value });
                }
                Some('\\') if matches!(self.peek_at(1), Some('"') | Some('\\')) => {
                    if let Some(escaped) = self.peek_at(1) {
                        value.push(escaped);
                    }
                    self.pos += 2;
                }
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn range(&mut self, field: Option<String>, start: usize) -> Result<TokenKind, LexicalError> {
        let inclusive_lower = self.peek() == Some('[');
        self.pos += 1;
        let mut body = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(LexicalError {
                        position: start,
                        kind: LexicalErrorKind::UnterminatedRange,
                    })
                }
                Some(c @ (']' | '}')) => {
                    self.pos += 1;
                    return Ok(TokenKind::Range {
                        field,
                        body,
                        inclusive_lower,
                        inclusive_upper: c == ']',
                    });
                }
                Some(c) => {
                    body.push(c);
                    self.pos += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn word(field: &str, value: &str) -> TokenKind {
        TokenKind::Word {
            field: Some(field.to_string()),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_tokenize_field_word() {
        assert_eq!(kinds("field.name:value"), vec![word("field.name", "value")]);
    }

    #[test]
    fn test_tokenize_value_keeps_colons() {
        assert_eq!(kinds("groups:3:energy"), vec![word("groups", "3:energy")]);
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            kinds("a:1 AND b:2 || NOT c:3 && !d:4 OR e:5"),
            vec![
                word("a", "1"),
                TokenKind::And,
                word("b", "2"),
                TokenKind::Or,
                TokenKind::Not,
                word("c", "3"),
                TokenKind::And,
                TokenKind::Not,
                word("d", "4"),
                TokenKind::Or,
                word("e", "5"),
            ]
        );
    }

    #[test]
    fn test_lowercase_operators_are_words() {
        assert_eq!(
            kinds("and"),
            vec![TokenKind::Word {
                field: None,
                value: "and".to_string()
            }]
        );
    }

    #[test]
    fn test_tokenize_prefixes_and_groups() {
        assert_eq!(
            kinds("+a:1 -(b:2 c:3)"),
            vec![
                TokenKind::Mandatory,
                word("a", "1"),
                TokenKind::Prohibited,
                TokenKind::GroupOpen { field: None },
                word("b", "2"),
                word("c", "3"),
                TokenKind::GroupClose,
            ]
        );
    }

    #[test]
    fn test_tokenize_qualified_group() {
        assert_eq!(
            kinds("lang:(en OR de)")[0],
            TokenKind::GroupOpen {
                field: Some("lang".to_string())
            }
        );
    }

    #[test]
    fn test_tokenize_phrase_preserves_whitespace() {
        assert_eq!(
            kinds(r#"title:"  heat   pump \"x\" ""#),
            vec![TokenKind::Phrase {
                field: Some("title".to_string()),
                value: "  heat   pump \"x\" ".to_string()
            }]
        );
    }

    #[test]
    fn test_tokenize_range() {
        assert_eq!(
            kinds("pages:{1 TO 10]"),
            vec![TokenKind::Range {
                field: Some("pages".to_string()),
                body: "1 TO 10".to_string(),
                inclusive_lower: false,
                inclusive_upper: true,
            }]
        );
    }

    #[test]
    fn test_positions_are_char_offsets() {
        let tokens = tokenize("é:1  b:2").unwrap();
        // 'é' is not a field start, so the first token is a bare word
        assert_eq!(tokens[0].position, 0);
        assert_eq!(tokens[1].position, 5);
    }

    #[test]
    fn test_unterminated_phrase() {
        let err = tokenize(r#"field.name:"value"#).unwrap_err();
        assert_eq!(err.kind, LexicalErrorKind::UnterminatedPhrase);
        assert_eq!(err.position, 0);
    }

    #[test]
    fn test_unterminated_range() {
        let err = tokenize("a:1 pages:[1 TO 2").unwrap_err();
        assert_eq!(err.kind, LexicalErrorKind::UnterminatedRange);
        assert_eq!(err.position, 4);
    }

    #[test]
    fn test_missing_value_after_field() {
        let err = tokenize("field: value").unwrap_err();
        assert_eq!(err.kind, LexicalErrorKind::MissingValue("field".to_string()));
    }

    #[test]
    fn test_escaped_characters_in_word() {
        assert_eq!(kinds(r"a:x\ y"), vec![word("a", "x y")]);
        assert!(tokenize("a:x\\").is_err());
    }

    #[test]
    fn test_token_display_reconstructs_source() {
        let tokens = tokenize(r#"a:[1 TO 2} b:"x y""#).unwrap();
        assert_eq!(tokens[0].kind.to_string(), "a:[1 TO 2}");
        assert_eq!(tokens[1].kind.to_string(), "b:\"x y\"");
    }
}

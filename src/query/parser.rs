//! Recursive-descent parser for filter expressions.
//!
//! # Grammar
//!
//! ```text
//! query    := clause+                      (implicit AND)
//! clause   := and_expr (OR and_expr)*
//! and_expr := not_expr (AND not_expr)*
//! not_expr := NOT not_expr | unary
//! unary    := ('+' | '-')? primary
//! primary  := word | phrase | range | '(' query ')'
//! range    := ('[' | '{') bound TO bound (']' | '}')
//! ```
//!
//! Precedence from tightest to loosest: NOT, AND, OR, implicit AND.
//! A qualified group `field:( ... )` hands its field to unqualified members.
//!
//! Operator chains are collected with loops into flat `LogicalAnd` /
//! `LogicalOr` nodes, so only groups and `NOT` add a level of nesting.
//! Both count against [`MAX_DEPTH`].

use thiserror::Error;

use super::ast::{Bound, SyntaxNode};
use super::lexer::{tokenize, LexicalError, LexicalErrorKind, Token, TokenKind};

/// Deepest nesting of groups and `NOT` the parser accepts.
pub const MAX_DEPTH: usize = 64;

/// Parse failure with the offending position and token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at position {position}")]
pub struct ParsingError {
    pub position: usize,
    pub token: Option<String>,
    pub kind: ParsingErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingErrorKind {
    #[error("{0}")]
    Lexical(LexicalErrorKind),
    #[error("empty expression")]
    EmptyExpression,
    #[error("expected a term but the expression ended")]
    UnexpectedEnd,
    #[error("unexpected token")]
    UnexpectedToken,
    #[error("unbalanced parenthesis")]
    UnbalancedParenthesis,
    #[error("empty group")]
    EmptyGroup,
    #[error("term needs a field qualifier (field:value)")]
    UnqualifiedTerm,
    #[error("range is missing a bound")]
    IncompleteRange,
    #[error("range must have the form [lower TO upper]")]
    MalformedRange,
    #[error("expression nests deeper than {MAX_DEPTH} levels")]
    TooDeep,
}

impl From<LexicalError> for ParsingError {
    fn from(err: LexicalError) -> Self {
        Self {
            position: err.position,
            token: None,
            kind: ParsingErrorKind::Lexical(err.kind),
        }
    }
}

/// Tokenize and parse in one step, requiring field-qualified terms.
pub fn parse_expression(input: &str) -> Result<SyntaxNode, ParsingError> {
    Parser::new(tokenize(input)?).parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    require_field: bool,
    inherited: Option<String>,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            require_field: true,
            inherited: None,
            depth: 0,
        }
    }

    /// Accept terms without a field, leaving resolution to the generator.
    pub fn allow_unqualified(mut self) -> Self {
        self.require_field = false;
        self
    }

    /// Parse the whole token sequence into one root node.
    pub fn parse(mut self) -> Result<SyntaxNode, ParsingError> {
        if self.tokens.is_empty() {
            return Err(ParsingError {
                position: 0,
                token: None,
                kind: ParsingErrorKind::EmptyExpression,
            });
        }
        let mut clauses = self.sequence()?;
        if let Some(token) = self.peek() {
            // Only a stray ')' can stop the top-level sequence early
            return Err(self.error_at(token, ParsingErrorKind::UnbalancedParenthesis));
        }
        Ok(if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            SyntaxNode::Query(clauses)
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, token: &Token, kind: ParsingErrorKind) -> ParsingError {
        ParsingError {
            position: token.position,
            token: Some(token.kind.to_string()),
            kind,
        }
    }

    fn unexpected_end(&self) -> ParsingError {
        let position = self.tokens.last().map(|t| t.position).unwrap_or(0);
        ParsingError {
            position,
            token: None,
            kind: ParsingErrorKind::UnexpectedEnd,
        }
    }

    /// Enter one level of nesting opened by `token`.
    fn descend(&mut self, token: &Token) -> Result<(), ParsingError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error_at(token, ParsingErrorKind::TooDeep));
        }
        self.depth += 1;
        Ok(())
    }

    /// clause+ up to end of input or a closing parenthesis.
    fn sequence(&mut self) -> Result<Vec<SyntaxNode>, ParsingError> {
        let mut clauses = Vec::new();
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::GroupClose {
                break;
            }
            clauses.push(self.clause()?);
        }
        Ok(clauses)
    }

    fn clause(&mut self) -> Result<SyntaxNode, ParsingError> {
        let mut operands = vec![self.and_expr()?];
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::Or) {
            self.pos += 1;
            operands.push(self.and_expr()?);
        }
        Ok(chain(operands, SyntaxNode::LogicalOr))
    }

    fn and_expr(&mut self) -> Result<SyntaxNode, ParsingError> {
        let mut operands = vec![self.not_expr()?];
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::And) {
            self.pos += 1;
            operands.push(self.not_expr()?);
        }
        Ok(chain(operands, SyntaxNode::LogicalAnd))
    }

    fn not_expr(&mut self) -> Result<SyntaxNode, ParsingError> {
        let Some(not) = self.peek().filter(|t| t.kind == TokenKind::Not).cloned() else {
            return self.unary();
        };
        self.pos += 1;
        self.descend(&not)?;
        let inner = self.not_expr();
        self.depth -= 1;
        Ok(inner?.negate())
    }

    fn unary(&mut self) -> Result<SyntaxNode, ParsingError> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Mandatory) => {
                self.pos += 1;
                Ok(SyntaxNode::Mandatory(Box::new(self.primary()?)))
            }
            Some(TokenKind::Prohibited) => {
                self.pos += 1;
                Ok(SyntaxNode::Prohibited(Box::new(self.primary()?)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<SyntaxNode, ParsingError> {
        let Some(token) = self.next() else {
            return Err(self.unexpected_end());
        };
        match token.kind.clone() {
            TokenKind::Word { field, value } => Ok(SyntaxNode::Word {
                field: self.qualify(field, &token)?,
                value,
            }),
            TokenKind::Phrase { field, value } => Ok(SyntaxNode::Phrase {
                field: self.qualify(field, &token)?,
                value,
            }),
            TokenKind::Range {
                field,
                body,
                inclusive_lower,
                inclusive_upper,
            } => {
                let field = self.qualify(field, &token)?;
                let (lower, upper) = self.range_bounds(&body, &token)?;
                Ok(SyntaxNode::Range {
                    field,
                    lower,
                    upper,
                    inclusive_lower,
                    inclusive_upper,
                })
            }
            TokenKind::GroupOpen { field } => self.group(field, &token),
            TokenKind::GroupClose => {
                Err(self.error_at(&token, ParsingErrorKind::UnbalancedParenthesis))
            }
            TokenKind::And
            | TokenKind::Or
            | TokenKind::Not
            | TokenKind::Mandatory
            | TokenKind::Prohibited => {
                Err(self.error_at(&token, ParsingErrorKind::UnexpectedToken))
            }
        }
    }

    fn group(&mut self, field: Option<String>, open: &Token) -> Result<SyntaxNode, ParsingError> {
        self.descend(open)?;
        let outer = match field {
            Some(f) => self.inherited.replace(f),
            None => self.inherited.clone(),
        };
        let members = self.sequence();
        self.inherited = outer;
        self.depth -= 1;
        let members = members?;

        match self.next() {
            Some(t) if t.kind == TokenKind::GroupClose => {}
            _ => return Err(self.error_at(open, ParsingErrorKind::UnbalancedParenthesis)),
        }
        if members.is_empty() {
            return Err(self.error_at(open, ParsingErrorKind::EmptyGroup));
        }
        Ok(SyntaxNode::Group(members))
    }

    /// Apply the inherited field and enforce qualification.
    fn qualify(
        &self,
        field: Option<String>,
        token: &Token,
    ) -> Result<Option<String>, ParsingError> {
        let field = field.or_else(|| self.inherited.clone());
        if field.is_none() && self.require_field {
            return Err(self.error_at(token, ParsingErrorKind::UnqualifiedTerm));
        }
        Ok(field)
    }

    fn range_bounds(&self, body: &str, token: &Token) -> Result<(Bound, Bound), ParsingError> {
        let parts: Vec<&str> = body.split_whitespace().collect();
        let to_count = parts.iter().filter(|p| **p == "TO").count();
        match parts.as_slice() {
            [lower, "TO", upper] => Ok((bound(lower), bound(upper))),
            _ if to_count == 1 && parts.len() < 3 => {
                Err(self.error_at(token, ParsingErrorKind::IncompleteRange))
            }
            _ => Err(self.error_at(token, ParsingErrorKind::MalformedRange)),
        }
    }
}

/// Collapse a one-element chain to its operand.
fn chain(mut operands: Vec<SyntaxNode>, join: fn(Vec<SyntaxNode>) -> SyntaxNode) -> SyntaxNode {
    if operands.len() == 1 {
        operands.remove(0)
    } else {
        join(operands)
    }
}

fn bound(raw: &str) -> Bound {
    if raw == "*" {
        Bound::Unbounded
    } else {
        Bound::Value(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(field: &str, value: &str) -> SyntaxNode {
        SyntaxNode::Word {
            field: Some(field.to_string()),
            value: value.to_string(),
        }
    }

    fn err_kind(input: &str) -> ParsingErrorKind {
        parse_expression(input).unwrap_err().kind
    }

    #[test]
    fn test_single_term() {
        assert_eq!(parse_expression("a:1").unwrap(), word("a", "1"));
    }

    #[test]
    fn test_implicit_and_is_query() {
        assert_eq!(
            parse_expression("a:1 b:2").unwrap(),
            SyntaxNode::Query(vec![word("a", "1"), word("b", "2")])
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert_eq!(
            parse_expression("a:1 OR b:2 AND c:3").unwrap(),
            word("a", "1").or(word("b", "2").and(word("c", "3")))
        );
    }

    #[test]
    fn test_not_binds_tightest() {
        assert_eq!(
            parse_expression("NOT a:1 AND b:2").unwrap(),
            word("a", "1").negate().and(word("b", "2"))
        );
    }

    #[test]
    fn test_or_binds_tighter_than_implicit_and() {
        assert_eq!(
            parse_expression("a:1 OR b:2 c:3").unwrap(),
            SyntaxNode::Query(vec![word("a", "1").or(word("b", "2")), word("c", "3")])
        );
    }

    #[test]
    fn test_prefix_operators() {
        assert_eq!(
            parse_expression("+a:1 -b:2").unwrap(),
            SyntaxNode::Query(vec![
                SyntaxNode::Mandatory(Box::new(word("a", "1"))),
                SyntaxNode::Prohibited(Box::new(word("b", "2"))),
            ])
        );
    }

    #[test]
    fn test_qualified_group_distributes_field() {
        assert_eq!(
            parse_expression("lang:(en OR de)").unwrap(),
            SyntaxNode::Group(vec![word("lang", "en").or(word("lang", "de"))])
        );
    }

    #[test]
    fn test_inner_field_overrides_group_field() {
        assert_eq!(
            parse_expression("lang:(en type:report)").unwrap(),
            SyntaxNode::Group(vec![word("lang", "en"), word("type", "report")])
        );
    }

    #[test]
    fn test_group_field_does_not_leak() {
        assert_eq!(err_kind("lang:(en) de"), ParsingErrorKind::UnqualifiedTerm);
    }

    #[test]
    fn test_range_with_wildcard_bound() {
        assert_eq!(
            parse_expression("pages:[10 TO *]").unwrap(),
            SyntaxNode::Range {
                field: Some("pages".to_string()),
                lower: Bound::Value("10".to_string()),
                upper: Bound::Unbounded,
                inclusive_lower: true,
                inclusive_upper: true,
            }
        );
    }

    #[test]
    fn test_bare_term_rejected() {
        let err = parse_expression("value").unwrap_err();
        assert_eq!(err.kind, ParsingErrorKind::UnqualifiedTerm);
        assert_eq!(err.token.as_deref(), Some("value"));
    }

    #[test]
    fn test_bare_term_allowed_when_configured() {
        let tokens = tokenize("value").unwrap();
        let tree = Parser::new(tokens).allow_unqualified().parse().unwrap();
        assert_eq!(
            tree,
            SyntaxNode::Word {
                field: None,
                value: "value".to_string()
            }
        );
    }

    #[test]
    fn test_incomplete_range() {
        assert_eq!(err_kind("field.name:[value TO ]"), ParsingErrorKind::IncompleteRange);
        assert_eq!(err_kind("field.name:[TO value]"), ParsingErrorKind::IncompleteRange);
    }

    #[test]
    fn test_malformed_range() {
        assert_eq!(err_kind("a:[1 2]"), ParsingErrorKind::MalformedRange);
        assert_eq!(err_kind("a:[1 TO 2 TO 3]"), ParsingErrorKind::MalformedRange);
    }

    #[test]
    fn test_unterminated_quote_is_parsing_error() {
        let err = parse_expression("field.name:\"value").unwrap_err();
        assert_eq!(
            err.kind,
            ParsingErrorKind::Lexical(LexicalErrorKind::UnterminatedPhrase)
        );
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert_eq!(err_kind("(a:1"), ParsingErrorKind::UnbalancedParenthesis);
        assert_eq!(err_kind("a:1)"), ParsingErrorKind::UnbalancedParenthesis);
        let err = parse_expression("a:1 (b:2 c:3").unwrap_err();
        assert_eq!(err.position, 4);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(err_kind(""), ParsingErrorKind::EmptyExpression);
        assert_eq!(err_kind("   "), ParsingErrorKind::EmptyExpression);
        assert_eq!(err_kind("()"), ParsingErrorKind::EmptyGroup);
    }

    #[test]
    fn test_dangling_operators() {
        assert_eq!(err_kind("a:1 AND"), ParsingErrorKind::UnexpectedEnd);
        assert_eq!(err_kind("OR a:1"), ParsingErrorKind::UnexpectedToken);
        assert_eq!(err_kind("a:1 AND OR b:2"), ParsingErrorKind::UnexpectedToken);
        assert_eq!(err_kind("+-a:1"), ParsingErrorKind::UnexpectedToken);
    }

    #[test]
    fn test_long_or_chain_is_flat() {
        let input = (0..100_000)
            .map(|i| format!("id:{i}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        match parse_expression(&input).unwrap() {
            SyntaxNode::LogicalOr(operands) => assert_eq!(operands.len(), 100_000),
            other => panic!("expected an OR chain, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_nesting_limit() {
        let at_limit = format!("{}a:1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(parse_expression(&at_limit).is_ok());

        let too_deep = format!("{}a:1{}", "(".repeat(10_000), ")".repeat(10_000));
        let err = parse_expression(&too_deep).unwrap_err();
        assert_eq!(err.kind, ParsingErrorKind::TooDeep);
        assert_eq!(err.position, MAX_DEPTH);

        let nots = format!("{}a:1", "NOT ".repeat(10_000));
        assert_eq!(err_kind(&nots), ParsingErrorKind::TooDeep);
    }
}

//! Syntax tree to Solr filter-query translation.
//!
//! # Output syntax
//!
//! ```text
//! field:value              - Word (reserved characters backslash-escaped)
//! field:"some phrase"      - Phrase (whitespace kept verbatim)
//! field:[a TO b]           - Range ({ } for exclusive bounds, * for open)
//! (q1 AND q2)              - Group
//! q1 AND q2 OR ...         - Logical operator chains
//! NOT q / +q / -q          - Negation, mandatory, prohibited
//! q1 AND q2                - Implicit sequence (always conjunctive)
//! ```
//!
//! Compound operands are parenthesized whenever they differ from the
//! enclosing operator, since the Lucene parser does not apply boolean
//! precedence on its own.

use super::ast::{Bound, NodeKind, SyntaxNode};
use crate::error::{Result, SearchError};
use crate::mapping::FieldMapping;

/// Characters with meaning in the Lucene query syntax.
const RESERVED: &[char] = &[
    '\\', '+', '-', '!', '(', ')', ':', '^', '[', ']', '"', '{', '}', '~', '*', '?', '|', '&',
    '/',
];

/// Words the Lucene parser reads as operators when they stand alone.
const KEYWORDS: &[&str] = &["AND", "OR", "NOT", "TO"];

/// Escape a single term so the backend reads it literally.
pub fn escape_term(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 1);
    if KEYWORDS.contains(&value) {
        escaped.push('\\');
    }
    for c in value.chars() {
        if RESERVED.contains(&c) || c.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape the inside of a quoted phrase.
pub fn escape_phrase(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Compiled translator for one field mapping. Stateless once built.
#[derive(Debug)]
pub struct Generator {
    mapping: FieldMapping,
    default_field: Option<String>,
}

impl Generator {
    pub fn new(mapping: FieldMapping) -> Self {
        Self {
            mapping,
            default_field: None,
        }
    }

    /// Logical field used for unqualified terms.
    pub fn with_default_field(mut self, field: impl Into<String>) -> Self {
        self.default_field = Some(field.into());
        self
    }

    /// Render a whole tree. Fails on the first field the mapping rejects.
    pub fn generate(&self, tree: &SyntaxNode) -> Result<String> {
        self.visit(tree)
    }

    fn visit(&self, node: &SyntaxNode) -> Result<String> {
        match node {
            SyntaxNode::Word { field, value } => self.visit_word(field.as_deref(), value),
            SyntaxNode::Phrase { field, value } => self.visit_phrase(field.as_deref(), value),
            SyntaxNode::Range {
                field,
                lower,
                upper,
                inclusive_lower,
                inclusive_upper,
            } => self.visit_range(
                field.as_deref(),
                lower,
                upper,
                *inclusive_lower,
                *inclusive_upper,
            ),
            SyntaxNode::Group(nodes) => match nodes.as_slice() {
                [single] => Ok(format!("({})", self.visit(single)?)),
                _ => Ok(format!("({})", self.sequence(nodes)?)),
            },
            SyntaxNode::Query(nodes) => self.sequence(nodes),
            SyntaxNode::LogicalAnd(operands) => self.chain(operands, NodeKind::LogicalAnd, " AND "),
            SyntaxNode::LogicalOr(operands) => self.chain(operands, NodeKind::LogicalOr, " OR "),
            SyntaxNode::LogicalNot(inner) => Ok(format!("NOT {}", self.unary_operand(inner)?)),
            SyntaxNode::Mandatory(inner) => Ok(format!("+{}", self.unary_operand(inner)?)),
            SyntaxNode::Prohibited(inner) => Ok(format!("-{}", self.unary_operand(inner)?)),
        }
    }

    fn resolve(&self, field: Option<&str>) -> Result<&str> {
        match field.or(self.default_field.as_deref()) {
            Some(logical) => self.mapping.resolve(logical),
            None => Err(SearchError::unknown_property(
                "<unqualified>",
                self.mapping.context(),
            )),
        }
    }

    fn visit_word(&self, field: Option<&str>, value: &str) -> Result<String> {
        Ok(format!("{}:{}", self.resolve(field)?, escape_term(value)))
    }

    fn visit_phrase(&self, field: Option<&str>, value: &str) -> Result<String> {
        Ok(format!("{}:\"{}\"", self.resolve(field)?, escape_phrase(value)))
    }

    fn visit_range(
        &self,
        field: Option<&str>,
        lower: &Bound,
        upper: &Bound,
        inclusive_lower: bool,
        inclusive_upper: bool,
    ) -> Result<String> {
        let render = |bound: &Bound| match bound {
            Bound::Value(v) => escape_term(v),
            Bound::Unbounded => "*".to_string(),
        };
        Ok(format!(
            "{}:{}{} TO {}{}",
            self.resolve(field)?,
            if inclusive_lower { '[' } else { '{' },
            render(lower),
            render(upper),
            if inclusive_upper { ']' } else { '}' }
        ))
    }

    /// Members of an implicit sequence, joined conjunctively.
    fn sequence(&self, nodes: &[SyntaxNode]) -> Result<String> {
        self.chain(nodes, NodeKind::LogicalAnd, " AND ")
    }

    fn chain(&self, operands: &[SyntaxNode], parent: NodeKind, separator: &str) -> Result<String> {
        let parts = operands
            .iter()
            .map(|n| self.operand(n, parent))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join(separator))
    }

    /// Render an operand of an operator chain, parenthesized unless it is
    /// atomic, unary, or the same operator.
    fn operand(&self, node: &SyntaxNode, parent: NodeKind) -> Result<String> {
        let rendered = self.visit(node)?;
        let bare = node.precedence() >= 3 || node.kind() == parent;
        Ok(if bare { rendered } else { format!("({rendered})") })
    }

    fn unary_operand(&self, node: &SyntaxNode) -> Result<String> {
        let rendered = self.visit(node)?;
        Ok(if node.precedence() >= 4 {
            rendered
        } else {
            format!("({rendered})")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingContext;
    use crate::query::parser::parse_expression;

    fn generator() -> Generator {
        Generator::new(
            FieldMapping::from_pairs(
                MappingContext::Filter,
                [
                    ("field.name", "solr_field_name"),
                    ("lang", "str_s_language"),
                    ("pages", "int_pages"),
                    ("title", "txt_title"),
                ],
            )
            .unwrap(),
        )
    }

    fn compile(input: &str) -> String {
        generator()
            .generate(&parse_expression(input).unwrap())
            .unwrap()
    }

    #[test]
    fn test_word() {
        assert_eq!(compile("field.name:value"), "solr_field_name:value");
    }

    #[test]
    fn test_word_escapes_reserved() {
        assert_eq!(compile(r"lang:a+b\:c"), r"str_s_language:a\+b\:c");
        assert_eq!(compile("lang:3:*"), r"str_s_language:3\:\*");
    }

    #[test]
    fn test_phrase() {
        assert_eq!(
            compile(r#"title:"heat  pump \"pro\"""#),
            r#"txt_title:"heat  pump \"pro\"""#
        );
    }

    #[test]
    fn test_range() {
        assert_eq!(compile("pages:[1 TO 10]"), "int_pages:[1 TO 10]");
        assert_eq!(compile("pages:{1 TO *]"), "int_pages:{1 TO *]");
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            compile("lang:en AND NOT pages:1"),
            "str_s_language:en AND NOT int_pages:1"
        );
        assert_eq!(
            compile("+lang:en -pages:1"),
            "+str_s_language:en AND -int_pages:1"
        );
    }

    #[test]
    fn test_mixed_operators_are_parenthesized() {
        assert_eq!(
            compile("lang:en OR lang:de pages:1"),
            "(str_s_language:en OR str_s_language:de) AND int_pages:1"
        );
        assert_eq!(
            compile("lang:en OR lang:de AND pages:1"),
            "str_s_language:en OR (str_s_language:de AND int_pages:1)"
        );
        assert_eq!(
            compile("lang:en OR lang:de OR lang:fr"),
            "str_s_language:en OR str_s_language:de OR str_s_language:fr"
        );
    }

    #[test]
    fn test_group() {
        assert_eq!(
            compile("lang:(en OR de) -(pages:1 title:x)"),
            "(str_s_language:en OR str_s_language:de) AND -(int_pages:1 AND txt_title:x)"
        );
    }

    #[test]
    fn test_not_of_compound_is_parenthesized() {
        let tree = SyntaxNode::Word {
            field: Some("lang".to_string()),
            value: "en".to_string(),
        }
        .or(SyntaxNode::Word {
            field: Some("lang".to_string()),
            value: "de".to_string(),
        })
        .negate();
        assert_eq!(
            generator().generate(&tree).unwrap(),
            "NOT (str_s_language:en OR str_s_language:de)"
        );
    }

    #[test]
    fn test_unknown_field_anywhere_fails() {
        let tree = parse_expression("lang:en OR (pages:1 AND secret:x)").unwrap();
        let err = generator().generate(&tree).unwrap_err();
        assert!(matches!(err, SearchError::UnknownProperty { ref field, .. } if field == "secret"));
    }

    #[test]
    fn test_default_field_for_unqualified_terms() {
        let tokens = crate::query::lexer::tokenize("heat").unwrap();
        let tree = crate::query::parser::Parser::new(tokens)
            .allow_unqualified()
            .parse()
            .unwrap();
        let generator = generator().with_default_field("title");
        assert_eq!(generator.generate(&tree).unwrap(), "txt_title:heat");
        // Without a default the unqualified term is rejected
        assert!(self::generator().generate(&tree).is_err());
    }

    #[test]
    fn test_escape_term_leaves_plain_values() {
        assert_eq!(escape_term("abc_123.x"), "abc_123.x");
        assert_eq!(escape_term("a b"), r"a\ b");
    }

    #[test]
    fn test_keyword_values_are_escaped() {
        assert_eq!(compile("lang:AND"), r"str_s_language:\AND");
        assert_eq!(compile("lang:OR lang:NOT"), r"str_s_language:\OR AND str_s_language:\NOT");
        assert_eq!(compile("pages:[TO TO *]"), r"int_pages:[\TO TO *]");
        // Only exact uppercase keywords are operators
        assert_eq!(escape_term("and"), "and");
        assert_eq!(escape_term("ANDROID"), "ANDROID");
    }

    #[test]
    fn test_long_or_chain() {
        let input = (0..100_000)
            .map(|i| format!("pages:{i}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        let output = compile(&input);
        assert!(output.starts_with("int_pages:0 OR int_pages:1 OR "));
        assert!(output.ends_with(" OR int_pages:99999"));
        assert!(!output.contains('('));
    }
}

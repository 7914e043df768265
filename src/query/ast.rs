//! Syntax tree of a parsed filter expression.

/// One bound of a range; `*` in the source means unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound {
    Value(String),
    Unbounded,
}

/// Node kinds, used for dispatch and precedence decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Word,
    Phrase,
    Range,
    Group,
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    Mandatory,
    Prohibited,
    Query,
}

/// Parsed filter expression. Each node owns its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
    Word {
        field: Option<String>,
        value: String,
    },
    Phrase {
        field: Option<String>,
        value: String,
    },
    Range {
        field: Option<String>,
        lower: Bound,
        upper: Bound,
        inclusive_lower: bool,
        inclusive_upper: bool,
    },
    /// Parenthesized sequence; members are implicitly AND-ed.
    Group(Vec<SyntaxNode>),
    /// Chain of two or more operands joined by `AND`.
    LogicalAnd(Vec<SyntaxNode>),
    /// Chain of two or more operands joined by `OR`.
    LogicalOr(Vec<SyntaxNode>),
    LogicalNot(Box<SyntaxNode>),
    Mandatory(Box<SyntaxNode>),
    Prohibited(Box<SyntaxNode>),
    /// Top-level sequence of space-separated clauses, implicitly AND-ed.
    Query(Vec<SyntaxNode>),
}

impl SyntaxNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Word { .. } => NodeKind::Word,
            Self::Phrase { .. } => NodeKind::Phrase,
            Self::Range { .. } => NodeKind::Range,
            Self::Group(_) => NodeKind::Group,
            Self::LogicalAnd(_) => NodeKind::LogicalAnd,
            Self::LogicalOr(_) => NodeKind::LogicalOr,
            Self::LogicalNot(_) => NodeKind::LogicalNot,
            Self::Mandatory(_) => NodeKind::Mandatory,
            Self::Prohibited(_) => NodeKind::Prohibited,
            Self::Query(_) => NodeKind::Query,
        }
    }

    /// Binding strength when rendered; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self.kind() {
            NodeKind::Query => 0,
            NodeKind::LogicalOr => 1,
            NodeKind::LogicalAnd => 2,
            NodeKind::LogicalNot | NodeKind::Mandatory | NodeKind::Prohibited => 3,
            NodeKind::Word | NodeKind::Phrase | NodeKind::Range | NodeKind::Group => 4,
        }
    }

    /// Append `other` to an AND chain, starting one if needed.
    pub fn and(self, other: SyntaxNode) -> Self {
        match self {
            Self::LogicalAnd(mut operands) => {
                operands.push(other);
                Self::LogicalAnd(operands)
            }
            node => Self::LogicalAnd(vec![node, other]),
        }
    }

    /// Append `other` to an OR chain, starting one if needed.
    pub fn or(self, other: SyntaxNode) -> Self {
        match self {
            Self::LogicalOr(mut operands) => {
                operands.push(other);
                Self::LogicalOr(operands)
            }
            node => Self::LogicalOr(vec![node, other]),
        }
    }

    pub fn negate(self) -> Self {
        Self::LogicalNot(Box::new(self))
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

    #[test]
    fn test_chains_stay_flat() {
        let chain = word("a", "1").or(word("b", "2")).or(word("c", "3"));
        assert_eq!(
            chain,
            SyntaxNode::LogicalOr(vec![word("a", "1"), word("b", "2"), word("c", "3")])
        );

        // A different operator nests instead of extending the chain
        let mixed = word("a", "1").and(word("b", "2")).or(word("c", "3"));
        assert_eq!(
            mixed,
            SyntaxNode::LogicalOr(vec![
                SyntaxNode::LogicalAnd(vec![word("a", "1"), word("b", "2")]),
                word("c", "3"),
            ])
        );
    }

    #[test]
    fn test_precedence_order() {
        let atom = word("a", "1");
        let not = atom.clone().negate();
        let and = atom.clone().and(atom.clone());
        let or = atom.clone().or(atom.clone());
        assert!(atom.precedence() > not.precedence());
        assert!(not.precedence() > and.precedence());
        assert!(and.precedence() > or.precedence());
        assert!(or.precedence() > SyntaxNode::Query(vec![]).precedence());
    }
}

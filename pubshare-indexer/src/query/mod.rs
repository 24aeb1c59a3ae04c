//! Filter compiler.
//!
//! Parsed expressions are compiled into a [`QueryTree`] made of the only
//! constructs the indexes can answer: equality, prefix match and disjunction.

mod parser;

pub use parser::{parse, CompareOp, FilterExpr, Operand};

use crate::error::{IndexError, IndexResult};
use crate::option::normalize_field_name;

/// A lookup against one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryLeaf {
    /// Exact match, answered by `find_by`.
    Eq { field: String, value: String },
    /// Prefix match, answered by `find_by_partial` with a trailing wildcard.
    StartsWith { field: String, prefix: String },
}

/// Compiled filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTree {
    Leaf(QueryLeaf),
    Or(Box<QueryTree>, Box<QueryTree>),
}

impl QueryTree {
    /// Returns the leaves in pre-order.
    pub fn leaves(&self) -> Vec<&QueryLeaf> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Self::Leaf(leaf) => out.push(leaf),
                Self::Or(left, right) => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        out
    }
}

/// Parses and compiles `filter`.
pub fn compile(filter: &str) -> IndexResult<QueryTree> {
    build(&parse(filter)?)
}

fn build(expr: &FilterExpr) -> IndexResult<QueryTree> {
    match expr {
        FilterExpr::Or(left, right) => Ok(QueryTree::Or(Box::new(build(left)?), Box::new(build(right)?))),
        FilterExpr::Compare {
            left: Operand::Field(field),
            op: CompareOp::Eq,
            right: Operand::Literal(value),
        } => Ok(QueryTree::Leaf(QueryLeaf::Eq {
            field: normalize_field_name(field),
            value: value.clone(),
        })),
        FilterExpr::Compare { op: CompareOp::Eq, .. } => Err(IndexError::NotSupported(
            "eq needs a field on the left and a literal on the right".to_string(),
        )),
        FilterExpr::Compare { op, .. } => Err(IndexError::NotSupported(format!("operator {op}"))),
        FilterExpr::Call { name, args } if name == "startswith" => match args.as_slice() {
            [Operand::Field(field), Operand::Literal(prefix)] => Ok(QueryTree::Leaf(QueryLeaf::StartsWith {
                field: normalize_field_name(field),
                prefix: prefix.clone(),
            })),
            _ => Err(IndexError::InvalidQuery(
                "startswith takes a field and a literal".to_string(),
            )),
        },
        FilterExpr::Call { name, .. } => Err(IndexError::NotSupported(format!("function {name}"))),
        FilterExpr::And(_, _) => Err(IndexError::NotSupported("operator and".to_string())),
        FilterExpr::Not(_) => Err(IndexError::NotSupported("operator not".to_string())),
    }
}

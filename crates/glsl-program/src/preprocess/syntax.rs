//! Syntax tree of a preprocessed file.

use std::fmt::Display;

use derive_more::derive::IsVariant;
use lalr_gen::Span;

/// A file: text runs and directives, in source order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct File {
    pub particles: Vec<Particle>,
}

#[derive(Clone, Debug, PartialEq, IsVariant)]
pub enum Particle {
    Text(String),
    Directive(Directive),
}

#[derive(Clone, Debug, PartialEq, IsVariant)]
pub enum Directive {
    Define(MacroDefinition),
    Undef(String),
    Error(String),
    Extension(String),
    Include { path: String, span: Span },
    Line { line: i64, source: Option<String> },
    Null,
    Pragma(String),
    Version { version: i64, profile: Option<String> },
    Conditional(Conditional),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MacroDefinition {
    pub name: String,
    /// `None` for object-like macros.
    pub params: Option<Vec<String>>,
    pub body: String,
}

/// `#if` / `#ifdef` / `#ifndef`, its `#elif`s, an optional `#else` and the `#endif`.
#[derive(Clone, Debug, PartialEq)]
pub struct Conditional {
    pub branches: Vec<Branch>,
    pub otherwise: Option<Vec<Particle>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    pub condition: Condition,
    pub body: Vec<Particle>,
}

#[derive(Clone, Debug, PartialEq, IsVariant)]
pub enum Condition {
    If(Expression),
    Ifdef(String),
    Ifndef(String),
}

#[derive(Clone, Debug, PartialEq, IsVariant)]
pub enum Expression {
    Int(i64),
    Defined(String),
    /// a macro name, evaluated as an expression. Function-like macros have arguments.
    Macro {
        name: String,
        args: Option<Vec<Expression>>,
    },
    Unary(UnaryOperator, Box<Expression>),
    Binary(BinaryOperator, Box<Expression>, Box<Expression>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
    Complement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    ShiftLeft,
    ShiftRight,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::Complement => "~",
        };
        f.write_str(op)
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            BinaryOperator::LogicalOr => "||",
            BinaryOperator::LogicalAnd => "&&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        };
        f.write_str(op)
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Int(i) => write!(f, "{i}"),
            Expression::Defined(name) => write!(f, "defined({name})"),
            Expression::Macro { name, args: None } => write!(f, "{name}"),
            Expression::Macro {
                name,
                args: Some(args),
            } => write!(
                f,
                "{name}({})",
                itertools::Itertools::format(args.iter(), ", ")
            ),
            Expression::Unary(op, expr) => write!(f, "{op}{expr}"),
            Expression::Binary(op, left, right) => write!(f, "({left} {op} {right})"),
        }
    }
}

/// Number of lines a list of particles occupies once translated.
pub(crate) fn line_count(particles: &[Particle]) -> usize {
    particles
        .iter()
        .map(|particle| match particle {
            Particle::Text(text) => text.matches('\n').count(),
            Particle::Directive(Directive::Conditional(cond)) => {
                let branches = cond
                    .branches
                    .iter()
                    .map(|branch| 1 + line_count(&branch.body))
                    .sum::<usize>();
                let otherwise = cond
                    .otherwise
                    .as_ref()
                    .map(|body| 1 + line_count(body))
                    .unwrap_or(0);
                branches + otherwise + 1
            }
            Particle::Directive(_) => 1,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expression_display() {
        let expr = Expression::Binary(
            BinaryOperator::LogicalAnd,
            Box::new(Expression::Defined("A".to_string())),
            Box::new(Expression::Unary(
                UnaryOperator::Not,
                Box::new(Expression::Macro {
                    name: "F".to_string(),
                    args: Some(vec![Expression::Int(1), Expression::Int(2)]),
                }),
            )),
        );
        assert_eq!(expr.to_string(), "(defined(A) && !F(1, 2))");
    }

    #[test]
    fn lines_of_skipped_particles() {
        let particles = vec![
            Particle::Text("a\nb\n".to_string()),
            Particle::Directive(Directive::Null),
            Particle::Directive(Directive::Conditional(Conditional {
                branches: vec![Branch {
                    condition: Condition::Ifdef("X".to_string()),
                    body: vec![Particle::Text("c\n".to_string())],
                }],
                otherwise: Some(vec![]),
            })),
        ];
        assert_eq!(line_count(&particles), 2 + 1 + (1 + 1) + 1 + 1);
    }
}

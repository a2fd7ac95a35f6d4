//! Evaluation of `#if` and `#elif` conditions.

use lalr_gen::Parser;

use super::{
    actions::PreprocessorActions,
    expand::substitute,
    grammar::PREPROCESSOR_TABLE,
    lexer::tokenize_expression,
    macros::MacroTable,
    syntax::{BinaryOperator, Expression, UnaryOperator},
    Message,
};
use crate::PreprocessError;

/// Parses a standalone constant expression, such as the body of a macro.
pub fn parse_expression(text: &str) -> Result<Expression, PreprocessError> {
    let table = PREPROCESSOR_TABLE.as_ref().map_err(|e| e.clone())?;
    let mut parser = Parser::new(table, tokenize_expression(text));
    let node = parser.parse(&mut PreprocessorActions)?;
    let expr = node
        .try_unwrap_expression()
        .map_err(|e| lalr_gen::ParseError::Semantic(e.to_string()))?;
    Ok(expr)
}

/// Evaluates expressions to 64-bit integers. Problems are logged and evaluate to 0.
pub(crate) struct Evaluator<'a> {
    macros: &'a MacroTable,
    max_depth: usize,
    log: &'a mut Vec<Message>,
    active: Vec<String>,
}

impl<'a> Evaluator<'a> {
    pub fn new(macros: &'a MacroTable, max_depth: usize, log: &'a mut Vec<Message>) -> Self {
        Self {
            macros,
            max_depth,
            log,
            active: Vec::new(),
        }
    }

    pub fn eval(&mut self, expr: &Expression) -> i64 {
        match expr {
            Expression::Int(i) => *i,
            Expression::Defined(name) => self.macros.is_defined(name) as i64,
            Expression::Macro { name, args } => self.eval_macro(name, args.as_deref()),
            Expression::Unary(op, operand) => {
                let value = self.eval(operand);
                match op {
                    UnaryOperator::Plus => value,
                    UnaryOperator::Minus => value.wrapping_neg(),
                    UnaryOperator::Not => (value == 0) as i64,
                    UnaryOperator::Complement => !value,
                }
            }
            Expression::Binary(BinaryOperator::LogicalAnd, left, right) => {
                (self.eval(left) != 0 && self.eval(right) != 0) as i64
            }
            Expression::Binary(BinaryOperator::LogicalOr, left, right) => {
                (self.eval(left) != 0 || self.eval(right) != 0) as i64
            }
            Expression::Binary(op, left, right) => {
                let l = self.eval(left);
                let r = self.eval(right);
                self.binary(*op, l, r)
            }
        }
    }

    fn binary(&mut self, op: BinaryOperator, l: i64, r: i64) -> i64 {
        match op {
            BinaryOperator::LogicalOr => (l != 0 || r != 0) as i64,
            BinaryOperator::LogicalAnd => (l != 0 && r != 0) as i64,
            BinaryOperator::BitOr => l | r,
            BinaryOperator::BitXor => l ^ r,
            BinaryOperator::BitAnd => l & r,
            BinaryOperator::Equal => (l == r) as i64,
            BinaryOperator::NotEqual => (l != r) as i64,
            BinaryOperator::Less => (l < r) as i64,
            BinaryOperator::Greater => (l > r) as i64,
            BinaryOperator::LessEqual => (l <= r) as i64,
            BinaryOperator::GreaterEqual => (l >= r) as i64,
            BinaryOperator::ShiftLeft => l.wrapping_shl(r as u32),
            BinaryOperator::ShiftRight => l.wrapping_shr(r as u32),
            BinaryOperator::Add => l.wrapping_add(r),
            BinaryOperator::Subtract => l.wrapping_sub(r),
            BinaryOperator::Multiply => l.wrapping_mul(r),
            BinaryOperator::Divide | BinaryOperator::Modulo if r == 0 => {
                self.log
                    .push(Message::error(format!("division by zero in `{l} {op} {r}`")));
                0
            }
            BinaryOperator::Divide => l.wrapping_div(r),
            BinaryOperator::Modulo => l.wrapping_rem(r),
        }
    }

    fn eval_macro(&mut self, name: &str, args: Option<&[Expression]>) -> i64 {
        let macros = self.macros;
        let Some(mac) = macros.get(name) else {
            self.log.push(Message::error(format!(
                "call to undefined macro `{name}`"
            )));
            return 0;
        };
        if self.active.iter().any(|n| n == name) {
            self.log.push(Message::error(format!(
                "recursive macro `{name}` cannot be evaluated"
            )));
            return 0;
        }
        if self.active.len() >= self.max_depth {
            self.log.push(Message::error(format!(
                "evaluation of macro `{name}` exceeds {} nested levels",
                self.max_depth
            )));
            return 0;
        }

        let body = match (&mac.params, args) {
            (None, None) => mac.body.clone(),
            (Some(params), Some(args)) if params.len() == args.len() => {
                let values = args
                    .iter()
                    .map(|arg| match self.eval(arg) {
                        v if v < 0 => format!("({v})"),
                        v => v.to_string(),
                    })
                    .collect::<Vec<_>>();
                substitute(&mac.body, params, &values)
            }
            (Some(params), Some(args)) => {
                self.log.push(Message::error(format!(
                    "macro `{name}` expects {} arguments, found {}",
                    params.len(),
                    args.len()
                )));
                return 0;
            }
            (Some(_), None) => {
                self.log.push(Message::error(format!(
                    "function-like macro `{name}` used without arguments"
                )));
                return 0;
            }
            (None, Some(_)) => {
                self.log.push(Message::error(format!(
                    "macro `{name}` is not function-like"
                )));
                return 0;
            }
        };

        let expr = match parse_expression(&body) {
            Ok(expr) => expr,
            Err(err) => {
                self.log.push(Message::error(format!(
                    "macro `{name}` is not an integer expression: {err}"
                )));
                return 0;
            }
        };
        self.active.push(name.to_string());
        let value = self.eval(&expr);
        self.active.pop();
        value
    }
}

use derive_more::derive::TryUnwrap;
use glsl_parse::syntax::parse_int;
use lalr_gen::{BodyCursor, Matched, ParseError, ProductionId, SemanticActions, Token};

use super::{
    grammar::{rule, Rule},
    syntax::*,
};

#[derive(Debug)]
pub(crate) struct ElsePart {
    elifs: Vec<Branch>,
    otherwise: Option<Vec<Particle>>,
}

#[derive(Debug, TryUnwrap)]
pub(crate) enum Node {
    File(File),
    Particles(Vec<Particle>),
    Particle(Particle),
    Directive(Directive),
    Tokens(Vec<Token>),
    Formals(Vec<String>),
    Branch(Branch),
    Branches(Vec<Branch>),
    Else(ElsePart),
    Condition(Condition),
    Expression(Expression),
    Arguments(Vec<Expression>),
    /// `#else` and `#endif`, which carry nothing.
    Marker,
}

macro_rules! take {
    ($body:ident, $unwrap:ident) => {
        $body
            .node()?
            .$unwrap()
            .map_err(|err| ParseError::Semantic(err.to_string()))?
    };
}

/// Joins tokens with a single space where the source had whitespace between them.
pub(crate) fn join_tokens(tokens: &[Token]) -> String {
    let mut text = String::new();
    let mut previous_end = None;
    for token in tokens {
        if previous_end.is_some_and(|end| end < token.span.start) {
            text.push(' ');
        }
        text.push_str(&token.text);
        previous_end = Some(token.span.end);
    }
    text
}

fn unquote(text: &str) -> String {
    text.trim_matches('"').to_string()
}

fn int(token: &Token) -> Result<i64, ParseError> {
    parse_int(&token.text)
        .ok_or_else(|| ParseError::Semantic(format!("invalid integer `{}`", token.text)))
}

fn binary_operator(rule: Rule) -> Option<BinaryOperator> {
    let op = match rule {
        Rule::LogicalOr => BinaryOperator::LogicalOr,
        Rule::LogicalAnd => BinaryOperator::LogicalAnd,
        Rule::BitOr => BinaryOperator::BitOr,
        Rule::BitXor => BinaryOperator::BitXor,
        Rule::BitAnd => BinaryOperator::BitAnd,
        Rule::Equal => BinaryOperator::Equal,
        Rule::NotEqual => BinaryOperator::NotEqual,
        Rule::Less => BinaryOperator::Less,
        Rule::Greater => BinaryOperator::Greater,
        Rule::LessEqual => BinaryOperator::LessEqual,
        Rule::GreaterEqual => BinaryOperator::GreaterEqual,
        Rule::ShiftLeft => BinaryOperator::ShiftLeft,
        Rule::ShiftRight => BinaryOperator::ShiftRight,
        Rule::Add => BinaryOperator::Add,
        Rule::Subtract => BinaryOperator::Subtract,
        Rule::Multiply => BinaryOperator::Multiply,
        Rule::Divide => BinaryOperator::Divide,
        Rule::Modulo => BinaryOperator::Modulo,
        _ => return None,
    };
    Some(op)
}

fn unary_operator(rule: Rule) -> Option<UnaryOperator> {
    let op = match rule {
        Rule::UnaryPlus => UnaryOperator::Plus,
        Rule::UnaryMinus => UnaryOperator::Minus,
        Rule::UnaryNot => UnaryOperator::Not,
        Rule::UnaryComplement => UnaryOperator::Complement,
        _ => return None,
    };
    Some(op)
}

/// Builds the [`File`] (or the [`Expression`]) of the preprocessor grammar.
pub(crate) struct PreprocessorActions;

impl SemanticActions for PreprocessorActions {
    type Node = Node;

    fn expand_parse_tree(
        &mut self,
        production: ProductionId,
        body: Vec<Matched<Node>>,
    ) -> Result<Node, ParseError> {
        let rule = rule(production).ok_or(ParseError::UnknownProduction(production))?;
        let mut body = BodyCursor::new(production, body);

        if let Some(op) = binary_operator(rule) {
            let left = take!(body, try_unwrap_expression);
            body.skip()?;
            let right = take!(body, try_unwrap_expression);
            return Ok(Node::Expression(Expression::Binary(
                op,
                Box::new(left),
                Box::new(right),
            )));
        }
        if let Some(op) = unary_operator(rule) {
            body.skip()?;
            let operand = take!(body, try_unwrap_expression);
            return Ok(Node::Expression(Expression::Unary(op, Box::new(operand))));
        }

        let node = match rule {
            Rule::Start
            | Rule::DirectiveDefine
            | Rule::DirectiveUndef
            | Rule::DirectiveError
            | Rule::DirectiveExtension
            | Rule::DirectiveInclude
            | Rule::DirectiveLine
            | Rule::DirectiveNull
            | Rule::DirectivePragma
            | Rule::DirectiveVersion
            | Rule::DirectiveConditional
            | Rule::ConstantExpression
            | Rule::LogicalOrSingle
            | Rule::LogicalAndSingle
            | Rule::BitOrSingle
            | Rule::BitXorSingle
            | Rule::BitAndSingle
            | Rule::EqualitySingle
            | Rule::RelationalSingle
            | Rule::ShiftSingle
            | Rule::AdditiveSingle
            | Rule::MultiplicativeSingle
            | Rule::UnarySingle
            | Rule::PrimaryDefined
            | Rule::PrimaryMacro => body.node()?,

            Rule::Program => Node::File(File {
                particles: take!(body, try_unwrap_particles),
            }),
            Rule::ExpressionProgram => {
                body.skip()?;
                body.node()?
            }
            Rule::ParticlesEmpty => Node::Particles(Vec::new()),
            Rule::ParticlesAppend => {
                let mut list = take!(body, try_unwrap_particles);
                list.push(take!(body, try_unwrap_particle));
                Node::Particles(list)
            }
            Rule::ParticleText => Node::Particle(Particle::Text(body.token()?.text)),
            Rule::ParticleDirective => {
                Node::Particle(Particle::Directive(take!(body, try_unwrap_directive)))
            }

            Rule::DefineEmpty
            | Rule::DefineObject
            | Rule::DefineNoParamsEmpty
            | Rule::DefineNoParams
            | Rule::DefineParamsEmpty
            | Rule::DefineParams => {
                body.skip()?;
                let name = body.token()?.text;
                let params = match rule {
                    Rule::DefineNoParamsEmpty | Rule::DefineNoParams => {
                        body.skip()?;
                        body.skip()?;
                        Some(Vec::new())
                    }
                    Rule::DefineParamsEmpty | Rule::DefineParams => {
                        body.skip()?;
                        let formals = take!(body, try_unwrap_formals);
                        body.skip()?;
                        Some(formals)
                    }
                    _ => None,
                };
                let tokens = match rule {
                    Rule::DefineObject | Rule::DefineNoParams | Rule::DefineParams => {
                        take!(body, try_unwrap_tokens)
                    }
                    _ => Vec::new(),
                };
                Node::Directive(Directive::Define(MacroDefinition {
                    name,
                    params,
                    body: join_tokens(&tokens),
                }))
            }
            Rule::TokensFirst => Node::Tokens(vec![body.token()?]),
            Rule::TokensAppend => {
                let mut list = take!(body, try_unwrap_tokens);
                list.push(body.token()?);
                Node::Tokens(list)
            }
            Rule::FormalsFirst => Node::Formals(vec![body.token()?.text]),
            Rule::FormalsAppend => {
                let mut list = take!(body, try_unwrap_formals);
                body.skip()?;
                list.push(body.token()?.text);
                Node::Formals(list)
            }

            Rule::ErrorEmpty | Rule::ExtensionEmpty | Rule::PragmaEmpty => {
                let text = String::new();
                Node::Directive(match rule {
                    Rule::ErrorEmpty => Directive::Error(text),
                    Rule::ExtensionEmpty => Directive::Extension(text),
                    _ => Directive::Pragma(text),
                })
            }
            Rule::Error | Rule::Extension | Rule::Pragma => {
                body.skip()?;
                let text = join_tokens(&take!(body, try_unwrap_tokens));
                Node::Directive(match rule {
                    Rule::Error => Directive::Error(text),
                    Rule::Extension => Directive::Extension(text),
                    _ => Directive::Pragma(text),
                })
            }
            Rule::Include => {
                body.skip()?;
                let token = body.token()?;
                Node::Directive(Directive::Include {
                    path: unquote(&token.text),
                    span: token.span,
                })
            }
            Rule::Line | Rule::LineString | Rule::LineSource => {
                body.skip()?;
                let line = int(&body.token()?)?;
                let source = match rule {
                    Rule::Line => None,
                    _ => Some(unquote(&body.token()?.text)),
                };
                Node::Directive(Directive::Line { line, source })
            }
            Rule::Null => Node::Directive(Directive::Null),
            Rule::Undef => {
                body.skip()?;
                Node::Directive(Directive::Undef(body.token()?.text))
            }
            Rule::Version | Rule::VersionProfile => {
                body.skip()?;
                let version = int(&body.token()?)?;
                let profile = match rule {
                    Rule::VersionProfile => Some(body.token()?.text),
                    _ => None,
                };
                Node::Directive(Directive::Version { version, profile })
            }

            Rule::Conditional | Rule::ConditionalElse => {
                let first = take!(body, try_unwrap_branch);
                let ElsePart { elifs, otherwise } = match rule {
                    Rule::ConditionalElse => take!(body, try_unwrap_else),
                    _ => ElsePart {
                        elifs: Vec::new(),
                        otherwise: None,
                    },
                };
                let mut branches = vec![first];
                branches.extend(elifs);
                Node::Directive(Directive::Conditional(Conditional {
                    branches,
                    otherwise,
                }))
            }
            Rule::IfPart | Rule::IfdefPart | Rule::IfndefPart | Rule::ElifPart => {
                let condition = take!(body, try_unwrap_condition);
                let particles = take!(body, try_unwrap_particles);
                Node::Branch(Branch {
                    condition,
                    body: particles,
                })
            }
            Rule::ElifPartsFirst => Node::Branches(vec![take!(body, try_unwrap_branch)]),
            Rule::ElifPartsAppend => {
                let mut list = take!(body, try_unwrap_branches);
                list.push(take!(body, try_unwrap_branch));
                Node::Branches(list)
            }
            Rule::ElseElifs | Rule::ElseElifsElse => {
                let elifs = take!(body, try_unwrap_branches);
                let otherwise = match rule {
                    Rule::ElseElifsElse => {
                        body.skip()?;
                        Some(take!(body, try_unwrap_particles))
                    }
                    _ => None,
                };
                Node::Else(ElsePart { elifs, otherwise })
            }
            Rule::ElseOnly => {
                body.skip()?;
                Node::Else(ElsePart {
                    elifs: Vec::new(),
                    otherwise: Some(take!(body, try_unwrap_particles)),
                })
            }
            Rule::IfDirective | Rule::ElifDirective => {
                body.skip()?;
                Node::Condition(Condition::If(take!(body, try_unwrap_expression)))
            }
            Rule::IfdefDirective => {
                body.skip()?;
                Node::Condition(Condition::Ifdef(body.token()?.text))
            }
            Rule::IfndefDirective => {
                body.skip()?;
                Node::Condition(Condition::Ifndef(body.token()?.text))
            }
            Rule::ElseDirective | Rule::EndifDirective => Node::Marker,

            Rule::MacroObject => Node::Expression(Expression::Macro {
                name: body.token()?.text,
                args: None,
            }),
            Rule::MacroCallEmpty | Rule::MacroCall => {
                let name = body.token()?.text;
                body.skip()?;
                let args = match rule {
                    Rule::MacroCall => take!(body, try_unwrap_arguments),
                    _ => Vec::new(),
                };
                Node::Expression(Expression::Macro {
                    name,
                    args: Some(args),
                })
            }
            Rule::ArgumentsFirst => Node::Arguments(vec![take!(body, try_unwrap_expression)]),
            Rule::ArgumentsAppend => {
                let mut list = take!(body, try_unwrap_arguments);
                body.skip()?;
                list.push(take!(body, try_unwrap_expression));
                Node::Arguments(list)
            }
            Rule::DefinedParens => {
                body.skip()?;
                body.skip()?;
                Node::Expression(Expression::Defined(body.token()?.text))
            }
            Rule::Defined => {
                body.skip()?;
                Node::Expression(Expression::Defined(body.token()?.text))
            }
            Rule::PrimaryInt => Node::Expression(Expression::Int(int(&body.token()?)?)),
            Rule::PrimaryParens => {
                body.skip()?;
                body.node()?
            }

            // operators are handled above.
            _ => return Err(ParseError::UnknownProduction(production)),
        };

        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use lalr_gen::Span;

    use super::*;

    #[test]
    fn joined_tokens_keep_single_spaces() {
        let tokens = [
            Token::new(0, "(", Span::new(10..11)),
            Token::new(0, "x", Span::new(11..12)),
            Token::new(0, ")", Span::new(12..13)),
            Token::new(0, "+", Span::new(16..17)),
            Token::new(0, "1", Span::new(18..19)),
        ];
        assert_eq!(join_tokens(&tokens), "(x) + 1");
        assert_eq!(join_tokens(&[]), "");
    }
}

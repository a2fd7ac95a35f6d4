//! The annotation mini-language of `//$` and `/*$ */` comments.
//!
//! An annotation is a list of tags, separated by whitespace or commas. A tag assigns one value
//! or a bracketed list of values to one or more names:
//!
//! ```text
//! //$ @name = "Light color", @min = @softMin = 0.0 @default = [1, 1, 1]
//! ```

use std::{fmt::Display, sync::LazyLock};

use derive_more::derive::{IsVariant, TryUnwrap};
use itertools::Itertools;
use lalr_gen::{
    BodyCursor, Construction, Grammar, GrammarBuilder, GrammarError, Matched, ParseError,
    ParserTable, ProductionId, SemanticActions, Span, SymbolId, SymbolRole, Token,
};
use logos::Logos;

use crate::{syntax::parse_int, Error};

#[derive(Logos, Clone, Copy, Debug, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum AnnotationToken {
    #[token("@")]
    At,
    #[token("=")]
    Equal,
    #[token("[")]
    BracketLeft,
    #[token("]")]
    BracketRight,
    #[token(",")]
    Comma,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[regex(r"[+-]?[0-9]+")]
    #[regex(r"[+-]?0[xX][0-9a-fA-F]+")]
    IntConstant,
    #[regex(r"[+-]?([0-9]+\.[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?[fF]?")]
    #[regex(r"[+-]?[0-9]+[eE][+-]?[0-9]+[fF]?")]
    FloatConstant,
    #[regex(r#""[^"]*""#)]
    String,
    #[regex(r"'[^']*'")]
    Character,
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,
    Invalid,
}

impl AnnotationToken {
    const TERMINALS: &'static [AnnotationToken] = &[
        AnnotationToken::At,
        AnnotationToken::Equal,
        AnnotationToken::BracketLeft,
        AnnotationToken::BracketRight,
        AnnotationToken::Comma,
        AnnotationToken::True,
        AnnotationToken::False,
        AnnotationToken::IntConstant,
        AnnotationToken::FloatConstant,
        AnnotationToken::String,
        AnnotationToken::Character,
        AnnotationToken::Identifier,
        AnnotationToken::Invalid,
    ];

    pub fn id(self) -> SymbolId {
        self as SymbolId
    }
}

impl Display for AnnotationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AnnotationToken::At => "@",
            AnnotationToken::Equal => "=",
            AnnotationToken::BracketLeft => "[",
            AnnotationToken::BracketRight => "]",
            AnnotationToken::Comma => ",",
            AnnotationToken::True => "true",
            AnnotationToken::False => "false",
            AnnotationToken::IntConstant => "INTCONSTANT",
            AnnotationToken::FloatConstant => "FLOATCONSTANT",
            AnnotationToken::String => "STRING",
            AnnotationToken::Character => "CHARACTER",
            AnnotationToken::Identifier => "IDENTIFIER",
            AnnotationToken::Invalid => "INVALID",
        };
        f.write_str(name)
    }
}

/// Tokenizes annotation text. `offset` is added to every span, so that spans refer to the
/// shader source the annotation comment was taken from.
pub fn tokenize(text: &str, offset: usize) -> impl Iterator<Item = Token> + '_ {
    AnnotationToken::lexer(text)
        .spanned()
        .map(move |(kind, span)| {
            let kind = kind.unwrap_or(AnnotationToken::Invalid);
            Token::new(
                kind.id(),
                &text[span.clone()],
                Span::new(span).shifted(offset),
            )
        })
}

#[derive(Clone, Debug, PartialEq, IsVariant)]
pub enum AnnotationValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    /// a string, without its quotes.
    String(String),
    /// a character literal, without its quotes.
    Char(String),
}

impl Display for AnnotationValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnotationValue::Bool(b) => write!(f, "{b}"),
            AnnotationValue::Int(i) => write!(f, "{i}"),
            AnnotationValue::Float(x) => write!(f, "{x:?}"),
            AnnotationValue::String(s) => write!(f, "\"{s}\""),
            AnnotationValue::Char(c) => write!(f, "'{c}'"),
        }
    }
}

/// One tag of an annotation, e.g. `@min = 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub name: String,
    pub values: Vec<AnnotationValue>,
}

impl Display for Annotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.values.as_slice() {
            [value] => write!(f, "@{} = {value}", self.name),
            values => write!(
                f,
                "@{} = [{}]",
                self.name,
                values.iter().format(", ")
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rule {
    Start,
    TagListFirst,
    TagListAppend,
    TagListComma,
    TagList,
    TagSingle,
    AssignmentFirst,
    AssignmentAppend,
    TagName,
    ValuesFirst,
    ValuesAppend,
    True,
    False,
    Int,
    Float,
    String,
    Char,
}

const RULES: &[(Rule, &str, &str)] = &[
    (Rule::Start, "$START$", "tag-list"),
    (Rule::TagListFirst, "tag-list", "tag"),
    (Rule::TagListAppend, "tag-list", "tag-list tag"),
    (Rule::TagListComma, "tag-list", "tag-list , tag"),
    (Rule::TagList, "tag", "tag-assignment [ value-list ]"),
    (Rule::TagSingle, "tag", "tag-assignment single-value"),
    (Rule::AssignmentFirst, "tag-assignment", "tag-name ="),
    (Rule::AssignmentAppend, "tag-assignment", "tag-assignment tag-name ="),
    (Rule::TagName, "tag-name", "@ IDENTIFIER"),
    (Rule::ValuesFirst, "value-list", "single-value"),
    (Rule::ValuesAppend, "value-list", "value-list , single-value"),
    (Rule::True, "single-value", "true"),
    (Rule::False, "single-value", "false"),
    (Rule::Int, "single-value", "INTCONSTANT"),
    (Rule::Float, "single-value", "FLOATCONSTANT"),
    (Rule::String, "single-value", "STRING"),
    (Rule::Char, "single-value", "CHARACTER"),
];

pub fn annotation_grammar() -> Result<Grammar, GrammarError> {
    let mut builder = GrammarBuilder::new();
    for kind in AnnotationToken::TERMINALS {
        builder.add_terminal(&kind.to_string(), kind.id(), SymbolRole::Common)?;
    }
    builder.add_rules(RULES)?;
    builder.build()
}

pub static ANNOTATION_TABLE: LazyLock<Result<ParserTable, GrammarError>> =
    LazyLock::new(|| annotation_grammar()?.create_parser_table(Construction::Unioned));

#[derive(Debug, TryUnwrap)]
enum Node {
    Tags(Vec<Annotation>),
    Names(Vec<String>),
    Values(Vec<AnnotationValue>),
    Value(AnnotationValue),
}

macro_rules! take {
    ($body:ident, $unwrap:ident) => {
        $body
            .node()?
            .$unwrap()
            .map_err(|err| ParseError::Semantic(err.to_string()))?
    };
}

fn unquote(text: &str) -> String {
    text.get(1..text.len().saturating_sub(1))
        .unwrap_or_default()
        .to_string()
}

struct AnnotationActions;

impl SemanticActions for AnnotationActions {
    type Node = Node;

    fn expand_parse_tree(
        &mut self,
        production: ProductionId,
        body: Vec<Matched<Node>>,
    ) -> Result<Node, ParseError> {
        let rule = RULES
            .get(production as usize)
            .map(|(rule, _, _)| *rule)
            .ok_or(ParseError::UnknownProduction(production))?;
        let mut body = BodyCursor::new(production, body);

        let node = match rule {
            Rule::Start | Rule::TagListFirst => body.node()?,
            Rule::TagListAppend | Rule::TagListComma => {
                let mut tags = take!(body, try_unwrap_tags);
                if rule == Rule::TagListComma {
                    body.skip()?;
                }
                tags.extend(take!(body, try_unwrap_tags));
                Node::Tags(tags)
            }
            Rule::TagList | Rule::TagSingle => {
                let names = take!(body, try_unwrap_names);
                let values = match rule {
                    Rule::TagList => {
                        body.skip()?;
                        take!(body, try_unwrap_values)
                    }
                    _ => vec![take!(body, try_unwrap_value)],
                };
                let tags = names
                    .into_iter()
                    .map(|name| Annotation {
                        name,
                        values: values.clone(),
                    })
                    .collect();
                Node::Tags(tags)
            }
            Rule::AssignmentFirst => Node::Names(take!(body, try_unwrap_names)),
            Rule::AssignmentAppend => {
                let mut names = take!(body, try_unwrap_names);
                names.extend(take!(body, try_unwrap_names));
                Node::Names(names)
            }
            Rule::TagName => {
                body.skip()?;
                Node::Names(vec![body.token()?.text])
            }
            Rule::ValuesFirst => Node::Values(vec![take!(body, try_unwrap_value)]),
            Rule::ValuesAppend => {
                let mut values = take!(body, try_unwrap_values);
                body.skip()?;
                values.push(take!(body, try_unwrap_value));
                Node::Values(values)
            }
            Rule::True => Node::Value(AnnotationValue::Bool(true)),
            Rule::False => Node::Value(AnnotationValue::Bool(false)),
            Rule::Int => {
                let text = body.token()?.text;
                let (negative, digits) = match text.strip_prefix('-') {
                    Some(digits) => (true, digits),
                    None => (false, text.trim_start_matches('+')),
                };
                let value = parse_int(digits)
                    .ok_or_else(|| ParseError::Semantic(format!("invalid integer `{text}`")))?;
                Node::Value(AnnotationValue::Int(if negative { -value } else { value }))
            }
            Rule::Float => {
                let text = body.token()?.text;
                let value = text
                    .trim_end_matches(['f', 'F'])
                    .parse()
                    .map_err(|_| ParseError::Semantic(format!("invalid float `{text}`")))?;
                Node::Value(AnnotationValue::Float(value))
            }
            Rule::String => Node::Value(AnnotationValue::String(unquote(&body.token()?.text))),
            Rule::Char => Node::Value(AnnotationValue::Char(unquote(&body.token()?.text))),
        };

        Ok(node)
    }
}

/// Parses the content of an annotation comment. `offset` is the position of `text` in the
/// shader source, used for error spans.
pub fn parse_annotation(text: &str, offset: usize) -> Result<Vec<Annotation>, Error> {
    let table = ANNOTATION_TABLE
        .as_ref()
        .map_err(|e| Error::Grammar(e.clone()))?;
    let mut parser = lalr_gen::Parser::new(table, tokenize(text, offset));
    let node = parser.parse(&mut AnnotationActions)?;
    node.try_unwrap_tags()
        .map_err(|err| Error::Parse(ParseError::Semantic(err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_conflict_free() {
        if let Err(err) = &*ANNOTATION_TABLE {
            panic!("{err}");
        }
    }

    #[test]
    fn single_values() {
        let tags = parse_annotation(r#" @name = "Light color" @min = -1 @max = 2.5f"#, 0).unwrap();
        assert_eq!(
            tags,
            vec![
                Annotation {
                    name: "name".to_string(),
                    values: vec![AnnotationValue::String("Light color".to_string())],
                },
                Annotation {
                    name: "min".to_string(),
                    values: vec![AnnotationValue::Int(-1)],
                },
                Annotation {
                    name: "max".to_string(),
                    values: vec![AnnotationValue::Float(2.5)],
                },
            ]
        );
    }

    #[test]
    fn chained_names_and_lists() {
        let tags = parse_annotation("@a = @b = [true, 'x', 0x10], @c = false", 0).unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].name, "a");
        assert_eq!(tags[1].name, "b");
        assert_eq!(tags[0].values, tags[1].values);
        assert_eq!(
            tags[0].values,
            vec![
                AnnotationValue::Bool(true),
                AnnotationValue::Char("x".to_string()),
                AnnotationValue::Int(16),
            ]
        );
        assert_eq!(tags[2].to_string(), "@c = false");
        assert_eq!(tags[0].to_string(), "@a = [true, 'x', 16]");
    }

    #[test]
    fn malformed_annotation_is_an_error() {
        let err = parse_annotation("@name \"x\"", 100).unwrap_err();
        let Error::Parse(ParseError::UnexpectedToken { found, span, .. }) = err else {
            panic!("expected an unexpected token, got {err}");
        };
        assert_eq!(found, "\"x\"");
        assert_eq!(span, Span::new(106..109));
    }
}

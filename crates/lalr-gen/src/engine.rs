//! A table-driven shift-reduce parser, generic over the tables and the tree it builds.

use std::borrow::Cow;

use itertools::Itertools;

use crate::{error::ParseError, span::Span, Action, Production, ProductionId, StateId, SymbolId};

/// A lexer token. `symbol` is the terminal id the grammar knows the token by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub symbol: SymbolId,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(symbol: SymbolId, text: impl Into<String>, span: Span) -> Self {
        Self {
            symbol,
            text: text.into(),
            span,
        }
    }
}

/// What the shift-reduce engine needs to know about a parser table.
pub trait ParserTables {
    fn action(&self, state: StateId, symbol: SymbolId) -> Action;
    fn goto_state(&self, state: StateId, symbol: SymbolId) -> Option<StateId>;
    fn production(&self, id: ProductionId) -> Option<&Production>;
    fn symbol_name(&self, id: SymbolId) -> Cow<'_, str>;
    fn end_symbol(&self) -> SymbolId;

    /// Terminals with an action in this state, used in error messages.
    fn expected_symbols(&self, _state: StateId) -> Vec<SymbolId> {
        Vec::new()
    }

    /// Whether a token of kind `actual` was accepted in place of `expected`.
    fn is_proxy_symbol(&self, _expected: SymbolId, _actual: SymbolId) -> bool {
        false
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MatchedValue<N> {
    Token(Token),
    Node(N),
}

/// One element of a reduced production body: a shifted token or an already built node.
#[derive(Clone, Debug, PartialEq)]
pub struct Matched<N> {
    pub symbol: SymbolId,
    pub value: MatchedValue<N>,
}

impl<N> Matched<N> {
    pub fn token(&self) -> Option<&Token> {
        match &self.value {
            MatchedValue::Token(token) => Some(token),
            MatchedValue::Node(_) => None,
        }
    }

    pub fn into_token(self) -> Option<Token> {
        match self.value {
            MatchedValue::Token(token) => Some(token),
            MatchedValue::Node(_) => None,
        }
    }

    pub fn into_node(self) -> Option<N> {
        match self.value {
            MatchedValue::Node(node) => Some(node),
            MatchedValue::Token(_) => None,
        }
    }

    /// Text of a token element.
    pub fn text(&self) -> Option<&str> {
        self.token().map(|token| token.text.as_str())
    }
}

/// Builds nodes when the parser reduces a production.
pub trait SemanticActions {
    type Node;

    /// `body` has one element per body symbol of the production, in order.
    fn expand_parse_tree(
        &mut self,
        production: ProductionId,
        body: Vec<Matched<Self::Node>>,
    ) -> Result<Self::Node, ParseError>;
}

/// Takes the elements of a reduced production body one by one, in order.
pub struct BodyCursor<N> {
    production: ProductionId,
    items: std::vec::IntoIter<Matched<N>>,
}

impl<N> BodyCursor<N> {
    pub fn new(production: ProductionId, body: Vec<Matched<N>>) -> Self {
        Self {
            production,
            items: body.into_iter(),
        }
    }

    fn next(&mut self, what: &str) -> Result<Matched<N>, ParseError> {
        self.items.next().ok_or_else(|| {
            ParseError::Semantic(format!(
                "production {}: body too short, expected a {what}",
                self.production
            ))
        })
    }

    pub fn token(&mut self) -> Result<Token, ParseError> {
        let production = self.production;
        self.next("token")?.into_token().ok_or_else(|| {
            ParseError::Semantic(format!("production {production}: expected a token"))
        })
    }

    pub fn node(&mut self) -> Result<N, ParseError> {
        let production = self.production;
        self.next("node")?.into_node().ok_or_else(|| {
            ParseError::Semantic(format!("production {production}: expected a node"))
        })
    }

    /// Drops the next element, usually punctuation.
    pub fn skip(&mut self) -> Result<(), ParseError> {
        self.next("symbol").map(|_| ())
    }
}

/// Drives a parser table over a token stream. After the stream is exhausted, the parser
/// feeds end-of-input tokens positioned at the end of the last token.
pub struct Parser<'t, T: ParserTables, I: Iterator<Item = Token>> {
    tables: &'t T,
    tokens: I,
    last_end: usize,
    log: Vec<String>,
}

impl<'t, T: ParserTables, I: Iterator<Item = Token>> Parser<'t, T, I> {
    pub fn new(tables: &'t T, tokens: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            tables,
            tokens: tokens.into_iter(),
            last_end: 0,
            log: Vec::new(),
        }
    }

    /// Error messages produced so far, each with the state stack at the time of the error.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    fn next_token(&mut self) -> Token {
        match self.tokens.next() {
            Some(token) => {
                self.last_end = token.span.end;
                token
            }
            None => Token::new(
                self.tables.end_symbol(),
                "",
                Span::empty_at(self.last_end),
            ),
        }
    }

    /// Parses the whole token stream. Returns the node of the start production's body.
    pub fn parse<A: SemanticActions>(&mut self, actions: &mut A) -> Result<A::Node, ParseError> {
        let tables = self.tables;
        let mut states: Vec<StateId> = vec![0];
        let mut stack: Vec<Matched<A::Node>> = Vec::new();
        let mut lookahead = self.next_token();

        loop {
            let state = states.last().copied().unwrap_or_default();
            let action = tables.action(state, lookahead.symbol);
            log::trace!(
                "state {state}, lookahead `{}`: {action}",
                tables.symbol_name(lookahead.symbol)
            );

            match action {
                Action::Transition(next) => {
                    states.push(next);
                    stack.push(Matched {
                        symbol: lookahead.symbol,
                        value: MatchedValue::Token(lookahead),
                    });
                    lookahead = self.next_token();
                }
                Action::Reduce(id) => {
                    let prod = tables
                        .production(id)
                        .ok_or(ParseError::UnknownProduction(id))?;
                    let len = prod.len();
                    if stack.len() < len {
                        return Err(ParseError::StackMismatch {
                            production: id,
                            expected: format!("{len} symbols"),
                            found: format!("{} symbols", stack.len()),
                        });
                    }

                    let body = stack.split_off(stack.len() - len);
                    for (expected, matched) in prod.body().iter().zip(&body) {
                        if *expected != matched.symbol
                            && !tables.is_proxy_symbol(*expected, matched.symbol)
                        {
                            return Err(ParseError::StackMismatch {
                                production: id,
                                expected: tables.symbol_name(*expected).into_owned(),
                                found: tables.symbol_name(matched.symbol).into_owned(),
                            });
                        }
                    }
                    states.truncate(states.len() - len);

                    let node = actions.expand_parse_tree(id, body)?;
                    let top = states.last().copied().unwrap_or_default();
                    let next = tables.goto_state(top, prod.head()).ok_or_else(|| {
                        ParseError::MissingGoto(top, tables.symbol_name(prod.head()).into_owned())
                    })?;
                    states.push(next);
                    stack.push(Matched {
                        symbol: prod.head(),
                        value: MatchedValue::Node(node),
                    });
                }
                Action::Accept => {
                    return match stack.pop().map(|matched| matched.value) {
                        Some(MatchedValue::Node(node)) => Ok(node),
                        _ => Err(ParseError::Semantic(
                            "input accepted without a parse tree".to_string(),
                        )),
                    };
                }
                Action::Error => return Err(self.syntax_error(&states, lookahead)),
            }
        }
    }

    fn syntax_error(&mut self, states: &[StateId], lookahead: Token) -> ParseError {
        let state = states.last().copied().unwrap_or_default();
        let expected = self
            .tables
            .expected_symbols(state)
            .into_iter()
            .map(|sym| self.tables.symbol_name(sym).into_owned())
            .collect_vec();

        let err = if lookahead.symbol == self.tables.end_symbol() {
            ParseError::UnexpectedEof {
                expected,
                span: lookahead.span,
            }
        } else {
            ParseError::UnexpectedToken {
                found: lookahead.text,
                expected,
                span: lookahead.span,
            }
        };

        let message = format!("{err} (state stack: {})", states.iter().format(" "));
        log::warn!("{message}");
        self.log.push(message);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Construction, GrammarBuilder, ParserTable, SymbolRole};

    const LPAREN: SymbolId = 1;
    const RPAREN: SymbolId = 2;

    fn parens_table() -> ParserTable {
        let mut builder = GrammarBuilder::new();
        builder.add_terminal("(", LPAREN, SymbolRole::Common).unwrap();
        builder.add_terminal(")", RPAREN, SymbolRole::Common).unwrap();
        builder.add_production("$START$", "S").unwrap();
        builder.add_production("S", "( S )").unwrap();
        builder.add_production("S", "").unwrap();
        let grammar = builder.build().unwrap();
        grammar.create_parser_table(Construction::Unioned).unwrap()
    }

    fn tokens(source: &str) -> Vec<Token> {
        source
            .char_indices()
            .map(|(i, c)| {
                let symbol = if c == '(' { LPAREN } else { RPAREN };
                Token::new(symbol, c.to_string(), Span::new(i..i + 1))
            })
            .collect()
    }

    /// Computes the nesting depth.
    struct Depth;

    impl SemanticActions for Depth {
        type Node = usize;

        fn expand_parse_tree(
            &mut self,
            production: ProductionId,
            mut body: Vec<Matched<usize>>,
        ) -> Result<usize, ParseError> {
            match production {
                1 => {
                    let inner = body.swap_remove(1).into_node().unwrap_or_default();
                    Ok(inner + 1)
                }
                2 => Ok(0),
                _ => Err(ParseError::UnknownProduction(production)),
            }
        }
    }

    #[test]
    fn accepts_balanced_parentheses() {
        let table = parens_table();
        for (source, depth) in [("", 0), ("()", 1), ("(())", 2), ("((()))", 3)] {
            let mut parser = Parser::new(&table, tokens(source));
            assert_eq!(parser.parse(&mut Depth), Ok(depth), "{source}");
            assert!(parser.log().is_empty());
        }
    }

    #[test]
    fn rejects_unbalanced_parentheses() {
        let table = parens_table();

        let mut parser = Parser::new(&table, tokens("(()"));
        let err = parser.parse(&mut Depth).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }), "{err}");
        assert_eq!(err.span(), Some(&Span::new(3..3)));
        assert_eq!(parser.log().len(), 1);

        let mut parser = Parser::new(&table, tokens("())"));
        let err = parser.parse(&mut Depth).unwrap_err();
        match err {
            ParseError::UnexpectedToken { found, span, .. } => {
                assert_eq!(found, ")");
                assert_eq!(span, Span::new(2..3));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    const NUM: SymbolId = 3;
    const PLUS: SymbolId = 4;
    const STAR: SymbolId = 5;

    fn arithmetic_tokens(source: &str) -> Vec<Token> {
        let mut pos = 0;
        source
            .split_whitespace()
            .map(|word| {
                let symbol = match word {
                    "(" => LPAREN,
                    ")" => RPAREN,
                    "+" => PLUS,
                    "*" => STAR,
                    _ => NUM,
                };
                let token = Token::new(symbol, word, Span::new(pos..pos + word.len()));
                pos += word.len() + 1;
                token
            })
            .collect()
    }

    /// Evaluates arithmetic expressions.
    struct Eval;

    impl SemanticActions for Eval {
        type Node = i64;

        fn expand_parse_tree(
            &mut self,
            production: ProductionId,
            body: Vec<Matched<i64>>,
        ) -> Result<i64, ParseError> {
            let mut body = BodyCursor::new(production, body);
            match production {
                1 => {
                    let lhs = body.node()?;
                    body.skip()?;
                    Ok(lhs + body.node()?)
                }
                3 => {
                    let lhs = body.node()?;
                    body.skip()?;
                    Ok(lhs * body.node()?)
                }
                2 | 4 => body.node(),
                5 => {
                    body.skip()?;
                    body.node()
                }
                6 => {
                    let token = body.token()?;
                    token
                        .text
                        .parse()
                        .map_err(|_| ParseError::Semantic(format!("bad number `{}`", token.text)))
                }
                _ => Err(ParseError::UnknownProduction(production)),
            }
        }
    }

    #[test]
    fn canonical_and_unioned_tables_accept_the_same_input() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut builder = GrammarBuilder::new();
        builder.add_terminal("(", LPAREN, SymbolRole::Common).unwrap();
        builder.add_terminal(")", RPAREN, SymbolRole::Common).unwrap();
        builder.add_terminal("num", NUM, SymbolRole::Common).unwrap();
        builder.add_terminal("+", PLUS, SymbolRole::Common).unwrap();
        builder.add_terminal("*", STAR, SymbolRole::Common).unwrap();
        builder.add_production("$START$", "expr").unwrap();
        builder.add_production("expr", "expr + term").unwrap();
        builder.add_production("expr", "term").unwrap();
        builder.add_production("term", "term * factor").unwrap();
        builder.add_production("term", "factor").unwrap();
        builder.add_production("factor", "( expr )").unwrap();
        builder.add_production("factor", "num").unwrap();
        let grammar = builder.build().unwrap();

        let canonical = grammar.create_parser_table(Construction::Canonical).unwrap();
        let unioned = grammar.create_parser_table(Construction::Unioned).unwrap();
        assert!(canonical.num_states() > unioned.num_states());

        let accepted = [
            ("7", 7),
            ("1 + 2 * 3", 7),
            ("( 1 + 2 ) * 3", 9),
            ("2 * ( 3 + ( 4 * 5 ) ) + 1", 47),
        ];
        let rejected = ["", "1 +", "( 1 + 2", "1 2", "* 3", "( ) + 1", "1 + 2 )"];
        for table in [&canonical, &unioned] {
            for (source, value) in accepted {
                let mut parser = Parser::new(table, arithmetic_tokens(source));
                assert_eq!(parser.parse(&mut Eval), Ok(value), "{source}");
            }
            for source in rejected {
                let mut parser = Parser::new(table, arithmetic_tokens(source));
                assert!(parser.parse(&mut Eval).is_err(), "{source}");
                assert_eq!(parser.log().len(), 1);
            }
        }
    }
}

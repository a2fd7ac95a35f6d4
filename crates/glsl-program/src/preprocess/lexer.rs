//! Line oriented tokenizer of the preprocessor.
//!
//! Runs of ordinary lines become a single `text` token. Directive lines, joined with their
//! `\` continuations, are split into tokens and terminated by a `newline` token.

use derive_more::derive::Display;
use lalr_gen::{Span, SymbolId, Token};
use logos::Logos;

#[derive(Logos, Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[logos(skip r"[ \t\f\v\r]+")]
#[logos(skip r"\\\r?\n")]
#[logos(skip r"//[^\n]*")]
pub enum PpToken {
    // comments. This variant is never produced.
    #[token("/*", skip_block_comment)]
    #[display("COMMENT")]
    Ignored,

    #[token("#")]
    #[display("#")]
    Hash,
    #[regex(r"#[ \t]*define")]
    #[display("#define")]
    Define,
    #[regex(r"#[ \t]*undef")]
    #[display("#undef")]
    Undef,
    #[regex(r"#[ \t]*if")]
    #[display("#if")]
    If,
    #[regex(r"#[ \t]*ifdef")]
    #[display("#ifdef")]
    Ifdef,
    #[regex(r"#[ \t]*ifndef")]
    #[display("#ifndef")]
    Ifndef,
    #[regex(r"#[ \t]*elif")]
    #[display("#elif")]
    Elif,
    #[regex(r"#[ \t]*else")]
    #[display("#else")]
    Else,
    #[regex(r"#[ \t]*endif")]
    #[display("#endif")]
    Endif,
    #[regex(r"#[ \t]*error")]
    #[display("#error")]
    Error,
    #[regex(r"#[ \t]*pragma")]
    #[display("#pragma")]
    Pragma,
    #[regex(r"#[ \t]*extension")]
    #[display("#extension")]
    Extension,
    #[regex(r"#[ \t]*version")]
    #[display("#version")]
    Version,
    #[regex(r"#[ \t]*line")]
    #[display("#line")]
    Line,
    #[regex(r"#[ \t]*include")]
    #[display("#include")]
    Include,

    #[token("defined")]
    #[display("defined")]
    Defined,
    #[regex(r"[0-9]+[uU]?")]
    #[regex(r"0[xX][0-9a-fA-F]+[uU]?")]
    #[display("INTCONSTANT")]
    IntConstant,
    #[regex(r"([0-9]+\.[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?([fF]|lf|LF)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+([fF]|lf|LF)?")]
    #[display("FLOATCONSTANT")]
    FloatConstant,
    #[regex(r#""[^"\n]*""#)]
    #[display("STRING")]
    String,
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    #[display("IDENTIFIER")]
    Identifier,

    #[token("(")]
    #[display("(")]
    ParenLeft,
    #[token(")")]
    #[display(")")]
    ParenRight,
    #[token(",")]
    #[display(",")]
    Comma,
    #[token("||")]
    #[display("||")]
    LogicalOr,
    #[token("&&")]
    #[display("&&")]
    LogicalAnd,
    #[token("|")]
    #[display("|")]
    BitOr,
    #[token("^")]
    #[display("^")]
    BitXor,
    #[token("&")]
    #[display("&")]
    BitAnd,
    #[token("==")]
    #[display("==")]
    Equal,
    #[token("!=")]
    #[display("!=")]
    NotEqual,
    #[token("<")]
    #[display("<")]
    Less,
    #[token(">")]
    #[display(">")]
    Greater,
    #[token("<=")]
    #[display("<=")]
    LessEqual,
    #[token(">=")]
    #[display(">=")]
    GreaterEqual,
    #[token("<<")]
    #[display("<<")]
    ShiftLeft,
    #[token(">>")]
    #[display(">>")]
    ShiftRight,
    #[token("+")]
    #[display("+")]
    Plus,
    #[token("-")]
    #[display("-")]
    Minus,
    #[token("*")]
    #[display("*")]
    Star,
    #[token("/")]
    #[display("/")]
    Slash,
    #[token("%")]
    #[display("%")]
    Percent,
    #[token("!")]
    #[display("!")]
    Not,
    #[token("~")]
    #[display("~")]
    Complement,

    /// the end of a directive line.
    #[display("newline")]
    Newline,
    /// a run of lines without directives.
    #[display("text")]
    Text,
    /// the `(` right after the name of a `#define`, which makes the macro function-like.
    #[display("macro-lparen")]
    MacroLParen,
    /// starts a token stream that holds a single expression.
    #[display("expr-start")]
    ExprStart,
    /// stands in for any token of a macro body or of a `#pragma`. Never produced.
    #[display("token")]
    Any,
    /// a character that is not part of any other token.
    #[display("OTHER")]
    Other,
}

impl PpToken {
    /// Every kind the grammar knows as a terminal.
    pub const TERMINALS: &'static [PpToken] = &[
        PpToken::Hash,
        PpToken::Define,
        PpToken::Undef,
        PpToken::If,
        PpToken::Ifdef,
        PpToken::Ifndef,
        PpToken::Elif,
        PpToken::Else,
        PpToken::Endif,
        PpToken::Error,
        PpToken::Pragma,
        PpToken::Extension,
        PpToken::Version,
        PpToken::Line,
        PpToken::Include,
        PpToken::Defined,
        PpToken::IntConstant,
        PpToken::FloatConstant,
        PpToken::String,
        PpToken::Identifier,
        PpToken::ParenLeft,
        PpToken::ParenRight,
        PpToken::Comma,
        PpToken::LogicalOr,
        PpToken::LogicalAnd,
        PpToken::BitOr,
        PpToken::BitXor,
        PpToken::BitAnd,
        PpToken::Equal,
        PpToken::NotEqual,
        PpToken::Less,
        PpToken::Greater,
        PpToken::LessEqual,
        PpToken::GreaterEqual,
        PpToken::ShiftLeft,
        PpToken::ShiftRight,
        PpToken::Plus,
        PpToken::Minus,
        PpToken::Star,
        PpToken::Slash,
        PpToken::Percent,
        PpToken::Not,
        PpToken::Complement,
        PpToken::Newline,
        PpToken::Text,
        PpToken::MacroLParen,
        PpToken::ExprStart,
        PpToken::Any,
        PpToken::Other,
    ];

    pub fn id(self) -> SymbolId {
        self as SymbolId
    }

    pub fn from_id(id: SymbolId) -> Option<Self> {
        Self::TERMINALS.iter().copied().find(|kind| kind.id() == id)
    }
}

fn skip_block_comment(lex: &mut logos::Lexer<PpToken>) -> logos::Skip {
    match lex.remainder().find("*/") {
        Some(end) => lex.bump(end + 2),
        None => lex.bump(lex.remainder().len()),
    }
    logos::Skip
}

fn token(kind: PpToken, source: &str, span: std::ops::Range<usize>) -> Token {
    Token::new(kind.id(), &source[span.clone()], Span::new(span))
}

/// Splits `source[range]` into tokens. A `(` that touches the name of a `#define` becomes a
/// [`PpToken::MacroLParen`].
fn tokenize_directive(source: &str, range: std::ops::Range<usize>, tokens: &mut Vec<Token>) {
    let text = &source[range.clone()];
    let lexer = PpToken::lexer(text).spanned();
    let mut previous: [Option<PpToken>; 2] = [None, None];
    let mut previous_end = 0;

    for (kind, span) in lexer {
        let mut kind = kind.unwrap_or(PpToken::Other);
        if kind == PpToken::ParenLeft
            && previous == [Some(PpToken::Identifier), Some(PpToken::Define)]
            && span.start == previous_end
        {
            kind = PpToken::MacroLParen;
        }
        previous = [Some(kind), previous[0]];
        previous_end = span.end;
        let span = span.start + range.start..span.end + range.start;
        tokens.push(token(kind, source, span));
    }
}

/// Tokenizes a whole source file.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text_start = None;
    let mut in_comment = false;
    let mut lines = LineIter::new(source);

    let flush_text = |tokens: &mut Vec<Token>, start: &mut Option<usize>, end: usize| {
        if let Some(start) = start.take() {
            tokens.push(token(PpToken::Text, source, start..end));
        }
    };

    while let Some((start, end)) = lines.next() {
        let line = &source[start..end];
        if !in_comment && line.trim_start().starts_with('#') {
            flush_text(&mut tokens, &mut text_start, start);

            let mut directive_end = end;
            while continues(&source[start..directive_end]) {
                match lines.next() {
                    Some((_, next_end)) => directive_end = next_end,
                    None => break,
                }
            }
            let content_end = trim_newline(source, start, directive_end);
            tokenize_directive(source, start..content_end, &mut tokens);
            tokens.push(Token::new(
                PpToken::Newline.id(),
                "\n",
                Span::new(content_end..directive_end),
            ));
        } else {
            in_comment = ends_in_comment(line, in_comment);
            text_start.get_or_insert(start);
        }
    }
    flush_text(&mut tokens, &mut text_start, source.len());

    tokens
}

/// Tokenizes a macro body or a conditional expression for evaluation.
pub fn tokenize_expression(text: &str) -> Vec<Token> {
    let mut tokens = vec![Token::new(PpToken::ExprStart.id(), "", Span::empty_at(0))];
    tokenize_directive(text, 0..text.len(), &mut tokens);
    tokens
}

/// Yields the byte ranges of the lines, including their `\n`.
struct LineIter<'s> {
    source: &'s str,
    pos: usize,
}

impl<'s> LineIter<'s> {
    fn new(source: &'s str) -> Self {
        Self { source, pos: 0 }
    }
}

impl Iterator for LineIter<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.source.len() {
            return None;
        }
        let start = self.pos;
        let end = match self.source[start..].find('\n') {
            Some(i) => start + i + 1,
            None => self.source.len(),
        };
        self.pos = end;
        Some((start, end))
    }
}

fn trim_newline(source: &str, start: usize, end: usize) -> usize {
    let line = &source[start..end];
    let trimmed = line.strip_suffix('\n').unwrap_or(line);
    let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
    start + trimmed.len()
}

// a directive continues on the next line when it ends with a backslash.
fn continues(directive: &str) -> bool {
    directive.ends_with('\n') && directive.trim_end_matches(['\n', '\r']).ends_with('\\')
}

/// Whether a block comment is still open at the end of `line`.
fn ends_in_comment(line: &str, mut in_comment: bool) -> bool {
    let mut rest = line;
    loop {
        if in_comment {
            match rest.find("*/") {
                Some(i) => {
                    rest = &rest[i + 2..];
                    in_comment = false;
                }
                None => return true,
            }
        } else {
            let block = rest.find("/*");
            let line_comment = rest.find("//");
            match (block, line_comment) {
                (Some(b), Some(l)) if l < b => return false,
                (Some(b), _) => {
                    rest = &rest[b + 2..];
                    in_comment = true;
                }
                (None, _) => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<PpToken> {
        tokens
            .iter()
            .map(|token| PpToken::from_id(token.symbol).unwrap())
            .collect()
    }

    #[test]
    fn text_runs_and_directives() {
        let source = "float a;\nfloat b;\n#define N 4\nvec4 c;";
        let tokens = tokenize(source);
        use PpToken::*;
        assert_eq!(
            kinds(&tokens),
            [Text, Define, Identifier, IntConstant, Newline, Text]
        );
        assert_eq!(tokens[0].text, "float a;\nfloat b;\n");
        assert_eq!(tokens[5].text, "vec4 c;");
    }

    #[test]
    fn function_like_define() {
        use PpToken::*;
        let tokens = tokenize("#define F(x) (x)\n#define G (x)\n");
        assert_eq!(
            kinds(&tokens),
            [
                Define, Identifier, MacroLParen, Identifier, ParenRight, ParenLeft, Identifier,
                ParenRight, Newline, Define, Identifier, ParenLeft, Identifier, ParenRight,
                Newline
            ]
        );
    }

    #[test]
    fn continuation_lines() {
        use PpToken::*;
        let tokens = tokenize("# define A 1 + \\\n  2\nx");
        assert_eq!(
            kinds(&tokens),
            [Define, Identifier, IntConstant, Plus, IntConstant, Newline, Text]
        );
        assert_eq!(tokens[5].span.range(), 20..21);
    }

    #[test]
    fn hash_inside_block_comment_is_text() {
        use PpToken::*;
        let tokens = tokenize("/* a comment\n#define X\n*/\n#endif // done\n");
        assert_eq!(kinds(&tokens), [Text, Endif, Newline]);
        assert_eq!(tokens[0].text, "/* a comment\n#define X\n*/\n");
    }

    #[test]
    fn unknown_characters() {
        use PpToken::*;
        let tokens = tokenize("#pragma optimize(on) @\n");
        assert_eq!(
            kinds(&tokens),
            [Pragma, Identifier, ParenLeft, Identifier, ParenRight, Other, Newline]
        );
    }

    #[test]
    fn expression_tokens() {
        use PpToken::*;
        let tokens = tokenize_expression("defined(A) && 0x10 >= 3");
        assert_eq!(
            kinds(&tokens),
            [ExprStart, Defined, ParenLeft, Identifier, ParenRight, LogicalAnd, IntConstant, GreaterEqual, IntConstant]
        );
    }
}

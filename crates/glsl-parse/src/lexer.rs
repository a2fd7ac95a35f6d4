//! Tokenizer for the declaration level of GLSL.
//!
//! Annotation comments (`//$ ...` and `/*$ ... */`) are kept as tokens and classified as
//! leading or trailing; all other comments are skipped.

use std::fmt::Display;

use lalr_gen::{Span, SymbolId, Token};
use logos::{Logos, SpannedIter};

fn parse_block_comment(lex: &mut logos::Lexer<TokenKind>) -> logos::Skip {
    skip_block_comment(lex);
    logos::Skip
}

// block comments do not nest in GLSL.
fn skip_block_comment(lex: &mut logos::Lexer<TokenKind>) {
    match lex.remainder().find("*/") {
        Some(end) => lex.bump(end + 2),
        None => lex.bump(lex.remainder().len()),
    }
}

#[derive(Logos, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f\v]+")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    // comments. This variant is never produced.
    #[token("/*", parse_block_comment)]
    Ignored,

    #[regex(r"//\$[^\n]*")]
    #[token("/*$", |lex| skip_block_comment(lex))]
    Annotation,
    /// an annotation comment before a declaration.
    LeadingAnnotation,
    /// an annotation comment after the `;` of a declaration, on the same line.
    TrailingAnnotation,

    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("(")]
    ParenLeft,
    #[token(")")]
    ParenRight,
    #[token("{")]
    BraceLeft,
    #[token("}")]
    BraceRight,
    #[token("[")]
    BracketLeft,
    #[token("]")]
    BracketRight,
    #[token("=")]
    Equal,

    #[token("attribute")]
    Attribute,
    #[token("const")]
    Const,
    #[token("uniform")]
    Uniform,
    #[token("varying")]
    Varying,
    #[token("layout")]
    Layout,
    #[token("centroid")]
    Centroid,
    #[token("flat")]
    Flat,
    #[token("smooth")]
    Smooth,
    #[token("noperspective")]
    NoPerspective,
    #[token("in")]
    In,
    #[token("out")]
    Out,
    #[token("inout")]
    InOut,
    #[token("invariant")]
    Invariant,
    #[token("highp")]
    HighP,
    #[token("mediump")]
    MediumP,
    #[token("lowp")]
    LowP,
    #[token("precision")]
    Precision,
    #[token("struct")]
    Struct,
    #[token("void")]
    Void,

    #[regex("bool|int|uint|float")]
    #[regex("[biu]?vec[234]")]
    #[regex("mat[234](x[234])?")]
    #[regex("[iu]?sampler(1D|2D|3D|Cube|2DRect|Buffer|2DMS)(Array)?(Shadow)?")]
    NativeType,

    // statement keywords only appear inside function bodies and initializers.
    #[token("break")]
    #[token("continue")]
    #[token("do")]
    #[token("for")]
    #[token("while")]
    #[token("switch")]
    #[token("case")]
    #[token("default")]
    #[token("if")]
    #[token("else")]
    #[token("discard")]
    #[token("return")]
    #[token("true")]
    #[token("false")]
    Keyword,

    #[token(".")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("<")]
    #[token(">")]
    #[token("<=")]
    #[token(">=")]
    #[token("==")]
    #[token("!=")]
    #[token("&&")]
    #[token("||")]
    #[token("^^")]
    #[token("!")]
    #[token("~")]
    #[token("&")]
    #[token("|")]
    #[token("^")]
    #[token("<<")]
    #[token(">>")]
    #[token("++")]
    #[token("--")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("<<=")]
    #[token(">>=")]
    #[token("&=")]
    #[token("^=")]
    #[token("|=")]
    #[token("?")]
    #[token(":")]
    Operator,

    #[regex(r"[0-9]+[uU]?")]
    #[regex(r"0[xX][0-9a-fA-F]+[uU]?")]
    IntConstant,
    #[regex(r"([0-9]+\.[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?([fF]|lf|LF)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+([fF]|lf|LF)?")]
    FloatConstant,
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,

    /// stands in for any token inside initializers and function bodies. Never produced.
    Any,
    /// a character the lexer does not recognize.
    Invalid,
}

impl TokenKind {
    /// Every kind the grammar knows as a terminal.
    pub const TERMINALS: &'static [TokenKind] = &[
        TokenKind::LeadingAnnotation,
        TokenKind::TrailingAnnotation,
        TokenKind::Semicolon,
        TokenKind::Comma,
        TokenKind::ParenLeft,
        TokenKind::ParenRight,
        TokenKind::BraceLeft,
        TokenKind::BraceRight,
        TokenKind::BracketLeft,
        TokenKind::BracketRight,
        TokenKind::Equal,
        TokenKind::Attribute,
        TokenKind::Const,
        TokenKind::Uniform,
        TokenKind::Varying,
        TokenKind::Layout,
        TokenKind::Centroid,
        TokenKind::Flat,
        TokenKind::Smooth,
        TokenKind::NoPerspective,
        TokenKind::In,
        TokenKind::Out,
        TokenKind::InOut,
        TokenKind::Invariant,
        TokenKind::HighP,
        TokenKind::MediumP,
        TokenKind::LowP,
        TokenKind::Precision,
        TokenKind::Struct,
        TokenKind::Void,
        TokenKind::NativeType,
        TokenKind::Keyword,
        TokenKind::Operator,
        TokenKind::IntConstant,
        TokenKind::FloatConstant,
        TokenKind::Identifier,
        TokenKind::Any,
        TokenKind::Invalid,
    ];

    pub fn id(self) -> SymbolId {
        self as SymbolId
    }

    pub fn from_id(id: SymbolId) -> Option<Self> {
        Self::TERMINALS.iter().copied().find(|kind| kind.id() == id)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenKind::Ignored => "COMMENT",
            TokenKind::Annotation => "ANNOTATION",
            TokenKind::LeadingAnnotation => "LEADING-ANNOTATION",
            TokenKind::TrailingAnnotation => "TRAILING-ANNOTATION",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::ParenLeft => "(",
            TokenKind::ParenRight => ")",
            TokenKind::BraceLeft => "{",
            TokenKind::BraceRight => "}",
            TokenKind::BracketLeft => "[",
            TokenKind::BracketRight => "]",
            TokenKind::Equal => "=",
            TokenKind::Attribute => "attribute",
            TokenKind::Const => "const",
            TokenKind::Uniform => "uniform",
            TokenKind::Varying => "varying",
            TokenKind::Layout => "layout",
            TokenKind::Centroid => "centroid",
            TokenKind::Flat => "flat",
            TokenKind::Smooth => "smooth",
            TokenKind::NoPerspective => "noperspective",
            TokenKind::In => "in",
            TokenKind::Out => "out",
            TokenKind::InOut => "inout",
            TokenKind::Invariant => "invariant",
            TokenKind::HighP => "highp",
            TokenKind::MediumP => "mediump",
            TokenKind::LowP => "lowp",
            TokenKind::Precision => "precision",
            TokenKind::Struct => "struct",
            TokenKind::Void => "void",
            TokenKind::NativeType => "NATIVE-TYPE",
            TokenKind::Keyword => "KEYWORD",
            TokenKind::Operator => "OPERATOR",
            TokenKind::IntConstant => "INTCONSTANT",
            TokenKind::FloatConstant => "FLOATCONSTANT",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Any => "ANY",
            TokenKind::Invalid => "INVALID",
        };
        f.write_str(name)
    }
}

/// Produces [`Token`]s whose symbol ids are [`TokenKind::id`]s.
pub struct Lexer<'s> {
    source: &'s str,
    token_stream: SpannedIter<'s, TokenKind>,
    previous: Option<(TokenKind, usize)>,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            token_stream: TokenKind::lexer(source).spanned(),
            previous: None,
        }
    }

    pub fn source(&self) -> &str {
        self.source
    }

    // trailing iff it follows a `;` on the same line.
    fn classify_annotation(&self, start: usize) -> TokenKind {
        match self.previous {
            Some((TokenKind::Semicolon, end)) if !self.source[end..start].contains('\n') => {
                TokenKind::TrailingAnnotation
            }
            _ => TokenKind::LeadingAnnotation,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let (kind, span) = self.token_stream.next()?;
        let kind = match kind {
            Ok(TokenKind::Annotation) => self.classify_annotation(span.start),
            Ok(kind) => kind,
            Err(()) => TokenKind::Invalid,
        };
        self.previous = Some((kind, span.end));
        let text = &self.source[span.clone()];
        Some(Token::new(kind.id(), text, Span::new(span)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .map(|token| TokenKind::from_id(token.symbol).unwrap())
            .collect()
    }

    #[test]
    fn keywords_types_and_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("uniform sampler2DArrayShadow tex[2]; vec4 vector4; mat3x4 m = 1.5e3f;"),
            vec![
                Uniform,
                NativeType,
                Identifier,
                BracketLeft,
                IntConstant,
                BracketRight,
                Semicolon,
                NativeType,
                Identifier,
                Semicolon,
                NativeType,
                Identifier,
                Equal,
                FloatConstant,
                Semicolon,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        use TokenKind::*;
        assert_eq!(
            kinds("in /* a * comment */ float x; // out\nout"),
            vec![In, NativeType, Identifier, Semicolon, Out]
        );
    }

    #[test]
    fn annotations_are_classified() {
        use TokenKind::*;
        let source = "//$ @name = \"a\"\nuniform float a; //$ @min = 0\n/*$ @max = 1 */ uniform float b;";
        assert_eq!(
            kinds(source),
            vec![
                LeadingAnnotation,
                Uniform,
                NativeType,
                Identifier,
                Semicolon,
                TrailingAnnotation,
                LeadingAnnotation,
                Uniform,
                NativeType,
                Identifier,
                Semicolon,
            ]
        );
    }

    #[test]
    fn annotation_on_next_line_is_leading() {
        let tokens = Lexer::new("float a;\n//$ @x = 1").collect::<Vec<_>>();
        assert_eq!(tokens[3].symbol, TokenKind::LeadingAnnotation.id());
        assert_eq!(tokens[3].text, "//$ @x = 1");
        assert_eq!(tokens[3].span, Span::new(9..19));
    }

    #[test]
    fn unknown_characters_are_invalid() {
        assert_eq!(
            kinds("float $x;"),
            vec![
                TokenKind::NativeType,
                TokenKind::Invalid,
                TokenKind::Identifier,
                TokenKind::Semicolon
            ]
        );
    }
}

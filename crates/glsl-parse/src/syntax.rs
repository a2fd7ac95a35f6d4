//! The declaration-level syntax tree of a GLSL translation unit.
//!
//! Function bodies, initializers and array sizes are not parsed further; they are kept as
//! flat [`TokenList`]s.

use std::fmt::Display;

use derive_more::derive::IsVariant;
use itertools::Itertools;
use lalr_gen::{Span, Token};

use crate::lexer::TokenKind;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TranslationUnit {
    pub declarations: Vec<ExternalDeclaration>,
}

#[derive(Clone, Debug, PartialEq, IsVariant)]
pub enum ExternalDeclaration {
    Declaration(AnnotatedDeclaration),
    FunctionDefinition(FunctionDefinition),
}

/// A raw annotation comment, with its `//$` or `/*$ */` delimiters.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationComment {
    pub text: String,
    pub span: Span,
}

impl AnnotationComment {
    /// The comment text without its delimiters.
    pub fn content(&self) -> &str {
        let text = self.text.as_str();
        if let Some(rest) = text.strip_prefix("//$") {
            rest
        } else if let Some(rest) = text.strip_prefix("/*$") {
            rest.strip_suffix("*/").unwrap_or(rest)
        } else {
            text
        }
    }

    /// Byte offset of [`Self::content`] in the source.
    pub fn content_offset(&self) -> usize {
        self.span.start + 3
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatedDeclaration {
    pub leading: Vec<AnnotationComment>,
    pub declaration: Declaration,
    pub trailing: Vec<AnnotationComment>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDefinition {
    pub annotations: Vec<AnnotationComment>,
    pub prototype: FunctionPrototype,
    pub body: TokenList,
}

#[derive(Clone, Debug, PartialEq, IsVariant)]
pub enum Declaration {
    Prototype(FunctionPrototype),
    Variables(DeclarationList),
    Precision(PrecisionDeclaration),
    Block(InterfaceBlock),
    /// a qualifier alone, e.g. `layout(std140) uniform;`
    Qualifier(TypeQualifier),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionPrototype {
    pub return_type: FullySpecifiedType,
    pub name: String,
    pub parameters: Vec<ParameterDeclaration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterQualifier {
    Const,
    In,
    Out,
    InOut,
    Precision(PrecisionQualifier),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParameterDeclaration {
    pub qualifiers: Vec<ParameterQualifier>,
    pub ty: TypeSpecifier,
    pub name: Option<String>,
    pub array: Option<ArraySpecifier>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrecisionDeclaration {
    pub precision: PrecisionQualifier,
    pub ty: TypeSpecifier,
}

/// `uniform Name { members } instance[size];`
#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceBlock {
    pub qualifier: TypeQualifier,
    pub name: String,
    pub members: Vec<StructMember>,
    pub instance: Option<String>,
    pub array: Option<ArraySpecifier>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeclarationList {
    pub ty: FullySpecifiedType,
    pub declarators: Vec<Declarator>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub span: Span,
    pub array: Option<ArraySpecifier>,
    pub initializer: Option<TokenList>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FullySpecifiedType {
    pub qualifier: Option<TypeQualifier>,
    pub specifier: TypeSpecifier,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeQualifier {
    pub qualifiers: Vec<SingleTypeQualifier>,
}

impl TypeQualifier {
    pub fn storage(&self) -> Option<StorageQualifier> {
        self.qualifiers.iter().find_map(|qual| match qual {
            SingleTypeQualifier::Storage(storage) => Some(*storage),
            _ => None,
        })
    }

    pub fn interpolation(&self) -> Option<InterpolationQualifier> {
        self.qualifiers.iter().find_map(|qual| match qual {
            SingleTypeQualifier::Interpolation(interpolation) => Some(*interpolation),
            _ => None,
        })
    }

    pub fn precision(&self) -> Option<PrecisionQualifier> {
        self.qualifiers.iter().find_map(|qual| match qual {
            SingleTypeQualifier::Precision(precision) => Some(*precision),
            _ => None,
        })
    }

    pub fn is_invariant(&self) -> bool {
        self.qualifiers
            .iter()
            .any(|qual| matches!(qual, SingleTypeQualifier::Invariant))
    }

    pub fn layout(&self) -> impl Iterator<Item = &LayoutId> {
        self.qualifiers
            .iter()
            .filter_map(|qual| match qual {
                SingleTypeQualifier::Layout(ids) => Some(ids),
                _ => None,
            })
            .flatten()
    }
}

#[derive(Clone, Debug, PartialEq, IsVariant)]
pub enum SingleTypeQualifier {
    Storage(StorageQualifier),
    Layout(Vec<LayoutId>),
    Interpolation(InterpolationQualifier),
    Invariant,
    Precision(PrecisionQualifier),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageQualifier {
    Const,
    Attribute,
    Varying,
    CentroidVarying,
    In,
    CentroidIn,
    Out,
    CentroidOut,
    Uniform,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutId {
    pub name: String,
    pub value: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterpolationQualifier {
    Smooth,
    Flat,
    NoPerspective,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrecisionQualifier {
    High,
    Medium,
    Low,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeSpecifier {
    pub ty: TypeName,
    pub array: Option<ArraySpecifier>,
}

#[derive(Clone, Debug, PartialEq, IsVariant)]
pub enum TypeName {
    Void,
    /// a built-in type such as `float`, `ivec3` or `sampler2D`.
    Native(String),
    Struct(StructSpecifier),
    /// a user-defined type.
    Named(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructSpecifier {
    pub name: Option<String>,
    pub members: Vec<StructMember>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructMember {
    pub leading: Vec<AnnotationComment>,
    pub ty: FullySpecifiedType,
    pub declarators: Vec<StructDeclarator>,
    pub trailing: Vec<AnnotationComment>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructDeclarator {
    pub name: String,
    pub array: Option<ArraySpecifier>,
}

/// One or more `[...]`. A dimension is empty for unsized arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct ArraySpecifier {
    pub dimensions: Vec<TokenList>,
}

impl ArraySpecifier {
    /// Total number of elements, when every dimension is an integer literal.
    pub fn size(&self) -> Option<i64> {
        self.dimensions
            .iter()
            .map(TokenList::as_int)
            .try_fold(1i64, |acc, dim| Some(acc * dim?))
    }
}

/// Tokens that are kept but not parsed further.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenList {
    pub tokens: Vec<Token>,
}

impl TokenList {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The value of a list made of exactly one integer literal.
    pub fn as_int(&self) -> Option<i64> {
        match self.tokens.as_slice() {
            [token] if token.symbol == TokenKind::IntConstant.id() => parse_int(&token.text),
            _ => None,
        }
    }
}

/// Parses a decimal, octal (`0` prefix) or hexadecimal (`0x` prefix) integer literal, with an
/// optional `u` suffix.
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim_end_matches(['u', 'U']);
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None if text.len() > 1 && text.starts_with('0') => i64::from_str_radix(&text[1..], 8).ok(),
        None => text.parse().ok(),
    }
}

impl Display for TokenList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tokens.iter().map(|token| &token.text).format(" "))
    }
}

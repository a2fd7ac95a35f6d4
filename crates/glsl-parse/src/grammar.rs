//! The declaration grammar and its parser table.

use std::sync::LazyLock;

use lalr_gen::{
    Construction, Grammar, GrammarBuilder, GrammarError, ParserTable, ProductionId, SymbolRole,
};

use crate::lexer::TokenKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Rule {
    Start,
    UnitEmpty,
    UnitAppend,
    ExternalDeclaration,
    FunctionDefinition,
    LeadingEmpty,
    LeadingAppend,
    TrailingEmpty,
    TrailingAppend,
    DeclPrototype,
    DeclVariables,
    DeclPrecision,
    DeclBlock,
    DeclBlockInstance,
    DeclBlockInstanceArray,
    DeclQualifier,
    Prototype,
    PrototypeParameters,
    ParametersFirst,
    ParametersAppend,
    Parameter,
    ParameterNamed,
    ParameterNamedArray,
    ParamQualifiersEmpty,
    ParamQualifiersAppend,
    ParamConst,
    ParamIn,
    ParamOut,
    ParamInOut,
    ParamPrecision,
    DeclarationList,
    DeclarationListAppend,
    SingleDeclarationUnnamed,
    SingleDeclaration,
    Declarator,
    DeclaratorArray,
    DeclaratorInit,
    DeclaratorArrayInit,
    FullType,
    FullTypeQualified,
    QualifierFirst,
    QualifierAppend,
    QualifierStorage,
    QualifierLayout,
    QualifierInterpolation,
    QualifierInvariant,
    QualifierPrecision,
    StorageConst,
    StorageAttribute,
    StorageVarying,
    StorageCentroidVarying,
    StorageIn,
    StorageOut,
    StorageCentroidIn,
    StorageCentroidOut,
    StorageUniform,
    Layout,
    LayoutIdsFirst,
    LayoutIdsAppend,
    LayoutId,
    LayoutIdValue,
    InterpolationSmooth,
    InterpolationFlat,
    InterpolationNoPerspective,
    PrecisionHigh,
    PrecisionMedium,
    PrecisionLow,
    TypeSpecifier,
    TypeSpecifierArray,
    TypeVoid,
    TypeNative,
    TypeStruct,
    TypeNamed,
    StructNamed,
    StructAnonymous,
    MembersFirst,
    MembersAppend,
    Member,
    StructDeclaratorsFirst,
    StructDeclaratorsAppend,
    StructDeclarator,
    StructDeclaratorArray,
    ArrayFirst,
    ArrayAppend,
    InitializerFirst,
    InitializerAppend,
    ItemAny,
    ItemParens,
    ItemBraces,
    ItemBrackets,
    NestedEmpty,
    NestedAppend,
    NestedItem,
    NestedComma,
    NestedSemicolon,
    CompoundBody,
}

// the production id of a rule is its index in this table.
pub(crate) const RULES: &[(Rule, &str, &str)] = &[
    (Rule::Start, "$START$", "translation-unit"),
    (Rule::UnitEmpty, "translation-unit", ""),
    (Rule::UnitAppend, "translation-unit", "translation-unit external-declaration"),
    (Rule::ExternalDeclaration, "external-declaration", "leading-annotations declaration trailing-annotations"),
    (Rule::FunctionDefinition, "external-declaration", "leading-annotations function-prototype compound-body"),
    (Rule::LeadingEmpty, "leading-annotations", ""),
    (Rule::LeadingAppend, "leading-annotations", "leading-annotations LEADING-ANNOTATION"),
    (Rule::TrailingEmpty, "trailing-annotations", ""),
    (Rule::TrailingAppend, "trailing-annotations", "trailing-annotations TRAILING-ANNOTATION"),
    (Rule::DeclPrototype, "declaration", "function-prototype ;"),
    (Rule::DeclVariables, "declaration", "init-declarator-list ;"),
    (Rule::DeclPrecision, "declaration", "precision precision-qualifier type-specifier ;"),
    (Rule::DeclBlock, "declaration", "type-qualifier IDENTIFIER { struct-declaration-list } ;"),
    (Rule::DeclBlockInstance, "declaration", "type-qualifier IDENTIFIER { struct-declaration-list } IDENTIFIER ;"),
    (Rule::DeclBlockInstanceArray, "declaration", "type-qualifier IDENTIFIER { struct-declaration-list } IDENTIFIER array-specifier ;"),
    (Rule::DeclQualifier, "declaration", "type-qualifier ;"),
    (Rule::Prototype, "function-prototype", "fully-specified-type IDENTIFIER ( )"),
    (Rule::PrototypeParameters, "function-prototype", "fully-specified-type IDENTIFIER ( parameter-list )"),
    (Rule::ParametersFirst, "parameter-list", "parameter-declaration"),
    (Rule::ParametersAppend, "parameter-list", "parameter-list , parameter-declaration"),
    (Rule::Parameter, "parameter-declaration", "parameter-qualifiers type-specifier"),
    (Rule::ParameterNamed, "parameter-declaration", "parameter-qualifiers type-specifier IDENTIFIER"),
    (Rule::ParameterNamedArray, "parameter-declaration", "parameter-qualifiers type-specifier IDENTIFIER array-specifier"),
    (Rule::ParamQualifiersEmpty, "parameter-qualifiers", ""),
    (Rule::ParamQualifiersAppend, "parameter-qualifiers", "parameter-qualifiers parameter-qualifier"),
    (Rule::ParamConst, "parameter-qualifier", "const"),
    (Rule::ParamIn, "parameter-qualifier", "in"),
    (Rule::ParamOut, "parameter-qualifier", "out"),
    (Rule::ParamInOut, "parameter-qualifier", "inout"),
    (Rule::ParamPrecision, "parameter-qualifier", "precision-qualifier"),
    (Rule::DeclarationList, "init-declarator-list", "single-declaration"),
    (Rule::DeclarationListAppend, "init-declarator-list", "init-declarator-list , declarator"),
    (Rule::SingleDeclarationUnnamed, "single-declaration", "fully-specified-type"),
    (Rule::SingleDeclaration, "single-declaration", "fully-specified-type declarator"),
    (Rule::Declarator, "declarator", "IDENTIFIER"),
    (Rule::DeclaratorArray, "declarator", "IDENTIFIER array-specifier"),
    (Rule::DeclaratorInit, "declarator", "IDENTIFIER = initializer"),
    (Rule::DeclaratorArrayInit, "declarator", "IDENTIFIER array-specifier = initializer"),
    (Rule::FullType, "fully-specified-type", "type-specifier"),
    (Rule::FullTypeQualified, "fully-specified-type", "type-qualifier type-specifier"),
    (Rule::QualifierFirst, "type-qualifier", "single-type-qualifier"),
    (Rule::QualifierAppend, "type-qualifier", "type-qualifier single-type-qualifier"),
    (Rule::QualifierStorage, "single-type-qualifier", "storage-qualifier"),
    (Rule::QualifierLayout, "single-type-qualifier", "layout-qualifier"),
    (Rule::QualifierInterpolation, "single-type-qualifier", "interpolation-qualifier"),
    (Rule::QualifierInvariant, "single-type-qualifier", "invariant"),
    (Rule::QualifierPrecision, "single-type-qualifier", "precision-qualifier"),
    (Rule::StorageConst, "storage-qualifier", "const"),
    (Rule::StorageAttribute, "storage-qualifier", "attribute"),
    (Rule::StorageVarying, "storage-qualifier", "varying"),
    (Rule::StorageCentroidVarying, "storage-qualifier", "centroid varying"),
    (Rule::StorageIn, "storage-qualifier", "in"),
    (Rule::StorageOut, "storage-qualifier", "out"),
    (Rule::StorageCentroidIn, "storage-qualifier", "centroid in"),
    (Rule::StorageCentroidOut, "storage-qualifier", "centroid out"),
    (Rule::StorageUniform, "storage-qualifier", "uniform"),
    (Rule::Layout, "layout-qualifier", "layout ( layout-id-list )"),
    (Rule::LayoutIdsFirst, "layout-id-list", "layout-id"),
    (Rule::LayoutIdsAppend, "layout-id-list", "layout-id-list , layout-id"),
    (Rule::LayoutId, "layout-id", "IDENTIFIER"),
    (Rule::LayoutIdValue, "layout-id", "IDENTIFIER = INTCONSTANT"),
    (Rule::InterpolationSmooth, "interpolation-qualifier", "smooth"),
    (Rule::InterpolationFlat, "interpolation-qualifier", "flat"),
    (Rule::InterpolationNoPerspective, "interpolation-qualifier", "noperspective"),
    (Rule::PrecisionHigh, "precision-qualifier", "highp"),
    (Rule::PrecisionMedium, "precision-qualifier", "mediump"),
    (Rule::PrecisionLow, "precision-qualifier", "lowp"),
    (Rule::TypeSpecifier, "type-specifier", "type-specifier-nonarray"),
    (Rule::TypeSpecifierArray, "type-specifier", "type-specifier-nonarray array-specifier"),
    (Rule::TypeVoid, "type-specifier-nonarray", "void"),
    (Rule::TypeNative, "type-specifier-nonarray", "NATIVE-TYPE"),
    (Rule::TypeStruct, "type-specifier-nonarray", "struct-specifier"),
    (Rule::TypeNamed, "type-specifier-nonarray", "IDENTIFIER"),
    (Rule::StructNamed, "struct-specifier", "struct IDENTIFIER { struct-declaration-list }"),
    (Rule::StructAnonymous, "struct-specifier", "struct { struct-declaration-list }"),
    (Rule::MembersFirst, "struct-declaration-list", "struct-declaration"),
    (Rule::MembersAppend, "struct-declaration-list", "struct-declaration-list struct-declaration"),
    (Rule::Member, "struct-declaration", "leading-annotations fully-specified-type struct-declarator-list ; trailing-annotations"),
    (Rule::StructDeclaratorsFirst, "struct-declarator-list", "struct-declarator"),
    (Rule::StructDeclaratorsAppend, "struct-declarator-list", "struct-declarator-list , struct-declarator"),
    (Rule::StructDeclarator, "struct-declarator", "IDENTIFIER"),
    (Rule::StructDeclaratorArray, "struct-declarator", "IDENTIFIER array-specifier"),
    (Rule::ArrayFirst, "array-specifier", "[ nested-list ]"),
    (Rule::ArrayAppend, "array-specifier", "array-specifier [ nested-list ]"),
    (Rule::InitializerFirst, "initializer", "init-item"),
    (Rule::InitializerAppend, "initializer", "initializer init-item"),
    (Rule::ItemAny, "init-item", "ANY"),
    (Rule::ItemParens, "init-item", "( nested-list )"),
    (Rule::ItemBraces, "init-item", "{ nested-list }"),
    (Rule::ItemBrackets, "init-item", "[ nested-list ]"),
    (Rule::NestedEmpty, "nested-list", ""),
    (Rule::NestedAppend, "nested-list", "nested-list nested-item"),
    (Rule::NestedItem, "nested-item", "init-item"),
    (Rule::NestedComma, "nested-item", ","),
    (Rule::NestedSemicolon, "nested-item", ";"),
    (Rule::CompoundBody, "compound-body", "{ nested-list }"),
];

pub(crate) fn rule(id: ProductionId) -> Option<Rule> {
    RULES.get(id as usize).map(|(rule, _, _)| *rule)
}

/// Terminals the wildcard `ANY` cannot stand in for. They delimit opaque token lists, except
/// `INVALID` which is never valid.
const NOT_WILDCARD: &[TokenKind] = &[
    TokenKind::Comma,
    TokenKind::Semicolon,
    TokenKind::ParenLeft,
    TokenKind::ParenRight,
    TokenKind::BraceLeft,
    TokenKind::BraceRight,
    TokenKind::BracketLeft,
    TokenKind::BracketRight,
    TokenKind::Invalid,
];

pub fn glsl_grammar() -> Result<Grammar, GrammarError> {
    let mut builder = GrammarBuilder::new();
    for kind in TokenKind::TERMINALS {
        let role = match kind {
            TokenKind::Any => SymbolRole::Wildcard,
            _ => SymbolRole::Common,
        };
        builder.add_terminal(&kind.to_string(), kind.id(), role)?;
    }
    for kind in NOT_WILDCARD {
        builder.exclude_from_wildcard(&kind.to_string())?;
    }
    builder.add_rules(RULES)?;
    builder.build()
}

/// The parser table of the declaration grammar, built on first use.
pub static GLSL_TABLE: LazyLock<Result<ParserTable, GrammarError>> = LazyLock::new(|| {
    let table = glsl_grammar()?.create_parser_table(Construction::Unioned)?;
    log::debug!("glsl parser table has {} states", table.num_states());
    Ok(table)
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_conflict_free() {
        if let Err(err) = &*GLSL_TABLE {
            panic!("{err}");
        }
    }

    #[test]
    fn rules_match_production_ids() {
        let grammar = glsl_grammar().unwrap();
        assert_eq!(grammar.productions().len(), RULES.len());
        assert_eq!(rule(3), Some(Rule::ExternalDeclaration));
        assert_eq!(rule(RULES.len() as ProductionId), None);
    }
}

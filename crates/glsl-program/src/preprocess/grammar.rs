//! The preprocessor grammar. It parses whole files (a list of text runs and directives) as
//! well as single expressions, the latter when the token stream starts with `expr-start`.

use std::sync::LazyLock;

use lalr_gen::{
    Construction, Grammar, GrammarBuilder, GrammarError, ParserTable, ProductionId, SymbolRole,
};

use super::lexer::PpToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Rule {
    Start,
    Program,
    ExpressionProgram,
    ParticlesEmpty,
    ParticlesAppend,
    ParticleText,
    ParticleDirective,
    DirectiveDefine,
    DirectiveUndef,
    DirectiveError,
    DirectiveExtension,
    DirectiveInclude,
    DirectiveLine,
    DirectiveNull,
    DirectivePragma,
    DirectiveVersion,
    DirectiveConditional,
    DefineEmpty,
    DefineObject,
    DefineNoParamsEmpty,
    DefineNoParams,
    DefineParamsEmpty,
    DefineParams,
    TokensFirst,
    TokensAppend,
    FormalsFirst,
    FormalsAppend,
    ErrorEmpty,
    Error,
    ExtensionEmpty,
    Extension,
    Include,
    Line,
    LineString,
    LineSource,
    Null,
    PragmaEmpty,
    Pragma,
    Undef,
    Version,
    VersionProfile,
    Conditional,
    ConditionalElse,
    IfPart,
    IfdefPart,
    IfndefPart,
    ElifPartsFirst,
    ElifPartsAppend,
    ElifPart,
    ElseElifs,
    ElseElifsElse,
    ElseOnly,
    IfDirective,
    IfdefDirective,
    IfndefDirective,
    ElseDirective,
    ElifDirective,
    EndifDirective,
    ConstantExpression,
    MacroObject,
    MacroCallEmpty,
    MacroCall,
    ArgumentsFirst,
    ArgumentsAppend,
    DefinedParens,
    Defined,
    LogicalOrSingle,
    LogicalOr,
    LogicalAndSingle,
    LogicalAnd,
    BitOrSingle,
    BitOr,
    BitXorSingle,
    BitXor,
    BitAndSingle,
    BitAnd,
    EqualitySingle,
    Equal,
    NotEqual,
    RelationalSingle,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    ShiftSingle,
    ShiftLeft,
    ShiftRight,
    AdditiveSingle,
    Add,
    Subtract,
    MultiplicativeSingle,
    Multiply,
    Divide,
    Modulo,
    UnarySingle,
    UnaryPlus,
    UnaryMinus,
    UnaryNot,
    UnaryComplement,
    PrimaryDefined,
    PrimaryMacro,
    PrimaryInt,
    PrimaryParens,
}

// the production id of a rule is its index in this table.
#[rustfmt::skip]
pub(crate) const RULES: &[(Rule, &str, &str)] = &[
    (Rule::Start, "$START$", "program"),
    (Rule::Program, "program", "particle-list"),
    (Rule::ExpressionProgram, "program", "expr-start constant-expression"),
    (Rule::ParticlesEmpty, "particle-list", ""),
    (Rule::ParticlesAppend, "particle-list", "particle-list particle"),
    (Rule::ParticleText, "particle", "text"),
    (Rule::ParticleDirective, "particle", "directive"),
    (Rule::DirectiveDefine, "directive", "def-directive"),
    (Rule::DirectiveUndef, "directive", "undef-directive"),
    (Rule::DirectiveError, "directive", "error-directive"),
    (Rule::DirectiveExtension, "directive", "extension-directive"),
    (Rule::DirectiveInclude, "directive", "include-directive"),
    (Rule::DirectiveLine, "directive", "line-directive"),
    (Rule::DirectiveNull, "directive", "null-directive"),
    (Rule::DirectivePragma, "directive", "pragma-directive"),
    (Rule::DirectiveVersion, "directive", "version-directive"),
    (Rule::DirectiveConditional, "directive", "conditional-directive"),
    (Rule::DefineEmpty, "def-directive", "#define IDENTIFIER newline"),
    (Rule::DefineObject, "def-directive", "#define IDENTIFIER token-list newline"),
    (Rule::DefineNoParamsEmpty, "def-directive", "#define IDENTIFIER macro-lparen ) newline"),
    (Rule::DefineNoParams, "def-directive", "#define IDENTIFIER macro-lparen ) token-list newline"),
    (Rule::DefineParamsEmpty, "def-directive", "#define IDENTIFIER macro-lparen formals-list ) newline"),
    (Rule::DefineParams, "def-directive", "#define IDENTIFIER macro-lparen formals-list ) token-list newline"),
    (Rule::TokensFirst, "token-list", "token"),
    (Rule::TokensAppend, "token-list", "token-list token"),
    (Rule::FormalsFirst, "formals-list", "IDENTIFIER"),
    (Rule::FormalsAppend, "formals-list", "formals-list , IDENTIFIER"),
    (Rule::ErrorEmpty, "error-directive", "#error newline"),
    (Rule::Error, "error-directive", "#error token-list newline"),
    (Rule::ExtensionEmpty, "extension-directive", "#extension newline"),
    (Rule::Extension, "extension-directive", "#extension token-list newline"),
    (Rule::Include, "include-directive", "#include STRING newline"),
    (Rule::Line, "line-directive", "#line INTCONSTANT newline"),
    (Rule::LineString, "line-directive", "#line INTCONSTANT STRING newline"),
    (Rule::LineSource, "line-directive", "#line INTCONSTANT INTCONSTANT newline"),
    (Rule::Null, "null-directive", "# newline"),
    (Rule::PragmaEmpty, "pragma-directive", "#pragma newline"),
    (Rule::Pragma, "pragma-directive", "#pragma token-list newline"),
    (Rule::Undef, "undef-directive", "#undef IDENTIFIER newline"),
    (Rule::Version, "version-directive", "#version INTCONSTANT newline"),
    (Rule::VersionProfile, "version-directive", "#version INTCONSTANT IDENTIFIER newline"),
    (Rule::Conditional, "conditional-directive", "if-part endif-directive"),
    (Rule::ConditionalElse, "conditional-directive", "if-part else-part endif-directive"),
    (Rule::IfPart, "if-part", "if-directive particle-list"),
    (Rule::IfdefPart, "if-part", "ifdef-directive particle-list"),
    (Rule::IfndefPart, "if-part", "ifndef-directive particle-list"),
    (Rule::ElifPartsFirst, "elif-parts", "elif-part"),
    (Rule::ElifPartsAppend, "elif-parts", "elif-parts elif-part"),
    (Rule::ElifPart, "elif-part", "elif-directive particle-list"),
    (Rule::ElseElifs, "else-part", "elif-parts"),
    (Rule::ElseElifsElse, "else-part", "elif-parts else-directive particle-list"),
    (Rule::ElseOnly, "else-part", "else-directive particle-list"),
    (Rule::IfDirective, "if-directive", "#if constant-expression newline"),
    (Rule::IfdefDirective, "ifdef-directive", "#ifdef IDENTIFIER newline"),
    (Rule::IfndefDirective, "ifndef-directive", "#ifndef IDENTIFIER newline"),
    (Rule::ElseDirective, "else-directive", "#else newline"),
    (Rule::ElifDirective, "elif-directive", "#elif constant-expression newline"),
    (Rule::EndifDirective, "endif-directive", "#endif newline"),
    (Rule::ConstantExpression, "constant-expression", "logical-or-expression"),
    (Rule::MacroObject, "macro-evaluation", "IDENTIFIER"),
    (Rule::MacroCallEmpty, "macro-evaluation", "IDENTIFIER ( )"),
    (Rule::MacroCall, "macro-evaluation", "IDENTIFIER ( parameter-list )"),
    (Rule::ArgumentsFirst, "parameter-list", "constant-expression"),
    (Rule::ArgumentsAppend, "parameter-list", "parameter-list , constant-expression"),
    (Rule::DefinedParens, "defined-operator", "defined ( IDENTIFIER )"),
    (Rule::Defined, "defined-operator", "defined IDENTIFIER"),
    (Rule::LogicalOrSingle, "logical-or-expression", "logical-and-expression"),
    (Rule::LogicalOr, "logical-or-expression", "logical-or-expression || logical-and-expression"),
    (Rule::LogicalAndSingle, "logical-and-expression", "inclusive-or-expression"),
    (Rule::LogicalAnd, "logical-and-expression", "logical-and-expression && inclusive-or-expression"),
    (Rule::BitOrSingle, "inclusive-or-expression", "exclusive-or-expression"),
    (Rule::BitOr, "inclusive-or-expression", "inclusive-or-expression | exclusive-or-expression"),
    (Rule::BitXorSingle, "exclusive-or-expression", "and-expression"),
    (Rule::BitXor, "exclusive-or-expression", "exclusive-or-expression ^ and-expression"),
    (Rule::BitAndSingle, "and-expression", "equality-expression"),
    (Rule::BitAnd, "and-expression", "and-expression & equality-expression"),
    (Rule::EqualitySingle, "equality-expression", "relational-expression"),
    (Rule::Equal, "equality-expression", "equality-expression == relational-expression"),
    (Rule::NotEqual, "equality-expression", "equality-expression != relational-expression"),
    (Rule::RelationalSingle, "relational-expression", "shift-expression"),
    (Rule::Less, "relational-expression", "relational-expression < shift-expression"),
    (Rule::Greater, "relational-expression", "relational-expression > shift-expression"),
    (Rule::LessEqual, "relational-expression", "relational-expression <= shift-expression"),
    (Rule::GreaterEqual, "relational-expression", "relational-expression >= shift-expression"),
    (Rule::ShiftSingle, "shift-expression", "additive-expression"),
    (Rule::ShiftLeft, "shift-expression", "shift-expression << additive-expression"),
    (Rule::ShiftRight, "shift-expression", "shift-expression >> additive-expression"),
    (Rule::AdditiveSingle, "additive-expression", "multiplicative-expression"),
    (Rule::Add, "additive-expression", "additive-expression + multiplicative-expression"),
    (Rule::Subtract, "additive-expression", "additive-expression - multiplicative-expression"),
    (Rule::MultiplicativeSingle, "multiplicative-expression", "unary-expression"),
    (Rule::Multiply, "multiplicative-expression", "multiplicative-expression * unary-expression"),
    (Rule::Divide, "multiplicative-expression", "multiplicative-expression / unary-expression"),
    (Rule::Modulo, "multiplicative-expression", "multiplicative-expression % unary-expression"),
    (Rule::UnarySingle, "unary-expression", "primary-expression"),
    (Rule::UnaryPlus, "unary-expression", "+ unary-expression"),
    (Rule::UnaryMinus, "unary-expression", "- unary-expression"),
    (Rule::UnaryNot, "unary-expression", "! unary-expression"),
    (Rule::UnaryComplement, "unary-expression", "~ unary-expression"),
    (Rule::PrimaryDefined, "primary-expression", "defined-operator"),
    (Rule::PrimaryMacro, "primary-expression", "macro-evaluation"),
    (Rule::PrimaryInt, "primary-expression", "INTCONSTANT"),
    (Rule::PrimaryParens, "primary-expression", "( constant-expression )"),
];

pub(crate) fn rule(id: ProductionId) -> Option<Rule> {
    RULES.get(id as usize).map(|(rule, _, _)| *rule)
}

/// Terminals the wildcard `token` cannot stand in for.
const NOT_WILDCARD: &[PpToken] = &[PpToken::Newline, PpToken::Text, PpToken::ExprStart];

pub fn preprocessor_grammar() -> Result<Grammar, GrammarError> {
    let mut builder = GrammarBuilder::new();
    for kind in PpToken::TERMINALS {
        let role = match kind {
            PpToken::Any => SymbolRole::Wildcard,
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

/// The parser table of the preprocessor, built on first use.
pub static PREPROCESSOR_TABLE: LazyLock<Result<ParserTable, GrammarError>> = LazyLock::new(|| {
    let table = preprocessor_grammar()?.create_parser_table(Construction::Unioned)?;
    log::debug!("preprocessor parser table has {} states", table.num_states());
    Ok(table)
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_conflict_free() {
        if let Err(err) = &*PREPROCESSOR_TABLE {
            panic!("{err}");
        }
    }

    #[test]
    fn rules_match_production_ids() {
        let grammar = preprocessor_grammar().unwrap();
        assert_eq!(grammar.productions().len(), RULES.len());
        assert_eq!(rule(2), Some(Rule::ExpressionProgram));
        assert_eq!(rule(RULES.len() as ProductionId), None);
    }
}

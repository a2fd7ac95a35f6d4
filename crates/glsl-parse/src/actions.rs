use derive_more::derive::TryUnwrap;
use lalr_gen::{BodyCursor, Matched, ParseError, ProductionId, SemanticActions, Token};

use crate::{
    grammar::{rule, Rule},
    syntax::*,
};

/// Intermediate values of the semantic actions, one variant per kind of nonterminal.
#[derive(Debug, TryUnwrap)]
pub(crate) enum Node {
    Unit(TranslationUnit),
    External(ExternalDeclaration),
    Annotations(Vec<AnnotationComment>),
    Declaration(Declaration),
    Prototype(FunctionPrototype),
    Parameters(Vec<ParameterDeclaration>),
    Parameter(ParameterDeclaration),
    ParameterQualifiers(Vec<ParameterQualifier>),
    ParameterQualifier(ParameterQualifier),
    DeclarationList(DeclarationList),
    Declarator(Declarator),
    FullType(FullySpecifiedType),
    TypeQualifier(TypeQualifier),
    SingleQualifier(SingleTypeQualifier),
    Storage(StorageQualifier),
    LayoutIds(Vec<LayoutId>),
    LayoutId(LayoutId),
    Interpolation(InterpolationQualifier),
    Precision(PrecisionQualifier),
    TypeSpecifier(TypeSpecifier),
    TypeName(TypeName),
    Struct(StructSpecifier),
    Members(Vec<StructMember>),
    Member(StructMember),
    StructDeclarators(Vec<StructDeclarator>),
    StructDeclarator(StructDeclarator),
    Array(ArraySpecifier),
    Tokens(Vec<Token>),
}

macro_rules! take {
    ($body:ident, $unwrap:ident) => {
        $body
            .node()?
            .$unwrap()
            .map_err(|err| ParseError::Semantic(err.to_string()))?
    };
}

/// Builds the [`TranslationUnit`] of the declaration grammar.
pub(crate) struct GlslActions;

impl SemanticActions for GlslActions {
    type Node = Node;

    fn expand_parse_tree(
        &mut self,
        production: ProductionId,
        body: Vec<Matched<Node>>,
    ) -> Result<Node, ParseError> {
        let rule = rule(production).ok_or(ParseError::UnknownProduction(production))?;
        let mut body = BodyCursor::new(production, body);

        let node = match rule {
            Rule::Start => body.node()?,
            Rule::UnitEmpty => Node::Unit(TranslationUnit::default()),
            Rule::UnitAppend => {
                let mut unit = take!(body, try_unwrap_unit);
                unit.declarations.push(take!(body, try_unwrap_external));
                Node::Unit(unit)
            }
            Rule::ExternalDeclaration => {
                let leading = take!(body, try_unwrap_annotations);
                let declaration = take!(body, try_unwrap_declaration);
                let trailing = take!(body, try_unwrap_annotations);
                Node::External(ExternalDeclaration::Declaration(AnnotatedDeclaration {
                    leading,
                    declaration,
                    trailing,
                }))
            }
            Rule::FunctionDefinition => {
                let annotations = take!(body, try_unwrap_annotations);
                let prototype = take!(body, try_unwrap_prototype);
                let tokens = take!(body, try_unwrap_tokens);
                Node::External(ExternalDeclaration::FunctionDefinition(FunctionDefinition {
                    annotations,
                    prototype,
                    body: TokenList { tokens },
                }))
            }
            Rule::LeadingEmpty | Rule::TrailingEmpty => Node::Annotations(Vec::new()),
            Rule::LeadingAppend | Rule::TrailingAppend => {
                let mut list = take!(body, try_unwrap_annotations);
                let token = body.token()?;
                list.push(AnnotationComment {
                    text: token.text,
                    span: token.span,
                });
                Node::Annotations(list)
            }

            Rule::DeclPrototype => {
                Node::Declaration(Declaration::Prototype(take!(body, try_unwrap_prototype)))
            }
            Rule::DeclVariables => Node::Declaration(Declaration::Variables(take!(
                body,
                try_unwrap_declaration_list
            ))),
            Rule::DeclPrecision => {
                body.skip()?;
                let precision = take!(body, try_unwrap_precision);
                let ty = take!(body, try_unwrap_type_specifier);
                Node::Declaration(Declaration::Precision(PrecisionDeclaration { precision, ty }))
            }
            Rule::DeclBlock | Rule::DeclBlockInstance | Rule::DeclBlockInstanceArray => {
                let qualifier = take!(body, try_unwrap_type_qualifier);
                let name = body.token()?.text;
                body.skip()?;
                let members = take!(body, try_unwrap_members);
                body.skip()?;
                let instance = match rule {
                    Rule::DeclBlock => None,
                    _ => Some(body.token()?.text),
                };
                let array = match rule {
                    Rule::DeclBlockInstanceArray => Some(take!(body, try_unwrap_array)),
                    _ => None,
                };
                Node::Declaration(Declaration::Block(InterfaceBlock {
                    qualifier,
                    name,
                    members,
                    instance,
                    array,
                }))
            }
            Rule::DeclQualifier => {
                Node::Declaration(Declaration::Qualifier(take!(body, try_unwrap_type_qualifier)))
            }

            Rule::Prototype | Rule::PrototypeParameters => {
                let return_type = take!(body, try_unwrap_full_type);
                let name = body.token()?.text;
                body.skip()?;
                let parameters = match rule {
                    Rule::PrototypeParameters => take!(body, try_unwrap_parameters),
                    _ => Vec::new(),
                };
                Node::Prototype(FunctionPrototype {
                    return_type,
                    name,
                    parameters,
                })
            }
            Rule::ParametersFirst => Node::Parameters(vec![take!(body, try_unwrap_parameter)]),
            Rule::ParametersAppend => {
                let mut list = take!(body, try_unwrap_parameters);
                body.skip()?;
                list.push(take!(body, try_unwrap_parameter));
                Node::Parameters(list)
            }
            Rule::Parameter | Rule::ParameterNamed | Rule::ParameterNamedArray => {
                let qualifiers = take!(body, try_unwrap_parameter_qualifiers);
                let ty = take!(body, try_unwrap_type_specifier);
                let name = match rule {
                    Rule::Parameter => None,
                    _ => Some(body.token()?.text),
                };
                let array = match rule {
                    Rule::ParameterNamedArray => Some(take!(body, try_unwrap_array)),
                    _ => None,
                };
                Node::Parameter(ParameterDeclaration {
                    qualifiers,
                    ty,
                    name,
                    array,
                })
            }
            Rule::ParamQualifiersEmpty => Node::ParameterQualifiers(Vec::new()),
            Rule::ParamQualifiersAppend => {
                let mut list = take!(body, try_unwrap_parameter_qualifiers);
                list.push(take!(body, try_unwrap_parameter_qualifier));
                Node::ParameterQualifiers(list)
            }
            Rule::ParamConst => Node::ParameterQualifier(ParameterQualifier::Const),
            Rule::ParamIn => Node::ParameterQualifier(ParameterQualifier::In),
            Rule::ParamOut => Node::ParameterQualifier(ParameterQualifier::Out),
            Rule::ParamInOut => Node::ParameterQualifier(ParameterQualifier::InOut),
            Rule::ParamPrecision => Node::ParameterQualifier(ParameterQualifier::Precision(
                take!(body, try_unwrap_precision),
            )),

            Rule::DeclarationList => Node::DeclarationList(take!(body, try_unwrap_declaration_list)),
            Rule::DeclarationListAppend => {
                let mut list = take!(body, try_unwrap_declaration_list);
                body.skip()?;
                list.declarators.push(take!(body, try_unwrap_declarator));
                Node::DeclarationList(list)
            }
            Rule::SingleDeclarationUnnamed => Node::DeclarationList(DeclarationList {
                ty: take!(body, try_unwrap_full_type),
                declarators: Vec::new(),
            }),
            Rule::SingleDeclaration => {
                let ty = take!(body, try_unwrap_full_type);
                let declarator = take!(body, try_unwrap_declarator);
                Node::DeclarationList(DeclarationList {
                    ty,
                    declarators: vec![declarator],
                })
            }
            Rule::Declarator
            | Rule::DeclaratorArray
            | Rule::DeclaratorInit
            | Rule::DeclaratorArrayInit => {
                let token = body.token()?;
                let array = match rule {
                    Rule::DeclaratorArray | Rule::DeclaratorArrayInit => {
                        Some(take!(body, try_unwrap_array))
                    }
                    _ => None,
                };
                let initializer = match rule {
                    Rule::DeclaratorInit | Rule::DeclaratorArrayInit => {
                        body.skip()?;
                        Some(TokenList {
                            tokens: take!(body, try_unwrap_tokens),
                        })
                    }
                    _ => None,
                };
                Node::Declarator(Declarator {
                    name: token.text,
                    span: token.span,
                    array,
                    initializer,
                })
            }

            Rule::FullType => Node::FullType(FullySpecifiedType {
                qualifier: None,
                specifier: take!(body, try_unwrap_type_specifier),
            }),
            Rule::FullTypeQualified => {
                let qualifier = take!(body, try_unwrap_type_qualifier);
                let specifier = take!(body, try_unwrap_type_specifier);
                Node::FullType(FullySpecifiedType {
                    qualifier: Some(qualifier),
                    specifier,
                })
            }
            Rule::QualifierFirst => Node::TypeQualifier(TypeQualifier {
                qualifiers: vec![take!(body, try_unwrap_single_qualifier)],
            }),
            Rule::QualifierAppend => {
                let mut qualifier = take!(body, try_unwrap_type_qualifier);
                qualifier
                    .qualifiers
                    .push(take!(body, try_unwrap_single_qualifier));
                Node::TypeQualifier(qualifier)
            }
            Rule::QualifierStorage => {
                Node::SingleQualifier(SingleTypeQualifier::Storage(take!(body, try_unwrap_storage)))
            }
            Rule::QualifierLayout => Node::SingleQualifier(SingleTypeQualifier::Layout(take!(
                body,
                try_unwrap_layout_ids
            ))),
            Rule::QualifierInterpolation => Node::SingleQualifier(
                SingleTypeQualifier::Interpolation(take!(body, try_unwrap_interpolation)),
            ),
            Rule::QualifierInvariant => Node::SingleQualifier(SingleTypeQualifier::Invariant),
            Rule::QualifierPrecision => Node::SingleQualifier(SingleTypeQualifier::Precision(
                take!(body, try_unwrap_precision),
            )),

            Rule::StorageConst => Node::Storage(StorageQualifier::Const),
            Rule::StorageAttribute => Node::Storage(StorageQualifier::Attribute),
            Rule::StorageVarying => Node::Storage(StorageQualifier::Varying),
            Rule::StorageCentroidVarying => Node::Storage(StorageQualifier::CentroidVarying),
            Rule::StorageIn => Node::Storage(StorageQualifier::In),
            Rule::StorageOut => Node::Storage(StorageQualifier::Out),
            Rule::StorageCentroidIn => Node::Storage(StorageQualifier::CentroidIn),
            Rule::StorageCentroidOut => Node::Storage(StorageQualifier::CentroidOut),
            Rule::StorageUniform => Node::Storage(StorageQualifier::Uniform),

            Rule::Layout => {
                body.skip()?;
                body.skip()?;
                Node::LayoutIds(take!(body, try_unwrap_layout_ids))
            }
            Rule::LayoutIdsFirst => Node::LayoutIds(vec![take!(body, try_unwrap_layout_id)]),
            Rule::LayoutIdsAppend => {
                let mut list = take!(body, try_unwrap_layout_ids);
                body.skip()?;
                list.push(take!(body, try_unwrap_layout_id));
                Node::LayoutIds(list)
            }
            Rule::LayoutId => Node::LayoutId(LayoutId {
                name: body.token()?.text,
                value: None,
            }),
            Rule::LayoutIdValue => {
                let name = body.token()?.text;
                body.skip()?;
                let token = body.token()?;
                let value = parse_int(&token.text).ok_or_else(|| {
                    ParseError::Semantic(format!("invalid integer `{}`", token.text))
                })?;
                Node::LayoutId(LayoutId {
                    name,
                    value: Some(value),
                })
            }

            Rule::InterpolationSmooth => Node::Interpolation(InterpolationQualifier::Smooth),
            Rule::InterpolationFlat => Node::Interpolation(InterpolationQualifier::Flat),
            Rule::InterpolationNoPerspective => {
                Node::Interpolation(InterpolationQualifier::NoPerspective)
            }
            Rule::PrecisionHigh => Node::Precision(PrecisionQualifier::High),
            Rule::PrecisionMedium => Node::Precision(PrecisionQualifier::Medium),
            Rule::PrecisionLow => Node::Precision(PrecisionQualifier::Low),

            Rule::TypeSpecifier => Node::TypeSpecifier(TypeSpecifier {
                ty: take!(body, try_unwrap_type_name),
                array: None,
            }),
            Rule::TypeSpecifierArray => {
                let ty = take!(body, try_unwrap_type_name);
                let array = take!(body, try_unwrap_array);
                Node::TypeSpecifier(TypeSpecifier {
                    ty,
                    array: Some(array),
                })
            }
            Rule::TypeVoid => Node::TypeName(TypeName::Void),
            Rule::TypeNative => Node::TypeName(TypeName::Native(body.token()?.text)),
            Rule::TypeStruct => Node::TypeName(TypeName::Struct(take!(body, try_unwrap_struct))),
            Rule::TypeNamed => Node::TypeName(TypeName::Named(body.token()?.text)),

            Rule::StructNamed | Rule::StructAnonymous => {
                body.skip()?;
                let name = match rule {
                    Rule::StructNamed => Some(body.token()?.text),
                    _ => None,
                };
                body.skip()?;
                let members = take!(body, try_unwrap_members);
                Node::Struct(StructSpecifier { name, members })
            }
            Rule::MembersFirst => Node::Members(vec![take!(body, try_unwrap_member)]),
            Rule::MembersAppend => {
                let mut list = take!(body, try_unwrap_members);
                list.push(take!(body, try_unwrap_member));
                Node::Members(list)
            }
            Rule::Member => {
                let leading = take!(body, try_unwrap_annotations);
                let ty = take!(body, try_unwrap_full_type);
                let declarators = take!(body, try_unwrap_struct_declarators);
                body.skip()?;
                let trailing = take!(body, try_unwrap_annotations);
                Node::Member(StructMember {
                    leading,
                    ty,
                    declarators,
                    trailing,
                })
            }
            Rule::StructDeclaratorsFirst => {
                Node::StructDeclarators(vec![take!(body, try_unwrap_struct_declarator)])
            }
            Rule::StructDeclaratorsAppend => {
                let mut list = take!(body, try_unwrap_struct_declarators);
                body.skip()?;
                list.push(take!(body, try_unwrap_struct_declarator));
                Node::StructDeclarators(list)
            }
            Rule::StructDeclarator | Rule::StructDeclaratorArray => {
                let name = body.token()?.text;
                let array = match rule {
                    Rule::StructDeclaratorArray => Some(take!(body, try_unwrap_array)),
                    _ => None,
                };
                Node::StructDeclarator(StructDeclarator { name, array })
            }

            Rule::ArrayFirst => {
                body.skip()?;
                let tokens = take!(body, try_unwrap_tokens);
                Node::Array(ArraySpecifier {
                    dimensions: vec![TokenList { tokens }],
                })
            }
            Rule::ArrayAppend => {
                let mut array = take!(body, try_unwrap_array);
                body.skip()?;
                let tokens = take!(body, try_unwrap_tokens);
                array.dimensions.push(TokenList { tokens });
                Node::Array(array)
            }

            Rule::InitializerFirst | Rule::NestedItem => Node::Tokens(take!(body, try_unwrap_tokens)),
            Rule::InitializerAppend | Rule::NestedAppend => {
                let mut tokens = take!(body, try_unwrap_tokens);
                tokens.extend(take!(body, try_unwrap_tokens));
                Node::Tokens(tokens)
            }
            Rule::ItemAny | Rule::NestedComma | Rule::NestedSemicolon => {
                Node::Tokens(vec![body.token()?])
            }
            Rule::ItemParens | Rule::ItemBraces | Rule::ItemBrackets => {
                let open = body.token()?;
                let inner = take!(body, try_unwrap_tokens);
                let close = body.token()?;
                let mut tokens = Vec::with_capacity(inner.len() + 2);
                tokens.push(open);
                tokens.extend(inner);
                tokens.push(close);
                Node::Tokens(tokens)
            }
            Rule::NestedEmpty => Node::Tokens(Vec::new()),
            Rule::CompoundBody => {
                body.skip()?;
                Node::Tokens(take!(body, try_unwrap_tokens))
            }
        };

        Ok(node)
    }
}

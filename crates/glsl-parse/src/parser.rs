//! The [`Parser`] takes the (preprocessed) source of a shader and returns a [syntax tree].
//!
//! [syntax tree]: syntax

use std::str::FromStr;

use crate::{
    actions::GlslActions, error::SpannedError, grammar::GLSL_TABLE, lexer::Lexer, syntax, Error,
};

pub struct Parser;

impl Parser {
    pub fn parse_str(source: &str) -> Result<syntax::TranslationUnit, SpannedError> {
        parse(source).map_err(|e| SpannedError::new(e, source))
    }
}

fn parse(source: &str) -> Result<syntax::TranslationUnit, Error> {
    let table = GLSL_TABLE.as_ref().map_err(|e| Error::Grammar(e.clone()))?;
    let mut parser = lalr_gen::Parser::new(table, Lexer::new(source));
    let node = parser.parse(&mut GlslActions)?;
    let unit = node
        .try_unwrap_unit()
        .map_err(|e| Error::Parse(lalr_gen::ParseError::Semantic(e.to_string())))?;
    Ok(unit)
}

impl FromStr for syntax::TranslationUnit {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        parse(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::*;

    #[test]
    fn empty_source() {
        let unit = Parser::parse_str("").unwrap();
        assert!(unit.declarations.is_empty());
        let unit = Parser::parse_str("  // just a comment\n").unwrap();
        assert!(unit.declarations.is_empty());
    }

    #[test]
    fn variable_declarations() {
        let unit: TranslationUnit = "uniform highp vec4 color, tint[2]; float x = f(1, 2) + 3;"
            .parse()
            .unwrap();
        assert_eq!(unit.declarations.len(), 2);

        let ExternalDeclaration::Declaration(decl) = &unit.declarations[0] else {
            panic!("expected a declaration");
        };
        let Declaration::Variables(list) = &decl.declaration else {
            panic!("expected variables");
        };
        let qualifier = list.ty.qualifier.as_ref().unwrap();
        assert_eq!(qualifier.storage(), Some(StorageQualifier::Uniform));
        assert_eq!(qualifier.precision(), Some(PrecisionQualifier::High));
        assert_eq!(list.ty.specifier.ty, TypeName::Native("vec4".to_string()));
        let names = list.declarators.iter().map(|d| d.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["color", "tint"]);
        assert_eq!(list.declarators[1].array.as_ref().unwrap().size(), Some(2));

        let ExternalDeclaration::Declaration(decl) = &unit.declarations[1] else {
            panic!("expected a declaration");
        };
        let Declaration::Variables(list) = &decl.declaration else {
            panic!("expected variables");
        };
        let init = list.declarators[0].initializer.as_ref().unwrap();
        assert_eq!(init.to_string(), "f ( 1 , 2 ) + 3");
    }

    #[test]
    fn function_definition_body_is_opaque() {
        let source = "void main() {\n  if (x > 0.5) { gl_FragColor = vec4(1.0); }\n  return;\n}";
        let unit = Parser::parse_str(source).unwrap();
        let ExternalDeclaration::FunctionDefinition(func) = &unit.declarations[0] else {
            panic!("expected a function definition");
        };
        assert_eq!(func.prototype.name, "main");
        assert!(func.prototype.return_type.specifier.ty.is_void());
        assert!(func.body.tokens.iter().any(|t| t.text == "gl_FragColor"));
        assert_eq!(func.body.tokens.last().unwrap().text, ";");
    }

    #[test]
    fn prototypes_and_parameters() {
        let unit = Parser::parse_str(
            "float blend(const in float a, out vec3 b[2], highp int);\nvoid f(void);",
        )
        .unwrap();
        let ExternalDeclaration::Declaration(decl) = &unit.declarations[0] else {
            panic!("expected a declaration");
        };
        let Declaration::Prototype(proto) = &decl.declaration else {
            panic!("expected a prototype");
        };
        assert_eq!(proto.name, "blend");
        assert_eq!(proto.parameters.len(), 3);
        assert_eq!(
            proto.parameters[0].qualifiers,
            [ParameterQualifier::Const, ParameterQualifier::In]
        );
        assert_eq!(proto.parameters[1].name.as_deref(), Some("b"));
        assert!(proto.parameters[1].array.is_some());
        assert_eq!(proto.parameters[2].name, None);
    }

    #[test]
    fn interface_block_and_struct() {
        let source = "layout(std140, binding = 2) uniform Lights {\n  vec3 position;\n  float range[4];\n} lights[3];\nstruct Material { vec4 diffuse; float shininess; } material;";
        let unit = Parser::parse_str(source).unwrap();

        let ExternalDeclaration::Declaration(decl) = &unit.declarations[0] else {
            panic!("expected a declaration");
        };
        let Declaration::Block(block) = &decl.declaration else {
            panic!("expected an interface block");
        };
        assert_eq!(block.name, "Lights");
        assert_eq!(block.instance.as_deref(), Some("lights"));
        assert_eq!(block.members.len(), 2);
        let layout = block.qualifier.layout().collect::<Vec<_>>();
        assert_eq!(layout[1].name, "binding");
        assert_eq!(layout[1].value, Some(2));

        let ExternalDeclaration::Declaration(decl) = &unit.declarations[1] else {
            panic!("expected a declaration");
        };
        let Declaration::Variables(list) = &decl.declaration else {
            panic!("expected variables");
        };
        let TypeName::Struct(s) = &list.ty.specifier.ty else {
            panic!("expected a struct");
        };
        assert_eq!(s.name.as_deref(), Some("Material"));
        assert_eq!(s.members[1].declarators[0].name, "shininess");
    }

    #[test]
    fn annotations_are_attached() {
        let source = "//$ @name = \"Color\"\nuniform vec4 color; //$ @widget = \"colorpicker\"\n";
        let unit = Parser::parse_str(source).unwrap();
        let ExternalDeclaration::Declaration(decl) = &unit.declarations[0] else {
            panic!("expected a declaration");
        };
        assert_eq!(decl.leading.len(), 1);
        assert_eq!(decl.trailing.len(), 1);
        assert_eq!(decl.trailing[0].content(), " @widget = \"colorpicker\"");
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = Parser::parse_str("uniform float x").unwrap_err();
        assert!(matches!(
            err.error(),
            Error::Parse(lalr_gen::ParseError::UnexpectedEof { .. })
        ));

        let err = Parser::parse_str("uniform float x $;").unwrap_err();
        let Error::Parse(lalr_gen::ParseError::UnexpectedToken { found, span, .. }) = err.error()
        else {
            panic!("expected an unexpected token");
        };
        assert_eq!(found, "$");
        assert_eq!(span.range(), 16..17);
        assert!(err.to_string().contains("unexpected token"));
    }
}

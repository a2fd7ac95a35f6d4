use glsl_parse::{syntax::TranslationUnit, SymbolTable, VariableSymbol, Visitor};

use crate::{
    preprocess::{Message, Preprocessor, PreprocessorOptions},
    Diagnostic, Error, Resolver,
};

/// A shader program source: preprocessed, parsed and visited.
pub struct Program<R: Resolver> {
    preprocessor: Preprocessor<R>,
    translation: String,
    unit: Option<TranslationUnit>,
    visitor: Visitor,
    log: Vec<Message>,
}

impl<R: Resolver> Program<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            preprocessor: Preprocessor::new(resolver),
            translation: String::new(),
            unit: None,
            visitor: Visitor::new(),
            log: Vec::new(),
        }
    }

    pub fn set_shader_header(&mut self, header: impl Into<String>) {
        self.preprocessor.set_shader_header(header);
    }

    pub fn set_options(&mut self, options: PreprocessorOptions) {
        self.preprocessor.set_options(options);
    }

    /// Preprocesses and parses a source, and records its global variables. The result of a
    /// previous call is discarded.
    pub fn parse(&mut self, source: &str) -> Result<(), Error> {
        self.translation.clear();
        self.unit = None;
        self.visitor = Visitor::new();
        self.log.clear();

        let res = self.parse_impl(source);
        if let Err(err) = &res {
            self.log.push(Message::error(err.to_string()));
        }
        res
    }

    fn parse_impl(&mut self, source: &str) -> Result<(), Error> {
        let translation = self.preprocessor.translate(source);
        self.log.extend_from_slice(self.preprocessor.log());
        self.translation = translation?;

        let unit = glsl_parse::Parser::parse_str(&self.translation).map_err(|e| {
            Diagnostic::from(e.into_owned()).with_source(self.translation.clone())
        })?;

        self.visitor.visit(&unit);
        self.log
            .extend(self.visitor.log().iter().map(|msg| Message::warn(msg.as_str())));
        self.unit = Some(unit);
        Ok(())
    }

    /// The preprocessed text of the last parsed source.
    pub fn translation(&self) -> &str {
        &self.translation
    }

    pub fn unit(&self) -> Option<&TranslationUnit> {
        self.unit.as_ref()
    }

    pub fn symbols(&self) -> &SymbolTable {
        self.visitor.symbols()
    }

    /// See [`Visitor::uniforms`].
    pub fn uniforms(&mut self, keep_in_table: bool) -> Vec<VariableSymbol> {
        self.visitor.uniforms(keep_in_table)
    }

    /// See [`Visitor::outs`].
    pub fn outs(&mut self, keep_in_table: bool) -> Vec<VariableSymbol> {
        self.visitor.outs(keep_in_table)
    }

    pub fn preprocessor(&self) -> &Preprocessor<R> {
        &self.preprocessor
    }

    /// Messages of the preprocessor and the visitor, then the error of the last parse if any.
    pub fn log(&self) -> &[Message] {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use glsl_parse::InternalType;

    use super::*;
    use crate::NoResolver;

    #[test]
    fn uniforms_through_macros() {
        let mut program = Program::new(NoResolver);
        program.set_shader_header("#define LIGHTS 4\n");
        let source = "#ifdef LIGHTS\nuniform vec3 positions[LIGHTS]; //$ @name = \"Positions\"\n#endif\nuniform float gamma;\nout vec4 color;\nvoid main() { color = vec4(gamma); }\n";
        program.parse(source).unwrap();
        assert!(program.translation().contains("positions[4]"));

        let uniforms = program.uniforms(true);
        assert_eq!(uniforms.len(), 2);
        assert_eq!(uniforms[0].name, "positions");
        assert_eq!(uniforms[0].array_size, Some(4));
        assert_eq!(uniforms[0].internal_type, InternalType::Float);
        assert_eq!(uniforms[0].elements, 3);
        assert!(uniforms[0].annotation("name").is_some());

        let outs = program.outs(false);
        assert_eq!(outs.len(), 1);
        assert_eq!(program.symbols().len(), 2);
    }

    #[test]
    fn parse_errors_are_logged() {
        let mut program = Program::new(NoResolver);
        let err = program.parse("#define T float\nuniform T x\n").unwrap_err();
        let Error::Error(diagnostic) = err else {
            panic!("expected a diagnostic");
        };
        assert!(diagnostic.span.is_some());
        assert!(program.unit().is_none());
        assert_eq!(program.log().len(), 1);
        assert_eq!(program.log()[0].level, log::Level::Error);

        program.parse("uniform float x;").unwrap();
        assert!(program.unit().is_some());
        assert!(program.log().is_empty());
    }
}

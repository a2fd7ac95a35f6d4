//! The GLSL preprocessor: macros, conditional compilation and includes.
//!
//! Every directive line is replaced by a blank line in the translation, and the lines of
//! inactive conditional branches are blanked too, so that line numbers of the translation
//! match the source. Included files are spliced in as a whole.

mod actions;
mod eval;
mod expand;
pub mod grammar;
pub mod lexer;
pub mod macros;
pub mod syntax;

use std::fmt::Display;

use lalr_gen::Parser;
use log::Level;

use crate::{Diagnostic, Error, PreprocessError, Resolver, Resource};
use actions::PreprocessorActions;
use eval::Evaluator;
use expand::Expander;
use grammar::PREPROCESSOR_TABLE;
use macros::{Macro, MacroTable};
use syntax::{Condition, Conditional, Directive, File, Particle};

pub use eval::parse_expression;

/// A diagnostic of the preprocessor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

impl Message {
    pub fn new(level: Level, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Level::Error, text)
    }
    pub fn warn(text: impl Into<String>) -> Self {
        Self::new(Level::Warn, text)
    }
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Level::Info, text)
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = self.level.as_str().to_ascii_lowercase();
        write!(f, "{level}: {}", self.text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreprocessorOptions {
    /// Maximum number of nested macro expansions, in text and in conditions.
    pub max_expansion_passes: usize,
    pub max_include_depth: usize,
    /// Object-like macros defined before the source, like `-D NAME=VALUE`.
    pub predefined: Vec<(String, String)>,
}

impl Default for PreprocessorOptions {
    fn default() -> Self {
        Self {
            max_expansion_passes: 64,
            max_include_depth: 16,
            predefined: Vec::new(),
        }
    }
}

/// Parses a source file into text runs and directives.
pub fn parse_file(source: &str) -> Result<File, PreprocessError> {
    let table = PREPROCESSOR_TABLE.as_ref().map_err(|e| e.clone())?;
    let mut parser = Parser::new(table, lexer::tokenize(source));
    let node = parser.parse(&mut PreprocessorActions)?;
    let file = node
        .try_unwrap_file()
        .map_err(|e| lalr_gen::ParseError::Semantic(e.to_string()))?;
    Ok(file)
}

pub struct Preprocessor<R: Resolver> {
    resolver: R,
    options: PreprocessorOptions,
    header: String,
    macros: MacroTable,
    version: Option<(i64, Option<String>)>,
    line: Option<(i64, Option<String>)>,
    log: Vec<Message>,
}

impl<R: Resolver> Preprocessor<R> {
    pub fn new(resolver: R) -> Self {
        let mut pp = Self {
            resolver,
            options: PreprocessorOptions::default(),
            header: String::new(),
            macros: MacroTable::new(),
            version: None,
            line: None,
            log: Vec::new(),
        };
        pp.reset();
        pp
    }

    pub fn set_options(&mut self, options: PreprocessorOptions) {
        self.options = options;
        self.reset();
    }

    pub fn options(&self) -> &PreprocessorOptions {
        &self.options
    }

    /// Text preprocessed before every source. Its macros stay defined for the source, and its
    /// translation is prepended to the translation of the source.
    pub fn set_shader_header(&mut self, header: impl Into<String>) {
        self.header = header.into();
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    fn reset(&mut self) {
        self.macros = MacroTable::with_predefined();
        for (name, value) in &self.options.predefined {
            self.macros.define(Macro::object(name.as_str(), value.as_str()));
        }
        self.version = None;
        self.line = None;
        self.log.clear();
    }

    /// Preprocesses a source. The state of a previous translation is discarded.
    ///
    /// Syntax errors in the directives of the header or the source fail the translation.
    /// Every other problem is recorded in the [log](Self::log).
    pub fn translate(&mut self, source: &str) -> Result<String, Error> {
        self.reset();
        let mut out = String::new();
        let res = self.translate_with_header(source, &mut out);
        for msg in &self.log {
            log::log!(msg.level, "{}", msg.text);
        }
        res?;
        Ok(out)
    }

    fn translate_with_header(
        &mut self,
        source: &str,
        out: &mut String,
    ) -> Result<(), Diagnostic<Error>> {
        if !self.header.is_empty() {
            let header = self.header.clone();
            self.translate_source(&header, 0, out)
                .map_err(|e| Diagnostic::from(e).with_source(header.clone()))?;
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }
        self.translate_source(source, 0, out)
            .map_err(|e| Diagnostic::from(e).with_source(source.to_string()))
    }

    /// `#version` of the last translation, and its profile.
    pub fn version(&self) -> Option<(i64, Option<&str>)> {
        self.version
            .as_ref()
            .map(|(version, profile)| (*version, profile.as_deref()))
    }

    /// The last `#line` of the last translation, and its source string.
    pub fn line(&self) -> Option<(i64, Option<&str>)> {
        self.line
            .as_ref()
            .map(|(line, source)| (*line, source.as_deref()))
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn log(&self) -> &[Message] {
        &self.log
    }

    fn translate_source(
        &mut self,
        source: &str,
        depth: usize,
        out: &mut String,
    ) -> Result<(), PreprocessError> {
        let file = parse_file(source)?;
        self.visit_particles(&file.particles, depth, out);
        Ok(())
    }

    fn visit_particles(&mut self, particles: &[Particle], depth: usize, out: &mut String) {
        for particle in particles {
            match particle {
                Particle::Text(text) => {
                    let mut expander = Expander {
                        macros: &self.macros,
                        max_depth: self.options.max_expansion_passes,
                        log: &mut self.log,
                    };
                    out.push_str(&expander.expand(text));
                }
                Particle::Directive(directive) => self.visit_directive(directive, depth, out),
            }
        }
    }

    fn visit_directive(&mut self, directive: &Directive, depth: usize, out: &mut String) {
        match directive {
            Directive::Define(def) => {
                if def.name.starts_with("GL_") {
                    self.log.push(Message::error(format!(
                        "macro name `{}` is reserved",
                        def.name
                    )));
                } else if let Some(old) = self.macros.define(def.clone().into()) {
                    if old.body != def.body || old.params != def.params {
                        self.log
                            .push(Message::warn(format!("macro `{}` redefined", def.name)));
                    }
                }
            }
            Directive::Undef(name) => {
                if !self.macros.undef(name) {
                    self.log.push(Message::info(format!(
                        "`#undef` of macro `{name}` which is not defined"
                    )));
                }
            }
            Directive::Error(text) => self.log.push(Message::error(format!("#error {text}"))),
            Directive::Extension(_) | Directive::Pragma(_) | Directive::Null => {}
            Directive::Include { path, .. } => {
                self.include(path, depth, out);
                return;
            }
            Directive::Line { line, source } => self.line = Some((*line, source.clone())),
            Directive::Version { version, profile } => {
                if self.version.is_some() {
                    self.log.push(Message::warn("`#version` appears more than once"));
                }
                self.version = Some((*version, profile.clone()));
            }
            Directive::Conditional(cond) => {
                self.visit_conditional(cond, depth, out);
                return;
            }
        }
        out.push('\n');
    }

    fn visit_conditional(&mut self, cond: &Conditional, depth: usize, out: &mut String) {
        let mut taken = false;
        for branch in &cond.branches {
            out.push('\n');
            if !taken && self.condition(&branch.condition) {
                taken = true;
                self.visit_particles(&branch.body, depth, out);
            } else {
                blank_lines(&branch.body, out);
            }
        }
        if let Some(body) = &cond.otherwise {
            out.push('\n');
            if taken {
                blank_lines(body, out);
            } else {
                self.visit_particles(body, depth, out);
            }
        }
        out.push('\n');
    }

    fn condition(&mut self, condition: &Condition) -> bool {
        match condition {
            Condition::If(expr) => {
                let mut eval =
                    Evaluator::new(&self.macros, self.options.max_expansion_passes, &mut self.log);
                eval.eval(expr) != 0
            }
            Condition::Ifdef(name) => self.macros.is_defined(name),
            Condition::Ifndef(name) => !self.macros.is_defined(name),
        }
    }

    fn load_include(&self, path: &str, depth: usize) -> Result<(Resource, String), Error> {
        if depth >= self.options.max_include_depth {
            return Err(PreprocessError::IncludeDepth(self.options.max_include_depth).into());
        }
        let resource = Resource::new(path)?;
        let source = self.resolver.resolve_source(&resource)?;
        Ok((resource, source))
    }

    fn include(&mut self, path: &str, depth: usize, out: &mut String) {
        let (resource, source) = match self.load_include(path, depth) {
            Ok(res) => res,
            Err(err) => {
                self.log
                    .push(Message::error(format!("cannot include `{path}`: {err}")));
                out.push('\n');
                return;
            }
        };
        log::debug!("including `{resource}`");

        let mut included = String::new();
        match self.translate_source(&source, depth + 1, &mut included) {
            Ok(()) => {
                out.push_str(&included);
                if !included.ends_with('\n') {
                    out.push('\n');
                }
            }
            Err(err) => {
                self.log.push(Message::error(format!(
                    "failed to preprocess `{resource}`: {err}"
                )));
                out.push('\n');
            }
        }
    }
}

fn blank_lines(particles: &[Particle], out: &mut String) {
    let lines = syntax::line_count(particles);
    out.extend(std::iter::repeat('\n').take(lines));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoResolver, VirtualFileResolver};

    fn translate(source: &str) -> (String, Vec<Message>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut pp = Preprocessor::new(NoResolver);
        let res = pp.translate(source).unwrap();
        (res, pp.log().to_vec())
    }

    #[test]
    fn text_without_directives_is_unchanged() {
        let source = "uniform vec4 color;\nvoid main() {\n  gl_FragColor = color; /* # */\n}";
        assert_eq!(translate(source).0, source);
        assert_eq!(translate("").0, "");
    }

    #[test]
    fn function_like_macro() {
        let (res, log) = translate("#define DOUBLE(x) ((x)+(x))\nfloat y = DOUBLE(3);\n");
        assert_eq!(res, "\nfloat y = ((3)+(3));\n");
        assert!(log.is_empty());
    }

    #[test]
    fn object_like_macro_with_continuation() {
        let (res, _) = translate("#define SUM a + \\\n  b\nx = SUM;\n");
        assert_eq!(res, "\nx = a + b;\n");
    }

    #[test]
    fn ifdef_else() {
        let source = "#define FOO\n#ifdef FOO\nA\n#else\nB\n#endif\n";
        let (res, _) = translate(source);
        assert_eq!(res, "\n\nA\n\n\n\n");
        assert_eq!(res.lines().count(), source.lines().count());

        let (res, _) = translate("#ifndef FOO\nA\n#else\nB\n#endif\n");
        assert_eq!(res, "\nA\n\n\n\n");
    }

    #[test]
    fn elif_chain() {
        let source = "#define LEVEL 2\n#if LEVEL == 1\none\n#elif LEVEL == 2\ntwo\n#elif LEVEL >= 2\nmore\n#else\nnone\n#endif\n";
        let (res, log) = translate(source);
        assert_eq!(res, "\n\n\n\ntwo\n\n\n\n\n\n");
        assert_eq!(res.lines().count(), source.lines().count());
        assert!(log.is_empty());
    }

    #[test]
    fn nested_conditionals_and_empty_branches() {
        let source = "#if 1\n#if 0\n#else\nx\n#endif\n#endif\n";
        let (res, _) = translate(source);
        assert_eq!(res, "\n\n\nx\n\n\n");
    }

    #[test]
    fn non_ascii_text_passes_through() {
        let (res, log) = translate("#define A 1\nfloat x = A; // d\u{e9}j\u{e0}\nfloat y; \u{e9} /* \u{263a} */ A\n");
        assert_eq!(res, "\nfloat x = 1; // d\u{e9}j\u{e0}\nfloat y; \u{e9} /* \u{263a} */ 1\n");
        assert!(log.is_empty());
    }

    #[test]
    fn undef() {
        let (res, log) = translate("#define X 1\n#undef X\n#if X\na\n#endif\nX\n");
        assert_eq!(res, "\n\n\n\n\nX\n");
        assert_eq!(log, [Message::error("call to undefined macro `X`")]);
    }

    #[test]
    fn directives_become_blank_lines() {
        let mut pp = Preprocessor::new(NoResolver);
        let source = "#version 150 core\n#extension GL_ARB_foo : enable\n#pragma optimize(on)\n#line 10 \"a.glsl\"\n#\n#error oops\nx\n";
        let res = pp.translate(source).unwrap();
        assert_eq!(res, "\n\n\n\n\n\nx\n");
        assert_eq!(pp.version(), Some((150, Some("core"))));
        assert_eq!(pp.line(), Some((10, Some("a.glsl"))));
        assert_eq!(pp.log(), [Message::error("#error oops")]);
    }

    #[test]
    fn header_and_predefined_macros() {
        let mut pp = Preprocessor::new(NoResolver);
        pp.set_options(PreprocessorOptions {
            predefined: vec![("SAMPLES".to_string(), "4".to_string())],
            ..Default::default()
        });
        pp.set_shader_header("#define HEADER 1\nconst int n = SAMPLES;");
        let res = pp.translate("#if HEADER && __VERSION__ == 150\nok\n#endif\n").unwrap();
        assert_eq!(res, "\nconst int n = 4;\n\nok\n\n");
    }

    #[test]
    fn includes() {
        let mut resolver = VirtualFileResolver::new();
        resolver
            .add_file("lib/common.glsl", "#define PI 3.14159\nfloat pi() { return PI; }\n")
            .unwrap();
        resolver.add_file("self.glsl", "#include \"self.glsl\"\n").unwrap();

        let mut pp = Preprocessor::new(&resolver);
        let res = pp
            .translate("#include \"lib\\common.glsl\"\nfloat x = PI;\n")
            .unwrap();
        assert_eq!(res, "\nfloat pi() { return 3.14159; }\nfloat x = 3.14159;\n");

        let res = pp.translate("#include \"missing.glsl\"\nx\n").unwrap();
        assert_eq!(res, "\nx\n");
        assert!(pp.log()[0].text.starts_with("cannot include `missing.glsl`"));

        pp.set_options(PreprocessorOptions {
            max_include_depth: 3,
            ..Default::default()
        });
        pp.translate("#include \"self.glsl\"\n").unwrap();
        assert_eq!(
            pp.log()[0].text,
            "cannot include `self.glsl`: includes are nested more than 3 levels deep"
        );
    }

    #[test]
    fn syntax_errors_fail() {
        let mut pp = Preprocessor::new(NoResolver);
        let err = pp.translate("#define\n").unwrap_err();
        let Error::Error(diagnostic) = err else {
            panic!("expected a diagnostic");
        };
        assert!(matches!(
            *diagnostic.error,
            Error::PreprocessError(PreprocessError::Syntax(_))
        ));
        assert_eq!(diagnostic.source.as_deref(), Some("#define\n"));
    }

    #[test]
    fn message_display() {
        assert_eq!(Message::warn("careful").to_string(), "warn: careful");
    }
}

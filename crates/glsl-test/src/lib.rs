#![cfg_attr(not(test), allow(dead_code, unused_imports))]

use std::{fmt::Display, fs::File, io::BufReader, path::Path};

use glsl_parse::{annotation::AnnotationValue, InternalType};
use glsl_program::{
    NoResolver, Preprocessor, PreprocessorOptions, Program, Resource, VirtualFileResolver,
};
use lalr_gen::{Construction, GrammarBuilder, SymbolRole};
use serde::Deserialize;

#[derive(Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum CaseExpect {
    Pass,
    Fail,
}

impl Display for CaseExpect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseExpect::Pass => f.write_str("Pass"),
            CaseExpect::Fail => f.write_str("Fail"),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "kind")]
enum CaseKind {
    Preprocess { result: String },
    Program { expect: CaseExpect },
}

#[derive(Deserialize)]
struct Case {
    name: String,
    desc: String,
    #[serde(flatten)]
    kind: CaseKind,
    code: String,
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn json_cases(path: &Path) -> Vec<Case> {
    println!("testing json-test `{}`", path.display());
    let file = File::open(path).expect("failed to read file");
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .inspect_err(|err| eprintln!("{err}"))
        .expect("invalid json test file")
}

/// Returns the number of failed cases.
fn run_case(case: &Case) -> u32 {
    print!(" * `{}` ({}): ", case.name, case.desc);
    match &case.kind {
        CaseKind::Preprocess { result } => {
            let mut pp = Preprocessor::new(NoResolver);
            match pp.translate(&case.code) {
                Ok(translation) if translation == *result => {
                    println!("Pass");
                    0
                }
                Ok(translation) => {
                    println!("Fail\n   * expected: {result:?}\n   * found:    {translation:?}");
                    1
                }
                Err(err) => {
                    println!("Fail\n{err}");
                    1
                }
            }
        }
        CaseKind::Program { expect } => {
            let mut program = Program::new(NoResolver);
            let res = program
                .parse(&case.code)
                .is_ok()
                .then_some(CaseExpect::Pass)
                .unwrap_or(CaseExpect::Fail);
            println!("{res}");
            if res == *expect {
                0
            } else {
                for msg in program.log() {
                    println!("   * {msg}");
                }
                1
            }
        }
    }
}

#[test]
fn json_test() {
    init_logger();
    let dir = std::fs::read_dir("cases").expect("missing directory cases");
    let mut total_fails = 0;
    let mut total_count = 0;

    for entry in dir {
        let entry = entry.expect("error reading entry");
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            let cases = json_cases(&path);
            total_count += cases.len() as u32;
            total_fails += cases.iter().map(run_case).sum::<u32>();
        }
    }

    let total_pass = total_count - total_fails;
    println!("SUMMARY: {total_pass}/{total_count} Pass, {total_fails}/{total_count} Fails");
    assert!(total_count > 0);
    assert!(total_fails == 0);
}

#[test]
fn balanced_parentheses() {
    let mut builder = GrammarBuilder::new();
    builder.add_terminal("(", 1, SymbolRole::Common).unwrap();
    builder.add_terminal(")", 2, SymbolRole::Common).unwrap();
    builder.add_production("$START$", "S").unwrap();
    builder.add_production("S", "( S )").unwrap();
    builder.add_production("S", "").unwrap();
    let grammar = builder.build().unwrap();

    struct Count;
    impl lalr_gen::SemanticActions for Count {
        type Node = ();
        fn expand_parse_tree(
            &mut self,
            _: lalr_gen::ProductionId,
            _: Vec<lalr_gen::Matched<()>>,
        ) -> Result<(), lalr_gen::ParseError> {
            Ok(())
        }
    }

    for construction in [
        Construction::Canonical,
        Construction::Merged,
        Construction::Unioned,
    ] {
        let table = grammar.create_parser_table(construction).unwrap();
        let parse = |input: &str| {
            let tokens = input.char_indices().map(|(i, c)| {
                let id = if c == '(' { 1 } else { 2 };
                lalr_gen::Token::new(id, c, lalr_gen::Span::new(i..i + 1))
            });
            lalr_gen::Parser::new(&table, tokens.collect::<Vec<_>>()).parse(&mut Count)
        };
        assert!(parse("(())").is_ok());
        assert!(parse("()").is_ok());
        assert!(parse("").is_ok());
        assert!(matches!(
            parse("(()"),
            Err(lalr_gen::ParseError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            parse("())"),
            Err(lalr_gen::ParseError::UnexpectedToken { .. })
        ));
    }
}

#[test]
fn included_uniforms() {
    init_logger();
    let mut resolver = VirtualFileResolver::new();
    resolver
        .add_file(
            "lib/lighting.glsl",
            "#ifndef LIGHTING\n#define LIGHTING\n#define MAX_LIGHTS 4\nuniform vec3 lightPositions[MAX_LIGHTS]; //$ @name = \"Light positions\"\n#endif\n",
        )
        .unwrap();
    resolver
        .add_file(
            "lib/sampling.glsl",
            "#include \"lib/lighting.glsl\"\n//$ @widget = \"texture\", @unit = 0\nuniform sampler2D colorTex;\n",
        )
        .unwrap();

    let source = "#version 150\n#include \"lib/lighting.glsl\"\n#include \"lib\\lighting.glsl\"\n#include \"lib/sampling.glsl\"\nuniform mat4 modelView;\nout vec4 fragColor;\nvoid main() { fragColor = vec4(1.0); }\n";
    let mut program = Program::new(&resolver);
    program.parse(source).unwrap();

    let names = program
        .symbols()
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, ["lightPositions", "colorTex", "modelView", "fragColor"]);

    let uniforms = program.uniforms(false);
    assert_eq!(uniforms.len(), 3);
    assert_eq!(uniforms[0].array_size, Some(4));
    assert_eq!(
        uniforms[0].annotation("name").unwrap().values,
        [AnnotationValue::String("Light positions".to_string())]
    );
    assert_eq!(uniforms[1].internal_type, InternalType::Sampler);
    assert_eq!(uniforms[1].elements, 2);
    assert_eq!(
        uniforms[1].annotation("unit").unwrap().values,
        [AnnotationValue::Int(0)]
    );
    assert_eq!(uniforms[2].internal_type, InternalType::Float);
    assert_eq!(uniforms[2].elements, 16);

    let outs = program.outs(false);
    assert_eq!(outs.len(), 1);
    assert!(program.symbols().is_empty());
    assert_eq!(program.preprocessor().version(), Some((150, None)));
}

#[test]
fn include_errors_are_logged() {
    init_logger();
    let mut resolver = VirtualFileResolver::new();
    resolver.add_file("a.glsl", "#include \"b.glsl\"\nfloat a;\n").unwrap();
    resolver.add_file("b.glsl", "#include \"a.glsl\"\nfloat b;\n").unwrap();

    let mut pp = Preprocessor::new(&resolver);
    pp.set_options(PreprocessorOptions {
        max_include_depth: 4,
        ..Default::default()
    });
    let translation = pp.translate("#include \"a.glsl\"\n#include \"../a.glsl\"\n").unwrap();
    assert!(translation.contains("float a;"));
    assert!(translation.contains("float b;"));
    let errors = pp
        .log()
        .iter()
        .filter(|msg| msg.level == log::Level::Error)
        .count();
    assert_eq!(errors, 2);
    assert!(pp.log()[1].text.contains("invalid include path `../a.glsl`"));
    assert_eq!(Resource::new("a.glsl").unwrap().to_string(), "a.glsl");
}

#[test]
fn builtin_tables_are_conflict_free() {
    let tables = [
        ("glsl", glsl_parse::grammar::GLSL_TABLE.as_ref().err()),
        (
            "annotation",
            glsl_parse::annotation::ANNOTATION_TABLE.as_ref().err(),
        ),
        (
            "preprocessor",
            glsl_program::preprocess::grammar::PREPROCESSOR_TABLE
                .as_ref()
                .err(),
        ),
    ];
    for (name, err) in tables {
        assert!(err.is_none(), "{name} table: {}", err.unwrap());
    }
}

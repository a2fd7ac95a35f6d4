//! A parser for the declarations of GLSL shaders, built on tables generated by [`lalr_gen`].
//!
//! # Parsing a source file
//!
//! ```rust
//! let source = "uniform vec4 color; //$ @name = \"Color\"\nvoid main() { gl_FragColor = color; }";
//! let unit = glsl_parse::Parser::parse_str(source).unwrap();
//! println!("{unit:?}");
//! ```
//!
//! Function bodies and initializers are not parsed, see [syntax tree].
//!
//! # Uniforms and annotations
//!
//! The [`Visitor`] records the global variables of a translation unit. Comments starting with
//! `//$` or `/*$` hold [annotations] for the declaration they precede or end.
//!
//! ```rust
//! let source = "uniform float gamma; //$ @min = 1.0 @max = 3.0\n";
//! let unit = glsl_parse::Parser::parse_str(source).unwrap();
//! let mut visitor = glsl_parse::Visitor::new();
//! visitor.visit(&unit);
//! let uniforms = visitor.uniforms(false);
//! assert_eq!(uniforms[0].annotations.len(), 2);
//! ```
//!
//! [syntax tree]: syntax
//! [annotations]: annotation

pub mod annotation;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod syntax;
pub mod visitor;

mod actions;

pub use error::{Error, SpannedError};
pub use lexer::Lexer;
pub use parser::Parser;
pub use visitor::{InternalType, SymbolTable, VariableSymbol, Visitor};

//! Preprocessing and parsing of GLSL shader programs.
//!
//! The [`Preprocessor`] expands macros, evaluates conditional compilation directives and
//! splices included files found by a [`Resolver`]. A [`Program`] runs the preprocessor, parses
//! the translation with [`glsl_parse`] and extracts the annotated uniforms and outputs.
//!
//! ```rust
//! use glsl_program::{Program, VirtualFileResolver};
//!
//! let mut resolver = VirtualFileResolver::new();
//! resolver.add_file("common.glsl", "#define COUNT 2\n").unwrap();
//!
//! let mut program = Program::new(resolver);
//! let source = "#include \"common.glsl\"\nuniform float gamma[COUNT]; //$ @min = 1.0\n";
//! program.parse(source).unwrap();
//! let uniforms = program.uniforms(false);
//! assert_eq!(uniforms[0].name, "gamma");
//! assert_eq!(uniforms[0].array_size, Some(2));
//! ```

mod error;
pub mod preprocess;
mod program;
mod resolve;

pub use error::{Diagnostic, Error, PreprocessError};
pub use preprocess::{Message, Preprocessor, PreprocessorOptions};
pub use program::Program;
pub use resolve::{FileResolver, NoResolver, ResolveError, Resolver, Resource, VirtualFileResolver};

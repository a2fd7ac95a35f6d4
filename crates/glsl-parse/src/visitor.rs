//! Collects the global variables of a [`TranslationUnit`] and the annotations attached to them.

use std::fmt::Display;

use itertools::Itertools;

use crate::{
    annotation::{parse_annotation, Annotation},
    syntax::*,
};

/// The scalar type of a variable, with [`VariableSymbol::elements`] giving its arity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InternalType {
    Void,
    Bool,
    Int,
    Uint,
    Float,
    Sampler,
    Struct,
}

impl Display for InternalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InternalType::Void => "VOID",
            InternalType::Bool => "BOOL",
            InternalType::Int => "INT",
            InternalType::Uint => "UINT",
            InternalType::Float => "FLOAT",
            InternalType::Sampler => "SAMPLER",
            InternalType::Struct => "STRUCT",
        };
        f.write_str(name)
    }
}

/// Classifies a type name. `vec3` is three floats, `mat2x3` six, `sampler2D` two dimensions
/// and `samplerCube` six faces. Structs and user-defined types have no elements.
pub fn internal_type(ty: &TypeName) -> (InternalType, u32) {
    match ty {
        TypeName::Void => (InternalType::Void, 1),
        TypeName::Struct(_) | TypeName::Named(_) => (InternalType::Struct, 0),
        TypeName::Native(name) => native_type(name),
    }
}

fn native_type(name: &str) -> (InternalType, u32) {
    if let Some(pos) = name.find("sampler") {
        let dim = &name[pos + "sampler".len()..];
        let elements = if dim.starts_with("1D") {
            1
        } else if dim.starts_with("2D") {
            2
        } else if dim.starts_with("3D") {
            3
        } else if dim.starts_with("Cube") {
            6
        } else {
            0
        };
        return (InternalType::Sampler, elements);
    }

    if let Some(dims) = name.strip_prefix("mat") {
        let mut dims = dims.split('x').filter_map(|d| d.parse::<u32>().ok());
        let elements = match (dims.next(), dims.next()) {
            (Some(n), Some(m)) => n * m,
            (Some(n), None) => n * n,
            _ => 0,
        };
        return (InternalType::Float, elements);
    }

    let (prefix, elements) = match name.split_once("vec") {
        Some((prefix, n)) => (prefix, n.parse().unwrap_or(0)),
        None => (name, 1),
    };
    let ty = match prefix {
        "b" | "bool" => InternalType::Bool,
        "i" | "int" => InternalType::Int,
        "u" | "uint" => InternalType::Uint,
        _ => InternalType::Float,
    };
    (ty, elements)
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableSymbol {
    pub name: String,
    /// the type as written, e.g. `vec4` or the name of a struct.
    pub type_name: String,
    pub internal_type: InternalType,
    pub elements: u32,
    pub is_array: bool,
    /// `None` for unsized arrays and sizes that are not integer literals.
    pub array_size: Option<i64>,
    pub storage: Option<StorageQualifier>,
    pub interpolation: Option<InterpolationQualifier>,
    pub precision: Option<PrecisionQualifier>,
    pub invariant: bool,
    pub annotations: Vec<Annotation>,
}

impl VariableSymbol {
    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|annot| annot.name == name)
    }
}

impl Display for VariableSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(storage) = self.storage {
            write!(f, "{} ", storage_name(storage))?;
        }
        write!(f, "{} {}", self.type_name, self.name)?;
        if self.is_array {
            match self.array_size {
                Some(size) => write!(f, "[{size}]")?,
                None => write!(f, "[]")?,
            }
        }
        write!(f, " ({} x{})", self.internal_type, self.elements)?;
        if !self.annotations.is_empty() {
            write!(f, " {}", self.annotations.iter().format(" "))?;
        }
        Ok(())
    }
}

fn storage_name(storage: StorageQualifier) -> &'static str {
    match storage {
        StorageQualifier::Const => "const",
        StorageQualifier::Attribute => "attribute",
        StorageQualifier::Varying => "varying",
        StorageQualifier::CentroidVarying => "centroid varying",
        StorageQualifier::In => "in",
        StorageQualifier::CentroidIn => "centroid in",
        StorageQualifier::Out => "out",
        StorageQualifier::CentroidOut => "centroid out",
        StorageQualifier::Uniform => "uniform",
    }
}

fn type_name(ty: &TypeName) -> String {
    match ty {
        TypeName::Void => "void".to_string(),
        TypeName::Native(name) | TypeName::Named(name) => name.clone(),
        TypeName::Struct(s) => s
            .name
            .clone()
            .unwrap_or_else(|| "struct".to_string()),
    }
}

/// A single global scope of variables, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<VariableSymbol>,
}

impl SymbolTable {
    /// Inserts a symbol. A symbol with the same name is replaced in place and returned.
    pub fn insert(&mut self, symbol: VariableSymbol) -> Option<VariableSymbol> {
        match self.symbols.iter_mut().find(|s| s.name == symbol.name) {
            Some(existing) => Some(std::mem::replace(existing, symbol)),
            None => {
                self.symbols.push(symbol);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&VariableSymbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableSymbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns the symbols matching `pred`, removing them from the table unless `keep`.
    pub fn select(
        &mut self,
        keep: bool,
        mut pred: impl FnMut(&VariableSymbol) -> bool,
    ) -> Vec<VariableSymbol> {
        if keep {
            return self.symbols.iter().filter(|s| pred(s)).cloned().collect();
        }
        let (selected, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.symbols)
            .into_iter()
            .partition(|s| pred(s));
        self.symbols = rest;
        selected
    }
}

/// Walks the declarations of a translation unit and fills a [`SymbolTable`].
#[derive(Clone, Debug, Default)]
pub struct Visitor {
    symbols: SymbolTable,
    log: Vec<String>,
}

impl Visitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visit(&mut self, unit: &TranslationUnit) {
        for decl in &unit.declarations {
            match decl {
                ExternalDeclaration::Declaration(decl) => self.visit_declaration(decl),
                ExternalDeclaration::FunctionDefinition(_) => {}
            }
        }
    }

    fn visit_declaration(&mut self, decl: &AnnotatedDeclaration) {
        let annotations = self.annotations(decl.leading.iter().chain(&decl.trailing));
        match &decl.declaration {
            Declaration::Variables(list) => {
                for declarator in &list.declarators {
                    let symbol = self.variable(
                        &list.ty,
                        None,
                        &declarator.name,
                        declarator.array.as_ref(),
                        annotations.clone(),
                    );
                    self.insert(symbol);
                }
            }
            Declaration::Block(block) => self.visit_block(block, annotations),
            Declaration::Prototype(_) | Declaration::Precision(_) | Declaration::Qualifier(_) => {}
        }
    }

    /// A block with an instance name declares one struct variable, otherwise its members are
    /// global variables with the qualifiers of the block.
    fn visit_block(&mut self, block: &InterfaceBlock, annotations: Vec<Annotation>) {
        if let Some(instance) = &block.instance {
            let ty = FullySpecifiedType {
                qualifier: Some(block.qualifier.clone()),
                specifier: TypeSpecifier {
                    ty: TypeName::Named(block.name.clone()),
                    array: None,
                },
            };
            let symbol = self.variable(&ty, None, instance, block.array.as_ref(), annotations);
            self.insert(symbol);
            return;
        }

        for member in &block.members {
            let mut annotations = annotations.clone();
            annotations.extend(self.annotations(member.leading.iter().chain(&member.trailing)));
            for declarator in &member.declarators {
                let symbol = self.variable(
                    &member.ty,
                    Some(&block.qualifier),
                    &declarator.name,
                    declarator.array.as_ref(),
                    annotations.clone(),
                );
                self.insert(symbol);
            }
        }
    }

    fn variable(
        &self,
        ty: &FullySpecifiedType,
        outer: Option<&TypeQualifier>,
        name: &str,
        array: Option<&ArraySpecifier>,
        annotations: Vec<Annotation>,
    ) -> VariableSymbol {
        let qualifier = ty.qualifier.as_ref();
        let storage = qualifier
            .and_then(TypeQualifier::storage)
            .or(outer.and_then(TypeQualifier::storage));
        let interpolation = qualifier
            .and_then(TypeQualifier::interpolation)
            .or(outer.and_then(TypeQualifier::interpolation));
        let precision = qualifier
            .and_then(TypeQualifier::precision)
            .or(outer.and_then(TypeQualifier::precision));
        let invariant = qualifier.is_some_and(TypeQualifier::is_invariant)
            || outer.is_some_and(TypeQualifier::is_invariant);

        let dimensions = ty
            .specifier
            .array
            .iter()
            .chain(array)
            .flat_map(|array| array.dimensions.iter().cloned())
            .collect_vec();
        let is_array = !dimensions.is_empty();
        let array_size = is_array
            .then(|| ArraySpecifier { dimensions }.size())
            .flatten();

        let (internal_type, elements) = internal_type(&ty.specifier.ty);
        VariableSymbol {
            name: name.to_string(),
            type_name: type_name(&ty.specifier.ty),
            internal_type,
            elements,
            is_array,
            array_size,
            storage,
            interpolation,
            precision,
            invariant,
            annotations,
        }
    }

    fn annotations<'a>(
        &mut self,
        comments: impl Iterator<Item = &'a AnnotationComment>,
    ) -> Vec<Annotation> {
        let mut annotations = Vec::new();
        for comment in comments {
            match parse_annotation(comment.content(), comment.content_offset()) {
                Ok(tags) => annotations.extend(tags),
                Err(e) => {
                    let message = format!("invalid annotation `{}`: {e}", comment.text.trim());
                    log::warn!("{message}");
                    self.log.push(message);
                }
            }
        }
        annotations
    }

    fn insert(&mut self, symbol: VariableSymbol) {
        log::trace!("global variable `{}`", symbol.name);
        if let Some(previous) = self.symbols.insert(symbol) {
            let message = format!("redeclaration of `{}`", previous.name);
            log::warn!("{message}");
            self.log.push(message);
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Variables declared `uniform`. Unless `keep_in_table`, they are removed from the table.
    pub fn uniforms(&mut self, keep_in_table: bool) -> Vec<VariableSymbol> {
        self.symbols
            .select(keep_in_table, |s| s.storage == Some(StorageQualifier::Uniform))
    }

    /// Variables declared `out` or `centroid out`. Unless `keep_in_table`, they are removed
    /// from the table.
    pub fn outs(&mut self, keep_in_table: bool) -> Vec<VariableSymbol> {
        self.symbols.select(keep_in_table, |s| {
            matches!(
                s.storage,
                Some(StorageQualifier::Out | StorageQualifier::CentroidOut)
            )
        })
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{annotation::AnnotationValue, Parser};

    fn visit(source: &str) -> Visitor {
        let _ = env_logger::builder().is_test(true).try_init();
        let unit = Parser::parse_str(source).unwrap();
        let mut visitor = Visitor::new();
        visitor.visit(&unit);
        visitor
    }

    #[test]
    fn native_types() {
        let native = native_type;
        assert_eq!(native("float"), (InternalType::Float, 1));
        assert_eq!(native("vec3"), (InternalType::Float, 3));
        assert_eq!(native("bvec2"), (InternalType::Bool, 2));
        assert_eq!(native("uvec4"), (InternalType::Uint, 4));
        assert_eq!(native("int"), (InternalType::Int, 1));
        assert_eq!(native("mat3"), (InternalType::Float, 9));
        assert_eq!(native("mat2x4"), (InternalType::Float, 8));
        assert_eq!(native("sampler2DShadow"), (InternalType::Sampler, 2));
        assert_eq!(native("isampler2DMSArray"), (InternalType::Sampler, 2));
        assert_eq!(native("samplerCube"), (InternalType::Sampler, 6));
        assert_eq!(native("samplerBuffer"), (InternalType::Sampler, 0));
        assert_eq!(native("usampler1D"), (InternalType::Sampler, 1));
    }

    #[test]
    fn uniforms_in_declaration_order() {
        let mut visitor = visit(
            "uniform sampler2D tex;\nout vec4 color;\nuniform float weights[4], bias;\nconst int n = 3;",
        );
        assert_eq!(visitor.symbols().len(), 5);

        let uniforms = visitor.uniforms(true);
        let names = uniforms.iter().map(|s| s.name.as_str()).collect_vec();
        assert_eq!(names, ["tex", "weights", "bias"]);
        assert!(uniforms[1].is_array);
        assert_eq!(uniforms[1].array_size, Some(4));
        assert!(!uniforms[2].is_array);
        assert_eq!(visitor.symbols().len(), 5);

        let outs = visitor.outs(false);
        assert_eq!(outs.len(), 1);
        assert_eq!(outs[0].name, "color");
        assert_eq!(outs[0].elements, 4);
        assert_eq!(visitor.symbols().len(), 4);
        assert!(visitor.symbols().get("color").is_none());
    }

    #[test]
    fn annotations_leading_then_trailing() {
        let mut visitor = visit(
            "//$ @name = \"Tint\"\nuniform vec3 tint; //$ @min = 0.0, @max = 1.0\n",
        );
        let uniforms = visitor.uniforms(false);
        let tint = &uniforms[0];
        let names = tint.annotations.iter().map(|a| a.name.as_str()).collect_vec();
        assert_eq!(names, ["name", "min", "max"]);
        assert_eq!(
            tint.annotation("max").unwrap().values,
            [AnnotationValue::Float(1.0)]
        );
        assert!(visitor.symbols().is_empty());
    }

    #[test]
    fn invalid_annotation_is_logged() {
        let visitor = visit("//$ @name \"Tint\"\nuniform vec3 tint;\n");
        let tint = visitor.symbols().get("tint").unwrap();
        assert!(tint.annotations.is_empty());
        assert_eq!(visitor.log().len(), 1);
        assert!(visitor.log()[0].contains("invalid annotation"));
    }

    #[test]
    fn blocks_and_structs() {
        let mut visitor = visit(
            "uniform Light { vec3 position; float radius; };\nuniform Params { int mode; } params[2];\nstruct S { float a; } s;",
        );
        let uniforms = visitor.uniforms(true);
        let names = uniforms.iter().map(|s| s.name.as_str()).collect_vec();
        assert_eq!(names, ["position", "radius", "params"]);
        assert_eq!(uniforms[2].internal_type, InternalType::Struct);
        assert_eq!(uniforms[2].elements, 0);
        assert_eq!(uniforms[2].array_size, Some(2));
        let s = visitor.symbols().get("s").unwrap();
        assert_eq!(s.type_name, "S");
        assert_eq!(s.storage, None);
    }

    #[test]
    fn redeclaration_replaces_in_place() {
        let visitor = visit("uniform float a;\nuniform int b;\nuniform vec2 a;");
        let names = visitor.symbols().iter().map(|s| s.name.as_str()).collect_vec();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(visitor.symbols().get("a").unwrap().elements, 2);
        assert_eq!(visitor.log().len(), 1);
    }

    #[test]
    fn display() {
        let visitor = visit("uniform highp vec4 colors[3]; //$ @name = \"Colors\"\n");
        let colors = visitor.symbols().get("colors").unwrap();
        assert_eq!(
            colors.to_string(),
            "uniform vec4 colors[3] (FLOAT x4) @name = \"Colors\""
        );
    }
}

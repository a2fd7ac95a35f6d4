use std::{collections::HashMap, fmt::Display};

use super::syntax::MacroDefinition;

/// A preprocessor macro. `#undef` keeps the entry but clears `defined`.
#[derive(Clone, Debug, PartialEq)]
pub struct Macro {
    pub name: String,
    /// `None` for object-like macros.
    pub params: Option<Vec<String>>,
    pub body: String,
    pub defined: bool,
}

impl Macro {
    pub fn object(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: None,
            body: body.into(),
            defined: true,
        }
    }

    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }
}

impl From<MacroDefinition> for Macro {
    fn from(def: MacroDefinition) -> Self {
        Self {
            name: def.name,
            params: def.params,
            body: def.body,
            defined: true,
        }
    }
}

impl Display for Macro {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#define {}", self.name)?;
        if let Some(params) = &self.params {
            write!(f, "({})", params.join(", "))?;
        }
        if !self.body.is_empty() {
            write!(f, " {}", self.body)?;
        }
        Ok(())
    }
}

/// Macros share a single global scope.
#[derive(Clone, Debug, Default)]
pub struct MacroTable {
    macros: HashMap<String, Macro>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding `__FILE__`, `__LINE__` and `__VERSION__`.
    pub fn with_predefined() -> Self {
        let mut table = Self::new();
        table.define(Macro::object("__FILE__", "0"));
        table.define(Macro::object("__LINE__", "0"));
        table.define(Macro::object("__VERSION__", "150"));
        table
    }

    /// Adds or replaces a macro. Returns the previous definition, if it was defined.
    pub fn define(&mut self, mac: Macro) -> Option<Macro> {
        self.macros
            .insert(mac.name.clone(), mac)
            .filter(|old| old.defined)
    }

    /// Returns false if the macro was not defined.
    pub fn undef(&mut self, name: &str) -> bool {
        match self.macros.get_mut(name) {
            Some(mac) if mac.defined => {
                mac.defined = false;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name).filter(|mac| mac.defined)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether the name was defined once and then undefined.
    pub fn is_undefined(&self, name: &str) -> bool {
        self.macros.get(name).is_some_and(|mac| !mac.defined)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Macro> {
        self.macros.values().filter(|mac| mac.defined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_undef() {
        let mut table = MacroTable::with_predefined();
        assert_eq!(table.get("__VERSION__").unwrap().body, "150");

        assert_eq!(table.define(Macro::object("FOO", "1")), None);
        let old = table.define(Macro::object("FOO", "2")).unwrap();
        assert_eq!(old.body, "1");
        assert_eq!(table.get("FOO").unwrap().body, "2");

        assert!(table.undef("FOO"));
        assert!(!table.undef("FOO"));
        assert!(!table.is_defined("FOO"));
        assert!(table.is_undefined("FOO"));
        assert!(!table.is_undefined("BAR"));
        assert_eq!(table.iter().count(), 3);

        assert_eq!(table.define(Macro::object("FOO", "3")), None);
        assert!(table.is_defined("FOO"));
    }

    #[test]
    fn display() {
        let mac = Macro::from(MacroDefinition {
            name: "MAX".to_string(),
            params: Some(vec!["a".to_string(), "b".to_string()]),
            body: "((a) > (b) ? (a) : (b))".to_string(),
        });
        assert!(mac.is_function_like());
        assert_eq!(mac.to_string(), "#define MAX(a, b) ((a) > (b) ? (a) : (b))");
        assert_eq!(Macro::object("EMPTY", "").to_string(), "#define EMPTY");
    }
}

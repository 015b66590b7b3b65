//! Fully-qualified symbols — the primary key for definitions, tests, and namespaces.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A fully-qualified symbol: an interned `(namespace, name)` pair.
///
/// Qualified symbols (`some.ns/a-var`) identify vars and synthesized tests;
/// unqualified symbols (`some.ns`) identify namespace nodes. The string form
/// is the stable serialization used for cache files and display, so equality
/// and ordering are defined on it and nothing downstream parses strings ad hoc.
///
/// Cloning is cheap (`Arc<str>` segments), which matters because symbols key
/// every map in the graph and selection paths.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    ns: Option<Arc<str>>,
    name: Arc<str>,
}

impl Symbol {
    /// Construct a qualified symbol `ns/name`.
    pub fn qualified(ns: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Symbol {
            ns: Some(Arc::from(ns.as_ref())),
            name: Arc::from(name.as_ref()),
        }
    }

    /// Construct an unqualified symbol (used for namespace nodes).
    pub fn unqualified(name: impl AsRef<str>) -> Self {
        Symbol {
            ns: None,
            name: Arc::from(name.as_ref()),
        }
    }

    /// The namespace part, if qualified.
    pub fn namespace(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    /// The name part (for an unqualified symbol, the whole symbol).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The namespace this symbol belongs to, as a symbol.
    ///
    /// For a qualified `some.ns/a-var` this is `some.ns`; an unqualified
    /// symbol is its own namespace.
    pub fn namespace_symbol(&self) -> Symbol {
        match &self.ns {
            Some(ns) => Symbol {
                ns: None,
                name: Arc::clone(ns),
            },
            None => self.clone(),
        }
    }

    /// Parse the stable string form back into a symbol.
    ///
    /// Splits on the first `/`; a string without one is an unqualified
    /// (namespace) symbol. Mangled test names never contain `/` (the
    /// sanitizer replaces it), so the split is unambiguous.
    pub fn parse(s: &str) -> Symbol {
        match s.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => Symbol::qualified(ns, name),
            _ => Symbol::unqualified(s),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Symbol::parse(s))
    }
}

// Symbols serialize as their string form so they can key JSON objects and
// survive readers that reject mangled test names as symbol syntax.
impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Symbol::parse(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_qualified_round_trip() {
        let sym = Symbol::qualified("app.core", "handler");
        assert_eq!(sym.to_string(), "app.core/handler");
        assert_eq!(Symbol::parse("app.core/handler"), sym);
        assert_eq!(sym.namespace(), Some("app.core"));
        assert_eq!(sym.name(), "handler");
    }

    #[test]
    fn test_unqualified_round_trip() {
        let sym = Symbol::unqualified("app.core");
        assert_eq!(sym.to_string(), "app.core");
        assert_eq!(Symbol::parse("app.core"), sym);
        assert_eq!(sym.namespace(), None);
    }

    #[test]
    fn test_namespace_symbol() {
        let var = Symbol::qualified("app.core", "handler");
        assert_eq!(var.namespace_symbol(), Symbol::unqualified("app.core"));

        let ns = Symbol::unqualified("app.core");
        assert_eq!(ns.namespace_symbol(), ns);
    }

    #[test]
    fn test_mangled_test_name_round_trips() {
        // Synthesized test names carry leading/trailing underscores and dashes
        let sym = Symbol::qualified("app.core-test", "__creates-a-user__");
        let parsed = Symbol::parse(&sym.to_string());
        assert_eq!(parsed, sym);
    }

    #[test]
    fn test_serde_as_string() {
        let sym = Symbol::qualified("app.core", "handler");
        let json = serde_json::to_string(&sym).unwrap();
        assert_eq!(json, "\"app.core/handler\"");
        let back: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sym);
    }

    #[test]
    fn test_serde_as_map_key() {
        let mut m = BTreeMap::new();
        m.insert(Symbol::qualified("a", "b"), 1u32);
        m.insert(Symbol::unqualified("a"), 2u32);
        let json = serde_json::to_string(&m).unwrap();
        let back: BTreeMap<Symbol, u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_ordering_is_stable() {
        let mut syms = vec![
            Symbol::qualified("b", "x"),
            Symbol::unqualified("b"),
            Symbol::qualified("a", "y"),
        ];
        syms.sort();
        // Namespace symbols (no qualifier) sort before all qualified symbols
        assert_eq!(syms[0], Symbol::unqualified("b"));
        assert_eq!(syms[1], Symbol::qualified("a", "y"));
    }
}

//! Library registry: qualified names to block definitions.
//!
//! The [`LibraryRegistry`] is the explicit context elaboration resolves
//! classes through. Besides name lookup it holds the default table mapping an
//! abstract class to the concrete class that stands in for it; a design's
//! refinement table (from `volta.toml`) is consulted first, by instance path
//! and then by class.

use std::collections::HashMap;
use std::sync::Arc;

use volta_common::{HierPath, Ident, Interner};
use volta_config::RefinementConfig;

use crate::block::{BlockDef, BlockRef};
use crate::error::ElabError;

/// Registry of every block class available to a design.
pub struct LibraryRegistry {
    interner: Interner,
    /// Definitions by interned qualified name.
    elements: HashMap<Ident, BlockRef>,
    /// Registration order, for stable listings.
    order: Vec<Ident>,
    /// Abstract class to default concrete class.
    defaults: HashMap<Ident, Ident>,
}

impl LibraryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            interner: Interner::new(),
            elements: HashMap::new(),
            order: Vec::new(),
            defaults: HashMap::new(),
        }
    }

    /// Registers a definition under its class name.
    pub fn register(&mut self, def: impl BlockDef + 'static) -> Result<Ident, ElabError> {
        self.register_ref(Arc::new(def))
    }

    /// Registers a shared definition under its class name.
    pub fn register_ref(&mut self, def: BlockRef) -> Result<Ident, ElabError> {
        let name = self.interner.get_or_intern(def.class());
        if self.elements.contains_key(&name) {
            return Err(ElabError::DuplicateElement {
                name: def.class().to_string(),
            });
        }
        self.elements.insert(name, def);
        self.order.push(name);
        Ok(name)
    }

    /// Makes `concrete` the default for the abstract class `abstract_class`.
    ///
    /// Both must already be registered.
    pub fn register_default(
        &mut self,
        abstract_class: &str,
        concrete: &str,
    ) -> Result<(), ElabError> {
        let from = self.ident(abstract_class)?;
        let to = self.ident(concrete)?;
        self.defaults.insert(from, to);
        Ok(())
    }

    fn ident(&self, name: &str) -> Result<Ident, ElabError> {
        self.interner
            .get(name)
            .filter(|id| self.elements.contains_key(id))
            .ok_or_else(|| ElabError::UnknownElement {
                name: name.to_string(),
            })
    }

    /// Looks up a definition by qualified name.
    pub fn get_library_element(&self, name: &str) -> Result<BlockRef, ElabError> {
        let id = self.ident(name)?;
        Ok(Arc::clone(&self.elements[&id]))
    }

    /// Qualified names in `module`, sorted. An empty module lists everything.
    pub fn list_library_elements(&self, module: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .order
            .iter()
            .map(|id| self.interner.resolve(*id))
            .filter(|name| module.is_empty() || module_of(name) == module)
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    /// Qualified names of classes implementing `capability`, sorted.
    pub fn implementing(&self, capability: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .order
            .iter()
            .filter(|id| self.elements[id].capabilities().contains(&capability))
            .map(|id| self.interner.resolve(*id).to_string())
            .collect();
        names.sort();
        names
    }

    /// Returns `true` if `name` is registered and abstract.
    pub fn is_abstract(&self, name: &str) -> bool {
        self.ident(name)
            .map(|id| self.elements[&id].is_abstract())
            .unwrap_or(false)
    }

    /// The default concrete class of an abstract class.
    pub fn default_of(&self, name: &str) -> Option<&str> {
        let id = self.interner.get(name)?;
        self.defaults.get(&id).map(|d| self.interner.resolve(*d))
    }

    /// Number of registered elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Picks the definition to instantiate at `path` for `def`.
    ///
    /// A refinement for the path or class wins; otherwise an abstract class is
    /// replaced by its default. The result is never abstract.
    pub fn resolve(
        &self,
        def: BlockRef,
        path: &HierPath,
        refinements: &RefinementConfig,
    ) -> Result<BlockRef, ElabError> {
        let def = match refinements.lookup(path, def.class()) {
            Some(refined) if refined != def.class() => {
                tracing::debug!(%path, from = def.class(), to = refined, "applying refinement");
                self.get_library_element(refined)?
            }
            _ => def,
        };
        if !def.is_abstract() {
            return Ok(def);
        }
        match self.default_of(def.class()) {
            Some(concrete) => {
                let concrete = self.get_library_element(concrete)?;
                if concrete.is_abstract() {
                    return Err(ElabError::AbstractBlock {
                        class: concrete.class().to_string(),
                        path: path.clone(),
                    });
                }
                Ok(concrete)
            }
            None => Err(ElabError::AbstractBlock {
                class: def.class().to_string(),
                path: path.clone(),
            }),
        }
    }
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn module_of(name: &str) -> &str {
    name.rsplit_once('.').map(|(module, _)| module).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BlockBuilder;

    struct Named {
        class: &'static str,
        is_abstract: bool,
    }

    impl BlockDef for Named {
        fn class(&self) -> &str {
            self.class
        }

        fn contents(&self, _b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError> {
            Ok(())
        }

        fn is_abstract(&self) -> bool {
            self.is_abstract
        }

        fn capabilities(&self) -> &[&'static str] {
            if self.is_abstract {
                &[]
            } else {
                &["PowerRail"]
            }
        }
    }

    fn concrete(class: &'static str) -> Named {
        Named {
            class,
            is_abstract: false,
        }
    }

    fn registry() -> LibraryRegistry {
        let mut reg = LibraryRegistry::new();
        reg.register(Named {
            class: "power.Regulator",
            is_abstract: true,
        })
        .unwrap();
        reg.register(concrete("power.Ldo")).unwrap();
        reg.register(concrete("power.Buck")).unwrap();
        reg.register(concrete("demo.Blinky")).unwrap();
        reg.register_default("power.Regulator", "power.Ldo").unwrap();
        reg
    }

    #[test]
    fn duplicate_detected() {
        let mut reg = registry();
        let err = reg.register(concrete("power.Ldo")).unwrap_err();
        assert!(matches!(err, ElabError::DuplicateElement { name } if name == "power.Ldo"));
    }

    #[test]
    fn lists_by_module() {
        let reg = registry();
        assert_eq!(reg.list_library_elements("power"), ["power.Buck", "power.Ldo", "power.Regulator"]);
        assert_eq!(reg.list_library_elements("demo"), ["demo.Blinky"]);
        assert_eq!(reg.list_library_elements("").len(), 4);
        assert!(reg.list_library_elements("pow").is_empty());
    }

    #[test]
    fn unknown_element() {
        let reg = registry();
        let err = reg.get_library_element("power.Missing").err().unwrap();
        assert!(matches!(err, ElabError::UnknownElement { .. }));
    }

    #[test]
    fn abstract_resolves_to_default() {
        let reg = registry();
        let abs = reg.get_library_element("power.Regulator").unwrap();
        let path = HierPath::parse("reg");
        let got = reg.resolve(abs, &path, &RefinementConfig::default()).unwrap();
        assert_eq!(got.class(), "power.Ldo");
        assert!(reg.is_abstract("power.Regulator"));
        assert_eq!(reg.default_of("power.Regulator"), Some("power.Ldo"));
    }

    #[test]
    fn refinement_overrides_default() {
        let reg = registry();
        let mut refinements = RefinementConfig::default();
        refinements
            .paths
            .insert("reg".into(), "power.Buck".into());
        let abs = reg.get_library_element("power.Regulator").unwrap();
        let got = reg.resolve(abs.clone(), &HierPath::parse("reg"), &refinements).unwrap();
        assert_eq!(got.class(), "power.Buck");
        let got = reg.resolve(abs, &HierPath::parse("aux"), &refinements).unwrap();
        assert_eq!(got.class(), "power.Ldo");
    }

    #[test]
    fn abstract_without_default_fails() {
        let mut reg = LibraryRegistry::new();
        reg.register(Named {
            class: "io.Connector",
            is_abstract: true,
        })
        .unwrap();
        let abs = reg.get_library_element("io.Connector").unwrap();
        let err = reg
            .resolve(abs, &HierPath::parse("j1"), &RefinementConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, ElabError::AbstractBlock { .. }));
    }

    #[test]
    fn capability_listing() {
        let reg = registry();
        assert_eq!(
            reg.implementing("PowerRail"),
            ["demo.Blinky", "power.Buck", "power.Ldo"]
        );
    }
}

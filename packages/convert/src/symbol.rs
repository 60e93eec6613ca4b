//! Renderer interpretation and per-feature symbol resolution.

use std::collections::HashMap;

use arcgis_export_arcgis_models::{RendererDefinition, Symbol};

use crate::Feature;
use crate::value::number_key;

/// Renderer type name of a unique-value renderer.
pub const UNIQUE_VALUE_RENDERER: &str = "uniqueValue";

/// One unique-value class.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolClass {
    /// Class label (may be empty).
    pub label: String,
    /// Match keys; only the first element of each declared tuple.
    pub values: Vec<String>,
    /// Symbol for matching features.
    pub symbol: Symbol,
}

/// A layer's renderer, read once from layer metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum Renderer {
    /// Every feature gets the same symbol (if any).
    Simple {
        /// Symbol applied to every feature.
        default_symbol: Option<Symbol>,
    },
    /// Symbols keyed by the value of one attribute.
    UniqueValue {
        /// Attribute driving the lookup.
        field: String,
        /// Symbol applied to every feature before class matching.
        default_symbol: Option<Symbol>,
        /// Classes in declaration order.
        classes: Vec<SymbolClass>,
    },
}

fn value_key(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(number_key(n)),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl Renderer {
    /// Interprets a raw renderer definition.
    ///
    /// A simple renderer's `symbol` doubles as the default symbol. Classes
    /// come from `uniqueValueGroups` followed by `uniqueValueInfos`;
    /// classes without a symbol are dropped.
    #[must_use]
    pub fn from_definition(definition: &RendererDefinition) -> Self {
        let default_symbol = definition
            .default_symbol
            .clone()
            .or_else(|| definition.symbol.clone());

        let mut classes: Vec<SymbolClass> = definition
            .unique_value_groups
            .iter()
            .flat_map(|group| &group.classes)
            .filter_map(|class| {
                let symbol = class.symbol.clone()?;
                Some(SymbolClass {
                    label: class.label.clone(),
                    values: class
                        .values
                        .iter()
                        .filter_map(|tuple| tuple.first().and_then(value_key))
                        .collect(),
                    symbol,
                })
            })
            .collect();

        classes.extend(definition.unique_value_infos.iter().filter_map(|info| {
            Some(SymbolClass {
                label: info.label.clone(),
                values: value_key(&info.value).into_iter().collect(),
                symbol: info.symbol.clone()?,
            })
        }));

        if definition.kind == UNIQUE_VALUE_RENDERER
            && !definition.field1.is_empty()
            && !classes.is_empty()
        {
            Self::UniqueValue {
                field: definition.field1.clone(),
                default_symbol,
                classes,
            }
        } else {
            if definition.kind == UNIQUE_VALUE_RENDERER {
                log::debug!(
                    "Unique-value renderer on '{}' has no usable classes; using default symbol only",
                    definition.field1
                );
            }
            Self::Simple { default_symbol }
        }
    }

    /// The default symbol, if declared.
    #[must_use]
    pub const fn default_symbol(&self) -> Option<&Symbol> {
        match self {
            Self::Simple { default_symbol } | Self::UniqueValue { default_symbol, .. } => {
                default_symbol.as_ref()
            }
        }
    }

    /// Mutable access to the default symbol.
    pub fn default_symbol_mut(&mut self) -> Option<&mut Symbol> {
        match self {
            Self::Simple { default_symbol } | Self::UniqueValue { default_symbol, .. } => {
                default_symbol.as_mut()
            }
        }
    }

    /// Unique-value classes (empty for a simple renderer).
    #[must_use]
    pub fn classes(&self) -> &[SymbolClass] {
        match self {
            Self::Simple { .. } => &[],
            Self::UniqueValue { classes, .. } => classes,
        }
    }

    /// Mutable access to the unique-value classes.
    pub fn classes_mut(&mut self) -> &mut [SymbolClass] {
        match self {
            Self::Simple { .. } => &mut [],
            Self::UniqueValue { classes, .. } => classes,
        }
    }
}

/// Picks the symbol for each feature of a layer.
#[derive(Debug, Clone)]
pub struct SymbolResolver<'a> {
    default_symbol: Option<&'a Symbol>,
    field: Option<&'a str>,
    lookup: HashMap<&'a str, &'a Symbol>,
}

impl<'a> SymbolResolver<'a> {
    /// Builds the value lookup for a renderer. Later classes win when two
    /// declare the same value.
    #[must_use]
    pub fn new(renderer: &'a Renderer) -> Self {
        let mut lookup = HashMap::new();
        let field = match renderer {
            Renderer::Simple { .. } => None,
            Renderer::UniqueValue { field, classes, .. } => {
                for class in classes {
                    for value in &class.values {
                        lookup.insert(value.as_str(), &class.symbol);
                    }
                }
                Some(field.as_str())
            }
        };

        Self {
            default_symbol: renderer.default_symbol(),
            field,
            lookup,
        }
    }

    /// Resolves the symbol for one feature.
    ///
    /// The default symbol takes precedence over class matches. A feature
    /// whose driving value matches no class gets no symbol.
    #[must_use]
    pub fn resolve(&self, feature: &Feature) -> Option<&'a Symbol> {
        if let Some(symbol) = self.default_symbol {
            return Some(symbol);
        }
        let key = feature.attributes.get(self.field?)?.match_key()?;
        self.lookup.get(key.as_str()).copied()
    }

    /// Attaches a copy of the resolved symbol to every feature that does
    /// not already carry one.
    pub fn attach(&self, features: &mut [Feature]) {
        for feature in features {
            if feature.symbol().is_some() {
                continue;
            }
            if let Some(symbol) = self.resolve(feature) {
                feature.set_symbol(symbol.clone());
            }
        }
    }
}

/// Convenience for [`SymbolResolver::attach`].
pub fn attach_symbols(renderer: &Renderer, features: &mut [Feature]) {
    SymbolResolver::new(renderer).attach(features);
}

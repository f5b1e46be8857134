//! Typed compiler/build options with explicit-set tracking.
//!
//! An [`OptionSet`] holds one value per entry of [`OPTION_TABLE`]. Values
//! start at the table default; [`OptionSet::set`] parses raw text according
//! to the declared type and marks the key as explicitly set. Only explicitly
//! set keys travel through [`OptionSet::copy_into`], which is what makes
//! scope inheritance safe: an unset child never clobbers an inherited value.

use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
//  Descriptor table
// ═══════════════════════════════════════════════════════════════════════════════

/// Declared type and default of a single option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionDefault {
    Str(&'static str),
    Bool(bool),
    Int(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionDescriptor {
    pub name: &'static str,
    pub default: OptionDefault,
}

/// Build the static name → descriptor table.
macro_rules! option_table {
    ($($name:literal => $kind:ident($default:expr)),* $(,)?) => {
        /// Every option an `<Options>` element may set, with its default.
        pub static OPTION_TABLE: &[OptionDescriptor] = &[
            $( OptionDescriptor { name: $name, default: OptionDefault::$kind($default) }, )*
        ];
    };
}

option_table! {
    "CompilerDefines"        => Str(""),
    "OptimizeCode"           => Bool(false),
    "CheckUnderflowOverflow" => Bool(false),
    "AllowUnsafe"            => Bool(false),
    "WarningLevel"           => Int(4),
    "WarningsAsErrors"       => Bool(false),
    "SuppressWarnings"       => Str(""),
    "OutputPath"             => Str("bin/"),
    "GenerateXmlDocFile"     => Bool(false),
    "XmlDocFile"             => Str(""),
    "KeyFile"                => Str(""),
    "DebugInformation"       => Bool(false),
    "RegisterComInterop"     => Bool(false),
    "RemoveIntegerChecks"    => Bool(false),
    "IncrementalBuild"       => Bool(false),
    "BaseAddress"            => Str("285212672"),
    "FileAlignment"          => Int(4096),
    "NoStdLib"               => Bool(false),
}

/// Historical spellings still found in older build descriptions.
const ALIASES: &[(&str, &str)] = &[
    ("SupressWarnings", "SuppressWarnings"),
    ("RegisterCOMInterop", "RegisterComInterop"),
];

fn index_of(key: &str) -> Option<usize> {
    let key = ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or(key, |(_, canonical)| *canonical);
    OPTION_TABLE.iter().position(|d| d.name == key)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Values
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Str(String),
    Bool(bool),
    Int(i64),
}

impl OptionValue {
    fn from_default(default: OptionDefault) -> Self {
        match default {
            OptionDefault::Str(s) => Self::Str(s.to_string()),
            OptionDefault::Bool(b) => Self::Bool(b),
            OptionDefault::Int(i) => Self::Int(i),
        }
    }

    /// Parse `raw` as the same type as `default`. `None` when an integer
    /// does not parse.
    fn parse_as(default: OptionDefault, raw: &str) -> Option<Self> {
        match default {
            OptionDefault::Str(_) => Some(Self::Str(raw.to_string())),
            OptionDefault::Bool(_) => Some(Self::Bool(parse_bool(raw))),
            OptionDefault::Int(_) => raw.trim().parse().ok().map(Self::Int),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

/// `true`, `1`, `y`, `yes` and `on` (any case) are true; everything else is false.
pub fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "y" | "yes" | "on")
}

// ═══════════════════════════════════════════════════════════════════════════════
//  OptionSet
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSet {
    values: Vec<OptionValue>,
    defined: Vec<bool>,
}

impl Default for OptionSet {
    fn default() -> Self {
        Self {
            values: OPTION_TABLE.iter().map(|d| OptionValue::from_default(d.default)).collect(),
            defined: vec![false; OPTION_TABLE.len()],
        }
    }
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate a fresh set from an `<Options>` element: each child element
    /// names an option and its text is the raw value.
    pub fn parse(node: roxmltree::Node) -> Self {
        let mut options = Self::new();
        for child in node.children().filter(|n| n.is_element()) {
            let tag = child.tag_name().name();
            let text = child.text().unwrap_or("").trim();
            if !options.set(tag, text) {
                tracing::debug!("ignoring option <{tag}>");
            }
        }
        options
    }

    /// Current value of `key`, explicit or default. `None` for unknown keys.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        index_of(key).map(|i| &self.values[i])
    }

    /// Like [`get`](Self::get), but an empty string value becomes `fallback`.
    pub fn get_or_default(&self, key: &str, fallback: &str) -> Option<OptionValue> {
        match self.get(key)? {
            OptionValue::Str(s) if s.is_empty() => Some(OptionValue::Str(fallback.to_string())),
            other => Some(other.clone()),
        }
    }

    /// Parse `raw` by the declared type of `key` and mark it explicit.
    ///
    /// Unknown keys are ignored. An integer that does not parse leaves the
    /// previous value in place. Returns whether anything was stored.
    pub fn set(&mut self, key: &str, raw: &str) -> bool {
        let Some(i) = index_of(key) else {
            return false;
        };
        match OptionValue::parse_as(OPTION_TABLE[i].default, raw) {
            Some(value) => {
                self.values[i] = value;
                self.defined[i] = true;
                true
            }
            None => {
                tracing::debug!("dropping unparsable value '{raw}' for option {key}");
                false
            }
        }
    }

    pub fn is_defined(&self, key: &str) -> bool {
        index_of(key).is_some_and(|i| self.defined[i])
    }

    /// Names of every explicitly set option, in table order.
    pub fn defined_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        OPTION_TABLE
            .iter()
            .zip(&self.defined)
            .filter(|(_, defined)| **defined)
            .map(|(d, _)| d.name)
    }

    /// Write every explicitly set value into `target`, marking it explicit
    /// there as well. Keys left at their default are not copied.
    pub fn copy_into(&self, target: &mut OptionSet) {
        for (i, defined) in self.defined.iter().enumerate() {
            if *defined {
                target.values[i] = self.values[i].clone();
                target.defined[i] = true;
            }
        }
    }

    // ─── Typed accessors ─────────────────────────────────────────────────

    /// Boolean option; `false` for unknown or non-boolean keys.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(OptionValue::Bool(true)))
    }

    /// String option; empty for unknown or non-string keys.
    pub fn text(&self, key: &str) -> &str {
        match self.get(key) {
            Some(OptionValue::Str(s)) => s,
            _ => "",
        }
    }

    /// Integer option; `0` for unknown or non-integer keys.
    pub fn number(&self, key: &str) -> i64 {
        match self.get(key) {
            Some(OptionValue::Int(i)) => *i,
            _ => 0,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

//! Per-language boundary rules for structure-aware code chunking.
//!
//! Each language maps to an ordered list of [`BoundaryRule`]s. A rule's
//! pattern matches at the start of a declaration line and its
//! `symbol_group` captures the declared name, when there is one.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Closed set of languages with boundary rules. Anything else is `plain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
    C,
    Cpp,
    Go,
    Rust,
}

/// Language label recorded on chunks that have no boundary rules.
pub const PLAIN: &str = "plain";

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" | "pyw" => Some(Language::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" | "mts" => Some(Language::TypeScript),
            "java" => Some(Language::Java),
            "c" | "h" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Some(Language::Cpp),
            "go" => Some(Language::Go),
            "rs" => Some(Language::Rust),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "c++",
            Language::Go => "go",
            Language::Rust => "rust",
        }
    }

    /// Compiled rules for this language, in priority order.
    pub fn rules(&self) -> &'static [CompiledRule] {
        COMPILED
            .get(self)
            .map(|rules| rules.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    Function,
    Method,
    Class,
    Struct,
    Impl,
}

impl BoundaryKind {
    /// Type-level declarations, as opposed to functions and methods.
    pub fn is_type(&self) -> bool {
        matches!(self, BoundaryKind::Class | BoundaryKind::Struct | BoundaryKind::Impl)
    }
}

/// A boundary pattern as written in the table.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryRule {
    pub kind: BoundaryKind,
    pub pattern: &'static str,
    pub symbol_group: usize,
}

#[derive(Debug)]
pub struct CompiledRule {
    pub kind: BoundaryKind,
    pub regex: Regex,
    pub symbol_group: usize,
}

/// Names a loose pattern can capture that are never real symbols.
pub const KEYWORDS: &[&str] = &[
    "abstract", "async", "await", "catch", "class", "const", "def", "default", "else",
    "enum", "export", "extern", "final", "fn", "for", "func", "function", "if", "impl",
    "interface", "let", "mut", "new", "private", "protected", "pub", "public", "return",
    "static", "struct", "switch", "synchronized", "throw", "type", "unsafe", "var", "void",
    "while",
];

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

const PYTHON: &[BoundaryRule] = &[
    BoundaryRule {
        kind: BoundaryKind::Class,
        pattern: r"(?mR)^[ \t]*class[ \t]+([A-Za-z_]\w*)",
        symbol_group: 1,
    },
    BoundaryRule {
        kind: BoundaryKind::Function,
        pattern: r"(?mR)^[ \t]*(?:async[ \t]+)?def[ \t]+([A-Za-z_]\w*)",
        symbol_group: 1,
    },
];

const JAVASCRIPT: &[BoundaryRule] = &[
    BoundaryRule {
        kind: BoundaryKind::Class,
        pattern: r"(?mR)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?class[ \t]+([A-Za-z_$][\w$]*)",
        symbol_group: 1,
    },
    BoundaryRule {
        kind: BoundaryKind::Function,
        pattern: r"(?mR)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:async[ \t]+)?function\*?[ \t]*([A-Za-z_$][\w$]*)?[ \t]*\(",
        symbol_group: 1,
    },
    BoundaryRule {
        kind: BoundaryKind::Function,
        pattern: r"(?mR)^[ \t]*(?:export[ \t]+)?(?:const|let|var)[ \t]+([A-Za-z_$][\w$]*)[ \t]*=[ \t]*(?:async[ \t]*)?(?:\([^)\n]*\)|[A-Za-z_$][\w$]*)[ \t]*=>",
        symbol_group: 1,
    },
];

const TYPESCRIPT: &[BoundaryRule] = &[
    BoundaryRule {
        kind: BoundaryKind::Class,
        pattern: r"(?mR)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:abstract[ \t]+)?class[ \t]+([A-Za-z_$][\w$]*)",
        symbol_group: 1,
    },
    BoundaryRule {
        kind: BoundaryKind::Struct,
        pattern: r"(?mR)^[ \t]*(?:export[ \t]+)?(?:interface|type)[ \t]+([A-Za-z_$][\w$]*)",
        symbol_group: 1,
    },
    BoundaryRule {
        kind: BoundaryKind::Function,
        pattern: r"(?mR)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:async[ \t]+)?function\*?[ \t]*([A-Za-z_$][\w$]*)?[ \t]*[<(]",
        symbol_group: 1,
    },
    BoundaryRule {
        kind: BoundaryKind::Function,
        pattern: r"(?mR)^[ \t]*(?:export[ \t]+)?(?:const|let|var)[ \t]+([A-Za-z_$][\w$]*)[ \t]*(?::[^=\n]+)?=[ \t]*(?:async[ \t]*)?(?:\([^)\n]*\)|[A-Za-z_$][\w$]*)[ \t]*(?::[^=\n]+)?=>",
        symbol_group: 1,
    },
];

const JAVA: &[BoundaryRule] = &[
    BoundaryRule {
        kind: BoundaryKind::Class,
        pattern: r"(?mR)^[ \t]*(?:(?:public|private|protected|static|final|abstract|sealed)[ \t]+)*(?:class|interface|enum|record)[ \t]+([A-Za-z_]\w*)",
        symbol_group: 1,
    },
    BoundaryRule {
        kind: BoundaryKind::Method,
        pattern: r"(?mR)^[ \t]*(?:[\w<>\[\],?]+[ \t]+)+([A-Za-z_]\w*)[ \t]*\([^;\n]*\)[ \t]*(?:throws[^{;\n]*)?\{",
        symbol_group: 1,
    },
];

const C: &[BoundaryRule] = &[
    BoundaryRule {
        kind: BoundaryKind::Struct,
        pattern: r"(?mR)^(?:typedef[ \t]+)?(?:struct|union|enum)[ \t]+([A-Za-z_]\w*)[ \t]*\{",
        symbol_group: 1,
    },
    BoundaryRule {
        kind: BoundaryKind::Function,
        pattern: r"(?mR)^[A-Za-z_][\w \t\*]*?[ \t\*]([A-Za-z_]\w*)[ \t]*\([^;\n]*\)[ \t]*\{?[ \t]*$",
        symbol_group: 1,
    },
];

const CPP: &[BoundaryRule] = &[
    BoundaryRule {
        kind: BoundaryKind::Class,
        pattern: r"(?mR)^[ \t]*(?:template[ \t]*<[^>\n]*>[ \t]*)?(?:class|struct)[ \t]+([A-Za-z_]\w*)[^;{\n]*\{",
        symbol_group: 1,
    },
    BoundaryRule {
        kind: BoundaryKind::Function,
        pattern: r"(?mR)^[A-Za-z_][\w \t\*&<>:,]*?[ \t\*&]([A-Za-z_~][\w:~]*)[ \t]*\([^;\n]*\)[ \t]*(?:const[ \t]*)?(?:override[ \t]*)?\{?[ \t]*$",
        symbol_group: 1,
    },
];

const GO: &[BoundaryRule] = &[
    BoundaryRule {
        kind: BoundaryKind::Function,
        pattern: r"(?mR)^func[ \t]+(?:\([^)\n]*\)[ \t]*)?([A-Za-z_]\w*)",
        symbol_group: 1,
    },
    BoundaryRule {
        kind: BoundaryKind::Struct,
        pattern: r"(?mR)^type[ \t]+([A-Za-z_]\w*)[ \t]+(?:struct|interface)",
        symbol_group: 1,
    },
];

const RUST: &[BoundaryRule] = &[
    BoundaryRule {
        kind: BoundaryKind::Function,
        pattern: r#"(?mR)^[ \t]*(?:pub(?:\([^)\n]*\))?[ \t]+)?(?:(?:const|async|unsafe|extern(?:[ \t]+"[^"\n]*")?)[ \t]+)*fn[ \t]+([A-Za-z_]\w*)"#,
        symbol_group: 1,
    },
    BoundaryRule {
        kind: BoundaryKind::Struct,
        pattern: r"(?mR)^[ \t]*(?:pub(?:\([^)\n]*\))?[ \t]+)?(?:struct|enum|trait|union|mod)[ \t]+([A-Za-z_]\w*)",
        symbol_group: 1,
    },
    BoundaryRule {
        kind: BoundaryKind::Impl,
        pattern: r"(?mR)^[ \t]*(?:unsafe[ \t]+)?impl(?:<[^>\n]*>)?[ \t]+(?:[\w:<>, ]+?[ \t]+for[ \t]+)?([A-Za-z_]\w*)",
        symbol_group: 1,
    },
];

fn table(language: Language) -> &'static [BoundaryRule] {
    match language {
        Language::Python => PYTHON,
        Language::JavaScript => JAVASCRIPT,
        Language::TypeScript => TYPESCRIPT,
        Language::Java => JAVA,
        Language::C => C,
        Language::Cpp => CPP,
        Language::Go => GO,
        Language::Rust => RUST,
    }
}

const ALL: [Language; 8] = [
    Language::Python,
    Language::JavaScript,
    Language::TypeScript,
    Language::Java,
    Language::C,
    Language::Cpp,
    Language::Go,
    Language::Rust,
];

static COMPILED: LazyLock<HashMap<Language, Vec<CompiledRule>>> = LazyLock::new(|| {
    ALL.iter()
        .map(|&lang| {
            let rules = table(lang)
                .iter()
                .filter_map(|rule| {
                    Regex::new(rule.pattern).ok().map(|regex| CompiledRule {
                        kind: rule.kind,
                        regex,
                        symbol_group: rule.symbol_group,
                    })
                })
                .collect();
            (lang, rules)
        })
        .collect()
});

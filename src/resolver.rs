//! Multi-strategy symbol resolution.
//!
//! The resolver is the single point where imprecision is tolerated: a
//! user-supplied name may be a bare identifier, a `Type.Method` dotted
//! form, a package-qualified form like `gin.New`, or a misspelling.
//! Everything downstream operates on resolved symbols.
//!
//! Strategies, applied in order:
//! 1. exact name match
//! 2. package-qualifier stripping for recognized external prefixes
//! 3. dot-notation `Type.Method` (receiver, id substring, children,
//!    inheritance walk)
//! 4. fuzzy search
//! 5. opt-in bare-method fallback

use crate::classify;
use crate::index::{FUZZY_SEARCH_DEADLINE, SymbolIndex};
use crate::types::{Symbol, SymbolKind};
use std::sync::Arc;

/// How many fuzzy candidates to consider before kind filtering.
const FUZZY_CANDIDATES: usize = 20;

/// Depth cap for the `extends` walk; guards against malformed graphs.
const INHERITANCE_DEPTH_CAP: usize = 10;

/// Package prefixes that denote an external library rather than a
/// user-defined type. Query forms like `gin.New` or `http.Get` resolve by
/// stripping the prefix.
const EXTERNAL_PACKAGE_PREFIXES: &[&str] = &[
    "gin", "flask", "http", "pandas", "fmt", "os", "np", "json", "express", "django", "axios",
    "req", "res",
];

/// Kind filter recognized by every tool.
///
/// Cross-language equivalence: "callable member of a class" maps to
/// different kinds across languages, so `function` covers methods and
/// properties, and `type` covers classes, structs, interfaces and aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    All,
    Callable,
    TypeLike,
    Exact(SymbolKind),
}

impl KindFilter {
    /// Parse a user-supplied filter string. `None` means unrecognized.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "" | "all" => Some(Self::All),
            "function" | "method" => Some(Self::Callable),
            "type" | "class" | "struct" | "interface" => Some(Self::TypeLike),
            "property" => Some(Self::Exact(SymbolKind::Property)),
            "enum" => Some(Self::Exact(SymbolKind::Enum)),
            "variable" => Some(Self::Exact(SymbolKind::Variable)),
            "constant" => Some(Self::Exact(SymbolKind::Constant)),
            "external" => Some(Self::Exact(SymbolKind::External)),
            _ => None,
        }
    }

    pub fn matches(&self, kind: SymbolKind) -> bool {
        match self {
            Self::All => true,
            Self::Callable => kind.is_callable(),
            Self::TypeLike => kind.is_type_like(),
            Self::Exact(exact) => kind == *exact,
        }
    }
}

/// Kind cross-matching used by `find_symbol`, which is looser than the
/// resolver filter: `class` includes structs, `struct` and `interface`
/// include each other and classes.
pub fn kind_cross_matches(raw: &str, kind: SymbolKind) -> bool {
    match raw.to_ascii_lowercase().as_str() {
        "" | "all" => true,
        "function" => kind.is_callable(),
        "method" => matches!(kind, SymbolKind::Method | SymbolKind::Function),
        "class" => matches!(kind, SymbolKind::Class | SymbolKind::Struct),
        "struct" | "interface" => {
            matches!(
                kind,
                SymbolKind::Struct | SymbolKind::Class | SymbolKind::Interface
            )
        }
        "type" => kind.is_type_like(),
        other => KindFilter::parse(other).is_some_and(|f| f.matches(kind)),
    }
}

/// Options steering a resolution attempt.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub kind: Option<KindFilter>,
    /// Module or directory hint extracted from the user query. Soft filter:
    /// applied before disambiguation, ignored when it matches nothing.
    pub package_hint: Option<String>,
    /// When dot-notation fails entirely, retry with the bare method name
    /// (`DB.Open` where `Open` is a package-level function).
    pub bare_method_fallback: bool,
}

/// A successful resolution: ranked candidates plus the signals the tool
/// layer records in trace metadata.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Best candidate first.
    pub candidates: Vec<Arc<Symbol>>,
    pub used_fuzzy: bool,
    pub dot_notation_fallback: bool,
}

impl Resolution {
    fn direct(candidates: Vec<Arc<Symbol>>) -> Self {
        Self {
            candidates,
            used_fuzzy: false,
            dot_notation_fallback: false,
        }
    }

    pub fn best(&self) -> &Arc<Symbol> {
        &self.candidates[0]
    }
}

/// Name-to-symbol resolver over a [`SymbolIndex`].
pub struct Resolver<'a> {
    index: &'a SymbolIndex,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a SymbolIndex) -> Self {
        Self { index }
    }

    /// Resolve a user-supplied name to one or more symbols. `None` means
    /// every strategy came up empty, which callers report as a definitive
    /// not-found answer.
    pub fn resolve(&self, query: &str, opts: &ResolveOptions) -> Option<Resolution> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        // Strategy 1: exact match on the full query.
        if let Some(resolution) = self.exact(query, opts) {
            return Some(resolution);
        }

        if let Some((head, tail)) = query.split_once('.') {
            // Strategy 2: strip a recognized external package prefix, unless
            // the head looks like a user-defined type (PascalCase).
            if !is_pascal_case(head)
                && EXTERNAL_PACKAGE_PREFIXES.contains(&head)
                && let Some(resolution) = self.exact(tail, opts)
            {
                return Some(resolution);
            }

            // Strategy 3: Type.Method resolution.
            if let Some(resolution) = self.resolve_dotted(head, tail) {
                return Some(resolution);
            }
        }

        // Strategy 4: fuzzy search.
        if let Some(resolution) = self.fuzzy(query, opts) {
            return Some(resolution);
        }

        // Strategy 5: bare-method fallback, opt-in.
        if opts.bare_method_fallback
            && let Some((_, method)) = query.split_once('.')
            && let Some(mut resolution) = self.exact(method, opts)
        {
            resolution.dot_notation_fallback = true;
            return Some(resolution);
        }

        None
    }

    fn exact(&self, name: &str, opts: &ResolveOptions) -> Option<Resolution> {
        let kind = opts.kind.unwrap_or(KindFilter::All);
        let matches: Vec<Arc<Symbol>> = self
            .index
            .get_by_name(name)
            .into_iter()
            .filter(|s| kind.matches(s.kind))
            .collect();
        if matches.is_empty() {
            return None;
        }
        Some(Resolution::direct(disambiguate(
            matches,
            opts.package_hint.as_deref(),
        )))
    }

    fn resolve_dotted(&self, type_name: &str, method: &str) -> Option<Resolution> {
        // (a) receiver match and (b) id-substring match, pooled so the
        // preference rule (non-empty receiver, then shortest id) applies
        // across both.
        let needle = format!("{type_name}.{method}");
        let mut pooled: Vec<Arc<Symbol>> = Vec::new();
        for symbol in self.index.get_by_name(method) {
            if symbol.receiver == type_name && symbol.kind.is_callable() {
                pooled.push(symbol);
            }
        }
        for symbol in self.index.all() {
            if symbol.id.contains(&needle) && !pooled.iter().any(|s| s.id == symbol.id) {
                pooled.push(symbol);
            }
        }
        if !pooled.is_empty() {
            // Prefer a symbol with a receiver, then the shortest id.
            pooled.sort_by(|a, b| {
                a.receiver
                    .is_empty()
                    .cmp(&b.receiver.is_empty())
                    .then_with(|| a.id.len().cmp(&b.id.len()))
                    .then_with(|| a.id.cmp(&b.id))
            });
            return Some(Resolution::direct(pooled));
        }

        // (c) children scan and (d) inheritance walk over `extends`.
        let mut current = type_name.to_string();
        for _ in 0..INHERITANCE_DEPTH_CAP {
            if let Some(owner) = self.index.find_type_with_member(&current, method) {
                let member = owner
                    .children
                    .iter()
                    .find(|c| c.name == method && c.kind.is_callable())?;
                let resolved = self
                    .index
                    .get_by_id(&member.id)
                    .unwrap_or_else(|| Arc::new(member.clone()));
                return Some(Resolution::direct(vec![resolved]));
            }
            let parent = self
                .index
                .get_by_name(&current)
                .into_iter()
                .find(|s| s.kind.is_type_like())
                .and_then(|s| s.metadata.extends.clone())?;
            current = parent;
        }
        None
    }

    fn fuzzy(&self, query: &str, opts: &ResolveOptions) -> Option<Resolution> {
        let kind = opts.kind.unwrap_or(KindFilter::All);
        let candidates: Vec<Arc<Symbol>> = self
            .index
            .search(query, FUZZY_CANDIDATES, FUZZY_SEARCH_DEADLINE)
            .into_iter()
            .map(|hit| hit.symbol)
            .filter(|s| kind.matches(s.kind))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        // Fuzzy ranking already ordered by similarity; the hint still gets
        // to promote an in-scope candidate.
        let ranked = match opts.package_hint.as_deref() {
            Some(hint) => apply_package_hint(candidates, hint),
            None => candidates,
        };
        Some(Resolution {
            candidates: ranked,
            used_fuzzy: true,
            dot_notation_fallback: false,
        })
    }
}

/// Rank candidates: soft package-hint filter, then the disambiguation
/// score, lowest first.
fn disambiguate(candidates: Vec<Arc<Symbol>>, package_hint: Option<&str>) -> Vec<Arc<Symbol>> {
    let mut pool = match package_hint {
        Some(hint) => apply_package_hint(candidates, hint),
        None => candidates,
    };
    pool.sort_by(|a, b| {
        disambiguation_score(a)
            .cmp(&disambiguation_score(b))
            .then_with(|| a.id.cmp(&b.id))
    });
    pool
}

/// Soft filter: keep candidates whose package or file path contains the
/// hint; an empty survivor set falls back to the full pool because the
/// user's scope may be approximate.
fn apply_package_hint(candidates: Vec<Arc<Symbol>>, hint: &str) -> Vec<Arc<Symbol>> {
    let survivors: Vec<Arc<Symbol>> = candidates
        .iter()
        .filter(|s| s.package.contains(hint) || s.file_path.contains(hint))
        .cloned()
        .collect();
    if survivors.is_empty() {
        candidates
    } else {
        survivors
    }
}

/// Lower is better: production code over tests, exported over unexported,
/// shallow paths over deep ones, callables over types.
fn disambiguation_score(symbol: &Symbol) -> u64 {
    let mut score = 0u64;
    if classify::is_test_file(&symbol.file_path) {
        score += 50_000;
    }
    if !symbol.exported {
        score += 20_000;
    }
    if symbol.name.starts_with('_') {
        score += 10_000;
    }
    let depth = classify::directory_depth(&symbol.file_path);
    if depth > 2 {
        score += 1_000 * (depth as u64 - 2);
    }
    score += match symbol.kind {
        SymbolKind::Function | SymbolKind::Method => 0,
        k if k.is_type_like() => 1,
        _ => 2,
    };
    score
}

fn is_pascal_case(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

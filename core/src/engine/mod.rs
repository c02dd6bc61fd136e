//! One document analysis cycle: cache lookup, (incremental) parse, validation.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::bracket::BracketTable;
use crate::cache::{CacheManager, CacheManagerStats, Debouncer};
use crate::config::Settings;
use crate::diagnostic::Diagnostic;
use crate::parser::{ParseResult, Parser, TextEdit};
use crate::pattern::PatternNode;
use crate::util::content_fingerprint;
use crate::validate::Validator;

/// Result of analysing one document snapshot.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub version: i32,
    pub fingerprint: u64,
    pub parse: Arc<ParseResult>,
    pub diagnostics: Arc<Vec<Diagnostic>>,
    /// Both the parse and the diagnostics came from the cache.
    pub from_cache: bool,
}

/// Analysis entry point shared by every open document.
///
/// Documents are keyed by an opaque identifier (the LSP uses the URI).
/// Every method is safe to call concurrently for different documents.
pub struct DrlEngine {
    settings: RwLock<Settings>,
    caches: RwLock<Arc<CacheManager>>,
    debouncer: Arc<Debouncer>,
}

impl Default for DrlEngine {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl DrlEngine {
    pub fn new(settings: Settings) -> Self {
        Self {
            caches: RwLock::new(Arc::new(CacheManager::from_settings(&settings))),
            debouncer: Arc::new(Debouncer::new(settings.debounce())),
            settings: RwLock::new(settings),
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the settings. Cached results were computed under the old
    /// settings and are dropped; a new cache budget replaces the cache
    /// manager, which stops its sweeper.
    pub fn update_settings(&self, settings: Settings) {
        let previous = std::mem::replace(
            &mut *self.settings.write().unwrap_or_else(PoisonError::into_inner),
            settings.clone(),
        );
        self.debouncer.set_delay(settings.debounce());
        if previous.max_cache_size != settings.max_cache_size || previous.cache_ttl != settings.cache_ttl {
            debug!(max_cache_size = settings.max_cache_size, "cache budget changed, replacing caches");
            *self.caches.write().unwrap_or_else(PoisonError::into_inner) =
                Arc::new(CacheManager::from_settings(&settings));
        } else {
            self.caches().clear();
        }
    }

    pub fn caches(&self) -> Arc<CacheManager> {
        self.caches.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn debouncer(&self) -> Arc<Debouncer> {
        Arc::clone(&self.debouncer)
    }

    /// Analyse the full text of `document` at `version`.
    pub fn analyze(&self, document: &str, version: i32, text: &str) -> Analysis {
        self.run(document, version, text, None)
    }

    /// Analyse `text`, the result of applying `edits` to the snapshot at
    /// `base_version`. The cached parse of that snapshot, if still present,
    /// seeds an incremental reparse.
    pub fn analyze_edited(
        &self,
        document: &str,
        base_version: i32,
        version: i32,
        text: &str,
        edits: &[TextEdit],
    ) -> Analysis {
        self.run(document, version, text, Some((base_version, edits)))
    }

    /// The diagnostics for `document` at `version`, cached or fresh.
    pub fn provide_diagnostics(&self, document: &str, version: i32, text: &str) -> Arc<Vec<Diagnostic>> {
        self.analyze(document, version, text).diagnostics
    }

    /// Top-level multi-line constructs of every rule and query.
    pub fn pattern_metadata(&self, document: &str, version: i32, text: &str) -> Arc<Vec<PatternNode>> {
        let settings = self.settings();
        if !settings.enable_caching {
            return Arc::new(outermost_patterns(&self.parser(&settings).parse(text)));
        }
        let caches = self.caches();
        let fingerprint = content_fingerprint(text);
        if let Some(hit) = caches.patterns.get(document, version, fingerprint) {
            return hit;
        }
        let analysis = self.analyze(document, version, text);
        caches
            .patterns
            .insert(document, version, fingerprint, outermost_patterns(&analysis.parse))
    }

    pub fn bracket_table(&self, document: &str, version: i32, text: &str) -> Arc<BracketTable> {
        let settings = self.settings();
        if !settings.enable_caching {
            return Arc::new(self.parser(&settings).parse(text).brackets.into_table());
        }
        let caches = self.caches();
        let fingerprint = content_fingerprint(text);
        if let Some(hit) = caches.brackets.get(document, version, fingerprint) {
            return hit;
        }
        let analysis = self.analyze(document, version, text);
        caches
            .brackets
            .insert(document, version, fingerprint, analysis.parse.brackets.table().clone())
    }

    /// Forget `document`: drop its cache entries and any pending debounced work.
    pub fn close_document(&self, document: &str) {
        self.caches().invalidate(document);
        self.debouncer.cancel(document);
    }

    /// Periodically drop idle cache entries. Must be called from within a
    /// tokio runtime; the task ends when the current cache manager is replaced
    /// or dropped.
    pub fn start_sweeper(&self) -> JoinHandle<()> {
        let every = self.settings().gc_interval();
        self.caches().start_sweeper(every)
    }

    pub fn stats(&self) -> CacheManagerStats {
        self.caches().stats()
    }

    fn parser(&self, settings: &Settings) -> Parser {
        Parser::new(settings.parser_options())
    }

    fn diagnose(parse: &ParseResult, settings: &Settings) -> Vec<Diagnostic> {
        Validator::new().provide_diagnostics(parse, settings)
    }

    fn run(&self, document: &str, version: i32, text: &str, edited: Option<(i32, &[TextEdit])>) -> Analysis {
        let settings = self.settings();
        let fingerprint = content_fingerprint(text);
        let parser = self.parser(&settings);

        if !settings.enable_caching {
            let parse = parser.parse(text);
            let diagnostics = Self::diagnose(&parse, &settings);
            return Analysis {
                version,
                fingerprint,
                parse: Arc::new(parse),
                diagnostics: Arc::new(diagnostics),
                from_cache: false,
            };
        }

        let caches = self.caches();
        // looked up before `get`, which drops entries for other snapshots
        let previous = edited.and_then(|(base_version, edits)| {
            caches
                .parses
                .latest(document)
                .filter(|(cached, _)| *cached == base_version)
                .map(|(_, parse)| (parse, edits))
        });

        if let Some(parse) = caches.parses.get(document, version, fingerprint) {
            if let Some(diagnostics) = caches.diagnostics.get(document, version, fingerprint) {
                trace!(document, version, "analysis served from cache");
                return Analysis {
                    version,
                    fingerprint,
                    parse,
                    diagnostics,
                    from_cache: true,
                };
            }
            let diagnostics = caches
                .diagnostics
                .insert(document, version, fingerprint, Self::diagnose(&parse, &settings));
            return Analysis {
                version,
                fingerprint,
                parse,
                diagnostics,
                from_cache: false,
            };
        }

        let result = match previous {
            Some((previous, edits)) => {
                trace!(document, version, edits = edits.len(), "incremental reparse");
                parser.parse_incremental(&previous, text, edits)
            }
            None => {
                if edited.is_some() {
                    debug!(document, version, "no cached parse for the edited snapshot, parsing in full");
                }
                parser.parse(text)
            }
        };
        let parse = caches.parses.insert(document, version, fingerprint, result);
        let diagnostics = caches
            .diagnostics
            .insert(document, version, fingerprint, Self::diagnose(&parse, &settings));
        debug!(document, version, diagnostics = diagnostics.len(), "document analysed");
        Analysis {
            version,
            fingerprint,
            parse,
            diagnostics,
            from_cache: false,
        }
    }
}

/// Constructs not nested inside another one. Conditions built from a
/// construct's content carry their own nodes, which already appear as
/// children of the enclosing node.
fn outermost_patterns(parse: &ParseResult) -> Vec<PatternNode> {
    let mut out: Vec<PatternNode> = Vec::new();
    for node in parse.tree.patterns() {
        let nested = out
            .iter()
            .any(|outer| outer.range.start <= node.range.start && node.range.end <= outer.range.end);
        if !nested {
            out.push(node.clone());
        }
    }
    out
}

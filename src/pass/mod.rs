//! Annotator: pass coordination for one document
//!
//! # Design
//! 1. State machine: Idle → Scanning → Annotated, plus Detached once the
//!    extension context is gone (terminal).
//! 2. A pass is revert, extract, batch, then one scan+rewrite per batch.
//!    Each batch is a separate `step()` so the host can yield to the event
//!    loop in between.
//! 3. Every pass has a generation number. Starting a new pass or reverting
//!    bumps it, so steps of an older pass report `Superseded` and stop.
//! 4. All pass state (filters, resolver, first mentions) lives in
//!    `ActivePass` and is dropped by the next revert.
//! 5. Committed replacements go into a splice journal; revert replays it
//!    newest-first and puts the original text nodes back.
//!
//! # Usage
//! ```rust,ignore
//! let mut annotator = Annotator::new(page, "example.org", Settings::default());
//! annotator.set_dictionary(store.load_all());
//! if let Some(generation) = annotator.dispatch(Trigger::Initial) {
//!     while let StepOutcome::Continue = annotator.step(generation)? {}
//! }
//! ```

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::{LinkOption, Settings, SettingsUpdate, EXCLUDED_DOMAINS};
use crate::error::GlossError;
use crate::glossary::GlossaryEntry;
use crate::matcher::{compile_batches, extract_terms, Gate, Resolver, TermPattern};
use crate::tree::{collect_candidates, DocumentMut, FirstMentionSet, MatchRewriter, Splice};

#[cfg(test)]
mod tests;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassState {
    Idle,
    Scanning,
    Annotated,
    Detached,
}

impl PassState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassState::Idle => "idle",
            PassState::Scanning => "scanning",
            PassState::Annotated => "annotated",
            PassState::Detached => "detached",
        }
    }
}

/// External events that may change what should be on the page
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Initial,
    Toggle { enabled: bool },
    UpdateSettings(SettingsUpdate),
    DisabledDomains(Vec<String>),
    DictionaryRefreshed,
    /// The page added content of its own (debounced by the host)
    ContentChanged,
    ContextInvalidated,
}

impl Trigger {
    /// Decode a runtime message (`{ action: ..., ... }`). Unknown actions
    /// and missing payloads yield `None`.
    pub fn from_message(message: &serde_json::Value) -> Option<Self> {
        match message.get("action")?.as_str()? {
            "toggleExtension" => Some(Trigger::Toggle {
                enabled: message.get("enabled")?.as_bool()?,
            }),
            "updateSettings" => {
                let settings = message.get("settings")?;
                Some(Trigger::UpdateSettings(SettingsUpdate::from_value(settings)))
            }
            "updateDisabledDomains" => {
                let domains = message
                    .get("disabledDomains")?
                    .as_array()?
                    .iter()
                    .filter_map(|d| d.as_str().map(str::to_string))
                    .collect();
                Some(Trigger::DisabledDomains(domains))
            }
            "glossaryUpdated" => Some(Trigger::DictionaryRefreshed),
            "contextInvalidated" => Some(Trigger::ContextInvalidated),
            _ => None,
        }
    }
}

/// What a trigger resolves to. Never a partial mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Nothing,
    Revert,
    RevertThenRescan,
    /// Stop listening; no further mutation
    Shutdown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassStats {
    pub generation: u64,
    pub term_count: usize,
    pub batches_run: usize,
    pub batches_total: usize,
    pub nodes_rewritten: usize,
    pub annotations: usize,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// More batches remain
    Continue,
    Finished(PassStats),
    /// A newer pass or a revert replaced this one
    Superseded,
}

struct ActivePass<N> {
    generation: u64,
    root: N,
    patterns: Vec<TermPattern>,
    next: usize,
    resolver: Resolver,
    link_option: LinkOption,
    mentions: FirstMentionSet,
    stats: PassStats,
    started: instant::Instant,
}

// =============================================================================
// Annotator
// =============================================================================

pub struct Annotator<D: DocumentMut> {
    doc: D,
    host: String,
    settings: Settings,
    disabled_domains: Vec<String>,
    dictionary: Rc<[GlossaryEntry]>,
    state: PassState,
    generation: u64,
    journal: Vec<Splice<D::Node>>,
    active: Option<ActivePass<D::Node>>,
    last_stats: Option<PassStats>,
}

impl<D: DocumentMut> Annotator<D> {
    pub fn new(doc: D, host: impl Into<String>, settings: Settings) -> Self {
        Self {
            doc,
            host: host.into(),
            settings,
            disabled_domains: Vec::new(),
            dictionary: Rc::from(Vec::new()),
            state: PassState::Idle,
            generation: 0,
            journal: Vec::new(),
            active: None,
            last_stats: None,
        }
    }

    pub fn doc(&self) -> &D {
        &self.doc
    }

    pub fn doc_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_stats(&self) -> Option<&PassStats> {
        self.last_stats.as_ref()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.active.as_ref().map(|p| p.generation) == Some(generation)
    }

    /// Install a new immutable snapshot. Takes effect on the next pass.
    pub fn set_dictionary(&mut self, entries: Vec<GlossaryEntry>) {
        self.dictionary = entries.into();
    }

    pub fn dictionary_len(&self) -> usize {
        self.dictionary.len()
    }

    pub fn set_disabled_domains(&mut self, domains: Vec<String>) {
        self.disabled_domains = domains;
    }

    /// False on user-disabled hosts and on the glossary's own site
    pub fn is_host_allowed(&self) -> bool {
        !self.disabled_domains.iter().any(|d| d == &self.host)
            && !EXCLUDED_DOMAINS.iter().any(|d| self.host.contains(d))
    }

    fn should_scan(&self) -> bool {
        self.settings.extension_enabled && self.is_host_allowed()
    }

    // -------------------------------------------------------------------------
    // Triggers
    // -------------------------------------------------------------------------

    /// Fold a trigger into the annotator's settings and decide what to do
    pub fn resolve(&mut self, trigger: Trigger) -> Directive {
        if self.state == PassState::Detached {
            return Directive::Nothing;
        }

        match trigger {
            Trigger::Initial | Trigger::DictionaryRefreshed => {
                if self.should_scan() {
                    Directive::RevertThenRescan
                } else {
                    Directive::Nothing
                }
            }
            Trigger::Toggle { enabled } => {
                self.settings.extension_enabled = enabled;
                if self.should_scan() {
                    Directive::RevertThenRescan
                } else {
                    Directive::Revert
                }
            }
            Trigger::UpdateSettings(update) => {
                self.settings.merge(&update);
                if self.should_scan() {
                    Directive::RevertThenRescan
                } else {
                    Directive::Revert
                }
            }
            Trigger::DisabledDomains(domains) => {
                let listed = domains.iter().any(|d| d == &self.host);
                self.disabled_domains = domains;
                if listed {
                    Directive::Revert
                } else {
                    Directive::Nothing
                }
            }
            Trigger::ContentChanged => {
                // A pass in flight already covers the page
                if self.state != PassState::Scanning && self.should_scan() {
                    Directive::RevertThenRescan
                } else {
                    Directive::Nothing
                }
            }
            Trigger::ContextInvalidated => Directive::Shutdown,
        }
    }

    /// Carry out a directive. Returns the generation of a newly started pass.
    pub fn apply(&mut self, directive: Directive) -> Option<u64> {
        match directive {
            Directive::Nothing => None,
            Directive::Revert => {
                self.revert();
                None
            }
            Directive::RevertThenRescan => self.begin_pass(),
            Directive::Shutdown => {
                log_warn!("[Annotator] Extension context invalidated, detaching");
                self.active = None;
                self.generation += 1;
                self.state = PassState::Detached;
                None
            }
        }
    }

    pub fn dispatch(&mut self, trigger: Trigger) -> Option<u64> {
        let directive = self.resolve(trigger);
        self.apply(directive)
    }

    // -------------------------------------------------------------------------
    // Revert
    // -------------------------------------------------------------------------

    /// Remove every annotation, restoring the original text nodes.
    /// Cancels any pass in flight. Returns the number of nodes restored.
    pub fn revert(&mut self) -> usize {
        if self.state == PassState::Detached {
            return 0;
        }
        self.active = None;
        self.generation += 1;

        let mut restored = 0;
        while let Some(splice) = self.journal.pop() {
            match self.doc.restore(&splice.original, &splice.inserted) {
                Ok(()) => restored += 1,
                Err(e) => log_warn!("[Annotator] Could not restore node: {}", e),
            }
        }

        // Annotations the journal does not know about (page re-inserted them,
        // or an earlier instance left them behind)
        for stray in self.doc.annotations() {
            match self.doc.unwrap_annotation(&stray) {
                Ok(()) => restored += 1,
                Err(e) => log_warn!("[Annotator] Could not unwrap annotation: {}", e),
            }
        }

        self.state = PassState::Idle;
        restored
    }

    // -------------------------------------------------------------------------
    // Pass
    // -------------------------------------------------------------------------

    /// Revert, then prepare a new pass. `None` when there is nothing to scan.
    pub fn begin_pass(&mut self) -> Option<u64> {
        self.revert();
        if self.state == PassState::Detached || !self.should_scan() {
            return None;
        }
        if self.dictionary.is_empty() {
            return None;
        }
        let root = self.doc.content_root()?;

        let gate = Gate::new(self.settings.content_type_filters);
        let terms = extract_terms(&self.dictionary, &gate);
        if terms.is_empty() {
            return None;
        }
        let patterns = compile_batches(&terms);

        let generation = self.generation;
        self.active = Some(ActivePass {
            generation,
            root,
            next: 0,
            resolver: Resolver::new(Rc::clone(&self.dictionary), gate),
            link_option: self.settings.link_option,
            mentions: FirstMentionSet::new(),
            stats: PassStats {
                generation,
                term_count: terms.len(),
                batches_total: patterns.len(),
                ..PassStats::default()
            },
            patterns,
            started: instant::Instant::now(),
        });
        self.state = PassState::Scanning;
        Some(generation)
    }

    /// Run the next batch of pass `generation`
    pub fn step(&mut self, generation: u64) -> Result<StepOutcome, GlossError> {
        if self.state == PassState::Detached {
            return Err(GlossError::ContextInvalidated);
        }
        let pass = match self.active.as_mut() {
            Some(pass) if pass.generation == generation => pass,
            _ => return Ok(StepOutcome::Superseded),
        };

        if let Some(pattern) = pass.patterns.get(pass.next) {
            let rewriter = MatchRewriter::new(&pass.resolver, pass.link_option);
            let candidates = collect_candidates(&self.doc, &pass.root, pattern);

            for node in candidates {
                match rewriter.rewrite(&mut self.doc, &node, pattern, &mut pass.mentions) {
                    Ok(Some(splice)) => {
                        pass.stats.nodes_rewritten += 1;
                        pass.stats.annotations += splice.annotations;
                        self.journal.push(splice);
                    }
                    Ok(None) => {}
                    Err(e) => log_warn!("[Annotator] Skipping node: {}", e),
                }
            }

            pass.next += 1;
            pass.stats.batches_run += 1;
        }

        if pass.next < pass.patterns.len() {
            return Ok(StepOutcome::Continue);
        }

        let mut stats = pass.stats.clone();
        stats.elapsed_ms = pass.started.elapsed().as_secs_f64() * 1000.0;
        log_info!(
            "[Annotator] Pass {} done: {} annotations in {} nodes ({} batches, {:.1}ms)",
            stats.generation,
            stats.annotations,
            stats.nodes_rewritten,
            stats.batches_run,
            stats.elapsed_ms
        );

        self.active = None;
        self.state = PassState::Annotated;
        self.last_stats = Some(stats.clone());
        Ok(StepOutcome::Finished(stats))
    }

    /// Begin a pass and run every batch without yielding
    pub fn run_pass(&mut self) -> Result<Option<PassStats>, GlossError> {
        match self.begin_pass() {
            Some(generation) => self.drive(generation),
            None => Ok(None),
        }
    }

    /// Run the remaining batches of `generation` without yielding
    pub fn drive(&mut self, generation: u64) -> Result<Option<PassStats>, GlossError> {
        loop {
            match self.step(generation)? {
                StepOutcome::Continue => continue,
                StepOutcome::Finished(stats) => return Ok(Some(stats)),
                StepOutcome::Superseded => return Ok(None),
            }
        }
    }
}

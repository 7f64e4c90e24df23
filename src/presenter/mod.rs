// src/presenter/mod.rs
//! Turns submission outcomes into view state: phase, tabs, risk level and
//! display-bounded lists. Rendering never mutates the result document.

use serde::{Deserialize, Serialize};

use crate::document::{ExtractedFile, FileHashes, FileKind, ResultDocument};
use crate::models::SubmissionOutcome;
use crate::transfer::TransferPhase;
use crate::validator::Rejection;

pub mod html;
pub mod risk;
mod text;

pub use html::escape_html;
pub use risk::{RiskInputs, RiskLevel, RiskSource, classify};

/// Label used for errors raised before anything reaches the network.
pub const VALIDATION_REJECTED: &str = "ValidationRejected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Uploading,
    Analyzing,
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    Summary,
    Secrets,
    Urls,
    Patterns,
    Registry,
    Decompiled,
    #[serde(rename = "exe")]
    ExeAnalysis,
}

const SOURCE_TABS: [Tab; 6] = [
    Tab::Summary,
    Tab::Secrets,
    Tab::Urls,
    Tab::Patterns,
    Tab::Registry,
    Tab::Decompiled,
];

const EXE_TABS: [Tab; 6] = [
    Tab::Summary,
    Tab::Secrets,
    Tab::Urls,
    Tab::Patterns,
    Tab::Registry,
    Tab::ExeAnalysis,
];

impl Tab {
    /// The tab set shown for each kind of analyzed file.
    pub fn set_for(kind: FileKind) -> &'static [Tab] {
        match kind {
            FileKind::Script | FileKind::Bytecode => &SOURCE_TABS,
            FileKind::NativeExecutable => &EXE_TABS,
        }
    }

    /// Stable identifier, identical to the serialized name.
    pub fn id(&self) -> &'static str {
        match self {
            Tab::Summary => "summary",
            Tab::Secrets => "secrets",
            Tab::Urls => "urls",
            Tab::Patterns => "patterns",
            Tab::Registry => "registry",
            Tab::Decompiled => "decompiled",
            Tab::ExeAnalysis => "exe",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Summary => "Summary",
            Tab::Secrets => "Secrets & Tokens",
            Tab::Urls => "URLs",
            Tab::Patterns => "Code Patterns",
            Tab::Registry => "Registry",
            Tab::Decompiled => "Decompiled Source",
            Tab::ExeAnalysis => "EXE Analysis",
        }
    }
}

/// Per-category caps on rendered list items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayLimits {
    pub strings: usize,
    pub urls: usize,
    pub behavior: usize,
    pub secrets: usize,
    pub registry: usize,
}

impl Default for DisplayLimits {
    fn default() -> Self {
        Self {
            strings: 200,
            urls: 50,
            behavior: 100,
            secrets: 100,
            registry: 100,
        }
    }
}

/// The first `limit` items of a list plus how many were left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruncatedList {
    pub items: Vec<String>,
    pub remainder: usize,
}

impl TruncatedList {
    pub fn new(source: &[String], limit: usize) -> Self {
        Self {
            items: source.iter().take(limit).cloned().collect(),
            remainder: source.len().saturating_sub(limit),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> usize {
        self.items.len() + self.remainder
    }

    pub fn overflow_label(&self) -> Option<String> {
        (self.remainder > 0).then(|| format!("...and {} more", self.remainder))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub file_type: String,
    pub kind: FileKind,
    pub file_name: Option<String>,
    pub size_label: Option<String>,
    pub detection: String,
    pub status: String,
    pub text: String,
    pub hashes: Option<FileHashes>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragmentView {
    pub index: usize,
    pub source: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExeAnalysisView {
    pub python_embedded: bool,
    pub compiler: Option<String>,
    pub section_names: Vec<String>,
    pub extracted_files: Vec<ExtractedFile>,
    pub fragments: Vec<FragmentView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SectionContent {
    Summary(Summary),
    List(TruncatedList),
    Patterns {
        commands: TruncatedList,
        behavior: TruncatedList,
        strings: TruncatedList,
    },
    Decompiled(Option<String>),
    Exe(ExeAnalysisView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub tab: Tab,
    pub content: SectionContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBanner {
    pub kind: String,
    pub message: String,
}

/// Everything the result area shows. Derived; replaced wholesale on each outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub phase: Phase,
    pub active_tab: Tab,
    pub risk_level: Option<RiskLevel>,
    pub risk_source: Option<RiskSource>,
    pub sections: Vec<Section>,
    /// Informational line, never styled as an error.
    pub notice: Option<String>,
    pub error: Option<ErrorBanner>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::idle()
    }
}

impl ViewState {
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            active_tab: Tab::Summary,
            risk_level: None,
            risk_source: None,
            sections: Vec::new(),
            notice: None,
            error: None,
        }
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.sections.iter().map(|section| section.tab).collect()
    }

    pub fn has_tab(&self, tab: Tab) -> bool {
        self.sections.iter().any(|section| section.tab == tab)
    }

    pub fn section(&self, tab: Tab) -> Option<&Section> {
        self.sections.iter().find(|section| section.tab == tab)
    }

    /// Switches tabs; only tabs present in this view can be selected.
    pub fn select_tab(&mut self, tab: Tab) -> bool {
        if self.has_tab(tab) {
            self.active_tab = tab;
            true
        } else {
            false
        }
    }

    /// Shows or hides one decompiled fragment. Returns its new visibility.
    pub fn toggle_fragment(&mut self, index: usize) -> Option<bool> {
        let fragment = self.sections.iter_mut().find_map(|section| match &mut section.content {
            SectionContent::Exe(exe) => exe.fragments.iter_mut().find(|f| f.index == index),
            _ => None,
        })?;
        fragment.visible = !fragment.visible;
        Some(fragment.visible)
    }
}

/// Maps outcomes to view state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Presenter {
    limits: DisplayLimits,
}

impl Presenter {
    pub fn new(limits: DisplayLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &DisplayLimits {
        &self.limits
    }

    pub fn render(&self, outcome: &SubmissionOutcome) -> ViewState {
        match outcome {
            SubmissionOutcome::Success(doc) => self.render_document(doc),
            SubmissionOutcome::Failure(kind, message) => ViewState {
                phase: Phase::Error,
                error: Some(ErrorBanner {
                    kind: kind.to_string(),
                    message: message.clone(),
                }),
                ..ViewState::idle()
            },
            SubmissionOutcome::Cancelled => ViewState {
                notice: Some("Analysis cancelled.".to_string()),
                ..ViewState::idle()
            },
        }
    }

    /// In-flight view while a submission is uploading or being analyzed.
    pub fn progress(&self, phase: TransferPhase, file_name: Option<&str>) -> ViewState {
        let (phase, notice) = match phase {
            TransferPhase::Idle => return ViewState::idle(),
            TransferPhase::Uploading(_) => (
                Phase::Uploading,
                match file_name {
                    Some(name) => format!("Uploading {}...", name),
                    None => "Uploading...".to_string(),
                },
            ),
            TransferPhase::Analyzing(_) => (
                Phase::Analyzing,
                "Please wait while we analyze the file...".to_string(),
            ),
        };

        ViewState {
            phase,
            notice: Some(notice),
            ..ViewState::idle()
        }
    }

    pub fn rejected(&self, rejection: &Rejection) -> ViewState {
        ViewState {
            phase: Phase::Error,
            error: Some(ErrorBanner {
                kind: VALIDATION_REJECTED.to_string(),
                message: rejection.to_string(),
            }),
            ..ViewState::idle()
        }
    }

    fn render_document(&self, doc: &ResultDocument) -> ViewState {
        let (risk_level, risk_source) = risk::assess(doc);
        let limits = &self.limits;

        let sections = Tab::set_for(doc.kind)
            .iter()
            .map(|tab| {
                let content = match tab {
                    Tab::Summary => SectionContent::Summary(summarize(doc)),
                    Tab::Secrets => {
                        SectionContent::List(TruncatedList::new(&doc.secrets, limits.secrets))
                    }
                    Tab::Urls => SectionContent::List(TruncatedList::new(&doc.urls, limits.urls)),
                    Tab::Patterns => SectionContent::Patterns {
                        commands: TruncatedList::new(&doc.commands, limits.behavior),
                        behavior: TruncatedList::new(&doc.behavior_indicators, limits.behavior),
                        strings: TruncatedList::new(&doc.strings, limits.strings),
                    },
                    Tab::Registry => {
                        SectionContent::List(TruncatedList::new(&doc.registry, limits.registry))
                    }
                    Tab::Decompiled => SectionContent::Decompiled(doc.decompiled.clone()),
                    Tab::ExeAnalysis => SectionContent::Exe(exe_view(doc)),
                };
                Section { tab: *tab, content }
            })
            .collect();

        ViewState {
            phase: Phase::Done,
            active_tab: Tab::Summary,
            risk_level: Some(risk_level),
            risk_source: Some(risk_source),
            sections,
            notice: None,
            error: None,
        }
    }
}

fn exe_view(doc: &ResultDocument) -> ExeAnalysisView {
    let exe = doc.exe_specific.clone().unwrap_or_default();
    ExeAnalysisView {
        python_embedded: exe.python_embedded,
        compiler: exe.compiler,
        section_names: doc
            .pe_info
            .as_ref()
            .map(|pe| pe.sections.iter().map(|s| s.name().to_string()).collect())
            .unwrap_or_default(),
        extracted_files: exe.extracted_files,
        fragments: exe
            .decompiled_code
            .into_iter()
            .enumerate()
            .map(|(index, source)| FragmentView {
                index,
                source,
                visible: false,
            })
            .collect(),
    }
}

fn summarize(doc: &ResultDocument) -> Summary {
    let mut parts = vec![format!("This file appears to be {}.", describe(doc.kind))];

    if !doc.detection_labels.is_empty() {
        parts.push(format!("Detected as: {}.", doc.detection_labels.join(", ")));
    }
    if !doc.urls.is_empty() {
        parts.push(format!("Found {} potential URLs.", doc.urls.len()));
    }
    if !doc.commands.is_empty() {
        parts.push(format!("Found {} dangerous commands.", doc.commands.len()));
    }
    if let Some(pe) = &doc.pe_info {
        parts.push(format!("PE file with {} sections.", pe.sections.len()));
    }
    if let Some(exe) = doc.exe_specific.as_ref().filter(|exe| exe.python_embedded) {
        match &exe.compiler {
            Some(compiler) => parts.push(format!("Embedded Python found ({}).", compiler)),
            None => parts.push("Embedded Python found.".to_string()),
        }
    }

    let suspicious = !doc.urls.is_empty() || !doc.commands.is_empty();
    if !suspicious && doc.detection_labels.is_empty() && doc.behavior_indicators.is_empty() {
        parts.push("No obvious malicious indicators.".to_string());
    }

    Summary {
        file_type: doc.file_type.clone(),
        kind: doc.kind,
        file_name: doc.file_name.clone(),
        size_label: doc.size.map(format_file_size),
        detection: if doc.detection_labels.is_empty() {
            "No detection".to_string()
        } else {
            doc.detection_labels.join(", ")
        },
        status: if suspicious {
            "Suspicious activity found".to_string()
        } else {
            "No threats detected".to_string()
        },
        text: parts.join(" "),
        hashes: doc.hashes.clone(),
        warnings: doc.warnings.clone(),
    }
}

fn describe(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Script => "a Python script",
        FileKind::Bytecode => "compiled Python bytecode",
        FileKind::NativeExecutable => "a native executable",
    }
}

/// Human-readable size: `0 Bytes`, `2 KB`, `1.5 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ExeSpecific;
    use crate::models::FailureKind;

    #[test]
    fn tab_wire_name_matches_markup_id() {
        for tab in SOURCE_TABS.iter().chain(EXE_TABS.iter()) {
            let wire = serde_json::to_value(tab).unwrap();
            assert_eq!(wire, serde_json::json!(tab.id()));
            let back: Tab = serde_json::from_value(wire).unwrap();
            assert_eq!(back, *tab);
        }
        assert!(serde_json::from_str::<Tab>(r#""exe_analysis""#).is_err());
    }

    fn script_doc() -> ResultDocument {
        ResultDocument {
            file_type: "python".to_string(),
            kind: FileKind::Script,
            file_name: None,
            size: None,
            detection_labels: vec![],
            urls: vec!["http://a.com".to_string()],
            strings: vec!["hello".to_string()],
            commands: vec![],
            behavior_indicators: vec![],
            secrets: vec![],
            registry: vec![],
            warnings: vec![],
            risk: None,
            decompiled: Some("print('hello')".to_string()),
            pe_info: None,
            exe_specific: None,
            hashes: None,
        }
    }

    #[test]
    fn script_document_shows_decompiled_tab_only() {
        let view = Presenter::default().render(&SubmissionOutcome::Success(script_doc()));
        assert_eq!(view.phase, Phase::Done);
        assert_eq!(view.risk_level, Some(RiskLevel::Low));
        assert_eq!(view.risk_source, Some(RiskSource::Derived));
        assert!(view.has_tab(Tab::Decompiled));
        assert!(!view.has_tab(Tab::ExeAnalysis));
        for tab in [Tab::Summary, Tab::Secrets, Tab::Urls, Tab::Patterns, Tab::Registry] {
            assert!(view.has_tab(tab));
        }
    }

    #[test]
    fn exe_document_swaps_decompiled_for_exe_tab() {
        let mut doc = script_doc();
        doc.kind = FileKind::NativeExecutable;
        doc.exe_specific = Some(ExeSpecific {
            python_embedded: true,
            compiler: Some("PyInstaller".to_string()),
            extracted_files: vec![],
            decompiled_code: vec!["a = 1".to_string(), "b = 2".to_string()],
        });

        let mut view = Presenter::default().render(&SubmissionOutcome::Success(doc));
        assert!(view.has_tab(Tab::ExeAnalysis));
        assert!(!view.has_tab(Tab::Decompiled));

        assert_eq!(view.toggle_fragment(1), Some(true));
        assert_eq!(view.toggle_fragment(1), Some(false));
        assert_eq!(view.toggle_fragment(7), None);
    }

    #[test]
    fn backend_risk_wins_over_derived() {
        let mut doc = script_doc();
        doc.risk = Some(RiskLevel::High);
        let view = Presenter::default().render(&SubmissionOutcome::Success(doc));
        assert_eq!(view.risk_level, Some(RiskLevel::High));
        assert_eq!(view.risk_source, Some(RiskSource::Backend));
    }

    #[test]
    fn truncation_is_display_only() {
        let mut doc = script_doc();
        doc.urls = (0..60).map(|i| format!("http://host{}.com", i)).collect();
        let presenter = Presenter::default();
        let view = presenter.render(&SubmissionOutcome::Success(doc.clone()));

        let Some(SectionContent::List(urls)) = view.section(Tab::Urls).map(|s| &s.content) else {
            panic!("urls section missing");
        };
        assert_eq!(urls.items.len(), 50);
        assert_eq!(urls.remainder, 10);
        assert_eq!(urls.overflow_label().as_deref(), Some("...and 10 more"));
        assert_eq!(doc.urls.len(), 60);
    }

    #[test]
    fn failure_renders_error_without_sections() {
        let view = Presenter::default().render(&SubmissionOutcome::Failure(
            FailureKind::ServerRejected,
            "Server error (500)".to_string(),
        ));
        assert_eq!(view.phase, Phase::Error);
        assert!(view.sections.is_empty());
        assert_eq!(view.error.unwrap().kind, "ServerRejected");
    }

    #[test]
    fn cancelled_is_idle_with_notice() {
        let view = Presenter::default().render(&SubmissionOutcome::Cancelled);
        assert_eq!(view.phase, Phase::Idle);
        assert!(view.error.is_none());
        assert!(view.notice.is_some());
    }

    #[test]
    fn select_tab_rejects_hidden_tabs() {
        let mut view = Presenter::default().render(&SubmissionOutcome::Success(script_doc()));
        assert!(view.select_tab(Tab::Urls));
        assert_eq!(view.active_tab, Tab::Urls);
        assert!(!view.select_tab(Tab::ExeAnalysis));
        assert_eq!(view.active_tab, Tab::Urls);
    }

    #[test]
    fn formats_sizes_like_the_drop_page() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(2048), "2 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(60 * 1024 * 1024), "60 MB");
    }
}

// src/presenter/html.rs
//! Markup for the result area. Every interpolated value goes through
//! [`escape_html`]; URLs are shown as text, never as live links.

use std::fmt::Write;

use super::{
    ExeAnalysisView, Phase, Section, SectionContent, Summary, TruncatedList, ViewState,
};

/// Escapes `&`, `<`, `>`, `"` and `'`.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

impl ViewState {
    /// Renders the result area as an HTML fragment.
    pub fn to_html(&self) -> String {
        let mut out = String::new();

        if let Some(error) = &self.error {
            let _ = write!(
                out,
                r#"<div class="error" data-kind="{}"><strong>Error:</strong> {}</div>"#,
                escape_html(&error.kind),
                escape_html(&error.message)
            );
        }

        if let Some(notice) = &self.notice {
            let class = match self.phase {
                Phase::Uploading | Phase::Analyzing => "notice progress",
                _ => "notice",
            };
            let _ = write!(out, r#"<div class="{}">{}</div>"#, class, escape_html(notice));
        }

        if self.sections.is_empty() {
            return out;
        }

        if let Some(level) = self.risk_level {
            let _ = write!(
                out,
                r#"<div class="risk-level {}">{}</div>"#,
                level.css_class(),
                level
            );
        }

        out.push_str(r#"<nav class="tabs">"#);
        for section in &self.sections {
            let active = if section.tab == self.active_tab { " active" } else { "" };
            let _ = write!(
                out,
                r#"<button class="tab{}" data-tab="{}">{}</button>"#,
                active,
                section.tab.id(),
                escape_html(section.tab.title())
            );
        }
        out.push_str("</nav>");

        for section in &self.sections {
            render_section(&mut out, section, section.tab == self.active_tab);
        }

        out
    }
}

fn render_section(out: &mut String, section: &Section, active: bool) {
    let _ = write!(
        out,
        r#"<div class="tab-content{}" id="{}Tab">"#,
        if active { " active" } else { "" },
        section.tab.id()
    );

    match &section.content {
        SectionContent::Summary(summary) => render_summary(out, summary),
        SectionContent::List(list) => render_list(out, list, "Nothing found"),
        SectionContent::Patterns {
            commands,
            behavior,
            strings,
        } => {
            out.push_str("<h4>Commands</h4>");
            render_list(out, commands, "No dangerous commands");
            out.push_str("<h4>Behavior</h4>");
            render_list(out, behavior, "No suspicious behavior detected");
            out.push_str("<h4>Strings</h4>");
            render_list(out, strings, "No strings extracted");
        }
        SectionContent::Decompiled(Some(source)) => {
            let _ = write!(out, "<pre>{}</pre>", escape_html(source));
        }
        SectionContent::Decompiled(None) => {
            out.push_str("<p>No decompiled code available</p>");
        }
        SectionContent::Exe(exe) => render_exe(out, exe),
    }

    out.push_str("</div>");
}

fn render_summary(out: &mut String, summary: &Summary) {
    out.push_str("<dl>");
    if let Some(name) = &summary.file_name {
        let _ = write!(out, "<dt>File</dt><dd>{}</dd>", escape_html(name));
    }
    if let Some(size) = &summary.size_label {
        let _ = write!(out, "<dt>Size</dt><dd>{}</dd>", escape_html(size));
    }
    let _ = write!(
        out,
        "<dt>Type</dt><dd>{}</dd><dt>Detection</dt><dd>{}</dd><dt>Status</dt><dd>{}</dd>",
        escape_html(&summary.file_type),
        escape_html(&summary.detection),
        escape_html(&summary.status)
    );
    if let Some(hashes) = &summary.hashes {
        for (label, value) in [
            ("MD5", &hashes.md5),
            ("SHA-1", &hashes.sha1),
            ("SHA-256", &hashes.sha256),
        ] {
            if let Some(value) = value {
                let _ = write!(out, "<dt>{}</dt><dd><code>{}</code></dd>", label, escape_html(value));
            }
        }
    }
    out.push_str("</dl>");

    let _ = write!(out, r#"<p class="summary">{}</p>"#, escape_html(&summary.text));

    if !summary.warnings.is_empty() {
        out.push_str(r#"<ul class="warnings">"#);
        for warning in &summary.warnings {
            let _ = write!(out, "<li>{}</li>", escape_html(warning));
        }
        out.push_str("</ul>");
    }
}

fn render_list(out: &mut String, list: &TruncatedList, empty: &str) {
    if list.is_empty() {
        let _ = write!(out, r#"<p class="empty">{}</p>"#, escape_html(empty));
        return;
    }

    out.push_str("<ul>");
    for item in &list.items {
        let _ = write!(out, "<li><code>{}</code></li>", escape_html(item));
    }
    if let Some(more) = list.overflow_label() {
        let _ = write!(out, r#"<li class="more">{}</li>"#, escape_html(&more));
    }
    out.push_str("</ul>");
}

fn render_exe(out: &mut String, exe: &ExeAnalysisView) {
    let _ = write!(
        out,
        "<dl><dt>Embedded Python</dt><dd>{}</dd>",
        if exe.python_embedded { "Yes" } else { "No" }
    );
    if let Some(compiler) = &exe.compiler {
        let _ = write!(out, "<dt>Compiler</dt><dd>{}</dd>", escape_html(compiler));
    }
    if !exe.section_names.is_empty() {
        let names: Vec<String> = exe.section_names.iter().map(|n| escape_html(n)).collect();
        let _ = write!(out, "<dt>PE sections</dt><dd>{}</dd>", names.join(", "));
    }
    out.push_str("</dl>");

    out.push_str("<h4>Extracted files</h4>");
    if exe.extracted_files.is_empty() {
        out.push_str(r#"<p class="empty">No files extracted</p>"#);
    } else {
        out.push_str("<ul>");
        for file in &exe.extracted_files {
            let _ = write!(out, "<li><code>{}</code>", escape_html(&file.name));
            if let Some(kind) = &file.kind {
                let _ = write!(out, " ({})", escape_html(kind));
            }
            out.push_str("</li>");
        }
        out.push_str("</ul>");
    }

    out.push_str("<h4>Decompiled fragments</h4>");
    if exe.fragments.is_empty() {
        out.push_str(r#"<p class="empty">No decompiled code available</p>"#);
    }
    for fragment in &exe.fragments {
        let _ = write!(
            out,
            r#"<details class="fragment" data-index="{}"{}><summary>Fragment {}</summary><pre>{}</pre></details>"#,
            fragment.index,
            if fragment.visible { " open" } else { "" },
            fragment.index + 1,
            escape_html(&fragment.source)
        );
    }
}

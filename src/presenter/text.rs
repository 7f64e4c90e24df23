// src/presenter/text.rs
// Plain-text report for terminals.

use std::fmt;

use super::{Phase, SectionContent, TruncatedList, ViewState};

fn write_list(f: &mut fmt::Formatter<'_>, list: &TruncatedList, empty: &str) -> fmt::Result {
    if list.is_empty() {
        return writeln!(f, "  {}", empty);
    }
    for item in &list.items {
        writeln!(f, "  • {}", item)?;
    }
    if let Some(more) = list.overflow_label() {
        writeln!(f, "  {}", more)?;
    }
    Ok(())
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            writeln!(f, "❌ Error ({}): {}", error.kind, error.message)?;
        }
        if let Some(notice) = &self.notice {
            let icon = match self.phase {
                Phase::Uploading | Phase::Analyzing => "⏳",
                _ => "ℹ️ ",
            };
            writeln!(f, "{} {}", icon, notice)?;
        }
        if let Some(level) = self.risk_level {
            writeln!(f, "Risk level: {}", level)?;
        }

        for section in &self.sections {
            writeln!(f, "\n== {} ==", section.tab.title())?;
            match &section.content {
                SectionContent::Summary(summary) => {
                    if let Some(name) = &summary.file_name {
                        writeln!(f, "  File: {}", name)?;
                    }
                    if let Some(size) = &summary.size_label {
                        writeln!(f, "  Size: {}", size)?;
                    }
                    writeln!(f, "  Type: {}", summary.file_type)?;
                    writeln!(f, "  Detection: {}", summary.detection)?;
                    writeln!(f, "  Status: {}", summary.status)?;
                    writeln!(f, "  {}", summary.text)?;
                    for warning in &summary.warnings {
                        writeln!(f, "  ⚠️  {}", warning)?;
                    }
                }
                SectionContent::List(list) => write_list(f, list, "Nothing found")?,
                SectionContent::Patterns {
                    commands,
                    behavior,
                    strings,
                } => {
                    writeln!(f, " Commands:")?;
                    write_list(f, commands, "No dangerous commands")?;
                    writeln!(f, " Behavior:")?;
                    write_list(f, behavior, "No suspicious behavior detected")?;
                    writeln!(f, " Strings:")?;
                    write_list(f, strings, "No strings extracted")?;
                }
                SectionContent::Decompiled(Some(source)) => writeln!(f, "{}", source)?,
                SectionContent::Decompiled(None) => writeln!(f, "  No decompiled code available")?,
                SectionContent::Exe(exe) => {
                    writeln!(
                        f,
                        "  Embedded Python: {}",
                        if exe.python_embedded { "yes" } else { "no" }
                    )?;
                    if let Some(compiler) = &exe.compiler {
                        writeln!(f, "  Compiler: {}", compiler)?;
                    }
                    if !exe.section_names.is_empty() {
                        writeln!(f, "  PE sections: {}", exe.section_names.join(", "))?;
                    }
                    for file in &exe.extracted_files {
                        writeln!(f, "  📄 {}", file.name)?;
                    }
                    for fragment in &exe.fragments {
                        if fragment.visible {
                            writeln!(f, "--- fragment {} ---\n{}", fragment.index + 1, fragment.source)?;
                        } else {
                            writeln!(f, "  [fragment {} hidden]", fragment.index + 1)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

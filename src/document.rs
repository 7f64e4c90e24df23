// src/document.rs
//! The analysis service's result document and the normalization that folds
//! every response shape the service has shipped into one read-only value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{InspectError, Result};
use crate::presenter::RiskLevel;

/// What kind of candidate the service analyzed. Drives which tabs are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Script,
    Bytecode,
    NativeExecutable,
}

impl FileKind {
    /// Kind implied by an accepted file name, if its extension is known.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lowered = file_name.to_lowercase();
        if lowered.ends_with(".py") {
            Some(FileKind::Script)
        } else if lowered.ends_with(".pyc") || lowered.ends_with(".pyz") {
            Some(FileKind::Bytecode)
        } else if lowered.ends_with(".exe") {
            Some(FileKind::NativeExecutable)
        } else {
            None
        }
    }

    /// Maps a backend `fileType` string onto a kind.
    pub fn from_label(label: &str) -> Option<Self> {
        let lowered = label.trim().to_lowercase();
        match lowered.as_str() {
            "py" | "python" | "script" | "python script" | "source" => Some(FileKind::Script),
            "pyc" | "pyz" | "bytecode" | "marshal" => Some(FileKind::Bytecode),
            "exe" | "pe" | "dll" | "native" => Some(FileKind::NativeExecutable),
            other if other.contains("executable") => Some(FileKind::NativeExecutable),
            other if other.contains("bytecode") => Some(FileKind::Bytecode),
            other if other.contains("script") => Some(FileKind::Script),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Script => "Python script",
            FileKind::Bytecode => "Python bytecode",
            FileKind::NativeExecutable => "Native executable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PeInfo {
    pub sections: Vec<PeSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeSection {
    Named(String),
    Detailed {
        name: String,
        #[serde(default, alias = "virtualSize")]
        virtual_size: Option<u64>,
        #[serde(default)]
        entropy: Option<f64>,
    },
}

impl PeSection {
    pub fn name(&self) -> &str {
        match self {
            PeSection::Named(name) => name,
            PeSection::Detailed { name, .. } => name,
        }
    }
}

/// A file pulled out of a bundled executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireExtractedFile")]
pub struct ExtractedFile {
    pub name: String,
    pub kind: Option<String>,
    pub path: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireExtractedFile {
    Path(String),
    Entry {
        name: String,
        #[serde(default, rename = "type")]
        kind: Option<String>,
        #[serde(default)]
        path: Option<String>,
    },
}

impl From<WireExtractedFile> for ExtractedFile {
    fn from(wire: WireExtractedFile) -> Self {
        match wire {
            WireExtractedFile::Path(path) => {
                let name = path
                    .rsplit(['/', '\\'])
                    .next()
                    .unwrap_or(path.as_str())
                    .to_string();
                ExtractedFile {
                    name,
                    kind: None,
                    path: Some(path),
                }
            }
            WireExtractedFile::Entry { name, kind, path } => ExtractedFile { name, kind, path },
        }
    }
}

/// Native-executable findings: embedded interpreter, packer, unpacked files.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExeSpecific {
    #[serde(alias = "python_embedded", alias = "embeddedInterpreter")]
    pub python_embedded: bool,
    pub compiler: Option<String>,
    #[serde(alias = "extracted_files")]
    pub extracted_files: Vec<ExtractedFile>,
    #[serde(alias = "decompiled_code", alias = "fragments")]
    pub decompiled_code: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHashes {
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
}

/// Normalized analysis result. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDocument {
    /// The classification string exactly as the service reported it.
    pub file_type: String,
    pub kind: FileKind,
    pub file_name: Option<String>,
    pub size: Option<u64>,
    pub detection_labels: Vec<String>,
    pub urls: Vec<String>,
    pub strings: Vec<String>,
    pub commands: Vec<String>,
    pub behavior_indicators: Vec<String>,
    pub secrets: Vec<String>,
    pub registry: Vec<String>,
    pub warnings: Vec<String>,
    /// Risk level supplied by the service, when it computed one.
    pub risk: Option<RiskLevel>,
    pub decompiled: Option<String>,
    pub pe_info: Option<PeInfo>,
    pub exe_specific: Option<ExeSpecific>,
    pub hashes: Option<FileHashes>,
}

impl ResultDocument {
    /// Parses a 2xx response body.
    ///
    /// `hint` is the kind implied by the submitted file's extension; it is used
    /// only when the service's own `fileType` string is not recognized.
    ///
    /// # Errors
    /// [`InspectError::ApiResponse`] when the body carries an `error` field,
    /// [`InspectError::UnexpectedResponse`] when it is not JSON or lacks
    /// required fields.
    pub fn from_json(body: &str, hint: FileKind) -> Result<Self> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            InspectError::UnexpectedResponse(format!("response is not valid JSON: {}", e))
        })?;

        let Value::Object(top) = value else {
            return Err(InspectError::UnexpectedResponse(
                "expected a JSON object at the top level".to_string(),
            ));
        };

        let map = flatten_analysis(top);

        if let Some(message) = reported_error(&map) {
            return Err(InspectError::ApiResponse(message));
        }

        Self::from_map(&map, hint)
    }

    fn from_map(map: &Map<String, Value>, hint: FileKind) -> Result<Self> {
        let (file_type, kind) = match pick(map, &["fileType", "file_type", "type"]) {
            Some(Value::String(label)) => {
                let kind = FileKind::from_label(label).unwrap_or_else(|| {
                    log::debug!("Unrecognized fileType '{}', using {:?}", label, hint);
                    hint
                });
                (label.clone(), kind)
            }
            Some(other) => {
                return Err(malformed(format!("fileType must be a string, got {}", other)));
            }
            // The wrapped shape only says whether a Python payload was found.
            None if pick(map, &["is_python", "isPython"]).is_some() => {
                (hint.label().to_string(), hint)
            }
            None => return Err(malformed("missing required field 'fileType'")),
        };

        let urls = required_list(map, &["urls"])?;
        let strings = required_list(map, &["strings"])?;

        let mut exe_specific = match pick(map, &["exeSpecific", "exe_specific"]) {
            Some(value) => Some(from_value::<ExeSpecific>(value, "exeSpecific")?),
            None => flat_exe_specific(map)?,
        };

        let mut decompiled = pick(map, &["decompiled", "deobfuscated", "decompiledSource"])
            .and_then(Value::as_str)
            .map(str::to_string);

        // Executables show decompiled output as fragments in their own tab.
        if kind == FileKind::NativeExecutable {
            if let Some(source) = decompiled.take() {
                let block = exe_specific.get_or_insert_with(ExeSpecific::default);
                if block.decompiled_code.is_empty() {
                    block.decompiled_code.push(source);
                }
            }
        }

        let hashes = match pick(map, &["hashes"]) {
            Some(value) => Some(from_value::<FileHashes>(value, "hashes")?),
            None => match map.get("iocs").and_then(|iocs| iocs.get("hashes")) {
                Some(value) => Some(from_value::<FileHashes>(value, "iocs.hashes")?),
                None => None,
            },
        };

        Ok(ResultDocument {
            file_type,
            kind,
            file_name: pick(map, &["fileName", "file_name", "filename"])
                .and_then(Value::as_str)
                .map(str::to_string),
            size: pick(map, &["size", "fileSize", "file_size"]).and_then(Value::as_u64),
            detection_labels: list(
                map,
                &["detectionLabels", "detection_labels", "detection", "detections"],
            )?,
            urls,
            strings,
            commands: list(map, &["commands"])?,
            behavior_indicators: list(
                map,
                &["behaviorIndicators", "behavior_indicators", "behavior", "patterns"],
            )?,
            secrets: list(map, &["secrets", "tokens", "webhooks"])?,
            registry: list(map, &["registry", "registryKeys", "registry_keys"])?,
            warnings: list(map, &["warnings"])?,
            risk: pick(map, &["risk", "riskLevel", "risk_level"])
                .and_then(Value::as_str)
                .and_then(RiskLevel::from_label),
            decompiled,
            pe_info: match pick(map, &["peInfo", "pe_info"]) {
                Some(value) => Some(from_value::<PeInfo>(value, "peInfo")?),
                None => None,
            },
            exe_specific,
            hashes,
        })
    }
}

/// Lifts the fields of a nested `analysis` object to the top level.
fn flatten_analysis(mut top: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::Object(analysis)) = top.remove("analysis") {
        top.extend(analysis);
    }
    top
}

fn reported_error(map: &Map<String, Value>) -> Option<String> {
    match map.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(message) if message.trim().is_empty() => None,
        Value::String(message) => Some(message.clone()),
        Value::Object(inner) => Some(
            pick(inner, &["message", "detail"])
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(inner.clone()).to_string()),
        ),
        Value::Bool(true) => Some("the analysis service reported an error".to_string()),
        other => Some(other.to_string()),
    }
}

/// First non-null value under any of `keys`.
fn pick<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

fn required_list(map: &Map<String, Value>, keys: &[&str]) -> Result<Vec<String>> {
    if pick(map, keys).is_none() {
        return Err(malformed(format!("missing required field '{}'", keys[0])));
    }
    list(map, keys)
}

fn list(map: &Map<String, Value>, keys: &[&str]) -> Result<Vec<String>> {
    match pick(map, keys) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.iter().map(item_text).collect()),
        Some(other) => Err(malformed(format!(
            "'{}' must be an array, got {}",
            keys[0], other
        ))),
    }
}

fn item_text(item: &Value) -> String {
    match item {
        Value::String(text) => text.clone(),
        Value::Object(fields) => pick(fields, &["title", "name", "label", "description"])
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| item.to_string()),
        Value::Array(parts) => parts
            .iter()
            .filter_map(Value::as_str)
            .find(|part| !part.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| item.to_string()),
        other => other.to_string(),
    }
}

fn flat_exe_specific(map: &Map<String, Value>) -> Result<Option<ExeSpecific>> {
    let embedded = pick(map, &["python_embedded", "pythonEmbedded", "is_python", "isPython"]);
    let compiler = pick(map, &["compiler"]);
    let extracted = pick(map, &["extracted_files", "extractedFiles"]);
    let fragments = pick(map, &["decompiled_code", "decompiledCode"]);

    if embedded.is_none() && compiler.is_none() && extracted.is_none() && fragments.is_none() {
        return Ok(None);
    }

    Ok(Some(ExeSpecific {
        python_embedded: embedded.and_then(Value::as_bool).unwrap_or(false),
        compiler: compiler.and_then(Value::as_str).map(str::to_string),
        extracted_files: match extracted {
            Some(value) => from_value(value, "extracted_files")?,
            None => Vec::new(),
        },
        decompiled_code: list(map, &["decompiled_code", "decompiledCode"])?,
    }))
}

fn from_value<T: for<'de> Deserialize<'de>>(value: &Value, field: &str) -> Result<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| malformed(format!("'{}' has an unexpected shape: {}", field, e)))
}

fn malformed(message: impl Into<String>) -> InspectError {
    InspectError::UnexpectedResponse(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value, hint: FileKind) -> Result<ResultDocument> {
        ResultDocument::from_json(&value.to_string(), hint)
    }

    #[test]
    fn parses_canonical_shape() {
        let doc = parse(
            json!({
                "fileType": "python",
                "detectionLabels": ["Stealer"],
                "urls": ["http://a.com"],
                "strings": ["hello"],
                "behaviorIndicators": ["Keylogging: hook"],
                "risk": "HIGH"
            }),
            FileKind::Script,
        )
        .unwrap();

        assert_eq!(doc.kind, FileKind::Script);
        assert_eq!(doc.detection_labels, vec!["Stealer"]);
        assert_eq!(doc.behavior_indicators.len(), 1);
        assert_eq!(doc.risk, Some(RiskLevel::High));
        assert!(doc.exe_specific.is_none());
    }

    #[test]
    fn lifts_wrapped_analysis_object() {
        let doc = parse(
            json!({
                "filename": "dropper.exe",
                "size": 4096,
                "is_python": true,
                "analysis": {
                    "strings": ["PyInstaller"],
                    "urls": [],
                    "commands": ["os.system('whoami')"],
                    "behavior": [],
                    "decompiled": "print('hi')",
                    "extracted_files": ["out/dir/main.pyc", "out\\lib.pyd"],
                    "warnings": ["Extraction timed out"]
                }
            }),
            FileKind::NativeExecutable,
        )
        .unwrap();

        assert_eq!(doc.kind, FileKind::NativeExecutable);
        assert_eq!(doc.file_name.as_deref(), Some("dropper.exe"));
        assert_eq!(doc.size, Some(4096));
        assert_eq!(doc.commands.len(), 1);
        assert!(doc.decompiled.is_none());

        let exe = doc.exe_specific.unwrap();
        assert!(exe.python_embedded);
        assert_eq!(exe.extracted_files[0].name, "main.pyc");
        assert_eq!(exe.extracted_files[1].name, "lib.pyd");
        assert_eq!(exe.decompiled_code, vec!["print('hi')"]);
    }

    #[test]
    fn reads_nested_exe_block_with_entries() {
        let doc = parse(
            json!({
                "file_type": "exe",
                "urls": [],
                "strings": [],
                "exe_specific": {
                    "python_embedded": true,
                    "compiler": "PyInstaller",
                    "extracted_files": [{"name": "a.pyc", "type": "pyc", "path": "/tmp/a.pyc"}],
                    "decompiled_code": ["x = 1", "y = 2"]
                }
            }),
            FileKind::Script,
        )
        .unwrap();

        assert_eq!(doc.kind, FileKind::NativeExecutable);
        let exe = doc.exe_specific.unwrap();
        assert_eq!(exe.compiler.as_deref(), Some("PyInstaller"));
        assert_eq!(exe.extracted_files[0].kind.as_deref(), Some("pyc"));
        assert_eq!(exe.decompiled_code.len(), 2);
    }

    #[test]
    fn error_field_is_a_reported_failure() {
        let err = parse(
            json!({"fileType": "exe", "error": "scan engine unavailable"}),
            FileKind::NativeExecutable,
        )
        .unwrap_err();
        assert!(matches!(err, InspectError::ApiResponse(msg) if msg == "scan engine unavailable"));
    }

    #[test]
    fn null_error_field_is_ignored() {
        let doc = parse(
            json!({"fileType": "pyc", "urls": [], "strings": [], "error": null}),
            FileKind::Bytecode,
        );
        assert!(doc.is_ok());
    }

    #[test]
    fn missing_required_fields_are_malformed() {
        let missing_type = parse(json!({"urls": [], "strings": []}), FileKind::Script);
        assert!(matches!(missing_type, Err(InspectError::UnexpectedResponse(_))));

        let missing_urls = parse(json!({"fileType": "py", "strings": []}), FileKind::Script);
        assert!(matches!(missing_urls, Err(InspectError::UnexpectedResponse(_))));

        let wrong_shape = parse(
            json!({"fileType": "py", "urls": "http://a.com", "strings": []}),
            FileKind::Script,
        );
        assert!(matches!(wrong_shape, Err(InspectError::UnexpectedResponse(_))));
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = ResultDocument::from_json("<html>oops</html>", FileKind::Script).unwrap_err();
        assert!(matches!(err, InspectError::UnexpectedResponse(_)));

        let err = ResultDocument::from_json("[1, 2]", FileKind::Script).unwrap_err();
        assert!(matches!(err, InspectError::UnexpectedResponse(_)));
    }

    #[test]
    fn unknown_type_label_falls_back_to_hint() {
        let doc = parse(
            json!({"type": "Mystery Blob", "urls": [], "strings": []}),
            FileKind::Bytecode,
        )
        .unwrap();
        assert_eq!(doc.kind, FileKind::Bytecode);
        assert_eq!(doc.file_type, "Mystery Blob");
    }

    #[test]
    fn detection_objects_use_their_title() {
        let doc = parse(
            json!({
                "fileType": "exe",
                "urls": [],
                "strings": [],
                "detections": [{"title": "Registry Operations Detected", "severity": "warning"}]
            }),
            FileKind::NativeExecutable,
        )
        .unwrap();
        assert_eq!(doc.detection_labels, vec!["Registry Operations Detected"]);
    }

    #[test]
    fn kind_from_labels_and_names() {
        assert_eq!(FileKind::from_label("Python Executable"), Some(FileKind::NativeExecutable));
        assert_eq!(FileKind::from_label("PYC"), Some(FileKind::Bytecode));
        assert_eq!(FileKind::from_label("python"), Some(FileKind::Script));
        assert_eq!(FileKind::from_label("unknown"), None);
        assert_eq!(FileKind::from_file_name("A.PYZ"), Some(FileKind::Bytecode));
        assert_eq!(FileKind::from_file_name("a.txt"), None);
    }
}

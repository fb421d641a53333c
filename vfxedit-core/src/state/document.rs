#[derive(Clone, Debug)]
pub struct DocumentInfo {
    /// The path from which the file was loaded or saved, or None if opened as new.
    pub path: Option<std::path::PathBuf>,
    /// Name of the document, inferred from its path or generated.
    pub name: String,
}
impl Default for DocumentInfo {
    fn default() -> Self {
        Self {
            path: None,
            name: "New Effect".into(),
        }
    }
}
impl DocumentInfo {
    #[must_use]
    pub fn from_path(path: std::path::PathBuf) -> Self {
        let name = path
            .file_stem()
            .map_or_else(|| "Unnamed".into(), |stem| stem.to_string_lossy().into_owned());
        Self {
            path: Some(path),
            name,
        }
    }
}

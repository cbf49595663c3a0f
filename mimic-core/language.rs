use std::path::Path;

/// Editor language id for a file path, chosen by extension.
/// Unknown extensions map to `plaintext`.
pub fn language_id(path: impl AsRef<Path>) -> &'static str {
  let path = path.as_ref();
  let ext = path
    .extension()
    .or_else(|| path.file_name())
    .and_then(|ext| ext.to_str())
    .map(str::to_ascii_lowercase)
    .unwrap_or_default();

  match ext.as_str() {
    "ts" | "tsx" => "typescript",
    "js" | "jsx" => "javascript",
    "py" => "python",
    "rs" => "rust",
    "go" => "go",
    "java" => "java",
    "cpp" => "cpp",
    "c" => "c",
    "cs" => "csharp",
    "rb" => "ruby",
    "php" => "php",
    "swift" => "swift",
    "kt" => "kotlin",
    "md" => "markdown",
    "json" => "json",
    "yaml" | "yml" => "yaml",
    "xml" => "xml",
    "html" => "html",
    "css" => "css",
    "scss" => "scss",
    "sql" => "sql",
    "sh" | "bash" => "shell",
    "dockerfile" => "dockerfile",
    _ => "plaintext",
  }
}

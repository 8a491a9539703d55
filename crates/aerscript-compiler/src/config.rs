//! Compiler configuration.

use crate::bytecode::DEFAULT_CACHE_THRESHOLD;

/// Number of errors after which compilation is aborted.
pub const DEFAULT_ERROR_LIMIT: u32 = 15;

/// What a source text is expected to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileMode {
    /// Statements and declarations, in any order.
    #[default]
    Script,
    /// Only class, interface, function, namespace and using declarations.
    Declarations,
    /// A single expression whose value is returned.
    Expression,
}

/// Settings for a [`Compiler`](crate::Compiler).
///
/// ```
/// use aerscript_compiler::{CompileMode, CompilerConfig};
///
/// let config = CompilerConfig::new()
///     .with_file_name("index.aer")
///     .with_mode(CompileMode::Declarations)
///     .with_error_limit(5);
/// assert_eq!(config.file_label(), "index.aer");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    pub file_name: Option<String>,
    pub error_limit: u32,
    pub literal_cache_threshold: usize,
    pub mode: CompileMode,
    /// Treat the source as markup with `<?aer ... ?>` code islands.
    pub embedded: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            file_name: None,
            error_limit: DEFAULT_ERROR_LIMIT,
            literal_cache_threshold: DEFAULT_CACHE_THRESHOLD,
            mode: CompileMode::Script,
            embedded: false,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_error_limit(mut self, limit: u32) -> Self {
        self.error_limit = limit;
        self
    }

    pub fn with_literal_cache_threshold(mut self, bytes: usize) -> Self {
        self.literal_cache_threshold = bytes;
        self
    }

    pub fn with_mode(mut self, mode: CompileMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_embedded(mut self, embedded: bool) -> Self {
        self.embedded = embedded;
        self
    }

    /// The name `__FILE__` folds to.
    pub fn file_label(&self) -> &str {
        self.file_name.as_deref().unwrap_or("[MEMORY]")
    }

    /// The name `__DIR__` folds to.
    pub fn dir_label(&self) -> String {
        match &self.file_name {
            None => "[MEMORY]".to_owned(),
            Some(name) => match std::path::Path::new(name).parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_string_lossy().into_owned(),
                _ => ".".to_owned(),
            },
        }
    }
}

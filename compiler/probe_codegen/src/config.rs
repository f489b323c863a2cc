//! Code generation settings.

/// Settings consumed by code generation, owned by the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodegenConfig {
    /// Length of `mem`/`str` results when no length is given.
    pub string_size: usize,
    /// Largest stack frame a probe body may use, in bytes.
    pub max_stack: usize,
    /// Abort the probe when a raw read or map update reports failure.
    pub check_helper_status: bool,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            string_size: 128,
            max_stack: 512,
            check_helper_status: true,
        }
    }
}

impl CodegenConfig {
    #[must_use]
    pub fn with_string_size(mut self, size: usize) -> Self {
        self.string_size = size;
        self
    }

    #[must_use]
    pub fn with_max_stack(mut self, bytes: usize) -> Self {
        self.max_stack = bytes;
        self
    }

    #[must_use]
    pub fn with_helper_status_checks(mut self, enabled: bool) -> Self {
        self.check_helper_status = enabled;
        self
    }
}

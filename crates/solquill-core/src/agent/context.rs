//! Per-connection edit context.
//!
//! Tracks which file the user is working on and its latest content so that
//! fenced blocks in a reply edit that file instead of creating new ones.

use solquill_types::frame::RequestContext;

use crate::file::canonical_name;

#[derive(Debug, Clone, Default)]
pub struct EditContext {
    current_file: Option<String>,
    current_code: Option<String>,
    file_system: serde_json::Value,
}

impl EditContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt the editor state sent with a frame. Only applies when the frame
    /// names a current file; code and file system are kept otherwise.
    pub fn refresh(&mut self, request: &RequestContext) {
        let Some(file) = request.current_file.as_deref().filter(|f| !f.trim().is_empty()) else {
            return;
        };
        self.current_file = Some(file.to_string());
        if let Some(code) = &request.current_code {
            self.current_code = Some(code.clone());
        }
        if !request.file_system.is_null() {
            self.file_system = request.file_system.clone();
        }
    }

    /// An edit was applied: later blocks compose on the written content.
    pub fn record_edit(&mut self, path: &str, content: &str) {
        self.current_file = Some(path.to_string());
        self.current_code = Some(content.to_string());
    }

    /// Stop editing `path` if it is the current file.
    pub fn forget(&mut self, path: &str) {
        let is_current = self
            .current_file
            .as_deref()
            .is_some_and(|f| canonical_name(f) == canonical_name(path));
        if is_current {
            self.current_file = None;
            self.current_code = None;
        }
    }

    /// Path that fenced blocks should edit, if any.
    pub fn editing_target(&self) -> Option<&str> {
        self.current_file.as_deref()
    }

    pub fn current_code(&self) -> Option<&str> {
        self.current_code.as_deref()
    }

    pub fn file_system(&self) -> &serde_json::Value {
        &self.file_system
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(file: Option<&str>, code: Option<&str>) -> RequestContext {
        RequestContext {
            current_file: file.map(str::to_string),
            current_code: code.map(str::to_string),
            file_system: json!({"contracts": {}}),
        }
    }

    #[test]
    fn test_refresh_requires_current_file() {
        let mut ctx = EditContext::new();
        ctx.refresh(&request(None, Some("contract A {}")));
        assert!(ctx.editing_target().is_none());
        assert!(ctx.current_code().is_none());

        ctx.refresh(&request(Some("contracts/A.sol"), Some("contract A {}")));
        assert_eq!(ctx.editing_target(), Some("contracts/A.sol"));
        assert_eq!(ctx.current_code(), Some("contract A {}"));
        assert!(ctx.file_system().is_object());
    }

    #[test]
    fn test_refresh_keeps_code_when_absent() {
        let mut ctx = EditContext::new();
        ctx.refresh(&request(Some("A.sol"), Some("v1")));
        ctx.refresh(&request(Some("A.sol"), None));
        assert_eq!(ctx.current_code(), Some("v1"));
    }

    #[test]
    fn test_record_edit_and_forget() {
        let mut ctx = EditContext::new();
        ctx.record_edit("contracts/A.sol", "contract A { uint x; }");
        assert_eq!(ctx.current_code(), Some("contract A { uint x; }"));

        ctx.forget("B.sol");
        assert!(ctx.editing_target().is_some());

        ctx.forget("A_old.sol");
        assert!(ctx.editing_target().is_none());
        assert!(ctx.current_code().is_none());
    }
}

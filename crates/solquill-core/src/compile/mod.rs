//! Compiler port: checks a contract and reports diagnostics.
//!
//! Same blanket-impl pattern as [`crate::llm::BoxLlmProvider`]: the RPITIT
//! `Compiler` trait is erased through `CompilerDyn` so the server can pick an
//! implementation at startup.

use std::future::Future;
use std::pin::Pin;

use solquill_types::compile::CompilationResult;
use solquill_types::error::CompileError;

/// Trait for compilation backends.
///
/// Implementations live in solquill-infra (e.g., `SolcCompiler`). A failing
/// build is a successful call returning `success == false`; `Err` means the
/// compiler could not be run at all.
pub trait Compiler: Send + Sync {
    fn compile(
        &self,
        path: &str,
        source: &str,
    ) -> impl Future<Output = Result<CompilationResult, CompileError>> + Send;
}

/// Object-safe version of [`Compiler`] with boxed futures.
pub trait CompilerDyn: Send + Sync {
    fn compile_boxed<'a>(
        &'a self,
        path: &'a str,
        source: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CompilationResult, CompileError>> + Send + 'a>>;
}

impl<T: Compiler> CompilerDyn for T {
    fn compile_boxed<'a>(
        &'a self,
        path: &'a str,
        source: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CompilationResult, CompileError>> + Send + 'a>> {
        Box::pin(self.compile(path, source))
    }
}

/// Type-erased compiler.
pub struct BoxCompiler {
    inner: Box<dyn CompilerDyn + Send + Sync>,
}

impl BoxCompiler {
    pub fn new<T: Compiler + 'static>(compiler: T) -> Self {
        Self {
            inner: Box::new(compiler),
        }
    }

    pub async fn compile(&self, path: &str, source: &str) -> Result<CompilationResult, CompileError> {
        self.inner.compile_boxed(path, source).await
    }
}

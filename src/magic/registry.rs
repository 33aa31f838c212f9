// src/magic/registry.rs

//! Explicit registration and dispatch of cell magics.
//!
//! Nothing registers itself: the binary builds one registry at startup,
//! registers the magics it wants, and dispatches every cell through it.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::errors::{CellError, Result};
use crate::exec::OutputSink;
use crate::magic::cell::split_cell;
use crate::session::CellOutcome;

/// A handler for one `%%<name>` annotation.
///
/// `line` is the rest of the annotation line and `body` the code below it.
/// Output meant for the user goes to `sink`.
pub trait CellMagic: Send + Sync {
    fn run<'a>(
        &'a self,
        line: &'a str,
        body: &'a str,
        sink: &'a mut OutputSink,
    ) -> Pin<Box<dyn Future<Output = Result<CellOutcome>> + Send + 'a>>;
}

/// Name → handler table.
#[derive(Default, Clone)]
pub struct CellMagicRegistry {
    magics: BTreeMap<String, Arc<dyn CellMagic>>,
}

impl CellMagicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `magic` under `name` (without the `%%` prefix).
    pub fn register(&mut self, name: &str, magic: Arc<dyn CellMagic>) -> Result<()> {
        if self.magics.contains_key(name) {
            return Err(CellError::DuplicateMagic(name.to_string()));
        }
        debug!(magic = %name, "registered cell magic");
        self.magics.insert(name.to_string(), magic);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.magics.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.magics.contains_key(name)
    }

    /// Split `cell` and hand it to the magic named on its first line.
    pub async fn dispatch(&self, cell: &str, sink: &mut OutputSink) -> Result<CellOutcome> {
        let parsed = split_cell(cell)?;
        let magic = self
            .magics
            .get(parsed.magic)
            .cloned()
            .ok_or_else(|| CellError::UnknownMagic(parsed.magic.to_string()))?;

        debug!(magic = %parsed.magic, line = %parsed.line, "dispatching cell");
        magic.run(parsed.line, parsed.body, sink).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::io::AsyncWriteExt;

    use super::*;
    use crate::exec::command::CommandLine;

    /// Records what it was called with and echoes the body.
    #[derive(Default)]
    struct EchoMagic {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl CellMagic for EchoMagic {
        fn run<'a>(
            &'a self,
            line: &'a str,
            body: &'a str,
            sink: &'a mut OutputSink,
        ) -> Pin<Box<dyn Future<Output = Result<CellOutcome>> + Send + 'a>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push((line.to_string(), body.to_string()));
                sink.write_all(body.as_bytes()).await?;
                Ok(CellOutcome::DryRun(CommandLine::new("echo", Vec::<String>::new())))
            })
        }
    }

    #[tokio::test]
    async fn dispatches_to_registered_magic() {
        let echo = Arc::new(EchoMagic::default());
        let mut registry = CellMagicRegistry::new();
        registry.register("echo", echo.clone()).unwrap();

        let mut out: Vec<u8> = Vec::new();
        registry
            .dispatch("%%echo -np 2\nhello\n", &mut out)
            .await
            .unwrap();

        assert_eq!(out, b"hello\n");
        let calls = echo.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("-np 2".to_string(), "hello\n".to_string())]);
    }

    #[tokio::test]
    async fn unknown_magic_is_an_error() {
        let registry = CellMagicRegistry::new();
        let mut out: Vec<u8> = Vec::new();
        let err = registry.dispatch("%%fenicsx\nx=1", &mut out).await.unwrap_err();
        assert!(matches!(err, CellError::UnknownMagic(name) if name == "fenicsx"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = CellMagicRegistry::new();
        registry.register("echo", Arc::new(EchoMagic::default())).unwrap();
        let err = registry
            .register("echo", Arc::new(EchoMagic::default()))
            .unwrap_err();
        assert!(matches!(err, CellError::DuplicateMagic(_)));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["echo"]);
    }
}

//! The built-in layout engine used by pool workers.

use std::sync::Arc;

use crate::error::EngineError;
use crate::models::PrintOptions;
use crate::services::worker::{EngineLauncher, RenderEngine, SettleReport};

use super::markup::{parse, ParsedDocument};
use super::paginate::{paginate, PageFrame};
use super::pdf_writer::write_pdf;

/// Parses HTML or plain text and lays it out with base-14 fonts.
#[derive(Debug, Default)]
pub struct LayoutEngine {
    content: Option<Arc<str>>,
    parsed: Option<ParsedDocument>,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderEngine for LayoutEngine {
    fn load(&mut self, content: Arc<str>) -> Result<(), EngineError> {
        self.content = Some(content);
        self.parsed = None;
        Ok(())
    }

    fn settle(&mut self) -> Result<SettleReport, EngineError> {
        let content = self
            .content
            .as_deref()
            .ok_or_else(|| EngineError::Content("no content loaded".to_string()))?;
        let parsed = parse(content);
        let report = SettleReport {
            blocks: parsed.blocks.len(),
        };
        self.parsed = Some(parsed);
        Ok(report)
    }

    fn print(&mut self, options: &PrintOptions) -> Result<Vec<u8>, EngineError> {
        let parsed = self
            .parsed
            .as_ref()
            .ok_or_else(|| EngineError::Content("content has not settled".to_string()))?;
        let frame = PageFrame::new(options)?;
        let pages = paginate(parsed, options)?;
        write_pdf(&pages, &frame, options, parsed.display_title())
    }

    fn close(&mut self) {
        self.content = None;
        self.parsed = None;
    }
}

/// Launches a [`LayoutEngine`] per worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngineLauncher;

impl EngineLauncher for LayoutEngineLauncher {
    fn launch(&self, worker_id: usize) -> Result<Box<dyn RenderEngine>, EngineError> {
        tracing::debug!(worker_id, "Launching layout engine");
        Ok(Box::new(LayoutEngine::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_settle_print() {
        let mut engine = LayoutEngine::new();
        engine
            .load(Arc::from("<h1>Title</h1><p>Body</p>"))
            .unwrap();
        let report = engine.settle().unwrap();
        assert_eq!(report.blocks, 2);

        let bytes = engine.print(&PrintOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_print_before_settle_is_content_error() {
        let mut engine = LayoutEngine::new();
        engine.load(Arc::from("text")).unwrap();
        assert!(matches!(
            engine.print(&PrintOptions::default()),
            Err(EngineError::Content(_))
        ));
    }

    #[test]
    fn test_settle_without_content() {
        let mut engine = LayoutEngine::new();
        assert!(matches!(engine.settle(), Err(EngineError::Content(_))));
    }

    #[test]
    fn test_load_discards_previous_layout() {
        let mut engine = LayoutEngine::new();
        engine.load(Arc::from("first")).unwrap();
        engine.settle().unwrap();
        engine.load(Arc::from("second")).unwrap();
        assert!(engine.print(&PrintOptions::default()).is_err());
    }
}

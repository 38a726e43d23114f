//! External code event API
//!
//! Lets an embedder observe code creation and relocation through plain
//! [`ApiCodeEvent`] values. Starting to listen first replays the code that
//! already exists (when a heap view is supplied), then registers with the
//! [`Logger`] so later events arrive live.

use std::sync::Arc;

use super::existing_code::{CodeHeap, ExistingCodeLogger};
use crate::domain::{Address, CodeEventType, CodeObject, CodeTag, Name};
use crate::events::{CodeOrigin, EventRecord, LogEvent, LogEventListener, Logger};

/// A code event as seen by the embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCodeEvent {
    pub code_start_address: Address,
    pub code_size: u32,
    pub function_name: String,
    pub script_name: String,
    pub script_line: i32,
    pub script_column: i32,
    pub code_type: CodeEventType,
    pub comment: String,
    /// Old start address, for relocations only
    pub previous_code_start_address: Address,
}

impl ApiCodeEvent {
    fn for_code(code: &CodeObject<'_>, code_type: CodeEventType) -> Self {
        Self {
            code_start_address: code.start,
            code_size: code.size,
            function_name: String::new(),
            script_name: String::new(),
            script_line: 0,
            script_column: 0,
            code_type,
            comment: String::new(),
            previous_code_start_address: Address::NULL,
        }
    }
}

/// Embedder-side receiver of [`ApiCodeEvent`]s.
pub trait CodeEventHandler: Send + Sync {
    fn handle(&self, event: &ApiCodeEvent);
}

/// Symbols become `[description]`, or nothing when they have none.
fn to_function_name(name: &Name<'_>) -> String {
    match name {
        Name::String(s) => (*s).to_string(),
        Name::Symbol { description: Some(description), .. } => format!("[{description}]"),
        Name::Symbol { description: None, .. } => String::new(),
    }
}

/// Listener half: translates records into API events.
struct ApiEventTranslator {
    handler: Arc<dyn CodeEventHandler>,
}

impl ApiEventTranslator {
    fn code_create_event(&self, tag: CodeTag, code: &CodeObject<'_>, origin: &CodeOrigin<'_>) {
        let mut event = ApiCodeEvent::for_code(code, tag.event_type());
        match origin {
            CodeOrigin::Comment(comment) => event.comment = (*comment).to_string(),
            CodeOrigin::Name(name) => event.function_name = to_function_name(name),
            CodeOrigin::Script { script_name, .. } => event.function_name = to_function_name(script_name),
            CodeOrigin::Function { shared, script_name, line, column } => {
                event.function_name = shared.debug_name.to_string();
                event.script_name = to_function_name(script_name);
                event.script_line = *line;
                event.script_column = *column;
            }
        }
        self.handler.handle(&event);
    }
}

impl LogEventListener for ApiEventTranslator {
    fn handle(&self, record: &EventRecord<'_>) {
        match &record.event {
            LogEvent::CodeCreate { tag, code, origin } => self.code_create_event(*tag, code, origin),
            LogEvent::RegExpCodeCreate { code, source } => {
                let mut event = ApiCodeEvent::for_code(code, CodeEventType::RegExp);
                event.function_name = (*source).to_string();
                self.handler.handle(&event);
            }
            LogEvent::CodeMove { from, to } => {
                let mut event = ApiCodeEvent::for_code(to, CodeEventType::Relocation);
                event.previous_code_start_address = *from;
                self.handler.handle(&event);
            }
            // Wasm code is not reported through this API.
            _ => {}
        }
    }
}

/// Controller owning the registration of one external handler.
pub struct ExternalLogEventListener {
    logger: Arc<Logger>,
    active: Option<Arc<dyn LogEventListener>>,
}

impl ExternalLogEventListener {
    #[must_use]
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger, active: None }
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.active.is_some()
    }

    /// Replay `existing` code to `handler`, then register for live events.
    ///
    /// Returns false when already listening or when the registry refuses the
    /// listener (it has been shut down).
    pub fn start_listening(&mut self, handler: Arc<dyn CodeEventHandler>, existing: Option<&dyn CodeHeap>) -> bool {
        if self.active.is_some() {
            return false;
        }
        let translator: Arc<dyn LogEventListener> = Arc::new(ApiEventTranslator { handler });
        if let Some(heap) = existing {
            let replay = ExistingCodeLogger::to_listener(heap, translator.as_ref(), self.logger.clock());
            replay.log_all();
        }
        if !self.logger.add_listener(translator.clone()) {
            return false;
        }
        log::debug!("External code event handler registered");
        self.active = Some(translator);
        true
    }

    pub fn stop_listening(&mut self) {
        if let Some(translator) = self.active.take() {
            self.logger.remove_listener(&translator);
            log::debug!("External code event handler removed");
        }
    }
}

impl Drop for ExternalLogEventListener {
    fn drop(&mut self) {
        self.stop_listening();
    }
}

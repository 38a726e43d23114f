//! Listener broadcast registry
//!
//! Fans every event out to all registered listeners, in registration order,
//! synchronously on the caller's thread. Nothing is queued.
//!
//! Producers should check [`Logger::is_listening_to_code_events`] before
//! building names or looking up source positions; every dispatch method also
//! early-returns on its own, so forgetting the check costs only the work done
//! to build the arguments.
//!
//! The listener list stays read-locked while listeners run. A listener must
//! not add or remove listeners, or dispatch, on the registry that is calling
//! it; debug builds assert this.

#[cfg(debug_assertions)]
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use super::{CodeOrigin, EventRecord, LogClock, LogEvent, LogEventListener};
use crate::domain::{
    Address, CallbackKind, CodeObject, CodeTag, DeoptInfo, Name, SharedInfo, WasmCode,
};
use crate::profiling::TickSample;

#[cfg(debug_assertions)]
thread_local! {
    /// Address of the registry whose listeners this thread is running.
    static DISPATCHING: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as inside [`Logger::dispatch`] until dropped.
#[cfg(debug_assertions)]
struct DispatchMark {
    previous: usize,
}

#[cfg(debug_assertions)]
impl DispatchMark {
    fn enter(logger: &Logger) -> Self {
        Self { previous: DISPATCHING.with(|current| current.replace(logger.key())) }
    }
}

#[cfg(debug_assertions)]
impl Drop for DispatchMark {
    fn drop(&mut self) {
        DISPATCHING.with(|current| current.set(self.previous));
    }
}

pub struct Logger {
    listeners: RwLock<Vec<Arc<dyn LogEventListener>>>,
    /// True while at least one listener is registered
    has_listeners: AtomicBool,
    /// True while at least one registered listener wants code events
    listening_to_code: AtomicBool,
    shut_down: AtomicBool,
    clock: Arc<LogClock>,
}

impl Logger {
    #[must_use]
    pub fn new(clock: Arc<LogClock>) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            has_listeners: AtomicBool::new(false),
            listening_to_code: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            clock,
        }
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<LogClock> {
        &self.clock
    }

    /// Register a listener.
    ///
    /// Returns false if the same listener is already registered or the
    /// registry has been shut down.
    pub fn add_listener(&self, listener: Arc<dyn LogEventListener>) -> bool {
        self.debug_assert_not_dispatching("add_listener");
        if self.shut_down.load(Ordering::Acquire) {
            return false;
        }
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        if listeners.iter().any(|existing| same_listener(existing, &listener)) {
            return false;
        }
        listeners.push(listener);
        self.refresh_flags(&listeners);
        true
    }

    /// Unregister a listener. Returns false if it was not registered.
    ///
    /// A listener must be removed before the resources it writes to are
    /// released.
    pub fn remove_listener(&self, listener: &Arc<dyn LogEventListener>) -> bool {
        self.debug_assert_not_dispatching("remove_listener");
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|existing| !same_listener(existing, listener));
        let removed = listeners.len() != before;
        self.refresh_flags(&listeners);
        removed
    }

    /// Remove every listener and refuse new ones.
    pub fn shut_down(&self) {
        self.debug_assert_not_dispatching("shut_down");
        self.shut_down.store(true, Ordering::Release);
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        debug!("Shutting down registry with {} listener(s)", listeners.len());
        listeners.clear();
        self.refresh_flags(&listeners);
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn has_listener(&self, listener: &Arc<dyn LogEventListener>) -> bool {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        listeners.iter().any(|existing| same_listener(existing, listener))
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Fast check for producers: skip building names when nobody cares.
    #[must_use]
    pub fn is_listening_to_code_events(&self) -> bool {
        self.listening_to_code.load(Ordering::Relaxed)
    }

    #[cfg(debug_assertions)]
    fn key(&self) -> usize {
        std::ptr::from_ref(self) as usize
    }

    /// Registry changes from inside a listener would wait on the read lock
    /// the dispatch holds.
    #[allow(clippy::unused_self)]
    fn debug_assert_not_dispatching(&self, operation: &str) {
        #[cfg(debug_assertions)]
        DISPATCHING.with(|current| {
            debug_assert!(
                current.get() != self.key(),
                "{operation} called from a listener of the same registry"
            );
        });
        #[cfg(not(debug_assertions))]
        let _ = operation;
    }

    fn refresh_flags(&self, listeners: &[Arc<dyn LogEventListener>]) {
        self.has_listeners.store(!listeners.is_empty(), Ordering::Relaxed);
        let code = listeners.iter().any(|l| l.is_listening_to_code_events());
        self.listening_to_code.store(code, Ordering::Relaxed);
    }

    /// Timestamp `event` and hand it to every listener in registration order.
    pub fn dispatch(&self, event: LogEvent<'_>) {
        let wanted = if event.is_code_event() {
            self.is_listening_to_code_events()
        } else {
            self.has_listeners.load(Ordering::Relaxed)
        };
        if !wanted {
            return;
        }
        self.debug_assert_not_dispatching("dispatch");
        let record = EventRecord { time_us: self.clock.now_us(), event };
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        #[cfg(debug_assertions)]
        let _mark = DispatchMark::enter(self);
        for listener in listeners.iter() {
            listener.handle(&record);
        }
    }

    // ------------------------------------------------------------------
    // Producer entry points
    // ------------------------------------------------------------------

    pub fn code_create_event(&self, tag: CodeTag, code: CodeObject<'_>, origin: CodeOrigin<'_>) {
        self.dispatch(LogEvent::CodeCreate { tag, code, origin });
    }

    /// Builtin, stub or handler described by a fixed comment.
    pub fn code_create_comment_event(&self, tag: CodeTag, code: CodeObject<'_>, comment: &str) {
        self.code_create_event(tag, code, CodeOrigin::Comment(comment));
    }

    pub fn code_create_name_event(&self, tag: CodeTag, code: CodeObject<'_>, name: Name<'_>) {
        self.code_create_event(tag, code, CodeOrigin::Name(name));
    }

    pub fn code_create_script_event(
        &self,
        tag: CodeTag,
        code: CodeObject<'_>,
        shared: SharedInfo<'_>,
        script_name: Name<'_>,
    ) {
        self.code_create_event(tag, code, CodeOrigin::Script { shared, script_name });
    }

    pub fn code_create_function_event(
        &self,
        tag: CodeTag,
        code: CodeObject<'_>,
        shared: SharedInfo<'_>,
        script_name: Name<'_>,
        line: i32,
        column: i32,
    ) {
        self.code_create_event(
            tag,
            code,
            CodeOrigin::Function { shared, script_name, line, column },
        );
    }

    pub fn wasm_code_create_event(
        &self,
        tag: CodeTag,
        code: WasmCode<'_>,
        name: &str,
        source_url: Option<&str>,
        code_offset: i32,
        script_id: i32,
    ) {
        self.dispatch(LogEvent::WasmCodeCreate {
            tag,
            code,
            name,
            source_url,
            code_offset,
            script_id,
        });
    }

    pub fn regexp_code_create_event(&self, code: CodeObject<'_>, source: &str) {
        self.dispatch(LogEvent::RegExpCodeCreate { code, source });
    }

    pub fn callback_event(&self, name: Name<'_>, entry_point: Address) {
        self.dispatch(LogEvent::Callback { kind: CallbackKind::Plain, name, entry_point });
    }

    pub fn getter_callback_event(&self, name: Name<'_>, entry_point: Address) {
        self.dispatch(LogEvent::Callback { kind: CallbackKind::Getter, name, entry_point });
    }

    pub fn setter_callback_event(&self, name: Name<'_>, entry_point: Address) {
        self.dispatch(LogEvent::Callback { kind: CallbackKind::Setter, name, entry_point });
    }

    pub fn code_move_event(&self, from: Address, to: CodeObject<'_>) {
        self.dispatch(LogEvent::CodeMove { from, to });
    }

    pub fn shared_function_info_move_event(&self, from: Address, to: Address) {
        self.dispatch(LogEvent::SharedFunctionInfoMove { from, to });
    }

    pub fn code_disable_opt_event(&self, code: CodeObject<'_>, shared: SharedInfo<'_>) {
        self.dispatch(LogEvent::CodeDisableOpt { code, shared });
    }

    pub fn code_deopt_event(&self, code: CodeObject<'_>, info: DeoptInfo<'_>) {
        self.dispatch(LogEvent::CodeDeopt { code, info });
    }

    pub fn code_moving_gc_event(&self) {
        self.dispatch(LogEvent::CodeMovingGc);
    }

    pub fn snapshot_code_name_event(&self, address: Address, position: i32, name: &str) {
        self.dispatch(LogEvent::SnapshotCodeName { address, position, name });
    }

    pub fn tick_event(&self, sample: &TickSample, overflow: bool) {
        self.dispatch(LogEvent::Tick { sample, overflow });
    }
}

/// Listener identity is the allocation, not the vtable.
fn same_listener(a: &Arc<dyn LogEventListener>, b: &Arc<dyn LogEventListener>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CodeKind;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<(&'static str, u64)>>,
        code_events: bool,
    }

    impl LogEventListener for Recording {
        fn handle(&self, record: &EventRecord<'_>) {
            self.seen.lock().unwrap().push((record.event.name(), record.time_us));
        }

        fn is_listening_to_code_events(&self) -> bool {
            self.code_events
        }
    }

    fn recording(code_events: bool) -> Arc<Recording> {
        Arc::new(Recording { seen: Mutex::default(), code_events })
    }

    fn logger() -> Logger {
        Logger::new(Arc::new(LogClock::new(true)))
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let logger = logger();
        let listener: Arc<dyn LogEventListener> = recording(true);
        assert!(logger.add_listener(listener.clone()));
        assert!(!logger.add_listener(listener.clone()));
        assert_eq!(logger.listener_count(), 1);
        assert!(logger.remove_listener(&listener));
        assert!(!logger.remove_listener(&listener));
    }

    #[test]
    fn test_interest_flag_tracks_listeners() {
        let logger = logger();
        assert!(!logger.is_listening_to_code_events());

        let ticks_only: Arc<dyn LogEventListener> = recording(false);
        logger.add_listener(ticks_only.clone());
        assert!(!logger.is_listening_to_code_events());

        let code: Arc<dyn LogEventListener> = recording(true);
        logger.add_listener(code.clone());
        assert!(logger.is_listening_to_code_events());

        logger.remove_listener(&code);
        assert!(!logger.is_listening_to_code_events());
    }

    #[test]
    fn test_code_events_skip_listeners_without_interest_flag() {
        let logger = logger();
        let ticks_only = recording(false);
        logger.add_listener(ticks_only.clone());

        logger.code_moving_gc_event();
        let sample = TickSample::new();
        logger.tick_event(&sample, false);

        let seen = ticks_only.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "tick");
    }

    #[test]
    fn test_dispatch_order_and_timestamps() {
        let logger = logger();
        let first = recording(true);
        let second = recording(true);
        logger.add_listener(first.clone());
        logger.add_listener(second.clone());

        let code = CodeObject::new(Address(0x100), 16, CodeKind::Builtin);
        logger.code_create_comment_event(CodeTag::Builtin, code, "Abort");
        logger.code_move_event(Address(0x100), CodeObject::new(Address(0x200), 16, CodeKind::Builtin));

        let expected = vec![("code-creation", 1000), ("code-move", 2000)];
        assert_eq!(*first.seen.lock().unwrap(), expected);
        assert_eq!(*second.seen.lock().unwrap(), expected);
    }

    #[test]
    fn test_no_listener_dispatch_does_not_read_clock() {
        let logger = logger();
        logger.code_moving_gc_event();
        assert_eq!(logger.clock().now_us(), 1000);
    }

    #[test]
    fn test_shut_down_refuses_new_listeners() {
        let logger = logger();
        logger.add_listener(recording(true));
        logger.shut_down();
        assert!(logger.is_shut_down());
        assert_eq!(logger.listener_count(), 0);
        assert!(!logger.add_listener(recording(true)));
        assert!(!logger.is_listening_to_code_events());
    }

    /// Forwards every record as a GC event into `target`, or tries to
    /// register a listener with it.
    struct Forwarding {
        target: Arc<Logger>,
        register: bool,
    }

    impl LogEventListener for Forwarding {
        fn handle(&self, _record: &EventRecord<'_>) {
            if self.register {
                self.target.add_listener(recording(true));
            } else {
                self.target.code_moving_gc_event();
            }
        }
    }

    #[test]
    fn test_listener_may_dispatch_into_another_registry() {
        let source = logger();
        let target = Arc::new(logger());
        let sink = recording(true);
        target.add_listener(sink.clone());
        source.add_listener(Arc::new(Forwarding { target: Arc::clone(&target), register: false }));

        source.code_moving_gc_event();
        source.code_moving_gc_event();
        assert_eq!(sink.seen.lock().unwrap().len(), 2);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "add_listener called from a listener of the same registry")]
    fn test_registering_from_own_listener_is_rejected() {
        let registry = Arc::new(logger());
        registry.add_listener(Arc::new(Forwarding { target: Arc::clone(&registry), register: true }));
        registry.code_moving_gc_event();
    }
}

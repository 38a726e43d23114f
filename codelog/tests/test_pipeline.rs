use std::fs;
use std::sync::{Arc, Mutex};
use std::thread;

use codelog::config::LogConfig;
use codelog::domain::{Address, CodeKind, CodeObject, CodeTag, Name};
use codelog::events::{EventRecord, LogClock, LogEvent, LogEventListener, Logger};
use codelog::listeners::name_buffer::NAME_BUFFER_CAPACITY;
use codelog::listeners::PerfMapFile;
use codelog::profiling::{Profiler, SampleRing, TickSample, Ticker};
use codelog::session::{LogSession, SessionResources};

/// Keeps (time, event name, address) of every record.
#[derive(Default)]
struct Journal(Mutex<Vec<(u64, &'static str, u64)>>);

impl LogEventListener for Journal {
    fn handle(&self, record: &EventRecord<'_>) {
        let address = match &record.event {
            LogEvent::CodeCreate { code, .. } => code.start.0,
            LogEvent::CodeMove { from, .. } => from.0,
            LogEvent::Tick { sample, .. } => sample.pc.0,
            _ => 0,
        };
        self.0.lock().unwrap().push((record.time_us, record.event.name(), address));
    }
}

fn predictable_logger() -> Arc<Logger> {
    Arc::new(Logger::new(Arc::new(LogClock::new(true))))
}

#[test]
fn test_every_listener_sees_the_same_ordered_records() {
    let logger = predictable_logger();
    let first = Arc::new(Journal::default());
    let second = Arc::new(Journal::default());
    assert!(logger.add_listener(first.clone()));
    assert!(logger.add_listener(second.clone()));
    assert!(!logger.add_listener(first.clone()));

    let code = CodeObject::new(Address(0x1000), 16, CodeKind::Builtin);
    logger.code_create_comment_event(CodeTag::Builtin, code, "A");
    logger.code_move_event(Address(0x1000), CodeObject::new(Address(0x2000), 16, CodeKind::Builtin));
    let mut sample = TickSample::new();
    sample.pc = Address(0x2004);
    logger.tick_event(&sample, false);

    let expected = vec![(1000, "code-creation", 0x1000), (2000, "code-move", 0x1000), (3000, "tick", 0x2004)];
    assert_eq!(*first.0.lock().unwrap(), expected);
    assert_eq!(*second.0.lock().unwrap(), expected);
}

#[test]
fn test_long_names_truncate_in_perf_map() {
    let dir = tempfile::tempdir().unwrap();
    let map = PerfMapFile::at(dir.path().join("perf-test.map"));
    let config = LogConfig { perf_basic_prof: true, ..LogConfig::default() };
    let session = LogSession::set_up(
        config,
        SessionResources { perf_map: Some(Arc::clone(&map)), ..SessionResources::default() },
    );

    let long_name = "n".repeat(10_000);
    let code = CodeObject::new(Address(0xabc0), 32, CodeKind::Builtin);
    session.logger().code_create_name_event(CodeTag::Builtin, code, Name::from(long_name.as_str()));
    drop(session);
    assert!(!map.is_open());

    let contents = fs::read_to_string(map.path()).unwrap();
    let line = contents.lines().next().unwrap();
    let name = line.strip_prefix("abc0 20 ").unwrap();
    assert!(name.starts_with("Builtin:nnn"));
    assert!(name.len() <= NAME_BUFFER_CAPACITY);
}

#[test]
fn test_perf_map_shared_between_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let map = PerfMapFile::at(dir.path().join("perf-shared.map"));
    let config = LogConfig { perf_basic_prof: true, ..LogConfig::default() };
    let resources = || SessionResources { perf_map: Some(Arc::clone(&map)), ..SessionResources::default() };

    let mut first = LogSession::set_up(config.clone(), resources());
    let second = LogSession::set_up(config, resources());
    assert_eq!(map.ref_count(), 2);

    let code = CodeObject::new(Address(0x10), 1, CodeKind::Builtin);
    first.logger().code_create_comment_event(CodeTag::Builtin, code, "one");
    first.tear_down().unwrap();
    assert!(map.is_open());
    second.logger().code_create_comment_event(CodeTag::Builtin, code, "two");
    drop(second);
    assert!(!map.is_open());

    let contents = fs::read_to_string(map.path()).unwrap();
    assert_eq!(contents, "10 1 Builtin:one\n10 1 Builtin:two\n");
}

#[test]
fn test_ring_overflow_is_reported_once() {
    let ring = SampleRing::with_capacity(4);
    let mut accepted = 0;
    for pc in 0..6 {
        let mut sample = TickSample::new();
        sample.pc = Address(pc);
        if ring.try_insert(sample) {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 4);
    let flags: Vec<bool> = (0..4).map(|_| ring.remove().unwrap().1).collect();
    assert_eq!(flags, vec![true, false, false, false]);
}

#[test]
fn test_disengage_returns_with_busy_sampler() {
    let logger = predictable_logger();
    let journal = Arc::new(Journal::default());
    logger.add_listener(journal.clone());
    let ticker = Arc::new(Ticker::new(
        Box::new(|sample: &mut TickSample| {
            sample.pc = Address(0x42);
            true
        }),
        50,
    ));
    let profiler = Profiler::new(Arc::clone(&logger), None, ticker);
    profiler.engage().unwrap();
    thread::sleep(std::time::Duration::from_millis(20));
    profiler.disengage();

    let seen = journal.0.lock().unwrap().len();
    assert!(seen > 0);
    thread::sleep(std::time::Duration::from_millis(5));
    assert_eq!(journal.0.lock().unwrap().len(), seen);
}

#[test]
fn test_concurrent_writers_produce_whole_lines() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("code.log");
    let config = LogConfig {
        log_code: true,
        logfile: log_path.display().to_string(),
        ..LogConfig::default()
    };
    let mut session = LogSession::set_up(config, SessionResources::default());
    let logger = Arc::clone(session.logger());

    let long_name = Arc::new("x".repeat(10_000));
    let writers: Vec<_> = (0..4u64)
        .map(|writer| {
            let logger = Arc::clone(&logger);
            let long_name = Arc::clone(&long_name);
            thread::spawn(move || {
                for i in 0..50u64 {
                    let code = CodeObject::new(Address((writer << 20) | i), 8, CodeKind::Builtin);
                    if writer % 2 == 0 {
                        logger.code_create_comment_event(CodeTag::Builtin, code, &long_name);
                    } else {
                        logger.code_create_name_event(CodeTag::Builtin, code, Name::from(long_name.as_str()));
                    }
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    session.tear_down().unwrap();

    let contents = fs::read_to_string(&log_path).unwrap();
    assert!(contents.ends_with('\n'));
    let records: Vec<&str> = contents.lines().filter(|l| l.starts_with("code-creation,")).collect();
    assert_eq!(records.len(), 200);
    for record in records {
        let fields: Vec<&str> = record.split(',').collect();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[6], "x".repeat(NAME_BUFFER_CAPACITY));
        let header_len = record.len() - fields[6].len();
        assert!(header_len < 64, "header too long: {header_len}");
    }
}

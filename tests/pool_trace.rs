use esox_pooltrace::{
    filter_trace, format_trace, InstanceId, MemorySink, ObjectPool, PoolConfiguration, PoolEvent,
    PoolTracer, PooledObject, StackFrame, TraceConfig, Traced, TracedResource, FRAME_SEPARATOR,
};
use std::sync::Arc;

fn frames(count: usize) -> Vec<StackFrame> {
    (0..count)
        .map(|i| StackFrame::new(format!("com.example.app.Step{i}"), format!("m{i}"), i as u32 + 1))
        .collect()
}

fn dotted() -> TraceConfig {
    TraceConfig::new()
        .with_namespace_separator(".")
        .with_internal_package("com.example.pool")
}

#[inline(never)]
fn checkout_from_handler(pool: &Traced<ObjectPool<u32>>) -> TracedResource<PooledObject<u32>> {
    pool.acquire().unwrap()
}

#[inline(never)]
fn checkin_from_handler(conn: TracedResource<PooledObject<u32>>) {
    conn.release();
}

#[inline(never)]
fn checkin_by_scope(pool: &Traced<ObjectPool<u32>>) {
    let conn = pool.acquire().unwrap();
    assert_eq!(**conn, 10);
}

#[inline(never)]
fn checkin_by_drop(pool: &Traced<ObjectPool<u32>>) {
    let conn = pool.acquire().unwrap();
    drop(conn);
}

fn single_frame_pool() -> (Traced<ObjectPool<u32>>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let tracer = PoolTracer::new(TraceConfig::new().with_max_frames(1), sink.clone()).unwrap();
    let pool = Traced::new(ObjectPool::new(vec![10], PoolConfiguration::default()), tracer);
    (pool, sink)
}

#[test]
fn eight_frames_keep_indices_three_to_seven() {
    let raw = frames(8);
    let config = dotted().with_strip_qualifier(false).without_internal_exclusion();

    let filtered = filter_trace(&raw, &config);

    assert_eq!(filtered.len(), 5);
    assert_eq!(filtered.frames(), &raw[3..8]);
}

#[test]
fn internal_frames_are_skipped_without_using_slots() {
    let mut raw = frames(7);
    raw[3].qualified_name = "com.example.pool.PoolingDataSource".into();
    raw[4].qualified_name = "com.example.pool.GuardedConnection".into();

    let filtered = filter_trace(&raw, &dotted().with_max_frames(2));

    assert_eq!(format_trace(&filtered), "Step5.m5(6) > Step6.m6(7)");
}

#[test]
fn stripped_frame_renders_short_name() {
    let raw = vec![StackFrame::new("com.example.pool.Widget", "run", 42)];
    let config = dotted().with_skip_first(0).without_internal_exclusion();

    assert_eq!(format_trace(&filter_trace(&raw, &config)), "Widget.run(42)");
}

#[test]
fn two_frames_one_separator() {
    let raw = vec![StackFrame::new("A", "m1", 1), StackFrame::new("B", "m2", 2)];
    let line = format_trace(&filter_trace(&raw, &dotted().with_skip_first(0)));

    assert_eq!(line, "A.m1(1) > B.m2(2)");
    assert!(!line.starts_with(FRAME_SEPARATOR) && !line.ends_with(FRAME_SEPARATOR));
}

#[test]
fn empty_trace_renders_empty_line() {
    assert_eq!(format_trace(&filter_trace(&[], &dotted())), "");
}

#[test]
fn disabled_tracer_writes_nothing() {
    let sink = Arc::new(MemorySink::new());
    let tracer = PoolTracer::new(dotted().with_enabled(false), sink.clone()).unwrap();

    for id in 0..10 {
        tracer.record(PoolEvent::Acquire, InstanceId(id));
        tracer.record_with(PoolEvent::Release, InstanceId(id), &frames(8));
    }

    assert!(sink.is_empty());
}

#[test]
fn live_trace_starts_at_the_calling_function() {
    let (pool, sink) = single_frame_pool();

    let conn = checkout_from_handler(&pool);
    checkin_from_handler(conn);

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(
        lines[0].starts_with("acquire(0): pool_trace.checkout_from_handler("),
        "unexpected line {}",
        lines[0]
    );
    assert!(
        lines[1].starts_with("release(0): pool_trace.checkin_from_handler("),
        "unexpected line {}",
        lines[1]
    );
}

#[test]
fn release_at_end_of_scope_starts_at_the_owner() {
    let (pool, sink) = single_frame_pool();

    checkin_by_scope(&pool);

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(
        lines[1].starts_with("release(0): pool_trace.checkin_by_scope("),
        "unexpected line {}",
        lines[1]
    );
}

#[test]
fn explicit_drop_starts_at_the_owner() {
    let (pool, sink) = single_frame_pool();

    checkin_by_drop(&pool);

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(
        lines[1].starts_with("release(0): pool_trace.checkin_by_drop("),
        "unexpected line {}",
        lines[1]
    );
}

#[test]
fn lines_pair_by_instance_across_threads() {
    let sink = Arc::new(MemorySink::new());
    let tracer = PoolTracer::new(TraceConfig::default(), sink.clone()).unwrap();
    let pool = Arc::new(Traced::new(
        ObjectPool::new(vec![0u32, 1, 2, 3], PoolConfiguration::default()),
        tracer,
    ));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let pool = Arc::clone(&pool);
            scope.spawn(move || {
                for _ in 0..20 {
                    if let Ok(conn) = pool.acquire() {
                        drop(conn);
                    }
                }
            });
        }
    });

    let events = sink.events();
    let acquires = events.iter().filter(|e| e.kind == PoolEvent::Acquire).count();
    let releases = events.iter().filter(|e| e.kind == PoolEvent::Release).count();
    assert_eq!(acquires, releases);
    assert_eq!(pool.tracer().metrics().acquire_events as usize, acquires);
    assert_eq!(pool.inner().available_count(), 4);
}

//! Tracing acquire and release on a connection pool

use esox_pooltrace::{
    DynamicObjectPool, MemorySink, PoolConfiguration, PoolEvent, PoolTracer, StackFrame,
    StdoutSink, TraceConfig, Traced,
};
use std::sync::Arc;

#[derive(Debug)]
struct Connection {
    id: usize,
}

fn main() {
    println!("=== EsoxSolutions.PoolTrace - Traced Pool Examples ===\n");

    // Example 1: Trace lines on stdout
    stdout_tracing();

    // Example 2: Collect lines in memory and find the leak
    find_unreleased();

    // Example 3: Render a stack captured elsewhere
    render_foreign_stack();

    // Example 4: Tracing switched off
    switched_off();
}

fn stdout_tracing() {
    println!("1. Stdout Tracing:");
    let tracer = PoolTracer::new(TraceConfig::default(), Arc::new(StdoutSink)).unwrap();
    let pool = Traced::new(
        DynamicObjectPool::new(|| Connection { id: 1 }, PoolConfiguration::default()),
        tracer,
    );

    {
        let conn = pool.acquire().unwrap();
        println!("   Using connection {}", conn.id);
    }
    println!();
}

fn find_unreleased() {
    println!("2. Unreleased Instances:");
    let sink = Arc::new(MemorySink::new());
    let tracer = PoolTracer::new(TraceConfig::default(), sink.clone()).unwrap();
    let pool = Traced::new(
        DynamicObjectPool::new(|| Connection { id: 0 }, PoolConfiguration::new().with_max_pool_size(4)),
        tracer,
    );

    let kept = pool.acquire().unwrap();
    {
        let _short_lived = pool.acquire().unwrap();
    }

    // instances with an acquire line but no release line
    let events = sink.events();
    for acquire in events.iter().filter(|e| e.kind == PoolEvent::Acquire) {
        let released = events
            .iter()
            .any(|e| e.kind == PoolEvent::Release && e.instance == acquire.instance);
        if !released {
            println!("   Outstanding: {acquire}");
        }
    }
    drop(kept);
    println!();
}

fn render_foreign_stack() {
    println!("3. Rendering a Captured Stack:");
    let config = TraceConfig::new()
        .with_namespace_separator(".")
        .with_internal_package("com.example.pool");
    let tracer = PoolTracer::new(config, Arc::new(StdoutSink)).unwrap();

    let raw = vec![
        StackFrame::new("com.example.trace.StackCapture", "capture", 20),
        StackFrame::new("com.example.trace.ConnLogger", "onAcquire", 71),
        StackFrame::new("com.example.pool.PoolingDataSource", "getConnection", 134),
        StackFrame::new("com.example.pool.BasicDataSource", "getConnection", 153),
        StackFrame::new("com.shop.orders.OrderDao", "findOpen", 42),
        StackFrame::new("com.shop.web.OrderServlet", "doGet", 88),
    ];
    println!("   {}", tracer.render(&raw));
    println!();
}

fn switched_off() {
    println!("4. Switched Off:");
    let sink = Arc::new(MemorySink::new());
    let tracer = PoolTracer::new(TraceConfig::new().with_enabled(false), sink.clone()).unwrap();
    let pool = Traced::new(
        DynamicObjectPool::new(|| Connection { id: 7 }, PoolConfiguration::default()),
        tracer,
    );

    {
        let conn = pool.acquire().unwrap();
        println!("   Still pooled: {:?}", **conn);
    }
    println!("   Lines written: {}", sink.len());
}

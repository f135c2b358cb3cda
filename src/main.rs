// EsoxSolutions.PoolTrace
// Demo: a small "connection" pool with acquire/release tracing on stdout.
//
// Configure with POOLTRACE_* variables, e.g.
//   POOLTRACE_MAX_TRACE=3 cargo run
//   POOLTRACE_OFF=true cargo run
// Pass `--log` to route lines through `tracing` instead of stdout.

use esox_pooltrace::{
    DynamicObjectPool, EventSink, PoolConfiguration, PoolTracer, StdoutSink, TraceConfig, Traced,
    TracingSink,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;

struct Connection {
    session: usize,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    let config = match TraceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid trace configuration");
            return ExitCode::from(2);
        }
    };

    let sink: Arc<dyn EventSink> = if std::env::args().any(|a| a == "--log") {
        Arc::new(TracingSink)
    } else {
        Arc::new(StdoutSink)
    };

    let tracer = match PoolTracer::new(config, sink) {
        Ok(tracer) => tracer,
        Err(e) => {
            tracing::error!(error = %e, "could not create tracer");
            return ExitCode::from(2);
        }
    };

    let sessions = std::sync::atomic::AtomicUsize::new(1);
    let pool = Arc::new(Traced::new(
        DynamicObjectPool::new(
            move || Connection {
                session: sessions.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
            },
            PoolConfiguration::new().with_max_pool_size(4),
        ),
        tracer,
    ));

    let workers: Vec<_> = (0..3)
        .map(|worker| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || handle_requests(&pool, worker))
        })
        .collect();
    for worker in workers {
        let _ = worker.join();
    }

    // never released: its acquire line has no matching release line
    let leaked = leak_connection(&pool);

    let metrics = pool.tracer().metrics();
    println!();
    println!("Leaked session: {leaked}");
    println!("Tracer metrics:");
    for (key, value) in metrics.export() {
        println!("  {key}: {value}");
    }

    ExitCode::SUCCESS
}

fn handle_requests(pool: &Traced<DynamicObjectPool<Connection>>, worker: usize) {
    for request in 0..2 {
        match pool.acquire() {
            Ok(conn) => {
                tracing::debug!(worker, request, session = conn.session, "request served");
            }
            Err(e) => tracing::warn!(worker, error = %e, "no connection available"),
        }
    }
}

fn leak_connection(pool: &Traced<DynamicObjectPool<Connection>>) -> usize {
    match pool.acquire() {
        Ok(conn) => {
            let session = conn.session;
            std::mem::forget(conn);
            session
        }
        Err(_) => 0,
    }
}

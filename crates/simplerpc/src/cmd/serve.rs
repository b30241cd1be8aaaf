use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use simplerpc_channel::{server_trace_stage, Listener, ListenerConfig, ServerPipeline};
use tracing::info;

use crate::cmd::ServeArgs;
use crate::demo;
use crate::exit::{channel_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_serving, OutputFormat, PublishedObject, ServingOutput};

const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    if args.workers == 0 {
        return Err(CliError::new(USAGE, "--workers must be at least 1"));
    }

    let table = Arc::new(demo::services());
    let object_uris: Vec<String> = table.object_uris().into_iter().map(str::to_string).collect();

    let mut builder = ServerPipeline::builder(table.clone(), table);
    if args.trace {
        builder = builder.with_stage(server_trace_stage());
    }
    let pipeline = builder
        .build()
        .map_err(|err| channel_error("pipeline setup failed", err))?;

    let config = ListenerConfig {
        host: args.host,
        port: args.port,
        workers: args.workers,
        queue_depth: args.queue_depth,
    };
    let listener = Listener::new(config, pipeline);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    listener
        .start()
        .map_err(|err| channel_error("listen failed", err))?;

    let serving = ServingOutput {
        channel_uri: listener.channel_uri().unwrap_or_default(),
        workers: args.workers,
        objects: object_uris
            .into_iter()
            .map(|object_uri| PublishedObject {
                url: listener.url_for(&object_uri).unwrap_or_default(),
                object_uri,
            })
            .collect(),
    };
    print_serving(&serving, format);

    while running.load(Ordering::SeqCst) {
        thread::sleep(SHUTDOWN_POLL);
    }

    info!("interrupt received, shutting down");
    listener.stop();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

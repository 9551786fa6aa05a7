use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use xapilink_host::{Link, LinkConfig};
use xapilink_schema::Schema;

use crate::cmd::{connect, parse_duration, ListenArgs};
use crate::exit::{definition_error, host_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_message, OutputFormat};

// Poll interval so Ctrl-C and the deadline stay responsive.
const POLL: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let max_time = args.max_time.as_deref().map(parse_duration).transpose()?;
    let schema = Schema::from_files(&args.api)
        .map_err(|err| definition_error("loading definitions failed", err))?;

    let stream = connect(&args.addr, Duration::from_secs(5))?;
    let link = Link::open(stream, Arc::new(schema), LinkConfig::default())
        .map_err(|err| host_error("link setup failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let deadline = max_time.map(|t| Instant::now() + t);
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let wait = match deadline {
            Some(deadline) => {
                let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                    break;
                };
                remaining.min(POLL)
            }
            None => POLL,
        };

        let Some(event) = link.pop_event(Some(wait)) else {
            if link.is_closed() {
                // Queue drained and the device hung up.
                return Err(CliError::new(FAILURE, "connection closed by peer"));
            }
            continue;
        };

        print_message(&event, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

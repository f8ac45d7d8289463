//! Lines printed to stdout.

use std::time::Duration;

use nt_engine::GenerationEvent;

/// Progress line for a generation event.
pub fn generation_line(event: &GenerationEvent) -> String {
    match event {
        GenerationEvent::Generated { table } => format!("Generated {table}"),
        GenerationEvent::Remaining(left) => format!("Remaining: {left}"),
        GenerationEvent::Finished { elapsed } => time_taken(*elapsed),
    }
}

fn time_taken(elapsed: Duration) -> String {
    format!("Time taken: {} seconds", elapsed.as_secs())
}

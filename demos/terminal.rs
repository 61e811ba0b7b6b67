//! Interactive demo on the process terminal.
//!
//! Run with: cargo run --example terminal
//!
//! Try:
//! - `add 1 2 3`
//! - `help add`
//! - `commands`
//! - `shutdown` (or Ctrl+C)

use std::thread;
use std::time::Duration;

use console_writer::prelude::*;

/// Sum space separated numbers; tokens that don't parse count as 0.
fn add(args: &CommandArgs) -> String {
    let total: f64 = args
        .words()
        .map(|word| word.parse::<f64>().unwrap_or(0.0))
        .sum();
    format!("The numerical total is : {:.6}", total)
}

fn main() -> std::io::Result<()> {
    let console = ConsoleService::stdout(ConsoleConfig::default())?;

    // Forward this program's own log events into the console.
    #[cfg(feature = "logging")]
    {
        use tracing_subscriber::prelude::*;
        tracing_subscriber::registry()
            .with(console_writer::ConsoleLayer::new(console.handle().clone()))
            .init();
    }

    console
        .add_command("add", Command::new("Add a series of space separated numbers", add))
        .ok();
    console
        .add_command(
            "shutdown",
            Command::new("Shut down the example programme", |args| {
                args.console().shutdown();
                String::new()
            }),
        )
        .ok();

    console.message("Type \"commands\" to list commands.").ok();

    while !console.is_deletable() {
        thread::sleep(Duration::from_millis(50));
    }
    // Restores the terminal.
    drop(console);
    println!("Console stopped.");
    Ok(())
}

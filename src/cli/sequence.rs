use anyhow::{Context, Result};
use std::path::Path;

use raftscope::sequence::parse_file;

/// Print the readout cycle of a sequencer file.
pub fn run(file: &Path, function: Option<&str>) -> Result<()> {
    let parsed = parse_file(file)
        .with_context(|| format!("Failed to read sequencer file: {}", file.display()))?;
    let program = parsed.program(function)?;

    println!("Sequencer File");
    println!("==============");
    println!("File:      {}", file.display());
    println!("Functions: {}", parsed.function_names().join(", "));
    println!();
    println!("Function:  {}", program.name);
    println!("Tick:      {} ns", program.tick_period_ns);
    println!(
        "Cycle:     {} ticks ({} ns)",
        program.total_ticks(),
        program.cycle_ns()
    );
    println!();

    print!("  {:<16} {:>6}", "interval", "ticks");
    for clock in &program.clocks {
        print!(" {:>4}", clock);
    }
    println!();
    for interval in &program.intervals {
        print!("  {:<16} {:>6}", interval.name, interval.duration_ticks);
        for clock in &program.clocks {
            match interval.level(clock) {
                Some(level) => print!(" {:>4}", level),
                None => print!(" {:>4}", "-"),
            }
        }
        println!();
    }

    Ok(())
}

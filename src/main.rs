// stacksmash: Stack Frame Simulator with Overflow Visualization

use std::io;
use std::path::Path;

use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use stacksmash::diagram::{render_report, render_stack};
use stacksmash::scenario::{Scenario, ScenarioError};
use stacksmash::simulator::Simulation;
use stacksmash::ui::App;

fn usage(program_name: &str) {
    eprintln!("Usage: {} [scenario.toml] [--print]", program_name);
    eprintln!();
    eprintln!("Examples:");
    eprintln!(
        "  {}                              # Run the built-in classic overflow",
        program_name
    );
    eprintln!(
        "  {} scenarios/hijack.toml        # Run a scenario file",
        program_name
    );
    eprintln!(
        "  {} scenarios/sysv.toml --print  # Print every step instead of the TUI",
        program_name
    );
}

/// Every recorded step as text, oldest first
fn print_history(sim: &Simulation) {
    for index in 0..sim.total_snapshots() {
        let Some(snapshot) = sim.snapshot(index) else {
            break;
        };
        println!("── step {}: {}", index, snapshot.label);
        if let Some(report) = &snapshot.last_report {
            print!("{}", render_report(report));
        }
        print!("{}", render_stack(&snapshot.stack, &snapshot.memory));
        println!();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("stacksmash");

    let mut print_only = false;
    let mut scenario_path = None;
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--print" => print_only = true,
            "-h" | "--help" => {
                usage(program_name);
                return Ok(());
            }
            path if scenario_path.is_none() => scenario_path = Some(path.to_string()),
            other => {
                eprintln!("Error: Unexpected argument '{}'", other);
                usage(program_name);
                std::process::exit(1);
            }
        }
    }

    let scenario = match &scenario_path {
        Some(path) => {
            eprintln!("Loading {}...", path);
            Scenario::load(Path::new(path))
        }
        None => {
            eprintln!("No scenario given, running the classic buffer1/buffer2 overflow");
            Scenario::classic()
        }
    };
    let scenario = match scenario {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Scenario error: {}", e);
            std::process::exit(1);
        }
    };

    eprintln!(
        "Loaded {} step(s): {:?}, {}-byte words, {:?}, {} bytes of stack",
        scenario.steps.len(),
        scenario.config.convention,
        scenario.config.word_size,
        scenario.config.growth,
        scenario.config.capacity
    );

    let mut sim = match Simulation::new(scenario.config) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Run every step to build history
    eprintln!("Simulating...");
    match scenario.run(&mut sim) {
        Ok(outcomes) => {
            eprintln!("Simulation completed: {} step(s).", outcomes.len());
            eprintln!("Total snapshots: {}", sim.total_snapshots());
        }
        Err(ScenarioError::Step { step, op, source }) => {
            eprintln!("Step {} ({}) failed: {}", step, op, source);
            eprintln!("Continuing with partial history...");
        }
        Err(e) => {
            eprintln!("Scenario error: {}", e);
            eprintln!("Continuing with partial history...");
        }
    }

    if print_only {
        print_history(&sim);
        return Ok(());
    }

    // Rewind to the beginning for TUI
    if let Err(e) = sim.rewind_to_start() {
        eprintln!("Warning: Failed to rewind to start: {}", e);
    }

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let title = scenario_path.unwrap_or_else(|| "classic".to_string());
    let mut app = App::new(sim, title);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

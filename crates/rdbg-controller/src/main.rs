//! rdbg-controller — CLI entry point (§6.3). Listens for one debuggee
//! connection, then alternates between showing where it stopped and
//! taking commands at the `?>` prompt until the script ends or the
//! connection drops.

use std::io::{self, BufRead, Write};
use std::net::TcpListener;
use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;
use log::{debug, info, warn};

use rdbg_controller::{BreakOrQuit, ControllerError, Driver};
use rdbg_core::DEFAULT_PORT;

/// Remote source-level debugger controller.
#[derive(Debug, Parser)]
#[command(name = "rdbg-controller")]
struct Cli {
    /// Address to listen on for the debuggee's connection.
    #[arg(short = 'a', long = "addr", default_value = "127.0.0.1")]
    addr: String,

    /// Port to listen on for the debuggee's connection.
    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT)]
    port: u16,
}

const HELP_TEXT: &str = "\
s             step into
o             step over
r             run until breakpoint
ll [N]        list locals at frame N (default 1)
lu [N]        list upvalues at frame N (default 1)
lg [N]        list globals at frame N (default 1)
ps            print the call stack
w ...         watch a variable or the cached value
sb <path> <line>   set a breakpoint
db <path> <line>   delete a breakpoint
lb            list breakpoints
h             this help";

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    color_eyre::install()?;
    env_logger::init();

    let cli = Cli::parse();
    let listener = TcpListener::bind((cli.addr.as_str(), cli.port))?;
    info!("listening on {}:{}", cli.addr, cli.port);

    let (sock, peer) = listener.accept()?;
    info!("debuggee connected from {peer}");
    let mut driver = Driver::new(sock)?;

    let stdin = io::stdin();
    loop {
        match driver.wait_for_break_or_quit() {
            Ok(BreakOrQuit::Break { path, line }) => {
                debug!("BR {path}:{line}");
                println!("Break at {path}:{line}");
            }
            Ok(BreakOrQuit::Quit) => {
                debug!("QT");
                println!("Script finished.");
                return Ok(ExitCode::SUCCESS);
            }
            Err(_) => {
                eprintln!("Socket or protocol error!");
                return Ok(ExitCode::FAILURE);
            }
        }

        loop {
            print!("?> ");
            io::stdout().flush().ok();

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Ok(ExitCode::SUCCESS);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed == "h" {
                println!("{HELP_TEXT}");
                continue;
            }

            debug!("→ {trimmed}");
            match driver.round_trip(trimmed) {
                Ok(Some(text)) => {
                    print!("{text}");
                    break;
                }
                Ok(None) => break, // resume command: back to wait_for_break_or_quit
                Err(ControllerError::InvalidInput) => {
                    println!("Invalid command! Type 'h' for help.");
                }
                Err(ControllerError::Semantic(message)) => {
                    println!("{message}");
                }
                Err(ControllerError::Wire(e)) => {
                    warn!("wire error: {e}");
                    eprintln!("Socket or protocol error!");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
}

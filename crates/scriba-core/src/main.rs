use std::io::{self, IsTerminal, Read};

use scriba_core::commands::{run_ask, run_events, run_history, run_list, CommandError};
use scriba_core::config::Config;
use scriba_core::logging;

fn print_help() {
    println!("scriba - research assistant in the terminal");
    println!();
    println!("Usage:");
    println!("  scriba \"question\"               Ask a question, stream the answer");
    println!("  echo \"question\" | scriba        Question from stdin");
    println!("  scriba --history <id>           Print a conversation");
    println!("  scriba --list                   List conversations");
    println!();
    println!("Options:");
    println!("  --conversation <id>  Ask within an existing conversation");
    println!("  --events             Print the decoded event stream instead of the answer");
    println!("  --verbose            Debug logging to stderr");
    println!("  --version            Print version");
    println!("  --help               Print this help");
}

/// Value following `flag`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("scriba {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    let events = args.iter().any(|a| a == "--events");
    let list = args.iter().any(|a| a == "--list");
    let history = flag_value(&args, "--history");
    let conversation = flag_value(&args, "--conversation");

    let config = Config::load_or_default();
    logging::init(&config.log.level, verbose);

    // Positional args are the question; skip flag values
    let mut question_words = Vec::new();
    let mut skip_next = false;
    for arg in &args {
        if skip_next {
            skip_next = false;
        } else if arg == "--history" || arg == "--conversation" {
            skip_next = true;
        } else if !arg.starts_with('-') {
            question_words.push(arg.as_str());
        }
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create async runtime: {e}");
            std::process::exit(1);
        }
    };

    let result: Result<i32, CommandError> = if list {
        runtime.block_on(run_list(&config)).map(|()| 0)
    } else if let Some(id) = history {
        runtime.block_on(run_history(&config, id)).map(|()| 0)
    } else {
        let question = if !question_words.is_empty() {
            question_words.join(" ")
        } else if !io::stdin().is_terminal() {
            let mut buf = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buf) {
                eprintln!("error: failed to read stdin: {e}");
                std::process::exit(1);
            }
            buf.trim().to_string()
        } else {
            print_help();
            std::process::exit(2);
        };

        if events {
            runtime
                .block_on(run_events(&config, &question, conversation))
                .map(|()| 0)
        } else {
            let is_tty = io::stderr().is_terminal();
            runtime.block_on(run_ask(&config, &question, conversation, is_tty))
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

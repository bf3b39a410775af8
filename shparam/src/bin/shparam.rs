use std::io::Read;
use std::sync::Arc;

use arrrg::CommandLine;
use indicio::{clue, stdio::StdioEmitter, ALWAYS, INFO};

use shparam::{expand, ExpandOptions, COLLECTOR};

fn main() {
    let (options, free) = ExpandOptions::from_command_line("USAGE: shparam [OPTIONS] [KEY=VALUE ...]");
    if options.verbose {
        let emitter = Arc::new(StdioEmitter);
        COLLECTOR.register(emitter);
        COLLECTOR.set_verbosity(INFO);
        clue!(COLLECTOR, ALWAYS, {
            args: std::env::args().collect::<Vec<_>>(),
        });
    }
    let mut vars = match options.variables(&free[..]) {
        Ok(vars) => vars,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(129);
        }
    };
    let template = match &options.input {
        Some(input) => std::fs::read_to_string(input),
        None => {
            let mut template = String::new();
            std::io::stdin()
                .read_to_string(&mut template)
                .map(|_| template)
        }
    };
    let template = match template {
        Ok(template) => template,
        Err(err) => {
            eprintln!("could not read template: {err}");
            std::process::exit(2);
        }
    };
    match expand(&mut vars, &template) {
        Ok(expanded) => {
            print!("{expanded}");
        }
        Err(err) => {
            eprintln!("shparam: {err}");
            std::process::exit(1);
        }
    }
}

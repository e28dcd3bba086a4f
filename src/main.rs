use simai_fragment::{compile_fragment_with, Options};
use std::env;
use std::process;

fn usage() -> ! {
    eprintln!("Usage: simai-frag <fragment>...");
    eprintln!("       simai-frag --options <options.yaml> <fragment>...");
    process::exit(1);
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let mut fragments = &args[..];
    let mut options = Options::default();

    // Parse flags
    if args[0] == "--options" {
        let Some(path) = args.get(1) else { usage() };
        options = match Options::load(path) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        };
        fragments = &args[2..];
        if fragments.is_empty() {
            usage();
        }
    }

    for fragment in fragments {
        let compiled = match compile_fragment_with(fragment, &options) {
            Ok(compiled) => compiled,
            Err(e) => {
                eprintln!("Compilation error: {}", e);
                process::exit(1);
            }
        };

        if options.report_dropped {
            for dropped in &compiled.dropped {
                eprintln!(
                    "{}: dropped {} '{}' ({})",
                    fragment, dropped.kind, dropped.notation, dropped.reason
                );
            }
        }

        match serde_yaml::to_string(&compiled.events) {
            Ok(yaml) => {
                println!("# {}", fragment);
                print!("{}", yaml);
            }
            Err(e) => {
                eprintln!("Error writing events for '{}': {}", fragment, e);
                process::exit(1);
            }
        }
    }
}

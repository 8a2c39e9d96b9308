use getopts::Options;
use libforth::{Config, Error, VM};
use log::info;
use std::env;
use std::fs::File;
use std::io;
use std::process;

const CORE_FILE: &str = "forth.core";

fn main() {
    env_logger::init();

    let args: Vec<_> = env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "forth".to_string());
    let mut opts = Options::new();
    opts.optflag("d", "", "dump the core to forth.core once all input is read");

    let matches = match opts.parse(args.iter().skip(1)) {
        Ok(m) => m,
        Err(f) => {
            eprintln!("{}", f);
            print_usage(&program, &opts);
            process::exit(1);
        }
    };
    if let Err(e) = run(&matches.free, matches.opt_present("d")) {
        eprintln!("{}: {}", program, e);
        process::exit(1);
    }
}

/// Interpret each file in order, or standard input if there are none.
fn run(files: &[String], dump: bool) -> Result<(), Error> {
    let vm = &mut VM::new(Config::default(), io::stdin(), io::stdout())?;
    if files.is_empty() {
        interpret(vm, "<stdin>")?;
    }
    for path in files {
        let file = File::open(path)?;
        vm.set_file_input(file);
        interpret(vm, path)?;
        info!("loaded {}", path);
    }
    if dump {
        let core = File::create(CORE_FILE)?;
        vm.dump(core)?;
        info!("core written to {}", CORE_FILE);
    }
    Ok(())
}

fn interpret(vm: &mut VM, name: &str) -> Result<(), Error> {
    vm.run().map_err(|e| {
        eprintln!(
            "{}: error at `{}`",
            name,
            String::from_utf8_lossy(vm.last_token())
        );
        e
    })
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [-d] [files]", program);
    eprint!("{}", opts.usage(&brief));
}

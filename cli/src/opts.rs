const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default)]
pub struct Opts {
    pub pid: Option<u32>,
    pub value_type: String,
}

/// Parse commandline options.
pub fn opts() -> Opts {
    let m = app().get_matches();

    Opts {
        pid: m.get_one::<u32>("pid").copied(),
        value_type: m
            .get_one::<String>("type")
            .cloned()
            .unwrap_or_else(|| String::from("i32")),
    }
}

fn app() -> clap::Command {
    use clap::{value_parser, Arg, Command};

    Command::new("memscan")
        .version(VERSION)
        .about("Scans memory of processes")
        .arg(
            Arg::new("pid")
                .help("Attach to the given process id instead of prompting for one.")
                .long("pid")
                .short('p')
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("type")
                .help("Scalar type to scan for.")
                .long("type")
                .short('t')
                .value_parser(["i32", "u32", "i64", "u64", "f32", "f64"])
                .default_value("i32"),
        )
}

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use getopts::{Matches, Options};

use crate::ics::FILE_NAME;

pub enum Args {
    Compile(CompileArgs),
    Serve(ServeArgs),
}

/// Where a page comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
    Url(String),
}

/// Where the compiled calendar goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

pub struct CompileArgs {
    pub source: Source,
    pub output: Output,
    pub json: bool,
}

pub struct ServeArgs {
    pub address: SocketAddr,
    pub upstream: Option<String>,
    pub enable_cache: bool,
    pub cache_ttl: Duration,
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "i",
        "input",
        "Saved timetable page to compile, '-' for stdin [Default: -]",
        "FILE",
    );
    opts.optopt("u", "url", "Fetch the timetable page from URL", "URL");
    opts.optopt(
        "o",
        "output",
        "Where to write the calendar, '-' for stdout [Default: timetable.ics]",
        "FILE",
    );
    opts.optflag("j", "json", "Write the events as JSON instead of iCalendar");
    opts.optflag("s", "serve", "Run the HTTP service instead of compiling once");
    opts.optopt(
        "a",
        "address",
        "Socket address (IP and port) to listen on [Default: 127.0.0.1:8080]",
        "SOCKET_ADDRESS",
    );
    opts.optopt(
        "U",
        "upstream",
        "Timetable page the service fetches for GET requests",
        "URL",
    );
    opts.optflag(
        "c",
        "enable-cache",
        "Enable caching of fetched timetable pages [Default: false]",
    );
    opts.optopt(
        "t",
        "cache-ttl",
        "Time-to-live for cached pages [Default: 3600]",
        "SECONDS",
    );
    opts
}

pub fn parse(args: Vec<String>) -> Args {
    let opts = opts();

    let matches = match opts.parse(args) {
        Ok(matches) => matches,
        Err(fail) => {
            eprintln!("{fail}");
            process::exit(1);
        }
    };

    if matches.opt_present("help") {
        println!("{}", opts.usage(&opts.short_usage(env!("CARGO_PKG_NAME"))));
        process::exit(0);
    }

    match from_matches(&matches) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}

fn from_matches(matches: &Matches) -> Result<Args, String> {
    if matches.opt_present("serve") {
        let address = matches
            .opt_get_default("address", SocketAddr::from(([127, 0, 0, 1], 8080)))
            .map_err(|err| format!("Provided value for option 'address' is invalid: {err}"))?;

        let cache_ttl = matches
            .opt_get_default("cache-ttl", 3600)
            .map(Duration::from_secs)
            .map_err(|err| format!("Provided value for option 'cache-ttl' is invalid: {err}"))?;

        return Ok(Args::Serve(ServeArgs {
            address,
            upstream: matches.opt_str("upstream"),
            enable_cache: matches.opt_present("enable-cache"),
            cache_ttl,
        }));
    }

    let source = match (matches.opt_str("input"), matches.opt_str("url")) {
        (Some(_), Some(_)) => return Err("Options 'input' and 'url' are mutually exclusive".into()),
        (None, Some(url)) => Source::Url(url),
        (Some(path), None) if path != "-" => Source::File(path.into()),
        _ => Source::Stdin,
    };

    let output = match matches.opt_str("output") {
        Some(path) if path == "-" => Output::Stdout,
        Some(path) => Output::File(path.into()),
        None => Output::File(FILE_NAME.into()),
    };

    Ok(Args::Compile(CompileArgs {
        source,
        output,
        json: matches.opt_present("json"),
    }))
}

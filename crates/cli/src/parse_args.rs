use std::path::PathBuf;

const HELP: &str = "\
mcping - query game servers for their status

Prints one JSON status per line, in the order the addresses were given.

USAGE:
  mcping [OPTIONS] <address>...

ARGS:
  <address>             host[:port]; the port defaults to the SRV record, then 25565

OPTIONS:
  -h, --help            Prints help information
  -c, --config <file>   Options file (see mcping-config)
  --legacy              Only use the pre-handshake protocol
  --compat              Send the four-byte legacy request instead of the full one

Set RUST_LOG (e.g. RUST_LOG=debug) for protocol logging.
";

#[derive(Debug)]
pub struct AppArgs {
    pub config: Option<PathBuf>,
    pub legacy_only: bool,
    pub compat: bool,
    pub addresses: Vec<String>,
}

pub fn parse_args() -> Result<AppArgs, pico_args::Error> {
    let mut pargs = pico_args::Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{}", HELP);
        std::process::exit(0);
    }

    let config = pargs.opt_value_from_str(["-c", "--config"])?;
    let legacy_only = pargs.contains("--legacy");
    let compat = pargs.contains("--compat");

    let mut addresses = Vec::new();
    for arg in pargs.finish() {
        match arg.into_string() {
            Ok(address) if address.starts_with('-') => eprintln!("Warning: unknown option {}", address),
            Ok(address) => addresses.push(address),
            Err(raw) => eprintln!("Warning: ignoring non UTF-8 argument {:?}", raw),
        }
    }

    Ok(AppArgs {
        config,
        legacy_only,
        compat,
        addresses,
    })
}

use argparse::{ArgumentParser, Store, StoreTrue};

/// Parsed command line options.
pub struct Options {
    pub config: Option<String>,
    pub bind: Option<String>,
    pub verbose: bool,
    pub serve: bool,
}

pub fn parse() -> Options {
    let mut config = String::new();
    let mut bind = String::new();
    let mut verbose = false;
    let mut serve = false;

    {
        let mut parser = ArgumentParser::new();
        parser.set_description("Offline-capable Japanese dictionary sync/query server");
        parser
            .refer(&mut config)
            .add_option(&["--config"], Store, "Path to the kotoba.toml config file");
        parser
            .refer(&mut bind)
            .add_option(&["--bind"], Store, "Address to bind the HTTP server to, e.g. 127.0.0.1:8080");
        parser
            .refer(&mut verbose)
            .add_option(&["-v", "--verbose"], StoreTrue, "Enable verbose (debug) logging");
        parser
            .refer(&mut serve)
            .add_option(&["-s", "--serve"], StoreTrue, "Start the HTTP server");
        parser.parse_args_or_exit();
    }

    Options {
        config: (!config.is_empty()).then_some(config),
        bind: (!bind.is_empty()).then_some(bind),
        verbose,
        serve,
    }
}

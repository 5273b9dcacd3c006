mod cli;
mod webserver;

#[actix_web::main]
pub async fn main() {
    let options = cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if options.verbose { "debug" } else { "info" })).init();

    if options.serve {
        webserver::start(options).await.expect("webserver failed");
        return;
    }

    println!("Nothing to do. Use `-s` to start the dictionary");
}

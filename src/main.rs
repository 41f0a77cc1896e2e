use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    if let Err(err) = controller_labeler::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Explicit directives win over `RUST_LOG`.
pub(crate) fn init_tracing(directives: Option<&str>) {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::WARN.into());
    let env_filter = match directives.map(str::trim).filter(|value| !value.is_empty()) {
        Some(directives) => builder.parse_lossy(directives),
        None => builder.from_env_lossy(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

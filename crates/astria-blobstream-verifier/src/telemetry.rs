//! Installs the global tracing subscriber.
use tracing_subscriber::{
    filter::{
        LevelFilter,
        ParseError,
    },
    layer::SubscriberExt as _,
    util::{
        SubscriberInitExt as _,
        TryInitError,
    },
    EnvFilter,
};

/// The errors that can occur when initializing telemetry.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    fn filter_directives(source: ParseError) -> Self {
        Self(ErrorKind::FilterDirectives(source))
    }

    fn init_subscriber(source: TryInitError) -> Self {
        Self(ErrorKind::InitSubscriber(source))
    }
}

#[derive(Debug, thiserror::Error)]
enum ErrorKind {
    #[error("failed to parse filter directives")]
    FilterDirectives(#[source] ParseError),
    #[error("failed installing global tracing subscriber")]
    InitSubscriber(#[source] TryInitError),
}

/// Installs a subscriber writing events to stdout.
///
/// Events are written as JSON objects, one per line, unless `pretty_print` is set.
/// Directives not given in `filter_directives` default to `info`.
///
/// # Errors
/// Returns an error if the directives could not be parsed or if a global
/// subscriber was already installed.
pub fn init(filter_directives: &str, pretty_print: bool) -> Result<(), Error> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse(filter_directives)
        .map_err(Error::filter_directives)?;

    let (pretty_printer, json_printer) = if pretty_print {
        (Some(tracing_subscriber::fmt::layer().compact()), None)
    } else {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            ),
        )
    };
    tracing_subscriber::registry()
        .with(pretty_printer)
        .with(json_printer)
        .with(env_filter)
        .try_init()
        .map_err(Error::init_subscriber)
}

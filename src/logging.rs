use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{runtime::ConfigErrors, Appender, Root},
    encode::pattern::PatternEncoder,
    Config,
};

const STDERR_PATTERN: &str = "{h({d(%Y-%m-%d %H:%M:%S)} [{l}] {M}:{L})} - {m}{n}";

/// Build the logger configuration used by the command line tools: everything
/// at or above `level` goes to stderr, stdout is left for program output.
pub fn stderr_config(level: log::LevelFilter) -> Result<Config, ConfigErrors> {
    let stderr = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(STDERR_PATTERN)))
        .target(Target::Stderr)
        .build();

    Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
}

/// Install the stderr logger. Panics if called twice in one process.
pub fn init_logging(level: log::LevelFilter) {
    let config = stderr_config(level).expect("Failed to configure logger");
    log4rs::init_config(config).expect("Failed to initialize logger");
}

/// Log scanning and registration diagnostics:
/// at info level when `debug` is set in the config, at trace otherwise.
macro_rules! diag {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            log::info!($($arg)+)
        } else {
            log::trace!($($arg)+)
        }
    };
}

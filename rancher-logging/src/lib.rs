use std::{
    env,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::MakeWriter, prelude::*, registry, EnvFilter};

// --- Custom "Tee" Writer ---
struct Tee<A, B> {
    a: A,
    b: B,
}

impl<A, B> Write for Tee<A, B>
where
    A: Write,
    B: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let res_a = self.a.write(buf);
        let res_b = self.b.write(buf);
        res_a.or(res_b)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.a.flush()?;
        self.b.flush()
    }
}

#[derive(Clone)]
struct MakeTee<A, B> {
    make_a: A,
    make_b: B,
}

impl<'a, A, B, W1, W2> MakeWriter<'a> for MakeTee<A, B>
where
    A: MakeWriter<'a, Writer = W1>,
    B: MakeWriter<'a, Writer = W2>,
    W1: Write + 'a,
    W2: Write + 'a,
{
    type Writer = Tee<W1, W2>;
    fn make_writer(&'a self) -> Self::Writer {
        Tee {
            a: self.make_a.make_writer(),
            b: self.make_b.make_writer(),
        }
    }
}

/// Where log records end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
    None,
}

impl LogOutput {
    fn parse(value: &str) -> Self {
        match value {
            "file" => LogOutput::File,
            "both" => LogOutput::Both,
            "none" => LogOutput::None,
            _ => LogOutput::Console,
        }
    }
}

/// Logging options read from `RANCHER_LOG_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub output: LogOutput,
    pub json: bool,
    pub file_path: PathBuf,
}

impl LogSettings {
    pub fn from_env() -> Self {
        let level = env::var("RANCHER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let output = env::var("RANCHER_LOG_OUTPUT").unwrap_or_default();
        let format = env::var("RANCHER_LOG_FORMAT").unwrap_or_default();
        let file_path = env::var_os("RANCHER_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("rancher.log"));

        Self {
            level,
            output: LogOutput::parse(&output),
            json: format == "json",
            file_path,
        }
    }

    /// Same as [`LogSettings::from_env`] but never quieter than `debug`.
    pub fn from_env_with_debug(debug: bool) -> Self {
        let mut settings = Self::from_env();
        if debug {
            settings.level = "debug".to_string();
        }
        settings
    }
}

fn env_filter(level: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    if let Ok(directive) = "tokio=warn".parse() {
        filter = filter.add_directive(directive);
    }
    filter
}

/// Initializes the global tracing subscriber from environment variables.
///
/// Console records go to stderr. The returned guard flushes the file writer
/// on drop and must be kept alive for as long as logging is wanted.
pub fn init_subscriber() -> Option<WorkerGuard> {
    init_with(&LogSettings::from_env())
}

pub fn init_with(settings: &LogSettings) -> Option<WorkerGuard> {
    let mut guard: Option<WorkerGuard> = None;

    let subscriber = registry().with(env_filter(&settings.level));

    let log_dir = settings
        .file_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(env::temp_dir);
    let log_filename = settings
        .file_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "rancher.log".into());

    // `try_init` so a second initialisation (tests, embedding apps) is a no-op.
    let result = match settings.output {
        LogOutput::Both => {
            let file_appender = tracing_appender::rolling::daily(&log_dir, &log_filename);
            let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
            guard = Some(file_guard);

            let tee_writer = MakeTee {
                make_a: io::stderr,
                make_b: non_blocking,
            };

            let fmt_layer = tracing_subscriber::fmt::layer().with_writer(tee_writer);
            if settings.json {
                subscriber.with(fmt_layer.json()).try_init()
            } else {
                subscriber.with(fmt_layer).try_init()
            }
        }
        LogOutput::Console => {
            let fmt_layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);
            if settings.json {
                subscriber.with(fmt_layer.json()).try_init()
            } else {
                subscriber.with(fmt_layer).try_init()
            }
        }
        LogOutput::File => {
            let file_appender = tracing_appender::rolling::daily(&log_dir, &log_filename);
            let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
            guard = Some(file_guard);

            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking);
            if settings.json {
                subscriber.with(fmt_layer.json()).try_init()
            } else {
                subscriber.with(fmt_layer).try_init()
            }
        }
        LogOutput::None => subscriber.try_init(),
    };

    if let Err(e) = result {
        tracing::debug!("Tracing subscriber already installed: {}", e);
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "RANCHER_LOG_LEVEL",
            "RANCHER_LOG_OUTPUT",
            "RANCHER_LOG_FORMAT",
            "RANCHER_LOG_FILE",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let settings = LogSettings::from_env();
        assert_eq!(settings.level, "info");
        assert_eq!(settings.output, LogOutput::Console);
        assert!(!settings.json);
        assert!(settings.file_path.ends_with("rancher.log"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var("RANCHER_LOG_LEVEL", "warn");
        env::set_var("RANCHER_LOG_OUTPUT", "both");
        env::set_var("RANCHER_LOG_FORMAT", "json");
        env::set_var("RANCHER_LOG_FILE", "/var/tmp/homestead.log");

        let settings = LogSettings::from_env();
        assert_eq!(settings.level, "warn");
        assert_eq!(settings.output, LogOutput::Both);
        assert!(settings.json);
        assert_eq!(settings.file_path, PathBuf::from("/var/tmp/homestead.log"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_debug_flag_raises_level() {
        clear_env();
        env::set_var("RANCHER_LOG_LEVEL", "error");
        assert_eq!(LogSettings::from_env_with_debug(true).level, "debug");
        assert_eq!(LogSettings::from_env_with_debug(false).level, "error");
        clear_env();
    }

    #[test]
    fn test_unknown_output_falls_back_to_console() {
        assert_eq!(LogOutput::parse("syslog"), LogOutput::Console);
        assert_eq!(LogOutput::parse("none"), LogOutput::None);
    }

    #[test]
    #[serial]
    fn test_init_twice_is_harmless() {
        let settings = LogSettings {
            level: "debug".into(),
            output: LogOutput::None,
            json: false,
            file_path: env::temp_dir().join("rancher-test.log"),
        };
        assert!(init_with(&settings).is_none());
        assert!(init_with(&settings).is_none());
    }
}

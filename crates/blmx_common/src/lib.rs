use std::fs::File;
use std::io::{stderr, stdout, Stderr, Stdout, Write};
use std::path::{Path, PathBuf};

pub use image;
pub use indexmap;
pub use lazy_static;
pub use log;
pub use num_cpus;
pub use parking_lot;
pub use rayon;
pub use serde;
pub use serde_json;
pub use sha2;
pub use smallvec;

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub num_threads: usize,
    /// `"stderr"`, `"stdout"` or a file path.
    pub log_output: String,
    pub log_level: String,
    /// Where re-encoded images are written. Defaults to `$TMP/blmx_images`.
    pub image_cache_dir: Option<PathBuf>,
    /// Extension used when an image's own format cannot be referenced directly.
    pub default_image_extension: String,
    pub mtlx_version: String,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
            log_output: "stderr".into(),
            log_level: "info".into(),
            image_cache_dir: None,
            default_image_extension: "png".into(),
            mtlx_version: "1.38".into(),
        }
    }
}
impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::open(path)?;
        serde_json::from_reader(file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
    pub fn image_cache_dir(&self) -> PathBuf {
        self.image_cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("blmx_images"))
    }
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

enum LogOutput {
    Stdout(Stdout),
    Stderr(Stderr),
    File(File),
}
impl LogOutput {
    fn open(name: &str) -> Self {
        match name {
            "stdout" => LogOutput::Stdout(stdout()),
            "stderr" => LogOutput::Stderr(stderr()),
            file => match File::create(file) {
                Ok(file) => LogOutput::File(file),
                Err(err) => {
                    eprintln!("failed to create log file {}: {}, using stderr", file, err);
                    LogOutput::Stderr(stderr())
                }
            },
        }
    }
    fn writer(&mut self) -> &mut dyn Write {
        match self {
            LogOutput::Stdout(out) => out,
            LogOutput::Stderr(out) => out,
            LogOutput::File(file) => file,
        }
    }
}
struct SimpleLogger {
    level: LevelFilter,
    output: Mutex<LogOutput>,
}

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut output = self.output.lock();
        let _ = writeln!(output.writer(), "{} - {}", record.level(), record.args());
    }

    fn flush(&self) {
        let _ = self.output.lock().writer().flush();
    }
}

pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
    let output = LogOutput::open(&config.log_output);
    let level = config.level_filter();
    let logger = SimpleLogger {
        level,
        output: Mutex::new(output),
    };
    log::set_boxed_logger(Box::new(logger)).map(|()| log::set_max_level(level))
}

pub fn init(config: &Config) -> Result<(), SetLoggerError> {
    init_logger(config)?;
    if let Err(err) = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build_global()
    {
        log::warn!("global thread pool already initialized: {}", err);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config: Config = serde_json::from_str(r#"{"log_level": "debug"}"#).unwrap();
        assert_eq!(config.level_filter(), LevelFilter::Debug);
        assert_eq!(config.log_output, "stderr");
        assert_eq!(config.default_image_extension, "png");
        assert_eq!(config.mtlx_version, "1.38");
    }

    #[test]
    fn test_bad_level_falls_back_to_info() {
        let config = Config {
            log_level: "loud".into(),
            ..Config::default()
        };
        assert_eq!(config.level_filter(), LevelFilter::Info);
    }

    #[test]
    fn test_log_output_keeps_stdout_free() {
        let config = Config::default();
        assert!(matches!(LogOutput::open(&config.log_output), LogOutput::Stderr(_)));
        assert!(matches!(LogOutput::open("stdout"), LogOutput::Stdout(_)));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blmx.log");
        let mut output = LogOutput::open(path.to_str().unwrap());
        writeln!(output.writer(), "WARN - x").unwrap();
        output.writer().flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "WARN - x\n");
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"num_threads": 3, "image_cache_dir": "/tmp/x"}"#).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.num_threads, 3);
        assert_eq!(config.image_cache_dir(), PathBuf::from("/tmp/x"));
    }
}

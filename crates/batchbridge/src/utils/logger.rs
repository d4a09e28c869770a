use log::Level;
use std::io::Write;

/// Crates whose records are shown at `-v`
const NAMESPACES: &[&str] = &["batchbridge", "batchbridge_config", "bridge_core", "deno_channel"];

pub fn init_logger(quiet: bool, verbose: u8) {
    let level = if quiet {
        log::Level::Error
    } else if verbose == 0 {
        log::Level::Info
    } else if verbose == 1 {
        log::Level::Debug
    } else {
        log::Level::Trace
    };

    let mut builder = env_logger::builder();

    if level == log::Level::Trace {
        builder.filter_level(level.to_level_filter());
    } else {
        for namespace in NAMESPACES {
            builder.filter_module(namespace, level.to_level_filter());
        }
        if level != log::Level::Debug {
            // info, warn, error
            builder.format(|buf, record| {
                if record.level() == Level::Info {
                    writeln!(buf, "{}", record.args())
                } else {
                    let log_style = buf.default_level_style(record.level());
                    writeln!(
                        buf,
                        "{log_style}[{}]{log_style:#} {}",
                        record.level(),
                        record.args()
                    )
                }
            });
        }
    }

    let _ = builder.try_init();
}

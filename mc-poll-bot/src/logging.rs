use std::path::Path;
use time::format_description::FormatItem;

const DISCORD_TARGETS: &[&str] = &["twilight_http", "twilight_gateway", "twilight_model"];
const SELF_TARGETS: &[&str] = &["mc_poll_bot", "mc_poll_bot_lib"];

/// Formats the current local time, falling back to a marker if the local
/// offset can't be determined
fn formatted_time_now(format: &[FormatItem]) -> String {
    time::OffsetDateTime::now_local()
        .ok()
        .and_then(|datetime| datetime.format(format).ok())
        .unwrap_or_else(|| String::from("time error"))
}

pub fn setup_logger<P: AsRef<Path>>(
    logfile_path: P,
    log_level_all: log::Level,
    log_level_self: log::Level,
    log_level_discord: log::Level,
) -> Result<(), fern::InitError> {
    let mut file_logger = fern::Dispatch::new()
        .format(|out, message, record| {
            const LOG_TIMESTAMP_FORMAT: &[FormatItem] = time::macros::format_description!(
                "[[[month]-[day]-[year]][[[hour repr:12 padding:none]:[minute]:[second] [period]]"
            );

            out.finish(format_args!(
                "{}[{}][{}] {}",
                formatted_time_now(LOG_TIMESTAMP_FORMAT),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log_level_all.to_level_filter());

    for target in DISCORD_TARGETS {
        file_logger = file_logger.level_for(*target, log_level_discord.to_level_filter());
    }
    for target in SELF_TARGETS {
        file_logger = file_logger.level_for(*target, log_level_self.to_level_filter());
    }

    let mut stdout_logger = fern::Dispatch::new()
        .format(|out, message, record| {
            const CONSOLE_TIMESTAMP_FORMAT: &[FormatItem] = time::macros::format_description!(
                "[hour repr:12 padding:none]:[minute]:[second] [period]"
            );

            out.finish(format_args!(
                "[{}] [{}, {}]: {}",
                formatted_time_now(CONSOLE_TIMESTAMP_FORMAT),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Error);

    for target in DISCORD_TARGETS {
        stdout_logger = stdout_logger.level_for(*target, log::LevelFilter::Warn);
    }
    for target in SELF_TARGETS {
        stdout_logger = stdout_logger.level_for(*target, log::LevelFilter::Info);
    }

    fern::Dispatch::new()
        .chain(stdout_logger.chain(std::io::stdout()))
        .chain(file_logger.chain(fern::log_file(logfile_path)?))
        .apply()?;

    Ok(())
}

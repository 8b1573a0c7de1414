// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use std::path::Path;

use log::debug;
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

use crate::cli::LogLevel;

pub fn get_logger_pattern() -> PatternEncoder {
    PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S%.3f)} - {l} - {m}\n")
}

pub fn build_file_logger_config(log_file: &Path, log_level: LogLevel) -> anyhow::Result<Config> {
    let file_appender = FileAppender::builder()
        .encoder(Box::new(get_logger_pattern()))
        .build(log_file)?;

    Ok(Config::builder()
        .appender(Appender::builder().build("file", Box::new(file_appender)))
        .build(Root::builder().appender("file").build(log_level.to_level_filter()))?)
}

/// Log to `log_file` through log4rs when given, to stderr through env_logger otherwise.
/// `DOCKFLOW_LOG` overrides the level of the stderr logger.
pub fn init_logger(log_file: Option<&Path>, log_level: LogLevel) -> anyhow::Result<()> {
    match log_file {
        Some(log_file) => {
            if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            log4rs::init_config(build_file_logger_config(log_file, log_level)?)?;
        }
        None => {
            env_logger::Builder::from_env(
                env_logger::Env::default()
                    .filter_or("DOCKFLOW_LOG", log_level.to_string())
                    .write_style("DOCKFLOW_LOG_STYLE"),
            )
            .init();
        }
    }
    debug!("Logger initialized with level: {}", log_level);
    Ok(())
}

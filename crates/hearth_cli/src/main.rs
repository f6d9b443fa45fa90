//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `hearth_core` linkage and configuration loading.
//! - Optionally open the configured registry database and report its schema.

use hearth_core::db::migrations::{latest_version, schema_version};
use hearth_core::db::{open_db, open_db_in_memory};
use hearth_core::{CoreConfig, SqliteHouseholdRegistry};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("hearth_core ping={}", hearth_core::ping());
    println!("hearth_core version={}", hearth_core::core_version());

    let config = match CoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("hearth config error: {err}");
            return ExitCode::FAILURE;
        }
    };
    match config.init_logging() {
        Ok(true) => {
            if let Some(settings) = hearth_core::logging_status() {
                println!(
                    "hearth_core logging level={} dir={}",
                    settings.level,
                    settings.dir.display()
                );
            }
        }
        Ok(false) => println!("hearth_core logging=off"),
        Err(err) => {
            eprintln!("hearth logging error: {err}");
            return ExitCode::FAILURE;
        }
    }

    let opened = match &config.db_path {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    };
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("hearth db error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match schema_version(&conn) {
        Ok(version) => println!(
            "hearth_core schema_version={version} supported={}",
            latest_version()
        ),
        Err(err) => {
            eprintln!("hearth db error: {err}");
            return ExitCode::FAILURE;
        }
    }

    match SqliteHouseholdRegistry::new(&conn).count_households() {
        Ok(households) => {
            println!("hearth_core households={households}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("hearth registry error: {err}");
            ExitCode::FAILURE
        }
    }
}

use clap::Parser;
use std::io::{self, BufRead, Write};
use uart_matmul::config::cli::LogFormat;
use uart_matmul::config::serial;
use uart_matmul::utils::error::{ErrorSeverity, UartError};
use uart_matmul::utils::{logger, validation};
use uart_matmul::{CliConfig, DeviceOpener, MatmulEngine, MatrixGenerator, SerialSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    match config.log_format {
        LogFormat::Compact => logger::init_cli_logger(config.verbose),
        LogFormat::Json => logger::init_json_logger(config.verbose),
    }

    tracing::info!("Starting uart-matmul");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if config.list_ports {
        print_ports()?;
        return Ok(());
    }

    let settings = match config.resolve_settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    // 大小在任何裝置 I/O 之前驗證
    let size = match config.requested_size(&settings) {
        Some(size) => size,
        None => match prompt_matrix_size() {
            Ok(size) => size.get() as i64,
            Err(e) => exit_with(&e),
        },
    };
    if let Err(e) = uart_matmul::domain::model::MatrixSize::new(size) {
        exit_with(&e);
    }

    let opener = DeviceOpener::from_settings(&settings);
    let session = SerialSession::new(opener, settings.clone());
    let engine = MatmulEngine::new(session, MatrixGenerator::new(settings.seed))
        .with_verification(settings.verify)
        .with_timing(settings.timing);

    match engine.run(size).await {
        Ok(report) => {
            if let Some(path) = &settings.report_path {
                let json = serde_json::to_string_pretty(&report)?;
                std::fs::write(path, json)?;
                tracing::info!("📁 Session report saved to: {}", path);
                println!("📁 Session report saved to: {}", path);
            }

            if let Err(e) = report.outcome.into_result() {
                tracing::warn!("⚠️ Session incomplete: {}", e);
                eprintln!("💡 建議: {}", e.recovery_suggestion());
                std::process::exit(2);
            }

            if report.verification.is_some_and(|v| !v.matched) {
                std::process::exit(4);
            }
        }
        Err(e) => exit_with(&e),
    }

    Ok(())
}

fn prompt_matrix_size() -> uart_matmul::Result<uart_matmul::domain::model::MatrixSize> {
    print!("Enter matrix size (2-10): ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    validation::parse_matrix_size(&line)
}

fn print_ports() -> Result<(), Box<dyn std::error::Error>> {
    let ports = serial::list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{:<24} {}", port.name, port.kind);
    }
    Ok(())
}

fn exit_with(e: &UartError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Session failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}

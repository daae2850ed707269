use clap::Parser;
use std::time::Duration;
use uart_matmul::config::{DEFAULT_BAUD_RATE, DEFAULT_PORT};
use uart_matmul::core::probe::{random_operands, ProbeSettings};
use uart_matmul::domain::model::ProbeOutcome;
use uart_matmul::utils::logger;
use uart_matmul::{AdderProbe, DeviceOpener};

#[derive(Parser)]
#[command(name = "uart-probe")]
#[command(about = "UART smoke test: send two operands to the FPGA adder and read back the sum")]
struct Args {
    /// Serial port (COM3, /dev/ttyUSB0) or tcp://host:port bridge
    #[arg(short, long, default_value = DEFAULT_PORT)]
    port: String,

    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// First operand (0-29); random when omitted
    #[arg(long)]
    first: Option<u8>,

    /// Second operand (0-29); random when omitted
    #[arg(long)]
    second: Option<u8>,

    /// Wait after each operand for the FPGA acknowledgement LED
    #[arg(long, default_value_t = 5000)]
    ack_delay_ms: u64,

    #[arg(long, default_value_t = 1000)]
    read_timeout_ms: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);

    let (random_first, random_second) = random_operands();
    let first = args.first.unwrap_or(random_first);
    let second = args.second.unwrap_or(random_second);

    let settings = ProbeSettings {
        ack_delay: Duration::from_millis(args.ack_delay_ms),
        read_timeout: Duration::from_millis(args.read_timeout_ms),
    };
    let opener = DeviceOpener::new(args.port.clone(), args.baud, settings.read_timeout);
    let probe = AdderProbe::new(opener, settings);

    tracing::info!("🔌 Probing {} at {} baud", args.port, args.baud);

    match probe.run(first, second).await {
        Ok(report) => match report.outcome {
            ProbeOutcome::Result(value) => {
                println!("Result received: {}", value);
                if !report.matches_sum() {
                    println!(
                        "⚠️ Expected {} + {} = {}",
                        first,
                        second,
                        first as u16 + second as u16
                    );
                    std::process::exit(4);
                }
            }
            ProbeOutcome::NoResponse => {
                println!("No response from FPGA.");
                std::process::exit(2);
            }
        },
        Err(e) => {
            tracing::error!("❌ Probe failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    }

    Ok(())
}

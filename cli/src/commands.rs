pub mod scan;

use clap::{ArgAction, Args, Parser, Subcommand};
use portr_common::network::ports::PortList;
use portr_common::network::target::TargetSpec;
use portr_common::scan::Strategy;

#[derive(Parser)]
#[command(name = "portr", version)]
#[command(about = "A multi-strategy IPv4 port scanner.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// More diagnostics (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Less output (-q drops headers, -qq prints only open ports)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Skip the startup banner
    #[arg(long, global = true)]
    pub no_banner: bool,

    /// Mask addresses in the output
    #[arg(long, global = true)]
    pub redact: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the ports of a single host
    #[command(alias = "s")]
    Scan(ScanArgs),
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// IPv4 address or host name
    pub target: TargetSpec,

    /// Ports to probe, e.g. 22,53,80-90
    #[arg(short, long, default_value = "1-1024")]
    pub ports: PortList,

    /// syn, ack, tcp or udp (syn when raw sockets are available, tcp otherwise)
    #[arg(short = 's', long = "scan-type")]
    pub strategy: Option<Strategy>,

    /// Reply deadline for SYN and ACK probes, in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// TCP handshake deadline, in milliseconds
    #[arg(long, value_name = "MS")]
    pub connect_timeout: Option<u64>,

    /// Banner read deadline after a connect, in milliseconds
    #[arg(long, value_name = "MS")]
    pub banner_timeout: Option<u64>,

    /// ARP reply deadline, in milliseconds
    #[arg(long, value_name = "MS")]
    pub arp_timeout: Option<u64>,

    /// Upper bound on probes in flight
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub max_parallel: Option<usize>,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_is_well_formed() {
        CommandLine::command().debug_assert();
    }

    #[test]
    fn scan_arguments_parse() {
        let cli = CommandLine::try_parse_from([
            "portr", "-vv", "scan", "127.0.0.1", "-p", "22,80-82", "-s", "tcp", "--connect-timeout", "500",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Scan(args) = cli.command;
        assert_eq!(args.ports.as_slice(), &[22, 80, 81, 82]);
        assert_eq!(args.strategy, Some(Strategy::TcpConnect));
        assert_eq!(args.connect_timeout, Some(500));
        assert_eq!(args.timeout, None);
    }

    #[test]
    fn bad_port_list_is_rejected() {
        assert!(CommandLine::try_parse_from(["portr", "scan", "127.0.0.1", "-p", "90-80"]).is_err());
    }
}

use clap::{Parser, Subcommand};

use esmi::{BandwidthType, Esmi, EsmiError, LinuxHost, Result};

#[derive(Parser, Debug)]
#[command(name = "esmi")]
#[command(about = "AMD EPYC system management: HSMP mailbox and energy telemetry")]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[arg(
        short,
        long,
        global = true,
        help = "Enable verbose logging (shows every MSR read and HSMP exchange)"
    )]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Platform, protocol and per-socket overview
    Summary,

    /// Accumulated energy of every core and socket
    Energy,

    /// Socket power, power cap and maximum cap
    Power {
        #[arg(long, help = "Socket index (default: all sockets)")]
        socket: Option<u32>,
    },

    /// Set a socket power cap in milliwatts (clamped to the maximum)
    SetPowerCap {
        #[arg(long)]
        socket: u32,
        #[arg(help = "Power cap in mW")]
        cap_mw: u32,
    },

    /// Read or set a core boost limit
    Boost {
        #[arg(long)]
        core: u32,
        #[arg(long, help = "New boost limit in MHz")]
        set: Option<u32>,
    },

    /// DDR bandwidth per socket
    Ddr,

    /// xGMI link bandwidth in Mbps
    Xgmi {
        #[arg(long)]
        socket: u32,
        #[arg(long, help = "Link name, e.g. G0")]
        link: String,
        #[arg(long, default_value = "aggregate", help = "aggregate, read or write")]
        kind: String,
    },

    /// Mailbox loop-back test on every socket
    Test {
        #[arg(default_value_t = 41)]
        value: u32,
    },
}

fn print_summary(esmi: &Esmi<LinuxHost>) -> Result<()> {
    let topology = esmi.topology()?;
    println!("Platform:          {}", esmi.platform()?.name());
    println!(
        "CPU family/model:  0x{:X}/0x{:X}",
        esmi.cpu_family()?,
        esmi.cpu_model()?
    );
    println!("Sockets:           {}", topology.sockets);
    println!("CPUs:              {}", topology.core_count());
    println!("Threads per core:  {}", topology.threads_per_core);
    println!("Energy path:       {}", esmi.energy_path()?.name());

    let protocol = match esmi.protocol_version() {
        Ok(version) => version,
        Err(e) => {
            println!("HSMP protocol:     unavailable ({e})");
            return Ok(());
        }
    };
    println!("HSMP protocol:     {}", protocol.raw());

    for socket in 0..topology.sockets {
        println!("\nSocket {socket}");
        report("  SMU firmware", esmi.smu_firmware_version(socket).map(|v| {
            format!("{}.{}.{}", v.major, v.minor, v.debug)
        }));
        report("  Power (mW)", esmi.socket_power(socket));
        report("  Power cap (mW)", esmi.power_cap(socket));
        report("  Temperature (m°C)", esmi.socket_temperature(socket));
        report("  C0 residency (%)", esmi.c0_residency(socket));
        report(
            "  Frequency limit",
            esmi.current_freq_limit(socket)
                .map(|l| format!("{} MHz [{}]", l.freq_mhz, l.source_names().join(", "))),
        );
    }
    Ok(())
}

fn report<T: std::fmt::Display>(label: &str, value: Result<T>) {
    match value {
        Ok(v) => println!("{label:<22} {v}"),
        Err(EsmiError::UnsupportedCommand(_)) => println!("{label:<22} not supported"),
        Err(e) => println!("{label:<22} error: {e}"),
    }
}

fn run(esmi: &Esmi<LinuxHost>, command: Command) -> Result<()> {
    match command {
        Command::Summary => print_summary(esmi)?,
        Command::Energy => {
            let topology = esmi.topology()?;
            let energies = esmi.all_energies()?;
            let physical = topology.physical_cores() as usize;
            for (index, uj) in energies.iter().enumerate() {
                if index < physical {
                    println!("core {index:<4} {:>16.3} J", *uj as f64 / 1e6);
                } else {
                    println!("socket {:<2} {:>16.3} J", index - physical, *uj as f64 / 1e6);
                }
            }
        }
        Command::Power { socket } => {
            let sockets = match socket {
                Some(s) => s..s + 1,
                None => 0..esmi.number_of_sockets()?,
            };
            for s in sockets {
                println!(
                    "socket {s}: power {} mW, cap {} mW, max cap {} mW",
                    esmi.socket_power(s)?,
                    esmi.power_cap(s)?,
                    esmi.power_cap_max(s)?
                );
            }
        }
        Command::SetPowerCap { socket, cap_mw } => {
            let update = esmi.set_power_cap(socket, cap_mw)?;
            if update.clamped() {
                println!(
                    "socket {socket}: requested {} mW exceeds maximum, cap set to {} mW",
                    update.requested_mw, update.effective_mw
                );
            } else {
                println!("socket {socket}: cap set to {} mW", update.effective_mw);
            }
        }
        Command::Boost { core, set } => {
            if let Some(freq) = set {
                esmi.set_core_boostlimit(core, freq)?;
            }
            println!("core {core}: boost limit {} MHz", esmi.core_boostlimit(core)?);
        }
        Command::Ddr => {
            for s in 0..esmi.number_of_sockets()? {
                let bw = esmi.ddr_bandwidth(s)?;
                println!(
                    "socket {s}: max {} Gbps, utilized {} Gbps ({}%)",
                    bw.max_gbps, bw.utilized_gbps, bw.utilized_percent
                );
            }
        }
        Command::Xgmi { socket, link, kind } => {
            let bandwidth_type = BandwidthType::from_name(&kind)
                .ok_or_else(|| EsmiError::InvalidInput(format!("unknown bandwidth type {kind:?}")))?;
            let mbps = esmi.xgmi_bandwidth(socket, &link, bandwidth_type)?;
            println!("socket {socket} {link} {}: {mbps} Mbps", bandwidth_type.name());
        }
        Command::Test { value } => {
            for s in 0..esmi.number_of_sockets()? {
                println!("socket {s}: {value} -> {}", esmi.test_mailbox(s, value)?);
            }
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();

    let mut esmi = Esmi::new(LinuxHost::auto_detect());

    match esmi.init() {
        Ok(status) => tracing::info!("Init status: {:?}", status),
        Err(e) => {
            eprintln!("esmi: initialization failed: {e} ({})", e.status());
            std::process::exit(1);
        }
    }

    let result = run(&esmi, args.command);
    esmi.shutdown();

    if let Err(e) = result {
        eprintln!("esmi: {e} ({})", e.status());
        std::process::exit(e.status().code() as i32);
    }
}

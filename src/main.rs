use alsa::Direction;
use alsa_adapter_hal::audio::ctl_write::{parse_ctl_id, parse_ctl_value};
use alsa_adapter_hal::{AlsaHal, Config};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::signal;

#[derive(Parser)]
#[command(name = "alsa-adapter-hal")]
#[command(about = "Inspect and drive the board's ALSA audio adapters", long_about = None)]
#[command(version)]
struct Cli {
    /// Adapter JSON file instead of the built-in path
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the build-time settings as JSON
    Settings,
    /// List the adapters available now
    List,
    /// Open an adapter and hold it until Ctrl+C
    Open(OpenArgs),
}

#[derive(Args, Debug)]
struct OpenArgs {
    /// Adapter name, e.g. primary, hdmi, usb
    adapter: String,

    /// Capture side instead of render
    #[arg(long)]
    capture: bool,

    /// Set the normalized volume
    #[arg(long, allow_negative_numbers = true)]
    volume: Option<i64>,

    /// Turn the mute switch on
    #[arg(long, conflicts_with = "unmute")]
    mute: bool,

    /// Turn the mute switch off
    #[arg(long)]
    unmute: bool,

    /// Write a control element, e.g. --ctl "name='Speaker Switch'" on
    #[arg(long, num_args = 2, value_names = ["ID", "VALUE"])]
    ctl: Option<Vec<String>>,

    /// Open the PCM with the default stream settings
    #[arg(long)]
    stream: bool,
}

impl OpenArgs {
    fn mute(&self) -> Option<bool> {
        match (self.mute, self.unmute) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

fn open_adapter(hal: &mut AlsaHal, args: &OpenArgs) -> anyhow::Result<()> {
    let direction = if args.capture {
        Direction::Capture
    } else {
        Direction::Playback
    };
    let name = args.adapter.as_str();

    let selected = hal
        .card_info(name, direction)
        .with_context(|| format!("No sound card for adapter {}", name))?;
    println!(
        "{}: {} (card id {}, control {})",
        name, selected.dev_name, selected.alsa_card_id, selected.ctrl_name
    );

    hal.init_mixer(name, direction)
        .with_context(|| format!("Failed to bind mixer of {}", name))?;

    if let Some(volume) = args.volume {
        hal.set_volume(name, direction, volume)?;
    }
    if let Some(mute) = args.mute() {
        hal.set_mute(name, direction, mute)?;
    }
    match hal.get_volume(name, direction) {
        Ok(volume) => println!("{} {:?} volume: {}", name, direction, volume),
        Err(e) => println!("{} {:?} volume: unavailable ({})", name, direction, e),
    }

    if let Some([id, value]) = args.ctl.as_deref() {
        let id = parse_ctl_id(id)?;
        let value = parse_ctl_value(value)?;
        hal.write_control(name, &id, value)?;
    }

    if args.stream {
        let params = hal.default_stream_params();
        let negotiated = hal.open_stream(name, direction, &params)?;
        println!("{} {:?} stream open: {:?}", name, direction, negotiated);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::init();

    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::new().unwrap_or_default();
    if let Some(path) = cli.config {
        config = config.with_adapter_config_file(path);
    }
    log::info!(
        "{} {} on {} ({}), adapters from {}",
        config.app_name,
        config.app_version,
        config.board_name,
        config.board_type,
        config.adapter_config_file.display()
    );

    let mut hal = AlsaHal::new(config);

    match cli.command {
        Command::Settings => {
            println!("{}", serde_json::to_string_pretty(hal.config())?);
        }
        Command::List => {
            let adapters = hal.all_adapters().context("Failed to list adapters")?;
            for card in hal.cards().entries() {
                log::info!(
                    "hw:{},{} {} ({})",
                    card.card,
                    card.device,
                    card.card_id,
                    card.pcm_id
                );
            }
            for adapter in &adapters {
                let ports: Vec<&str> = adapter.ports.iter().map(|p| p.port_name.as_str()).collect();
                println!("{}: {}", adapter.adapter_name, ports.join(" "));
            }
        }
        Command::Open(args) => {
            hal.card_instance(&args.adapter)?;
            let result = open_adapter(&mut hal, &args);
            if result.is_ok() {
                println!("Holding {} open, press Ctrl+C to release", args.adapter);
                signal::ctrl_c().await?;
                println!("Received Ctrl+C, shutting down...");
            }
            // 无论成功与否都释放声卡实例
            hal.release(&args.adapter)?;
            hal.destroy()?;
            result?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_open_with_options() {
        let cli = Cli::try_parse_from([
            "alsa-adapter-hal",
            "open",
            "primary",
            "--capture",
            "--volume",
            "40",
            "--mute",
            "--ctl",
            "name='Speaker Switch'",
            "on",
            "--config",
            "/tmp/adapters.json",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/adapters.json")));
        let Command::Open(args) = cli.command else {
            panic!("expected open");
        };
        assert_eq!(args.adapter, "primary");
        assert!(args.capture);
        assert_eq!(args.volume, Some(40));
        assert_eq!(args.mute(), Some(true));
        assert_eq!(
            args.ctl.as_deref(),
            Some(&["name='Speaker Switch'".to_string(), "on".to_string()][..])
        );
        assert!(!args.stream);
    }

    #[test]
    fn mute_flags_conflict() {
        assert!(Cli::try_parse_from(["alsa-adapter-hal", "open", "usb", "--mute", "--unmute"]).is_err());
        let cli = Cli::try_parse_from(["alsa-adapter-hal", "open", "usb", "--unmute"]).unwrap();
        let Command::Open(args) = cli.command else {
            panic!("expected open");
        };
        assert_eq!(args.mute(), Some(false));
    }

    #[test]
    fn open_needs_an_adapter() {
        assert!(Cli::try_parse_from(["alsa-adapter-hal", "open"]).is_err());
        assert!(Cli::try_parse_from(["alsa-adapter-hal"]).is_err());
        assert!(matches!(
            Cli::try_parse_from(["alsa-adapter-hal", "list"]).unwrap().command,
            Command::List
        ));
    }
}

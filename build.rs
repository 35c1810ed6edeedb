use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    board: Board,
    adapter: Adapter,
    volume: Volume,
    stream: Stream,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Board {
    #[serde(rename = "type")]
    type_: String,
    name: String,
}

#[derive(Deserialize)]
struct Adapter {
    config_file: String,
    config_max_bytes: u64,
    default_device: i32,
}

#[derive(Deserialize)]
struct Volume {
    min: i64,
    max: i64,
}

#[derive(Deserialize)]
struct Stream {
    sample_rate: u32,
    channels: u32,
    period_size: usize,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    if config.volume.min >= config.volume.max {
        panic!("config.toml: volume.min must be below volume.max");
    }

    // 应用和板子信息
    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);
    println!("cargo:rustc-env=BOARD_TYPE={}", config.board.type_);
    println!("cargo:rustc-env=BOARD_NAME={}", config.board.name);

    // Adapter configuration
    println!("cargo:rustc-env=ADAPTER_CONFIG_FILE={}", config.adapter.config_file);
    println!("cargo:rustc-env=ADAPTER_CONFIG_MAX_BYTES={}", config.adapter.config_max_bytes);
    println!("cargo:rustc-env=ADAPTER_DEFAULT_DEVICE={}", config.adapter.default_device);

    // Mixer volume range
    println!("cargo:rustc-env=VOLUME_MIN={}", config.volume.min);
    println!("cargo:rustc-env=VOLUME_MAX={}", config.volume.max);

    // PCM stream defaults
    println!("cargo:rustc-env=STREAM_SAMPLE_RATE={}", config.stream.sample_rate);
    println!("cargo:rustc-env=STREAM_CHANNELS={}", config.stream.channels);
    println!("cargo:rustc-env=STREAM_PERIOD_SIZE={}", config.stream.period_size);
}

use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, Serialize, Clone)]
pub struct Config {
    // 应用和板子信息
    pub app_name: &'static str,
    pub app_version: &'static str,
    pub board_type: &'static str,
    pub board_name: &'static str,

    // Adapter configuration file
    pub adapter_config_file: PathBuf,
    pub adapter_config_max_bytes: u64,
    /// PCM device opened on the matched card, render and capture alike
    pub default_device: i32,

    // Normalized mixer volume range
    pub volume_min: i64,
    pub volume_max: i64,

    // PCM stream defaults
    pub stream_sample_rate: u32,
    pub stream_channels: u32,
    pub stream_period_size: usize,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            app_name: env!("APP_NAME"),
            app_version: env!("APP_VERSION"),
            board_type: env!("BOARD_TYPE"),
            board_name: env!("BOARD_NAME"),

            adapter_config_file: PathBuf::from(env!("ADAPTER_CONFIG_FILE")),
            adapter_config_max_bytes: env!("ADAPTER_CONFIG_MAX_BYTES").parse()
                .map_err(|_| "Failed to parse ADAPTER_CONFIG_MAX_BYTES")?,
            default_device: env!("ADAPTER_DEFAULT_DEVICE").parse()
                .map_err(|_| "Failed to parse ADAPTER_DEFAULT_DEVICE")?,

            volume_min: env!("VOLUME_MIN").parse()
                .map_err(|_| "Failed to parse VOLUME_MIN")?,
            volume_max: env!("VOLUME_MAX").parse()
                .map_err(|_| "Failed to parse VOLUME_MAX")?,

            stream_sample_rate: env!("STREAM_SAMPLE_RATE").parse()
                .map_err(|_| "Failed to parse STREAM_SAMPLE_RATE")?,
            stream_channels: env!("STREAM_CHANNELS").parse()
                .map_err(|_| "Failed to parse STREAM_CHANNELS")?,
            stream_period_size: env!("STREAM_PERIOD_SIZE").parse()
                .map_err(|_| "Failed to parse STREAM_PERIOD_SIZE")?,
        })
    }

    /// Same settings, different adapter JSON file.
    pub fn with_adapter_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.adapter_config_file = path.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new().expect("Failed to create default Config from build-time environment variables")
    }
}

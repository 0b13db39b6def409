use num_cpus;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use crate::param::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_REQUEST_LINE};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_gopher_root")]
    gopher_root: String,
    #[serde(default = "default_hostname")]
    hostname: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default)]
    enable_scripts: bool,
    #[serde(default = "default_max_request_line")]
    max_request_line: usize,
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
}

fn default_gopher_root() -> String {
    ".".to_string()
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    70
}

fn default_local() -> bool {
    true
}

fn default_max_request_line() -> usize {
    DEFAULT_MAX_REQUEST_LINE
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Config {
    pub fn new() -> Self {
        Self {
            gopher_root: default_gopher_root(),
            hostname: default_hostname(),
            port: default_port(),
            worker_threads: 0,
            local: default_local(),
            enable_scripts: false,
            max_request_line: default_max_request_line(),
            chunk_size: default_chunk_size(),
        }
    }

    pub fn from_toml(filename: &str) -> Self {
        let mut str_val = String::new();
        let read_result = File::open(filename).and_then(|mut f| f.read_to_string(&mut str_val));
        let mut raw_config = match read_result {
            Ok(_) => Self::from_toml_str(&str_val),
            Err(e) => {
                error!("无法读取配置文件{}：{}，使用默认配置", filename, e);
                Config::new()
            }
        };
        raw_config.normalize();
        raw_config
    }

    fn from_toml_str(s: &str) -> Self {
        match toml::from_str(s) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                Config::new()
            }
        }
    }

    fn normalize(&mut self) {
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.max_request_line == 0 {
            warn!("max_request_line被设置为0，该值将被改为{}。", DEFAULT_MAX_REQUEST_LINE);
            self.max_request_line = DEFAULT_MAX_REQUEST_LINE;
        }
        if self.chunk_size == 0 {
            warn!("chunk_size被设置为0，该值将被改为{}。", DEFAULT_CHUNK_SIZE);
            self.chunk_size = DEFAULT_CHUNK_SIZE;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn gopher_root(&self) -> &str {
        &self.gopher_root
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn enable_scripts(&self) -> bool {
        self.enable_scripts
    }

    pub fn max_request_line(&self) -> usize {
        self.max_request_line
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

/// 请求处理引擎所需的只读上下文。
///
/// 启动时由 `Config` 构建一次，之后通过 `Arc` 在所有连接任务之间共享，不再修改。
#[derive(Debug, Clone)]
pub struct ServerContext {
    hostname: String,
    port: u16,
    root: PathBuf,
    enable_scripts: bool,
    chunk_size: usize,
}

impl ServerContext {
    pub fn new(hostname: &str, port: u16, root: impl Into<PathBuf>, enable_scripts: bool) -> Self {
        Self {
            hostname: hostname.to_string(),
            port,
            root: root.into(),
            enable_scripts,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size(),
            ..Self::new(
                config.hostname(),
                config.port(),
                config.gopher_root(),
                config.enable_scripts(),
            )
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn enable_scripts(&self) -> bool {
        self.enable_scripts
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// 将选择子映射到根目录下的物理路径。
    ///
    /// 选择子开头多余的 `/` 会被忽略，拼接结果永远不会变成绝对路径。
    pub fn resolve(&self, selector: &str) -> PathBuf {
        self.root.join(selector.trim_start_matches('/'))
    }
}

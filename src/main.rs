// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 异步 Gopher 服务器
//!
//! 该模块实现了基于 Tokio 运行时的多线程 Gopher 服务器。
//! 核心功能包括：
//! - 将目录树映射为可浏览的菜单（支持页眉、页脚、倒序与索引文件）
//! - Markdown 到菜单的转译
//! - 可执行对象的动态内容（可通过配置禁用）
//! - 每个连接一个轻量级任务，只共享只读的服务器上下文

use gopherserver::{
    config::{Config, ServerContext},
    param::{CONFIG_PATH, LOG_CONFIG_PATH},
    server::accept_loop,
};

use log::{error, info, warn};
use log4rs;
use tokio::{net::TcpListener, runtime::Builder};

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    process::ExitCode,
    sync::Arc,
};

/// # 程序入口点
///
/// 初始化日志、加载配置、按配置构建运行时并启动主事件循环。
fn main() -> ExitCode {
    // 1. 初始化日志系统：通过外部 YAML 配置级别与输出目的地
    if let Err(e) = log4rs::init_file(LOG_CONFIG_PATH, Default::default()) {
        eprintln!("无法载入日志配置{}：{}，日志将不会被记录", LOG_CONFIG_PATH, e);
    }

    // 2. 环境配置加载：从 TOML 文件读取运行参数
    let config = Config::from_toml(CONFIG_PATH);
    info!("配置文件已载入");
    info!("gopher root: {}", config.gopher_root());

    // 3. 异步运行时定制：根据配置文件分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(r) => r,
        Err(e) => {
            error!("无法构建Tokio运行时：{}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::FAILURE,
    }
}

/// # 主事件循环
///
/// 持续接收新连接，每个连接分发到独立的任务中处理，直到收到 Ctrl-C。
async fn serve(config: Config) -> Result<(), ()> {
    let ctx = Arc::new(ServerContext::from_config(&config));
    if ctx.enable_scripts() {
        warn!("已启用可执行对象，.gobj 文件将在服务器上直接运行");
    }

    // 支持全地址监听 (0.0.0.0) 或本地回环监听 (127.0.0.1)
    let port = config.port();
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    let socket = SocketAddrV4::new(address, port);

    let listener = match TcpListener::bind(socket).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定{}，错误：{}", socket, e);
            return Err(());
        }
    };
    info!("服务端将在{}上监听Socket连接，菜单中通告的主机为{}:{}", socket, ctx.hostname(), ctx.port());

    let served = accept_loop(listener, ctx, config.max_request_line(), tokio::signal::ctrl_c()).await;
    info!("共处理{}个连接", served);
    Ok(())
}

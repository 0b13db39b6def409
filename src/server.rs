// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接处理
//!
//! 每个 TCP 连接只处理一个请求：读取请求行、记录访问日志、生成响应、关闭连接。

use std::{future::Future, sync::Arc, time::Instant};

use log::{debug, error, info};
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};

use crate::{
    config::ServerContext,
    menu::error_response,
    request::read_request_line,
    response::Responder,
};

/// # 连接处理器
///
/// 负责单个 TCP 流的生命周期。请求行无法读取或过长时发送错误响应后直接关闭连接。
pub async fn handle_connection(
    mut stream: TcpStream,
    id: u128,
    ctx: &ServerContext,
    max_request_line: usize,
) {
    let peer = match stream.peer_addr() {
        Ok(addr) => addr.to_string(),
        Err(_) => "unknown".to_string(),
    };
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);

    let line = match read_request_line(&mut reader, max_request_line, id).await {
        Ok(line) => line,
        Err(e) => {
            debug!("[ID{}]无法读取请求行：{}", id, e);
            let _ = writer.write_all(error_response(e).as_bytes()).await;
            let _ = writer.shutdown().await;
            return;
        }
    };
    info!("[ID{}] {}: {}", id, peer, line);

    let start_time = Instant::now();
    if let Err(e) = Responder::new(ctx, &mut writer, id).respond(&line).await {
        error!("[ID{}]发送响应失败：{}", id, e);
        return;
    }
    debug!(
        "[ID{}]响应发送完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );
    let _ = writer.shutdown().await;
}

/// # 接收循环
///
/// 每个连接分发到独立的任务，直到 `shutdown` 完成。`shutdown` 只创建一次，
/// 在整个循环期间保持注册，接收连接不会使其重置。返回分配出的连接数。
pub async fn accept_loop<F>(
    listener: TcpListener,
    ctx: Arc<ServerContext>,
    max_request_line: usize,
    shutdown: F,
) -> u128
where
    F: Future,
{
    tokio::pin!(shutdown);
    let mut id: u128 = 0;
    loop {
        let (stream, addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    error!("无法接受连接：{}", e);
                    continue;
                }
            },
            _ = &mut shutdown => {
                info!("收到停机指令，正在退出...");
                break;
            }
        };
        debug!("[ID{}]新的连接：{}", id, addr);

        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            handle_connection(stream, id, &ctx, max_request_line).await;
        });
        id += 1;
    }
    id
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求处理模块
//!
//! 菜单协议的请求只有一行：客户端发送一个选择子（可以为空），以换行结尾。
//! 该模块负责：
//! 1. 在长度上限内从连接中读取请求行。
//! 2. 对选择子进行规范化与路径遍历校验。
//! 3. 判断请求的是目录列表还是文件。

use crate::exception::Exception;
use log::{error, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// 请求的目标类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// 选择子为空或以 `/` 结尾
    Directory,
    File,
}

/// 一个经过校验的请求。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// 去掉开头 `/` 后的选择子，相对于根目录
    selector: String,
    kind: RequestKind,
}

/// 从连接中读取一行请求。
///
/// 最多读取 `limit` 字节；在此范围内未遇到换行符则判定为请求过长。
/// 返回的字符串已去掉行尾的 `\n` 以及可选的 `\r`。
pub async fn read_request_line<R>(reader: &mut R, limit: usize, id: u128) -> Result<String, Exception>
where
    R: AsyncBufRead + Unpin,
{
    let mut buffer = Vec::new();
    let mut limited = reader.take(limit as u64);
    let n = match limited.read_until(b'\n', &mut buffer).await {
        Ok(n) => n,
        Err(e) => {
            error!("[ID{}]读取请求行时遇到错误: {}", id, e);
            return Err(Exception::RequestUnreadable);
        }
    };
    if n == 0 {
        return Err(Exception::RequestUnreadable);
    }

    match buffer.last() {
        Some(b'\n') => {
            buffer.pop();
            if buffer.last() == Some(&b'\r') {
                buffer.pop();
            }
        }
        _ if n >= limit => {
            warn!("[ID{}]请求行超过{}字节", id, limit);
            return Err(Exception::RequestTooLong);
        }
        // 连接在换行符之前关闭，按已读到的内容处理
        _ => {}
    }

    String::from_utf8(buffer).map_err(|_| {
        error!("[ID{}]请求行不是合法的UTF-8", id);
        Exception::RequestIsNotUtf8
    })
}

fn is_traversal(s: &str) -> bool {
    s.contains("../") || s.contains("/..")
}

impl Request {
    /// 从请求行构建 `Request`。
    ///
    /// # 逻辑步骤
    /// 1. 去掉一个可选的开头 `/`。
    /// 2. 拒绝去掉 `/` 之后包含 `../` 或 `/..` 的选择子（按子串匹配），以及恰好为 `..` 的选择子。
    /// 3. 空选择子或以 `/` 结尾的选择子为目录请求，其余为文件请求。
    pub fn try_from(line: &str, id: u128) -> Result<Self, Exception> {
        let selector = line.strip_prefix('/').unwrap_or(line);

        if is_traversal(selector) || selector == ".." {
            warn!("[ID{}]拒绝包含路径遍历的请求：{}", id, line);
            return Err(Exception::PathTraversal);
        }

        let kind = if selector.is_empty() || selector.ends_with('/') {
            RequestKind::Directory
        } else {
            RequestKind::File
        };

        Ok(Self {
            selector: selector.to_string(),
            kind,
        })
    }
}

// --- Getter 访问器实现 ---

impl Request {
    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

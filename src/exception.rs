// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了 Gopher 服务器在请求处理生命周期中可能出现的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖了请求行读取错误、路径校验错误、文件系统错误以及可执行对象的运行错误。
//! - **本地恢复**：除 `ConnectionClosed` 外，每个变体都会被转换为一条类型为 `3` 的菜单行发送给客户端。
//! - **用户友好**：`Display` 的输出即为发送给客户端的错误描述。

use std::fmt;

/// 服务器处理请求过程中发生的异常类型。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 无法从连接中读取请求行（I/O 错误或连接在发送任何数据前关闭）。
    RequestUnreadable,
    /// 请求行超过了长度上限。
    RequestTooLong,
    /// 请求行不是合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 选择子包含 `../` 或 `/..`，视为目录遍历攻击。
    PathTraversal,
    /// 无法打开或读取目标目录。
    DirUnreadable,
    /// 目标文件不存在或无法打开。
    FileNotFound,
    /// 文件已打开，但读取过程中出错（例如 Markdown 文件不是合法的 UTF-8）。
    FileUnreadable,
    /// 可执行对象启动失败或以非零状态退出。
    ScriptExecuteFailed,
    /// 服务器配置禁止执行可执行对象。
    ScriptDisabled,
    /// 向客户端写入数据失败，连接已不可用。该错误不会再发送给客户端。
    ConnectionClosed,
}

use Exception::*;

impl fmt::Display for Exception {
    /// 根据错误类型写入发送给客户端的描述文本。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestUnreadable => write!(f, "Invalid request: cannot read magic string"),
            RequestTooLong => write!(f, "Invalid request: magic string too big"),
            RequestIsNotUtf8 => write!(f, "Invalid request: magic string is not valid UTF-8"),
            PathTraversal => write!(
                f,
                "Invalid request: \"../\" and \"/..\" are not allowed in magic string"
            ),
            DirUnreadable => write!(f, "Invalid request: cannot read target dir"),
            FileNotFound => write!(f, "Not found"),
            FileUnreadable => write!(f, "Cannot read file"),
            ScriptExecuteFailed => write!(f, "Script execution failed"),
            ScriptDisabled => write!(f, "Script execution is disabled on this server"),
            ConnectionClosed => write!(f, "Connection closed by peer"),
        }
    }
}

impl std::error::Error for Exception {}

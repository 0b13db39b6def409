//! # Markdown 转菜单
//!
//! 逐行处理，行与行之间相互独立：
//! - `[标签](目标)`：链接。外部链接转为 `h` 行，站内链接按目标后缀决定类型。
//! - `![说明](路径)`：图片，路径原样使用。
//! - 其他行原样作为信息行输出，包括行首行尾的空白。

use std::path::Path;

use lazy_static::lazy_static;
use log::error;
use regex::Regex;
use tokio::{
    fs::File,
    io::{AsyncWrite, BufReader},
};

use crate::{
    config::ServerContext,
    exception::Exception,
    menu::{format_line, info_line, info_line_bytes},
    param::*,
    util::{emit, parent_selector, read_raw_line},
};

lazy_static! {
    static ref LINK: Regex = Regex::new(r"^\[(.*?)\]\((.*?)\)").unwrap();
    static ref IMAGE: Regex = Regex::new(r"^!\[(.*?)\]\((.*?)\)").unwrap();
}

fn is_external(target: &str) -> bool {
    target.starts_with(LINK_SCHEME_PREFIX) || target.ends_with(LINK_HTML_SUFFIX)
}

/// 链接目标的条目类型：以 `/` 结尾视为目录
fn link_type(target: &str) -> ItemType {
    if target.ends_with('/') {
        ItemType::Menu
    } else {
        ItemType::from_name(target)
    }
}

/// 识别链接与图片行，其余行返回 `None`
fn link_line(ctx: &ServerContext, request: &str, line: &str) -> Option<String> {
    if line.starts_with('[') {
        let caps = LINK.captures(line)?;
        let label = &caps[1];
        let target = &caps[2];
        if is_external(target) {
            let selector = format!("{}{}", URL_PREFIX, target);
            return Some(format_line(ctx, ItemType::Html, label, &selector));
        }
        let selector = if target.starts_with('/') {
            target.to_string()
        } else {
            format!("{}{}", parent_selector(request), target)
        };
        Some(format_line(ctx, link_type(&selector), label, &selector))
    } else if line.starts_with("![") {
        let caps = IMAGE.captures(line)?;
        Some(format_line(ctx, ItemType::Image, &caps[1], &caps[2]))
    } else {
        None
    }
}

/// 转译一行 Markdown。`request` 是当前请求的选择子，用于解析相对链接。
pub fn transpile_line(ctx: &ServerContext, request: &str, line: &str) -> String {
    link_line(ctx, request, line).unwrap_or_else(|| info_line(line))
}

/// 转译一行原始字节。信息行保留原始字节；
/// 只有链接和图片需要解析时才把非 UTF-8 内容有损转换。
pub fn transpile_bytes(ctx: &ServerContext, request: &str, line: &[u8]) -> Vec<u8> {
    if !line.starts_with(b"[") && !line.starts_with(b"![") {
        return info_line_bytes(line);
    }
    let text = String::from_utf8_lossy(line);
    match link_line(ctx, request, &text) {
        Some(menu_line) => menu_line.into_bytes(),
        None => info_line_bytes(line),
    }
}

/// 逐行读取 Markdown 文件，转译后立即写给客户端。
///
/// 读取出错时返回 `FileUnreadable`，已经写出的行不会撤回。
pub async fn transpile_file<W>(
    ctx: &ServerContext,
    request: &str,
    path: &Path,
    sink: &mut W,
    id: u128,
) -> Result<(), Exception>
where
    W: AsyncWrite + Unpin,
{
    let file = match File::open(path).await {
        Ok(f) => f,
        Err(e) => {
            error!("[ID{}]无法打开Markdown文件{}: {}", id, path.display(), e);
            return Err(Exception::FileNotFound);
        }
    };
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    loop {
        match read_raw_line(&mut reader, &mut line).await {
            Ok(true) => emit(sink, &transpile_bytes(ctx, request, &line)).await?,
            Ok(false) => return Ok(()),
            Err(e) => {
                error!("[ID{}]读取Markdown文件{}失败: {}", id, path.display(), e);
                return Err(Exception::FileUnreadable);
            }
        }
    }
}

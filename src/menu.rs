//! # 菜单行格式化
//!
//! 每一条菜单行的格式为 `<类型><标签>\t<选择子>\t<主机名>\t<端口>\r\n`。
//! 信息行与错误行不可导航，选择子、主机名、端口固定为占位值。

use std::fmt;

use crate::{config::ServerContext, exception::Exception, param::*};

/// 一条菜单行。构建后立即序列化发送，不会被保留。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLine<'a> {
    item_type: ItemType,
    label: &'a str,
    selector: &'a str,
    hostname: &'a str,
    port: &'a str,
}

impl<'a> MenuLine<'a> {
    pub fn new(
        item_type: ItemType,
        label: &'a str,
        selector: &'a str,
        hostname: &'a str,
        port: &'a str,
    ) -> Self {
        Self {
            item_type,
            label,
            selector,
            hostname,
            port,
        }
    }

    /// 不可选择的信息行
    pub fn info(text: &'a str) -> Self {
        Self::new(
            ItemType::Info,
            text,
            PLACEHOLDER_SELECTOR,
            PLACEHOLDER_HOST,
            PLACEHOLDER_PORT,
        )
    }

    /// 错误行（不含结束行）
    pub fn error(message: &'a str) -> Self {
        Self::new(
            ItemType::Error,
            message,
            PLACEHOLDER_SELECTOR,
            PLACEHOLDER_HOST,
            PLACEHOLDER_PORT,
        )
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn label(&self) -> &str {
        self.label
    }

    pub fn selector(&self) -> &str {
        self.selector
    }
}

impl fmt::Display for MenuLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{sep}{}{sep}{}{sep}{}{}",
            self.item_type,
            self.label,
            self.selector,
            self.hostname,
            self.port,
            CRLF,
            sep = FIELD_SEPARATOR,
        )
    }
}

/// 以服务器上下文中的主机名与端口构建一条可导航的菜单行。
pub fn format_line(ctx: &ServerContext, item_type: ItemType, label: &str, selector: &str) -> String {
    let port = ctx.port().to_string();
    MenuLine::new(item_type, label, selector, ctx.hostname(), &port).to_string()
}

pub fn info_line(text: &str) -> String {
    MenuLine::info(text).to_string()
}

/// 以原始字节构建信息行。文件内容不保证是 UTF-8，标签按字节原样保留。
pub fn info_line_bytes(text: &[u8]) -> Vec<u8> {
    let mut line = Vec::with_capacity(text.len() + 24);
    line.push(ItemType::Info.code() as u8);
    line.extend_from_slice(text);
    for field in [PLACEHOLDER_SELECTOR, PLACEHOLDER_HOST, PLACEHOLDER_PORT] {
        line.push(FIELD_SEPARATOR as u8);
        line.extend_from_slice(field.as_bytes());
    }
    line.extend_from_slice(CRLF.as_bytes());
    line
}

pub fn error_line(e: Exception) -> String {
    let message = e.to_string();
    MenuLine::error(&message).to_string()
}

/// 完整的错误响应：错误行加结束行
pub fn error_response(e: Exception) -> String {
    let mut response = error_line(e);
    response.push_str(TERMINATOR);
    response
}

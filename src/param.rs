// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Gopher 服务器协议参数与常量模块
//!
//! 该模块定义了 `gopherserver` 遵循的菜单协议相关常量和数据结构，包括：
//! - 菜单行的分隔符、结束符以及信息行的占位字段。
//! - 目录控制文件与特殊扩展名。
//! - 菜单条目类型（Item Type）的强类型枚举及扩展名映射表。

use std::collections::HashMap;
use std::fmt;
use lazy_static::lazy_static;

/// 默认的配置文件路径
pub const CONFIG_PATH: &str = r"config/development.toml";

/// log4rs 配置文件路径
pub const LOG_CONFIG_PATH: &str = r"config/log4rs.yaml";

/// 菜单协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 菜单行内部的字段分隔符
pub const FIELD_SEPARATOR: char = '\t';

/// 菜单或转译响应的结束行
pub const TERMINATOR: &str = ".\r\n";

/// 信息行与错误行使用的占位字段：选择子、主机名、端口
pub const PLACEHOLDER_SELECTOR: &str = "fake";
pub const PLACEHOLDER_HOST: &str = "(NULL)";
pub const PLACEHOLDER_PORT: &str = "0";

/// 外部链接的选择子前缀
pub const URL_PREFIX: &str = "/URL:";

/// 目录控制文件
pub const REVERSE_FILE: &str = ".reverse";
pub const HEADER_FILE: &str = ".header";
pub const FOOTER_FILE: &str = ".footer";

/// 目录索引文件前缀，以及不参与索引覆盖的后缀
pub const INDEX_PREFIX: &str = "index";
pub const INDEX_EXCLUDED_SUFFIX: &str = ".html";

/// 特殊扩展名（不含点号）
pub const MARKDOWN_EXT: &str = "md";
pub const GOPHERMAP_EXT: &str = "gm";
pub const SCRIPT_EXT: &str = "gobj";
pub const TEXT_EXT: &str = "txt";

/// 外部链接判定：以 `http` 开头或以 `html` 结尾
pub const LINK_SCHEME_PREFIX: &str = "http";
pub const LINK_HTML_SUFFIX: &str = "html";

/// 请求行的默认长度上限（字节）
pub const DEFAULT_MAX_REQUEST_LINE: usize = 4096;

/// 原样传输文件时的默认缓冲区大小
pub const DEFAULT_CHUNK_SIZE: usize = 65536;

/// 菜单条目类型，即菜单行的第一个字符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    /// 纯文本文件
    Text,
    /// 子菜单（目录或可转译的标记文件）
    Menu,
    /// 错误
    Error,
    /// 二进制文件
    Binary,
    /// 外部 URL / HTML 链接
    Html,
    /// 信息行，不可选择
    Info,
    /// 图片
    Image,
}

impl ItemType {
    /// 返回协议中的类型码
    pub fn code(&self) -> char {
        match *self {
            ItemType::Text => '0',
            ItemType::Menu => '1',
            ItemType::Error => '3',
            ItemType::Binary => '9',
            ItemType::Html => 'h',
            ItemType::Info => 'i',
            ItemType::Image => 'I',
        }
    }

    /// 根据文件名（或链接目标）的扩展名推断条目类型。
    ///
    /// 目录需要由调用方另行判断；未知扩展名一律视为二进制文件。
    pub fn from_name(name: &str) -> Self {
        let extension = match name.rsplit_once('.') {
            Some((_, ext)) => ext,
            None => "_",
        };
        match ITEM_TYPES.get(extension) {
            Some(t) => *t,
            None => ItemType::Binary,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

lazy_static! {
    /// 文件后缀名到菜单条目类型的映射表。
    ///
    /// 标记文件被当作子菜单列出，可执行对象的输出被当作文本列出。
    pub static ref ITEM_TYPES: HashMap<&'static str, ItemType> = {
        let mut map = HashMap::new();
        map.insert(MARKDOWN_EXT, ItemType::Menu);
        map.insert(GOPHERMAP_EXT, ItemType::Menu);
        map.insert(SCRIPT_EXT, ItemType::Text);
        map.insert(TEXT_EXT, ItemType::Text);
        map
    };
}

/// 请求文件在分发时所属的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Markdown，转译为菜单
    Markdown,
    /// Gophermap，原样传输并追加结束行
    Gophermap,
    /// 可执行对象，运行后转发标准输出
    Script,
    /// 纯文本
    Text,
    /// 其他文件，按二进制原样传输
    Binary,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        match name.rsplit_once('.') {
            Some((_, MARKDOWN_EXT)) => FileKind::Markdown,
            Some((_, GOPHERMAP_EXT)) => FileKind::Gophermap,
            Some((_, SCRIPT_EXT)) => FileKind::Script,
            Some((_, TEXT_EXT)) => FileKind::Text,
            _ => FileKind::Binary,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FileKind::Markdown => write!(f, "markdown"),
            FileKind::Gophermap => write!(f, "gophermap"),
            FileKind::Script => write!(f, "script"),
            FileKind::Text => write!(f, "text"),
            FileKind::Binary => write!(f, "binary"),
        }
    }
}

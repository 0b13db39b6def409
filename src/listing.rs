//! # 目录列表
//!
//! 对目录做单次扫描：以 `.` 开头的文件是控制信号，不会被列出；
//! 遇到索引文件时立即停止扫描，之后的条目既不会被检查也不会被列出。

use log::{debug, error};
use tokio::fs;

use crate::{
    config::ServerContext,
    exception::Exception,
    menu::format_line,
    param::*,
};

/// 扫描过程中由控制文件得到的标志，每次列表请求重新计算。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlFlags {
    pub reverse: bool,
    pub header: bool,
    pub footer: bool,
}

impl ControlFlags {
    /// 处理一个以 `.` 开头的文件名，其他点文件被忽略
    fn observe(&mut self, name: &str) {
        match name {
            REVERSE_FILE => self.reverse = true,
            HEADER_FILE => self.header = true,
            FOOTER_FILE => self.footer = true,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_dir: bool,
}

impl DirectoryEntry {
    pub fn item_type(&self) -> ItemType {
        if self.is_dir {
            ItemType::Menu
        } else {
            ItemType::from_name(&self.name)
        }
    }
}

/// 一次目录扫描的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirScan {
    /// 找到了索引文件，扫描在此处截断
    Index(String),
    /// 完整扫描，条目保持文件系统返回的顺序
    Listing {
        flags: ControlFlags,
        entries: Vec<DirectoryEntry>,
    },
}

/// 名字以 `index` 开头且不以 `.html` 结尾的文件会覆盖目录列表
pub fn is_index_override(name: &str) -> bool {
    name.starts_with(INDEX_PREFIX) && !name.ends_with(INDEX_EXCLUDED_SUFFIX)
}

/// 单个条目在扫描中的去向
enum Step {
    Control,
    Index,
    Visible,
}

fn step(flags: &mut ControlFlags, name: &str) -> Step {
    if name.starts_with('.') {
        flags.observe(name);
        Step::Control
    } else if is_index_override(name) {
        Step::Index
    } else {
        Step::Visible
    }
}

/// 读取并扫描目录。
///
/// 遍历在找到索引文件时即停止，因此之后的条目不会被读取。
pub async fn scan_dir(ctx: &ServerContext, selector: &str, id: u128) -> Result<DirScan, Exception> {
    let path = ctx.resolve(selector);
    let mut read_dir = match fs::read_dir(&path).await {
        Ok(r) => r,
        Err(e) => {
            error!("[ID{}]无法读取目录{}: {}", id, path.display(), e);
            return Err(Exception::DirUnreadable);
        }
    };

    let mut flags = ControlFlags::default();
    let mut entries = Vec::new();
    loop {
        let entry = match read_dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                error!("[ID{}]遍历目录{}时出错: {}", id, path.display(), e);
                break;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        match step(&mut flags, &name) {
            Step::Control => continue,
            Step::Index => {
                debug!("[ID{}]目录{}使用索引文件{}", id, selector, name);
                return Ok(DirScan::Index(name));
            }
            Step::Visible => {}
        }
        let is_dir = match entry.file_type().await {
            Ok(t) => t.is_dir(),
            Err(_) => false,
        };
        entries.push(DirectoryEntry { name, is_dir });
    }
    Ok(DirScan::Listing { flags, entries })
}

/// 生成列表主体的菜单行；选择子为请求的目录路径直接拼接条目名。
pub fn listing_lines(
    ctx: &ServerContext,
    selector: &str,
    flags: &ControlFlags,
    entries: &[DirectoryEntry],
) -> Vec<String> {
    let mut lines: Vec<String> = entries
        .iter()
        .map(|entry| {
            let target = format!("{}{}", selector, entry.name);
            format_line(ctx, entry.item_type(), &entry.name, &target)
        })
        .collect();
    if flags.reverse {
        lines.reverse();
    }
    lines
}

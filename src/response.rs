//! # 响应分发
//!
//! `Responder` 把一个已读取的请求行变成写往客户端的字节：
//! 目录请求生成菜单列表（或交给索引文件），文件请求按扩展名分发到
//! Markdown 转译、Gophermap 直传、可执行对象、纯文本或二进制传输。
//!
//! 目录与文件之间的相互委托（目录 → 索引文件 → 实际是目录 → 列表……）
//! 通过一个显式的循环完成，而不是递归。

use std::path::Path;

use log::{debug, error, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{
    config::ServerContext,
    exception::Exception,
    listing::{listing_lines, scan_dir, DirScan},
    menu::{error_line, error_response},
    param::*,
    request::{Request, RequestKind},
    transpile::transpile_file,
    util::{
        emit, parent_selector, probe, probe_best_effort, run_script, send_file, send_info_lines,
        Probe,
    },
};

/// 页眉页脚的渲染方式，取决于调用方的上下文而不是页眉页脚文件本身。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoration {
    /// 目录列表中：每一行包装为信息行
    InfoLines,
    /// 单独文件中：原样传输
    Raw,
}

/// 目录控制文件中可注入的两种装饰
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Header,
    Footer,
}

impl Placement {
    fn file_name(&self) -> &'static str {
        match *self {
            Placement::Header => HEADER_FILE,
            Placement::Footer => FOOTER_FILE,
        }
    }
}

/// 待处理的目标：目录或文件的选择子
enum Target {
    Directory(String),
    File(String),
}

/// 针对单个连接的响应构建器
pub struct Responder<'a, W> {
    ctx: &'a ServerContext,
    sink: &'a mut W,
    id: u128,
}

impl<'a, W> Responder<'a, W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(ctx: &'a ServerContext, sink: &'a mut W, id: u128) -> Self {
        Self { ctx, sink, id }
    }

    /// 处理一个请求行。唯一会返回的错误是 `ConnectionClosed`，其余错误都已转换为错误行发送。
    pub async fn respond(&mut self, line: &str) -> Result<(), Exception> {
        let mut target = match Request::try_from(line, self.id) {
            Ok(r) => match r.kind() {
                RequestKind::Directory => Some(Target::Directory(r.selector().to_string())),
                RequestKind::File => Some(Target::File(r.selector().to_string())),
            },
            Err(e) => {
                self.send_error(e).await?;
                None
            }
        };
        while let Some(current) = target {
            target = match &current {
                Target::Directory(selector) => self.serve_directory(selector).await?,
                Target::File(selector) => self.serve_file(selector).await?,
            };
        }
        self.sink
            .flush()
            .await
            .map_err(|_| Exception::ConnectionClosed)
    }

    async fn send(&mut self, data: &str) -> Result<(), Exception> {
        emit(&mut *self.sink, data.as_bytes()).await
    }

    async fn send_error(&mut self, e: Exception) -> Result<(), Exception> {
        if e == Exception::ConnectionClosed {
            return Err(e);
        }
        self.send(&error_response(e)).await
    }

    async fn send_error_line(&mut self, e: Exception) -> Result<(), Exception> {
        if e == Exception::ConnectionClosed {
            return Err(e);
        }
        self.send(&error_line(e)).await
    }

    /// 生成目录列表。找到索引文件时返回该文件作为下一个目标。
    async fn serve_directory(&mut self, selector: &str) -> Result<Option<Target>, Exception> {
        debug!("[ID{}]列出目录：'{}'", self.id, selector);
        let (flags, entries) = match scan_dir(self.ctx, selector, self.id).await {
            Ok(DirScan::Index(name)) => {
                return Ok(Some(Target::File(format!("{}{}", selector, name))));
            }
            Ok(DirScan::Listing { flags, entries }) => (flags, entries),
            // 无法读取目录时仍然按零个条目继续，最终只剩错误行加结束行
            Err(e) => {
                self.send_error_line(e).await?;
                Default::default()
            }
        };

        if flags.header {
            self.inject(selector, Placement::Header, Decoration::InfoLines).await?;
        }
        for line in listing_lines(self.ctx, selector, &flags, &entries) {
            self.send(&line).await?;
        }
        if flags.footer {
            self.inject(selector, Placement::Footer, Decoration::InfoLines).await?;
        }
        self.send(TERMINATOR).await?;
        Ok(None)
    }

    /// 按扩展名分发文件请求。目标实际是目录时返回目录作为下一个目标。
    async fn serve_file(&mut self, selector: &str) -> Result<Option<Target>, Exception> {
        let path = self.ctx.resolve(selector);
        let found = match probe(&path).await {
            Ok(Probe::File) => true,
            Ok(Probe::Directory) => {
                debug!("[ID{}]{}是目录，转为目录列表", self.id, selector);
                return Ok(Some(Target::Directory(format!("{}/", selector))));
            }
            Ok(Probe::Missing) => {
                warn!("[ID{}]请求的路径：{} 不存在", self.id, selector);
                false
            }
            Err(e) => {
                error!("[ID{}]无法获取{}的元数据: {}", self.id, path.display(), e);
                false
            }
        };

        let kind = FileKind::from_name(selector);
        debug!("[ID{}]文件{}按{}处理", self.id, selector, kind);
        match kind {
            FileKind::Binary if !found => {
                self.send_error(Exception::FileNotFound).await?;
                return Ok(None);
            }
            FileKind::Binary => {
                // 二进制文件不加页眉页脚，也没有结束行
                if let Err(e) = send_file(&path, &mut *self.sink, self.ctx.chunk_size(), self.id).await {
                    match e {
                        Exception::FileNotFound => self.send_error(e).await?,
                        Exception::ConnectionClosed => return Err(e),
                        _ => warn!("[ID{}]二进制传输{}中断：{}", self.id, selector, e),
                    }
                }
                return Ok(None);
            }
            FileKind::Script if !self.ctx.enable_scripts() => {
                warn!("[ID{}]可执行对象已被禁用，拒绝运行{}", self.id, selector);
                self.send_error(Exception::ScriptDisabled).await?;
                return Ok(None);
            }
            _ => {}
        }

        // 目标不存在时错误行代替正文，页眉页脚照常尝试
        self.inject(selector, Placement::Header, Decoration::Raw).await?;
        let result = match kind {
            _ if !found => Err(Exception::FileNotFound),
            FileKind::Markdown => transpile_file(self.ctx, selector, &path, &mut *self.sink, self.id).await,
            FileKind::Script => run_script(&path, &mut *self.sink, self.ctx.chunk_size(), self.id)
                .await
                .map(|_| ()),
            _ => send_file(&path, &mut *self.sink, self.ctx.chunk_size(), self.id)
                .await
                .map(|_| ()),
        };
        if let Err(e) = result {
            self.send_error_line(e).await?;
        }
        self.inject(selector, Placement::Footer, Decoration::Raw).await?;
        self.send(TERMINATOR).await?;
        Ok(None)
    }

    /// 在请求路径的父目录中查找 `.header` / `.footer` 并按给定方式发送。
    ///
    /// 控制文件不存在、是目录或探测失败时静默跳过。
    async fn inject(
        &mut self,
        request: &str,
        placement: Placement,
        decoration: Decoration,
    ) -> Result<(), Exception> {
        let selector = format!("{}{}", parent_selector(request), placement.file_name());
        let path = self.ctx.resolve(&selector);
        if probe_best_effort(&path).await != Probe::File {
            return Ok(());
        }
        let result = self.send_decoration(&path, decoration).await;
        match result {
            Ok(()) => Ok(()),
            Err(Exception::ConnectionClosed) => Err(Exception::ConnectionClosed),
            Err(e) => {
                warn!("[ID{}]发送{}失败：{}", self.id, path.display(), e);
                self.send_error_line(e).await
            }
        }
    }

    async fn send_decoration(&mut self, path: &Path, decoration: Decoration) -> Result<(), Exception> {
        match decoration {
            Decoration::InfoLines => send_info_lines(path, &mut *self.sink, self.id).await,
            Decoration::Raw => send_file(path, &mut *self.sink, self.ctx.chunk_size(), self.id)
                .await
                .map(|_| ()),
        }
    }
}

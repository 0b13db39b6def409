use std::{
    io,
    path::Path,
    process::Stdio,
};

use log::{debug, error};
use tokio::{
    fs::{self, File},
    io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    process::Command,
};

use crate::{exception::Exception, menu::info_line_bytes};

/// 文件系统探测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Missing,
    Directory,
    File,
}

/// 探测路径是否存在以及是否为目录。不存在不算错误，其余 I/O 错误原样返回。
pub async fn probe(path: &Path) -> io::Result<Probe> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(Probe::Directory),
        Ok(_) => Ok(Probe::File),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Probe::Missing),
        Err(e) => Err(e),
    }
}

/// 控制文件的探测：任何错误都当作不存在
pub async fn probe_best_effort(path: &Path) -> Probe {
    probe(path).await.unwrap_or(Probe::Missing)
}

/// 去掉选择子的最后一个路径分量，保留结尾的 `/`。
///
/// `docs/page.md` → `docs/`，`docs/` → `docs/`，`page.md` → 空串。
pub fn parent_selector(selector: &str) -> &str {
    match selector.rfind('/') {
        Some(i) => &selector[..=i],
        None => "",
    }
}

/// 写入客户端。写入失败意味着连接已不可用。
pub async fn emit<W>(sink: &mut W, data: &[u8]) -> Result<(), Exception>
where
    W: AsyncWrite + Unpin,
{
    sink.write_all(data)
        .await
        .map_err(|_| Exception::ConnectionClosed)
}

/// 以固定大小的缓冲区把 `reader` 的内容原样转发给客户端，返回转发的字节数。
///
/// 读取失败时返回 `read_error`，此前已经发送的数据不会撤回。
async fn forward_chunked<R, W>(
    reader: &mut R,
    sink: &mut W,
    chunk_size: usize,
    read_error: Exception,
) -> Result<u64, Exception>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut total_sent = 0u64;
    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => {
                emit(sink, &buffer[..n]).await?;
                total_sent += n as u64;
            }
            Err(_) => return Err(read_error),
        }
    }
    Ok(total_sent)
}

/// 原样发送文件内容
pub async fn send_file<W>(path: &Path, sink: &mut W, chunk_size: usize, id: u128) -> Result<u64, Exception>
where
    W: AsyncWrite + Unpin,
{
    let mut file = match File::open(path).await {
        Ok(f) => f,
        Err(e) => {
            debug!("[ID{}]无法打开文件{}: {}", id, path.display(), e);
            return Err(Exception::FileNotFound);
        }
    };
    let sent = forward_chunked(&mut file, sink, chunk_size, Exception::FileUnreadable).await?;
    debug!("[ID{}]文件{}传输完成，共发送 {} 字节", id, path.display(), sent);
    Ok(sent)
}

/// 按字节读取一行，去掉结尾的 `\n` 或 `\r\n`。到达文件末尾时返回 `false`。
///
/// 内容不做 UTF-8 校验，只有真正的 I/O 错误才会返回 `Err`。
pub async fn read_raw_line<R>(reader: &mut R, line: &mut Vec<u8>) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    if reader.read_until(b'\n', line).await? == 0 {
        return Ok(false);
    }
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    Ok(true)
}

/// 把文件的每一行作为信息行发送
pub async fn send_info_lines<W>(path: &Path, sink: &mut W, id: u128) -> Result<(), Exception>
where
    W: AsyncWrite + Unpin,
{
    let file = match File::open(path).await {
        Ok(f) => f,
        Err(e) => {
            debug!("[ID{}]无法打开文件{}: {}", id, path.display(), e);
            return Err(Exception::FileNotFound);
        }
    };
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    loop {
        match read_raw_line(&mut reader, &mut line).await {
            Ok(true) => emit(sink, &info_line_bytes(&line)).await?,
            Ok(false) => return Ok(()),
            Err(e) => {
                error!("[ID{}]读取文件{}失败: {}", id, path.display(), e);
                return Err(Exception::FileUnreadable);
            }
        }
    }
}

/// 运行可执行对象，并把它的标准输出边产生边转发给客户端。
///
/// 不传参数，不修改环境变量，没有超时。标准错误被收集起来用于日志。
pub async fn run_script<W>(path: &Path, sink: &mut W, chunk_size: usize, id: u128) -> Result<u64, Exception>
where
    W: AsyncWrite + Unpin,
{
    let mut child = match Command::new(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(c) => c,
        Err(e) => {
            error!("[ID{}]无法启动可执行对象{}: {}", id, path.display(), e);
            return Err(Exception::ScriptExecuteFailed);
        }
    };
    let (mut stdout, mut stderr) = match (child.stdout.take(), child.stderr.take()) {
        (Some(out), Some(err)) => (out, err),
        _ => return Err(Exception::ScriptExecuteFailed),
    };

    // stdout 随 forward 一起被释放，客户端断开后子进程写入会收到 SIGPIPE
    let forward = async move {
        forward_chunked(&mut stdout, sink, chunk_size, Exception::ScriptExecuteFailed).await
    };
    let collect = async move {
        let mut buffer = Vec::new();
        let _ = stderr.read_to_end(&mut buffer).await;
        buffer
    };
    let (forwarded, stderr_output) = tokio::join!(forward, collect);

    let status = match child.wait().await {
        Ok(s) => s,
        Err(e) => {
            error!("[ID{}]等待可执行对象{}结束失败: {}", id, path.display(), e);
            return Err(Exception::ScriptExecuteFailed);
        }
    };
    let sent = forwarded?;

    if status.success() {
        debug!("[ID{}]可执行对象{}运行完成，输出 {} 字节", id, path.display(), sent);
        Ok(sent)
    } else {
        error!(
            "[ID{}]可执行对象{}以{}退出：{}",
            id,
            path.display(),
            status,
            String::from_utf8_lossy(&stderr_output)
        );
        Err(Exception::ScriptExecuteFailed)
    }
}

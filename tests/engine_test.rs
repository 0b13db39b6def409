// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

#[cfg(test)]
mod engine_tests {
    //! # 内容解析与格式化引擎测试
    //!
    //! 在临时目录中搭建 gopher 目录树，直接驱动 `Responder` 并检查写入内存的完整响应。
    //! 重点验证：
    //! 1. 目录列表的控制文件（页眉、页脚、倒序）与索引文件覆盖。
    //! 2. Markdown 转译中的相对链接解析与外部链接。
    //! 3. 各类文件的分发方式以及结束行的有无。

    use std::fs;
    use std::path::Path;

    use gopherserver::{menu::error_response, Exception, Responder, ServerContext};
    use tempfile::TempDir;

    const HOST: &str = "gopher.test";
    const PORT: u16 = 7070;
    const TERM: &str = ".\r\n";

    fn hole() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn context(root: &Path, scripts: bool) -> ServerContext {
        ServerContext::new(HOST, PORT, root, scripts)
    }

    async fn respond_bytes(ctx: &ServerContext, line: &str) -> Vec<u8> {
        let mut sink = Vec::new();
        Responder::new(ctx, &mut sink, 0)
            .respond(line)
            .await
            .expect("写入内存不应失败");
        sink
    }

    async fn respond(ctx: &ServerContext, line: &str) -> String {
        String::from_utf8(respond_bytes(ctx, line).await).unwrap()
    }

    fn info(text: &str) -> String {
        format!("i{}\tfake\t(NULL)\t0\r\n", text)
    }

    fn item(code: char, label: &str, selector: &str) -> String {
        format!("{}{}\t{}\t{}\t{}\r\n", code, label, selector, HOST, PORT)
    }

    /// 把列表响应拆成：页眉信息行、主体条目、页脚信息行
    fn split_listing(response: &str) -> (Vec<String>, Vec<String>, Vec<String>) {
        assert!(response.ends_with(TERM), "列表必须以结束行结尾：{:?}", response);
        let body = &response[..response.len() - TERM.len()];
        let lines: Vec<String> = body
            .split_inclusive("\r\n")
            .map(|l| l.to_string())
            .collect();
        let first_item = lines.iter().position(|l| !l.starts_with('i'));
        let last_item = lines.iter().rposition(|l| !l.starts_with('i'));
        match (first_item, last_item) {
            (Some(first), Some(last)) => (
                lines[..first].to_vec(),
                lines[first..=last].to_vec(),
                lines[last + 1..].to_vec(),
            ),
            _ => (lines, vec![], vec![]),
        }
    }

    #[tokio::test]
    async fn test_listing_with_header() {
        let tmp = hole();
        write(tmp.path(), "a.txt", "alpha");
        fs::create_dir(tmp.path().join("b")).unwrap();
        write(tmp.path(), ".header", "Welcome\nto the hole\n");
        let ctx = context(tmp.path(), false);

        let response = respond(&ctx, "").await;
        let (header, mut body, footer) = split_listing(&response);
        assert_eq!(header, vec![info("Welcome"), info("to the hole")]);
        body.sort();
        assert_eq!(body, vec![item('0', "a.txt", "a.txt"), item('1', "b", "b")]);
        assert!(footer.is_empty());
    }

    #[tokio::test]
    async fn test_listing_of_subdirectory_and_slash_prefix() {
        let tmp = hole();
        write(tmp.path(), "docs/guide.md", "# Guide");
        let ctx = context(tmp.path(), false);

        let expected = format!("{}{}", item('1', "guide.md", "docs/guide.md"), TERM);
        assert_eq!(respond(&ctx, "docs/").await, expected);
        assert_eq!(respond(&ctx, "/docs/").await, expected);
        // 不以 `/` 结尾但实际是目录
        assert_eq!(respond(&ctx, "docs").await, expected);
    }

    #[tokio::test]
    async fn test_listing_item_types() {
        let tmp = hole();
        for name in ["page.md", "map.gm", "clock.gobj", "notes.txt", "photo.png", "index.html"] {
            write(tmp.path(), name, "x");
        }
        let ctx = context(tmp.path(), false);

        let response = respond(&ctx, "").await;
        let (_, mut body, _) = split_listing(&response);
        body.sort();
        let mut expected = vec![
            item('1', "page.md", "page.md"),
            item('1', "map.gm", "map.gm"),
            item('0', "clock.gobj", "clock.gobj"),
            item('0', "notes.txt", "notes.txt"),
            item('9', "photo.png", "photo.png"),
            item('9', "index.html", "index.html"),
        ];
        expected.sort();
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn test_reverse_listing_with_header_and_footer() {
        let tmp = hole();
        for name in ["one.txt", "two.txt", "three.txt", "four.bin"] {
            write(tmp.path(), name, "x");
        }
        write(tmp.path(), ".header", "top");
        write(tmp.path(), ".footer", "bottom");
        let ctx = context(tmp.path(), false);

        let forward = respond(&ctx, "").await;
        write(tmp.path(), ".reverse", "");
        let backward = respond(&ctx, "").await;

        let (fh, fbody, ff) = split_listing(&forward);
        let (bh, mut bbody, bf) = split_listing(&backward);
        assert_eq!(fh, vec![info("top")]);
        assert_eq!(ff, vec![info("bottom")]);
        assert_eq!(bh, fh);
        assert_eq!(bf, ff);
        assert_eq!(fbody.len(), 4);
        bbody.reverse();
        assert_eq!(bbody, fbody);
    }

    #[tokio::test]
    async fn test_control_files_never_listed() {
        let tmp = hole();
        for name in [".reverse", ".header", ".footer", ".hidden"] {
            write(tmp.path(), name, "");
        }
        let ctx = context(tmp.path(), false);
        assert_eq!(respond(&ctx, "").await, TERM);
    }

    #[tokio::test]
    async fn test_index_markdown_overrides_listing() {
        let tmp = hole();
        write(tmp.path(), "docs/index.md", "Docs home\n[Guide](guide.md)\n");
        write(tmp.path(), "docs/guide.md", "guide");
        write(tmp.path(), "docs/other.txt", "other");
        write(tmp.path(), "docs/.header", "1Raw header\tx\th\t1\r\n");
        let ctx = context(tmp.path(), false);

        let response = respond(&ctx, "docs/").await;
        assert_eq!(
            response,
            format!(
                "1Raw header\tx\th\t1\r\n{}{}{}",
                info("Docs home"),
                item('1', "Guide", "docs/guide.md"),
                TERM
            )
        );
        assert!(!response.contains("other.txt"));
    }

    #[tokio::test]
    async fn test_index_text_is_sent_verbatim() {
        let tmp = hole();
        write(tmp.path(), "index.txt", "plain index\n");
        write(tmp.path(), "zzz.txt", "never listed");
        let ctx = context(tmp.path(), false);
        assert_eq!(respond(&ctx, "").await, format!("plain index\n{}", TERM));
    }

    #[tokio::test]
    async fn test_index_directory_is_followed() {
        let tmp = hole();
        write(tmp.path(), "index/inner.txt", "x");
        let ctx = context(tmp.path(), false);
        assert_eq!(
            respond(&ctx, "").await,
            format!("{}{}", item('0', "inner.txt", "index/inner.txt"), TERM)
        );
    }

    #[tokio::test]
    async fn test_markdown_relative_link() {
        let tmp = hole();
        write(tmp.path(), "docs/page.md", "[Home](index.md)\n");
        let ctx = context(tmp.path(), false);
        assert_eq!(
            respond(&ctx, "docs/page.md").await,
            format!("1Home\tdocs/index.md\t{}\t{}\r\n{}", HOST, PORT, TERM)
        );
    }

    #[tokio::test]
    async fn test_markdown_external_link_and_image() {
        let tmp = hole();
        write(
            tmp.path(),
            "page.md",
            "[Site](http://example.com)\n![Logo](img/logo.png)\n  spaced  \n",
        );
        let ctx = context(tmp.path(), false);
        assert_eq!(
            respond(&ctx, "page.md").await,
            format!(
                "hSite\t/URL:http://example.com\t{h}\t{p}\r\nILogo\timg/logo.png\t{h}\t{p}\r\n{}{}",
                info("  spaced  "),
                TERM,
                h = HOST,
                p = PORT
            )
        );
    }

    #[tokio::test]
    async fn test_markdown_with_non_utf8_line_is_fully_transpiled() {
        let tmp = hole();
        write(tmp.path(), "a.txt", "alpha");
        fs::write(tmp.path().join("p.md"), b"caf\xe9\n[A](a.txt)\n").unwrap();
        let ctx = context(tmp.path(), false);

        let mut expected = b"icaf\xe9\tfake\t(NULL)\t0\r\n".to_vec();
        expected.extend_from_slice(item('0', "A", "a.txt").as_bytes());
        expected.extend_from_slice(TERM.as_bytes());
        assert_eq!(respond_bytes(&ctx, "p.md").await, expected);
    }

    #[tokio::test]
    async fn test_listing_header_with_non_utf8_bytes() {
        let tmp = hole();
        write(tmp.path(), "a.txt", "alpha");
        fs::write(tmp.path().join(".header"), b"Caf\xe9 menu\n").unwrap();
        let ctx = context(tmp.path(), false);

        let mut expected = b"iCaf\xe9 menu\tfake\t(NULL)\t0\r\n".to_vec();
        expected.extend_from_slice(item('0', "a.txt", "a.txt").as_bytes());
        expected.extend_from_slice(TERM.as_bytes());
        assert_eq!(respond_bytes(&ctx, "").await, expected);
    }

    #[tokio::test]
    async fn test_text_file_framed_by_raw_header_and_footer() {
        let tmp = hole();
        write(tmp.path(), "notes/a.txt", "line one\nline two\n");
        write(tmp.path(), "notes/.header", "HEADER\n");
        write(tmp.path(), "notes/.footer", "FOOTER\n");
        let ctx = context(tmp.path(), false);
        assert_eq!(
            respond(&ctx, "notes/a.txt").await,
            format!("HEADER\nline one\nline two\nFOOTER\n{}", TERM)
        );
    }

    #[tokio::test]
    async fn test_gophermap_passthrough() {
        let tmp = hole();
        let map = "iHello\tfake\t(NULL)\t0\r\n1Docs\tdocs/\tother.host\t70\r\n";
        write(tmp.path(), "menu.gm", map);
        let ctx = context(tmp.path(), false);
        assert_eq!(respond(&ctx, "menu.gm").await, format!("{}{}", map, TERM));
    }

    #[tokio::test]
    async fn test_binary_file_is_raw_without_terminator() {
        let tmp = hole();
        let content: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        fs::write(tmp.path().join("blob.bin"), &content).unwrap();
        write(tmp.path(), ".header", "never sent");
        let ctx = context(tmp.path(), false);
        assert_eq!(respond_bytes(&ctx, "blob.bin").await, content);
    }

    #[tokio::test]
    async fn test_missing_file_is_framed_by_header_and_footer() {
        let tmp = hole();
        write(tmp.path(), ".header", "HEAD\n");
        write(tmp.path(), ".footer", "FOOT\n");
        let ctx = context(tmp.path(), false);

        let expected = format!("HEAD\n3{}\tfake\t(NULL)\t0\r\nFOOT\n{}", Exception::FileNotFound, TERM);
        assert_eq!(respond(&ctx, "nope.txt").await, expected);
        assert_eq!(respond(&ctx, "nope.md").await, expected);
        assert_eq!(respond(&ctx, "nope.gm").await, expected);
    }

    #[tokio::test]
    async fn test_missing_binary_is_bare_error_response() {
        let tmp = hole();
        write(tmp.path(), ".header", "never sent");
        let ctx = context(tmp.path(), false);
        assert_eq!(
            respond(&ctx, "nope.bin").await,
            error_response(Exception::FileNotFound)
        );
    }

    #[tokio::test]
    async fn test_disabled_script_is_refused() {
        let tmp = hole();
        write(tmp.path(), "bin/hello.gobj", "#!/bin/sh\necho hi\n");
        write(tmp.path(), "bin/.header", "header");
        let ctx = context(tmp.path(), false);
        assert_eq!(
            respond(&ctx, "bin/hello.gobj").await,
            "3Script execution is disabled on this server\tfake\t(NULL)\t0\r\n.\r\n"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_enabled_script_output_is_framed() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = hole();
        write(tmp.path(), "bin/hello.gobj", "#!/bin/sh\necho \"hello from script\"\n");
        write(tmp.path(), "bin/broken.gobj", "#!/bin/sh\necho before\nexit 1\n");
        write(tmp.path(), "bin/.header", "H\n");
        write(tmp.path(), "bin/.footer", "F\n");
        for name in ["bin/hello.gobj", "bin/broken.gobj"] {
            fs::set_permissions(tmp.path().join(name), fs::Permissions::from_mode(0o755)).unwrap();
        }
        let ctx = context(tmp.path(), true);

        assert_eq!(
            respond(&ctx, "bin/hello.gobj").await,
            format!("H\nhello from script\nF\n{}", TERM)
        );
        assert_eq!(
            respond(&ctx, "bin/broken.gobj").await,
            format!(
                "H\nbefore\n3{}\tfake\t(NULL)\t0\r\nF\n{}",
                Exception::ScriptExecuteFailed,
                TERM
            )
        );
    }
}

//! rslocalizer 命令行入口
//!
//! 加载词典、解析页面，按指定路由运行一次翻译并输出翻译后的 body。
//!
//! 用法：
//!   rslocalizer --dict zh-CN.json --html page.html --route '#!/overview'
//!   rslocalizer --dict-url https://example.com/dict.json --html page.html --route 'https://screeps.com/a/#!/room/E1N1'

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use rslocalizer::{route_from_url, ConfigManager, Document, Translator};

/// 按路由翻译 HTML 页面中的文本
#[derive(Parser, Debug)]
#[command(name = "rslocalizer", version)]
#[command(about = "Localize the text of an HTML page with a route-aware dictionary")]
struct Args {
    /// 本地词典文件（.json 或 .mp）
    #[arg(long, short = 'd')]
    dict: Option<PathBuf>,

    /// 远程词典URL（未指定本地词典时使用）
    #[arg(long)]
    dict_url: Option<String>,

    /// 远程词典的本地缓存路径
    #[arg(long)]
    cache_path: Option<PathBuf>,

    /// 待翻译的 HTML 文件
    #[arg(long)]
    html: PathBuf,

    /// 当前路由，hash（#!/overview）或完整URL
    #[arg(long, short = 'r', default_value = "")]
    route: String,

    /// 源语种
    #[arg(long, default_value = "en-US")]
    from: String,

    /// 目标语种
    #[arg(long, default_value = "zh-CN")]
    to: String,

    /// 翻译后等待的毫秒数，用于触发延迟任务
    #[arg(long, default_value_t = 0)]
    settle_ms: u64,

    /// 输出未翻译的文本
    #[arg(long)]
    warn_unmatched: bool,

    /// 输出文件，默认打印到标准输出
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// 详细日志
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut builder = ConfigManager::custom()
        .translate_from(args.from.clone())
        .translate_to(args.to.clone())
        .warn_unmatched(args.warn_unmatched)
        .verbose(args.verbose);
    if let Some(path) = args.dict.clone() {
        builder = builder.dictionary_path(path);
    }
    if let Some(url) = args.dict_url.clone() {
        builder = builder.dictionary_url(url);
    }
    if let Some(path) = args.cache_path.clone() {
        builder = builder.dictionary_cache_path(path);
    }
    let config = builder.build();

    let mut translator = Translator::from_config(config).await.context("加载词典失败")?;
    info!("词典加载完成，规则 {} 条", translator.store().rule_count());

    let html = tokio::fs::read_to_string(&args.html)
        .await
        .with_context(|| format!("读取页面 {} 失败", args.html.display()))?;
    let mut doc = Document::parse_html(&html);
    doc.set_location(route_from_url(&args.route).context("路由解析失败")?);

    let report = translator.start(&mut doc);
    info!("初次翻译完成，替换 {} 处", report.substitutions);
    if args.settle_ms > 0 {
        let report = translator.advance(&mut doc, Duration::from_millis(args.settle_ms));
        info!("等待 {}ms 后触发延迟任务 {} 个", args.settle_ms, report.deferred_fired);
    }

    let output = doc.inner_html(doc.body());
    match &args.output {
        Some(path) => tokio::fs::write(path, output)
            .await
            .with_context(|| format!("写入 {} 失败", path.display()))?,
        None => println!("{}", output),
    }
    Ok(())
}

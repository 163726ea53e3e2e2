use anyhow::Result;
use web_qa_probe::utils::logging;
use web_qa_probe::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let _summary = App::initialize(config).await?.run().await?;

    Ok(())
}

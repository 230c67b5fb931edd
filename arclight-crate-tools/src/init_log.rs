use std::io::Write;

/// 初始化全局的 env_logger
///
/// 格式：`[时间] LEVEL [模块] 内容`，level 带有颜色；
/// 默认过滤级别是 Info，可以通过 RUST_LOG 覆盖
pub fn init_log() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let level_style = match record.level() {
                log::Level::Error => buf
                    .default_level_style(log::Level::Error)
                    .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
                log::Level::Warn => buf
                    .default_level_style(log::Level::Warn)
                    .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
                log::Level::Info => buf
                    .default_level_style(log::Level::Info)
                    .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
                _ => buf.default_level_style(record.level()),
            };
            let dim_style = anstyle::Style::new().fg_color(Some(anstyle::Color::Rgb(anstyle::RgbColor(110, 110, 110))));

            let time = chrono::Local::now().format("%H:%M:%S%.3f");
            let module = record.module_path().unwrap_or("");

            writeln!(
                buf,
                "[{time}] {level_style}{:5}{level_style:#} {dim_style}[{module}]{dim_style:#} {}",
                record.level(),
                record.args()
            )
        })
        .init();
}
